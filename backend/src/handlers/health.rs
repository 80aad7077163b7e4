//! Health check handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

/// Readiness summary for monitors and load balancers
#[derive(Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub version: &'static str,
    pub database: &'static str,
    /// Outbox events still waiting for the background worker; absent when
    /// the database could not be reached
    pub outbox_backlog: Option<i64>,
}

/// Report overall health.
///
/// The backlog count doubles as the database connectivity check: one query
/// answers both questions.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthReport> {
    let backlog = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM outbox_events WHERE status = 'pending'",
    )
    .fetch_one(&state.db)
    .await
    .ok();

    Json(HealthReport {
        status: overall_status(backlog.is_some()),
        version: env!("CARGO_PKG_VERSION"),
        database: if backlog.is_some() {
            "reachable"
        } else {
            "unreachable"
        },
        outbox_backlog: backlog,
    })
}

fn overall_status(database_reachable: bool) -> &'static str {
    if database_reachable {
        "ok"
    } else {
        "degraded"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_degrades_without_database() {
        assert_eq!(overall_status(true), "ok");
        assert_eq!(overall_status(false), "degraded");
    }

    #[test]
    fn report_omits_backlog_when_database_unreachable() {
        let report = HealthReport {
            status: overall_status(false),
            version: "0.1.0",
            database: "unreachable",
            outbox_backlog: None,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "degraded");
        assert!(json.get("outbox_backlog").is_some());
        assert!(json["outbox_backlog"].is_null());
    }
}
