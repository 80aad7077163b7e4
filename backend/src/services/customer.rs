//! Customer resolution
//!
//! The returned-scrap branch needs a customer on its merge key; callers may
//! pass an existing id or enough contact detail to find or create one.

use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::Customer;
use shared::validation::{validate_email, validate_phone};

#[derive(Clone)]
pub struct CustomerService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct CustomerRow {
    id: Uuid,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            created_at: row.created_at,
        }
    }
}

impl CustomerService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Look a customer up by (email, phone), creating one if absent
    pub async fn find_or_create(
        &self,
        email: &str,
        phone: &str,
        name: &str,
    ) -> AppResult<Customer> {
        validate_email(email).map_err(|msg| AppError::Validation {
            field: "email".to_string(),
            message: msg.to_string(),
        })?;
        validate_phone(phone).map_err(|msg| AppError::Validation {
            field: "phone".to_string(),
            message: msg.to_string(),
        })?;

        if let Some(row) = sqlx::query_as::<_, CustomerRow>(
            "SELECT id, name, email, phone, created_at FROM customers \
             WHERE email = $1 AND phone = $2",
        )
        .bind(email)
        .bind(phone)
        .fetch_optional(&self.db)
        .await?
        {
            return Ok(row.into());
        }

        let row = sqlx::query_as::<_, CustomerRow>(
            r#"
            INSERT INTO customers (name, email, phone)
            VALUES ($1, $2, $3)
            ON CONFLICT (email, phone) DO UPDATE SET name = customers.name
            RETURNING id, name, email, phone, created_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(phone)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    /// Get a customer by id
    pub async fn get(&self, customer_id: Uuid) -> AppResult<Customer> {
        let row = sqlx::query_as::<_, CustomerRow>(
            "SELECT id, name, email, phone, created_at FROM customers WHERE id = $1",
        )
        .bind(customer_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer".to_string()))?;

        Ok(row.into())
    }
}
