//! HTTP handlers for the Retail Management Platform

pub mod health;
pub mod inventory;
pub mod notification;
pub mod sale;
pub mod scrap;
pub mod transfer;

pub use health::*;
pub use inventory::*;
pub use notification::*;
pub use sale::*;
pub use scrap::*;
pub use transfer::*;

use serde::Deserialize;
use shared::types::Pagination;

/// Query parameters shared by the list endpoints
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PaginationQuery {
    pub fn into_pagination(self) -> Pagination {
        let default = Pagination::default();
        Pagination {
            page: self.page.unwrap_or(default.page),
            per_page: self.per_page.unwrap_or(default.per_page),
        }
    }
}
