//! Database models for the Retail Management Platform
//!
//! Re-exports models from the shared crate and adds backend-specific models

pub use shared::models::*;
pub use shared::types::*;
