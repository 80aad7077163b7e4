//! Shared types and models for the Retail Management Platform
//!
//! This crate contains the domain models and the pure decision logic
//! (quantity clamping, state transitions, totals math) shared between the
//! backend and other components of the system.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
