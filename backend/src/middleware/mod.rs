//! Middleware for the Retail Management Platform

pub mod auth;

pub use auth::{auth_middleware, AuthUser, CurrentUser};
