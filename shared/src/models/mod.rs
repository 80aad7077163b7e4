//! Domain models for the Retail Management Platform

pub mod customer;
pub mod discount;
pub mod inventory;
pub mod sale;
pub mod scrap;
pub mod store;
pub mod transfer;

pub use customer::*;
pub use discount::*;
pub use inventory::*;
pub use sale::*;
pub use scrap::*;
pub use store::*;
pub use transfer::*;
