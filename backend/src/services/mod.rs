//! Business logic services for the Retail Management Platform

pub mod customer;
pub mod inventory;
pub mod notification;
pub mod outbox;
pub mod pricing;
pub mod sale;
pub mod scrap;
pub mod transfer;

pub use customer::CustomerService;
pub use inventory::InventoryService;
pub use notification::NotificationService;
pub use outbox::OutboxService;
pub use pricing::PricingService;
pub use sale::SaleService;
pub use scrap::ScrapService;
pub use transfer::TransferService;
