//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They handle database transactions, validation, and complex operations.

pub mod availability_service;
pub mod booking_service;
pub mod expiry_service;
pub mod notification_service;
