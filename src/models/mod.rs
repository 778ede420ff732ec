//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables.

/// Booking entity, lifecycle states, and API request/response types
pub mod booking;
/// Contact payload and field validation
pub mod contact;
