//! SeaORM entity definitions
//!
//! These are database-specific entities separate from domain models.

pub mod admin;
pub mod artist;
pub mod audit_log;
pub mod customer;
pub mod staff;
