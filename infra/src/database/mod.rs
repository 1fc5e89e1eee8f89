//! Database module - MySQL implementations using SQLx
//!
//! This module provides the durable tier of the OTP store:
//! - Connection pool management
//! - The MySQL OTP repository
//! - Schema bootstrap

pub mod connection;
pub mod repositories;

// Re-export commonly used types
pub use connection::{DatabasePool, PoolStats};
pub use repositories::MySqlOtpRepository;
