//! MySQL repository implementations

pub mod otp_repository;

pub use otp_repository::MySqlOtpRepository;
