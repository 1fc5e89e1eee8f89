pub mod otp;

pub use otp::{AttemptUpdate, InMemoryOtpRepository, OtpRepository, UpsertOutcome};
