//! Business services containing domain logic and use cases.

pub mod otp;
