//! Domain layer containing the OTP record entity and the canonical phone value object.

pub mod entities;
pub mod value_objects;

// Re-export commonly used domain types
pub use entities::*;
pub use value_objects::*;
