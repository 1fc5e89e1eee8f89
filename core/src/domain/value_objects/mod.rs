//! Value objects representing immutable domain concepts.

pub mod canonical_phone;

// Re-export commonly used types
pub use canonical_phone::{normalize, CanonicalPhone};
