//! Numeric code generation backed by the operating system CSPRNG

use rand::{rngs::OsRng, Rng};

/// Generate a numeric code of exactly `length` digits
///
/// Each digit is drawn independently and uniformly from `0-9` using
/// [`OsRng`], so leading zeros are as likely as any other digit.
pub fn generate(length: usize) -> String {
    let mut rng = OsRng;
    (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}
