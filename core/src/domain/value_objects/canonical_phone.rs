//! Canonical phone number used as the key for all OTP state.

use serde::{Deserialize, Serialize};

use otp_shared::phone::{is_e164, mask_phone_number, strip_phone_formatting};

use crate::errors::OtpError;

/// A phone number in its single canonical form (`+` followed by 8-15 digits)
///
/// Only [`normalize`] constructs one, so every component downstream of the
/// normalizer works with a validated key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CanonicalPhone(String);

impl CanonicalPhone {
    /// Alias for [`normalize`]
    pub fn parse(raw: &str) -> Result<Self, OtpError> {
        normalize(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Digits only, without the leading `+`
    pub fn digits(&self) -> &str {
        &self.0[1..]
    }

    /// Log-safe rendering, e.g. `+998*****4567`
    pub fn masked(&self) -> String {
        mask_phone_number(&self.0)
    }
}

impl AsRef<str> for CanonicalPhone {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CanonicalPhone {
    type Error = OtpError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        normalize(&value)
    }
}

impl From<CanonicalPhone> for String {
    fn from(phone: CanonicalPhone) -> Self {
        phone.0
    }
}

/// Normalize a raw phone number into its canonical form
///
/// Whitespace and display punctuation are dropped, a `00` international
/// prefix becomes `+`, and a missing `+` is added. The result must be a
/// valid E.164 number.
///
/// ```
/// use otp_core::domain::value_objects::normalize;
///
/// let a = normalize("+998 90 123 45 67").unwrap();
/// let b = normalize("+998901234567").unwrap();
/// assert_eq!(a, b);
/// ```
pub fn normalize(raw: &str) -> Result<CanonicalPhone, OtpError> {
    let stripped = strip_phone_formatting(raw.trim()).ok_or(OtpError::InvalidPhone)?;

    let candidate = if let Some(rest) = stripped.strip_prefix("00") {
        format!("+{}", rest)
    } else if stripped.starts_with('+') {
        stripped
    } else {
        format!("+{}", stripped)
    };

    if is_e164(&candidate) {
        Ok(CanonicalPhone(candidate))
    } else {
        Err(OtpError::InvalidPhone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equivalent_inputs_share_one_key() {
        let expected = "+998901234567";
        for raw in [
            "+998 90 123 45 67",
            "+998901234567",
            "998901234567",
            "998-90-123-45-67",
            "(998) 90 123-45-67",
            "00998901234567",
            "  +998.90.123.45.67  ",
        ] {
            assert_eq!(normalize(raw).unwrap().as_str(), expected, "input: {raw:?}");
        }
    }

    #[test]
    fn test_invalid_inputs() {
        for raw in [
            "",
            "   ",
            "+",
            "hello",
            "+998 90 ABC 45 67",
            "+0998901234567",
            "1234567",
            "+1234567890123456",
            "99890+1234567",
        ] {
            assert_eq!(normalize(raw), Err(OtpError::InvalidPhone), "input: {raw:?}");
        }
    }

    #[test]
    fn test_digits_and_mask() {
        let phone = normalize("+998 90 123 45 67").unwrap();
        assert_eq!(phone.digits(), "998901234567");
        assert_eq!(phone.masked(), "+998*****4567");
    }

    #[test]
    fn test_serde_revalidates() {
        let phone = normalize("+998901234567").unwrap();
        let json = serde_json::to_string(&phone).unwrap();
        assert_eq!(json, "\"+998901234567\"");

        let back: CanonicalPhone = serde_json::from_str(&json).unwrap();
        assert_eq!(back, phone);

        assert!(serde_json::from_str::<CanonicalPhone>("\"not a phone\"").is_err());
    }
}
