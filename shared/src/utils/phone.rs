//! Phone number utilities

use once_cell::sync::Lazy;
use regex::Regex;

// International phone number regex (E.164 format, 8 to 15 digits)
static E164_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+[1-9]\d{7,14}$").unwrap());

/// Characters people use to format phone numbers for display
fn is_formatting_char(c: char) -> bool {
    c.is_whitespace() || matches!(c, '-' | '(' | ')' | '.' | '/')
}

/// Strip formatting characters from a phone number
///
/// Returns `None` when the input contains anything other than digits,
/// formatting characters and a single leading `+`.
pub fn strip_phone_formatting(phone: &str) -> Option<String> {
    let mut out = String::with_capacity(phone.len());
    for c in phone.chars() {
        if c.is_ascii_digit() {
            out.push(c);
        } else if c == '+' {
            if !out.is_empty() {
                return None;
            }
            out.push(c);
        } else if !is_formatting_char(c) {
            return None;
        }
    }
    Some(out)
}

/// Check if a phone number is in E.164 format (no formatting allowed)
pub fn is_e164(phone: &str) -> bool {
    E164_REGEX.is_match(phone)
}

/// Mask a phone number for logs (e.g., +998*****4567)
pub fn mask_phone_number(phone: &str) -> String {
    let digits = phone.trim_start_matches('+');
    if digits.len() < 7 {
        return "****".to_string();
    }
    let prefix = if phone.starts_with('+') { "+" } else { "" };
    format!(
        "{}{}{}{}",
        prefix,
        &digits[..3],
        "*".repeat(digits.len() - 7),
        &digits[digits.len() - 4..]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_phone_formatting() {
        assert_eq!(
            strip_phone_formatting("+998 90 123 45 67").as_deref(),
            Some("+998901234567")
        );
        assert_eq!(
            strip_phone_formatting("(998) 90-123.45/67").as_deref(),
            Some("998901234567")
        );
        assert_eq!(strip_phone_formatting("+998\t90 1234567").as_deref(), Some("+998901234567"));
    }

    #[test]
    fn test_strip_rejects_foreign_characters() {
        assert_eq!(strip_phone_formatting("+998 90 ABC 45 67"), None);
        assert_eq!(strip_phone_formatting("998+901234567"), None);
        assert_eq!(strip_phone_formatting("++998901234567"), None);
        assert_eq!(strip_phone_formatting("+998901234567#"), None);
    }

    #[test]
    fn test_is_e164() {
        assert!(is_e164("+998901234567"));
        assert!(is_e164("+14155552671"));
        assert!(!is_e164("998901234567")); // Missing +
        assert!(!is_e164("+0123456789")); // Invalid country code
        assert!(!is_e164("+1234567")); // Too short
        assert!(!is_e164("+1234567890123456")); // Too long
    }

    #[test]
    fn test_mask_phone_number() {
        assert_eq!(mask_phone_number("+998901234567"), "+998*****4567");
        assert_eq!(mask_phone_number("14155552671"), "141****2671");
        assert_eq!(mask_phone_number("12345"), "****");
    }
}
