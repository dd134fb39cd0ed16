//! Credential comparison helpers.

use subtle::ConstantTimeEq;

/// Compares two secrets without leaking the position of the first mismatch.
///
/// Inputs of different length compare unequal; only the length itself is
/// observable through timing.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Masks a secret for log output, keeping only its length.
pub fn redact(secret: &str) -> String {
    format!("<redacted:{}>", secret.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_eq_matches() {
        assert!(constant_time_eq("dev-secret", "dev-secret"));
    }

    #[test]
    fn test_constant_time_eq_mismatch_same_length() {
        assert!(!constant_time_eq("dev-secret", "dev-secreT"));
    }

    #[test]
    fn test_constant_time_eq_different_length() {
        assert!(!constant_time_eq("dev-secret", "dev-secret-2"));
        assert!(!constant_time_eq("", "x"));
    }

    #[test]
    fn test_constant_time_eq_empty() {
        assert!(constant_time_eq("", ""));
    }

    #[test]
    fn test_redact_hides_content() {
        let masked = redact("super-secret");
        assert_eq!(masked, "<redacted:12>");
        assert!(!masked.contains("super"));
    }
}
