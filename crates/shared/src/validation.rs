//! Common validation utilities.

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

/// Required first character of a routable external identity.
pub const EXTERNAL_ID_PREFIX: char = 'U';

/// Total length of a routable external identity (prefix + 32 hex digits).
pub const EXTERNAL_ID_LENGTH: usize = 33;

lazy_static! {
    static ref EXTERNAL_ID_REGEX: Regex =
        Regex::new(r"^U[0-9a-fA-F]{32}$").expect("external id pattern is valid");
}

/// Returns true if `id` has the shape of a push-routable external identity.
///
/// Surrounding whitespace is ignored. Anything else (wrong length, wrong
/// prefix, non-hex body) is unroutable for notification purposes even if the
/// identity is accepted elsewhere.
pub fn is_valid_external_id(id: &str) -> bool {
    let id = id.trim();
    id.len() == EXTERNAL_ID_LENGTH && EXTERNAL_ID_REGEX.is_match(id)
}

/// Splits `ids` into routable identities and a count of skipped ones.
///
/// Returned identities are trimmed. Blank and malformed entries are counted
/// in the second element.
pub fn filter_valid_external_ids<I, S>(ids: I) -> (Vec<String>, usize)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut valid = Vec::new();
    let mut skipped = 0;
    for id in ids {
        let id = id.as_ref().trim();
        if is_valid_external_id(id) {
            valid.push(id.to_string());
        } else {
            skipped += 1;
        }
    }
    (valid, skipped)
}

/// Rejects strings that are empty or whitespace only.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "U0123456789abcdef0123456789ABCDEF";

    #[test]
    fn test_valid_external_id() {
        assert_eq!(VALID.len(), EXTERNAL_ID_LENGTH);
        assert!(is_valid_external_id(VALID));
    }

    #[test]
    fn test_external_id_is_trimmed() {
        assert!(is_valid_external_id(&format!("  {}\n", VALID)));
    }

    #[test]
    fn test_external_id_wrong_prefix() {
        let id = format!("X{}", &VALID[1..]);
        assert!(!is_valid_external_id(&id));
        let lower = format!("u{}", &VALID[1..]);
        assert!(!is_valid_external_id(&lower));
    }

    #[test]
    fn test_external_id_wrong_length() {
        assert!(!is_valid_external_id(&VALID[..32]));
        assert!(!is_valid_external_id(&format!("{}0", VALID)));
        assert!(!is_valid_external_id(""));
    }

    #[test]
    fn test_external_id_non_hex_body() {
        let id = format!("U{}", "g".repeat(32));
        assert!(!is_valid_external_id(&id));
    }

    #[test]
    fn test_external_id_rejects_non_ascii() {
        // 33 bytes but contains a multibyte char
        let id = format!("U{}é", "a".repeat(30));
        assert!(!is_valid_external_id(&id));
    }

    #[test]
    fn test_filter_one_valid_two_malformed() {
        let (valid, skipped) = filter_valid_external_ids(vec![VALID, "dev-user", ""]);
        assert_eq!(valid, vec![VALID.to_string()]);
        assert_eq!(skipped, 2);
    }

    #[test]
    fn test_filter_all_valid() {
        let other = "Uffffffffffffffffffffffffffffffff";
        let (valid, skipped) = filter_valid_external_ids([VALID, other]);
        assert_eq!(valid.len(), 2);
        assert_eq!(skipped, 0);
    }

    #[test]
    fn test_filter_empty_input() {
        let (valid, skipped) = filter_valid_external_ids(Vec::<String>::new());
        assert!(valid.is_empty());
        assert_eq!(skipped, 0);
    }

    #[test]
    fn test_validate_not_blank() {
        assert!(validate_not_blank("Cafe crew").is_ok());
        assert!(validate_not_blank("   ").is_err());
        let err = validate_not_blank("").unwrap_err();
        assert_eq!(err.message.unwrap().to_string(), "Value must not be blank");
    }
}
