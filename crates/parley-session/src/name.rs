//! Display name rules.

use crate::SessionError;

/// Shortest accepted display name, in characters.
pub const MIN_NAME_LEN: usize = 4;
/// Longest accepted display name, in characters.
pub const MAX_NAME_LEN: usize = 15;

/// Checks a requested display name.
///
/// Length is counted in Unicode scalar values, so `"Jörg"` is four
/// characters even though it is five bytes.
pub fn validate_name(name: &str) -> Result<(), SessionError> {
    let len = name.chars().count();
    if (MIN_NAME_LEN..=MAX_NAME_LEN).contains(&len) {
        Ok(())
    } else {
        Err(SessionError::NameLength { len })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name_bounds_inclusive() {
        assert!(validate_name("abcd").is_ok());
        assert!(validate_name("abcdefghijklmno").is_ok());
    }

    #[test]
    fn test_validate_name_too_short_returns_length() {
        let result = validate_name("abc");
        assert!(matches!(result, Err(SessionError::NameLength { len: 3 })));
        assert!(validate_name("").is_err());
    }

    #[test]
    fn test_validate_name_too_long_returns_length() {
        let result = validate_name("abcdefghijklmnop");
        assert!(matches!(result, Err(SessionError::NameLength { len: 16 })));
    }

    #[test]
    fn test_validate_name_counts_characters_not_bytes() {
        assert!(validate_name("Jörg").is_ok());
        assert!(validate_name("ééééééééééééééé").is_ok());
    }
}
