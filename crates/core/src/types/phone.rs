//! Phone number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`PhoneNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input string is empty.
    #[error("phone number cannot be empty")]
    Empty,
    /// The input contains something other than digits and separators.
    #[error("phone number may only contain digits, spaces, dashes, parentheses and a leading +")]
    InvalidCharacter,
    /// Too few or too many digits.
    #[error("phone number must have between {min} and {max} digits")]
    InvalidLength {
        /// Minimum digit count.
        min: usize,
        /// Maximum digit count.
        max: usize,
    },
}

/// A phone number, normalized to `+` followed by digits.
///
/// ## Constraints
///
/// - 5-15 digits (E.164 upper bound)
/// - An optional leading `+`
/// - Spaces, dashes and parentheses are accepted and stripped
///
/// ## Examples
///
/// ```
/// use petal_core::PhoneNumber;
///
/// assert_eq!(PhoneNumber::parse("+7 (912) 345-67-89").unwrap().as_str(), "+79123456789");
/// assert_eq!(PhoneNumber::parse("79123456789").unwrap().as_str(), "+79123456789");
///
/// assert!(PhoneNumber::parse("").is_err());
/// assert!(PhoneNumber::parse("call me").is_err());
/// assert!(PhoneNumber::parse("123").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Minimum number of digits.
    pub const MIN_DIGITS: usize = 5;
    /// Maximum number of digits (E.164).
    pub const MAX_DIGITS: usize = 15;

    /// Parse and normalize a phone number.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, contains letters or other
    /// symbols, or has a digit count outside 5-15.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PhoneError::Empty);
        }

        let body = trimmed.strip_prefix('+').unwrap_or(trimmed);
        let mut digits = String::with_capacity(body.len() + 1);
        digits.push('+');
        for c in body.chars() {
            match c {
                '0'..='9' => digits.push(c),
                ' ' | '-' | '(' | ')' => {}
                _ => return Err(PhoneError::InvalidCharacter),
            }
        }

        let count = digits.len() - 1;
        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&count) {
            return Err(PhoneError::InvalidLength {
                min: Self::MIN_DIGITS,
                max: Self::MAX_DIGITS,
            });
        }

        Ok(Self(digits))
    }

    /// Returns the normalized number.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes `self` and returns the inner `String`.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_separators() {
        let phone = PhoneNumber::parse(" +1 (555) 010-9999 ");
        assert_eq!(phone.map(PhoneNumber::into_inner), Ok("+15550109999".to_string()));
    }

    #[test]
    fn test_rejects_letters() {
        assert_eq!(PhoneNumber::parse("555-CALL-NOW"), Err(PhoneError::InvalidCharacter));
    }

    #[test]
    fn test_rejects_double_plus() {
        assert_eq!(PhoneNumber::parse("++15550109999"), Err(PhoneError::InvalidCharacter));
    }

    #[test]
    fn test_length_bounds() {
        assert!(PhoneNumber::parse("12345").is_ok());
        assert!(PhoneNumber::parse("1234").is_err());
        assert!(PhoneNumber::parse("1234567890123456").is_err());
    }
}
