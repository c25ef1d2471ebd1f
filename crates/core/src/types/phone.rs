//! Phone number type.
//!
//! Cash-on-delivery couriers call the customer before handing over the
//! parcel, so every order carries a phone number.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input contains no digits.
    #[error("phone number cannot be empty")]
    Empty,
    /// The input contains characters other than digits and separators.
    #[error("phone number contains an invalid character: {0:?}")]
    InvalidCharacter(char),
    /// Too few or too many digits.
    #[error("phone number must have between {min} and {max} digits")]
    Length {
        /// Minimum digit count.
        min: usize,
        /// Maximum digit count (E.164).
        max: usize,
    },
}

/// A normalized phone number.
///
/// Spaces, dashes, dots and parentheses are stripped; a single leading `+`
/// is kept. What remains must be 7-15 digits.
///
/// ```
/// use zolar_core::Phone;
///
/// let phone = Phone::parse("+20 (100) 123-4567").unwrap();
/// assert_eq!(phone.as_str(), "+201001234567");
/// assert!(Phone::parse("12-34").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Phone(String);

impl Phone {
    /// Minimum number of digits.
    pub const MIN_DIGITS: usize = 7;
    /// Maximum number of digits (E.164).
    pub const MAX_DIGITS: usize = 15;

    /// Parse and normalize a phone number.
    ///
    /// # Errors
    ///
    /// Returns `PhoneError` if the input is empty, contains letters or other
    /// symbols, or has a digit count outside 7-15.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let s = s.trim();
        let (plus, rest) = s
            .strip_prefix('+')
            .map_or((false, s), |rest| (true, rest));

        let mut digits = String::with_capacity(rest.len() + 1);
        if plus {
            digits.push('+');
        }
        for c in rest.chars() {
            match c {
                '0'..='9' => digits.push(c),
                ' ' | '-' | '.' | '(' | ')' => {}
                other => return Err(PhoneError::InvalidCharacter(other)),
            }
        }

        let count = digits.chars().filter(char::is_ascii_digit).count();
        if count == 0 {
            return Err(PhoneError::Empty);
        }
        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&count) {
            return Err(PhoneError::Length {
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

    /// Consumes the `Phone` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Phone {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_separators() {
        assert_eq!(
            Phone::parse("0100 123 4567").unwrap().as_str(),
            "01001234567"
        );
        assert_eq!(
            Phone::parse("(010) 012-34.567").unwrap().as_str(),
            "01001234567"
        );
    }

    #[test]
    fn test_parse_keeps_leading_plus() {
        assert_eq!(
            Phone::parse(" +20 100 123 4567 ").unwrap().as_str(),
            "+201001234567"
        );
    }

    #[test]
    fn test_parse_rejects_letters() {
        assert_eq!(
            Phone::parse("0100-CALL-ME"),
            Err(PhoneError::InvalidCharacter('C'))
        );
        assert_eq!(
            Phone::parse("++201001234567"),
            Err(PhoneError::InvalidCharacter('+'))
        );
    }

    #[test]
    fn test_parse_length_bounds() {
        assert_eq!(Phone::parse(""), Err(PhoneError::Empty));
        assert_eq!(Phone::parse("+ -"), Err(PhoneError::Empty));
        assert!(matches!(Phone::parse("123456"), Err(PhoneError::Length { .. })));
        assert!(Phone::parse("1234567").is_ok());
        assert!(Phone::parse("123456789012345").is_ok());
        assert!(matches!(
            Phone::parse("1234567890123456"),
            Err(PhoneError::Length { .. })
        ));
    }
}
