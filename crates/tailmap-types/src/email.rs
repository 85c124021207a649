//! validated email address type
//!
//! uses the `email_address` crate for RFC-compliant validation. policy
//! identities additionally need a dotted domain with an alphabetic top-level
//! label, so `user@localhost` is rejected.

use std::fmt;
use std::str::FromStr;

use email_address::EmailAddress;
use serde::{Deserialize, Serialize};

/// a validated email address
///
/// wraps `email_address::EmailAddress` with serde integration that validates
/// during deserialisation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Email(EmailAddress);

impl Email {
    /// create a new Email, validating the format
    pub fn new(s: &str) -> Result<Self, EmailError> {
        let addr = EmailAddress::from_str(s).map_err(|_| EmailError::Invalid)?;
        if !has_dotted_domain(addr.domain()) {
            return Err(EmailError::Invalid);
        }
        Ok(Self(addr))
    }

    /// check whether a string is a valid email without keeping the value
    pub fn is_valid(s: &str) -> bool {
        Self::new(s).is_ok()
    }

    /// get the email as a string slice
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// the domain part (after `@`)
    pub fn domain(&self) -> &str {
        self.0.domain()
    }
}

// the top-level label must be at least two ascii letters
fn has_dotted_domain(domain: &str) -> bool {
    let Some((rest, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !rest.is_empty() && tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic())
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// serde: deserialize with validation
impl<'de> Deserialize<'de> for Email {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Email::new(&s).map_err(serde::de::Error::custom)
    }
}

impl Serialize for Email {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.as_str().serialize(serializer)
    }
}

/// error type for email validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    /// email format is invalid
    Invalid,
}

impl fmt::Display for EmailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmailError::Invalid => write!(f, "invalid email format"),
        }
    }
}

impl std::error::Error for EmailError {}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn generated_addresses_accepted(addr in "[a-z]{1,10}@[a-z]{1,10}\\.[a-z]{2,4}") {
            prop_assert!(Email::is_valid(&addr));
        }

        #[test]
        fn arbitrary_string_never_panics(s in ".*") {
            let _ = Email::new(&s);
        }
    }
}
