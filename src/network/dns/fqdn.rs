use crate::error::{DnsError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MAX_NAME_LENGTH: usize = 253;
const MAX_LABEL_LENGTH: usize = 63;

/// A fully-qualified domain name.
///
/// Stored lowercased with a trailing dot, so the derived ordering is the lexicographic order
/// of the name written with a trailing dot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fqdn(String);

impl Fqdn {
    /// Parses and canonicalizes a domain name. A missing trailing dot is added.
    ///
    /// ### Arguments
    /// - `name` - the domain name, with or without a trailing dot
    pub fn new(name: &str) -> Result<Self> {
        let trimmed = name.strip_suffix('.').unwrap_or(name);

        if trimmed.is_empty() {
            if name == "." {
                return Ok(Self::root());
            }
            return Err(DnsError::Parse(format!("empty domain name {name:?}")));
        }

        if trimmed.len() > MAX_NAME_LENGTH {
            return Err(DnsError::Parse(format!("domain name {name:?} is too long")));
        }

        for label in trimmed.split('.') {
            if label.is_empty() || label.len() > MAX_LABEL_LENGTH {
                return Err(DnsError::Parse(format!(
                    "domain name {name:?} has an invalid label"
                )));
            }
            if label.starts_with('-') || label.ends_with('-') {
                return Err(DnsError::Parse(format!(
                    "label {label:?} of {name:?} starts or ends with a hyphen"
                )));
            }
            if !label
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
            {
                return Err(DnsError::Parse(format!(
                    "label {label:?} of {name:?} contains invalid characters"
                )));
            }
        }

        Ok(Self(format!("{}.", trimmed.to_ascii_lowercase())))
    }

    /// The DNS root, `"."`.
    pub fn root() -> Self {
        Self(".".to_owned())
    }

    pub fn is_root(&self) -> bool {
        self.0 == "."
    }

    pub fn with_trailing_dot(&self) -> &str {
        &self.0
    }

    pub fn without_trailing_dot(&self) -> &str {
        if self.is_root() {
            return &self.0;
        }
        &self.0[..self.0.len() - 1]
    }
}

impl fmt::Display for Fqdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.without_trailing_dot())
    }
}

impl FromStr for Fqdn {
    type Err = DnsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for Fqdn {
    type Error = DnsError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<Fqdn> for String {
    fn from(value: Fqdn) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::Fqdn;
    use rstest::rstest;

    #[rstest]
    #[case("example.com", "example.com.")]
    #[case("example.com.", "example.com.")]
    #[case("Corp.Example.COM", "corp.example.com.")]
    #[case(".", ".")]
    #[case("_tcp.example.com", "_tcp.example.com.")]
    fn test_canonical_form(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(Fqdn::new(input).unwrap().with_trailing_dot(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("a..b")]
    #[case("-bad.example.com")]
    #[case("bad-.example.com")]
    #[case("spa ce.example.com")]
    fn test_invalid_names(#[case] input: &str) {
        assert!(Fqdn::new(input).is_err());
    }

    #[test]
    fn test_invalid_name_message() {
        let err = Fqdn::new("-bad.example.com").unwrap_err();
        assert_eq!(
            err.to_string(),
            "parse error: label \"-bad\" of \"-bad.example.com\" starts or ends with a hyphen"
        );
    }

    #[test]
    fn test_label_length_limit() {
        let long_label = "a".repeat(64);
        assert!(Fqdn::new(&format!("{long_label}.com")).is_err());
        assert!(Fqdn::new(&format!("{}.com", "a".repeat(63))).is_ok());
    }

    #[test]
    fn test_ordering_uses_trailing_dot() {
        // "a-b." < "a." because '-' (0x2d) sorts before '.' (0x2e).
        let a = Fqdn::new("a").unwrap();
        let a_b = Fqdn::new("a-b").unwrap();
        assert!(a_b < a);
        assert_eq!(a.without_trailing_dot(), "a");
        assert_eq!(Fqdn::root().without_trailing_dot(), ".");
    }
}
