// ABOUTME: Validated configuration snapshot name newtype.
// ABOUTME: Shares the legality predicate with service names.

use super::legal_name;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("configuration name '{0}' is illegal.")]
pub struct IllegalConfigName(pub String);

/// A validated configuration snapshot name.
///
/// The first-character-alphanumeric rule also keeps the reserved pointer
/// entry `_CURRENT` out of the legal namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigName(String);

impl ConfigName {
    pub fn new(value: &str) -> Result<Self, IllegalConfigName> {
        if !legal_name(value) {
            return Err(IllegalConfigName(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
