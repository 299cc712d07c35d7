// ABOUTME: Validated service name newtype.
// ABOUTME: Names must start alphanumeric and contain no whitespace.

use super::legal_name;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("service name '{0}' is illegal.")]
pub struct IllegalServiceName(pub String);

/// A validated service name. The name doubles as the container name and the
/// per-service directory name, so validation happens before any side effect.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceName(String);

impl ServiceName {
    pub fn new(value: &str) -> Result<Self, IllegalServiceName> {
        if !legal_name(value) {
            return Err(IllegalServiceName(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
