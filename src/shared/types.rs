use crate::shared::constants::dos::ODS5_LENGTH;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Organisation Data Service code identifying an NHS organisation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct OdsCode(pub String);

impl OdsCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First five characters, or the whole code when it is shorter
    pub fn ods5(&self) -> &str {
        ods5(&self.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for OdsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OdsCode {
    fn from(code: &str) -> Self {
        Self(code.to_string())
    }
}

pub fn ods5(code: &str) -> &str {
    match code.char_indices().nth(ODS5_LENGTH) {
        Some((idx, _)) => &code[..idx],
        None => code,
    }
}

/// Correlation id that follows an event through every stage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
