use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Raw output of the generation service for one request. Replaced wholesale,
/// never edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceText(Arc<str>);

impl SourceText {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SourceText {
    fn default() -> Self {
        Self::new("")
    }
}

impl From<&str> for SourceText {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SourceText {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for SourceText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
