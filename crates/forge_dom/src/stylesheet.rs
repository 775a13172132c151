use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StylesheetLink {
    pub id: Uuid,
    pub locator: String,
}

/// Stylesheet links attached to the hosting document.
///
/// Append-only: a link is never removed once injected, and the same locator
/// is never injected twice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StylesheetRegistry {
    links: Vec<StylesheetLink>,
}

impl StylesheetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when a new link was attached.
    pub fn inject(&mut self, locator: &str) -> bool {
        if locator.is_empty() || self.contains(locator) {
            return false;
        }
        self.links.push(StylesheetLink {
            id: Uuid::new_v4(),
            locator: locator.to_string(),
        });
        true
    }

    pub fn contains(&self, locator: &str) -> bool {
        self.links.iter().any(|l| l.locator == locator)
    }

    pub fn links(&self) -> &[StylesheetLink] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inject_deduplicates() {
        let mut registry = StylesheetRegistry::new();
        assert!(registry.inject("https://cdn.example/a.css"));
        assert!(!registry.inject("https://cdn.example/a.css"));
        assert!(registry.inject("https://cdn.example/b.css"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_empty_locator_is_ignored() {
        let mut registry = StylesheetRegistry::new();
        assert!(!registry.inject(""));
        assert!(registry.is_empty());
    }
}
