use serde::{Deserialize, Serialize};

pub const NO_STYLING: &str = "None";

/// A styling library the generated component may use, with the stylesheet
/// the preview has to load for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StylingChoice {
    pub name: String,
    #[serde(default)]
    pub locator: Option<String>,
}

impl StylingChoice {
    pub fn new(name: impl Into<String>, locator: Option<&str>) -> Self {
        Self {
            name: name.into(),
            locator: locator.map(str::to_string),
        }
    }

    pub fn none() -> Self {
        Self::new(NO_STYLING, None)
    }

    pub fn is_none(&self) -> bool {
        self.name == NO_STYLING
    }

    /// Sentence telling the generator which library to style with.
    pub fn directive(&self) -> String {
        if self.is_none() {
            "Use plain CSS for styling. ".to_string()
        } else {
            format!("Use {} for styling. ", self.name)
        }
    }
}

impl Default for StylingChoice {
    fn default() -> Self {
        Self::none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<StylingChoice>", into = "Vec<StylingChoice>")]
pub struct StylingCatalog {
    entries: Vec<StylingChoice>,
}

impl Default for StylingCatalog {
    fn default() -> Self {
        Self::new(vec![
            StylingChoice::none(),
            StylingChoice::new(
                "Bootstrap",
                Some("https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/css/bootstrap.min.css"),
            ),
            StylingChoice::new(
                "Tailwind CSS",
                Some("https://cdn.jsdelivr.net/npm/tailwindcss@2.2.19/dist/tailwind.min.css"),
            ),
            StylingChoice::new(
                "Material UI",
                Some("https://fonts.googleapis.com/css?family=Roboto:300,400,500,700&display=swap"),
            ),
            StylingChoice::new("Bulma", Some("https://cdn.jsdelivr.net/npm/bulma@0.9.4/css/bulma.min.css")),
        ])
    }
}

impl StylingCatalog {
    /// A catalog always offers the unstyled choice first.
    pub fn new(mut entries: Vec<StylingChoice>) -> Self {
        entries.retain(|e| !e.is_none());
        entries.insert(0, StylingChoice::none());
        Self { entries }
    }

    pub fn entries(&self) -> &[StylingChoice] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&StylingChoice> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Like [`StylingCatalog::get`], falling back to the unstyled choice.
    pub fn resolve(&self, name: &str) -> StylingChoice {
        self.get(name).cloned().unwrap_or_default()
    }
}

impl From<Vec<StylingChoice>> for StylingCatalog {
    fn from(entries: Vec<StylingChoice>) -> Self {
        Self::new(entries)
    }
}

impl From<StylingCatalog> for Vec<StylingChoice> {
    fn from(catalog: StylingCatalog) -> Self {
        catalog.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog() {
        let catalog = StylingCatalog::default();
        let names: Vec<&str> = catalog.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["None", "Bootstrap", "Tailwind CSS", "Material UI", "Bulma"]);
        assert_eq!(catalog.get("None").and_then(|e| e.locator.as_deref()), None);
    }

    #[test]
    fn test_unknown_names_fall_back_to_none() {
        let catalog = StylingCatalog::default();
        assert_eq!(catalog.resolve("Foundation"), StylingChoice::none());
        assert_eq!(catalog.resolve("Bulma").name, "Bulma");
    }

    #[test]
    fn test_directive() {
        assert_eq!(StylingChoice::none().directive(), "Use plain CSS for styling. ");
        assert_eq!(
            StylingCatalog::default().resolve("Bootstrap").directive(),
            "Use Bootstrap for styling. "
        );
    }

    #[test]
    fn test_custom_catalog_keeps_none_first() {
        let catalog = StylingCatalog::new(vec![StylingChoice::new("Pico", Some("https://cdn/pico.css"))]);
        assert_eq!(catalog.entries()[0], StylingChoice::none());
        assert_eq!(catalog.entries().len(), 2);
    }
}
