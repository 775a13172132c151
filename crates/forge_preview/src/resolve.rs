//! Locating the component a block of source defines.
//!
//! Matchers run in order and the first hit wins. Resolution only names an
//! existing symbol; it never declares or renames one.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Name used when the source declares no component the matchers recognise.
pub const CONVENTIONAL_NAME: &str = "App";

static FUNCTION_DECLARATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"function\s+([A-Za-z0-9_]+)\s*\(").expect("Invalid function regex"));

static NAMED_BINDING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:const|let|var)\s+([A-Za-z0-9_]+)\s*=\s*(?:function|\()").expect("Invalid binding regex")
});

static CONVENTIONAL_BINDING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:function|class|const|let|var)\s+App\b").expect("Invalid App binding regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolvedIdentifier {
    /// Found by a declaration matcher.
    Declared(String),
    /// Fallback to the conventional name. Only valid if the run itself
    /// defines it, which is checked after execution.
    Conventional(String),
    Unresolved,
}

impl ResolvedIdentifier {
    pub fn name(&self) -> Option<&str> {
        match self {
            ResolvedIdentifier::Declared(name) | ResolvedIdentifier::Conventional(name) => Some(name),
            ResolvedIdentifier::Unresolved => None,
        }
    }
}

impl fmt::Display for ResolvedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedIdentifier::Declared(name) => f.write_str(name),
            ResolvedIdentifier::Conventional(name) => write!(f, "{} (conventional)", name),
            ResolvedIdentifier::Unresolved => f.write_str("<unresolved>"),
        }
    }
}

pub fn resolve_identifier(source: &str) -> ResolvedIdentifier {
    let matchers: [&LazyLock<Regex>; 2] = [&FUNCTION_DECLARATION, &NAMED_BINDING];
    for matcher in matchers {
        if let Some(name) = matcher.captures(source).and_then(|c| c.get(1)) {
            return ResolvedIdentifier::Declared(name.as_str().to_string());
        }
    }
    if CONVENTIONAL_BINDING.is_match(source) {
        return ResolvedIdentifier::Conventional(CONVENTIONAL_NAME.to_string());
    }
    ResolvedIdentifier::Unresolved
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_declaration() {
        assert_eq!(
            resolve_identifier("function Foo(){ return null; }"),
            ResolvedIdentifier::Declared("Foo".to_string())
        );
    }

    #[test]
    fn test_arrow_and_function_bindings() {
        assert_eq!(
            resolve_identifier("const Bar = () => null;"),
            ResolvedIdentifier::Declared("Bar".to_string())
        );
        assert_eq!(
            resolve_identifier("let Baz = function () { return null; };"),
            ResolvedIdentifier::Declared("Baz".to_string())
        );
    }

    #[test]
    fn test_function_declarations_win_over_bindings() {
        let source = "const helper = (x) => x;\nfunction Card() { return null; }";
        assert_eq!(resolve_identifier(source).name(), Some("Card"));
    }

    #[test]
    fn test_conventional_name_needs_a_binding() {
        assert_eq!(
            resolve_identifier("const App = <div />;"),
            ResolvedIdentifier::Conventional("App".to_string())
        );
        assert_eq!(resolve_identifier("render(App);"), ResolvedIdentifier::Unresolved);
        assert_eq!(resolve_identifier("const Application = 1;"), ResolvedIdentifier::Unresolved);
    }

    #[test]
    fn test_plain_values_are_unresolved() {
        assert_eq!(resolve_identifier("const x = 5;"), ResolvedIdentifier::Unresolved);
        assert_eq!(resolve_identifier(""), ResolvedIdentifier::Unresolved);
    }
}
