//! Removal of the markdown fences generation services wrap code in.

use regex::Regex;
use std::sync::LazyLock;

/// A run of three or more backticks, optionally followed by a language tag.
/// Known tags are stripped anywhere; any other word only when it ends the line.
static FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?mi)`{3,}(?:(?:jsx|javascript|js|react|tsx|typescript|ts)\b|[A-Za-z0-9_+#.\-]+[ \t]*$)?",
    )
    .expect("Invalid fence regex")
});

/// Strips every fence marker and trims surrounding whitespace.
pub fn normalize(raw: &str) -> String {
    FENCE.replace_all(raw, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_language_fences() {
        let raw = "```jsx\nfunction A() { return null; }\n```";
        assert_eq!(normalize(raw), "function A() { return null; }");
    }

    #[test]
    fn test_strips_fences_mid_text() {
        let raw = "Here you go:\n```javascript\nconst x = 1;\n```\nEnjoy";
        assert_eq!(normalize(raw), "Here you go:\n\nconst x = 1;\n\nEnjoy");
    }

    #[test]
    fn test_uppercase_and_unknown_tags() {
        assert_eq!(normalize("```JSX\nx\n```"), "x");
        assert_eq!(normalize("```html\n<p/>\n```"), "<p/>");
    }

    #[test]
    fn test_empty_in_empty_out() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("  \n ```\n "), "");
    }

    #[test]
    fn test_inline_code_is_kept() {
        assert_eq!(normalize("const s = `a${b}`;"), "const s = `a${b}`;");
    }
}
