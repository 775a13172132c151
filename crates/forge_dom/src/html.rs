//! HTML serialization of mounted trees.

use crate::node::{DomNode, Element};
use crate::stylesheet::StylesheetRegistry;
use crate::target::MountTarget;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(tag))
}

pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn escape_attribute(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn render_node(node: &DomNode) -> String {
    let mut out = String::new();
    write_node(node, &mut out);
    out
}

pub fn render_nodes(nodes: &[DomNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(node, &mut out);
    }
    out
}

fn write_node(node: &DomNode, out: &mut String) {
    match node {
        DomNode::Text(s) => out.push_str(&escape_text(s)),
        DomNode::Element(e) => write_element(e, out),
    }
}

fn write_element(element: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&element.tag);
    for (name, value) in &element.attributes {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape_attribute(value));
        out.push('"');
    }
    out.push('>');

    if is_void_element(&element.tag) {
        return;
    }

    for child in &element.children {
        write_node(child, out);
    }
    out.push_str("</");
    out.push_str(&element.tag);
    out.push('>');
}

/// A standalone document: injected stylesheets in the head, the mount
/// target's content inside a `<div id=...>` in the body.
pub fn render_page(title: &str, stylesheets: &StylesheetRegistry, target: &MountTarget) -> String {
    let mut head = String::new();
    for link in stylesheets.links() {
        head.push_str(&format!(
            "    <link rel=\"stylesheet\" href=\"{}\">\n",
            escape_attribute(&link.locator)
        ));
    }

    format!(
        "<!DOCTYPE html>\n<html>\n  <head>\n    <meta charset=\"utf-8\">\n    <title>{}</title>\n{}  </head>\n  <body>\n    <div id=\"{}\">{}</div>\n  </body>\n</html>\n",
        escape_text(title),
        head,
        escape_attribute(&target.name),
        render_nodes(target.children()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_escapes_text_and_attributes() {
        let node: DomNode = Element::new("a")
            .with_attribute("title", "say \"hi\"")
            .with_text("1 < 2 & 3")
            .into();
        assert_eq!(
            render_node(&node),
            "<a title=\"say &quot;hi&quot;\">1 &lt; 2 &amp; 3</a>"
        );
    }

    #[test]
    fn test_void_elements_have_no_closing_tag() {
        let node: DomNode = Element::new("input").with_attribute("type", "text").into();
        assert_eq!(render_node(&node), "<input type=\"text\">");
    }
}
