use crate::events::{EventType, HandlerId, Listener};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DomNode {
    Element(Element),
    Text(String),
}

impl DomNode {
    pub fn text(s: impl Into<String>) -> Self {
        DomNode::Text(s.into())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            DomNode::Element(e) => Some(e),
            DomNode::Text(_) => None,
        }
    }

    /// Concatenated text of this node and all descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            DomNode::Text(s) => out.push_str(s),
            DomNode::Element(e) => {
                for child in &e.children {
                    child.collect_text(out);
                }
            }
        }
    }

    pub fn find_element(&self, id: Uuid) -> Option<&Element> {
        match self {
            DomNode::Text(_) => None,
            DomNode::Element(e) if e.id == id => Some(e),
            DomNode::Element(e) => e.children.iter().find_map(|c| c.find_element(id)),
        }
    }

    pub(crate) fn collect_by_tag<'a>(&'a self, tag: &str, out: &mut Vec<&'a Element>) {
        if let DomNode::Element(e) = self {
            if e.tag.eq_ignore_ascii_case(tag) {
                out.push(e);
            }
            for child in &e.children {
                child.collect_by_tag(tag, out);
            }
        }
    }

    pub(crate) fn collect_handlers(&self, out: &mut Vec<HandlerId>) {
        if let DomNode::Element(e) = self {
            out.extend(e.listeners.iter().map(|l| l.handler));
            for child in &e.children {
                child.collect_handlers(out);
            }
        }
    }
}

impl From<Element> for DomNode {
    fn from(e: Element) -> Self {
        DomNode::Element(e)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: Uuid,
    pub tag: String,
    /// Attribute order follows the order props were written.
    pub attributes: Vec<(String, String)>,
    #[serde(default)]
    pub listeners: Vec<Listener>,
    #[serde(default)]
    pub children: Vec<DomNode>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tag: tag.into(),
            attributes: Vec::new(),
            listeners: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_child(mut self, child: impl Into<DomNode>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_child(DomNode::Text(text.into()))
    }

    /// Sets an attribute, replacing an earlier value of the same name in place.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn add_listener(&mut self, event: EventType, handler: HandlerId) {
        self.listeners.retain(|l| l.event != event);
        self.listeners.push(Listener { event, handler });
    }

    pub fn listener(&self, event: EventType) -> Option<HandlerId> {
        self.listeners
            .iter()
            .find(|l| l.event == event)
            .map(|l| l.handler)
    }

    pub fn class_list(&self) -> Vec<&str> {
        self.attribute("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn text_content(&self) -> String {
        self.children.iter().map(DomNode::text_content).collect()
    }
}

impl From<&str> for DomNode {
    fn from(s: &str) -> Self {
        DomNode::Text(s.to_string())
    }
}

impl From<String> for DomNode {
    fn from(s: String) -> Self {
        DomNode::Text(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_attribute_replaces_in_place() {
        let mut e = Element::new("div")
            .with_attribute("id", "a")
            .with_attribute("class", "x");
        e.set_attribute("id", "b");
        assert_eq!(
            e.attributes,
            vec![("id".to_string(), "b".to_string()), ("class".to_string(), "x".to_string())]
        );
    }

    #[test]
    fn test_text_content_is_recursive() {
        let node: DomNode = Element::new("p")
            .with_text("Count: ")
            .with_child(Element::new("b").with_text("3"))
            .into();
        assert_eq!(node.text_content(), "Count: 3");
    }

    #[test]
    fn test_listener_replaced_per_event() {
        let mut e = Element::new("button");
        e.add_listener(EventType::Click, HandlerId(1));
        e.add_listener(EventType::Click, HandlerId(2));
        assert_eq!(e.listeners.len(), 1);
        assert_eq!(e.listener(EventType::Click), Some(HandlerId(2)));
    }
}
