use crate::events::{EventType, HandlerId};
use crate::node::{DomNode, Element};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The designated container a preview is mounted into.
///
/// Only the mount manager writes to it; everything else reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MountTarget {
    pub id: Uuid,
    pub name: String,
    children: Vec<DomNode>,
}

impl MountTarget {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            children: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.children.clear();
    }

    pub fn append(&mut self, node: DomNode) {
        self.children.push(node);
    }

    pub fn children(&self) -> &[DomNode] {
        &self.children
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn text_content(&self) -> String {
        self.children.iter().map(DomNode::text_content).collect()
    }

    pub fn find_element(&self, id: Uuid) -> Option<&Element> {
        self.children.iter().find_map(|c| c.find_element(id))
    }

    /// All elements with the given tag, in document order.
    pub fn elements_by_tag(&self, tag: &str) -> Vec<&Element> {
        let mut out = Vec::new();
        for child in &self.children {
            child.collect_by_tag(tag, &mut out);
        }
        out
    }

    /// Handler bound to `event` on the element with `id`, if both exist.
    pub fn listener(&self, id: Uuid, event: EventType) -> Option<HandlerId> {
        self.find_element(id).and_then(|e| e.listener(event))
    }

    /// Every handler referenced by the mounted tree.
    pub fn handlers(&self) -> Vec<HandlerId> {
        let mut out = Vec::new();
        for child in &self.children {
            child.collect_handlers(&mut out);
        }
        out
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.children).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_and_append() {
        let mut target = MountTarget::new("root");
        target.append(DomNode::text("stale"));
        target.clear();
        assert!(target.is_empty());

        let button = Element::new("button").with_text("Go");
        let id = button.id;
        target.append(button.into());
        assert_eq!(target.text_content(), "Go");
        assert_eq!(target.find_element(id).map(|e| e.tag.as_str()), Some("button"));
    }

    #[test]
    fn test_elements_by_tag_in_document_order() {
        let mut target = MountTarget::new("root");
        target.append(
            Element::new("ul")
                .with_child(Element::new("li").with_text("a"))
                .with_child(Element::new("li").with_text("b"))
                .into(),
        );
        let items: Vec<String> = target
            .elements_by_tag("li")
            .iter()
            .map(|e| e.text_content())
            .collect();
        assert_eq!(items, vec!["a", "b"]);
    }
}
