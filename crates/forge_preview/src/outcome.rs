//! Pipeline results and the error panels shown in place of a preview.

use forge_dom::{DomNode, Element};
use forge_runtime::ElementValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    SyntaxError,
    NotFound,
    RuntimeError,
    RenderError,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::SyntaxError => "SyntaxError",
            FailureKind::NotFound => "NotFound",
            FailureKind::RuntimeError => "RuntimeError",
            FailureKind::RenderError => "RenderError",
        }
    }

    /// Heading of the error panel.
    pub fn title(&self) -> &'static str {
        match self {
            FailureKind::SyntaxError => "Syntax error in generated code",
            FailureKind::NotFound => "Component not found in the generated code",
            FailureKind::RuntimeError => "Error in component",
            FailureKind::RenderError => "Error rendering component",
        }
    }

    /// What the user can do about it.
    pub fn hint(&self) -> &'static str {
        match self {
            FailureKind::SyntaxError => {
                "The generated code contains syntax errors. Try generating again with a more specific prompt."
            }
            FailureKind::NotFound => "Make sure your prompt asks for a component declared as a named function.",
            FailureKind::RuntimeError => "Check the code tab and modify your prompt to fix this issue.",
            FailureKind::RenderError => "The component failed while rendering. Try describing simpler logic.",
        }
    }

    /// A missing component is a warning; everything else is an error.
    pub fn panel_class(&self) -> &'static str {
        match self {
            FailureKind::NotFound => "alert alert-warning",
            _ => "alert alert-danger",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The attention-coded panel mounted in place of the preview.
    pub fn panel(&self) -> DomNode {
        let mut heading = Element::new("strong").with_text(self.kind.title());
        if !self.message.is_empty() {
            heading = heading.with_text(":");
        }
        let mut panel = Element::new("div")
            .with_attribute("class", self.kind.panel_class())
            .with_attribute("role", "alert")
            .with_attribute("data-failure", self.kind.as_str())
            .with_child(heading);
        if !self.message.is_empty() {
            panel = panel.with_text(format!(" {}", self.message));
        }
        panel
            .with_child(Element::new("br"))
            .with_child(Element::new("small").with_text(self.kind.hint()))
            .into()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

/// Result of executing a unit: a renderable element or a failure.
#[derive(Debug, Clone)]
pub enum PreviewOutcome {
    Rendered(Rc<ElementValue>),
    Failed(Failure),
}

impl PreviewOutcome {
    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        PreviewOutcome::Failed(Failure::new(kind, message))
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            PreviewOutcome::Failed(failure) => Some(failure),
            PreviewOutcome::Rendered(_) => None,
        }
    }
}

/// Where a pipeline run is, or where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Idle,
    Normalizing,
    Resolving,
    Transforming,
    Executing,
    Rendering,
    Mounted,
    Failed(FailureKind),
}

impl PipelineStage {
    pub fn is_mounted(&self) -> bool {
        matches!(self, PipelineStage::Mounted)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::Idle => f.write_str("idle"),
            PipelineStage::Normalizing => f.write_str("normalizing"),
            PipelineStage::Resolving => f.write_str("resolving"),
            PipelineStage::Transforming => f.write_str("transforming"),
            PipelineStage::Executing => f.write_str("executing"),
            PipelineStage::Rendering => f.write_str("rendering"),
            PipelineStage::Mounted => f.write_str("mounted"),
            PipelineStage::Failed(kind) => write!(f, "failed ({})", kind),
        }
    }
}

/// Summary of one pipeline run, serializable for the CLI's JSON output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: u64,
    pub identifier: Option<String>,
    pub styling: String,
    pub stage: PipelineStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,
    pub render_passes: usize,
    #[serde(default)]
    pub console: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_dom::html::render_node;

    #[test]
    fn test_panel_markup() {
        let failure = Failure::new(FailureKind::RuntimeError, "x is not defined");
        assert_eq!(
            render_node(&failure.panel()),
            "<div class=\"alert alert-danger\" role=\"alert\" data-failure=\"RuntimeError\">\
             <strong>Error in component:</strong> x is not defined<br>\
             <small>Check the code tab and modify your prompt to fix this issue.</small></div>"
        );
    }

    #[test]
    fn test_not_found_is_a_warning() {
        let panel = Failure::new(FailureKind::NotFound, "").panel();
        let element = panel.as_element().unwrap();
        assert_eq!(element.attribute("class"), Some("alert alert-warning"));
        assert_eq!(element.text_content(), format!("{}{}", FailureKind::NotFound.title(), FailureKind::NotFound.hint()));
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(PipelineStage::Failed(FailureKind::SyntaxError).to_string(), "failed (SyntaxError)");
        assert_eq!(PipelineStage::Mounted.to_string(), "mounted");
    }
}
