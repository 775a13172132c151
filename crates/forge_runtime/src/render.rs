//! Expansion of element values into DOM nodes.
//!
//! A render pass walks the element tree depth-first, calling function
//! components with their props and turning intrinsic elements into
//! [`forge_dom::Element`]s. Effects scheduled during the pass run after the
//! tree is complete; if they (or the render itself) changed state, the whole
//! tree is rendered again.

use crate::builtins::react::element_type;
use crate::interpreter::Interpreter;
use crate::value::{format_number, ElementKind, ElementValue, ObjectData, RuntimeError, Value, MAX_NESTING_DEPTH};
use forge_dom::{DomNode, Element, EventType, HandlerId};
use std::rc::Rc;
use tracing::debug;

/// Upper bound on consecutive passes caused by state updates.
pub const MAX_RENDER_PASSES: usize = 25;

/// Handler functions referenced by a rendered tree, keyed by the ids stored
/// on the DOM listeners.
#[derive(Debug, Default)]
pub struct HandlerTable {
    handlers: Vec<(HandlerId, Value)>,
    next_id: u64,
}

impl HandlerTable {
    pub fn register(&mut self, handler: Value) -> HandlerId {
        self.next_id += 1;
        let id = HandlerId(self.next_id);
        self.handlers.push((id, handler));
        id
    }

    pub fn get(&self, id: HandlerId) -> Option<&Value> {
        self.handlers.iter().find(|(h, _)| *h == id).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[derive(Debug)]
pub struct RenderOutput {
    pub nodes: Vec<DomNode>,
    pub handlers: HandlerTable,
    /// Passes it took for state to settle.
    pub passes: usize,
}

/// Renders `root` until no state changes, running effects after each pass.
pub fn render_root(interp: &mut Interpreter, root: &Rc<ElementValue>) -> Result<RenderOutput, RuntimeError> {
    for pass in 1..=MAX_RENDER_PASSES {
        interp.hooks.begin_pass();

        let mut renderer = Renderer {
            interp: &mut *interp,
            handlers: HandlerTable::default(),
            nesting: 0,
        };
        let mut nodes = Vec::new();
        renderer.expand(&Value::Element(root.clone()), "", &mut nodes)?;
        let handlers = renderer.handlers;

        for cleanup in interp.hooks.finish_pass() {
            call_if_callable(interp, &cleanup)?;
        }
        run_effects(interp)?;

        if !interp.hooks.is_dirty() {
            debug!(pass, nodes = nodes.len(), handlers = handlers.len(), "render settled");
            return Ok(RenderOutput {
                nodes,
                handlers,
                passes: pass,
            });
        }
        debug!(pass, "state changed during render, rendering again");
    }

    Err(RuntimeError::Custom(
        "Too many re-renders. React limits the number of renders to prevent an infinite loop."
            .to_string(),
    ))
}

/// Discards all hook state of the mounted tree, running effect cleanups.
pub fn unmount(interp: &mut Interpreter) -> Result<(), RuntimeError> {
    for cleanup in interp.hooks.reset() {
        call_if_callable(interp, &cleanup)?;
    }
    Ok(())
}

fn run_effects(interp: &mut Interpreter) -> Result<(), RuntimeError> {
    for effect in interp.hooks.take_effects() {
        if let Some(cleanup) = interp.hooks.take_cleanup(&effect.path, effect.index) {
            call_if_callable(interp, &cleanup)?;
        }
        let result = interp.call_function(&effect.callback, Value::Undefined, Vec::new())?;
        if result.is_callable() {
            interp.hooks.set_cleanup(&effect.path, effect.index, result);
        }
    }
    Ok(())
}

fn call_if_callable(interp: &mut Interpreter, func: &Value) -> Result<(), RuntimeError> {
    if func.is_callable() {
        interp.call_function(func, Value::Undefined, Vec::new())?;
    }
    Ok(())
}

struct Renderer<'a> {
    interp: &'a mut Interpreter,
    handlers: HandlerTable,
    /// Current depth of `expand` on the native stack.
    nesting: usize,
}

impl Renderer<'_> {
    fn expand(&mut self, value: &Value, path: &str, out: &mut Vec<DomNode>) -> Result<(), RuntimeError> {
        self.interp.tick()?;
        if self.nesting >= MAX_NESTING_DEPTH {
            return Err(RuntimeError::CallDepthExceeded(self.interp.limits.max_call_depth));
        }
        self.nesting += 1;
        let result = self.expand_value(value, path, out);
        self.nesting -= 1;
        result
    }

    fn expand_value(&mut self, value: &Value, path: &str, out: &mut Vec<DomNode>) -> Result<(), RuntimeError> {
        match value {
            Value::Undefined | Value::Null | Value::Boolean(_) => Ok(()),
            Value::Number(n) => {
                out.push(DomNode::Text(format_number(*n)));
                Ok(())
            }
            Value::String(s) => {
                out.push(DomNode::text(s.clone()));
                Ok(())
            }
            Value::Array(items) => {
                let items = items.borrow().clone();
                for (i, item) in items.iter().enumerate() {
                    let segment = match item {
                        Value::Element(e) => match &e.key {
                            Some(key) => format!("{}/#{}", path, key),
                            None => format!("{}/{}", path, i),
                        },
                        _ => format!("{}/{}", path, i),
                    };
                    self.expand(item, &segment, out)?;
                }
                Ok(())
            }
            Value::Element(element) => self.expand_element(element, path, out),
            Value::Function(_) | Value::Native(_) => {
                debug!("functions are not valid as a child, skipping");
                Ok(())
            }
            Value::Object(_) => Err(RuntimeError::type_error(format!(
                "Objects are not valid as a React child (found: {}). If you meant to render a collection of children, use an array instead.",
                value.describe()
            ))),
        }
    }

    fn expand_element(
        &mut self,
        element: &Rc<ElementValue>,
        path: &str,
        out: &mut Vec<DomNode>,
    ) -> Result<(), RuntimeError> {
        match &element.kind {
            ElementKind::Fragment => self.expand(&element.children(), path, out),
            ElementKind::Intrinsic(tag) => {
                let node = self.expand_intrinsic(tag, element, path)?;
                out.push(node.into());
                Ok(())
            }
            ElementKind::Component(component) => {
                if !component.is_callable() {
                    return Err(RuntimeError::type_error(format!(
                        "Element type is invalid: expected a string (for built-in components) or a class/function (for composite components) but got: {}.",
                        describe_type(&element_type(element))
                    )));
                }
                let path = format!("{}/{}", path, element.display_name());
                let props = Value::Object(element.props.clone());

                // A component's subtree occupies a call frame until it is
                // fully expanded, so nesting counts against the call depth.
                self.interp.enter_frame()?;
                self.interp.hooks.begin_component(&path);
                let rendered = self.interp.call_function(component, Value::Undefined, vec![props]);
                self.interp.hooks.end_component();

                let result = rendered.and_then(|rendered| self.expand(&rendered, &path, out));
                self.interp.exit_frame();
                result
            }
        }
    }

    fn expand_intrinsic(&mut self, tag: &str, element: &ElementValue, path: &str) -> Result<Element, RuntimeError> {
        let mut dom = Element::new(tag);
        let props = element.props.borrow().properties.clone();
        for (name, value) in &props {
            self.apply_prop(&mut dom, name, value);
        }

        let mut children = Vec::new();
        self.expand(&element.children(), &format!("{}/{}", path, tag), &mut children)?;
        dom.children = children;
        Ok(dom)
    }

    fn apply_prop(&mut self, dom: &mut Element, name: &str, value: &Value) {
        match name {
            "children" | "key" | "ref" | "dangerouslySetInnerHTML" => return,
            "style" => {
                match value {
                    Value::Object(style) => {
                        let css = style_declarations(&style.borrow());
                        if !css.is_empty() {
                            dom.set_attribute("style", css);
                        }
                    }
                    Value::String(css) => dom.set_attribute("style", css.clone()),
                    _ => {}
                }
                return;
            }
            _ => {}
        }

        if name.starts_with("on") && name.len() > 2 {
            if !value.is_callable() {
                return;
            }
            match EventType::from_prop_name(name) {
                Some(event) => {
                    let id = self.handlers.register(value.clone());
                    dom.add_listener(event, id);
                }
                None => debug!(prop = name, "unsupported event prop"),
            }
            return;
        }

        let attribute = attribute_name(name);
        match value {
            Value::Undefined | Value::Null | Value::Function(_) | Value::Native(_) => {}
            Value::Boolean(b) if is_enumerated(&attribute) => {
                dom.set_attribute(attribute, b.to_string());
            }
            Value::Boolean(true) => dom.set_attribute(attribute, ""),
            Value::Boolean(false) => {}
            other => dom.set_attribute(attribute, other.to_js_string()),
        }
    }
}

fn describe_type(value: &Value) -> String {
    match value {
        Value::Undefined => "undefined".to_string(),
        Value::Null => "null".to_string(),
        Value::Object(_) | Value::Element(_) => "object".to_string(),
        other => other.type_of().to_string(),
    }
}

/// `aria-*` and `data-*` attributes render booleans as text.
fn is_enumerated(attribute: &str) -> bool {
    attribute.starts_with("aria-") || attribute.starts_with("data-")
}

/// DOM attribute name for a JSX prop.
pub fn attribute_name(prop: &str) -> String {
    let renamed = match prop {
        "className" => "class",
        "htmlFor" => "for",
        "tabIndex" => "tabindex",
        "readOnly" => "readonly",
        "maxLength" => "maxlength",
        "minLength" => "minlength",
        "autoFocus" => "autofocus",
        "autoComplete" => "autocomplete",
        "autoPlay" => "autoplay",
        "colSpan" => "colspan",
        "rowSpan" => "rowspan",
        "contentEditable" => "contenteditable",
        "crossOrigin" => "crossorigin",
        "encType" => "enctype",
        "srcSet" => "srcset",
        "spellCheck" => "spellcheck",
        "noValidate" => "novalidate",
        "defaultValue" => "value",
        "defaultChecked" => "checked",
        "strokeWidth" => "stroke-width",
        "strokeLinecap" => "stroke-linecap",
        "strokeLinejoin" => "stroke-linejoin",
        "fillRule" => "fill-rule",
        "clipRule" => "clip-rule",
        other => other,
    };
    renamed.to_string()
}

const UNITLESS_PROPERTIES: &[&str] = &[
    "animationIterationCount", "aspectRatio", "columnCount", "fillOpacity", "flex", "flexGrow",
    "flexShrink", "fontWeight", "gridColumn", "gridRow", "lineClamp", "lineHeight", "opacity",
    "order", "orphans", "strokeOpacity", "strokeWidth", "tabSize", "widows", "zIndex", "zoom",
];

/// Serializes a style object to `property: value;` declarations.
pub fn style_declarations(style: &ObjectData) -> String {
    style
        .properties
        .iter()
        .filter(|(_, v)| !v.is_nullish() && !matches!(v, Value::Boolean(_)))
        .map(|(name, value)| format!("{}: {};", css_property(name), css_value(name, value)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn css_property(name: &str) -> String {
    if name.starts_with("--") {
        return name.to_string();
    }
    let mut out = String::with_capacity(name.len() + 4);
    // msTransform -> -ms-transform, like the Webkit/Moz prefixes get from their capital
    if name.starts_with("ms") && name[2..].starts_with(|c: char| c.is_ascii_uppercase()) {
        out.push('-');
    }
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn css_value(name: &str, value: &Value) -> String {
    match value {
        Value::Number(n) if *n != 0.0 && n.is_finite() && !UNITLESS_PROPERTIES.contains(&name) && !name.starts_with("--") => {
            format!("{}px", format_number(*n))
        }
        other => other.to_js_string().trim().to_string(),
    }
}

/// Facts about the control an event was raised on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPayload {
    pub value: Option<String>,
    pub checked: Option<bool>,
    pub key: Option<String>,
}

/// The synthetic event object handed to handlers.
pub fn event_object(event: EventType, element: &Element, payload: &EventPayload) -> Value {
    let attribute = |name: &str| {
        element
            .attribute(name)
            .map(Value::string)
            .unwrap_or_else(|| Value::string(""))
    };
    let value = match &payload.value {
        Some(v) => Value::string(v.clone()),
        None => attribute("value"),
    };
    let checked = payload
        .checked
        .unwrap_or_else(|| element.attribute("checked").is_some());

    let target = Value::plain_object(vec![
        ("value".to_string(), value),
        ("checked".to_string(), Value::Boolean(checked)),
        ("name".to_string(), attribute("name")),
        ("id".to_string(), attribute("id")),
        ("type".to_string(), attribute("type")),
        ("tagName".to_string(), Value::String(element.tag.to_ascii_uppercase())),
    ]);

    let mut properties = vec![
        ("type".to_string(), Value::string(event.as_str())),
        ("target".to_string(), target.clone()),
        ("currentTarget".to_string(), target),
        ("preventDefault".to_string(), Value::native("Event.preventDefault")),
        ("stopPropagation".to_string(), Value::native("Event.stopPropagation")),
        ("persist".to_string(), Value::native("Event.persist")),
    ];
    if event.carries_key() {
        properties.push((
            "key".to_string(),
            Value::string(payload.key.clone().unwrap_or_default()),
        ));
    }
    Value::plain_object(properties)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_css_property_names() {
        assert_eq!(css_property("backgroundColor"), "background-color");
        assert_eq!(css_property("WebkitTransition"), "-webkit-transition");
        assert_eq!(css_property("msTransform"), "-ms-transform");
        assert_eq!(css_property("--accent"), "--accent");
    }

    #[test]
    fn test_style_adds_px_to_lengths_only() {
        let mut style = ObjectData::new("Object");
        style.set("fontSize", Value::Number(14.0));
        style.set("opacity", Value::Number(0.5));
        style.set("margin", Value::Number(0.0));
        style.set("color", Value::string("red"));
        style.set("border", Value::Null);
        assert_eq!(
            style_declarations(&style),
            "font-size: 14px; opacity: 0.5; margin: 0; color: red;"
        );
    }

    #[test]
    fn test_attribute_names() {
        assert_eq!(attribute_name("className"), "class");
        assert_eq!(attribute_name("htmlFor"), "for");
        assert_eq!(attribute_name("placeholder"), "placeholder");
    }

    #[test]
    fn test_handler_ids_are_unique() {
        let mut table = HandlerTable::default();
        let a = table.register(Value::native("alert"));
        let b = table.register(Value::native("alert"));
        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
        assert!(table.get(HandlerId(99)).is_none());
    }
}
