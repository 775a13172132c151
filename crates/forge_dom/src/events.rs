use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    Click,
    DoubleClick,
    Change,
    Input,
    Submit,
    KeyDown,
    KeyUp,
    KeyPress,
    Focus,
    Blur,
    MouseEnter,
    MouseLeave,
    MouseDown,
    MouseUp,
    MouseMove,
    Scroll,
}

impl EventType {
    pub const ALL: [EventType; 16] = [
        EventType::Click,
        EventType::DoubleClick,
        EventType::Change,
        EventType::Input,
        EventType::Submit,
        EventType::KeyDown,
        EventType::KeyUp,
        EventType::KeyPress,
        EventType::Focus,
        EventType::Blur,
        EventType::MouseEnter,
        EventType::MouseLeave,
        EventType::MouseDown,
        EventType::MouseUp,
        EventType::MouseMove,
        EventType::Scroll,
    ];

    /// DOM event name, as used by `addEventListener`.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Click => "click",
            EventType::DoubleClick => "dblclick",
            EventType::Change => "change",
            EventType::Input => "input",
            EventType::Submit => "submit",
            EventType::KeyDown => "keydown",
            EventType::KeyUp => "keyup",
            EventType::KeyPress => "keypress",
            EventType::Focus => "focus",
            EventType::Blur => "blur",
            EventType::MouseEnter => "mouseenter",
            EventType::MouseLeave => "mouseleave",
            EventType::MouseDown => "mousedown",
            EventType::MouseUp => "mouseup",
            EventType::MouseMove => "mousemove",
            EventType::Scroll => "scroll",
        }
    }

    /// Component prop that carries the handler (`onClick`, `onChange`, ...).
    pub fn prop_name(&self) -> &'static str {
        match self {
            EventType::Click => "onClick",
            EventType::DoubleClick => "onDoubleClick",
            EventType::Change => "onChange",
            EventType::Input => "onInput",
            EventType::Submit => "onSubmit",
            EventType::KeyDown => "onKeyDown",
            EventType::KeyUp => "onKeyUp",
            EventType::KeyPress => "onKeyPress",
            EventType::Focus => "onFocus",
            EventType::Blur => "onBlur",
            EventType::MouseEnter => "onMouseEnter",
            EventType::MouseLeave => "onMouseLeave",
            EventType::MouseDown => "onMouseDown",
            EventType::MouseUp => "onMouseUp",
            EventType::MouseMove => "onMouseMove",
            EventType::Scroll => "onScroll",
        }
    }

    pub fn from_prop_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.prop_name() == name)
    }

    /// Accepts either the DOM name (`click`) or the prop name (`onClick`).
    pub fn parse(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|e| e.as_str() == lower || e.prop_name().eq_ignore_ascii_case(name))
    }

    /// Events whose payload is the control's new value.
    pub fn carries_value(&self) -> bool {
        matches!(self, EventType::Change | EventType::Input)
    }

    /// Events whose payload is the pressed key.
    pub fn carries_key(&self) -> bool {
        matches!(self, EventType::KeyDown | EventType::KeyUp | EventType::KeyPress)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies a handler function registered by the renderer. The DOM only
/// stores the id; the runtime owns the function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HandlerId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listener {
    pub event: EventType,
    pub handler: HandlerId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prop_name_round_trip() {
        for event in EventType::ALL {
            assert_eq!(EventType::from_prop_name(event.prop_name()), Some(event));
        }
        assert_eq!(EventType::from_prop_name("onclick"), None);
        assert_eq!(EventType::from_prop_name("className"), None);
    }

    #[test]
    fn test_parse_accepts_both_spellings() {
        assert_eq!(EventType::parse("click"), Some(EventType::Click));
        assert_eq!(EventType::parse("onChange"), Some(EventType::Change));
        assert_eq!(EventType::parse("DBLCLICK"), Some(EventType::DoubleClick));
        assert_eq!(EventType::parse("hover"), None);
    }
}
