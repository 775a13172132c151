use crate::builtins::regexp_fns::ScriptRegex;
use crate::environment::Environment;
use forge_parser::ast::FunctionDef;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    Array(Rc<RefCell<Vec<Value>>>),
    Object(Rc<RefCell<ObjectData>>),
    Function(Rc<Closure>),
    Native(Rc<NativeFunction>),
    Element(Rc<ElementValue>),
}

/// Plain object storage. Properties keep insertion order, which is what
/// `Object.keys` and `JSON.stringify` observe.
#[derive(Debug, Clone, Default)]
pub struct ObjectData {
    pub class_name: String,
    pub properties: Vec<(String, Value)>,
    /// Milliseconds since the epoch for `Date` instances.
    pub date_value: Option<f64>,
    pub regexp: Option<Rc<ScriptRegex>>,
}

impl ObjectData {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            ..Default::default()
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.properties.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.properties.push((key, value)),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.properties.iter().any(|(k, _)| k == key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let pos = self.properties.iter().position(|(k, _)| k == key)?;
        Some(self.properties.remove(pos).1)
    }

    pub fn keys(&self) -> Vec<String> {
        self.properties.iter().map(|(k, _)| k.clone()).collect()
    }
}

/// A script function together with the scope it closed over.
pub struct Closure {
    pub def: Rc<FunctionDef>,
    pub env: Environment,
    /// Name inferred from the binding, as in `const App = () => ...`.
    pub inferred_name: Option<String>,
}

impl Closure {
    pub fn name(&self) -> &str {
        match (&self.def.name, &self.inferred_name) {
            (Some(name), _) => name.as_str(),
            (None, Some(name)) => name,
            (None, None) => "anonymous",
        }
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Function: {}]", self.name())
    }
}

#[derive(Debug)]
pub struct NativeFunction {
    pub name: String,
    pub kind: NativeKind,
}

#[derive(Debug)]
pub enum NativeKind {
    /// Global or namespaced builtin, dispatched by name.
    Builtin,
    /// `items.map` read as a value: the receiver travels with the method.
    BoundMethod { receiver: Value, method: String },
    /// Second element of the pair returned by `useState`.
    StateSetter {
        cell: Rc<RefCell<Value>>,
        dirty: Rc<Cell<bool>>,
    },
    /// Second element of the pair returned by `useReducer`.
    Dispatch {
        cell: Rc<RefCell<Value>>,
        reducer: Value,
        dirty: Rc<Cell<bool>>,
    },
}

/// The value produced by `React.createElement`.
#[derive(Debug)]
pub struct ElementValue {
    pub kind: ElementKind,
    /// Props including `children`; `key` is split out.
    pub props: Rc<RefCell<ObjectData>>,
    pub key: Option<String>,
}

#[derive(Debug, Clone)]
pub enum ElementKind {
    Intrinsic(String),
    Component(Value),
    Fragment,
}

impl ElementValue {
    pub fn display_name(&self) -> String {
        match &self.kind {
            ElementKind::Intrinsic(tag) => tag.clone(),
            ElementKind::Fragment => "Fragment".to_string(),
            ElementKind::Component(Value::Function(c)) => c.name().to_string(),
            ElementKind::Component(Value::Native(n)) => n.name.clone(),
            ElementKind::Component(_) => "Unknown".to_string(),
        }
    }

    pub fn children(&self) -> Value {
        self.props.borrow().get("children").cloned().unwrap_or_default()
    }
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object(data: ObjectData) -> Self {
        Value::Object(Rc::new(RefCell::new(data)))
    }

    pub fn plain_object(properties: Vec<(String, Value)>) -> Self {
        Value::object(ObjectData {
            class_name: "Object".to_string(),
            properties,
            ..Default::default()
        })
    }

    pub fn native(name: impl Into<String>) -> Self {
        Value::Native(Rc::new(NativeFunction {
            name: name.into(),
            kind: NativeKind::Builtin,
        }))
    }

    pub fn bound_method(receiver: Value, method: &str) -> Self {
        Value::Native(Rc::new(NativeFunction {
            name: method.to_string(),
            kind: NativeKind::BoundMethod {
                receiver,
                method: method.to_string(),
            },
        }))
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Native(_))
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) | Value::Native(_) => "function",
            Value::Array(_) | Value::Object(_) | Value::Element(_) => "object",
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
            Value::Array(arr) => {
                let arr = arr.borrow();
                match arr.len() {
                    0 => 0.0,
                    1 => arr[0].to_number(),
                    _ => f64::NAN,
                }
            }
            Value::Object(obj) => obj.borrow().date_value.unwrap_or(f64::NAN),
            _ => f64::NAN,
        }
    }

    /// Operand of the bitwise operators: the number wrapped to 32 bits.
    pub fn to_uint32(&self) -> u32 {
        let n = self.to_number();
        if n.is_finite() {
            n.trunc().rem_euclid(4_294_967_296.0) as u32
        } else {
            0
        }
    }

    pub fn to_int32(&self) -> i32 {
        self.to_uint32() as i32
    }

    /// Integer view used by index-like arguments; NaN becomes 0.
    pub fn to_integer(&self) -> i64 {
        let n = self.to_number();
        if n.is_nan() {
            0
        } else if n.is_infinite() {
            if n > 0.0 { i64::MAX } else { i64::MIN }
        } else {
            n.trunc() as i64
        }
    }

    /// The string conversion applied by `String(value)` and template literals.
    pub fn to_js_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.clone(),
            Value::Array(arr) => join_array(arr, ","),
            Value::Object(obj) => {
                let obj = obj.borrow();
                if is_error_class(&obj.class_name) {
                    error_summary(&obj)
                } else if let Some(ms) = obj.date_value {
                    crate::builtins::date_fns::date_to_string(ms)
                } else if let Some(re) = &obj.regexp {
                    re.to_string()
                } else {
                    "[object Object]".to_string()
                }
            }
            Value::Function(c) => format!("function {}() {{ [code] }}", c.name()),
            Value::Native(n) => format!("function {}() {{ [native code] }}", n.name),
            Value::Element(_) => "[object Object]".to_string(),
        }
    }

    pub fn as_object(&self) -> Option<Rc<RefCell<ObjectData>>> {
        match self {
            Value::Object(o) => Some(o.clone()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<Rc<RefCell<Vec<Value>>>> {
        match self {
            Value::Array(a) => Some(a.clone()),
            _ => None,
        }
    }

    /// Shallow description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Value::String(s) => format!("\"{}\"", s),
            Value::Array(_) => "array".to_string(),
            Value::Object(o) => {
                let keys = o.borrow().keys();
                format!("object with keys {{{}}}", keys.join(", "))
            }
            Value::Function(c) => format!("function {}", c.name()),
            Value::Native(n) => format!("function {}", n.name),
            Value::Element(e) => format!("<{} />", e.display_name()),
            other => other.to_js_string(),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Array(arr) => f.debug_list().entries(arr.borrow().iter()).finish(),
            Value::Object(obj) => {
                let obj = obj.borrow();
                let mut map = f.debug_map();
                for (k, v) in &obj.properties {
                    map.entry(k, v);
                }
                map.finish()
            }
            Value::Function(c) => write!(f, "{:?}", c),
            Value::Native(n) => write!(f, "[Function: {}]", n.name),
            Value::Element(e) => write!(f, "<{} />", e.display_name()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_js_string())
    }
}

impl PartialEq for Value {
    /// Strict equality, except that `NaN` equals itself so tests can compare.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            _ => crate::evaluator::strict_equals(self, other),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// Number-to-string conversion following the ECMAScript rules closely
/// enough for display: integers print without a fraction, very large and
/// very small magnitudes switch to exponent form.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    let abs = n.abs();
    if abs >= 1e21 || abs < 1e-6 {
        let s = format!("{:e}", n);
        return match s.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
            _ => s,
        };
    }
    if n.fract() == 0.0 {
        return format!("{}", n as i64);
    }
    format!("{}", n)
}

pub fn string_to_number(s: &str) -> f64 {
    let t = s.trim();
    if t.is_empty() {
        return 0.0;
    }
    if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).map(|n| n as f64).unwrap_or(f64::NAN);
    }
    match t {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    // Rust accepts "inf" and "nan" spellings that scripts do not.
    if t.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return f64::NAN;
    }
    t.parse::<f64>().unwrap_or(f64::NAN)
}

pub(crate) fn is_error_class(class_name: &str) -> bool {
    class_name.ends_with("Error")
}

pub(crate) fn error_summary(obj: &ObjectData) -> String {
    let name = obj
        .get("name")
        .map(|v| v.to_js_string())
        .unwrap_or_else(|| obj.class_name.clone());
    let message = obj.get("message").map(|v| v.to_js_string()).unwrap_or_default();
    if message.is_empty() {
        name
    } else {
        format!("{}: {}", name, message)
    }
}

/// Deepest array nesting the builtins descend into natively.
pub const MAX_NESTING_DEPTH: usize = 512;

/// `Array.prototype.join`. An array that contains itself, directly or
/// further down, contributes an empty string where it recurs.
pub fn join_array(items: &Rc<RefCell<Vec<Value>>>, separator: &str) -> String {
    join_nested(items, separator, &mut Vec::new())
}

fn join_nested(items: &Rc<RefCell<Vec<Value>>>, separator: &str, open: &mut Vec<*const RefCell<Vec<Value>>>) -> String {
    let ptr = Rc::as_ptr(items);
    if open.contains(&ptr) || open.len() >= MAX_NESTING_DEPTH {
        return String::new();
    }
    open.push(ptr);
    let joined = items
        .borrow()
        .iter()
        .map(|v| match v {
            Value::Undefined | Value::Null => String::new(),
            Value::Array(inner) => join_nested(inner, ",", open),
            other => other.to_js_string(),
        })
        .collect::<Vec<_>>()
        .join(separator);
    open.pop();
    joined
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum RuntimeError {
    #[error("Uncaught {}", thrown_summary(.0))]
    Thrown(Value),

    #[error("TypeError: {0}")]
    TypeError(String),

    #[error("ReferenceError: {0} is not defined")]
    UndefinedVariable(String),

    #[error("TypeError: Assignment to constant variable '{0}'")]
    ConstAssignment(String),

    #[error("Execution exceeded the limit of {0} steps")]
    StepLimitExceeded(u64),

    #[error("RangeError: Maximum call stack size exceeded (depth {0})")]
    CallDepthExceeded(usize),

    #[error("{0}")]
    Custom(String),
}

fn thrown_summary(value: &Value) -> String {
    value.to_js_string()
}

impl RuntimeError {
    pub fn type_error(msg: impl Into<String>) -> Self {
        RuntimeError::TypeError(msg.into())
    }

    /// The message a script would read from `error.message`.
    pub fn message(&self) -> String {
        match self {
            RuntimeError::Thrown(Value::Object(obj)) => {
                let obj = obj.borrow();
                match obj.get("message") {
                    Some(m) => m.to_js_string(),
                    None => "[object Object]".to_string(),
                }
            }
            RuntimeError::Thrown(other) => other.to_js_string(),
            RuntimeError::TypeError(m) | RuntimeError::Custom(m) => m.clone(),
            RuntimeError::UndefinedVariable(name) => format!("{} is not defined", name),
            RuntimeError::ConstAssignment(_) => "Assignment to constant variable.".to_string(),
            RuntimeError::StepLimitExceeded(limit) => {
                format!("Execution exceeded the limit of {} steps", limit)
            }
            RuntimeError::CallDepthExceeded(_) => "Maximum call stack size exceeded".to_string(),
        }
    }

    /// Limits abort the whole run; `catch` blocks never see them.
    pub fn is_catchable(&self) -> bool {
        !matches!(
            self,
            RuntimeError::StepLimitExceeded(_) | RuntimeError::CallDepthExceeded(_)
        )
    }
}
