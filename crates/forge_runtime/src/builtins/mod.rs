pub mod array_fns;
pub mod date_fns;
pub mod global_fns;
pub mod math_fns;
pub mod react;
pub mod regexp_fns;
pub mod string_fns;

use crate::environment::Environment;
use crate::interpreter::Interpreter;
use crate::value::{NativeKind, ObjectData, RuntimeError, Value};

const CONSOLE_METHODS: &[&str] = &["log", "info", "warn", "error", "debug", "table"];

const MATH_METHODS: &[&str] = &[
    "abs", "floor", "ceil", "round", "trunc", "sign", "sqrt", "cbrt", "pow", "min", "max", "random",
    "sin", "cos", "tan", "asin", "acos", "atan", "atan2", "log", "log10", "log2", "exp", "hypot",
];

const MATH_CONSTANTS: &[(&str, f64)] = &[
    ("PI", std::f64::consts::PI),
    ("E", std::f64::consts::E),
    ("LN2", std::f64::consts::LN_2),
    ("LN10", std::f64::consts::LN_10),
    ("LOG2E", std::f64::consts::LOG2_E),
    ("LOG10E", std::f64::consts::LOG10_E),
    ("SQRT2", std::f64::consts::SQRT_2),
    ("SQRT1_2", std::f64::consts::FRAC_1_SQRT_2),
];

pub const HOOK_NAMES: &[&str] = &[
    "useState",
    "useReducer",
    "useEffect",
    "useLayoutEffect",
    "useRef",
    "useMemo",
    "useCallback",
    "useId",
];

const REACT_MEMBERS: &[&str] = &["createElement", "Fragment", "StrictMode", "memo", "forwardRef"];

const ERROR_CLASSES: &[&str] = &["Error", "TypeError", "RangeError", "ReferenceError", "SyntaxError"];

const GLOBAL_FUNCTIONS: &[&str] = &[
    "Object",
    "Array",
    "String",
    "Number",
    "Boolean",
    "Date",
    "RegExp",
    "parseInt",
    "parseFloat",
    "isNaN",
    "isFinite",
    "alert",
    "setTimeout",
    "setInterval",
    "clearTimeout",
    "clearInterval",
];

fn namespace(name: &str, methods: &[&str]) -> ObjectData {
    let mut data = ObjectData::new(name);
    for method in methods {
        data.set(*method, Value::native(format!("{}.{}", name, method)));
    }
    data
}

/// Fills the shared global scope every module scope hangs off.
pub fn install_globals(env: &Environment) {
    env.define_const("undefined", Value::Undefined);
    env.define_const("NaN", Value::Number(f64::NAN));
    env.define_const("Infinity", Value::Number(f64::INFINITY));

    env.define("console", Value::object(namespace("console", CONSOLE_METHODS)));
    env.define("JSON", Value::object(namespace("JSON", &["stringify", "parse"])));

    let mut math = namespace("Math", MATH_METHODS);
    for (name, value) in MATH_CONSTANTS {
        math.set(*name, Value::Number(*value));
    }
    env.define("Math", Value::object(math));

    let mut react = namespace("React", REACT_MEMBERS);
    for hook in HOOK_NAMES {
        let value = Value::native(format!("React.{}", hook));
        react.set(*hook, value.clone());
        env.define(*hook, value);
    }
    if let Some(fragment) = react.get("Fragment").cloned() {
        env.define("Fragment", fragment);
    }
    env.define("React", Value::object(react));

    for name in GLOBAL_FUNCTIONS.iter().chain(ERROR_CLASSES) {
        env.define(*name, Value::native(*name));
    }
}

/// Dispatches a call to a builtin by its registered name.
pub fn call_builtin(interp: &mut Interpreter, name: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
    if let Some((ns, method)) = name.split_once('.') {
        return match ns {
            "console" => global_fns::console_fn(interp, method, &args),
            "JSON" => global_fns::json_fn(method, &args),
            "Math" => math_fns::call_math(interp, method, &args),
            "React" => react::call_react(interp, method, args),
            "Object" => global_fns::object_static(method, &args),
            "Array" => array_fns::array_static(interp, method, args),
            "String" => string_fns::string_static(method, &args),
            "Number" => math_fns::number_static(method, &args),
            "Date" => date_fns::date_static(method, &args),
            // preventDefault and stopPropagation on synthetic events
            "Event" => Ok(Value::Undefined),
            _ => Err(unknown_builtin(name)),
        };
    }

    match name {
        "Object" => Ok(match args.into_iter().next() {
            Some(value @ (Value::Object(_) | Value::Array(_))) => value,
            _ => Value::plain_object(Vec::new()),
        }),
        "Array" => array_fns::array_constructor(interp, args),
        "RegExp" => regexp_fns::regexp_constructor(&args),
        "String" => Ok(global_fns::to_string_fn(&args)),
        "Number" => Ok(Value::Number(args.first().map(|v| v.to_number()).unwrap_or(0.0))),
        "Boolean" => Ok(Value::Boolean(args.first().is_some_and(|v| v.is_truthy()))),
        "Date" => Ok(Value::String(date_fns::date_to_string(date_fns::now_ms()))),
        "parseInt" => math_fns::parse_int_fn(&args),
        "parseFloat" => math_fns::parse_float_fn(&args),
        "isNaN" => Ok(Value::Boolean(args.first().map(|v| v.to_number()).unwrap_or(f64::NAN).is_nan())),
        "isFinite" => Ok(Value::Boolean(args.first().map(|v| v.to_number()).unwrap_or(f64::NAN).is_finite())),
        "alert" => global_fns::alert_fn(interp, &args),
        "setTimeout" => global_fns::set_timer_fn(interp, &args, false),
        "setInterval" => global_fns::set_timer_fn(interp, &args, true),
        "clearTimeout" | "clearInterval" => global_fns::clear_timer_fn(interp, &args),
        class if ERROR_CLASSES.contains(&class) => Ok(error_from_args(class, &args)),
        _ => Err(unknown_builtin(name)),
    }
}

/// Calls a method read off a primitive, array, date, pattern or function.
pub fn call_method(
    interp: &mut Interpreter,
    receiver: &Value,
    method: &str,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    match receiver {
        Value::Array(items) => array_fns::call_array_method(interp, items, method, args),
        Value::String(s) => string_fns::call_string_method(interp, s, method, args),
        Value::Number(n) => math_fns::call_number_method(*n, method, &args),
        Value::Boolean(b) => Ok(Value::String(b.to_string())),
        Value::Object(obj) => {
            if let Some(re) = regexp_fns::as_regexp(receiver) {
                return regexp_fns::call_regexp_method(&re, method, &args);
            }
            let date = obj.borrow().date_value;
            match (date, method) {
                (Some(ms), _) => date_fns::call_date_method(ms, method, &args),
                (None, "hasOwnProperty") => {
                    let key = args.first().map(|k| k.to_js_string()).unwrap_or_default();
                    Ok(Value::Boolean(obj.borrow().contains(&key)))
                }
                (None, _) => Ok(Value::String(receiver.to_js_string())),
            }
        }
        Value::Function(_) | Value::Native(_) => {
            let mut args = args.into_iter();
            let this = args.next().unwrap_or_default();
            let rest: Vec<Value> = match method {
                "apply" => match args.next() {
                    Some(Value::Array(items)) => items.borrow().clone(),
                    _ => Vec::new(),
                },
                _ => args.collect(),
            };
            interp.call_function(receiver, this, rest)
        }
        other => Err(RuntimeError::type_error(format!(
            "{}.{} is not a function",
            other.describe(),
            method
        ))),
    }
}

/// Static members of the builtin constructors, e.g. `Object.keys`.
pub fn static_member(name: &str, key: &str) -> Option<Value> {
    let native = |key: &str| Some(Value::native(format!("{}.{}", name, key)));
    match (name, key) {
        ("Object", "keys" | "values" | "entries" | "assign" | "freeze" | "fromEntries") => native(key),
        ("Array", "isArray" | "from" | "of") => native(key),
        ("String", "fromCharCode") => native(key),
        ("Date", "now" | "parse") => native(key),
        ("Number", "isInteger" | "isFinite" | "isNaN" | "parseFloat" | "parseInt" | "isSafeInteger") => native(key),
        ("Number", constant) => math_fns::number_constant(constant).map(Value::Number),
        _ => None,
    }
}

/// `new Ctor(...)`.
pub fn construct(interp: &mut Interpreter, ctor: &Value, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match ctor {
        Value::Native(native) if matches!(native.kind, NativeKind::Builtin) => match native.name.as_str() {
            "Date" => Ok(date_fns::construct(&args)),
            "Array" => array_fns::array_constructor(interp, args),
            "RegExp" => regexp_fns::regexp_constructor(&args),
            "Object" | "String" | "Number" | "Boolean" => call_builtin(interp, &native.name, args),
            class if ERROR_CLASSES.contains(&class) => Ok(error_from_args(class, &args)),
            other => Err(RuntimeError::type_error(format!("{} is not a constructor", other))),
        },
        Value::Function(closure) if !closure.def.is_arrow => {
            let this = Value::object(ObjectData::new(closure.name()));
            let result = interp.call_function(ctor, this.clone(), args)?;
            Ok(match result {
                Value::Object(_) | Value::Array(_) => result,
                _ => this,
            })
        }
        other => Err(RuntimeError::type_error(format!(
            "{} is not a constructor",
            other.describe()
        ))),
    }
}

/// An error object as scripts see it: `name` and `message` properties.
pub fn make_error(class: &str, message: &str) -> Value {
    let mut data = ObjectData::new(class);
    data.set("name", Value::string(class));
    data.set("message", Value::string(message));
    Value::object(data)
}

fn error_from_args(class: &str, args: &[Value]) -> Value {
    let message = match args.first() {
        None | Some(Value::Undefined) => String::new(),
        Some(v) => v.to_js_string(),
    };
    make_error(class, &message)
}

fn unknown_builtin(name: &str) -> RuntimeError {
    RuntimeError::type_error(format!("{} is not a function", name))
}

/// First argument of an iteration method, which must be callable.
pub(crate) fn expect_callback<'a>(args: &'a [Value], method: &str) -> Result<&'a Value, RuntimeError> {
    match args.first() {
        Some(callback) if callback.is_callable() => Ok(callback),
        other => Err(RuntimeError::type_error(format!(
            "{} is not a function (in {})",
            other.map(|v| v.describe()).unwrap_or_else(|| "undefined".to_string()),
            method
        ))),
    }
}
