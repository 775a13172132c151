use super::make_error;
use crate::interpreter::Interpreter;
use crate::value::{ElementKind, ObjectData, RuntimeError, Value};
use crate::{ConsoleLevel, RuntimeSideEffect};
use tracing::debug;

const MAX_JSON_DEPTH: usize = 64;

// ---------------------------------------------------------------------------
// console
// ---------------------------------------------------------------------------

pub fn console_fn(interp: &mut Interpreter, method: &str, args: &[Value]) -> Result<Value, RuntimeError> {
    let level = match method {
        "info" => ConsoleLevel::Info,
        "warn" => ConsoleLevel::Warn,
        "error" => ConsoleLevel::Error,
        "debug" => ConsoleLevel::Debug,
        _ => ConsoleLevel::Log,
    };
    let message = format_console_args(args);
    debug!(target: "forge::console", level = level.as_str(), "{}", message);
    interp.emit(RuntimeSideEffect::Console { level, message });
    Ok(Value::Undefined)
}

/// Joins arguments the way a browser console prints them: strings verbatim,
/// everything else inspected.
pub fn format_console_args(args: &[Value]) -> String {
    args.iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => inspect(other, 0),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn inspect(value: &Value, depth: usize) -> String {
    match value {
        Value::String(s) if depth > 0 => format!("'{}'", s),
        Value::Array(items) => {
            if depth > 2 {
                return "[Array]".to_string();
            }
            let items = items.borrow();
            if items.is_empty() {
                return "[]".to_string();
            }
            let parts: Vec<String> = items.iter().map(|v| inspect(v, depth + 1)).collect();
            format!("[ {} ]", parts.join(", "))
        }
        Value::Object(obj) => {
            let data = obj.borrow();
            if data.date_value.is_some() || data.regexp.is_some() || data.class_name.ends_with("Error") {
                return value.to_js_string();
            }
            if depth > 2 {
                return "[Object]".to_string();
            }
            if data.properties.is_empty() {
                return "{}".to_string();
            }
            let parts: Vec<String> = data
                .properties
                .iter()
                .map(|(k, v)| format!("{}: {}", k, inspect(v, depth + 1)))
                .collect();
            format!("{{ {} }}", parts.join(", "))
        }
        Value::Function(c) => format!("[Function: {}]", c.name()),
        Value::Native(n) => format!("[Function: {}]", n.name),
        Value::Element(e) => format!("<{} />", e.display_name()),
        other => other.to_js_string(),
    }
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

pub fn json_fn(method: &str, args: &[Value]) -> Result<Value, RuntimeError> {
    match method {
        "stringify" => {
            let value = args.first().cloned().unwrap_or_default();
            let indent = match args.get(2) {
                Some(Value::Number(n)) if *n >= 1.0 => " ".repeat((*n as usize).min(10)),
                Some(Value::String(s)) => s.chars().take(10).collect(),
                _ => String::new(),
            };
            match to_json(&value, 0)? {
                Some(json) => Ok(Value::String(write_json(&json, &indent))),
                None => Ok(Value::Undefined),
            }
        }
        "parse" => {
            let text = args.first().map(|v| v.to_js_string()).unwrap_or_default();
            match serde_json::from_str::<serde_json::Value>(&text) {
                Ok(json) => Ok(from_json(json)),
                Err(err) => Err(RuntimeError::Thrown(make_error(
                    "SyntaxError",
                    &format!("Unexpected token in JSON: {}", err),
                ))),
            }
        }
        other => Err(RuntimeError::type_error(format!("JSON.{} is not a function", other))),
    }
}

fn write_json(json: &serde_json::Value, indent: &str) -> String {
    if indent.is_empty() {
        return json.to_string();
    }
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    match serde::Serialize::serialize(json, &mut serializer) {
        Ok(()) => String::from_utf8(out).unwrap_or_default(),
        Err(_) => json.to_string(),
    }
}

/// Converts a script value to JSON. `None` marks values JSON omits:
/// `undefined` and functions.
pub fn to_json(value: &Value, depth: usize) -> Result<Option<serde_json::Value>, RuntimeError> {
    if depth > MAX_JSON_DEPTH {
        return Err(RuntimeError::type_error("Converting circular structure to JSON"));
    }
    Ok(Some(match value {
        Value::Undefined | Value::Function(_) | Value::Native(_) => return Ok(None),
        Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => json_number(*n),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Array(items) => {
            let mut out = Vec::new();
            for item in items.borrow().iter() {
                out.push(to_json(item, depth + 1)?.unwrap_or(serde_json::Value::Null));
            }
            serde_json::Value::Array(out)
        }
        Value::Object(obj) => {
            let data = obj.borrow();
            if let Some(ms) = data.date_value {
                return Ok(Some(match super::date_fns::to_iso_string(ms) {
                    Some(iso) => serde_json::Value::String(iso),
                    None => serde_json::Value::Null,
                }));
            }
            let mut map = serde_json::Map::new();
            for (key, item) in &data.properties {
                if let Some(json) = to_json(item, depth + 1)? {
                    map.insert(key.clone(), json);
                }
            }
            serde_json::Value::Object(map)
        }
        Value::Element(element) => {
            let mut map = serde_json::Map::new();
            let kind = match &element.kind {
                ElementKind::Intrinsic(tag) => serde_json::Value::String(tag.clone()),
                _ => serde_json::Value::Null,
            };
            map.insert("type".to_string(), kind);
            map.insert(
                "key".to_string(),
                element.key.clone().map(serde_json::Value::String).unwrap_or(serde_json::Value::Null),
            );
            serde_json::Value::Object(map)
        }
    }))
}

fn json_number(n: f64) -> serde_json::Value {
    if !n.is_finite() {
        return serde_json::Value::Null;
    }
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return serde_json::Value::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

pub fn from_json(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(items) => Value::array(items.into_iter().map(from_json).collect()),
        serde_json::Value::Object(map) => {
            Value::plain_object(map.into_iter().map(|(k, v)| (k, from_json(v))).collect())
        }
    }
}

// ---------------------------------------------------------------------------
// Object statics
// ---------------------------------------------------------------------------

fn own_entries(value: &Value) -> Vec<(String, Value)> {
    match value {
        Value::Object(obj) => obj.borrow().properties.clone(),
        Value::Array(items) => items
            .borrow()
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v.clone()))
            .collect(),
        Value::String(s) => s
            .chars()
            .enumerate()
            .map(|(i, c)| (i.to_string(), Value::String(c.to_string())))
            .collect(),
        _ => Vec::new(),
    }
}

pub fn object_static(method: &str, args: &[Value]) -> Result<Value, RuntimeError> {
    let target = args.first().cloned().unwrap_or_default();
    match method {
        "keys" | "values" | "entries" => {
            if target.is_nullish() {
                return Err(RuntimeError::type_error("Cannot convert undefined or null to object"));
            }
            let entries = own_entries(&target);
            Ok(Value::array(
                entries
                    .into_iter()
                    .map(|(k, v)| match method {
                        "keys" => Value::String(k),
                        "values" => v,
                        _ => Value::array(vec![Value::String(k), v]),
                    })
                    .collect(),
            ))
        }
        "assign" => {
            let Value::Object(obj) = &target else {
                return Err(RuntimeError::type_error("Cannot convert undefined or null to object"));
            };
            for source in &args[1..] {
                for (k, v) in own_entries(source) {
                    obj.borrow_mut().set(k, v);
                }
            }
            Ok(target)
        }
        "freeze" => Ok(target),
        "fromEntries" => {
            let mut data = ObjectData::new("Object");
            if let Value::Array(pairs) = &target {
                for pair in pairs.borrow().iter() {
                    if let Value::Array(pair) = pair {
                        let pair = pair.borrow();
                        let key = pair.first().map(|k| k.to_js_string()).unwrap_or_default();
                        data.set(key, pair.get(1).cloned().unwrap_or_default());
                    }
                }
            }
            Ok(Value::object(data))
        }
        other => Err(RuntimeError::type_error(format!("Object.{} is not a function", other))),
    }
}

// ---------------------------------------------------------------------------
// Conversions, dialogs and timers
// ---------------------------------------------------------------------------

pub fn to_string_fn(args: &[Value]) -> Value {
    match args.first() {
        None => Value::string(""),
        Some(v) => Value::String(v.to_js_string()),
    }
}

pub fn alert_fn(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let message = args.first().map(|v| v.to_js_string()).unwrap_or_default();
    interp.emit(RuntimeSideEffect::Alert(message));
    Ok(Value::Undefined)
}

/// Timers are recorded but never fire: a preview renders once per change.
pub fn set_timer_fn(interp: &mut Interpreter, args: &[Value], repeating: bool) -> Result<Value, RuntimeError> {
    if !args.first().is_some_and(|cb| cb.is_callable()) {
        return Err(RuntimeError::type_error("The callback argument must be a function"));
    }
    let delay = args.get(1).map(|v| v.to_number()).filter(|d| d.is_finite()).unwrap_or(0.0);
    let id = interp.schedule_timer(delay.max(0.0), repeating);
    Ok(Value::Number(id as f64))
}

pub fn clear_timer_fn(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    if let Some(Value::Number(id)) = args.first() {
        interp.emit(RuntimeSideEffect::TimerCleared(*id as u64));
    }
    Ok(Value::Undefined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::format_number;

    #[test]
    fn test_inspect_nested() {
        let value = Value::plain_object(vec![
            ("name".to_string(), Value::string("Ada")),
            ("tags".to_string(), Value::array(vec![Value::Number(1.0), Value::Boolean(true)])),
        ]);
        assert_eq!(inspect(&value, 0), "{ name: 'Ada', tags: [ 1, true ] }");
        assert_eq!(format_console_args(&[Value::string("n ="), Value::Number(2.5)]), "n = 2.5");
    }

    #[test]
    fn test_stringify_skips_undefined_and_keeps_order() {
        let value = Value::plain_object(vec![
            ("b".to_string(), Value::Number(1.0)),
            ("a".to_string(), Value::Undefined),
            ("c".to_string(), Value::array(vec![Value::Undefined, Value::Number(f64::NAN)])),
        ]);
        let out = json_fn("stringify", &[value]).unwrap();
        assert_eq!(out, Value::string(r#"{"b":1,"c":[null,null]}"#));
    }

    #[test]
    fn test_stringify_with_indent() {
        let value = Value::plain_object(vec![("a".to_string(), Value::Number(1.5))]);
        let out = json_fn("stringify", &[value, Value::Null, Value::Number(2.0)]).unwrap();
        assert_eq!(out, Value::string("{\n  \"a\": 1.5\n}"));
    }

    #[test]
    fn test_parse_error_is_thrown_syntax_error() {
        let err = json_fn("parse", &[Value::string("{oops")]).unwrap_err();
        assert!(err.to_string().starts_with("Uncaught SyntaxError"));
    }

    #[test]
    fn test_format_number_in_json() {
        assert_eq!(json_number(3.0), serde_json::json!(3));
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
    }
}
