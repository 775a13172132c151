use super::array_fns::relative_index;
use super::regexp_fns::{self, ScriptRegex};
use crate::interpreter::Interpreter;
use crate::value::{RuntimeError, Value};
use std::rc::Rc;

const STRING_METHODS: &[&str] = &[
    "toUpperCase", "toLowerCase", "trim", "trimStart", "trimEnd", "split", "includes",
    "startsWith", "endsWith", "slice", "substring", "substr", "replace", "replaceAll", "indexOf",
    "lastIndexOf", "charAt", "charCodeAt", "at", "padStart", "padEnd", "repeat", "concat",
    "localeCompare", "toString", "valueOf", "match", "search",
];

pub fn is_string_method(name: &str) -> bool {
    STRING_METHODS.contains(&name)
}

fn string_arg(args: &[Value], index: usize) -> String {
    match args.get(index) {
        Some(v) => v.to_js_string(),
        None => "undefined".to_string(),
    }
}

/// Character offset of a byte offset within `s`.
pub(crate) fn char_index(s: &str, byte: usize) -> usize {
    s[..byte].chars().count()
}

fn char_slice(chars: &[char], start: usize, end: usize) -> String {
    if start < end {
        chars[start..end].iter().collect()
    } else {
        String::new()
    }
}

pub fn call_string_method(
    interp: &mut Interpreter,
    s: &str,
    method: &str,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    let pattern = args.first().and_then(regexp_fns::as_regexp);
    let result = match (method, pattern) {
        ("replaceAll", Some(re)) if !re.is_global() => Err(RuntimeError::type_error(
            "replaceAll must be called with a global RegExp",
        )),
        ("replace" | "replaceAll", Some(re)) => {
            let replacement = args.get(1).cloned().unwrap_or_default();
            regexp_fns::replace_fn(interp, s, &re, &replacement)
        }
        ("split", Some(re)) => Ok(regexp_fns::split_fn(s, &re, split_limit(&args))),
        ("match" | "search", pattern) => {
            let re = match pattern {
                Some(re) => re,
                None => Rc::new(ScriptRegex::new(&regex_source(args.first()), "")?),
            };
            Ok(if method == "match" {
                regexp_fns::match_fn(s, &re)
            } else {
                regexp_fns::search_fn(s, &re)
            })
        }
        ("replace", None) => replace_fn(interp, s, &args, false),
        ("replaceAll", None) => replace_fn(interp, s, &args, true),
        (other, _) => string_method(interp, s, other, &args),
    }?;
    interp.check_size(&result)?;
    Ok(result)
}

fn string_method(interp: &Interpreter, s: &str, method: &str, args: &[Value]) -> Result<Value, RuntimeError> {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len();
    Ok(match method {
        "toUpperCase" => Value::String(s.to_uppercase()),
        "toLowerCase" => Value::String(s.to_lowercase()),
        "trim" => Value::string(s.trim()),
        "trimStart" => Value::string(s.trim_start()),
        "trimEnd" => Value::string(s.trim_end()),
        "toString" | "valueOf" => Value::string(s),
        "split" => split_fn(s, args),
        "includes" => Value::Boolean(s.contains(string_arg(args, 0).as_str())),
        "startsWith" => {
            let start = relative_index(args.get(1), len, 0);
            let rest: String = chars[start..].iter().collect();
            Value::Boolean(rest.starts_with(string_arg(args, 0).as_str()))
        }
        "endsWith" => {
            let end = relative_index(args.get(1), len, len);
            let head: String = chars[..end].iter().collect();
            Value::Boolean(head.ends_with(string_arg(args, 0).as_str()))
        }
        "slice" => {
            let start = relative_index(args.first(), len, 0);
            let end = relative_index(args.get(1), len, len);
            Value::String(char_slice(&chars, start, end))
        }
        "substring" => {
            // negative and NaN arguments clamp to zero, and the bounds may swap
            let clamp = |arg: Option<&Value>, default: usize| match arg {
                None | Some(Value::Undefined) => default,
                Some(v) => v.to_integer().clamp(0, len as i64) as usize,
            };
            let a = clamp(args.first(), 0);
            let b = clamp(args.get(1), len);
            Value::String(char_slice(&chars, a.min(b), a.max(b)))
        }
        "substr" => {
            let start = relative_index(args.first(), len, 0);
            let count = match args.get(1) {
                None | Some(Value::Undefined) => len - start,
                Some(v) => v.to_integer().clamp(0, (len - start) as i64) as usize,
            };
            Value::String(char_slice(&chars, start, start + count))
        }
        "indexOf" => {
            let needle = string_arg(args, 0);
            let from = relative_index(args.get(1), len, 0);
            let offset: usize = chars[..from].iter().map(|c| c.len_utf8()).sum();
            match s[offset..].find(needle.as_str()) {
                Some(byte) => Value::Number(char_index(s, offset + byte) as f64),
                None => Value::Number(-1.0),
            }
        }
        "lastIndexOf" => match s.rfind(string_arg(args, 0).as_str()) {
            Some(byte) => Value::Number(char_index(s, byte) as f64),
            None => Value::Number(-1.0),
        },
        "charAt" => {
            let index = args.first().map(|v| v.to_integer()).unwrap_or(0);
            match usize::try_from(index).ok().and_then(|i| chars.get(i)) {
                Some(c) => Value::String(c.to_string()),
                None => Value::string(""),
            }
        }
        "charCodeAt" => {
            let index = args.first().map(|v| v.to_integer()).unwrap_or(0);
            match usize::try_from(index).ok().and_then(|i| chars.get(i)) {
                Some(c) => Value::Number(*c as u32 as f64),
                None => Value::Number(f64::NAN),
            }
        }
        "at" => {
            let mut index = args.first().map(|v| v.to_integer()).unwrap_or(0);
            if index < 0 {
                index += len as i64;
            }
            match usize::try_from(index).ok().and_then(|i| chars.get(i)) {
                Some(c) => Value::String(c.to_string()),
                None => Value::Undefined,
            }
        }
        "padStart" | "padEnd" => {
            let target = args.first().map(|v| v.to_integer()).unwrap_or(0).max(0) as usize;
            let filler: Vec<char> = match args.get(1) {
                None | Some(Value::Undefined) => vec![' '],
                Some(v) => v.to_js_string().chars().collect(),
            };
            if target <= len || filler.is_empty() {
                Value::string(s)
            } else {
                interp.check_string_len(s.len().saturating_add(target - len))?;
                let pad: String = filler.iter().cycle().take(target - len).collect();
                if method == "padStart" {
                    Value::String(format!("{}{}", pad, s))
                } else {
                    Value::String(format!("{}{}", s, pad))
                }
            }
        }
        "repeat" => {
            let count = args.first().map(|v| v.to_number()).unwrap_or(0.0);
            if count < 0.0 || count.is_infinite() {
                return Err(RuntimeError::Custom(format!(
                    "RangeError: Invalid count value: {}",
                    crate::value::format_number(count)
                )));
            }
            let count = count as usize;
            interp.check_string_len(s.len().saturating_mul(count))?;
            Value::String(s.repeat(count))
        }
        "concat" => {
            let mut out = s.to_string();
            for arg in args {
                out.push_str(&arg.to_js_string());
            }
            Value::String(out)
        }
        "localeCompare" => {
            let other = string_arg(args, 0);
            let ordering = s
                .to_lowercase()
                .cmp(&other.to_lowercase())
                .then_with(|| s.cmp(other.as_str()));
            Value::Number(ordering as i8 as f64)
        }
        other => {
            return Err(RuntimeError::type_error(format!("\"{}\".{} is not a function", s, other)));
        }
    })
}

/// A string passed where a pattern is expected is compiled as one;
/// `undefined` matches the empty string.
fn regex_source(arg: Option<&Value>) -> String {
    match arg {
        None | Some(Value::Undefined) => "(?:)".to_string(),
        Some(v) => v.to_js_string(),
    }
}

fn split_limit(args: &[Value]) -> usize {
    match args.get(1) {
        None | Some(Value::Undefined) => usize::MAX,
        Some(v) => v.to_integer().max(0) as usize,
    }
}

fn split_fn(s: &str, args: &[Value]) -> Value {
    let limit = split_limit(args);
    let parts: Vec<Value> = match args.first() {
        None | Some(Value::Undefined) => vec![Value::string(s)],
        Some(sep) => {
            let sep = sep.to_js_string();
            if sep.is_empty() {
                s.chars().map(|c| Value::String(c.to_string())).collect()
            } else {
                s.split(sep.as_str()).map(Value::string).collect()
            }
        }
    };
    Value::array(parts.into_iter().take(limit).collect())
}

/// `replace` swaps the first occurrence, `replaceAll` every occurrence. The
/// replacement may be a function receiving the match and its offset.
fn replace_fn(interp: &mut Interpreter, s: &str, args: &[Value], all: bool) -> Result<Value, RuntimeError> {
    let pattern = string_arg(args, 0);
    let replacement = args.get(1).cloned().unwrap_or_default();

    let mut out = String::new();
    let mut last = 0;
    let matches: Vec<(usize, &str)> = if pattern.is_empty() {
        vec![(0, "")]
    } else if all {
        s.match_indices(pattern.as_str()).collect()
    } else {
        s.match_indices(pattern.as_str()).take(1).collect()
    };

    for (start, matched) in matches {
        out.push_str(&s[last..start]);
        let text = if replacement.is_callable() {
            interp
                .call_function(
                    &replacement,
                    Value::Undefined,
                    vec![
                        Value::string(matched),
                        Value::Number(char_index(s, start) as f64),
                        Value::string(s),
                    ],
                )?
                .to_js_string()
        } else {
            replacement.to_js_string().replace("$&", matched)
        };
        out.push_str(&text);
        last = start + matched.len();
    }
    out.push_str(&s[last..]);
    Ok(Value::String(out))
}

pub fn string_static(method: &str, args: &[Value]) -> Result<Value, RuntimeError> {
    match method {
        "fromCharCode" => Ok(Value::String(
            args.iter()
                .filter_map(|v| char::from_u32(v.to_integer() as u32))
                .collect(),
        )),
        other => Err(RuntimeError::type_error(format!("String.{} is not a function", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(s: &str, method: &str, args: &[Value]) -> Value {
        let mut interp = Interpreter::new();
        call_string_method(&mut interp, s, method, args.to_vec()).unwrap()
    }

    #[test]
    fn test_slice_and_substring() {
        assert_eq!(call("hello", "slice", &[Value::Number(-3.0)]), Value::string("llo"));
        assert_eq!(
            call("hello", "substring", &[Value::Number(4.0), Value::Number(1.0)]),
            Value::string("ell")
        );
    }

    #[test]
    fn test_split_and_pad() {
        assert_eq!(call("a,b,c", "split", &[Value::string(",")]).to_js_string(), "a,b,c");
        assert_eq!(call("ab", "split", &[Value::string("")]).to_js_string(), "a,b");
        assert_eq!(
            call("7", "padStart", &[Value::Number(3.0), Value::string("0")]),
            Value::string("007")
        );
    }

    #[test]
    fn test_replace_first_and_all() {
        let args = [Value::string("o"), Value::string("0")];
        assert_eq!(call("foo boo", "replace", &args), Value::string("f0o boo"));
        assert_eq!(call("foo boo", "replaceAll", &args), Value::string("f00 b00"));
    }

    #[test]
    fn test_index_of_counts_chars() {
        assert_eq!(call("héllo", "indexOf", &[Value::string("l")]), Value::Number(2.0));
        assert_eq!(call("héllo", "charAt", &[Value::Number(1.0)]), Value::string("é"));
    }

    #[test]
    fn test_oversized_results_are_range_errors() {
        let mut interp = Interpreter::new();
        for (method, args) in [
            ("repeat", vec![Value::Number(1e13)]),
            ("padStart", vec![Value::Number(1e12), Value::string("-")]),
            ("padEnd", vec![Value::Number(1e12)]),
        ] {
            let err = call_string_method(&mut interp, "ab", method, args).unwrap_err();
            assert_eq!(err.message(), "RangeError: Invalid string length", "{}", method);
        }
        assert_eq!(call("ab", "repeat", &[Value::Number(3.0)]), Value::string("ababab"));
    }

    #[test]
    fn test_pattern_arguments() {
        let digits = regexp_fns::make_regexp("\\d", "g").unwrap();
        assert_eq!(call("a1b2", "replace", &[digits.clone(), Value::string("#")]), Value::string("a#b#"));
        assert_eq!(call("a1b2", "split", &[digits.clone()]).to_js_string(), "a,b,");
        assert_eq!(call("a1b2", "match", &[digits]).to_js_string(), "1,2");
        assert_eq!(call("a.b", "search", &[Value::string("\\.")]), Value::Number(1.0));

        let first = regexp_fns::make_regexp("\\d", "").unwrap();
        let mut interp = Interpreter::new();
        let err = call_string_method(&mut interp, "a1", "replaceAll", vec![first, Value::string("")]).unwrap_err();
        assert_eq!(err.message(), "replaceAll must be called with a global RegExp");
    }
}
