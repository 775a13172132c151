//! `RegExp` objects backed by the `regex` crate.
//!
//! Patterns are compiled once, when the literal is evaluated or the
//! constructor runs. Syntax the crate does not support (lookaround,
//! backreferences) is reported as a `SyntaxError` at that point. `lastIndex`
//! is not tracked: `test` and `exec` always search from the start.

use super::string_fns::char_index;
use crate::interpreter::Interpreter;
use crate::value::{ObjectData, RuntimeError, Value};
use regex::{Captures, Regex, RegexBuilder};
use std::rc::Rc;

const REGEXP_METHODS: &[&str] = &["test", "exec", "toString"];

/// The compiled pattern behind a `RegExp` object.
#[derive(Debug, Clone)]
pub struct ScriptRegex {
    pub source: String,
    pub flags: String,
    regex: Regex,
}

impl ScriptRegex {
    pub fn new(source: &str, flags: &str) -> Result<Self, RuntimeError> {
        let mut builder = RegexBuilder::new(source);
        for (i, flag) in flags.char_indices() {
            if flags[..i].contains(flag) {
                return Err(invalid_flags(flags));
            }
            match flag {
                'i' => {
                    builder.case_insensitive(true);
                }
                'm' => {
                    builder.multi_line(true);
                }
                's' => {
                    builder.dot_matches_new_line(true);
                }
                'g' | 'u' | 'y' | 'd' => {}
                _ => return Err(invalid_flags(flags)),
            }
        }
        let regex = builder.build().map_err(|_| {
            RuntimeError::Custom(format!("SyntaxError: Invalid regular expression: /{}/", source))
        })?;
        Ok(Self {
            source: source.to_string(),
            flags: flags.to_string(),
            regex,
        })
    }

    pub fn is_global(&self) -> bool {
        self.flags.contains('g')
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}

impl std::fmt::Display for ScriptRegex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}/{}", self.source, self.flags)
    }
}

fn invalid_flags(flags: &str) -> RuntimeError {
    RuntimeError::Custom(format!(
        "SyntaxError: Invalid flags supplied to RegExp constructor '{}'",
        flags
    ))
}

pub fn make_regexp(source: &str, flags: &str) -> Result<Value, RuntimeError> {
    let mut data = ObjectData::new("RegExp");
    data.regexp = Some(Rc::new(ScriptRegex::new(source, flags)?));
    Ok(Value::object(data))
}

/// `RegExp(pattern, flags)` and `new RegExp(pattern, flags)`.
pub fn regexp_constructor(args: &[Value]) -> Result<Value, RuntimeError> {
    let flags = match args.get(1) {
        None | Some(Value::Undefined) => None,
        Some(flags) => Some(flags.to_js_string()),
    };
    match args.first().and_then(as_regexp) {
        Some(existing) => make_regexp(&existing.source, flags.as_deref().unwrap_or(&existing.flags)),
        None => {
            let source = match args.first() {
                None | Some(Value::Undefined) => "(?:)".to_string(),
                Some(pattern) => pattern.to_js_string(),
            };
            make_regexp(&source, flags.as_deref().unwrap_or(""))
        }
    }
}

pub fn as_regexp(value: &Value) -> Option<Rc<ScriptRegex>> {
    match value {
        Value::Object(obj) => obj.borrow().regexp.clone(),
        _ => None,
    }
}

pub fn is_regexp_method(name: &str) -> bool {
    REGEXP_METHODS.contains(&name)
}

pub fn regexp_property(re: &ScriptRegex, key: &str) -> Option<Value> {
    Some(match key {
        "source" => Value::string(&re.source),
        "flags" => Value::string(&re.flags),
        "global" => Value::Boolean(re.is_global()),
        "ignoreCase" => Value::Boolean(re.flags.contains('i')),
        "multiline" => Value::Boolean(re.flags.contains('m')),
        "lastIndex" => Value::Number(0.0),
        _ => return None,
    })
}

pub fn call_regexp_method(re: &ScriptRegex, method: &str, args: &[Value]) -> Result<Value, RuntimeError> {
    let input = match args.first() {
        Some(v) => v.to_js_string(),
        None => "undefined".to_string(),
    };
    match method {
        "test" => Ok(Value::Boolean(re.regex().is_match(&input))),
        "exec" => Ok(re.regex().captures(&input).map(|caps| capture_array(&caps)).unwrap_or(Value::Null)),
        "toString" => Ok(Value::String(re.to_string())),
        other => Err(RuntimeError::type_error(format!("{}.{} is not a function", re, other))),
    }
}

/// `[match, group1, group2, …]` with `undefined` for groups that did not take part.
fn capture_array(caps: &Captures) -> Value {
    Value::array(
        caps.iter()
            .map(|group| group.map(|m| Value::string(m.as_str())).unwrap_or_default())
            .collect(),
    )
}

/// `String.prototype.match`.
pub fn match_fn(s: &str, re: &ScriptRegex) -> Value {
    if re.is_global() {
        let all: Vec<Value> = re.regex().find_iter(s).map(|m| Value::string(m.as_str())).collect();
        if all.is_empty() { Value::Null } else { Value::array(all) }
    } else {
        re.regex().captures(s).map(|caps| capture_array(&caps)).unwrap_or(Value::Null)
    }
}

/// `String.prototype.search`: character offset of the first match, or -1.
pub fn search_fn(s: &str, re: &ScriptRegex) -> Value {
    match re.regex().find(s) {
        Some(m) => Value::Number(char_index(s, m.start()) as f64),
        None => Value::Number(-1.0),
    }
}

pub fn split_fn(s: &str, re: &ScriptRegex, limit: usize) -> Value {
    if s.is_empty() {
        return Value::array(if re.regex().is_match(s) { Vec::new() } else { vec![Value::string(s)] });
    }
    Value::array(re.regex().split(s).take(limit).map(Value::string).collect())
}

/// `replace`/`replaceAll` with a pattern. Global patterns replace every
/// match, others only the first. A function replacement receives the match,
/// each group, the offset and the whole input.
pub fn replace_fn(
    interp: &mut Interpreter,
    s: &str,
    re: &ScriptRegex,
    replacement: &Value,
) -> Result<Value, RuntimeError> {
    let limit = if re.is_global() { usize::MAX } else { 1 };
    let mut out = String::new();
    let mut last = 0;
    for caps in re.regex().captures_iter(s).take(limit) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&s[last..whole.start()]);
        let text = if replacement.is_callable() {
            let mut args: Vec<Value> = caps
                .iter()
                .map(|group| group.map(|m| Value::string(m.as_str())).unwrap_or_default())
                .collect();
            args.push(Value::Number(char_index(s, whole.start()) as f64));
            args.push(Value::string(s));
            interp.call_function(replacement, Value::Undefined, args)?.to_js_string()
        } else {
            expand_replacement(&replacement.to_js_string(), &caps, s)
        };
        out.push_str(&text);
        interp.check_string_len(out.len())?;
        last = whole.end();
    }
    out.push_str(&s[last..]);
    Ok(Value::String(out))
}

/// Expands `$$`, `$&`, `` $` ``, `$'` and `$1`..`$99` in a replacement string.
fn expand_replacement(template: &str, caps: &Captures, input: &str) -> String {
    let Some(whole) = caps.get(0) else {
        return template.to_string();
    };
    let mut out = String::new();
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('$') => {
                chars.next();
                out.push('$');
            }
            Some('&') => {
                chars.next();
                out.push_str(whole.as_str());
            }
            Some('`') => {
                chars.next();
                out.push_str(&input[..whole.start()]);
            }
            Some('\'') => {
                chars.next();
                out.push_str(&input[whole.end()..]);
            }
            Some(d) if d.is_ascii_digit() => {
                chars.next();
                let mut index = d.to_digit(10).unwrap_or(0) as usize;
                // two digits only when that group exists
                if let Some(next) = chars.peek().and_then(|n| n.to_digit(10)) {
                    let two = index * 10 + next as usize;
                    if two > 0 && two < caps.len() {
                        chars.next();
                        index = two;
                    }
                }
                if index == 0 || index >= caps.len() {
                    out.push('$');
                    out.push(d);
                } else if let Some(group) = caps.get(index) {
                    out.push_str(group.as_str());
                }
            }
            _ => out.push('$'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regexp(source: &str, flags: &str) -> ScriptRegex {
        ScriptRegex::new(source, flags).unwrap()
    }

    #[test]
    fn test_flags() {
        assert!(regexp("^abc$", "i").regex().is_match("ABC"));
        assert!(regexp("^b$", "m").regex().is_match("a\nb"));
        assert!(ScriptRegex::new("a", "gg").is_err());
        assert!(ScriptRegex::new("a", "x").is_err());
    }

    #[test]
    fn test_unsupported_syntax_is_a_syntax_error() {
        let err = ScriptRegex::new("(?=a)", "").unwrap_err();
        assert_eq!(err.message(), "SyntaxError: Invalid regular expression: /(?=a)/");
    }

    #[test]
    fn test_match_global_and_single() {
        let digits = regexp("\\d+", "g");
        assert_eq!(match_fn("a1b22c333", &digits).to_js_string(), "1,22,333");
        let pair = regexp("(\\w)(\\d)?", "");
        assert_eq!(match_fn("x", &pair).to_js_string(), "x,x,");
        assert_eq!(match_fn("", &digits), Value::Null);
    }

    #[test]
    fn test_replacement_patterns() {
        let mut interp = Interpreter::new();
        let swap = regexp("(\\w+) (\\w+)", "");
        let out = replace_fn(&mut interp, "hello world", &swap, &Value::string("$2 $1 [$&] $$")).unwrap();
        assert_eq!(out, Value::string("world hello [hello world] $"));
    }

    #[test]
    fn test_search_counts_chars() {
        assert_eq!(search_fn("héllo", &regexp("l", "")), Value::Number(2.0));
        assert_eq!(search_fn("abc", &regexp("z", "")), Value::Number(-1.0));
    }

    #[test]
    fn test_display() {
        assert_eq!(regexp("a/b", "gi").to_string(), "/a/b/gi");
    }
}
