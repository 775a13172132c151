use crate::interpreter::Interpreter;
use crate::value::{format_number, RuntimeError, Value};

const NUMBER_METHODS: &[&str] = &["toFixed", "toString", "toLocaleString", "toPrecision", "valueOf"];

pub fn is_number_method(name: &str) -> bool {
    NUMBER_METHODS.contains(&name)
}

fn num(args: &[Value], index: usize) -> f64 {
    args.get(index).map(|v| v.to_number()).unwrap_or(f64::NAN)
}

/// `Math.round` rounds half-way cases towards positive infinity.
pub fn js_round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() {
        return n;
    }
    (n + 0.5).floor()
}

pub fn call_math(interp: &mut Interpreter, method: &str, args: &[Value]) -> Result<Value, RuntimeError> {
    let x = num(args, 0);
    let n = match method {
        "abs" => x.abs(),
        "floor" => x.floor(),
        "ceil" => x.ceil(),
        "round" => js_round(x),
        "trunc" => x.trunc(),
        "sign" => {
            if x.is_nan() || x == 0.0 {
                x
            } else {
                x.signum()
            }
        }
        "sqrt" => x.sqrt(),
        "cbrt" => x.cbrt(),
        "pow" => x.powf(num(args, 1)),
        "min" => fold_extreme(args, f64::INFINITY, f64::min),
        "max" => fold_extreme(args, f64::NEG_INFINITY, f64::max),
        "random" => interp.next_random(),
        "sin" => x.sin(),
        "cos" => x.cos(),
        "tan" => x.tan(),
        "asin" => x.asin(),
        "acos" => x.acos(),
        "atan" => x.atan(),
        "atan2" => x.atan2(num(args, 1)),
        "log" => x.ln(),
        "log10" => x.log10(),
        "log2" => x.log2(),
        "exp" => x.exp(),
        "hypot" => args.iter().map(|v| v.to_number().powi(2)).sum::<f64>().sqrt(),
        other => {
            return Err(RuntimeError::type_error(format!("Math.{} is not a function", other)));
        }
    };
    Ok(Value::Number(n))
}

/// `Math.min` / `Math.max`: any NaN argument poisons the result.
fn fold_extreme(args: &[Value], start: f64, pick: fn(f64, f64) -> f64) -> f64 {
    let mut acc = start;
    for arg in args {
        let n = arg.to_number();
        if n.is_nan() {
            return f64::NAN;
        }
        acc = pick(acc, n);
    }
    acc
}

pub fn number_constant(name: &str) -> Option<f64> {
    Some(match name {
        "MAX_SAFE_INTEGER" => 9_007_199_254_740_991.0,
        "MIN_SAFE_INTEGER" => -9_007_199_254_740_991.0,
        "EPSILON" => f64::EPSILON,
        "MAX_VALUE" => f64::MAX,
        "MIN_VALUE" => 5e-324,
        "POSITIVE_INFINITY" => f64::INFINITY,
        "NEGATIVE_INFINITY" => f64::NEG_INFINITY,
        "NaN" => f64::NAN,
        _ => return None,
    })
}

pub fn number_static(method: &str, args: &[Value]) -> Result<Value, RuntimeError> {
    let is_number = matches!(args.first(), Some(Value::Number(_)));
    let x = num(args, 0);
    match method {
        "isInteger" => Ok(Value::Boolean(is_number && x.is_finite() && x.fract() == 0.0)),
        "isSafeInteger" => Ok(Value::Boolean(
            is_number && x.is_finite() && x.fract() == 0.0 && x.abs() <= 9_007_199_254_740_991.0,
        )),
        "isFinite" => Ok(Value::Boolean(is_number && x.is_finite())),
        "isNaN" => Ok(Value::Boolean(is_number && x.is_nan())),
        "parseFloat" => parse_float_fn(args),
        "parseInt" => parse_int_fn(args),
        other => Err(RuntimeError::type_error(format!("Number.{} is not a function", other))),
    }
}

pub fn call_number_method(n: f64, method: &str, args: &[Value]) -> Result<Value, RuntimeError> {
    match method {
        "toFixed" => {
            let digits = args.first().map(|v| v.to_integer()).unwrap_or(0);
            if !(0..=100).contains(&digits) {
                return Err(RuntimeError::Custom(
                    "RangeError: toFixed() digits argument must be between 0 and 100".to_string(),
                ));
            }
            Ok(Value::String(to_fixed(n, digits as usize)))
        }
        "toString" => {
            let radix = match args.first() {
                None | Some(Value::Undefined) => 10,
                Some(v) => v.to_integer(),
            };
            if !(2..=36).contains(&radix) {
                return Err(RuntimeError::Custom(
                    "RangeError: toString() radix must be between 2 and 36".to_string(),
                ));
            }
            Ok(Value::String(to_radix_string(n, radix as u32)))
        }
        "toPrecision" => match args.first() {
            None | Some(Value::Undefined) => Ok(Value::String(format_number(n))),
            Some(p) => {
                let precision = p.to_integer().clamp(1, 100) as usize;
                Ok(Value::String(to_precision(n, precision)))
            }
        },
        "toLocaleString" => Ok(Value::String(to_locale_string(n, args.get(1)))),
        "valueOf" => Ok(Value::Number(n)),
        other => Err(RuntimeError::type_error(format!(
            "{}.{} is not a function",
            format_number(n),
            other
        ))),
    }
}

/// `Number.prototype.toFixed`: ties round away from zero and negative
/// inputs keep their sign even when they round to zero.
pub fn to_fixed(n: f64, digits: usize) -> String {
    if !n.is_finite() || n.abs() >= 1e21 {
        return format_number(n);
    }
    let scale = 10f64.powi(digits as i32);
    let scaled = n.abs() * scale;
    let rounded = if scaled.fract() == 0.5 { scaled.ceil() } else { scaled.round() };
    let value = rounded / scale;
    let sign = if n < 0.0 { "-" } else { "" };
    format!("{}{:.*}", sign, digits, value)
}

fn to_precision(n: f64, precision: usize) -> String {
    if !n.is_finite() || n == 0.0 {
        return if n == 0.0 { to_fixed(0.0, precision - 1) } else { format_number(n) };
    }
    let exponent = n.abs().log10().floor() as i32;
    if exponent < -6 || exponent >= precision as i32 {
        let formatted = format!("{:.*e}", precision - 1, n);
        return match formatted.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
            _ => formatted,
        };
    }
    let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
    to_fixed(n, decimals)
}

fn to_radix_string(n: f64, radix: u32) -> String {
    if radix == 10 || !n.is_finite() || n.fract() != 0.0 {
        return format_number(n);
    }
    let negative = n < 0.0;
    let mut value = n.abs() as u64;
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        let digit = (value % radix as u64) as u32;
        digits.push(char::from_digit(digit, radix).unwrap_or('0'));
        value /= radix as u64;
    }
    if negative {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

/// en-US number formatting with the options scripts commonly pass:
/// `minimumFractionDigits`, `maximumFractionDigits`, and `style` of
/// `decimal`, `currency` or `percent`.
pub fn to_locale_string(n: f64, options: Option<&Value>) -> String {
    let option = |name: &str| -> Option<Value> {
        match options {
            Some(Value::Object(obj)) => obj.borrow().get(name).cloned(),
            _ => None,
        }
    };
    let style = option("style").map(|v| v.to_js_string()).unwrap_or_else(|| "decimal".to_string());
    let (default_min, default_max) = match style.as_str() {
        "currency" => (2, 2),
        "percent" => (0, 0),
        _ => (0, 3),
    };
    let min = option("minimumFractionDigits")
        .map(|v| v.to_integer().clamp(0, 20) as usize)
        .unwrap_or(default_min);
    let max = option("maximumFractionDigits")
        .map(|v| v.to_integer().clamp(0, 20) as usize)
        .unwrap_or(default_max)
        .max(min);

    let value = if style == "percent" { n * 100.0 } else { n };
    if !value.is_finite() {
        return if value.is_nan() { "NaN".to_string() } else if value > 0.0 { "∞".to_string() } else { "-∞".to_string() };
    }

    let fixed = to_fixed(value.abs(), max);
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i.to_string(), f.to_string()),
        None => (fixed.clone(), String::new()),
    };
    let mut frac = frac_part.trim_end_matches('0').to_string();
    while frac.len() < min {
        frac.push('0');
    }

    let mut grouped = String::new();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let mut body = if frac.is_empty() { grouped } else { format!("{}.{}", grouped, frac) };

    match style.as_str() {
        "currency" => {
            let code = option("currency").map(|v| v.to_js_string().to_uppercase()).unwrap_or_default();
            let symbol = match code.as_str() {
                "USD" | "" => "$".to_string(),
                "EUR" => "€".to_string(),
                "GBP" => "£".to_string(),
                "JPY" => "¥".to_string(),
                "INR" => "₹".to_string(),
                other => format!("{}\u{a0}", other),
            };
            body = format!("{}{}", symbol, body);
        }
        "percent" => body.push('%'),
        _ => {}
    }
    if value < 0.0 && body.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-{}", body)
    } else {
        body
    }
}

pub fn parse_int_fn(args: &[Value]) -> Result<Value, RuntimeError> {
    let text = args.first().map(|v| v.to_js_string()).unwrap_or_default();
    let mut s = text.trim_start();
    let mut negative = false;
    if let Some(rest) = s.strip_prefix('-') {
        negative = true;
        s = rest;
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest;
    }

    let mut radix = match args.get(1) {
        None | Some(Value::Undefined) => 0,
        Some(v) => v.to_integer(),
    };
    if radix == 0 || radix == 16 {
        if let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            s = rest;
            radix = 16;
        }
    }
    if radix == 0 {
        radix = 10;
    }
    if !(2..=36).contains(&radix) {
        return Ok(Value::Number(f64::NAN));
    }

    let digits: String = s.chars().take_while(|c| c.is_digit(radix as u32)).collect();
    if digits.is_empty() {
        return Ok(Value::Number(f64::NAN));
    }
    let mut value = 0f64;
    for c in digits.chars() {
        value = value * radix as f64 + c.to_digit(radix as u32).unwrap_or(0) as f64;
    }
    Ok(Value::Number(if negative { -value } else { value }))
}

pub fn parse_float_fn(args: &[Value]) -> Result<Value, RuntimeError> {
    let text = args.first().map(|v| v.to_js_string()).unwrap_or_default();
    let s = text.trim_start();
    let unsigned = s.trim_start_matches(['+', '-']);
    if unsigned.starts_with("Infinity") {
        return Ok(Value::Number(if s.starts_with('-') { f64::NEG_INFINITY } else { f64::INFINITY }));
    }

    // longest prefix of the form [sign] digits [. digits] [e [sign] digits]
    let bytes = s.as_bytes();
    let mut end = 0;
    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    if end == digits_start || &s[digits_start..end] == "." {
        return Ok(Value::Number(f64::NAN));
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }
    Ok(Value::Number(s[..end].parse::<f64>().unwrap_or(f64::NAN)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_up() {
        assert_eq!(js_round(2.5), 3.0);
        assert_eq!(js_round(-2.5), -2.0);
        assert_eq!(js_round(-2.6), -3.0);
    }

    #[test]
    fn test_to_fixed() {
        assert_eq!(to_fixed(2.5, 0), "3");
        assert_eq!(to_fixed(3.14159, 2), "3.14");
        assert_eq!(to_fixed(-0.004, 2), "-0.00");
        assert_eq!(to_fixed(10.0, 2), "10.00");
    }

    #[test]
    fn test_locale_string() {
        assert_eq!(to_locale_string(1234567.891, None), "1,234,567.891");
        assert_eq!(to_locale_string(-1000.0, None), "-1,000");
        let currency = Value::plain_object(vec![
            ("style".to_string(), Value::string("currency")),
            ("currency".to_string(), Value::string("USD")),
        ]);
        assert_eq!(to_locale_string(1234.5, Some(&currency)), "$1,234.50");
    }

    #[test]
    fn test_parse_int_and_float() {
        assert_eq!(parse_int_fn(&[Value::string("42px")]).unwrap(), Value::Number(42.0));
        assert_eq!(parse_int_fn(&[Value::string("0x1F")]).unwrap(), Value::Number(31.0));
        assert_eq!(
            parse_int_fn(&[Value::string("101"), Value::Number(2.0)]).unwrap(),
            Value::Number(5.0)
        );
        assert!(parse_int_fn(&[Value::string("abc")]).unwrap().to_number().is_nan());
        assert_eq!(parse_float_fn(&[Value::string("3.5em")]).unwrap(), Value::Number(3.5));
        assert_eq!(parse_float_fn(&[Value::string("-.5")]).unwrap(), Value::Number(-0.5));
        assert_eq!(parse_float_fn(&[Value::string("1e3x")]).unwrap(), Value::Number(1000.0));
    }

    #[test]
    fn test_radix_string() {
        assert_eq!(to_radix_string(255.0, 16), "ff");
        assert_eq!(to_radix_string(-5.0, 2), "-101");
    }
}
