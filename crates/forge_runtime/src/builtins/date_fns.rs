use crate::value::{ObjectData, RuntimeError, Value};
use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};

const DATE_METHODS: &[&str] = &[
    "getTime", "valueOf", "getFullYear", "getMonth", "getDate", "getDay", "getHours",
    "getMinutes", "getSeconds", "getMilliseconds", "getTimezoneOffset", "toISOString", "toJSON",
    "toLocaleDateString", "toLocaleTimeString", "toLocaleString", "toDateString",
    "toTimeString", "toString",
];

pub fn is_date_method(name: &str) -> bool {
    DATE_METHODS.contains(&name)
}

pub fn now_ms() -> f64 {
    Utc::now().timestamp_millis() as f64
}

pub fn make_date(ms: f64) -> Value {
    let mut data = ObjectData::new("Date");
    data.date_value = Some(if ms.is_finite() { ms.trunc() } else { f64::NAN });
    Value::object(data)
}

fn local(ms: f64) -> Option<DateTime<Local>> {
    if !ms.is_finite() {
        return None;
    }
    Local.timestamp_millis_opt(ms as i64).single()
}

/// `new Date(...)`.
pub fn construct(args: &[Value]) -> Value {
    match args {
        [] => make_date(now_ms()),
        [Value::String(s)] => make_date(parse_date(s)),
        [Value::Object(obj)] => make_date(obj.borrow().date_value.unwrap_or(f64::NAN)),
        [single] => make_date(single.to_number()),
        parts => {
            let field = |i: usize, default: f64| parts.get(i).map(|v| v.to_number()).unwrap_or(default);
            make_date(local_ms(
                field(0, f64::NAN),
                field(1, 0.0),
                field(2, 1.0),
                field(3, 0.0),
                field(4, 0.0),
                field(5, 0.0),
                field(6, 0.0),
            ))
        }
    }
}

/// Local time from calendar fields; months are zero-based and may overflow
/// into the following year, as in `new Date(2024, 12, 1)`.
fn local_ms(year: f64, month: f64, day: f64, hours: f64, minutes: f64, seconds: f64, ms: f64) -> f64 {
    if [year, month, day, hours, minutes, seconds, ms].iter().any(|f| !f.is_finite()) {
        return f64::NAN;
    }
    let total_months = year as i64 * 12 + month as i64;
    let (y, m) = (total_months.div_euclid(12), total_months.rem_euclid(12) as u32 + 1);
    let Some(first) = NaiveDate::from_ymd_opt(y as i32, m, 1) else {
        return f64::NAN;
    };
    let Some(midnight) = first.and_hms_opt(0, 0, 0) else {
        return f64::NAN;
    };
    let offset_ms = ((day - 1.0) * 86_400_000.0) + hours * 3_600_000.0 + minutes * 60_000.0 + seconds * 1000.0 + ms;
    match Local.from_local_datetime(&midnight).earliest() {
        Some(dt) => dt.timestamp_millis() as f64 + offset_ms,
        None => f64::NAN,
    }
}

/// Parses the formats scripts commonly hand to `new Date(string)`. Date-only
/// ISO strings are UTC; date-time strings without an offset are local.
pub fn parse_date(s: &str) -> f64 {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.timestamp_millis() as f64;
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp_millis() as f64)
            .unwrap_or(f64::NAN);
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.timestamp_millis() as f64)
                .unwrap_or(f64::NAN);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return dt.timestamp_millis() as f64;
    }
    f64::NAN
}

pub fn date_static(method: &str, args: &[Value]) -> Result<Value, RuntimeError> {
    match method {
        "now" => Ok(Value::Number(now_ms())),
        "parse" => Ok(Value::Number(parse_date(
            &args.first().map(|v| v.to_js_string()).unwrap_or_default(),
        ))),
        other => Err(RuntimeError::type_error(format!("Date.{} is not a function", other))),
    }
}

pub fn to_iso_string(ms: f64) -> Option<String> {
    if !ms.is_finite() {
        return None;
    }
    Utc.timestamp_millis_opt(ms as i64)
        .single()
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
}

/// `String(date)`, e.g. `Sun Oct 18 2026 14:03:00 GMT+0200`.
pub fn date_to_string(ms: f64) -> String {
    match local(ms) {
        Some(dt) => dt.format("%a %b %d %Y %H:%M:%S GMT%z").to_string(),
        None => "Invalid Date".to_string(),
    }
}

pub fn call_date_method(ms: f64, method: &str, _args: &[Value]) -> Result<Value, RuntimeError> {
    if matches!(method, "getTime" | "valueOf") {
        return Ok(Value::Number(ms));
    }
    if method == "toISOString" {
        return match to_iso_string(ms) {
            Some(iso) => Ok(Value::String(iso)),
            None => Err(RuntimeError::Custom("RangeError: Invalid time value".to_string())),
        };
    }
    if method == "toJSON" {
        return Ok(to_iso_string(ms).map(Value::String).unwrap_or(Value::Null));
    }

    let Some(dt) = local(ms) else {
        return Ok(if method.starts_with("get") {
            Value::Number(f64::NAN)
        } else {
            Value::string("Invalid Date")
        });
    };
    let number = |n: u32| -> Result<Value, RuntimeError> { Ok(Value::Number(n as f64)) };
    let text = |format: &str| -> Result<Value, RuntimeError> { Ok(Value::String(dt.format(format).to_string())) };
    match method {
        "getFullYear" => Ok(Value::Number(dt.year() as f64)),
        "getMonth" => number(dt.month0()),
        "getDate" => number(dt.day()),
        "getDay" => number(dt.weekday().num_days_from_sunday()),
        "getHours" => number(dt.hour()),
        "getMinutes" => number(dt.minute()),
        "getSeconds" => number(dt.second()),
        "getMilliseconds" => number(dt.timestamp_subsec_millis()),
        "getTimezoneOffset" => Ok(Value::Number(-(dt.offset().local_minus_utc() as f64) / 60.0)),
        "toLocaleDateString" => text("%-m/%-d/%Y"),
        "toLocaleTimeString" => text("%-I:%M:%S %p"),
        "toLocaleString" => text("%-m/%-d/%Y, %-I:%M:%S %p"),
        "toDateString" => text("%a %b %d %Y"),
        "toTimeString" => text("%H:%M:%S GMT%z"),
        "toString" => Ok(Value::String(date_to_string(ms))),
        other => Err(RuntimeError::type_error(format!("date.{} is not a function", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_round_trip() {
        let ms = parse_date("2024-03-05T10:20:30.250Z");
        assert_eq!(to_iso_string(ms).as_deref(), Some("2024-03-05T10:20:30.250Z"));
    }

    #[test]
    fn test_date_only_strings_are_utc() {
        assert_eq!(parse_date("1970-01-02"), 86_400_000.0);
    }

    #[test]
    fn test_invalid_date() {
        assert!(parse_date("not a date").is_nan());
        assert_eq!(date_to_string(f64::NAN), "Invalid Date");
        assert!(call_date_method(f64::NAN, "toISOString", &[]).is_err());
    }

    #[test]
    fn test_month_overflow_rolls_into_next_year() {
        let overflow = local_ms(2023.0, 12.0, 1.0, 0.0, 0.0, 0.0, 0.0);
        let january = local_ms(2024.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0);
        assert_eq!(overflow, january);
    }
}
