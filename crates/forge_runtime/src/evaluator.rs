//! Operator semantics shared by the interpreter and the builtins.

use crate::value::{RuntimeError, Value};
use forge_parser::ast::BinaryOp;
use std::cmp::Ordering;
use std::rc::Rc;

pub fn binary_op(op: BinaryOp, l: &Value, r: &Value) -> Result<Value, RuntimeError> {
    Ok(match op {
        BinaryOp::Add => add_values(l, r),
        BinaryOp::Subtract => Value::Number(l.to_number() - r.to_number()),
        BinaryOp::Multiply => Value::Number(l.to_number() * r.to_number()),
        BinaryOp::Divide => Value::Number(l.to_number() / r.to_number()),
        BinaryOp::Modulo => Value::Number(l.to_number() % r.to_number()),
        BinaryOp::Exponent => Value::Number(l.to_number().powf(r.to_number())),
        BinaryOp::StrictEqual => Value::Boolean(strict_equals(l, r)),
        BinaryOp::StrictNotEqual => Value::Boolean(!strict_equals(l, r)),
        BinaryOp::Equal => Value::Boolean(loose_equals(l, r)),
        BinaryOp::NotEqual => Value::Boolean(!loose_equals(l, r)),
        BinaryOp::LessThan => Value::Boolean(compare_values(l, r) == Some(Ordering::Less)),
        BinaryOp::LessThanOrEqual => Value::Boolean(matches!(
            compare_values(l, r),
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOp::GreaterThan => Value::Boolean(compare_values(l, r) == Some(Ordering::Greater)),
        BinaryOp::GreaterThanOrEqual => Value::Boolean(matches!(
            compare_values(l, r),
            Some(Ordering::Greater | Ordering::Equal)
        )),
        BinaryOp::InstanceOf => Value::Boolean(instance_of(l, r)?),
        BinaryOp::BitAnd => Value::Number((l.to_int32() & r.to_int32()) as f64),
        BinaryOp::BitOr => Value::Number((l.to_int32() | r.to_int32()) as f64),
        BinaryOp::BitXor => Value::Number((l.to_int32() ^ r.to_int32()) as f64),
        BinaryOp::ShiftLeft => Value::Number(l.to_int32().wrapping_shl(r.to_uint32()) as f64),
        BinaryOp::ShiftRight => Value::Number(l.to_int32().wrapping_shr(r.to_uint32()) as f64),
        BinaryOp::UnsignedShiftRight => Value::Number(l.to_uint32().wrapping_shr(r.to_uint32()) as f64),
    })
}

pub fn add_values(l: &Value, r: &Value) -> Value {
    let l = to_primitive(l);
    let r = to_primitive(r);
    match (&l, &r) {
        (Value::String(a), _) => Value::String(format!("{}{}", a, r.to_js_string())),
        (_, Value::String(b)) => Value::String(format!("{}{}", l.to_js_string(), b)),
        _ => Value::Number(l.to_number() + r.to_number()),
    }
}

/// Objects and arrays take part in `+` through their string form.
fn to_primitive(v: &Value) -> Value {
    match v {
        Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Native(_) | Value::Element(_) => {
            Value::String(v.to_js_string())
        }
        other => other.clone(),
    }
}

pub fn strict_equals(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Boolean(a), Value::Boolean(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
        (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
        (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
        (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
        (Value::Element(a), Value::Element(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}

/// `Object.is`: like strict equality, but NaN equals NaN and +0 differs from -0.
/// Hook dependency lists and state updates compare with this.
pub fn same_value(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Number(a), Value::Number(b)) => {
            if a.is_nan() && b.is_nan() {
                true
            } else {
                a == b && a.is_sign_negative() == b.is_sign_negative()
            }
        }
        _ => strict_equals(l, r),
    }
}

/// Equality used by `includes` and `indexOf`-like lookups that treat NaN as equal.
pub fn same_value_zero(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
        _ => strict_equals(l, r),
    }
}

pub fn loose_equals(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
        (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
        (Value::Number(_), Value::String(_))
        | (Value::String(_), Value::Number(_))
        | (Value::Boolean(_), _)
        | (_, Value::Boolean(_)) => {
            let (a, b) = (to_primitive(l), to_primitive(r));
            if matches!((&a, &b), (Value::String(_), Value::String(_))) {
                return strict_equals(&a, &b);
            }
            a.to_number() == b.to_number()
        }
        (Value::Array(_) | Value::Object(_), Value::String(_) | Value::Number(_))
        | (Value::String(_) | Value::Number(_), Value::Array(_) | Value::Object(_)) => {
            loose_equals(&to_primitive(l), &to_primitive(r))
        }
        _ => strict_equals(l, r),
    }
}

/// Relational comparison; `None` when NaN is involved.
pub fn compare_values(l: &Value, r: &Value) -> Option<Ordering> {
    let (a, b) = (to_primitive(l), to_primitive(r));
    match (&a, &b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => a.to_number().partial_cmp(&b.to_number()),
    }
}

fn instance_of(l: &Value, r: &Value) -> Result<bool, RuntimeError> {
    match r {
        Value::Native(ctor) => Ok(match (ctor.name.as_str(), l) {
            ("Array", Value::Array(_)) => true,
            ("Object", Value::Array(_) | Value::Object(_) | Value::Element(_)) => true,
            ("Date", Value::Object(o)) => o.borrow().date_value.is_some(),
            ("Error", Value::Object(o)) => o.borrow().class_name.ends_with("Error"),
            (name, Value::Object(o)) => o.borrow().class_name == name,
            _ => false,
        }),
        Value::Function(_) => Ok(false),
        other => Err(RuntimeError::type_error(format!(
            "Right-hand side of 'instanceof' is not callable ({})",
            other.describe()
        ))),
    }
}

/// Default `Array.prototype.sort` order: compare string forms, undefined last.
pub fn default_sort_order(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Undefined, Value::Undefined) => Ordering::Equal,
        (Value::Undefined, _) => Ordering::Greater,
        (_, Value::Undefined) => Ordering::Less,
        _ => a.to_js_string().cmp(&b.to_js_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_concatenates_with_strings() {
        assert_eq!(add_values(&Value::string("a"), &Value::Number(1.0)), Value::string("a1"));
        assert_eq!(add_values(&Value::Number(1.0), &Value::Number(2.0)), Value::Number(3.0));
        assert_eq!(
            add_values(&Value::array(vec![Value::Number(1.0), Value::Number(2.0)]), &Value::string("")),
            Value::string("1,2")
        );
    }

    #[test]
    fn test_loose_equality() {
        assert!(loose_equals(&Value::Null, &Value::Undefined));
        assert!(loose_equals(&Value::string("1"), &Value::Number(1.0)));
        assert!(loose_equals(&Value::Boolean(true), &Value::Number(1.0)));
        assert!(!loose_equals(&Value::Null, &Value::Number(0.0)));
    }

    #[test]
    fn test_same_value_nan_and_zero() {
        assert!(same_value(&Value::Number(f64::NAN), &Value::Number(f64::NAN)));
        assert!(!same_value(&Value::Number(0.0), &Value::Number(-0.0)));
        assert!(!strict_equals(&Value::Number(f64::NAN), &Value::Number(f64::NAN)));
    }

    #[test]
    fn test_string_comparison_is_lexicographic() {
        assert_eq!(compare_values(&Value::string("10"), &Value::string("9")), Some(Ordering::Less));
        assert_eq!(compare_values(&Value::Number(10.0), &Value::string("9")), Some(Ordering::Greater));
        assert_eq!(compare_values(&Value::Number(f64::NAN), &Value::Number(1.0)), None);
    }
}
