use super::expect_callback;
use crate::evaluator::{default_sort_order, same_value_zero, strict_equals};
use crate::interpreter::{Interpreter, MAX_ARRAY_LENGTH};
use crate::value::{join_array, RuntimeError, Value, MAX_NESTING_DEPTH};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

type Items = Rc<RefCell<Vec<Value>>>;

const ARRAY_METHODS: &[&str] = &[
    "map", "filter", "forEach", "reduce", "reduceRight", "find", "findIndex", "findLast",
    "findLastIndex", "some", "every", "includes", "indexOf", "lastIndexOf", "join", "slice",
    "splice", "concat", "push", "pop", "shift", "unshift", "reverse", "sort", "flat", "flatMap",
    "fill", "at", "toString",
];

pub fn is_array_method(name: &str) -> bool {
    ARRAY_METHODS.contains(&name)
}

pub fn call_array_method(
    interp: &mut Interpreter,
    items: &Items,
    method: &str,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    let result = match method {
        "map" => map_fn(interp, items, &args),
        "filter" => filter_fn(interp, items, &args),
        "forEach" => for_each_fn(interp, items, &args),
        "reduce" => reduce_fn(interp, items, &args, false),
        "reduceRight" => reduce_fn(interp, items, &args, true),
        "find" => find_fn(interp, items, &args, false, false),
        "findIndex" => find_fn(interp, items, &args, true, false),
        "findLast" => find_fn(interp, items, &args, false, true),
        "findLastIndex" => find_fn(interp, items, &args, true, true),
        "some" => some_fn(interp, items, &args),
        "every" => every_fn(interp, items, &args),
        "flatMap" => match map_fn(interp, items, &args)? {
            Value::Array(mapped) => Ok(Value::array(flatten(interp, &mapped.borrow(), 1)?)),
            other => Ok(other),
        },
        "sort" => sort_fn(interp, items, &args),
        other => call_plain_method(interp, items, other, &args),
    }?;
    interp.check_array_len(items.borrow().len())?;
    interp.check_size(&result)?;
    Ok(result)
}

// ---------------------------------------------------------------------------
// Callback methods. The length is fixed when the call starts; each element is
// read from the live array, so the callback sees its own mutations. Indices
// that no longer exist are skipped, except by the find family.
// ---------------------------------------------------------------------------

fn live_item(items: &Items, index: usize) -> Option<Value> {
    items.borrow().get(index).cloned()
}

fn call_back(
    interp: &mut Interpreter,
    callback: &Value,
    item: Value,
    index: usize,
    items: &Items,
) -> Result<Value, RuntimeError> {
    interp.call_function(
        callback,
        Value::Undefined,
        vec![item, Value::Number(index as f64), Value::Array(items.clone())],
    )
}

pub fn map_fn(interp: &mut Interpreter, items: &Items, args: &[Value]) -> Result<Value, RuntimeError> {
    let callback = expect_callback(args, "map")?;
    let len = items.borrow().len();
    let mut result = Vec::with_capacity(len);
    for i in 0..len {
        let mapped = match live_item(items, i) {
            Some(item) => call_back(interp, callback, item, i, items)?,
            None => Value::Undefined,
        };
        result.push(mapped);
    }
    Ok(Value::array(result))
}

pub fn filter_fn(interp: &mut Interpreter, items: &Items, args: &[Value]) -> Result<Value, RuntimeError> {
    let callback = expect_callback(args, "filter")?;
    let len = items.borrow().len();
    let mut result = Vec::new();
    for i in 0..len {
        let Some(item) = live_item(items, i) else { continue };
        if call_back(interp, callback, item.clone(), i, items)?.is_truthy() {
            result.push(item);
        }
    }
    Ok(Value::array(result))
}

pub fn for_each_fn(interp: &mut Interpreter, items: &Items, args: &[Value]) -> Result<Value, RuntimeError> {
    let callback = expect_callback(args, "forEach")?;
    let len = items.borrow().len();
    for i in 0..len {
        if let Some(item) = live_item(items, i) {
            call_back(interp, callback, item, i, items)?;
        }
    }
    Ok(Value::Undefined)
}

pub fn reduce_fn(
    interp: &mut Interpreter,
    items: &Items,
    args: &[Value],
    from_right: bool,
) -> Result<Value, RuntimeError> {
    let callback = expect_callback(args, "reduce")?;
    let mut order: Vec<usize> = (0..items.borrow().len()).collect();
    if from_right {
        order.reverse();
    }
    let mut order = order.into_iter();

    let mut acc = match args.get(1) {
        Some(initial) => initial.clone(),
        None => match order.next().and_then(|first| live_item(items, first)) {
            Some(first) => first,
            None => {
                return Err(RuntimeError::type_error("Reduce of empty array with no initial value"));
            }
        },
    };
    for i in order {
        let Some(item) = live_item(items, i) else { continue };
        acc = interp.call_function(
            callback,
            Value::Undefined,
            vec![acc, item, Value::Number(i as f64), Value::Array(items.clone())],
        )?;
    }
    Ok(acc)
}

fn find_fn(
    interp: &mut Interpreter,
    items: &Items,
    args: &[Value],
    want_index: bool,
    from_end: bool,
) -> Result<Value, RuntimeError> {
    let callback = expect_callback(args, "find")?;
    let mut order: Vec<usize> = (0..items.borrow().len()).collect();
    if from_end {
        order.reverse();
    }
    for i in order {
        let item = live_item(items, i).unwrap_or_default();
        if call_back(interp, callback, item.clone(), i, items)?.is_truthy() {
            return Ok(if want_index { Value::Number(i as f64) } else { item });
        }
    }
    Ok(if want_index { Value::Number(-1.0) } else { Value::Undefined })
}

fn some_fn(interp: &mut Interpreter, items: &Items, args: &[Value]) -> Result<Value, RuntimeError> {
    let callback = expect_callback(args, "some")?;
    let len = items.borrow().len();
    for i in 0..len {
        let Some(item) = live_item(items, i) else { continue };
        if call_back(interp, callback, item, i, items)?.is_truthy() {
            return Ok(Value::Boolean(true));
        }
    }
    Ok(Value::Boolean(false))
}

fn every_fn(interp: &mut Interpreter, items: &Items, args: &[Value]) -> Result<Value, RuntimeError> {
    let callback = expect_callback(args, "every")?;
    let len = items.borrow().len();
    for i in 0..len {
        let Some(item) = live_item(items, i) else { continue };
        if !call_back(interp, callback, item, i, items)?.is_truthy() {
            return Ok(Value::Boolean(false));
        }
    }
    Ok(Value::Boolean(true))
}

/// Sorts in place with a stable merge sort. A comparator that is not a
/// consistent order (a random shuffle, say) still terminates.
fn sort_fn(interp: &mut Interpreter, items: &Items, args: &[Value]) -> Result<Value, RuntimeError> {
    let compare = args.first().cloned().unwrap_or_default();
    if !compare.is_nullish() && !compare.is_callable() {
        return Err(RuntimeError::type_error(
            "The comparison function must be either a function or undefined",
        ));
    }
    let snapshot = items.borrow().clone();
    let sorted = merge_sort(interp, snapshot, &compare)?;
    *items.borrow_mut() = sorted;
    Ok(Value::Array(items.clone()))
}

fn merge_sort(interp: &mut Interpreter, mut values: Vec<Value>, compare: &Value) -> Result<Vec<Value>, RuntimeError> {
    if values.len() <= 1 {
        return Ok(values);
    }
    let right = values.split_off(values.len() / 2);
    let left = merge_sort(interp, values, compare)?;
    let right = merge_sort(interp, right, compare)?;

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(a), Some(b)) = (left.peek(), right.peek()) {
        let take_right = sort_order(interp, compare, b, a)? == Ordering::Less;
        if take_right {
            merged.extend(right.next());
        } else {
            merged.extend(left.next());
        }
    }
    merged.extend(left);
    merged.extend(right);
    Ok(merged)
}

fn sort_order(interp: &mut Interpreter, compare: &Value, a: &Value, b: &Value) -> Result<Ordering, RuntimeError> {
    if !compare.is_callable() {
        return Ok(default_sort_order(a, b));
    }
    // undefined always sorts last, without consulting the comparator
    match (a, b) {
        (Value::Undefined, Value::Undefined) => return Ok(Ordering::Equal),
        (Value::Undefined, _) => return Ok(Ordering::Greater),
        (_, Value::Undefined) => return Ok(Ordering::Less),
        _ => {}
    }
    let n = interp
        .call_function(compare, Value::Undefined, vec![a.clone(), b.clone()])?
        .to_number();
    Ok(if n < 0.0 {
        Ordering::Less
    } else if n > 0.0 {
        Ordering::Greater
    } else {
        Ordering::Equal
    })
}

// ---------------------------------------------------------------------------
// Methods that never call back into script code
// ---------------------------------------------------------------------------

fn call_plain_method(
    interp: &mut Interpreter,
    items: &Items,
    method: &str,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    match method {
        "includes" => {
            let needle = args.first().cloned().unwrap_or_default();
            Ok(Value::Boolean(items.borrow().iter().any(|v| same_value_zero(v, &needle))))
        }
        "indexOf" => {
            let needle = args.first().cloned().unwrap_or_default();
            Ok(index_value(items.borrow().iter().position(|v| strict_equals(v, &needle))))
        }
        "lastIndexOf" => {
            let needle = args.first().cloned().unwrap_or_default();
            Ok(index_value(items.borrow().iter().rposition(|v| strict_equals(v, &needle))))
        }
        "join" => {
            let separator = match args.first() {
                None | Some(Value::Undefined) => ",".to_string(),
                Some(sep) => sep.to_js_string(),
            };
            Ok(Value::String(join_array(items, &separator)))
        }
        "toString" => Ok(Value::String(join_array(items, ","))),
        "slice" => {
            let values = items.borrow();
            let len = values.len();
            let start = relative_index(args.first(), len, 0);
            let end = relative_index(args.get(1), len, len);
            Ok(Value::array(if start < end {
                values[start..end].to_vec()
            } else {
                Vec::new()
            }))
        }
        "splice" => {
            let mut values = items.borrow_mut();
            let len = values.len();
            let start = relative_index(args.first(), len, 0);
            let delete_count = match args.get(1) {
                None => len - start,
                Some(count) => count.to_integer().clamp(0, (len - start) as i64) as usize,
            };
            let inserted: Vec<Value> = args.iter().skip(2).cloned().collect();
            let removed: Vec<Value> = values.splice(start..start + delete_count, inserted).collect();
            Ok(Value::array(removed))
        }
        "concat" => {
            let mut result = items.borrow().clone();
            for arg in args {
                match arg {
                    Value::Array(other) => result.extend(other.borrow().iter().cloned()),
                    other => result.push(other.clone()),
                }
            }
            Ok(Value::array(result))
        }
        "push" => {
            let mut values = items.borrow_mut();
            values.extend(args.iter().cloned());
            Ok(Value::Number(values.len() as f64))
        }
        "pop" => Ok(items.borrow_mut().pop().unwrap_or_default()),
        "shift" => {
            let mut values = items.borrow_mut();
            Ok(if values.is_empty() {
                Value::Undefined
            } else {
                values.remove(0)
            })
        }
        "unshift" => {
            let mut values = items.borrow_mut();
            for (i, arg) in args.iter().enumerate() {
                values.insert(i, arg.clone());
            }
            Ok(Value::Number(values.len() as f64))
        }
        "reverse" => {
            items.borrow_mut().reverse();
            Ok(Value::Array(items.clone()))
        }
        "flat" => {
            let depth = match args.first() {
                None | Some(Value::Undefined) => 1,
                Some(depth) => depth.to_integer().max(0) as usize,
            };
            Ok(Value::array(flatten(interp, &items.borrow(), depth)?))
        }
        "fill" => {
            let value = args.first().cloned().unwrap_or_default();
            {
                let mut values = items.borrow_mut();
                let len = values.len();
                let start = relative_index(args.get(1), len, 0);
                let end = relative_index(args.get(2), len, len);
                // every slot holds its own copy of a string
                if let Value::String(s) = &value {
                    interp.check_string_len(s.len().saturating_mul(end.saturating_sub(start)))?;
                }
                for slot in values.iter_mut().take(end).skip(start) {
                    *slot = value.clone();
                }
            }
            Ok(Value::Array(items.clone()))
        }
        "at" => {
            let values = items.borrow();
            let len = values.len() as i64;
            let mut index = args.first().map(|v| v.to_integer()).unwrap_or(0);
            if index < 0 {
                index += len;
            }
            Ok(if (0..len).contains(&index) {
                values[index as usize].clone()
            } else {
                Value::Undefined
            })
        }
        other => Err(RuntimeError::type_error(format!("array.{} is not a function", other))),
    }
}

fn index_value(pos: Option<usize>) -> Value {
    Value::Number(pos.map(|p| p as f64).unwrap_or(-1.0))
}

fn flatten(interp: &mut Interpreter, values: &[Value], depth: usize) -> Result<Vec<Value>, RuntimeError> {
    let mut out = Vec::new();
    flatten_into(interp, values, depth, 0, &mut out)?;
    Ok(out)
}

fn flatten_into(
    interp: &mut Interpreter,
    values: &[Value],
    depth: usize,
    nesting: usize,
    out: &mut Vec<Value>,
) -> Result<(), RuntimeError> {
    interp.tick()?;
    for value in values {
        match value {
            Value::Array(inner) if depth > 0 => {
                if nesting >= MAX_NESTING_DEPTH {
                    return Err(RuntimeError::Custom(
                        "RangeError: Maximum call stack size exceeded".to_string(),
                    ));
                }
                flatten_into(interp, &inner.borrow(), depth - 1, nesting + 1, out)?;
            }
            other => {
                out.push(other.clone());
                interp.check_array_len(out.len())?;
            }
        }
    }
    Ok(())
}

/// Resolves a possibly negative index argument against `len`.
pub(crate) fn relative_index(arg: Option<&Value>, len: usize, default: usize) -> usize {
    match arg {
        None | Some(Value::Undefined) => default,
        Some(v) => {
            let n = v.to_integer();
            if n < 0 {
                (len as i64 + n).max(0) as usize
            } else {
                (n as usize).min(len)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Array statics
// ---------------------------------------------------------------------------

/// `Array(n)` / `new Array(n)` makes `n` holes; anything else lists the items.
pub fn array_constructor(interp: &Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match args.as_slice() {
        [Value::Number(n)] => {
            let len = array_length(*n)?;
            interp.check_array_len(len)?;
            Ok(Value::array(vec![Value::Undefined; len]))
        }
        _ => Ok(Value::array(args)),
    }
}

/// A length argument must be a whole number below 2^32.
fn array_length(n: f64) -> Result<usize, RuntimeError> {
    if n >= 0.0 && n.fract() == 0.0 && n <= MAX_ARRAY_LENGTH as f64 {
        Ok(n as usize)
    } else {
        Err(RuntimeError::Custom("RangeError: Invalid array length".to_string()))
    }
}

pub fn array_static(interp: &mut Interpreter, method: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match method {
        "isArray" => Ok(Value::Boolean(matches!(args.first(), Some(Value::Array(_))))),
        "of" => Ok(Value::array(args)),
        "from" => {
            let source = args.first().cloned().unwrap_or_default();
            let values: Vec<Value> = match &source {
                Value::Array(items) => items.borrow().clone(),
                Value::String(s) => s.chars().map(|c| Value::String(c.to_string())).collect(),
                // array-likes such as { length: 5 }
                Value::Object(obj) => {
                    let len = obj.borrow().get("length").map(|v| v.to_integer()).unwrap_or(0).max(0);
                    let len = usize::try_from(len).unwrap_or(usize::MAX);
                    interp.check_array_len(len)?;
                    let obj = obj.borrow();
                    (0..len)
                        .map(|i| obj.get(&i.to_string()).cloned().unwrap_or_default())
                        .collect()
                }
                _ => Vec::new(),
            };
            match args.get(1) {
                Some(mapper) if mapper.is_callable() => {
                    let mut mapped = Vec::with_capacity(values.len());
                    for (i, value) in values.into_iter().enumerate() {
                        mapped.push(interp.call_function(mapper, Value::Undefined, vec![value, Value::Number(i as f64)])?);
                    }
                    Ok(Value::array(mapped))
                }
                _ => Ok(Value::array(values)),
            }
        }
        other => Err(RuntimeError::type_error(format!("Array.{} is not a function", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(ns: &[f64]) -> Items {
        Rc::new(RefCell::new(ns.iter().map(|n| Value::Number(*n)).collect()))
    }

    #[test]
    fn test_relative_index() {
        assert_eq!(relative_index(Some(&Value::Number(-2.0)), 5, 0), 3);
        assert_eq!(relative_index(Some(&Value::Number(9.0)), 5, 0), 5);
        assert_eq!(relative_index(None, 5, 5), 5);
    }

    #[test]
    fn test_splice_removes_and_inserts() {
        let items = numbers(&[1.0, 2.0, 3.0, 4.0]);
        let mut interp = Interpreter::new();
        let removed = call_plain_method(
            &mut interp,
            &items,
            "splice",
            &[Value::Number(1.0), Value::Number(2.0), Value::string("x")],
        )
        .unwrap();
        assert_eq!(removed.to_js_string(), "2,3");
        assert_eq!(Value::Array(items).to_js_string(), "1,x,4");
    }

    #[test]
    fn test_default_sort_is_by_string() {
        let mut interp = Interpreter::new();
        let items = numbers(&[10.0, 9.0, 1.0]);
        sort_fn(&mut interp, &items, &[]).unwrap();
        assert_eq!(Value::Array(items).to_js_string(), "1,10,9");
    }

    #[test]
    fn test_flat_depth() {
        let nested = Value::array(vec![
            Value::Number(1.0),
            Value::array(vec![Value::Number(2.0), Value::array(vec![Value::Number(3.0)])]),
        ]);
        let Value::Array(items) = nested else { unreachable!() };
        let mut interp = Interpreter::new();
        assert_eq!(flatten(&mut interp, &items.borrow(), 1).unwrap().len(), 3);
        assert_eq!(flatten(&mut interp, &items.borrow(), 2).unwrap().len(), 3);
        assert_eq!(
            Value::array(flatten(&mut interp, &items.borrow(), 2).unwrap()).to_js_string(),
            "1,2,3"
        );
    }

    #[test]
    fn test_flat_of_self_containing_array_stops() {
        let items = numbers(&[1.0]);
        items.borrow_mut().push(Value::Array(items.clone()));
        let mut interp = Interpreter::new();
        let err = flatten(&mut interp, &items.borrow(), usize::MAX).unwrap_err();
        assert_eq!(err.message(), "RangeError: Maximum call stack size exceeded");
    }

    #[test]
    fn test_array_constructor_with_length() {
        let interp = Interpreter::new();
        assert_eq!(array_constructor(&interp, vec![Value::Number(3.0)]).unwrap().to_js_string(), ",,");
        assert_eq!(
            array_constructor(&interp, vec![Value::Number(1.0), Value::Number(2.0)])
                .unwrap()
                .to_js_string(),
            "1,2"
        );
    }

    #[test]
    fn test_array_constructor_rejects_bad_lengths() {
        let interp = Interpreter::new();
        for n in [-1.0, 1.5, 4294967296.0, 4294967295.0] {
            let err = array_constructor(&interp, vec![Value::Number(n)]).unwrap_err();
            assert_eq!(err.message(), "RangeError: Invalid array length", "length {}", n);
        }
    }
}
