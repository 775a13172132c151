//! `React.createElement` and the hooks.

use crate::hooks::{deps_changed, HookSlot, PendingEffect};
use crate::interpreter::Interpreter;
use crate::value::{ElementKind, ElementValue, NativeFunction, NativeKind, ObjectData, RuntimeError, Value};
use std::cell::RefCell;
use std::rc::Rc;

pub fn call_react(interp: &mut Interpreter, method: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match method {
        "createElement" => create_element(args),
        // Called directly instead of through an element: render the children.
        "Fragment" | "StrictMode" => Ok(match args.first() {
            Some(Value::Object(props)) => props.borrow().get("children").cloned().unwrap_or_default(),
            _ => Value::Undefined,
        }),
        "memo" | "forwardRef" => Ok(args.into_iter().next().unwrap_or_default()),
        "useState" => use_state(interp, args),
        "useReducer" => use_reducer(interp, args),
        "useEffect" | "useLayoutEffect" => use_effect(interp, method, args),
        "useRef" => use_ref(interp, args),
        "useMemo" => {
            let (path, index) = interp.hooks.next_position(method)?;
            let deps = dependency_list(args.get(1));
            let factory = args.into_iter().next().unwrap_or_default();
            memoize(interp, &path, index, deps, |interp| {
                interp.call_function(&factory, Value::Undefined, Vec::new())
            })
        }
        "useCallback" => {
            let (path, index) = interp.hooks.next_position(method)?;
            let deps = dependency_list(args.get(1));
            let callback = args.into_iter().next().unwrap_or_default();
            memoize(interp, &path, index, deps, |_| Ok(callback))
        }
        "useId" => {
            let (path, index) = interp.hooks.next_position(method)?;
            if let Some(HookSlot::Ref(id)) = interp.hooks.expect_slot(&path, index, "useRef")? {
                return Ok(id.clone());
            }
            let id = Value::String(format!(":r{}:", interp.hooks.issue_id()));
            interp.hooks.push_slot(&path, index, HookSlot::Ref(id.clone()))?;
            Ok(id)
        }
        _ => Err(RuntimeError::type_error(format!("React.{} is not a function", method))),
    }
}

/// `React.createElement(type, props, ...children)`. `key` moves out of the
/// props; a single child is stored as-is, several as an array.
pub fn create_element(args: Vec<Value>) -> Result<Value, RuntimeError> {
    let mut args = args.into_iter();
    let element_type = args.next().unwrap_or_default();
    let config = args.next().unwrap_or_default();
    let mut children: Vec<Value> = args.collect();

    let kind = match &element_type {
        Value::String(tag) => ElementKind::Intrinsic(tag.clone()),
        Value::Native(native) if is_fragment(native) => ElementKind::Fragment,
        other => ElementKind::Component(other.clone()),
    };

    let mut props = ObjectData::new("Object");
    let mut key = None;
    if let Value::Object(config) = &config {
        for (name, value) in config.borrow().properties.iter() {
            if name == "key" {
                key = (!value.is_nullish()).then(|| value.to_js_string());
            } else {
                props.set(name.clone(), value.clone());
            }
        }
    }
    match children.len() {
        0 => {}
        1 => props.set("children", children.remove(0)),
        _ => props.set("children", Value::array(children)),
    }

    Ok(Value::Element(Rc::new(ElementValue {
        kind,
        props: Rc::new(RefCell::new(props)),
        key,
    })))
}

fn is_fragment(native: &NativeFunction) -> bool {
    matches!(native.kind, NativeKind::Builtin)
        && matches!(native.name.as_str(), "React.Fragment" | "React.StrictMode")
}

/// The value `element.type` reads back.
pub fn element_type(element: &ElementValue) -> Value {
    match &element.kind {
        ElementKind::Intrinsic(tag) => Value::String(tag.clone()),
        ElementKind::Component(component) => component.clone(),
        ElementKind::Fragment => Value::native("React.Fragment"),
    }
}

fn dependency_list(value: Option<&Value>) -> Option<Vec<Value>> {
    match value {
        Some(Value::Array(items)) => Some(items.borrow().clone()),
        _ => None,
    }
}

fn use_state(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let (path, index) = interp.hooks.next_position("useState")?;
    if let Some(HookSlot::State { cell, setter }) = interp.hooks.expect_slot(&path, index, "useState")? {
        let current = cell.borrow().clone();
        return Ok(Value::array(vec![current, setter.clone()]));
    }

    let initial = match args.into_iter().next() {
        Some(init) if init.is_callable() => interp.call_function(&init, Value::Undefined, Vec::new())?,
        Some(value) => value,
        None => Value::Undefined,
    };
    let cell = Rc::new(RefCell::new(initial.clone()));
    let setter = Value::Native(Rc::new(NativeFunction {
        name: "setState".to_string(),
        kind: NativeKind::StateSetter {
            cell: cell.clone(),
            dirty: interp.hooks.dirty_flag(),
        },
    }));
    interp.hooks.push_slot(&path, index, HookSlot::State { cell, setter: setter.clone() })?;
    Ok(Value::array(vec![initial, setter]))
}

fn use_reducer(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let (path, index) = interp.hooks.next_position("useReducer")?;
    if let Some(HookSlot::Reducer { cell, dispatch }) = interp.hooks.expect_slot(&path, index, "useReducer")? {
        let current = cell.borrow().clone();
        return Ok(Value::array(vec![current, dispatch.clone()]));
    }

    let mut args = args.into_iter();
    let reducer = args.next().unwrap_or_default();
    if !reducer.is_callable() {
        return Err(RuntimeError::type_error("useReducer expects a reducer function"));
    }
    let initial_arg = args.next().unwrap_or_default();
    let initial = match args.next() {
        Some(init) if init.is_callable() => interp.call_function(&init, Value::Undefined, vec![initial_arg])?,
        _ => initial_arg,
    };
    let cell = Rc::new(RefCell::new(initial.clone()));
    let dispatch = Value::Native(Rc::new(NativeFunction {
        name: "dispatch".to_string(),
        kind: NativeKind::Dispatch {
            cell: cell.clone(),
            reducer,
            dirty: interp.hooks.dirty_flag(),
        },
    }));
    interp
        .hooks
        .push_slot(&path, index, HookSlot::Reducer { cell, dispatch: dispatch.clone() })?;
    Ok(Value::array(vec![initial, dispatch]))
}

/// Records the effect and schedules it when its dependencies changed. The
/// renderer runs scheduled effects once the tree has been expanded.
fn use_effect(interp: &mut Interpreter, hook: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let (path, index) = interp.hooks.next_position(hook)?;
    let mut args = args.into_iter();
    let callback = args.next().unwrap_or_default();
    let deps = dependency_list(args.next().as_ref());

    let changed = match interp.hooks.expect_slot(&path, index, "useEffect")? {
        Some(HookSlot::Effect { deps: previous, .. }) => {
            let changed = deps_changed(previous, &deps);
            if changed {
                *previous = deps;
            }
            changed
        }
        Some(_) => false,
        None => {
            interp.hooks.push_slot(&path, index, HookSlot::Effect { deps, cleanup: None })?;
            true
        }
    };

    if changed && callback.is_callable() {
        interp.hooks.schedule_effect(PendingEffect { path, index, callback });
    }
    Ok(Value::Undefined)
}

fn use_ref(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let (path, index) = interp.hooks.next_position("useRef")?;
    if let Some(HookSlot::Ref(current)) = interp.hooks.expect_slot(&path, index, "useRef")? {
        return Ok(current.clone());
    }
    let initial = args.into_iter().next().unwrap_or_default();
    let reference = Value::plain_object(vec![("current".to_string(), initial)]);
    interp.hooks.push_slot(&path, index, HookSlot::Ref(reference.clone()))?;
    Ok(reference)
}

fn memoize(
    interp: &mut Interpreter,
    path: &str,
    index: usize,
    deps: Option<Vec<Value>>,
    compute: impl FnOnce(&mut Interpreter) -> Result<Value, RuntimeError>,
) -> Result<Value, RuntimeError> {
    if let Some(HookSlot::Memo { deps: previous, value }) = interp.hooks.expect_slot(path, index, "useMemo")? {
        if !deps_changed(previous, &deps) {
            return Ok(value.clone());
        }
    }

    let value = compute(interp)?;
    match interp.hooks.slot(path, index) {
        Some(HookSlot::Memo { deps: previous, value: stored }) => {
            *previous = deps;
            *stored = value.clone();
        }
        _ => interp.hooks.push_slot(path, index, HookSlot::Memo { deps, value: value.clone() })?,
    }
    Ok(value)
}
