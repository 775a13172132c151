//! Per-component hook state.
//!
//! Slots are keyed by the component's position in the rendered tree plus the
//! order in which the component called its hooks, the same contract React
//! imposes: hooks must be called unconditionally and in the same order.

use crate::evaluator::same_value;
use crate::value::{RuntimeError, Value};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

pub enum HookSlot {
    State {
        cell: Rc<RefCell<Value>>,
        setter: Value,
    },
    Reducer {
        cell: Rc<RefCell<Value>>,
        dispatch: Value,
    },
    Ref(Value),
    Memo {
        deps: Option<Vec<Value>>,
        value: Value,
    },
    Effect {
        deps: Option<Vec<Value>>,
        cleanup: Option<Value>,
    },
}

impl HookSlot {
    fn kind(&self) -> &'static str {
        match self {
            HookSlot::State { .. } => "useState",
            HookSlot::Reducer { .. } => "useReducer",
            HookSlot::Ref(_) => "useRef",
            HookSlot::Memo { .. } => "useMemo",
            HookSlot::Effect { .. } => "useEffect",
        }
    }
}

/// An effect whose dependencies changed during the last render pass.
pub struct PendingEffect {
    pub path: String,
    pub index: usize,
    pub callback: Value,
}

struct RenderFrame {
    path: String,
    index: usize,
}

#[derive(Default)]
pub struct HookStore {
    slots: HashMap<String, Vec<HookSlot>>,
    frames: Vec<RenderFrame>,
    visited: HashSet<String>,
    pending: Vec<PendingEffect>,
    dirty: Rc<Cell<bool>>,
    issued_ids: u64,
}

impl HookStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared flag raised by state setters when a value actually changes.
    pub fn dirty_flag(&self) -> Rc<Cell<bool>> {
        self.dirty.clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub fn begin_pass(&mut self) {
        self.dirty.set(false);
        self.visited.clear();
        self.pending.clear();
        self.frames.clear();
    }

    /// Drops the state of components that were not rendered in this pass and
    /// returns the cleanups of their effects.
    pub fn finish_pass(&mut self) -> Vec<Value> {
        let stale: Vec<String> = self
            .slots
            .keys()
            .filter(|path| !self.visited.contains(*path))
            .cloned()
            .collect();

        let mut cleanups = Vec::new();
        for path in stale {
            if let Some(slots) = self.slots.remove(&path) {
                for slot in slots {
                    if let HookSlot::Effect {
                        cleanup: Some(cleanup),
                        ..
                    } = slot
                    {
                        cleanups.push(cleanup);
                    }
                }
            }
        }
        cleanups
    }

    pub fn begin_component(&mut self, path: &str) {
        self.visited.insert(path.to_string());
        self.frames.push(RenderFrame {
            path: path.to_string(),
            index: 0,
        });
    }

    pub fn end_component(&mut self) {
        self.frames.pop();
    }

    /// Claims the next hook position of the component being rendered.
    pub fn next_position(&mut self, hook: &str) -> Result<(String, usize), RuntimeError> {
        let frame = self.frames.last_mut().ok_or_else(|| {
            RuntimeError::Custom(format!(
                "Invalid hook call: {} can only be called inside the body of a function component",
                hook
            ))
        })?;
        let position = (frame.path.clone(), frame.index);
        frame.index += 1;
        Ok(position)
    }

    pub fn slot(&mut self, path: &str, index: usize) -> Option<&mut HookSlot> {
        self.slots.get_mut(path).and_then(|s| s.get_mut(index))
    }

    /// Like [`HookStore::slot`], but fails when the slot holds a different hook.
    pub fn expect_slot(
        &mut self,
        path: &str,
        index: usize,
        hook: &str,
    ) -> Result<Option<&mut HookSlot>, RuntimeError> {
        match self.slot(path, index) {
            Some(slot) if slot.kind() == hook || (hook == "useLayoutEffect" && slot.kind() == "useEffect") => {
                Ok(Some(slot))
            }
            Some(slot) => Err(RuntimeError::Custom(format!(
                "Rendered hooks in a different order: expected {} but found {} in {}",
                hook,
                slot.kind(),
                path
            ))),
            None => Ok(None),
        }
    }

    pub fn push_slot(&mut self, path: &str, index: usize, slot: HookSlot) -> Result<(), RuntimeError> {
        let slots = self.slots.entry(path.to_string()).or_default();
        if slots.len() != index {
            return Err(RuntimeError::Custom(format!(
                "Rendered more hooks than during the previous render in {}",
                path
            )));
        }
        slots.push(slot);
        Ok(())
    }

    pub fn schedule_effect(&mut self, effect: PendingEffect) {
        self.pending.push(effect);
    }

    pub fn take_effects(&mut self) -> Vec<PendingEffect> {
        std::mem::take(&mut self.pending)
    }

    pub fn take_cleanup(&mut self, path: &str, index: usize) -> Option<Value> {
        match self.slot(path, index) {
            Some(HookSlot::Effect { cleanup, .. }) => cleanup.take(),
            _ => None,
        }
    }

    pub fn set_cleanup(&mut self, path: &str, index: usize, value: Value) {
        if let Some(HookSlot::Effect { cleanup, .. }) = self.slot(path, index) {
            *cleanup = Some(value);
        }
    }

    /// Discards every slot, returning all outstanding effect cleanups.
    pub fn reset(&mut self) -> Vec<Value> {
        self.begin_pass();
        self.finish_pass()
    }

    /// Sequence number behind `useId`.
    pub fn issue_id(&mut self) -> u64 {
        self.issued_ids += 1;
        self.issued_ids
    }

    pub fn component_count(&self) -> usize {
        self.slots.len()
    }
}

/// Dependency lists are unchanged only when both exist, have the same length
/// and every entry is the same value.
pub fn deps_changed(previous: &Option<Vec<Value>>, next: &Option<Vec<Value>>) -> bool {
    match (previous, next) {
        (Some(prev), Some(next)) => {
            prev.len() != next.len() || prev.iter().zip(next).any(|(a, b)| !same_value(a, b))
        }
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_follow_call_order() {
        let mut store = HookStore::new();
        store.begin_pass();
        store.begin_component("/App");
        assert_eq!(store.next_position("useState").unwrap(), ("/App".to_string(), 0));
        assert_eq!(store.next_position("useState").unwrap(), ("/App".to_string(), 1));
        store.end_component();
        assert!(store.next_position("useState").is_err());
    }

    #[test]
    fn test_unvisited_components_are_dropped() {
        let mut store = HookStore::new();
        store.begin_pass();
        store.begin_component("/App");
        store
            .push_slot("/App", 0, HookSlot::Ref(Value::Null))
            .unwrap();
        store.end_component();
        assert!(store.finish_pass().is_empty());
        assert_eq!(store.component_count(), 1);

        store.begin_pass();
        store.finish_pass();
        assert_eq!(store.component_count(), 0);
    }

    #[test]
    fn test_deps_changed() {
        let a = Some(vec![Value::Number(1.0)]);
        let b = Some(vec![Value::Number(1.0)]);
        let c = Some(vec![Value::Number(2.0)]);
        assert!(!deps_changed(&a, &b));
        assert!(deps_changed(&a, &c));
        assert!(deps_changed(&None, &None));
        assert!(!deps_changed(&Some(vec![]), &Some(vec![])));
    }
}
