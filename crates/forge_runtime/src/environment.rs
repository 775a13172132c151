use crate::value::{RuntimeError, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Builtins shared by every run.
    Global,
    /// Top level of one executed program.
    Module,
    Function,
    Block,
}

#[derive(Clone)]
struct Binding {
    value: Value,
    mutable: bool,
}

struct Scope {
    kind: ScopeKind,
    vars: RefCell<HashMap<String, Binding>>,
    parent: Option<Environment>,
}

/// A lexical scope chain. Cloning shares the scope, which is what closures
/// need: a function sees later writes to the variables it captured.
#[derive(Clone)]
pub struct Environment(Rc<Scope>);

impl Environment {
    pub fn global() -> Self {
        Environment(Rc::new(Scope {
            kind: ScopeKind::Global,
            vars: RefCell::new(HashMap::new()),
            parent: None,
        }))
    }

    pub fn child(&self, kind: ScopeKind) -> Self {
        Environment(Rc::new(Scope {
            kind,
            vars: RefCell::new(HashMap::new()),
            parent: Some(self.clone()),
        }))
    }

    pub fn kind(&self) -> ScopeKind {
        self.0.kind
    }

    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.0.vars.borrow_mut().insert(
            name.into(),
            Binding {
                value,
                mutable: true,
            },
        );
    }

    pub fn define_const(&self, name: impl Into<String>, value: Value) {
        self.0.vars.borrow_mut().insert(
            name.into(),
            Binding {
                value,
                mutable: false,
            },
        );
    }

    /// `var` declarations live in the nearest function or module scope.
    pub fn define_var(&self, name: impl Into<String>, value: Value) {
        self.nearest(|k| k != ScopeKind::Block).define(name, value);
    }

    pub fn get(&self, name: &str) -> Result<Value, RuntimeError> {
        let mut scope = Some(self);
        while let Some(env) = scope {
            if let Some(binding) = env.0.vars.borrow().get(name) {
                return Ok(binding.value.clone());
            }
            scope = env.0.parent.as_ref();
        }
        Err(RuntimeError::UndefinedVariable(name.to_string()))
    }

    /// Looks in this scope only, never in a parent.
    pub fn get_local(&self, name: &str) -> Option<Value> {
        self.0.vars.borrow().get(name).map(|b| b.value.clone())
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_ok()
    }

    pub fn set(&self, name: &str, value: Value) -> Result<(), RuntimeError> {
        let mut scope = Some(self);
        while let Some(env) = scope {
            if let Some(binding) = env.0.vars.borrow_mut().get_mut(name) {
                if !binding.mutable {
                    return Err(RuntimeError::ConstAssignment(name.to_string()));
                }
                binding.value = value;
                return Ok(());
            }
            scope = env.0.parent.as_ref();
        }

        // Undeclared assignment lands in the module, never in the shared globals.
        self.nearest(|k| matches!(k, ScopeKind::Module | ScopeKind::Global))
            .define(name, value);
        Ok(())
    }

    /// Names bound directly in this scope.
    pub fn local_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.0.vars.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    fn nearest(&self, pred: impl Fn(ScopeKind) -> bool) -> Environment {
        let mut env = self.clone();
        loop {
            if pred(env.0.kind) {
                return env;
            }
            let parent = match &env.0.parent {
                Some(p) => p.clone(),
                None => return env,
            };
            env = parent;
        }
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("kind", &self.0.kind)
            .field("names", &self.local_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_const_assignment_rejected() {
        let env = Environment::global().child(ScopeKind::Module);
        env.define_const("x", Value::Number(1.0));
        assert!(matches!(env.set("x", Value::Number(2.0)), Err(RuntimeError::ConstAssignment(_))));
    }

    #[test]
    fn test_undeclared_assignment_stays_in_module() {
        let global = Environment::global();
        let module = global.child(ScopeKind::Module);
        let block = module.child(ScopeKind::Function).child(ScopeKind::Block);
        block.set("leaked", Value::Boolean(true)).unwrap();
        assert!(module.get_local("leaked").is_some());
        assert!(global.get_local("leaked").is_none());
    }

    #[test]
    fn test_get_local_ignores_parents() {
        let global = Environment::global();
        global.define("App", Value::Null);
        let module = global.child(ScopeKind::Module);
        assert!(module.has("App"));
        assert!(module.get_local("App").is_none());
    }
}
