use crate::builtins;
use crate::environment::{Environment, ScopeKind};
use crate::evaluator::{add_values, binary_op, strict_equals};
use crate::hooks::HookStore;
use crate::value::{Closure, NativeFunction, NativeKind, RuntimeError, Value};
use crate::RuntimeSideEffect;
use forge_parser::ast::*;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::debug;

/// Largest length a script array can have at all.
pub const MAX_ARRAY_LENGTH: usize = u32::MAX as usize;

/// Budget applied to every script run. Generated code may loop forever,
/// recurse without a base case or ask for a huge allocation; all of these
/// must end in an error, not a hang or an abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionLimits {
    pub max_steps: u64,
    pub max_call_depth: usize,
    /// Elements a single array may hold.
    pub max_array_len: usize,
    /// UTF-8 bytes a single string may hold.
    pub max_string_len: usize,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            max_steps: 1_000_000,
            max_call_depth: 128,
            max_array_len: 1 << 20,
            max_string_len: 1 << 24,
        }
    }
}

/// How a statement finished.
enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

#[derive(Clone, Copy)]
enum BindMode {
    Declare(VarKind),
    Assign,
}

pub struct Interpreter {
    globals: Environment,
    pub limits: ExecutionLimits,
    steps: u64,
    depth: usize,
    pub hooks: HookStore,
    pub side_effects: VecDeque<RuntimeSideEffect>,
    next_timer_id: u64,
    rng_state: u64,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_limits(ExecutionLimits::default())
    }

    pub fn with_limits(limits: ExecutionLimits) -> Self {
        let globals = Environment::global();
        builtins::install_globals(&globals);
        Self {
            globals,
            limits,
            steps: 0,
            depth: 0,
            hooks: HookStore::new(),
            side_effects: VecDeque::new(),
            next_timer_id: 1,
            rng_state: time_seed(),
        }
    }

    pub fn globals(&self) -> &Environment {
        &self.globals
    }

    /// Starts a fresh step budget, e.g. before handling a user event.
    pub fn reset_budget(&mut self) {
        self.steps = 0;
        self.depth = 0;
    }

    pub fn take_side_effects(&mut self) -> Vec<RuntimeSideEffect> {
        self.side_effects.drain(..).collect()
    }

    pub(crate) fn tick(&mut self) -> Result<(), RuntimeError> {
        self.steps += 1;
        if self.steps > self.limits.max_steps {
            return Err(RuntimeError::StepLimitExceeded(self.limits.max_steps));
        }
        Ok(())
    }

    /// Rejects an array length before or after it is allocated.
    pub(crate) fn check_array_len(&self, len: usize) -> Result<(), RuntimeError> {
        if len > MAX_ARRAY_LENGTH.min(self.limits.max_array_len) {
            return Err(RuntimeError::Custom("RangeError: Invalid array length".to_string()));
        }
        Ok(())
    }

    pub(crate) fn check_string_len(&self, len: usize) -> Result<(), RuntimeError> {
        if len > self.limits.max_string_len {
            return Err(RuntimeError::Custom("RangeError: Invalid string length".to_string()));
        }
        Ok(())
    }

    /// Size check for a freshly produced value. Every builtin grows its input
    /// at most by a constant factor, so checking results bounds memory.
    pub(crate) fn check_size(&self, value: &Value) -> Result<(), RuntimeError> {
        match value {
            Value::String(s) => self.check_string_len(s.len()),
            Value::Array(items) => self.check_array_len(items.borrow().len()),
            _ => Ok(()),
        }
    }

    /// Claims one level of the call stack for work that recurses natively,
    /// such as rendering a nested component.
    pub(crate) fn enter_frame(&mut self) -> Result<(), RuntimeError> {
        if self.depth >= self.limits.max_call_depth {
            return Err(RuntimeError::CallDepthExceeded(self.limits.max_call_depth));
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn exit_frame(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub(crate) fn emit(&mut self, effect: RuntimeSideEffect) {
        self.side_effects.push_back(effect);
    }

    pub(crate) fn schedule_timer(&mut self, delay_ms: f64, repeating: bool) -> u64 {
        let id = self.next_timer_id;
        self.next_timer_id += 1;
        self.emit(RuntimeSideEffect::TimerScheduled {
            id,
            delay_ms,
            repeating,
        });
        id
    }

    /// Uniform value in `[0, 1)` from a clock-seeded xorshift generator.
    pub(crate) fn next_random(&mut self) -> f64 {
        let mut x = self.rng_state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.rng_state = x;
        (x >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Runs a program in a new module scope whose parent is the builtin
    /// global scope, and returns that module scope.
    pub fn run_module(&mut self, program: &Program) -> Result<Environment, RuntimeError> {
        let module = self.globals.child(ScopeKind::Module);
        self.run_in(program, &module)?;
        Ok(module)
    }

    pub fn run_in(&mut self, program: &Program, env: &Environment) -> Result<(), RuntimeError> {
        debug!(statements = program.body.len(), "running program");
        self.hoist(&program.body, env, true);
        for stmt in &program.body {
            match self.execute(stmt, env)? {
                Flow::Normal => {}
                Flow::Return(_) => break,
                Flow::Break | Flow::Continue => {
                    return Err(RuntimeError::Custom(
                        "SyntaxError: Illegal break or continue statement".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    fn hoist(&mut self, body: &[Statement], env: &Environment, include_vars: bool) {
        for stmt in body {
            match stmt {
                Statement::FunctionDecl(def) => {
                    if let Some(name) = &def.name {
                        let closure = self.make_closure(def, env, None);
                        env.define(name.as_str(), closure);
                    }
                }
                Statement::Variable {
                    kind: VarKind::Var,
                    declarations,
                } if include_vars => {
                    for decl in declarations {
                        for name in decl.pattern.bound_names() {
                            if env.get_local(name).is_none() {
                                env.define_var(name, Value::Undefined);
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn make_closure(&self, def: &Rc<FunctionDef>, env: &Environment, inferred_name: Option<String>) -> Value {
        Value::Function(Rc::new(Closure {
            def: def.clone(),
            env: env.clone(),
            inferred_name,
        }))
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    fn execute(&mut self, stmt: &Statement, env: &Environment) -> Result<Flow, RuntimeError> {
        self.tick()?;
        match stmt {
            Statement::FunctionDecl(_) | Statement::Empty => Ok(Flow::Normal),
            Statement::Variable { kind, declarations } => {
                self.declare_variables(*kind, declarations, env)?;
                Ok(Flow::Normal)
            }
            Statement::Import(decl) => {
                self.bind_import(decl, env)?;
                Ok(Flow::Normal)
            }
            Statement::Expression(expr) => {
                self.evaluate(expr, env)?;
                Ok(Flow::Normal)
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition, env)?.is_truthy() {
                    self.execute(then_branch, env)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch, env)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Statement::For {
                init,
                test,
                update,
                body,
            } => self.execute_for(init.as_ref(), test.as_ref(), update.as_ref(), body, env),
            Statement::ForEach {
                kind,
                pattern,
                iteration,
                iterable,
                body,
            } => {
                let target = self.evaluate(iterable, env)?;
                let items = match iteration {
                    IterationKind::Of => self.iterate(&target)?,
                    IterationKind::In => enumerable_keys(&target),
                };
                let mode = match kind {
                    Some(kind) => BindMode::Declare(*kind),
                    None => BindMode::Assign,
                };
                for item in items {
                    let iter_env = env.child(ScopeKind::Block);
                    self.bind_pattern(pattern, item, mode, &iter_env)?;
                    match self.execute(body, &iter_env)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                Ok(Flow::Normal)
            }
            Statement::While { condition, body } => {
                while self.evaluate(condition, env)?.is_truthy() {
                    match self.execute(body, env)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                Ok(Flow::Normal)
            }
            Statement::DoWhile { body, condition } => {
                loop {
                    match self.execute(body, env)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => {}
                    }
                    if !self.evaluate(condition, env)?.is_truthy() {
                        break;
                    }
                }
                Ok(Flow::Normal)
            }
            Statement::Switch {
                discriminant,
                cases,
            } => self.execute_switch(discriminant, cases, env),
            Statement::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.evaluate(expr, env)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value))
            }
            Statement::Break => Ok(Flow::Break),
            Statement::Continue => Ok(Flow::Continue),
            Statement::Throw(expr) => {
                let value = self.evaluate(expr, env)?;
                Err(RuntimeError::Thrown(value))
            }
            Statement::Try {
                block,
                handler,
                finalizer,
            } => {
                let mut result = self.execute_block(block, &env.child(ScopeKind::Block));
                if let Some(handler) = handler {
                    if let Err(err) = &result {
                        if err.is_catchable() {
                            let thrown = self.error_to_value(err.clone());
                            result = self.execute_catch(handler, thrown, env);
                        }
                    }
                }
                if let Some(finalizer) = finalizer {
                    match self.execute_block(finalizer, &env.child(ScopeKind::Block))? {
                        Flow::Normal => {}
                        other => return Ok(other),
                    }
                }
                result
            }
            Statement::Block(stmts) => self.execute_block(stmts, &env.child(ScopeKind::Block)),
        }
    }

    fn execute_block(&mut self, stmts: &[Statement], env: &Environment) -> Result<Flow, RuntimeError> {
        self.hoist(stmts, env, false);
        for stmt in stmts {
            match self.execute(stmt, env)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    fn execute_catch(&mut self, handler: &CatchClause, thrown: Value, env: &Environment) -> Result<Flow, RuntimeError> {
        let catch_env = env.child(ScopeKind::Block);
        if let Some(param) = &handler.param {
            self.bind_pattern(param, thrown, BindMode::Declare(VarKind::Let), &catch_env)?;
        }
        self.execute_block(&handler.body, &catch_env)
    }

    fn execute_for(
        &mut self,
        init: Option<&ForInit>,
        test: Option<&Expression>,
        update: Option<&Expression>,
        body: &Statement,
        env: &Environment,
    ) -> Result<Flow, RuntimeError> {
        let loop_env = env.child(ScopeKind::Block);
        // `let` bindings get a fresh copy per iteration so closures created in
        // the body see the value of their own iteration.
        let mut per_iteration: Vec<String> = Vec::new();
        match init {
            Some(ForInit::Variable { kind, declarations }) => {
                self.declare_variables(*kind, declarations, &loop_env)?;
                if *kind != VarKind::Var {
                    for decl in declarations {
                        per_iteration.extend(decl.pattern.bound_names().into_iter().map(String::from));
                    }
                }
            }
            Some(ForInit::Expression(expr)) => {
                self.evaluate(expr, &loop_env)?;
            }
            None => {}
        }

        loop {
            if let Some(test) = test {
                if !self.evaluate(test, &loop_env)?.is_truthy() {
                    break;
                }
            }
            let iter_env = loop_env.child(ScopeKind::Block);
            copy_bindings(&loop_env, &iter_env, &per_iteration);
            let flow = self.execute(body, &iter_env)?;
            copy_bindings(&iter_env, &loop_env, &per_iteration);
            match flow {
                Flow::Break => break,
                Flow::Return(v) => return Ok(Flow::Return(v)),
                Flow::Normal | Flow::Continue => {}
            }
            if let Some(update) = update {
                self.evaluate(update, &loop_env)?;
            }
        }
        Ok(Flow::Normal)
    }

    fn execute_switch(
        &mut self,
        discriminant: &Expression,
        cases: &[SwitchCase],
        env: &Environment,
    ) -> Result<Flow, RuntimeError> {
        let value = self.evaluate(discriminant, env)?;
        let mut start = None;
        for (i, case) in cases.iter().enumerate() {
            if let Some(test) = &case.test {
                if strict_equals(&value, &self.evaluate(test, env)?) {
                    start = Some(i);
                    break;
                }
            }
        }
        let start = match start.or_else(|| cases.iter().position(|c| c.test.is_none())) {
            Some(i) => i,
            None => return Ok(Flow::Normal),
        };

        let block_env = env.child(ScopeKind::Block);
        for case in &cases[start..] {
            match self.execute_block(&case.body, &block_env)? {
                Flow::Normal => {}
                Flow::Break => return Ok(Flow::Normal),
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    fn declare_variables(
        &mut self,
        kind: VarKind,
        declarations: &[VariableDeclarator],
        env: &Environment,
    ) -> Result<(), RuntimeError> {
        for decl in declarations {
            let value = match (&decl.init, &decl.pattern) {
                (Some(Expression::Function(def)), Pattern::Identifier(id)) if def.name.is_none() => {
                    self.make_closure(def, env, Some(id.0.clone()))
                }
                (Some(init), _) => self.evaluate(init, env)?,
                (None, _) => Value::Undefined,
            };
            self.bind_pattern(&decl.pattern, value, BindMode::Declare(kind), env)?;
        }
        Ok(())
    }

    fn bind_import(&mut self, decl: &ImportDecl, env: &Environment) -> Result<(), RuntimeError> {
        // React is ambient; any other module resolves to nothing.
        let module = if decl.source == "react" {
            self.globals.get("React")?
        } else {
            debug!(source = %decl.source, "import of unavailable module");
            Value::Undefined
        };
        if let Some(default) = &decl.default {
            env.define(default.as_str(), module.clone());
        }
        if let Some(namespace) = &decl.namespace {
            env.define(namespace.as_str(), module.clone());
        }
        for (imported, local) in &decl.named {
            let value = if module.is_nullish() {
                Value::Undefined
            } else {
                self.get_member(&module, imported)?
            };
            env.define(local.as_str(), value);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Patterns
    // -----------------------------------------------------------------------

    fn bind_pattern(
        &mut self,
        pattern: &Pattern,
        value: Value,
        mode: BindMode,
        env: &Environment,
    ) -> Result<(), RuntimeError> {
        match pattern {
            Pattern::Identifier(id) => bind_name(id.as_str(), value, mode, env),
            Pattern::Object { properties, rest } => {
                if value.is_nullish() {
                    return Err(RuntimeError::type_error(format!(
                        "Cannot destructure '{}' as it is {}.",
                        value.to_js_string(),
                        value.to_js_string()
                    )));
                }
                for prop in properties {
                    let mut item = self.get_member(&value, &prop.key)?;
                    if matches!(item, Value::Undefined) {
                        if let Some(default) = &prop.default {
                            item = self.evaluate(default, env)?;
                        }
                    }
                    self.bind_pattern(&prop.value, item, mode, env)?;
                }
                if let Some(rest) = rest {
                    let remaining = match &value {
                        Value::Object(obj) => obj
                            .borrow()
                            .properties
                            .iter()
                            .filter(|(k, _)| !properties.iter().any(|p| &p.key == k))
                            .cloned()
                            .collect(),
                        _ => Vec::new(),
                    };
                    bind_name(rest.as_str(), Value::plain_object(remaining), mode, env)?;
                }
                Ok(())
            }
            Pattern::Array { elements, rest } => {
                let items = self.iterate(&value)?;
                for (i, element) in elements.iter().enumerate() {
                    let Some(element) = element else { continue };
                    let mut item = items.get(i).cloned().unwrap_or_default();
                    if matches!(item, Value::Undefined) {
                        if let Some(default) = &element.default {
                            item = self.evaluate(default, env)?;
                        }
                    }
                    self.bind_pattern(&element.pattern, item, mode, env)?;
                }
                if let Some(rest) = rest {
                    let remaining = items.get(elements.len()..).map(|s| s.to_vec()).unwrap_or_default();
                    self.bind_pattern(rest, Value::array(remaining), mode, env)?;
                }
                Ok(())
            }
        }
    }

    /// Values produced by iterating `value` with `for...of` or spread.
    pub(crate) fn iterate(&self, value: &Value) -> Result<Vec<Value>, RuntimeError> {
        match value {
            Value::Array(items) => Ok(items.borrow().clone()),
            Value::String(s) => Ok(s.chars().map(|c| Value::String(c.to_string())).collect()),
            other => Err(RuntimeError::type_error(format!(
                "{} is not iterable",
                other.describe()
            ))),
        }
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    pub fn evaluate(&mut self, expr: &Expression, env: &Environment) -> Result<Value, RuntimeError> {
        match expr {
            Expression::Number(n) => Ok(Value::Number(*n)),
            Expression::String(s) => Ok(Value::String(s.clone())),
            Expression::Boolean(b) => Ok(Value::Boolean(*b)),
            Expression::Null => Ok(Value::Null),
            Expression::This => Ok(env.get("this").unwrap_or_default()),
            Expression::Identifier(id) => env.get(id.as_str()),
            Expression::Template {
                quasis,
                expressions,
            } => {
                let mut out = String::new();
                for (i, quasi) in quasis.iter().enumerate() {
                    out.push_str(quasi);
                    if let Some(expr) = expressions.get(i) {
                        out.push_str(&self.evaluate(expr, env)?.to_js_string());
                    }
                    self.check_string_len(out.len())?;
                }
                Ok(Value::String(out))
            }
            Expression::RegExp { pattern, flags } => builtins::regexp_fns::make_regexp(pattern, flags),
            Expression::Array(elements) => Ok(Value::array(self.evaluate_elements(elements, env)?)),
            Expression::Object(members) => self.evaluate_object(members, env),
            Expression::Function(def) => Ok(self.make_closure(def, env, None)),
            Expression::Member { .. } | Expression::Call { .. } => {
                Ok(self.eval_chain(expr, env)?.unwrap_or_default())
            }
            Expression::New { callee, arguments } => {
                let ctor = self.evaluate(callee, env)?;
                let args = self.evaluate_elements(arguments, env)?;
                builtins::construct(self, &ctor, args)
            }
            Expression::Unary { operator, operand } => self.evaluate_unary(*operator, operand, env),
            Expression::Update {
                operator,
                prefix,
                target,
            } => {
                let old = self.evaluate(target, env)?.to_number();
                let new = match operator {
                    UpdateOp::Increment => old + 1.0,
                    UpdateOp::Decrement => old - 1.0,
                };
                self.assign_to(target, Value::Number(new), env)?;
                Ok(Value::Number(if *prefix { new } else { old }))
            }
            Expression::Binary {
                operator,
                left,
                right,
            } => {
                let l = self.evaluate(left, env)?;
                let r = self.evaluate(right, env)?;
                let value = binary_op(*operator, &l, &r)?;
                self.check_size(&value)?;
                Ok(value)
            }
            Expression::Logical {
                operator,
                left,
                right,
            } => {
                let l = self.evaluate(left, env)?;
                let short_circuit = match operator {
                    LogicalOp::And => !l.is_truthy(),
                    LogicalOp::Or => l.is_truthy(),
                    LogicalOp::Nullish => !l.is_nullish(),
                };
                if short_circuit {
                    Ok(l)
                } else {
                    self.evaluate(right, env)
                }
            }
            Expression::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.evaluate(test, env)?.is_truthy() {
                    self.evaluate(consequent, env)
                } else {
                    self.evaluate(alternate, env)
                }
            }
            Expression::Assign {
                operator,
                target,
                value,
            } => self.evaluate_assignment(*operator, target, value, env),
        }
    }

    fn evaluate_unary(
        &mut self,
        operator: UnaryOp,
        operand: &Expression,
        env: &Environment,
    ) -> Result<Value, RuntimeError> {
        if operator == UnaryOp::TypeOf {
            if let Expression::Identifier(id) = operand {
                if !env.has(id.as_str()) {
                    return Ok(Value::string("undefined"));
                }
            }
        }
        let value = self.evaluate(operand, env)?;
        Ok(match operator {
            UnaryOp::Not => Value::Boolean(!value.is_truthy()),
            UnaryOp::BitNot => Value::Number(!value.to_int32() as f64),
            UnaryOp::Negate => Value::Number(-value.to_number()),
            UnaryOp::Plus => Value::Number(value.to_number()),
            UnaryOp::TypeOf => Value::string(value.type_of()),
            UnaryOp::Void => Value::Undefined,
            // Nothing here is asynchronous, so awaiting yields the value itself.
            UnaryOp::Await => value,
        })
    }

    fn evaluate_assignment(
        &mut self,
        operator: AssignOp,
        target: &Expression,
        value: &Expression,
        env: &Environment,
    ) -> Result<Value, RuntimeError> {
        let result = match operator {
            AssignOp::Assign => self.evaluate(value, env)?,
            AssignOp::AndAssign | AssignOp::OrAssign | AssignOp::NullishAssign => {
                let current = self.evaluate(target, env)?;
                let keep = match operator {
                    AssignOp::AndAssign => !current.is_truthy(),
                    AssignOp::OrAssign => current.is_truthy(),
                    _ => !current.is_nullish(),
                };
                if keep {
                    return Ok(current);
                }
                self.evaluate(value, env)?
            }
            arithmetic => {
                let current = self.evaluate(target, env)?;
                let rhs = self.evaluate(value, env)?;
                match arithmetic {
                    AssignOp::AddAssign => {
                        let sum = add_values(&current, &rhs);
                        self.check_size(&sum)?;
                        sum
                    }
                    AssignOp::SubtractAssign => binary_op(BinaryOp::Subtract, &current, &rhs)?,
                    AssignOp::MultiplyAssign => binary_op(BinaryOp::Multiply, &current, &rhs)?,
                    AssignOp::DivideAssign => binary_op(BinaryOp::Divide, &current, &rhs)?,
                    _ => binary_op(BinaryOp::Modulo, &current, &rhs)?,
                }
            }
        };
        self.assign_to(target, result.clone(), env)?;
        Ok(result)
    }

    fn assign_to(&mut self, target: &Expression, value: Value, env: &Environment) -> Result<(), RuntimeError> {
        match target {
            Expression::Identifier(id) => env.set(id.as_str(), value),
            Expression::Member {
                object, property, ..
            } => {
                let object = self.evaluate(object, env)?;
                let key = self.property_key(property, env)?;
                self.set_member(&object, &key, value)
            }
            _ => Err(RuntimeError::Custom(
                "SyntaxError: Invalid left-hand side in assignment".to_string(),
            )),
        }
    }

    fn evaluate_object(&mut self, members: &[ObjectMember], env: &Environment) -> Result<Value, RuntimeError> {
        let mut properties: Vec<(String, Value)> = Vec::new();
        let mut put = |key: String, value: Value| match properties.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => properties.push((key, value)),
        };
        for member in members {
            match member {
                ObjectMember::Property { key, value } => {
                    let key = match key {
                        PropertyKey::Static(name) => name.clone(),
                        PropertyKey::Computed(expr) => self.evaluate(expr, env)?.to_js_string(),
                    };
                    let value = match value {
                        Expression::Function(def) if def.name.is_none() => {
                            self.make_closure(def, env, Some(key.clone()))
                        }
                        other => self.evaluate(other, env)?,
                    };
                    put(key, value);
                }
                ObjectMember::Spread(expr) => match self.evaluate(expr, env)? {
                    Value::Object(obj) => {
                        for (k, v) in obj.borrow().properties.iter() {
                            put(k.clone(), v.clone());
                        }
                    }
                    Value::Array(items) => {
                        for (i, v) in items.borrow().iter().enumerate() {
                            put(i.to_string(), v.clone());
                        }
                    }
                    Value::String(s) => {
                        for (i, c) in s.chars().enumerate() {
                            put(i.to_string(), Value::String(c.to_string()));
                        }
                    }
                    _ => {}
                },
            }
        }
        Ok(Value::plain_object(properties))
    }

    fn evaluate_elements(&mut self, elements: &[ArrayElement], env: &Environment) -> Result<Vec<Value>, RuntimeError> {
        let mut values = Vec::with_capacity(elements.len());
        for element in elements {
            match element {
                ArrayElement::Expression(expr) => values.push(self.evaluate(expr, env)?),
                ArrayElement::Spread(expr) => {
                    let spread = self.evaluate(expr, env)?;
                    values.extend(self.iterate(&spread)?);
                    self.check_array_len(values.len())?;
                }
            }
        }
        Ok(values)
    }

    fn property_key(&mut self, property: &MemberProperty, env: &Environment) -> Result<String, RuntimeError> {
        match property {
            MemberProperty::Named(name) => Ok(name.clone()),
            MemberProperty::Computed(expr) => Ok(self.evaluate(expr, env)?.to_js_string()),
        }
    }

    /// Evaluates member and call chains. `None` means an optional link
    /// (`?.`) met a nullish value and the rest of the chain was skipped.
    fn eval_chain(&mut self, expr: &Expression, env: &Environment) -> Result<Option<Value>, RuntimeError> {
        match expr {
            Expression::Member {
                object,
                property,
                optional,
            } => {
                let Some(object) = self.eval_chain(object, env)? else {
                    return Ok(None);
                };
                if *optional && object.is_nullish() {
                    return Ok(None);
                }
                let key = self.property_key(property, env)?;
                Ok(Some(self.get_member(&object, &key)?))
            }
            Expression::Call {
                callee,
                arguments,
                optional,
            } => {
                let (this, func) = match callee.as_ref() {
                    Expression::Member {
                        object,
                        property,
                        optional: member_optional,
                    } => {
                        let Some(object) = self.eval_chain(object, env)? else {
                            return Ok(None);
                        };
                        if *member_optional && object.is_nullish() {
                            return Ok(None);
                        }
                        let key = self.property_key(property, env)?;
                        let func = self.get_member(&object, &key)?;
                        (object, func)
                    }
                    other => {
                        let Some(func) = self.eval_chain(other, env)? else {
                            return Ok(None);
                        };
                        (Value::Undefined, func)
                    }
                };
                if *optional && func.is_nullish() {
                    return Ok(None);
                }
                if !func.is_callable() {
                    return Err(RuntimeError::type_error(format!(
                        "{} is not a function",
                        callee_name(callee)
                    )));
                }
                let args = self.evaluate_elements(arguments, env)?;
                Ok(Some(self.call_function(&func, this, args)?))
            }
            other => Ok(Some(self.evaluate(other, env)?)),
        }
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    pub fn get_member(&mut self, object: &Value, key: &str) -> Result<Value, RuntimeError> {
        match object {
            Value::Undefined | Value::Null => Err(RuntimeError::type_error(format!(
                "Cannot read properties of {} (reading '{}')",
                object.to_js_string(),
                key
            ))),
            Value::Object(obj) => {
                let data = obj.borrow();
                if let Some(value) = data.get(key) {
                    return Ok(value.clone());
                }
                let pattern_property = data
                    .regexp
                    .as_deref()
                    .and_then(|re| builtins::regexp_fns::regexp_property(re, key));
                if let Some(value) = pattern_property {
                    return Ok(value);
                }
                let is_method = if data.date_value.is_some() {
                    builtins::date_fns::is_date_method(key)
                } else if data.regexp.is_some() {
                    builtins::regexp_fns::is_regexp_method(key)
                } else {
                    matches!(key, "hasOwnProperty" | "toString")
                };
                drop(data);
                Ok(if is_method {
                    Value::bound_method(object.clone(), key)
                } else {
                    Value::Undefined
                })
            }
            Value::Array(items) => {
                if key == "length" {
                    return Ok(Value::Number(items.borrow().len() as f64));
                }
                if let Ok(index) = key.parse::<usize>() {
                    return Ok(items.borrow().get(index).cloned().unwrap_or_default());
                }
                Ok(if builtins::array_fns::is_array_method(key) {
                    Value::bound_method(object.clone(), key)
                } else {
                    Value::Undefined
                })
            }
            Value::String(s) => {
                if key == "length" {
                    return Ok(Value::Number(s.chars().count() as f64));
                }
                if let Ok(index) = key.parse::<usize>() {
                    return Ok(s
                        .chars()
                        .nth(index)
                        .map(|c| Value::String(c.to_string()))
                        .unwrap_or_default());
                }
                Ok(if builtins::string_fns::is_string_method(key) {
                    Value::bound_method(object.clone(), key)
                } else {
                    Value::Undefined
                })
            }
            Value::Number(_) => Ok(if builtins::math_fns::is_number_method(key) {
                Value::bound_method(object.clone(), key)
            } else {
                Value::Undefined
            }),
            Value::Boolean(_) => Ok(if key == "toString" {
                Value::bound_method(object.clone(), key)
            } else {
                Value::Undefined
            }),
            Value::Function(closure) => Ok(match key {
                "name" => Value::string(closure.name()),
                "length" => Value::Number(closure.def.params.iter().filter(|p| !p.rest && p.default.is_none()).count() as f64),
                "call" | "apply" => Value::bound_method(object.clone(), key),
                _ => Value::Undefined,
            }),
            Value::Native(native) => Ok(match key {
                "name" => Value::string(native.name.as_str()),
                "call" | "apply" => Value::bound_method(object.clone(), key),
                _ => builtins::static_member(&native.name, key).unwrap_or_default(),
            }),
            Value::Element(element) => Ok(match key {
                "props" => Value::Object(element.props.clone()),
                "key" => element.key.clone().map(Value::String).unwrap_or(Value::Null),
                "type" => builtins::react::element_type(element),
                _ => Value::Undefined,
            }),
        }
    }

    pub fn set_member(&mut self, object: &Value, key: &str, value: Value) -> Result<(), RuntimeError> {
        match object {
            Value::Undefined | Value::Null => Err(RuntimeError::type_error(format!(
                "Cannot set properties of {} (setting '{}')",
                object.to_js_string(),
                key
            ))),
            Value::Object(obj) => {
                obj.borrow_mut().set(key, value);
                Ok(())
            }
            Value::Array(items) => {
                let mut items = items.borrow_mut();
                if key == "length" {
                    let len = value.to_number();
                    if len < 0.0 || len.fract() != 0.0 {
                        return Err(RuntimeError::Custom("RangeError: Invalid array length".to_string()));
                    }
                    items.resize(len as usize, Value::Undefined);
                } else if let Ok(index) = key.parse::<usize>() {
                    if index >= items.len() {
                        items.resize(index + 1, Value::Undefined);
                    }
                    items[index] = value;
                }
                Ok(())
            }
            // Primitives, functions and elements silently ignore writes.
            _ => Ok(()),
        }
    }

    // -----------------------------------------------------------------------
    // Calls
    // -----------------------------------------------------------------------

    pub fn call_function(&mut self, func: &Value, this: Value, args: Vec<Value>) -> Result<Value, RuntimeError> {
        match func {
            Value::Function(closure) => self.call_closure(closure, this, args),
            Value::Native(native) => self.call_native(native, args),
            other => Err(RuntimeError::type_error(format!(
                "{} is not a function",
                other.describe()
            ))),
        }
    }

    fn call_closure(&mut self, closure: &Rc<Closure>, this: Value, args: Vec<Value>) -> Result<Value, RuntimeError> {
        self.enter_frame()?;
        let result = self.invoke_closure(closure, this, args);
        self.exit_frame();
        result
    }

    fn invoke_closure(&mut self, closure: &Rc<Closure>, this: Value, args: Vec<Value>) -> Result<Value, RuntimeError> {
        self.tick()?;
        let def = &closure.def;
        let env = closure.env.child(ScopeKind::Function);
        if !def.is_arrow {
            if let Some(name) = &def.name {
                env.define(name.as_str(), Value::Function(closure.clone()));
            }
            env.define("this", this);
            env.define("arguments", Value::array(args.clone()));
        }

        for (i, param) in def.params.iter().enumerate() {
            let value = if param.rest {
                Value::array(args.get(i..).map(|s| s.to_vec()).unwrap_or_default())
            } else {
                let mut value = args.get(i).cloned().unwrap_or_default();
                if matches!(value, Value::Undefined) {
                    if let Some(default) = &param.default {
                        value = self.evaluate(default, &env)?;
                    }
                }
                value
            };
            self.bind_pattern(&param.pattern, value, BindMode::Declare(VarKind::Let), &env)?;
        }

        match &def.body {
            FunctionBody::Expression(expr) => self.evaluate(expr, &env),
            FunctionBody::Block(stmts) => {
                self.hoist(stmts, &env, true);
                for stmt in stmts {
                    match self.execute(stmt, &env)? {
                        Flow::Normal => {}
                        Flow::Return(value) => return Ok(value),
                        Flow::Break | Flow::Continue => {
                            return Err(RuntimeError::Custom(
                                "SyntaxError: Illegal break or continue statement".to_string(),
                            ));
                        }
                    }
                }
                Ok(Value::Undefined)
            }
        }
    }

    fn call_native(&mut self, native: &Rc<NativeFunction>, args: Vec<Value>) -> Result<Value, RuntimeError> {
        match &native.kind {
            NativeKind::Builtin => builtins::call_builtin(self, &native.name, args),
            NativeKind::BoundMethod { receiver, method } => {
                builtins::call_method(self, receiver, method, args)
            }
            NativeKind::StateSetter { cell, dirty } => {
                let next = match args.into_iter().next().unwrap_or_default() {
                    updater if updater.is_callable() => {
                        let current = cell.borrow().clone();
                        self.call_function(&updater, Value::Undefined, vec![current])?
                    }
                    value => value,
                };
                store_state(cell, dirty, next);
                Ok(Value::Undefined)
            }
            NativeKind::Dispatch { cell, reducer, dirty } => {
                let current = cell.borrow().clone();
                let action = args.into_iter().next().unwrap_or_default();
                let next = self.call_function(reducer, Value::Undefined, vec![current, action])?;
                store_state(cell, dirty, next);
                Ok(Value::Undefined)
            }
        }
    }

    /// Turns an engine error into the value a `catch` clause binds.
    pub fn error_to_value(&self, err: RuntimeError) -> Value {
        match err {
            RuntimeError::Thrown(value) => value,
            RuntimeError::TypeError(_) | RuntimeError::ConstAssignment(_) => {
                builtins::make_error("TypeError", &err.message())
            }
            RuntimeError::UndefinedVariable(_) => builtins::make_error("ReferenceError", &err.message()),
            RuntimeError::CallDepthExceeded(_) | RuntimeError::StepLimitExceeded(_) => {
                builtins::make_error("RangeError", &err.message())
            }
            RuntimeError::Custom(message) => match message.split_once(": ") {
                Some((name @ ("RangeError" | "SyntaxError"), rest)) => builtins::make_error(name, rest),
                _ => builtins::make_error("Error", &message),
            },
        }
    }
}

fn bind_name(name: &str, value: Value, mode: BindMode, env: &Environment) -> Result<(), RuntimeError> {
    match mode {
        BindMode::Declare(VarKind::Const) => env.define_const(name, value),
        BindMode::Declare(VarKind::Let) => env.define(name, value),
        BindMode::Declare(VarKind::Var) => env.define_var(name, value),
        BindMode::Assign => return env.set(name, value),
    }
    Ok(())
}

fn copy_bindings(from: &Environment, to: &Environment, names: &[String]) {
    for name in names {
        if let Some(value) = from.get_local(name) {
            to.define(name.as_str(), value);
        }
    }
}

fn store_state(cell: &Rc<RefCell<Value>>, dirty: &Rc<Cell<bool>>, next: Value) {
    let changed = !crate::evaluator::same_value(&cell.borrow(), &next);
    if changed {
        *cell.borrow_mut() = next;
        dirty.set(true);
    }
}

/// Keys visited by `for...in`.
fn enumerable_keys(value: &Value) -> Vec<Value> {
    match value {
        Value::Object(obj) => obj.borrow().keys().into_iter().map(Value::String).collect(),
        Value::Array(items) => (0..items.borrow().len()).map(|i| Value::String(i.to_string())).collect(),
        Value::String(s) => (0..s.chars().count()).map(|i| Value::String(i.to_string())).collect(),
        _ => Vec::new(),
    }
}

/// Source-like name of a callee for "is not a function" messages.
fn callee_name(expr: &Expression) -> String {
    match expr {
        Expression::Identifier(id) => id.0.clone(),
        Expression::Member {
            object,
            property: MemberProperty::Named(name),
            ..
        } => format!("{}.{}", callee_name(object), name),
        Expression::Member { object, .. } => format!("{}[...]", callee_name(object)),
        Expression::This => "this".to_string(),
        _ => "expression".to_string(),
    }
}

fn time_seed() -> u64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    // xorshift must never start from zero
    nanos | 1
}
