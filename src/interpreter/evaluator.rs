//! Evaluator
//!
//! A tree-walking evaluator with one method per AST variant. Non-local
//! control flow (`return`/`break`/`continue`) is threaded back up the
//! call stack as a `Signal` rather than modeled with Rust exceptions or
//! exposed as a `Value` a script could observe.
//!
//! Interpreter state lives behind `RefCell`s so evaluation methods take
//! `&self`: a literal RAII scope guard holding `&mut EnvironmentStack`
//! would have to stay borrowed across the recursive `eval_stmt`/`eval_expr`
//! calls inside its own scope, which the borrow checker will not allow
//! once those calls also need access to the interpreter's other fields.
//! Interior mutability sidesteps that without losing the drop-on-every-
//! exit-path guarantee; `BlockGuard` below plays the same role `env::
//! ScopeGuard` plays for direct `EnvironmentStack` consumers.

use std::cell::RefCell;
use std::collections::HashMap;
use std::collections::HashSet;
use std::rc::Rc;

use crate::ast::{ArithOp, Block, CompoundOp, Expr, LogicOp, Program, RelOp, Stmt, UnaryOp};
use crate::env::{EnvironmentStack, Scope, ScopeHandle};
use crate::error::ZaiError;
use crate::lexer;
use crate::parser::Parser;
use crate::value::Value;

use super::module_loader;

#[derive(Debug, Clone)]
pub enum Signal {
    None,
    Return(Value),
    Break,
    Continue,
}

struct BlockGuard<'a> {
    stack: &'a RefCell<EnvironmentStack>,
}

impl<'a> BlockGuard<'a> {
    fn enter(stack: &'a RefCell<EnvironmentStack>, parent: ScopeHandle) -> (Self, ScopeHandle) {
        let scope = stack.borrow_mut().enter_scope(parent);
        (BlockGuard { stack }, scope)
    }

    fn push(stack: &'a RefCell<EnvironmentStack>, scope: ScopeHandle) -> Self {
        stack.borrow_mut().push_scope(scope);
        BlockGuard { stack }
    }
}

impl Drop for BlockGuard<'_> {
    fn drop(&mut self) {
        self.stack.borrow_mut().exit_scope();
    }
}

fn normalize_index(i: i64, len: usize) -> Result<usize, ZaiError> {
    if i < 0 || i as usize >= len {
        return Err(ZaiError::runtime(format!("array index {} out of bounds (length {})", i, len)));
    }
    Ok(i as usize)
}

pub struct Evaluator {
    stack: RefCell<EnvironmentStack>,
    global: ScopeHandle,
    module_cache: RefCell<HashMap<String, Value>>,
    loading: RefCell<HashSet<String>>,
}

impl Evaluator {
    pub fn new() -> Self {
        let stack = EnvironmentStack::new();
        let global = stack.peek();
        super::natives::install(&global);
        Evaluator {
            stack: RefCell::new(stack),
            global,
            module_cache: RefCell::new(HashMap::new()),
            loading: RefCell::new(HashSet::new()),
        }
    }

    /// Run every top-level statement. A `return`/`break`/`continue` that
    /// escapes all the way to the top level is a runtime error -- there
    /// is no function or loop left to catch it.
    pub fn run(&self, program: &Program) -> Result<(), ZaiError> {
        for stmt in &program.stmts {
            match self.eval_stmt(stmt)? {
                Signal::None => {}
                Signal::Return(_) => return Err(ZaiError::runtime("'return' used outside a function")),
                Signal::Break | Signal::Continue => {
                    return Err(ZaiError::runtime("'break'/'continue' used outside a loop"))
                }
            }
        }
        Ok(())
    }

    fn current_scope(&self) -> ScopeHandle {
        self.stack.borrow().peek()
    }

    fn eval_block(&self, block: &Block) -> Result<Signal, ZaiError> {
        let parent = self.current_scope();
        let (_guard, _scope) = BlockGuard::enter(&self.stack, parent);
        for stmt in block {
            let sig = self.eval_stmt(stmt)?;
            if !matches!(sig, Signal::None) {
                return Ok(sig);
            }
        }
        Ok(Signal::None)
    }

    fn eval_stmt(&self, stmt: &Stmt) -> Result<Signal, ZaiError> {
        match stmt {
            Stmt::Expr(e) => {
                self.eval_expr(e)?;
                Ok(Signal::None)
            }
            Stmt::If { branches, else_block } => {
                for (cond, body) in branches {
                    if self.eval_expr(cond)?.is_truthy() {
                        return self.eval_block(body);
                    }
                }
                match else_block {
                    Some(body) => self.eval_block(body),
                    None => Ok(Signal::None),
                }
            }
            Stmt::While { cond, body } => {
                while self.eval_expr(cond)?.is_truthy() {
                    match self.eval_block(body)? {
                        Signal::Break => break,
                        Signal::Return(v) => return Ok(Signal::Return(v)),
                        Signal::Continue | Signal::None => {}
                    }
                }
                Ok(Signal::None)
            }
            Stmt::DoWhile { cond, body } => {
                loop {
                    match self.eval_block(body)? {
                        Signal::Break => break,
                        Signal::Return(v) => return Ok(Signal::Return(v)),
                        Signal::Continue | Signal::None => {}
                    }
                    if !self.eval_expr(cond)?.is_truthy() {
                        break;
                    }
                }
                Ok(Signal::None)
            }
            Stmt::Switch { scrutinee, cases, default_block } => self.eval_switch(scrutinee, cases, default_block),
            Stmt::Break => Ok(Signal::Break),
            Stmt::Continue => Ok(Signal::Continue),
            Stmt::Return(value) => {
                let v = match value {
                    Some(e) => self.eval_expr(e)?,
                    None => Value::Nil,
                };
                Ok(Signal::Return(v))
            }
            Stmt::FuncDef(def) => {
                let func = Value::Function {
                    name: Rc::from(def.name.as_str()),
                    params: Rc::from(def.params.clone()),
                    body: Rc::from(def.body.clone()),
                    captured: self.current_scope(),
                };
                self.current_scope().borrow_mut().initialize(def.name.clone(), func);
                Ok(Signal::None)
            }
            Stmt::ClassDef(def) => {
                let class = Value::ClassDef {
                    name: Rc::from(def.name.as_str()),
                    methods: Rc::new(def.methods.clone()),
                    captured: self.current_scope(),
                };
                self.current_scope().borrow_mut().initialize(def.name.clone(), class);
                Ok(Signal::None)
            }
            Stmt::Block(block) => self.eval_block(block),
            Stmt::Print(e) => {
                let v = self.eval_expr(e)?;
                println!("{}", v.display_string());
                Ok(Signal::None)
            }
            Stmt::Import { module_name, alias } => {
                self.eval_import(module_name, alias.as_deref())?;
                Ok(Signal::None)
            }
        }
    }

    fn eval_switch(&self, scrutinee: &Expr, cases: &[(Expr, Block)], default_block: &Option<Block>) -> Result<Signal, ZaiError> {
        let value = self.eval_expr(scrutinee)?;
        let mut matched = false;
        for (case_expr, block) in cases {
            if !matched {
                let case_value = self.eval_expr(case_expr)?;
                matched = case_value.values_equal(&value);
            }
            if matched {
                match self.eval_block(block)? {
                    Signal::Break => return Ok(Signal::None),
                    Signal::None => {}
                    other => return Ok(other),
                }
            }
        }
        match default_block {
            Some(block) => match self.eval_block(block)? {
                Signal::Break => Ok(Signal::None),
                other => Ok(other),
            },
            None => Ok(Signal::None),
        }
    }

    fn eval_expr(&self, expr: &Expr) -> Result<Value, ZaiError> {
        match expr {
            Expr::Int(n) => Ok(Value::Int(*n)),
            Expr::Float(n) => Ok(Value::Float(*n)),
            Expr::Str(s) => Ok(Value::string(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Nil => Ok(Value::Nil),
            Expr::ArrayLit(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval_expr(item)?);
                }
                Ok(Value::array(values))
            }
            Expr::Symbol(name) => self
                .current_scope()
                .borrow()
                .lookup(name)
                .ok_or_else(|| ZaiError::runtime(format!("undefined variable '{}'", name))),
            Expr::This => self
                .current_scope()
                .borrow()
                .lookup("this")
                .ok_or_else(|| ZaiError::runtime("'this' used outside a method")),
            Expr::PropertyAccess { receiver, name } => {
                let recv = self.eval_expr(receiver)?;
                self.property_get(&recv, name)
            }
            Expr::ArrayAccess { receiver, index } => {
                let recv = self.eval_expr(receiver)?;
                let idx = self.eval_expr(index)?;
                match (recv, idx) {
                    (Value::Array(items), Value::Int(i)) => {
                        let items = items.borrow();
                        let i = normalize_index(i, items.len())?;
                        Ok(items[i].clone())
                    }
                    (Value::String(s), Value::Int(i)) => {
                        let chars: Vec<char> = s.chars().collect();
                        let i = normalize_index(i, chars.len())?;
                        Ok(Value::string(chars[i].to_string()))
                    }
                    (other, _) => Err(ZaiError::runtime(format!("cannot index into {}", other.type_name()))),
                }
            }
            Expr::Call { callee, args } => {
                let callee_val = self.eval_expr(callee)?;
                let mut arg_vals = Vec::with_capacity(args.len());
                for a in args {
                    arg_vals.push(self.eval_expr(a)?);
                }
                self.call_value(callee_val, arg_vals)
            }
            Expr::Unary { op, operand } => {
                let v = self.eval_expr(operand)?;
                match op {
                    UnaryOp::Neg => v.neg(),
                    UnaryOp::Not => Ok(v.not()),
                }
            }
            Expr::Incr(target) => self.step(target, 1),
            Expr::Decr(target) => self.step(target, -1),
            Expr::Arith { op, left, right } => {
                let l = self.eval_expr(left)?;
                let r = self.eval_expr(right)?;
                match op {
                    ArithOp::Add => l.add(&r),
                    ArithOp::Sub => l.sub(&r),
                    ArithOp::Mul => l.mul(&r),
                    ArithOp::Div => l.div(&r),
                }
            }
            Expr::Relop { op, left, right } => {
                let l = self.eval_expr(left)?;
                let r = self.eval_expr(right)?;
                match op {
                    RelOp::Lt => l.lt(&r),
                    RelOp::Le => l.le(&r),
                    RelOp::Gt => l.gt(&r),
                    RelOp::Ge => l.ge(&r),
                }
            }
            Expr::Eq { negate, left, right } => {
                let l = self.eval_expr(left)?;
                let r = self.eval_expr(right)?;
                Ok(Value::Bool(l.values_equal(&r) != *negate))
            }
            Expr::Logic { op, left, right } => {
                let l = self.eval_expr(left)?;
                let r = self.eval_expr(right)?;
                let truth = match op {
                    LogicOp::And => l.is_truthy() & r.is_truthy(),
                    LogicOp::Or => l.is_truthy() | r.is_truthy(),
                };
                Ok(Value::Bool(truth))
            }
            Expr::NewAssign { path, name, value } => {
                let v = self.eval_expr(value)?;
                match path {
                    None => {
                        self.current_scope().borrow_mut().initialize(name.clone(), v.clone());
                    }
                    Some(path_expr) => {
                        let target = self.eval_expr(path_expr)?;
                        match target {
                            Value::ClassInstance { scope, .. } | Value::Module { scope, .. } => {
                                scope.borrow_mut().initialize(name.clone(), v.clone());
                            }
                            other => {
                                return Err(ZaiError::runtime(format!("cannot declare a field on {}", other.type_name())))
                            }
                        }
                    }
                }
                Ok(v)
            }
            Expr::Reassign { target, value } => {
                let v = self.eval_expr(value)?;
                self.assign_to(target, v.clone())?;
                Ok(v)
            }
            Expr::CompoundAssign { op, target, value } => {
                let old = self.eval_expr(target)?;
                let delta = self.eval_expr(value)?;
                if let (CompoundOp::Add, Value::Array(items)) = (op, &old) {
                    match delta {
                        Value::Array(other) if !Rc::ptr_eq(items, &other) => {
                            items.borrow_mut().extend(other.borrow().iter().cloned())
                        }
                        Value::Array(_) => {
                            let snapshot = items.borrow().clone();
                            items.borrow_mut().extend(snapshot);
                        }
                        scalar => items.borrow_mut().push(scalar),
                    }
                    self.assign_to(target, old.clone())?;
                    return Ok(old);
                }
                let new = match op {
                    CompoundOp::Add => old.add(&delta)?,
                    CompoundOp::Sub => old.sub(&delta)?,
                };
                self.assign_to(target, new.clone())?;
                Ok(new)
            }
        }
    }

    fn step(&self, target: &Expr, delta: i64) -> Result<Value, ZaiError> {
        let old = self.eval_expr(target)?;
        let new = if delta > 0 { old.add(&Value::Int(1))? } else { old.sub(&Value::Int(1))? };
        self.assign_to(target, new.clone())?;
        Ok(new)
    }

    fn property_get(&self, recv: &Value, name: &str) -> Result<Value, ZaiError> {
        match recv {
            Value::ClassInstance { scope, .. } => scope
                .borrow()
                .lookup_local(name)
                .ok_or_else(|| ZaiError::runtime(format!("undefined property '{}'", name))),
            Value::Module { scope, .. } => scope
                .borrow()
                .lookup_local(name)
                .ok_or_else(|| ZaiError::runtime(format!("module has no member '{}'", name))),
            other => Err(ZaiError::runtime(format!("{} has no properties", other.type_name()))),
        }
    }

    fn assign_to(&self, target: &Expr, value: Value) -> Result<(), ZaiError> {
        match target {
            Expr::Symbol(name) => {
                if self.current_scope().borrow_mut().replace(name, value) {
                    Ok(())
                } else {
                    Err(ZaiError::runtime(format!("undefined variable '{}'", name)))
                }
            }
            Expr::PropertyAccess { receiver, name } => {
                let recv = self.eval_expr(receiver)?;
                match recv {
                    Value::ClassInstance { scope, .. } | Value::Module { scope, .. } => {
                        scope.borrow_mut().initialize(name.clone(), value);
                        Ok(())
                    }
                    other => Err(ZaiError::runtime(format!("cannot assign a property on {}", other.type_name()))),
                }
            }
            Expr::ArrayAccess { receiver, index } => {
                let recv = self.eval_expr(receiver)?;
                let idx = self.eval_expr(index)?;
                match (recv, idx) {
                    (Value::Array(items), Value::Int(i)) => {
                        let mut items = items.borrow_mut();
                        let i = normalize_index(i, items.len())?;
                        items[i] = value;
                        Ok(())
                    }
                    (other, _) => Err(ZaiError::runtime(format!("cannot index into {}", other.type_name()))),
                }
            }
            _ => Err(ZaiError::runtime("invalid assignment target")),
        }
    }

    fn call_function(&self, params: &[String], body: &[Stmt], captured: ScopeHandle, args: Vec<Value>) -> Result<Value, ZaiError> {
        if params.len() != args.len() {
            return Err(ZaiError::runtime(format!("expected {} argument(s), got {}", params.len(), args.len())));
        }
        let (_guard, call_scope) = BlockGuard::enter(&self.stack, captured);
        for (p, a) in params.iter().zip(args) {
            call_scope.borrow_mut().initialize(p.clone(), a);
        }
        for stmt in body {
            match self.eval_stmt(stmt)? {
                Signal::Return(v) => return Ok(v),
                Signal::Break | Signal::Continue => return Err(ZaiError::runtime("'break'/'continue' used outside a loop")),
                Signal::None => {}
            }
        }
        Ok(Value::Nil)
    }

    fn call_value(&self, callee: Value, args: Vec<Value>) -> Result<Value, ZaiError> {
        match callee {
            Value::Function { params, body, captured, .. } => self.call_function(&params, &body, captured, args),
            Value::NativeFunction { arity, func, name } => {
                if args.len() != arity {
                    return Err(ZaiError::runtime(format!("'{}' expects {} argument(s), got {}", name, arity, args.len())));
                }
                func(&args)
            }
            Value::ClassDef { name, methods, captured } => {
                let scope = Scope::new(Some(captured));
                for method in methods.iter() {
                    let bound = Value::Function {
                        name: Rc::from(method.name.as_str()),
                        params: Rc::from(method.params.clone()),
                        body: Rc::from(method.body.clone()),
                        captured: scope.clone(),
                    };
                    scope.borrow_mut().initialize(method.name.clone(), bound);
                }
                let instance = Value::ClassInstance { class_name: name.clone(), scope: scope.clone() };
                scope.borrow_mut().initialize("this".to_string(), instance.clone());

                if let Some(ctor) = methods.iter().find(|m| m.name == "constructor") {
                    self.call_function(&ctor.params, &ctor.body, scope, args)?;
                } else if !args.is_empty() {
                    return Err(ZaiError::runtime(format!("class '{}' has no constructor but was called with arguments", name)));
                }
                Ok(instance)
            }
            other => Err(ZaiError::runtime(format!("value of type {} is not callable", other.type_name()))),
        }
    }

    fn eval_import(&self, module_name: &str, alias: Option<&str>) -> Result<(), ZaiError> {
        if let Some(cached) = self.module_cache.borrow().get(module_name) {
            let bind_name = alias.unwrap_or(module_name);
            self.current_scope().borrow_mut().initialize(bind_name, cached.clone());
            return Ok(());
        }
        if !self.loading.borrow_mut().insert(module_name.to_string()) {
            return Err(ZaiError::runtime(format!("circular import of module '{}'", module_name)));
        }
        let result = self.load_module(module_name);
        self.loading.borrow_mut().remove(module_name);
        let module_val = result?;

        self.module_cache.borrow_mut().insert(module_name.to_string(), module_val.clone());
        let bind_name = alias.unwrap_or(module_name);
        let module_val = match (&module_val, alias) {
            (Value::Module { name, path, scope, .. }, Some(alias)) => {
                Value::Module { name: name.clone(), path: path.clone(), alias: Some(Rc::from(alias)), scope: scope.clone() }
            }
            _ => module_val,
        };
        self.current_scope().borrow_mut().initialize(bind_name, module_val);
        Ok(())
    }

    fn load_module(&self, module_name: &str) -> Result<Value, ZaiError> {
        let path = module_loader::resolve(module_name)
            .ok_or_else(|| ZaiError::runtime(format!("module '{}' not found on ZAI_PATH", module_name)))?;
        let source =
            std::fs::read_to_string(&path).map_err(|e| ZaiError::runtime(format!("cannot read module '{}': {}", module_name, e)))?;
        let tokens = lexer::tokenize(&source)?;
        let program = Parser::new(tokens).parse_program()?;

        let module_scope = Scope::new(Some(self.global.clone()));
        {
            let _guard = BlockGuard::push(&self.stack, module_scope.clone());
            for stmt in &program.stmts {
                self.eval_stmt(stmt)?;
            }
        }

        Ok(Value::Module {
            name: Rc::from(module_name),
            path: Rc::from(path.to_string_lossy().as_ref()),
            alias: None,
            scope: module_scope,
        })
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(src: &str) -> Result<Evaluator, ZaiError> {
        let evaluator = Evaluator::new();
        let tokens = lexer::tokenize(src).unwrap();
        let program = Parser::new(tokens).parse_program().unwrap();
        evaluator.run(&program)?;
        Ok(evaluator)
    }

    fn eval_one(src: &str) -> Value {
        let evaluator = Evaluator::new();
        let tokens = lexer::tokenize(&format!("let __result = {};", src)).unwrap();
        let program = Parser::new(tokens).parse_program().unwrap();
        evaluator.run(&program).unwrap();
        let result = evaluator.global.borrow().lookup_local("__result").unwrap();
        result
    }

    #[test]
    fn arithmetic_respects_precedence() {
        assert_eq!(eval_one("1 + 2 * 3"), Value::Int(7));
    }

    #[test]
    fn while_loop_accumulates_with_reassignment() {
        let evaluator = run("let i = 0; let sum = 0; while (i < 5) { sum = sum + i; i = i + 1; }").unwrap();
        assert_eq!(evaluator.global.borrow().lookup_local("sum"), Some(Value::Int(10)));
    }

    #[test]
    fn closures_capture_their_defining_scope_by_reference() {
        let evaluator = run(
            "func make_counter() { let n = 0; func bump() { n = n + 1; return n; } return bump; } let counter = make_counter(); let a = counter(); let b = counter();",
        )
        .unwrap();
        assert_eq!(evaluator.global.borrow().lookup_local("a"), Some(Value::Int(1)));
        assert_eq!(evaluator.global.borrow().lookup_local("b"), Some(Value::Int(2)));
    }

    #[test]
    fn class_constructor_and_method_share_instance_state() {
        let evaluator = run(
            "class Counter { func constructor(start) { let this.n = start; } func bump() { this.n = this.n + 1; return this.n; } } let c = Counter(5); let first = c.bump(); let second = c.bump();",
        )
        .unwrap();
        assert_eq!(evaluator.global.borrow().lookup_local("first"), Some(Value::Int(6)));
        assert_eq!(evaluator.global.borrow().lookup_local("second"), Some(Value::Int(7)));
    }

    #[test]
    fn switch_falls_through_without_an_explicit_break() {
        let evaluator = run(
            "let log = \"\"; switch (1) { case 1: log = log + \"a\"; case 2: log = log + \"b\"; break; case 3: log = log + \"c\"; default: log = log + \"d\"; }",
        )
        .unwrap();
        assert_eq!(evaluator.global.borrow().lookup_local("log"), Some(Value::string("ab")));
    }

    #[test]
    fn string_concatenation_and_equality() {
        assert_eq!(eval_one("\"foo\" + \"bar\" == \"foobar\""), Value::Bool(true));
    }

    #[test]
    fn arrays_are_shared_by_reference() {
        let evaluator = run("let a = [1, 2]; let b = a; push(b, 3);").unwrap();
        assert_eq!(evaluator.global.borrow().lookup_local("a"), Some(Value::array(vec![Value::Int(1), Value::Int(2), Value::Int(3)])));
    }

    #[test]
    fn break_outside_a_loop_is_a_runtime_error() {
        assert!(run("break;").is_err());
    }

    #[test]
    fn undefined_variable_is_a_runtime_error() {
        assert!(run("print missing;").is_err());
    }

    #[test]
    fn post_increment_returns_and_stores_the_incremented_value() {
        let evaluator = run("let x = 1; let y = x++;").unwrap();
        assert_eq!(evaluator.global.borrow().lookup_local("x"), Some(Value::Int(2)));
        assert_eq!(evaluator.global.borrow().lookup_local("y"), Some(Value::Int(2)));
    }
}
