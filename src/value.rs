//! Value Model
//!
//! The closed, tagged sum of runtime values plus their operator algebra.
//! Shared mutable payloads (`Array`, and the scopes backing `Function`,
//! `ClassInstance`, and `Module`) use `Rc<RefCell<_>>` so multiple
//! holders observe each other's writes, per the design notes on closure
//! aliasing.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::ast::{FuncDef, Stmt};
use crate::env::ScopeHandle;
use crate::error::ZaiError;

pub type NativeFn = Rc<dyn Fn(&[Value]) -> Result<Value, ZaiError>>;

#[derive(Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(Rc<str>),
    Nil,
    Array(Rc<RefCell<Vec<Value>>>),
    Function {
        name: Rc<str>,
        params: Rc<[String]>,
        body: Rc<[Stmt]>,
        captured: ScopeHandle,
    },
    NativeFunction {
        name: Rc<str>,
        arity: usize,
        func: NativeFn,
    },
    ClassDef {
        name: Rc<str>,
        methods: Rc<Vec<FuncDef>>,
        captured: ScopeHandle,
    },
    ClassInstance {
        class_name: Rc<str>,
        scope: ScopeHandle,
    },
    Module {
        name: Rc<str>,
        path: Rc<str>,
        alias: Option<Rc<str>>,
        scope: ScopeHandle,
    },
}

impl Value {
    pub fn string(s: impl Into<String>) -> Value {
        Value::String(Rc::from(s.into()))
    }

    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
            Value::Nil => "nil",
            Value::Array(_) => "array",
            Value::Function { .. } => "function",
            Value::NativeFunction { .. } => "native function",
            Value::ClassDef { .. } => "class definition",
            Value::ClassInstance { .. } => "class instance",
            Value::Module { .. } => "module",
        }
    }

    /// The truthiness table from the value model: everything is truthy
    /// except `nil`, `false`, zero numbers, the empty string, and the
    /// empty array.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::Bool(b) => *b,
            Value::String(s) => !s.is_empty(),
            Value::Nil => false,
            Value::Array(a) => !a.borrow().is_empty(),
            Value::Function { .. }
            | Value::NativeFunction { .. }
            | Value::ClassDef { .. }
            | Value::ClassInstance { .. }
            | Value::Module { .. } => true,
        }
    }

    fn as_int_like(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    fn as_float_like(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            Value::Int(n) => Some(*n as f64),
            Value::Bool(b) => Some(*b as i64 as f64),
            _ => None,
        }
    }

    fn involves_float(&self, other: &Value) -> bool {
        matches!(self, Value::Float(_)) || matches!(other, Value::Float(_))
    }

    pub fn add(&self, other: &Value) -> Result<Value, ZaiError> {
        match (self, other) {
            (Value::String(a), Value::String(b)) => Ok(Value::string(format!("{}{}", a, b))),
            _ if self.involves_float(other) => match (self.as_float_like(), other.as_float_like()) {
                (Some(a), Some(b)) => Ok(Value::Float(a + b)),
                _ => Err(type_error("+", self, Some(other))),
            },
            _ => match (self.as_int_like(), other.as_int_like()) {
                (Some(a), Some(b)) => Ok(Value::Int(a + b)),
                _ => Err(type_error("+", self, Some(other))),
            },
        }
    }

    pub fn sub(&self, other: &Value) -> Result<Value, ZaiError> {
        self.arith_numeric("-", other, |a, b| a - b, |a, b| a - b)
    }

    pub fn mul(&self, other: &Value) -> Result<Value, ZaiError> {
        match (self, other) {
            (Value::Int(n), Value::String(s)) | (Value::String(s), Value::Int(n)) => {
                if *n < 0 {
                    return Err(ZaiError::runtime("cannot repeat a string a negative number of times"));
                }
                Ok(Value::string(s.repeat(*n as usize)))
            }
            _ => self.arith_numeric("*", other, |a, b| a * b, |a, b| a * b),
        }
    }

    pub fn div(&self, other: &Value) -> Result<Value, ZaiError> {
        if self.involves_float(other) {
            let (a, b) = match (self.as_float_like(), other.as_float_like()) {
                (Some(a), Some(b)) => (a, b),
                _ => return Err(type_error("/", self, Some(other))),
            };
            return Ok(Value::Float(a / b));
        }
        match (self.as_int_like(), other.as_int_like()) {
            (Some(a), Some(b)) => {
                if b == 0 {
                    return Err(ZaiError::runtime("division by zero"));
                }
                Ok(Value::Int(a / b))
            }
            _ => Err(type_error("/", self, Some(other))),
        }
    }

    fn arith_numeric(
        &self,
        op: &str,
        other: &Value,
        int_op: impl Fn(i64, i64) -> i64,
        float_op: impl Fn(f64, f64) -> f64,
    ) -> Result<Value, ZaiError> {
        if self.involves_float(other) {
            match (self.as_float_like(), other.as_float_like()) {
                (Some(a), Some(b)) => return Ok(Value::Float(float_op(a, b))),
                _ => return Err(type_error(op, self, Some(other))),
            }
        }
        match (self.as_int_like(), other.as_int_like()) {
            (Some(a), Some(b)) => Ok(Value::Int(int_op(a, b))),
            _ => Err(type_error(op, self, Some(other))),
        }
    }

    fn compare(&self, other: &Value) -> Result<std::cmp::Ordering, ZaiError> {
        match (self, other) {
            (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
            _ if self.as_float_like().is_some() && other.as_float_like().is_some() => {
                let (a, b) = (self.as_float_like().unwrap(), other.as_float_like().unwrap());
                a.partial_cmp(&b).ok_or_else(|| ZaiError::runtime("cannot compare NaN"))
            }
            _ => Err(type_error("<", self, Some(other))),
        }
    }

    pub fn lt(&self, other: &Value) -> Result<Value, ZaiError> {
        Ok(Value::Bool(self.compare(other)?.is_lt()))
    }

    pub fn le(&self, other: &Value) -> Result<Value, ZaiError> {
        Ok(Value::Bool(self.compare(other)?.is_le()))
    }

    pub fn gt(&self, other: &Value) -> Result<Value, ZaiError> {
        Ok(Value::Bool(self.compare(other)?.is_gt()))
    }

    pub fn ge(&self, other: &Value) -> Result<Value, ZaiError> {
        Ok(Value::Bool(self.compare(other)?.is_ge()))
    }

    /// `==` is total: every pair of values has a defined answer, never a
    /// type error. Arrays compare elementwise at equal length; `nil`
    /// equals only `nil`.
    pub fn values_equal(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Nil, _) | (_, Value::Nil) => false,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.values_equal(y))
            }
            _ if self.as_float_like().is_some() && other.as_float_like().is_some() => {
                self.as_float_like() == other.as_float_like()
            }
            _ => false,
        }
    }

    pub fn neg(&self) -> Result<Value, ZaiError> {
        match self {
            Value::Int(n) => Ok(Value::Int(-n)),
            Value::Float(n) => Ok(Value::Float(-n)),
            Value::Bool(b) => Ok(Value::Int(-(*b as i64))),
            _ => Err(type_error("-", self, None)),
        }
    }

    pub fn not(&self) -> Value {
        Value::Bool(!self.is_truthy())
    }

    /// The string form used by `print` and string coercion: raw text for
    /// strings (no quoting), recursive `[e0, e1, ...]` for arrays, and a
    /// tagged placeholder for non-primitive values.
    pub fn display_string(&self) -> String {
        match self {
            Value::Int(n) => n.to_string(),
            Value::Float(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::String(s) => s.to_string(),
            Value::Nil => "nil".to_string(),
            Value::Array(items) => {
                let parts: Vec<String> = items.borrow().iter().map(|v| v.display_string()).collect();
                format!("[{}]", parts.join(", "))
            }
            Value::Function { name, .. } => format!("<function object {}>", name),
            Value::NativeFunction { name, .. } => format!("<function object {}>", name),
            Value::ClassDef { name, .. } => format!("<class definition object {}>", name),
            Value::ClassInstance { class_name, .. } => format!("<class instance object {}>", class_name),
            Value::Module { name, alias, .. } => match alias {
                Some(alias) => format!("<module {} imported as {}>", name, alias),
                None => format!("<module {}>", name),
            },
        }
    }
}

fn type_error(op: &str, left: &Value, right: Option<&Value>) -> ZaiError {
    ZaiError::type_error(op, left.type_name(), right.map(Value::type_name))
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_string())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.values_equal(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nil_equals_only_nil() {
        assert!(Value::Nil.values_equal(&Value::Nil));
        assert!(!Value::Nil.values_equal(&Value::Int(0)));
    }

    #[test]
    fn int_plus_int_and_bool_coercion() {
        assert_eq!(Value::Int(1).add(&Value::Bool(true)).unwrap(), Value::Int(2));
    }

    #[test]
    fn string_concatenation() {
        assert_eq!(
            Value::string("a").add(&Value::string("b")).unwrap(),
            Value::string("ab")
        );
    }

    #[test]
    fn string_repetition() {
        assert_eq!(Value::Int(3).mul(&Value::string("ab")).unwrap(), Value::string("ababab"));
    }

    #[test]
    fn division_by_string_is_a_type_error() {
        let err = Value::string("a").div(&Value::Int(2)).unwrap_err();
        match err {
            ZaiError::Type { op, .. } => assert_eq!(op, "/"),
            other => panic!("expected type error, got {:?}", other),
        }
    }

    #[test]
    fn empty_array_is_falsy_nonempty_is_truthy() {
        assert!(!Value::array(vec![]).is_truthy());
        assert!(Value::array(vec![Value::Int(0)]).is_truthy());
    }

    #[test]
    fn arrays_compare_elementwise() {
        let a = Value::array(vec![Value::Int(1), Value::Int(2)]);
        let b = Value::array(vec![Value::Int(1), Value::Int(2)]);
        let c = Value::array(vec![Value::Int(1)]);
        assert!(a.values_equal(&b));
        assert!(!a.values_equal(&c));
    }

    #[test]
    fn unary_neg_on_bool_treats_as_zero_or_one() {
        assert_eq!(Value::Bool(true).neg().unwrap(), Value::Int(-1));
    }

    #[test]
    fn float_contagion() {
        assert_eq!(Value::Int(1).add(&Value::Float(0.5)).unwrap(), Value::Float(1.5));
    }
}
