//! Native Function Registry
//!
//! The handful of builtins that cannot be written in zai itself because
//! they need to reach into `Value`'s internals: `len`, `str`, `type`,
//! `push`, and `pop`.

use std::rc::Rc;

use crate::env::ScopeHandle;
use crate::error::ZaiError;
use crate::value::Value;

fn native_len(args: &[Value]) -> Result<Value, ZaiError> {
    match &args[0] {
        Value::Array(items) => Ok(Value::Int(items.borrow().len() as i64)),
        Value::String(s) => Ok(Value::Int(s.chars().count() as i64)),
        other => Err(ZaiError::runtime(format!("'len' is not defined for {}", other.type_name()))),
    }
}

fn native_str(args: &[Value]) -> Result<Value, ZaiError> {
    Ok(Value::string(args[0].display_string()))
}

fn native_type(args: &[Value]) -> Result<Value, ZaiError> {
    Ok(Value::string(args[0].type_name()))
}

fn native_push(args: &[Value]) -> Result<Value, ZaiError> {
    match &args[0] {
        Value::Array(items) => {
            items.borrow_mut().push(args[1].clone());
            Ok(args[0].clone())
        }
        other => Err(ZaiError::runtime(format!("'push' expects an array, got {}", other.type_name()))),
    }
}

fn native_pop(args: &[Value]) -> Result<Value, ZaiError> {
    match &args[0] {
        Value::Array(items) => items
            .borrow_mut()
            .pop()
            .ok_or_else(|| ZaiError::runtime("cannot pop from an empty array")),
        other => Err(ZaiError::runtime(format!("'pop' expects an array, got {}", other.type_name()))),
    }
}

/// Install the reference builtins into a scope, typically an
/// interpreter's freshly created global scope.
pub fn install(scope: &ScopeHandle) {
    let entries: [(&str, usize, fn(&[Value]) -> Result<Value, ZaiError>); 5] = [
        ("len", 1, native_len),
        ("str", 1, native_str),
        ("type", 1, native_type),
        ("push", 2, native_push),
        ("pop", 1, native_pop),
    ];
    for (name, arity, func) in entries {
        scope.borrow_mut().initialize(
            name,
            Value::NativeFunction {
                name: Rc::from(name),
                arity,
                func: Rc::new(func),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Scope;

    #[test]
    fn install_registers_reference_builtins() {
        let scope = Scope::new(None);
        install(&scope);
        for name in ["len", "str", "type", "push", "pop"] {
            assert!(scope.borrow().lookup_local(name).is_some());
        }
    }

    #[test]
    fn len_reports_array_and_string_length() {
        assert_eq!(native_len(&[Value::array(vec![Value::Int(1), Value::Int(2)])]).unwrap(), Value::Int(2));
        assert_eq!(native_len(&[Value::string("hi")]).unwrap(), Value::Int(2));
    }

    #[test]
    fn push_mutates_in_place_and_returns_the_array() {
        let arr = Value::array(vec![Value::Int(1)]);
        let result = native_push(&[arr.clone(), Value::Int(2)]).unwrap();
        match result {
            Value::Array(items) => assert_eq!(items.borrow().len(), 2),
            _ => panic!("expected array"),
        }
    }

    #[test]
    fn pop_on_empty_array_is_an_error() {
        assert!(native_pop(&[Value::array(vec![])]).is_err());
    }

    #[test]
    fn type_reports_tag_names() {
        assert_eq!(native_type(&[Value::Int(1)]).unwrap(), Value::string("int"));
        assert_eq!(native_type(&[Value::Nil]).unwrap(), Value::string("nil"));
    }
}
