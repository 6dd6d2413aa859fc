//! Runtime values produced by the evaluator.
//!
//! `Object` is a closed tagged union rather than a trait object: every
//! variant the evaluator can produce is enumerated here, and callers match
//! exhaustively instead of type-switching at runtime.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use once_cell::unsync::Lazy;

use crate::ast::{BlockStatement, Identifier};
use crate::environment::Environment;

// The evaluator is single-threaded (see the concurrency notes in
// SPEC_FULL.md §5), so the singletons live in thread-local storage rather
// than behind a `Sync` bound — `once_cell::sync::Lazy` would require
// `Object` to be `Sync`, which it never is once closures capture `Rc`s.
thread_local! {
    static SINGLETONS: Lazy<(Rc<Object>, Rc<Object>, Rc<Object>)> = Lazy::new(|| {
        (
            Rc::new(Object::Boolean(true)),
            Rc::new(Object::Boolean(false)),
            Rc::new(Object::Null),
        )
    });
}

pub fn truth() -> Rc<Object> {
    SINGLETONS.with(|s| s.0.clone())
}

pub fn falsehood() -> Rc<Object> {
    SINGLETONS.with(|s| s.1.clone())
}

pub fn null() -> Rc<Object> {
    SINGLETONS.with(|s| s.2.clone())
}

pub fn native_bool(value: bool) -> Rc<Object> {
    if value {
        truth()
    } else {
        falsehood()
    }
}

pub fn new_array(items: Vec<Rc<Object>>) -> Rc<Object> {
    Rc::new(Object::Array(Rc::new(RefCell::new(items))))
}

pub fn new_hash(pairs: HashMap<HashKey, HashPair>) -> Rc<Object> {
    Rc::new(Object::Hash(Rc::new(RefCell::new(pairs))))
}

pub type BuiltinFn = fn(&[Rc<Object>]) -> Rc<Object>;

#[derive(Clone)]
pub enum Object {
    Integer(i64),
    Boolean(bool),
    Null,
    Str(String),
    Array(Rc<RefCell<Vec<Rc<Object>>>>),
    Hash(Rc<RefCell<HashMap<HashKey, HashPair>>>),
    Function(Rc<FunctionObj>),
    CompiledFunction(Rc<Vec<u8>>),
    Builtin(BuiltinFn),
    ReturnValue(Rc<Object>),
    Error(String),
}

pub struct FunctionObj {
    pub parameters: Vec<Identifier>,
    pub body: BlockStatement,
    pub env: Environment,
}

#[derive(Clone)]
pub struct HashPair {
    pub key: Rc<Object>,
    pub value: Rc<Object>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashKey {
    pub type_tag: &'static str,
    pub value: u64,
}

impl Object {
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Integer(_) => "INTEGER",
            Object::Boolean(_) => "BOOLEAN",
            Object::Null => "NULL",
            Object::Str(_) => "STRING",
            Object::Array(_) => "ARRAY",
            Object::Hash(_) => "HASH",
            Object::Function(_) => "FUNCTION",
            Object::CompiledFunction(_) => "COMPILED_FUNCTION",
            Object::Builtin(_) => "BUILTIN",
            Object::ReturnValue(_) => "RETURN_VALUE",
            Object::Error(_) => "ERROR",
        }
    }

    pub fn inspect(&self) -> String {
        match self {
            Object::Integer(v) => v.to_string(),
            Object::Boolean(v) => v.to_string(),
            Object::Null => "null".to_string(),
            Object::Str(v) => v.clone(),
            Object::Array(elems) => {
                let parts: Vec<String> = elems.borrow().iter().map(|e| e.inspect()).collect();
                format!("[{}]", parts.join(", "))
            }
            Object::Hash(pairs) => {
                let parts: Vec<String> = pairs
                    .borrow()
                    .values()
                    .map(|p| format!("{}: {}", p.key.inspect(), p.value.inspect()))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
            Object::Function(f) => {
                let params: Vec<String> =
                    f.parameters.iter().map(|p| p.value.clone()).collect();
                format!("fn({}) {{\n{}\n}}", params.join(", "), f.body)
            }
            Object::CompiledFunction(_) => "CompiledFunction[...]".to_string(),
            Object::Builtin(_) => "builtin function".to_string(),
            Object::ReturnValue(v) => v.inspect(),
            Object::Error(msg) => format!("ERROR: {msg}"),
        }
    }

    pub fn is_truthy(&self) -> bool {
        !matches!(self, Object::Null | Object::Boolean(false))
    }

    pub fn hash_key(&self) -> Result<HashKey, String> {
        match self {
            Object::Integer(v) => Ok(HashKey {
                type_tag: "INTEGER",
                value: *v as u64,
            }),
            Object::Boolean(v) => Ok(HashKey {
                type_tag: "BOOLEAN",
                value: if *v { 1 } else { 0 },
            }),
            Object::Str(s) => Ok(HashKey {
                type_tag: "STRING",
                value: fnv1a64(s.as_bytes()),
            }),
            other => Err(format!("unusable as hash key: {}", other.type_name())),
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.type_name(), self.inspect())
    }
}

/// FNV-1a 64-bit hash, used to key `Object::Str` into a `HashKey`.
fn fnv1a64(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut hash = OFFSET_BASIS;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// Builds an `Object::Error` carrying a formatted message.
pub fn new_error(msg: impl Into<String>) -> Rc<Object> {
    Rc::new(Object::Error(msg.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_hash_keys_with_equal_content_are_equal() {
        let a = Object::Str("hello world".to_string());
        let b = Object::Str("hello world".to_string());
        let diff = Object::Str("my name is johnny".to_string());

        assert_eq!(a.hash_key().unwrap(), b.hash_key().unwrap());
        assert_ne!(a.hash_key().unwrap(), diff.hash_key().unwrap());
    }

    #[test]
    fn boolean_and_integer_hash_keys() {
        assert_eq!(
            Object::Boolean(true).hash_key().unwrap(),
            Object::Boolean(true).hash_key().unwrap()
        );
        assert_ne!(
            Object::Boolean(true).hash_key().unwrap(),
            Object::Boolean(false).hash_key().unwrap()
        );
        assert_eq!(
            Object::Integer(5).hash_key().unwrap(),
            Object::Integer(5).hash_key().unwrap()
        );
    }

    #[test]
    fn unhashable_types_error() {
        let err = Object::Null.hash_key().unwrap_err();
        assert_eq!(err, "unusable as hash key: NULL");
    }

    #[test]
    fn truthiness() {
        assert!(Object::Integer(0).is_truthy());
        assert!(!Object::Null.is_truthy());
        assert!(!Object::Boolean(false).is_truthy());
        assert!(Object::Boolean(true).is_truthy());
    }
}
