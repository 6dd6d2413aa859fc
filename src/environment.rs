//! Lexically-scoped name bindings.
//!
//! An `Environment` is a thin handle (`Rc<RefCell<..>>`) so that closures can
//! cheaply capture the frame they were defined in; cloning an `Environment`
//! shares the same underlying bindings rather than copying them.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::object::Object;

struct Inner {
    store: HashMap<String, Rc<Object>>,
    outer: Option<Environment>,
}

#[derive(Clone)]
pub struct Environment {
    inner: Rc<RefCell<Inner>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            inner: Rc::new(RefCell::new(Inner {
                store: HashMap::new(),
                outer: None,
            })),
        }
    }

    pub fn enclosed(outer: &Environment) -> Self {
        Environment {
            inner: Rc::new(RefCell::new(Inner {
                store: HashMap::new(),
                outer: Some(outer.clone()),
            })),
        }
    }

    pub fn get(&self, name: &str) -> Option<Rc<Object>> {
        let inner = self.inner.borrow();
        match inner.store.get(name) {
            Some(obj) => Some(obj.clone()),
            None => inner.outer.as_ref().and_then(|outer| outer.get(name)),
        }
    }

    pub fn set(&self, name: &str, value: Rc<Object>) -> Rc<Object> {
        self.inner
            .borrow_mut()
            .store
            .insert(name.to_string(), value.clone());
        value
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
