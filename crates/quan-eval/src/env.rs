//! Lexically scoped variable environments.

use crate::value::Value;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A single scope level.
struct Scope {
    bindings: IndexMap<String, Value>,
    parent: Option<Environment>,
}

/// A handle to one scope in an environment chain.
///
/// Handles are cheap to clone and share the underlying scope. Closures keep
/// a handle to the scope they were created in, so a scope lives as long as
/// any function that captured it.
///
/// Variables are looked up from innermost scope outward.
/// `define` always creates in this scope.
/// `assign` updates the nearest scope where the variable exists.
#[derive(Clone)]
pub struct Environment(Rc<RefCell<Scope>>);

impl Environment {
    /// Create a root environment with no parent.
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(Scope {
            bindings: IndexMap::new(),
            parent: None,
        })))
    }

    /// Create a child scope whose lookups fall back to `self`.
    pub fn child(&self) -> Self {
        Self(Rc::new(RefCell::new(Scope {
            bindings: IndexMap::new(),
            parent: Some(self.clone()),
        })))
    }

    /// Define a variable in this scope, shadowing any outer binding.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.0.borrow_mut().bindings.insert(name.into(), value);
    }

    /// Look up a variable, searching from this scope outward.
    pub fn get(&self, name: &str) -> Option<Value> {
        let mut current = self.clone();
        loop {
            let next = {
                let scope = current.0.borrow();
                if let Some(v) = scope.bindings.get(name) {
                    return Some(v.clone());
                }
                scope.parent.clone()?
            };
            current = next;
        }
    }

    /// Overwrite the binding in the nearest scope that declares `name`, or
    /// create it in this scope when no scope does.
    pub fn assign(&self, name: &str, value: Value) {
        let mut current = self.clone();
        loop {
            let next = {
                let mut scope = current.0.borrow_mut();
                if let Some(slot) = scope.bindings.get_mut(name) {
                    *slot = value;
                    return;
                }
                scope.parent.clone()
            };
            match next {
                Some(parent) => current = parent,
                None => break,
            }
        }
        self.define(name, value);
    }

    /// Bindings of this scope only, in insertion order.
    pub fn bindings(&self) -> Vec<(String, Value)> {
        self.0
            .borrow()
            .bindings
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Number of bindings in this scope.
    pub fn len(&self) -> usize {
        self.0.borrow().bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every binding in this scope. Closures stored in the root scope
    /// capture the root scope itself, so this is what releases them.
    pub fn clear(&self) {
        let drained: Vec<Value> = self.0.borrow_mut().bindings.drain(..).map(|(_, v)| v).collect();
        drop(drained);
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = self.0.borrow();
        f.debug_struct("Environment")
            .field("names", &scope.bindings.keys().collect::<Vec<_>>())
            .field("has_parent", &scope.parent.is_some())
            .finish()
    }
}
