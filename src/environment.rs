//! Lexical scopes.
//!
//! A scope is a name→value table plus an optional link to its enclosing
//! scope.  Scopes are shared (`Rc<RefCell<_>>`): every closure created while a
//! scope was innermost keeps it alive, and writes through any holder are seen
//! by all of them.

use crate::error::{LoxError, Result, RuntimeErrorKind};
use crate::token::Token;
use crate::value::Value;
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared handle to a scope.
pub type EnvRef = Rc<RefCell<Environment>>;

#[derive(Debug, Clone, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: EnvRef) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Fresh shared scope chained onto `enclosing`.
    pub fn child_of(enclosing: &EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
            enclosing,
        ))))
    }

    pub fn enclosing(&self) -> Option<EnvRef> {
        self.enclosing.clone()
    }

    /// Bind `name` in this scope, replacing any previous binding.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Value bound in this scope only, without walking the chain.
    pub fn get_own(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }

    pub fn get(&self, name: &Token) -> Result<Value> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(undefined(name))
        }
    }

    /// Overwrite the nearest existing binding.  Never creates one.
    pub fn assign(&mut self, name: &Token, value: Value) -> Result<()> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(undefined(name))
        }
    }

    /// The scope exactly `distance` links up from `env`.
    pub fn ancestor(env: &EnvRef, distance: usize) -> Result<EnvRef> {
        let mut current: EnvRef = Rc::clone(env);

        for hop in 0..distance {
            let next = current.borrow().enclosing.clone().ok_or_else(|| {
                LoxError::internal(format!(
                    "scope chain ended after {} of {} hops",
                    hop, distance
                ))
            })?;
            current = next;
        }

        Ok(current)
    }

    /// Read a resolved binding: no fallback search.
    pub fn get_at(env: &EnvRef, distance: usize, name: &str) -> Result<Value> {
        debug!("get_at distance={} name={}", distance, name);

        Environment::ancestor(env, distance)?
            .borrow()
            .values
            .get(name)
            .cloned()
            .ok_or_else(|| {
                LoxError::internal(format!(
                    "resolved variable '{}' missing at distance {}",
                    name, distance
                ))
            })
    }

    /// Write a resolved binding: no fallback search.
    pub fn assign_at(env: &EnvRef, distance: usize, name: &Token, value: Value) -> Result<()> {
        debug!("assign_at distance={} name={}", distance, name.lexeme);

        let target: EnvRef = Environment::ancestor(env, distance)?;
        let mut scope = target.borrow_mut();

        match scope.values.get_mut(&name.lexeme) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }

            None => Err(LoxError::internal(format!(
                "resolved variable '{}' missing at distance {}",
                name.lexeme, distance
            ))),
        }
    }
}

fn undefined(name: &Token) -> LoxError {
    LoxError::runtime(
        RuntimeErrorKind::UndefinedVariable,
        name,
        format!("Undefined variable '{}'.", name.lexeme),
    )
}
