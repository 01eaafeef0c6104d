//! User-defined callables: functions, methods and getter-fields.
//!
//! Both kinds capture the scope they were declared in.  Binding to a
//! receiver wraps that scope in a fresh one holding `this`; binding a
//! static member simply re-targets the closure at the class's static scope.

use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::ast::{FunctionDecl, GetterDecl};
use crate::environment::{EnvRef, Environment};
use crate::value::Value;

pub struct LoxFunction {
    pub declaration: Rc<FunctionDecl>,
    pub closure: EnvRef,

    /// Calls return the bound `this` regardless of the body.
    pub is_initializer: bool,
}

impl LoxFunction {
    pub fn new(declaration: Rc<FunctionDecl>, closure: EnvRef, is_initializer: bool) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    pub fn is_static(&self) -> bool {
        self.declaration.is_static
    }

    /// Copy of this method whose closure binds `this` to `instance`.
    pub fn bind(&self, instance: Value) -> LoxFunction {
        debug!("Binding method '{}' to {}", self.name(), instance);

        let scope: EnvRef = Environment::child_of(&self.closure);
        scope.borrow_mut().define("this", instance);

        LoxFunction::new(Rc::clone(&self.declaration), scope, self.is_initializer)
    }

    /// Copy of this static method closing over the class's static scope.
    pub fn bind_static(&self, statics: &EnvRef) -> LoxFunction {
        LoxFunction::new(Rc::clone(&self.declaration), Rc::clone(statics), false)
    }
}

impl fmt::Debug for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxFunction")
            .field("name", &self.name())
            .field("arity", &self.arity())
            .field("is_static", &self.is_static())
            .field("is_initializer", &self.is_initializer)
            .finish()
    }
}

/// A parameterless member run on every property read.
pub struct GetterField {
    pub declaration: Rc<GetterDecl>,
    pub closure: EnvRef,
}

impl GetterField {
    pub fn new(declaration: Rc<GetterDecl>, closure: EnvRef) -> Self {
        Self {
            declaration,
            closure,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    pub fn is_static(&self) -> bool {
        self.declaration.is_static
    }

    pub fn bind(&self, instance: Value) -> GetterField {
        debug!("Binding getter '{}' to {}", self.name(), instance);

        let scope: EnvRef = Environment::child_of(&self.closure);
        scope.borrow_mut().define("this", instance);

        GetterField::new(Rc::clone(&self.declaration), scope)
    }

    pub fn bind_static(&self, statics: &EnvRef) -> GetterField {
        GetterField::new(Rc::clone(&self.declaration), Rc::clone(statics))
    }
}

impl fmt::Debug for GetterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GetterField")
            .field("name", &self.name())
            .field("is_static", &self.is_static())
            .finish()
    }
}
