use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::class::{LoxClass, LoxInstance};
use crate::function::{GetterField, LoxFunction};

/// A runtime value.  Scalars are stored inline; callables, classes and
/// instances are shared by reference and compare by identity.
#[derive(Debug, Clone)]
pub enum Value {
    NativeFunction {
        name: &'static str,
        arity: usize,
        func: fn(&[Value]) -> Result<Value, String>,
    },
    Function(Rc<LoxFunction>),
    GetterField(Rc<GetterField>),
    Class(Rc<LoxClass>),
    Instance(Rc<RefCell<LoxInstance>>),
    Number(f64),
    String(String),
    Bool(bool),
    Nil,
}

impl Value {
    /// Number of arguments a call expects, or `None` if the value cannot be
    /// called at all.
    pub fn arity(&self) -> Option<usize> {
        match self {
            Value::NativeFunction { arity, .. } => Some(*arity),
            Value::Function(function) => Some(function.arity()),
            Value::GetterField(_) => Some(0),
            Value::Class(class) => Some(class.arity()),
            _ => None,
        }
    }

    /// `nil` and `false` are falsey; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Language-level `==`.  Never fails; values of different kinds are
    /// simply unequal.
    pub fn is_equal(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::NativeFunction { name: a, .. }, Value::NativeFunction { name: b, .. }) => {
                a == b
            }
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::GetterField(a), Value::GetterField(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::NativeFunction { .. } => write!(f, "<native fn>"),

            Value::Function(function) => write!(f, "<fn {}>", function.name()),

            Value::GetterField(getter) => write!(f, "<getter {}>", getter.name()),

            Value::Class(class) => write!(f, "{}", class.name()),

            Value::Instance(instance) => {
                write!(f, "{} instance", instance.borrow().class().name())
            }

            Value::Number(n) if n.is_infinite() => {
                write!(f, "{}Infinity", if n.is_sign_negative() { "-" } else { "" })
            }

            Value::Number(n) => {
                if n.fract() == 0.0 {
                    write!(f, "{:.0}", n)
                } else {
                    write!(f, "{}", n)
                }
            }

            Value::String(s) => write!(f, "{}", s),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Nil => write!(f, "nil"),
        }
    }
}
