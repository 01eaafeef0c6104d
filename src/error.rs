//! Centralised error hierarchy for the **Rox interpreter**.
//!
//! All subsystems (scanner, parser, resolver, runtime, CLI) convert their
//! internal failure modes into one of the variants defined here.  Static
//! errors (lex, parse, resolve) are collected and reported together; a runtime
//! error aborts the current `interpret` call and is handed to the driver as is.
//!
//! The module **does not** print diagnostics itself

use std::io;
use thiserror::Error;

use log::info;

use crate::token::{Token, TokenType};

/// Category of a runtime failure.  Lets callers (and tests) branch on *what*
/// went wrong without parsing the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    /// Operand(s) of the wrong type for an operator.
    TypeMismatch,

    /// Call with the wrong number of arguments.
    ArityMismatch,

    /// Call target is not a function, getter-field or class.
    NotCallable,

    /// Property access on `nil` or on a value that has no properties.
    InvalidPropertyTarget,

    /// Property name not found on the instance or class.
    UndefinedProperty,

    /// Static member through an instance, or instance member through a class.
    StaticAccess,

    /// `/` with a zero divisor.
    DivisionByZero,

    /// Read or assignment of a name bound nowhere.
    UndefinedVariable,

    /// `class A < B` where `B` is not a class.
    InvalidSuperclass,

    /// Failure reported by a native function.
    Native,
}

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.
    #[error("[line {line}] Error{location}: {message}")]
    Parse {
        message: String,
        line: usize,
        location: String,
    },

    /// Static‑analysis or resolution failure (e.g. early‑binding errors).
    #[error("[line {line}] Error{location}: {message}")]
    Resolve {
        message: String,
        line: usize,
        location: String,
    },

    /// Runtime evaluation error, tied to the offending token's line.
    #[error("{message}\n[line {line}]")]
    Runtime {
        kind: RuntimeErrorKind,
        message: String,
        line: usize,
    },

    /// A resolved binding that does not exist at runtime.  Only reachable if
    /// the resolver and the interpreter disagree about scope layout.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", token.line, message);

        LoxError::Parse {
            message,
            line: token.line,
            location: location(token),
        }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Resolve error: line={}, msg={}", token.line, message);

        LoxError::Resolve {
            message,
            line: token.line,
            location: location(token),
        }
    }

    /// Helper constructor for the **interpreter**.
    pub fn runtime<S: Into<String>>(kind: RuntimeErrorKind, token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!(
            "Creating Runtime error: kind={:?}, line={}, msg={}",
            kind, token.line, message
        );

        LoxError::Runtime {
            kind,
            message,
            line: token.line,
        }
    }

    pub fn internal<S: Into<String>>(msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Internal error: {}", message);

        LoxError::Internal(message)
    }

    /// The runtime category, if this is a runtime error.
    pub fn runtime_kind(&self) -> Option<RuntimeErrorKind> {
        match self {
            LoxError::Runtime { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// `true` for errors that must stop a program before it runs.
    pub fn is_static(&self) -> bool {
        matches!(
            self,
            LoxError::Lex { .. } | LoxError::Parse { .. } | LoxError::Resolve { .. }
        )
    }
}

fn location(token: &Token) -> String {
    if token.token_type == TokenType::EOF {
        " at end".to_string()
    } else {
        format!(" at '{}'", token.lexeme)
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;

/// Outcome of one failed [`Session::run`](crate::session::Session::run).
#[derive(Debug, Error)]
pub enum SessionError {
    /// Lexical, syntax or resolution errors.  Nothing was executed.
    #[error("{} static error(s)", .0.len())]
    Static(Vec<LoxError>),

    /// Execution stopped at the first runtime error.
    #[error(transparent)]
    Runtime(LoxError),
}

impl SessionError {
    /// Process exit status conventionally used for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            SessionError::Static(_) => 65,
            SessionError::Runtime(_) => 70,
        }
    }

    /// Every underlying error, in report order.
    pub fn errors(&self) -> Vec<&LoxError> {
        match self {
            SessionError::Static(errors) => errors.iter().collect(),
            SessionError::Runtime(error) => vec![error],
        }
    }
}
