//! One interpreter plus the pipeline that feeds it.
//!
//! A [`Session`] scans, parses and resolves a piece of source text and, if
//! every static check passed, executes it.  Globals, classes and the
//! resolution table persist across calls to [`Session::run`], which is what
//! the interactive prompt relies on.

use std::io::Write;

use log::{debug, info};

use crate::error::{LoxError, SessionError};
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;
use crate::token::Token;

pub struct Session<W: Write> {
    interpreter: Interpreter<W>,
}

impl<W: Write> Session<W> {
    pub fn new(out: W) -> Self {
        info!("Session created");

        Self {
            interpreter: Interpreter::new(out),
        }
    }

    /// Run `source` to completion.
    pub fn run(&mut self, source: &str) -> Result<(), SessionError> {
        let mut errors: Vec<LoxError> = Vec::new();
        let mut tokens: Vec<Token> = Vec::new();

        for item in Scanner::new(source) {
            match item {
                Ok(token) => tokens.push(token),
                Err(e) => errors.push(e),
            }
        }

        debug!("Scanned {} token(s)", tokens.len());

        let statements = match Parser::new(&tokens).parse() {
            Ok(statements) => statements,
            Err(parse_errors) => {
                errors.extend(parse_errors);
                Vec::new()
            }
        };

        if !errors.is_empty() {
            info!("Run aborted with {} syntax error(s)", errors.len());
            return Err(SessionError::Static(errors));
        }

        let locals = Resolver::new()
            .resolve(&statements)
            .map_err(SessionError::Static)?;

        self.interpreter.add_locals(locals);
        self.interpreter
            .interpret(&statements)
            .map_err(SessionError::Runtime)
    }

    pub fn output(&self) -> &W {
        self.interpreter.output()
    }

    pub fn into_output(self) -> W {
        self.interpreter.into_output()
    }
}
