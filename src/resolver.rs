//! Static resolver pass for the **Rox** interpreter.
//!
//! This resolver does three things in one AST walk:
//! 1. Build lexical scopes (stack of `HashMap<String,bool>` tracking declared/defined).
//! 2. Report static errors (redeclaration, forward‑read in initializer, misplaced
//!    `return`/`break`/`this`/`super`, …).  Errors are collected, not fatal: the
//!    walk continues so one pass reports all of them.
//! 3. Record, for *each* binding reference, the number of scopes between the
//!    reference and its declaration.  References that resolve nowhere are
//!    globals and get no entry.
//!
//! There is one scope stack, shaped exactly like the runtime scope chain.  A
//! class scope stands for `this` when an instance member runs and for the
//! class's static scope when a static member runs, so it carries one name set
//! per namespace and the member being resolved selects which one is visible.

use crate::ast::{Argument, Expr, ExprId, FunctionDecl, GetterDecl, Stmt};
use crate::class::INIT;
use crate::error::LoxError;
use crate::token::Token;
use log::{debug, info};
use std::collections::HashMap;

/// Resolution table: expression id → scope distance.
pub type Locals = HashMap<ExprId, usize>;

/// What kind of callable body are we in?  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    StaticMethod,
    Initializer,
}

/// Are we inside a getter-field body?
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FieldType {
    None,
    Field,
    StaticField,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

/// Which name set of a class scope is visible.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
enum Namespace {
    #[default]
    Regular,
    Static,
}

type Names = HashMap<String, bool>; // false=declared, true=defined

#[derive(Debug, Default)]
struct Scope {
    names: Names,
    /// Static member names; only class scopes have them.
    statics: Option<Names>,
    namespace: Namespace,
}

impl Scope {
    fn class() -> Self {
        Scope {
            statics: Some(HashMap::new()),
            ..Scope::default()
        }
    }

    fn is_static_side(&self) -> bool {
        self.statics.is_some() && self.namespace == Namespace::Static
    }

    fn visible(&self) -> &Names {
        match (&self.statics, self.namespace) {
            (Some(statics), Namespace::Static) => statics,
            _ => &self.names,
        }
    }

    fn visible_mut(&mut self) -> &mut Names {
        match (&mut self.statics, self.namespace) {
            (Some(statics), Namespace::Static) => statics,
            _ => &mut self.names,
        }
    }
}

pub struct Resolver {
    scopes: Vec<Scope>,
    locals: Locals,
    errors: Vec<LoxError>,
    current_function: FunctionType,
    current_field: FieldType,
    current_class: ClassType,
    in_loop: bool,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    pub fn new() -> Self {
        info!("Resolver instantiated");

        Resolver {
            scopes: Vec::new(),
            locals: HashMap::new(),
            errors: Vec::new(),
            current_function: FunctionType::None,
            current_field: FieldType::None,
            current_class: ClassType::None,
            in_loop: false,
        }
    }

    /// Walk all top‑level statements.  Returns the resolution table, or every
    /// static error found.
    pub fn resolve(mut self, statements: &[Stmt]) -> Result<Locals, Vec<LoxError>> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.resolve_stmt(stmt);
        }

        if self.errors.is_empty() {
            info!("Resolved {} local reference(s)", self.locals.len());
            Ok(self.locals)
        } else {
            info!("Resolve pass found {} error(s)", self.errors.len());
            Err(self.errors)
        }
    }

    fn error(&mut self, token: &Token, message: &str) {
        self.errors.push(LoxError::resolve(token, message));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        debug!("Resolving stmt: {:?}", stmt);

        match stmt {
            Stmt::Class {
                name,
                superclass,
                members,
            } => self.resolve_class(name, superclass.as_ref(), members),

            Stmt::Block(statements) => {
                self.begin_scope();
                for s in statements {
                    self.resolve_stmt(s);
                }
                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                self.declare(name);
                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }
                self.define(name);
            }

            Stmt::StaticVar { name, initializer } => {
                self.in_namespace(Namespace::Static, |r| {
                    r.declare(name);
                    if let Some(expr) = initializer {
                        r.resolve_expr(expr);
                    }
                    r.define(name);
                });
            }

            Stmt::Function(declaration) => {
                if self.current_field == FieldType::StaticField {
                    self.error(
                        &declaration.name,
                        "Can't declare a function inside a static getter-field.",
                    );
                }

                // The name is visible *inside* its own body.
                self.declare(&declaration.name);
                self.define(&declaration.name);
                self.resolve_function(declaration, FunctionType::Function);
            }

            // Only meaningful as a class member; handled in `resolve_class`.
            Stmt::GetField(_) => {}

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);

                let enclosing_loop = std::mem::replace(&mut self.in_loop, true);
                self.resolve_stmt(body);
                self.in_loop = enclosing_loop;
            }

            Stmt::Break { keyword } => {
                if !self.in_loop {
                    self.error(keyword, "Can't use 'break' outside of a loop.");
                }
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None
                    && self.current_field == FieldType::None
                {
                    self.error(keyword, "Can't return from top-level code.");
                }

                if let Some(expr) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.error(keyword, "Can't return a value from an initializer.");
                    }
                    self.resolve_expr(expr);
                }
            }
        }
    }

    fn resolve_class(&mut self, name: &Token, superclass: Option<&Expr>, members: &[Stmt]) {
        let enclosing_class = std::mem::replace(&mut self.current_class, ClassType::Class);

        self.declare(name);
        self.define(name);

        if let Some(expr) = superclass {
            if let Expr::Variable { name: parent, .. } = expr {
                if parent.lexeme == name.lexeme {
                    self.error(parent, "A class can't inherit from itself.");
                }
            }

            self.current_class = ClassType::Subclass;
            self.resolve_expr(expr);

            self.begin_scope();
            self.define_keyword("super");
        }

        self.scopes.push(Scope::class());
        self.define_keyword("this");

        for member in members {
            self.resolve_member(member);
        }

        self.end_scope();
        if superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }

    fn resolve_member(&mut self, member: &Stmt) {
        match member {
            Stmt::Function(declaration) if declaration.is_static => {
                self.in_namespace(Namespace::Static, |r| {
                    r.declare(&declaration.name);
                    r.define(&declaration.name);
                    r.resolve_function(declaration, FunctionType::StaticMethod);
                });
            }

            Stmt::Function(declaration) => {
                let kind = if declaration.name.lexeme == INIT {
                    FunctionType::Initializer
                } else {
                    FunctionType::Method
                };

                self.in_namespace(Namespace::Regular, |r| {
                    r.resolve_function(declaration, kind)
                });
            }

            Stmt::GetField(declaration) if declaration.is_static => {
                self.in_namespace(Namespace::Static, |r| {
                    r.declare(&declaration.name);
                    r.define(&declaration.name);
                    r.resolve_getter(declaration, FieldType::StaticField);
                });
            }

            Stmt::GetField(declaration) => {
                self.in_namespace(Namespace::Regular, |r| {
                    r.resolve_getter(declaration, FieldType::Field)
                });
            }

            other => self.resolve_stmt(other),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => self.resolve_expr(inner),

            Expr::Unary { right, .. } => self.resolve_expr(right),

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Variable { id, name } => {
                // Cannot read in own initializer
                let uninitialised = self
                    .scopes
                    .last()
                    .is_some_and(|scope| scope.visible().get(&name.lexeme) == Some(&false));

                if uninitialised {
                    self.error(name, "Can't read local variable in its own initializer.");
                }

                self.resolve_local(*id, name);
            }

            Expr::Assign { id, name, value } => {
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);

                for arg in arguments {
                    match arg {
                        Argument::Expr(expr) => self.resolve_expr(expr),
                        Argument::Function(declaration) => {
                            self.resolve_function(declaration, FunctionType::Function)
                        }
                    }
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object),

            Expr::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }

            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    self.error(keyword, "Can't use 'this' outside of a class.");
                    return;
                }

                self.resolve_local(*id, keyword);
            }

            Expr::Super { id, keyword, .. } => {
                match self.current_class {
                    ClassType::None => {
                        self.error(keyword, "Can't use 'super' outside of a class.");
                    }
                    ClassType::Class => {
                        self.error(keyword, "Can't use 'super' in a class with no superclass.");
                    }
                    ClassType::Subclass => {}
                }

                self.resolve_local(*id, keyword);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function’s parameters + body.
    fn resolve_function(&mut self, declaration: &FunctionDecl, kind: FunctionType) {
        let enclosing_function = std::mem::replace(&mut self.current_function, kind);
        let enclosing_field = std::mem::replace(&mut self.current_field, FieldType::None);
        let enclosing_loop = std::mem::replace(&mut self.in_loop, false);

        self.begin_scope();
        for param in &declaration.params {
            self.declare(param);
            self.define(param);
        }
        for stmt in &declaration.body {
            self.resolve_stmt(stmt);
        }
        self.end_scope();

        self.current_function = enclosing_function;
        self.current_field = enclosing_field;
        self.in_loop = enclosing_loop;
    }

    fn resolve_getter(&mut self, declaration: &GetterDecl, kind: FieldType) {
        let enclosing_field = std::mem::replace(&mut self.current_field, kind);
        let enclosing_function = std::mem::replace(&mut self.current_function, FunctionType::None);
        let enclosing_loop = std::mem::replace(&mut self.in_loop, false);

        self.begin_scope();
        for stmt in &declaration.body {
            self.resolve_stmt(stmt);
        }
        self.end_scope();

        self.current_field = enclosing_field;
        self.current_function = enclosing_function;
        self.in_loop = enclosing_loop;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    /// Run `f` with the innermost class scope showing `namespace`.
    fn in_namespace<F: FnOnce(&mut Self)>(&mut self, namespace: Namespace, f: F) {
        let enclosing = self
            .scopes
            .last_mut()
            .map(|scope| std::mem::replace(&mut scope.namespace, namespace));

        f(self);

        if let (Some(namespace), Some(scope)) = (enclosing, self.scopes.last_mut()) {
            scope.namespace = namespace;
        }
    }

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn define_keyword(&mut self, keyword: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.names.insert(keyword.to_string(), true);
        }
    }

    fn declare(&mut self, name: &Token) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };

        let static_side = scope.is_static_side();
        let duplicate = scope
            .visible_mut()
            .insert(name.lexeme.clone(), false)
            .is_some();

        if duplicate {
            let message = if static_side {
                "Already a static member with this name in this class."
            } else {
                "Already a variable with this name in this scope."
            };
            self.error(name, message);
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.visible_mut().insert(name.lexeme.clone(), true);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this reference as a local at depth `d`, or leave it out of the
    /// table (global) if no visible name set declares it.
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        let depth = self
            .scopes
            .iter()
            .rev()
            .position(|scope| scope.visible().contains_key(&name.lexeme));

        match depth {
            Some(depth) => {
                debug!("Resolved '{}' at depth {}", name.lexeme, depth);
                self.locals.insert(id, depth);
            }
            None => debug!("Resolved '{}' as global", name.lexeme),
        }
    }
}
