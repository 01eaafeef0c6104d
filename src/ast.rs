//! Abstract syntax tree shared by the parser, the resolver and the interpreter.
//!
//! Nodes are immutable once built.  Every node that names a binding
//! (`Variable`, `Assign`, `This`, `Super`) carries an [`ExprId`] assigned at
//! construction; the resolver keys its distance table by that id, so two
//! syntactically identical references resolve independently.

use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::token::Token;

/// Stable identity of an expression node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(usize);

impl ExprId {
    /// Allocate an id never handed out before in this process.
    pub fn fresh() -> Self {
        static NEXT: AtomicUsize = AtomicUsize::new(0);

        ExprId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A **literal constant** that appears directly in the source code.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Numeric literal ‑ stored as IEEE‑754 `f64`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    /// The boolean constant `true`.
    True,

    /// The boolean constant `false`.
    False,

    /// The `nil` literal.
    Nil,
}

/// **Abstract‑Syntax‑Tree node** representing every kind of *expression*.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal constant: number, string, `true`, `false`, or `nil`.
    Literal(LiteralValue),

    /// Prefix unary operator expression
    /// *Example:* `!isReady` or `-42`
    Unary { operator: Token, right: Box<Expr> },

    /// Infix binary operator expression
    /// *Example:* `a + b`, `x <= y`
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Parenthesised sub‑expression: `"(" expression ")"`.
    Grouping(Box<Expr>),

    /// Variable access.
    Variable { id: ExprId, name: Token },

    /// Assignment expression: `identifier "=" expression`
    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },

    /// Short‑circuiting logical operators `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token, // `AND` or `OR`
        right: Box<Expr>,
    },

    /// Function‑, method‑ or constructor‑call expression
    Call {
        callee: Box<Expr>,
        /// The closing `)` token ‑ retained for error reporting.
        paren: Token,
        arguments: Vec<Argument>,
    },

    /// object.property
    Get { object: Box<Expr>, name: Token },

    /// object.property = value
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    /// The `this` keyword inside a class member.
    This { id: ExprId, keyword: Token },

    /// `super.method` inside a subclass member.
    Super {
        id: ExprId,
        keyword: Token,
        method: Token,
    },
}

impl Expr {
    pub fn variable(name: Token) -> Self {
        Expr::Variable {
            id: ExprId::fresh(),
            name,
        }
    }

    pub fn assign(name: Token, value: Expr) -> Self {
        Expr::Assign {
            id: ExprId::fresh(),
            name,
            value: Box::new(value),
        }
    }

    pub fn this(keyword: Token) -> Self {
        Expr::This {
            id: ExprId::fresh(),
            keyword,
        }
    }

    pub fn super_method(keyword: Token, method: Token) -> Self {
        Expr::Super {
            id: ExprId::fresh(),
            keyword,
            method,
        }
    }
}

/// One call argument.  A bare `fun (…) { … }` literal is kept as a
/// declaration and turned into a closure when the call evaluates it.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Expr(Expr),
    Function(Rc<FunctionDecl>),
}

/// Named function, method, or anonymous function literal.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Token,

    /// Parameter name tokens (arity ≤ 255).
    pub params: Vec<Token>,

    /// Body executed when the function is called.
    pub body: Vec<Stmt>,

    /// `static` class member.
    pub is_static: bool,
}

/// Getter-field member: `name { … }`, auto-invoked on property access.
#[derive(Debug, Clone, PartialEq)]
pub struct GetterDecl {
    pub name: Token,
    pub body: Vec<Stmt>,
    pub is_static: bool,
}

/// **Abstract‑Syntax‑Tree node** for *statements*.  A program is a sequence
/// of these nodes returned by [`Parser::parse`](crate::parser::Parser::parse).
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Stand‑alone expression terminated by a semicolon.
    Expression(Expr),

    /// `print` statement used for output.
    Print(Expr),

    /// Variable declaration: `"var" IDENT ("=" initializer)? ";"`.
    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    /// `static var` inside a class body.
    StaticVar {
        name: Token,
        initializer: Option<Expr>,
    },

    /// Braced scope containing zero or more declarations/statements.
    Block(Vec<Stmt>),

    /// `if` / `else` conditional.  Also the target of the ternary statement.
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    /// `while` loop.  `for` loops are desugared into this.
    While { condition: Expr, body: Box<Stmt> },

    /// `break` out of the nearest enclosing loop.
    Break { keyword: Token },

    /// Function declaration ‑ becomes a first‑class callable value.
    Function(Rc<FunctionDecl>),

    /// `return` statement inside a function body.
    Return {
        /// The `return` keyword token (for error locations).
        keyword: Token,

        /// Optional expression to return.
        /// Absent ⇒ `nil` is returned.
        value: Option<Expr>,
    },

    /// Class declaration.  `members` holds `Function`, `GetField` and
    /// `StaticVar` statements in source order.
    Class {
        name: Token,
        superclass: Option<Expr>,
        members: Vec<Stmt>,
    },

    /// Getter-field declaration (class member).
    GetField(Rc<GetterDecl>),
}
