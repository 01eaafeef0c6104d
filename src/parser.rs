/*!
Time & Space Complexity — whole‑file overview
============================================

Definitions
-----------
* **n** = number of tokens (including the sole EOF).
* **m** = number of AST nodes (`m ≤ n`, plus a constant per desugared `for`).

### Time

| Phase / function              | Cost | Rationale                                                             |
|-------------------------------|-----:|-----------------------------------------------------------------------|
| `Parser::parse` main loop     | Θ(n) | Each token is consumed once via `advance()`.                          |
| Individual productions        | O(1) per token | Recursive descent is stream‑oriented; no extra scans.       |
| Error recovery `synchronize()`| O(k) | Discards tokens ≤ next statement boundary ( `k ≤ n`).                 |

**Overall:** **Θ(n)**.

### Logging Policy

| Location                     | Level  | Purpose                                   |
|------------------------------|--------|-------------------------------------------|
| `Parser::new`, `parse`       | `info` | Lifecycle milestones.                     |
| `declaration`, `statement`   | `debug`| High‑level descent into grammar branches. |
| Error paths (`consume`, etc.)| `debug`| Context before returning structured error.|

--------------------------------------------------------------------------------
Grammar (EBNF — condensed)
--------------------------

```text
program        → declaration* EOF ;
declaration    → classDecl | funDecl | varDecl | statement ;
classDecl      → "class" IDENT ( "<" IDENT )? "{" member* "}" ;
member         → "static" "var" IDENT ( "=" expression )? ";"
               | "static"? IDENT "(" parameters? ")" block
               | "static"? IDENT block ;
funDecl        → "fun" IDENT "(" parameters? ")" block ;
varDecl        → "var" IDENT ( "=" expression )? ";" ;
statement      → exprStmt | forStmt | printStmt | whileStmt | breakStmt
               | ifStmt | block | returnStmt ;
exprStmt       → ternaryStmt ";" ;
ternaryStmt    → expression ( "?" ternaryStmt ":" expression )? ;
forStmt        → "for" "(" ( varDecl | exprStmt | ";" )
                 expression? ";" expression? ")" statement ;
whileStmt      → "while" "(" expression ")" statement ;
ifStmt         → "if" "(" expression ")" statement
               ( "else" statement )? ;
breakStmt      → "break" ";" ;
block          → "{" declaration* "}" ;
parameters     → IDENT ( "," IDENT )* ;
expression     → assignment ;
assignment     → ( call "." )? IDENT "=" assignment | logic_or ;
logic_or       → logic_and ( "or" logic_and )* ;
logic_and      → equality  ( "and" equality )* ;
equality       → comparison ( ( "!=" | "==" ) comparison )* ;
comparison     → term ( ( ">" | ">=" | "<" | "<=" ) term )* ;
term           → factor ( ( "-" | "+" ) factor )* ;
factor         → unary ( ( "/" | "*" ) unary )* ;
unary          → ( "!" | "-" ) unary | call ;
call           → primary ( "(" arguments? ")" | "." IDENT )* ;
arguments      → argument ( "," argument )* ;
argument       → "fun" "(" parameters? ")" block | expression ;
primary        → NUMBER | STRING | "true" | "false" | "nil" | "this"
               | IDENT | "(" expression ")" | "super" "." IDENT ;
```

`for` loops and ternary statements never reach the AST: they are desugared
here into `Block`/`While` and `If` nodes respectively.
*/

use std::rc::Rc;

use crate::ast::{Argument, Expr, FunctionDecl, GetterDecl, LiteralValue, Stmt};
use crate::error::{LoxError, Result};
use crate::token::{Token, TokenType};

use log::{debug, info};

/// Maximum number of parameters / call arguments.
const MAX_ARGS: usize = 255;

/// Top‑level parser over an immutable slice of tokens.  The slice must end
/// with an `EOF` token, which the scanner always emits.
pub struct Parser<'a> {
    tokens: &'a [Token],
    current: usize,
    errors: Vec<LoxError>,
}

impl<'a> Parser<'a> {
    /// Construct a new parser.
    pub fn new(tokens: &'a [Token]) -> Self {
        info!("Parser created with {} tokens", tokens.len());

        Self {
            tokens,
            current: 0,
            errors: Vec::new(),
        }
    }

    // ───────────────────────── public API ─────────────────────────

    /// Parse an entire program.  Syntax errors do not stop the parse: the
    /// parser resynchronises at the next statement and every error found is
    /// returned together.
    pub fn parse(mut self) -> std::result::Result<Vec<Stmt>, Vec<LoxError>> {
        info!("Beginning parse phase");

        let mut statements: Vec<Stmt> = Vec::new();

        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        if self.errors.is_empty() {
            info!("Parsed {} statement(s)", statements.len());

            Ok(statements)
        } else {
            info!("Parse finished with {} error(s)", self.errors.len());

            Err(self.errors)
        }
    }

    // ──────────────────────── declaration rules ───────────────────

    fn declaration(&mut self) -> Option<Stmt> {
        debug!("Entering declaration");

        let result = if self.matches(TokenType::CLASS) {
            self.class_declaration()
        } else if self.matches(TokenType::FUN) {
            self.function("function")
        } else if self.matches(TokenType::VAR) {
            self.var_declaration()
        } else {
            self.statement()
        };

        match result {
            Ok(stmt) => Some(stmt),

            Err(e) => {
                debug!("Recovering from parse error: {}", e);

                self.errors.push(e);
                self.synchronize();

                None
            }
        }
    }

    fn class_declaration(&mut self) -> Result<Stmt> {
        let name: Token = self
            .consume(TokenType::IDENTIFIER, "Expected class name")?
            .clone();

        let superclass: Option<Expr> = if self.matches(TokenType::LESS) {
            let parent = self.consume(TokenType::IDENTIFIER, "Expected superclass name")?;

            Some(Expr::variable(parent.clone()))
        } else {
            None
        };

        self.consume(TokenType::LEFT_BRACE, "Expected '{' before class body")?;

        let mut members: Vec<Stmt> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            members.push(self.class_member()?);
        }

        self.consume(TokenType::RIGHT_BRACE, "Expected '}' after class body")?;

        Ok(Stmt::Class {
            name,
            superclass,
            members,
        })
    }

    /// One class body item: method, getter-field or static variable.
    fn class_member(&mut self) -> Result<Stmt> {
        let is_static: bool = self.matches(TokenType::STATIC);

        if is_static && self.matches(TokenType::VAR) {
            let (name, initializer) = self.var_parts()?;

            return Ok(Stmt::StaticVar { name, initializer });
        }

        let name: Token = self
            .consume(TokenType::IDENTIFIER, "Expected member name")?
            .clone();

        if self.matches(TokenType::LEFT_BRACE) {
            debug!("Parsing getter-field '{}'", name.lexeme);

            let body: Vec<Stmt> = self.block()?;

            return Ok(Stmt::GetField(Rc::new(GetterDecl {
                name,
                body,
                is_static,
            })));
        }

        let decl = self.function_rest(name, "method", is_static)?;

        Ok(Stmt::Function(Rc::new(decl)))
    }

    fn function(&mut self, kind: &str) -> Result<Stmt> {
        let name: Token = self
            .consume(TokenType::IDENTIFIER, &format!("Expected {} name", kind))?
            .clone();

        let decl = self.function_rest(name, kind, false)?;

        Ok(Stmt::Function(Rc::new(decl)))
    }

    /// Parameters and body, after the name has been consumed.
    fn function_rest(&mut self, name: Token, kind: &str, is_static: bool) -> Result<FunctionDecl> {
        self.consume(
            TokenType::LEFT_PAREN,
            &format!("Expected '(' after {} name", kind),
        )?;

        let params: Vec<Token> = self.parameters()?;

        self.consume(
            TokenType::LEFT_BRACE,
            &format!("Expected '{{' before {} body", kind),
        )?;
        let body: Vec<Stmt> = self.block()?;

        Ok(FunctionDecl {
            name,
            params,
            body,
            is_static,
        })
    }

    /// `IDENT ( "," IDENT )* ")"`; the opening parenthesis is already consumed.
    fn parameters(&mut self) -> Result<Vec<Token>> {
        let mut parameters: Vec<Token> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if parameters.len() >= MAX_ARGS {
                    let err = LoxError::parse(self.peek(), "Cannot have more than 255 parameters");
                    self.errors.push(err);
                }

                parameters.push(
                    self.consume(TokenType::IDENTIFIER, "Expected parameter name")?
                        .clone(),
                );

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after parameters")?;

        Ok(parameters)
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let (name, initializer) = self.var_parts()?;

        Ok(Stmt::Var { name, initializer })
    }

    fn var_parts(&mut self) -> Result<(Token, Option<Expr>)> {
        let name: Token = self
            .consume(TokenType::IDENTIFIER, "Expected variable name")?
            .clone();

        let initializer: Option<Expr> = if self.matches(TokenType::EQUAL) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenType::SEMICOLON,
            "Expected ';' after variable declaration",
        )?;

        Ok((name, initializer))
    }

    // ───────────────────────── statement rules ────────────────────
    fn statement(&mut self) -> Result<Stmt> {
        debug!("Entering statement");

        if self.matches(TokenType::FOR) {
            self.for_statement()
        } else if self.matches(TokenType::IF) {
            self.if_statement()
        } else if self.matches(TokenType::WHILE) {
            self.while_statement()
        } else if self.matches(TokenType::RETURN) {
            self.return_statement()
        } else if self.matches(TokenType::BREAK) {
            let keyword: Token = self.previous().clone();
            self.consume(TokenType::SEMICOLON, "Expected ';' after 'break'")?;

            Ok(Stmt::Break { keyword })
        } else if self.matches(TokenType::LEFT_BRACE) {
            Ok(Stmt::Block(self.block()?))
        } else if self.matches(TokenType::PRINT) {
            self.print_statement()
        } else {
            self.expression_statement()
        }
    }

    /// `for (init; cond; incr) body` ⇒ `{ init; while (cond) { body; incr; } }`
    fn for_statement(&mut self) -> Result<Stmt> {
        let keyword_line: usize = self.previous().line;

        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'for'")?;
        let initializer: Option<Stmt> = if self.matches(TokenType::SEMICOLON) {
            None
        } else if self.matches(TokenType::VAR) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };
        let condition: Option<Expr> = if !self.check(TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::SEMICOLON, "Expected ';' after loop condition")?;
        let increment: Option<Expr> = if !self.check(TokenType::RIGHT_PAREN) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after for clauses")?;

        let mut body: Stmt = self.statement()?;

        debug!("Desugaring for loop on line {}", keyword_line);

        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
        }

        let condition: Expr = condition.unwrap_or(Expr::Literal(LiteralValue::True));
        body = Stmt::While {
            condition,
            body: Box::new(body),
        };

        if let Some(initializer) = initializer {
            body = Stmt::Block(vec![initializer, body]);
        }

        Ok(body)
    }

    fn print_statement(&mut self) -> Result<Stmt> {
        let value: Expr = self.expression()?;

        self.consume(TokenType::SEMICOLON, "Expected ';' after value")?;

        Ok(Stmt::Print(value))
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        let stmt: Stmt = self.ternary_statement()?;
        self.consume(TokenType::SEMICOLON, "Expected ';' after expression")?;
        Ok(stmt)
    }

    /// `cond ? then : other` ⇒ `if (cond) then; else other;`
    fn ternary_statement(&mut self) -> Result<Stmt> {
        let expr: Expr = self.expression()?;

        if !self.matches(TokenType::QUESTION) {
            return Ok(Stmt::Expression(expr));
        }

        let then_branch: Stmt = self.ternary_statement()?;
        self.consume(TokenType::COLON, "Expected ':' in ternary statement")?;
        let other: Expr = self.expression()?;

        Ok(Stmt::If {
            condition: expr,
            then_branch: Box::new(then_branch),
            else_branch: Some(Box::new(Stmt::Expression(other))),
        })
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'if'")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after condition")?;

        let then_branch: Box<Stmt> = Box::new(self.statement()?);
        let else_branch: Option<Box<Stmt>> = if self.matches(TokenType::ELSE) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'while'")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after condition")?;
        let body: Box<Stmt> = Box::new(self.statement()?);

        Ok(Stmt::While { condition, body })
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();
        let value: Option<Expr> = if !self.check(TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::SEMICOLON, "Expected ';' after return value")?;
        Ok(Stmt::Return { keyword, value })
    }

    fn block(&mut self) -> Result<Vec<Stmt>> {
        let mut statements: Vec<Stmt> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        self.consume(TokenType::RIGHT_BRACE, "Expected '}' after block")?;
        Ok(statements)
    }

    // ─────────────────────── expression rules ─────────────────────
    fn expression(&mut self) -> Result<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr> {
        let expr: Expr = self.logical_or()?;

        if self.matches(TokenType::EQUAL) {
            let equals: Token = self.previous().clone();
            let value: Expr = self.assignment()?;

            return match expr {
                Expr::Variable { name, .. } => Ok(Expr::assign(name, value)),

                Expr::Get { object, name } => Ok(Expr::Set {
                    object,
                    name,
                    value: Box::new(value),
                }),

                _ => {
                    // Reported, but the expression itself is still usable.
                    self.errors
                        .push(LoxError::parse(&equals, "Invalid assignment target"));

                    Ok(value)
                }
            };
        }

        Ok(expr)
    }

    fn logical_or(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.logical_and()?;

        while self.matches(TokenType::OR) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.logical_and()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn logical_and(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.equality()?;

        while self.matches(TokenType::AND) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.equality()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.comparison()?;

        while self.matches(TokenType::BANG_EQUAL) || self.matches(TokenType::EQUAL_EQUAL) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.comparison()?;

            expr = binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.term()?;

        while self.matches(TokenType::GREATER)
            || self.matches(TokenType::GREATER_EQUAL)
            || self.matches(TokenType::LESS)
            || self.matches(TokenType::LESS_EQUAL)
        {
            let operator: Token = self.previous().clone();
            let right: Expr = self.term()?;
            expr = binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.factor()?;

        while self.matches(TokenType::MINUS) || self.matches(TokenType::PLUS) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.factor()?;
            expr = binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.unary()?;

        while self.matches(TokenType::STAR) || self.matches(TokenType::SLASH) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.unary()?;
            expr = binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.matches(TokenType::BANG) || self.matches(TokenType::MINUS) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.unary()?;
            return Ok(Expr::Unary {
                operator,
                right: Box::new(right),
            });
        }

        self.call()
    }

    fn call(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.primary()?;

        loop {
            if self.matches(TokenType::LEFT_PAREN) {
                expr = self.finish_call(expr)?;
            } else if self.matches(TokenType::DOT) {
                let name: Token = self
                    .consume(TokenType::IDENTIFIER, "Expected property name after '.'")?
                    .clone();

                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let mut arguments: Vec<Argument> = Vec::new();
        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if arguments.len() >= MAX_ARGS {
                    let err = LoxError::parse(self.peek(), "Cannot have more than 255 arguments");
                    self.errors.push(err);
                }

                arguments.push(self.argument()?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        let paren: Token = self
            .consume(TokenType::RIGHT_PAREN, "Expected ')' after arguments")?
            .clone();

        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    /// A call argument: an anonymous `fun` literal or a plain expression.
    fn argument(&mut self) -> Result<Argument> {
        if self.matches(TokenType::FUN) {
            let name: Token = Token::synthetic("anonymous", self.previous().line);
            let decl = self.function_rest(name, "anonymous function", false)?;

            return Ok(Argument::Function(Rc::new(decl)));
        }

        Ok(Argument::Expr(self.expression()?))
    }

    fn primary(&mut self) -> Result<Expr> {
        if self.matches(TokenType::FALSE) {
            return Ok(Expr::Literal(LiteralValue::False));
        }
        if self.matches(TokenType::TRUE) {
            return Ok(Expr::Literal(LiteralValue::True));
        }
        if self.matches(TokenType::NIL) {
            return Ok(Expr::Literal(LiteralValue::Nil));
        }

        if let TokenType::NUMBER(n) = self.peek().token_type {
            self.advance();
            return Ok(Expr::Literal(LiteralValue::Number(n)));
        }

        if let TokenType::STRING(ref s) = self.peek().token_type {
            let s: String = s.clone();
            self.advance();
            return Ok(Expr::Literal(LiteralValue::Str(s)));
        }

        if self.matches(TokenType::THIS) {
            return Ok(Expr::this(self.previous().clone()));
        }

        if self.matches(TokenType::SUPER) {
            let keyword: Token = self.previous().clone();
            self.consume(TokenType::DOT, "Expected '.' after 'super'")?;
            let method: Token = self
                .consume(TokenType::IDENTIFIER, "Expected superclass method name")?
                .clone();

            return Ok(Expr::super_method(keyword, method));
        }

        if self.matches(TokenType::IDENTIFIER) {
            return Ok(Expr::variable(self.previous().clone()));
        }

        if self.matches(TokenType::LEFT_PAREN) {
            let expr: Expr = self.expression()?;

            self.consume(TokenType::RIGHT_PAREN, "Expected ')' after expression")?;

            return Ok(Expr::Grouping(Box::new(expr)));
        }

        Err(LoxError::parse(self.peek(), "Expected expression"))
    }

    // ────────────────────── utility helpers ───────────────────────

    #[inline(always)]
    fn matches(&mut self, ttype: TokenType) -> bool {
        if self.check(ttype) {
            self.advance();

            return true;
        }

        false
    }

    #[inline(always)]
    fn consume(&mut self, ttype: TokenType, message: &str) -> Result<&'a Token> {
        if self.check(ttype) {
            return Ok(self.advance());
        }

        debug!("consume failed at '{}': {}", self.peek().lexeme, message);

        Err(LoxError::parse(self.peek(), message))
    }

    #[inline(always)]
    fn check(&self, ttype: TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        self.peek().token_type == ttype
    }

    #[inline(always)]
    fn advance(&mut self) -> &'a Token {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        matches!(self.peek().token_type, TokenType::EOF)
    }

    #[inline(always)]
    fn peek(&self) -> &'a Token {
        &self.tokens[self.current]
    }

    #[inline(always)]
    fn previous(&self) -> &'a Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    /// Discards tokens until it thinks it is at a statement boundary.
    fn synchronize(&mut self) {
        self.advance(); // skip the token that caused the error

        while !self.is_at_end() {
            if matches!(self.previous().token_type, TokenType::SEMICOLON) {
                return;
            }

            match self.peek().token_type {
                TokenType::CLASS
                | TokenType::FUN
                | TokenType::VAR
                | TokenType::FOR
                | TokenType::IF
                | TokenType::WHILE
                | TokenType::PRINT
                | TokenType::RETURN
                | TokenType::BREAK => return,
                _ => {}
            }

            self.advance();
        }
    }
}

fn binary(left: Expr, operator: Token, right: Expr) -> Expr {
    Expr::Binary {
        left: Box::new(left),
        operator,
        right: Box::new(right),
    }
}
