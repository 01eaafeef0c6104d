use crate::ast::{Argument, Expr, FunctionDecl, LiteralValue, Stmt};

/// Converts an expression or statement to the Crafting‑Interpreters
/// parenthesised prefix form.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr) -> String {
        match expr {
            // ── literals ────────────────────────────────────────────────
            Expr::Literal(lit) => match lit {
                LiteralValue::True => "true".into(),

                LiteralValue::False => "false".into(),

                LiteralValue::Nil => "nil".into(),

                LiteralValue::Str(s) => s.clone(),

                LiteralValue::Number(n) => {
                    if n.fract() == 0.0 {
                        // 3.0 → 3.0 (keeps the literal recognisable as a number)
                        format!("{:.1}", n)
                    } else {
                        n.to_string()
                    }
                }
            },

            // ── grouping ────────────────────────────────────────────────
            Expr::Grouping(inner) => format!("(group {})", Self::print(inner)),

            // ── unary operator ──────────────────────────────────────────
            Expr::Unary { operator, right } => {
                format!("({} {})", operator.lexeme, Self::print(right))
            }

            // ── binary / logical operator ───────────────────────────────
            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                operator.lexeme,
                Self::print(left),
                Self::print(right)
            ),

            // ── bindings ────────────────────────────────────────────────
            Expr::Variable { name, .. } => name.lexeme.clone(),

            Expr::Assign { name, value, .. } => {
                format!("(= {} {})", name.lexeme, Self::print(value))
            }

            Expr::This { .. } => "this".into(),

            Expr::Super { method, .. } => format!("(super {})", method.lexeme),

            // ── calls and properties ────────────────────────────────────
            Expr::Call {
                callee, arguments, ..
            } => {
                let mut s = format!("(call {}", Self::print(callee));
                for arg in arguments {
                    s.push(' ');
                    match arg {
                        Argument::Expr(expr) => s.push_str(&Self::print(expr)),
                        Argument::Function(declaration) => {
                            s.push_str(&Self::print_function("fun", declaration))
                        }
                    }
                }
                s.push(')');
                s
            }

            Expr::Get { object, name } => format!("(. {} {})", Self::print(object), name.lexeme),

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(= (. {} {}) {})",
                Self::print(object),
                name.lexeme,
                Self::print(value)
            ),
        }
    }

    pub fn print_stmt(stmt: &Stmt) -> String {
        match stmt {
            Stmt::Expression(expr) => format!("(; {})", Self::print(expr)),

            Stmt::Print(expr) => format!("(print {})", Self::print(expr)),

            Stmt::Var { name, initializer } => match initializer {
                Some(expr) => format!("(var {} {})", name.lexeme, Self::print(expr)),
                None => format!("(var {})", name.lexeme),
            },

            Stmt::StaticVar { name, initializer } => match initializer {
                Some(expr) => format!("(static var {} {})", name.lexeme, Self::print(expr)),
                None => format!("(static var {})", name.lexeme),
            },

            Stmt::Block(statements) => Self::wrap("block".into(), statements),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(else_branch) => format!(
                    "(if {} {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch),
                    Self::print_stmt(else_branch)
                ),
                None => format!(
                    "(if {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch)
                ),
            },

            Stmt::While { condition, body } => format!(
                "(while {} {})",
                Self::print(condition),
                Self::print_stmt(body)
            ),

            Stmt::Break { .. } => "(break)".into(),

            Stmt::Function(declaration) => Self::print_function("fun", declaration),

            Stmt::Return { value, .. } => match value {
                Some(expr) => format!("(return {})", Self::print(expr)),
                None => "(return)".into(),
            },

            Stmt::Class {
                name,
                superclass,
                members,
            } => {
                let head = match superclass {
                    Some(parent) => format!("class {} < {}", name.lexeme, Self::print(parent)),
                    None => format!("class {}", name.lexeme),
                };
                Self::wrap(head, members)
            }

            Stmt::GetField(declaration) => {
                let keyword = if declaration.is_static {
                    "static getter"
                } else {
                    "getter"
                };
                Self::wrap(
                    format!("{} {}", keyword, declaration.name.lexeme),
                    &declaration.body,
                )
            }
        }
    }

    fn print_function(keyword: &str, declaration: &FunctionDecl) -> String {
        let params: Vec<&str> = declaration
            .params
            .iter()
            .map(|param| param.lexeme.as_str())
            .collect();

        let keyword = if declaration.is_static {
            format!("static {}", keyword)
        } else {
            keyword.to_string()
        };

        Self::wrap(
            format!(
                "{} {} ({})",
                keyword,
                declaration.name.lexeme,
                params.join(" ")
            ),
            &declaration.body,
        )
    }

    fn wrap(head: String, body: &[Stmt]) -> String {
        let mut s = format!("({}", head);
        for stmt in body {
            s.push(' ');
            s.push_str(&Self::print_stmt(stmt));
        }
        s.push(')');
        s
    }
}
