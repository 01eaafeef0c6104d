//! Tree-walking evaluator.
//!
//! Statements run against a chain of shared scopes; reads and writes of
//! resolved names jump straight to the recorded depth, everything else is a
//! global.  Non-local control flow (`return`, `break`) travels back up as a
//! [`Flow`] value rather than as an error, so every block restores its scope
//! on the way out.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use chrono::Utc;
use log::{debug, info};

use crate::ast::{Argument, Expr, ExprId, LiteralValue, Stmt};
use crate::class::{LoxClass, LoxInstance, Member, INIT};
use crate::environment::{EnvRef, Environment};
use crate::error::{LoxError, Result, RuntimeErrorKind};
use crate::function::{GetterField, LoxFunction};
use crate::resolver::Locals;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// How a statement finished.
#[derive(Debug, Clone)]
pub enum Flow {
    Normal,
    Return(Value),
    Break,
}

pub struct Interpreter<W: Write> {
    globals: EnvRef,
    environment: EnvRef,
    locals: Locals,
    out: W,

    /// Number of `if` branches between the current statement and the nearest
    /// enclosing call.  Expression statements only echo at depth zero.
    branch_depth: usize,
}

impl<W: Write> Interpreter<W> {
    /// Creates a new Interpreter writing to `out` and defines native
    /// functions such as `clock`.
    pub fn new(out: W) -> Self {
        info!("Initializing Interpreter");

        let globals: EnvRef = Rc::new(RefCell::new(Environment::new()));

        debug!("Defining native function 'clock'");

        globals.borrow_mut().define(
            "clock",
            Value::NativeFunction {
                name: "clock",
                arity: 0,
                func: |_args: &[Value]| {
                    let timestamp: f64 = Utc::now().timestamp_millis() as f64 / 1000.0;
                    debug!("Native function 'clock' returned: {}", timestamp);
                    Ok(Value::Number(timestamp))
                },
            },
        );

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            out,
            branch_depth: 0,
        }
    }

    /// Merge a resolution table produced for the next program.
    pub fn add_locals(&mut self, locals: Locals) {
        debug!("Adding {} resolved local(s)", locals.len());
        self.locals.extend(locals);
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Interprets a list of statements (a "program").  The first runtime
    /// error stops the run; effects of earlier statements are kept.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            if let Err(err) = self.execute(stmt) {
                self.environment = Rc::clone(&self.globals);
                self.branch_depth = 0;
                return Err(err);
            }
        }

        self.out.flush()?;
        info!("Interpretation completed successfully");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                let value = self.evaluate(expr)?;

                if self.branch_depth == 0 && echoes(expr) {
                    writeln!(self.out, "{}", value)?;
                }

                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.out, "{}", value)?;
                debug!("Printed value: {}", value);
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } | Stmt::StaticVar { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Defining variable '{}' = {}", name.lexeme, value);
                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let scope: EnvRef = Environment::child_of(&self.environment);
                self.execute_block(statements, scope)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let branch: Option<&Stmt> = if self.evaluate(condition)?.is_truthy() {
                    Some(then_branch.as_ref())
                } else {
                    else_branch.as_deref()
                };

                match branch {
                    Some(stmt) => {
                        self.branch_depth += 1;
                        let flow = self.execute(stmt);
                        self.branch_depth -= 1;
                        flow
                    }
                    None => Ok(Flow::Normal),
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Flow::Normal => {}
                        Flow::Break => break,
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }

                Ok(Flow::Normal)
            }

            Stmt::Break { .. } => Ok(Flow::Break),

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);

                let function = LoxFunction::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    false,
                );

                self.environment
                    .borrow_mut()
                    .define(&declaration.name.lexeme, Value::Function(Rc::new(function)));
                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                Ok(Flow::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                members,
            } => self.execute_class(name, superclass.as_ref(), members),

            Stmt::GetField(declaration) => Err(LoxError::internal(format!(
                "getter-field '{}' outside a class body",
                declaration.name.lexeme
            ))),
        }
    }

    /// Run `statements` with `scope` as the innermost scope, restoring the
    /// previous one however the block exits.
    pub fn execute_block(&mut self, statements: &[Stmt], scope: EnvRef) -> Result<Flow> {
        let previous: EnvRef = std::mem::replace(&mut self.environment, scope);
        let result = self.run_statements(statements);
        self.environment = previous;
        result
    }

    fn run_statements(&mut self, statements: &[Stmt]) -> Result<Flow> {
        for stmt in statements {
            match self.execute(stmt)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }

        Ok(Flow::Normal)
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        members: &[Stmt],
    ) -> Result<Flow> {
        debug!("Declaring class '{}'", name.lexeme);

        let parent: Option<Rc<LoxClass>> = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                _ => {
                    let token: &Token = match expr {
                        Expr::Variable { name, .. } => name,
                        _ => name,
                    };

                    return Err(LoxError::runtime(
                        RuntimeErrorKind::InvalidSuperclass,
                        token,
                        "Superclass must be a class.",
                    ));
                }
            },
            None => None,
        };

        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Nil);

        let outer: EnvRef = Rc::clone(&self.environment);

        if let Some(parent) = &parent {
            let scope: EnvRef = Environment::child_of(&outer);
            scope
                .borrow_mut()
                .define("super", Value::Class(Rc::clone(parent)));
            self.environment = scope;
        }

        let built = self.build_class(name, parent, members);
        self.environment = outer;

        let class: Rc<LoxClass> = built?;
        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Class(class));

        info!("Class '{}' defined", name.lexeme);
        Ok(Flow::Normal)
    }

    fn build_class(
        &mut self,
        name: &Token,
        superclass: Option<Rc<LoxClass>>,
        members: &[Stmt],
    ) -> Result<Rc<LoxClass>> {
        // Static members close over this scope; the class keeps no handle to it.
        let statics: EnvRef = Environment::child_of(&self.environment);
        let mut methods: HashMap<String, Rc<LoxFunction>> = HashMap::new();
        let mut getters: HashMap<String, Rc<GetterField>> = HashMap::new();

        for member in members {
            match member {
                Stmt::Function(declaration) => {
                    let method_name: &str = &declaration.name.lexeme;
                    let method = LoxFunction::new(
                        Rc::clone(declaration),
                        Rc::clone(&self.environment),
                        !declaration.is_static && method_name == INIT,
                    );

                    let method: Rc<LoxFunction> = if declaration.is_static {
                        let bound = Rc::new(method.bind_static(&statics));
                        statics
                            .borrow_mut()
                            .define(method_name, Value::Function(Rc::clone(&bound)));
                        bound
                    } else {
                        Rc::new(method)
                    };

                    methods.insert(method_name.to_string(), method);
                }

                Stmt::GetField(declaration) => {
                    let getter_name: &str = &declaration.name.lexeme;
                    let getter =
                        GetterField::new(Rc::clone(declaration), Rc::clone(&self.environment));

                    let getter: Rc<GetterField> = if declaration.is_static {
                        let bound = Rc::new(getter.bind_static(&statics));
                        statics
                            .borrow_mut()
                            .define(getter_name, Value::GetterField(Rc::clone(&bound)));
                        bound
                    } else {
                        Rc::new(getter)
                    };

                    getters.insert(getter_name.to_string(), getter);
                }

                Stmt::StaticVar { .. } => {
                    self.execute_block(std::slice::from_ref(member), Rc::clone(&statics))?;
                }

                other => {
                    return Err(LoxError::internal(format!(
                        "unexpected member in class '{}': {:?}",
                        name.lexeme, other
                    )))
                }
            }
        }

        Ok(Rc::new(LoxClass::new(
            name.lexeme.clone(),
            superclass,
            methods,
            getters,
        )))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left_val = self.evaluate(left)?;

                let short_circuit = if operator.token_type == TokenType::OR {
                    left_val.is_truthy()
                } else {
                    !left_val.is_truthy()
                };

                if short_circuit {
                    Ok(left_val)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => {
                        Environment::assign_at(&self.environment, distance, name, value.clone())?
                    }
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee_val = self.evaluate(callee)?;

                let mut args: Vec<Value> = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    let value = match arg {
                        Argument::Expr(expr) => self.evaluate(expr)?,
                        Argument::Function(declaration) => {
                            Value::Function(Rc::new(LoxFunction::new(
                                Rc::clone(declaration),
                                Rc::clone(&self.environment),
                                false,
                            )))
                        }
                    };
                    args.push(value);
                }

                self.call_value(&callee_val, paren, args)
            }

            Expr::Get { object, name } => {
                let target = self.evaluate(object)?;
                self.get_property(target, name)
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                let target = self.evaluate(object)?;

                let Value::Instance(instance) = target else {
                    return Err(LoxError::runtime(
                        RuntimeErrorKind::InvalidPropertyTarget,
                        name,
                        "Only instances have fields.",
                    ));
                };

                let value = self.evaluate(value)?;
                instance.borrow_mut().set(&name.lexeme, value.clone());
                Ok(value)
            }

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),
        }
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> Result<Value> {
        match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, &name.lexeme),
            None => self.globals.borrow().get(name),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> Result<Value> {
        let right_val = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match right_val {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(LoxError::runtime(
                    RuntimeErrorKind::TypeMismatch,
                    operator,
                    "Operand must be a number.",
                )),
            },

            TokenType::BANG => Ok(Value::Bool(!right_val.is_truthy())),

            _ => Err(LoxError::internal(format!(
                "invalid unary operator '{}'",
                operator.lexeme
            ))),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> Result<Value> {
        let left_val = self.evaluate(left)?;
        let right_val = self.evaluate(right)?;
        debug!(
            "Binary '{}' on {} and {}",
            operator.lexeme, left_val, right_val
        );

        match operator.token_type {
            TokenType::PLUS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),

                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),

                (Value::String(a), Value::Number(b)) => {
                    // `as` truncates toward zero
                    let mut buf: itoa::Buffer = itoa::Buffer::new();
                    Ok(Value::String(a + buf.format(b as i64)))
                }

                _ => Err(LoxError::runtime(
                    RuntimeErrorKind::TypeMismatch,
                    operator,
                    "Operands must be two numbers or two strings.",
                )),
            },

            TokenType::MINUS => {
                let (a, b) = number_operands(operator, &left_val, &right_val)?;
                Ok(Value::Number(a - b))
            }

            TokenType::STAR => {
                let (a, b) = number_operands(operator, &left_val, &right_val)?;
                Ok(Value::Number(a * b))
            }

            TokenType::SLASH => {
                let (a, b) = number_operands(operator, &left_val, &right_val)?;

                if b == 0.0 {
                    return Err(LoxError::runtime(
                        RuntimeErrorKind::DivisionByZero,
                        operator,
                        "Division by zero.",
                    ));
                }

                Ok(Value::Number(a / b))
            }

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left_val.is_equal(&right_val))),

            TokenType::BANG_EQUAL => Ok(Value::Bool(!left_val.is_equal(&right_val))),

            TokenType::GREATER => {
                let ord = compare(operator, &left_val, &right_val)?;
                Ok(Value::Bool(ord == Some(Ordering::Greater)))
            }

            TokenType::GREATER_EQUAL => {
                let ord = compare(operator, &left_val, &right_val)?;
                Ok(Value::Bool(matches!(
                    ord,
                    Some(Ordering::Greater | Ordering::Equal)
                )))
            }

            TokenType::LESS => {
                let ord = compare(operator, &left_val, &right_val)?;
                Ok(Value::Bool(ord == Some(Ordering::Less)))
            }

            TokenType::LESS_EQUAL => {
                let ord = compare(operator, &left_val, &right_val)?;
                Ok(Value::Bool(matches!(
                    ord,
                    Some(Ordering::Less | Ordering::Equal)
                )))
            }

            _ => Err(LoxError::internal(format!(
                "invalid binary operator '{}'",
                operator.lexeme
            ))),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Calls
    // ─────────────────────────────────────────────────────────────────────────

    /// Invoke any callable value with already evaluated arguments.
    pub fn call_value(&mut self, callee: &Value, paren: &Token, args: Vec<Value>) -> Result<Value> {
        let Some(arity) = callee.arity() else {
            return Err(LoxError::runtime(
                RuntimeErrorKind::NotCallable,
                paren,
                "Can only call functions and classes.",
            ));
        };

        if args.len() != arity {
            return Err(LoxError::runtime(
                RuntimeErrorKind::ArityMismatch,
                paren,
                format!("Expected {} arguments but got {}.", arity, args.len()),
            ));
        }

        match callee {
            Value::NativeFunction { name, func, .. } => {
                debug!("Calling native function '{}'", name);
                func(&args).map_err(|msg| LoxError::runtime(RuntimeErrorKind::Native, paren, msg))
            }

            Value::Function(function) => self.call_function(function, args),

            Value::GetterField(getter) => self.call_getter(getter),

            Value::Class(class) => self.instantiate(class, args),

            other => Err(LoxError::internal(format!(
                "value {} reported an arity but is not callable",
                other
            ))),
        }
    }

    fn call_function(&mut self, function: &LoxFunction, args: Vec<Value>) -> Result<Value> {
        debug!("Calling user-defined function '{}'", function.name());

        let scope: EnvRef = Environment::child_of(&function.closure);
        {
            let mut frame = scope.borrow_mut();
            for (param, arg) in function.declaration.params.iter().zip(args) {
                frame.define(&param.lexeme, arg);
            }
        }

        let flow = self.run_body(&function.declaration.body, scope)?;

        if function.is_initializer {
            return Environment::get_at(&function.closure, 0, "this");
        }

        match flow {
            Flow::Return(value) => Ok(value),
            Flow::Normal | Flow::Break => Ok(Value::Nil),
        }
    }

    fn call_getter(&mut self, getter: &GetterField) -> Result<Value> {
        debug!("Invoking getter-field '{}'", getter.name());

        let scope: EnvRef = Environment::child_of(&getter.closure);

        match self.run_body(&getter.declaration.body, scope)? {
            Flow::Return(value) => Ok(value),
            Flow::Normal | Flow::Break => Ok(Value::Nil),
        }
    }

    /// Run a callable body.  Its statements start outside any `if` branch.
    fn run_body(&mut self, body: &[Stmt], scope: EnvRef) -> Result<Flow> {
        let enclosing_depth = std::mem::replace(&mut self.branch_depth, 0);
        let flow = self.execute_block(body, scope);
        self.branch_depth = enclosing_depth;
        flow
    }

    fn instantiate(&mut self, class: &Rc<LoxClass>, args: Vec<Value>) -> Result<Value> {
        debug!("Instantiating class '{}'", class.name());

        let instance = Value::Instance(Rc::new(RefCell::new(LoxInstance::new(Rc::clone(class)))));

        if let Some(init) = class.initializer() {
            self.call_function(&init.bind(instance.clone()), args)?;
        }

        Ok(instance)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Properties
    // ─────────────────────────────────────────────────────────────────────────

    fn get_property(&mut self, target: Value, name: &Token) -> Result<Value> {
        match &target {
            Value::Instance(instance) => {
                let member = instance.borrow().lookup(&name.lexeme);

                match member {
                    Some(Member::Field(value)) => Ok(value),

                    Some(Member::Method(method)) if !method.is_static() => {
                        Ok(Value::Function(Rc::new(method.bind(target.clone()))))
                    }

                    Some(Member::Getter(getter)) if !getter.is_static() => {
                        let bound = getter.bind(target.clone());
                        self.call_getter(&bound)
                    }

                    Some(_) => Err(LoxError::runtime(
                        RuntimeErrorKind::StaticAccess,
                        name,
                        format!(
                            "Static member '{}' can only be accessed through its class.",
                            name.lexeme
                        ),
                    )),

                    None => Err(undefined_property(name)),
                }
            }

            Value::Class(class) => match class.lookup(&name.lexeme) {
                Some(Member::Method(method)) if method.is_static() => Ok(Value::Function(method)),

                Some(Member::Getter(getter)) if getter.is_static() => self.call_getter(&getter),

                Some(Member::Field(_)) | None => Err(undefined_property(name)),

                Some(_) => Err(LoxError::runtime(
                    RuntimeErrorKind::StaticAccess,
                    name,
                    format!(
                        "Instance member '{}' can't be accessed through class '{}'.",
                        name.lexeme,
                        class.name()
                    ),
                )),
            },

            Value::Nil => Err(LoxError::runtime(
                RuntimeErrorKind::InvalidPropertyTarget,
                name,
                format!("Can't read property '{}' of nil.", name.lexeme),
            )),

            _ => Err(LoxError::runtime(
                RuntimeErrorKind::InvalidPropertyTarget,
                name,
                "Only instances and classes have properties.",
            )),
        }
    }

    fn evaluate_super(&mut self, id: ExprId, keyword: &Token, method: &Token) -> Result<Value> {
        let distance: usize = *self
            .locals
            .get(&id)
            .ok_or_else(|| LoxError::internal("unresolved 'super' expression"))?;

        let superclass: Rc<LoxClass> = match Environment::get_at(&self.environment, distance, "super")? {
            Value::Class(class) => class,
            other => {
                return Err(LoxError::internal(format!(
                    "'super' bound to non-class value {}",
                    other
                )))
            }
        };

        debug!(
            "super.{} on class '{}' (line {})",
            method.lexeme,
            superclass.name(),
            keyword.line
        );

        if let Some(found) = superclass.find_method(&method.lexeme) {
            if found.is_static() {
                return Ok(Value::Function(found));
            }

            let receiver = self.super_receiver(distance, method)?;
            return Ok(Value::Function(Rc::new(found.bind(receiver))));
        }

        if let Some(getter) = superclass.find_getter(&method.lexeme) {
            if getter.is_static() {
                return self.call_getter(&getter);
            }

            let receiver = self.super_receiver(distance, method)?;
            return self.call_getter(&getter.bind(receiver));
        }

        Err(undefined_property(method))
    }

    /// `this` sits one scope inside the one binding `super`.  Static members
    /// have no such scope.
    fn super_receiver(&self, distance: usize, method: &Token) -> Result<Value> {
        let receiver: Option<Value> = match distance.checked_sub(1) {
            Some(depth) => Environment::ancestor(&self.environment, depth)?
                .borrow()
                .get_own("this"),
            None => None,
        };

        receiver.ok_or_else(|| {
            LoxError::runtime(
                RuntimeErrorKind::StaticAccess,
                method,
                format!(
                    "Instance member '{}' can't be reached through 'super' here.",
                    method.lexeme
                ),
            )
        })
    }
}

/// Assignments, calls, bare variables and property sets are run for their
/// effect and never echo.
fn echoes(expr: &Expr) -> bool {
    !matches!(
        expr,
        Expr::Assign { .. } | Expr::Call { .. } | Expr::Variable { .. } | Expr::Set { .. }
    )
}

fn number_operands(operator: &Token, left: &Value, right: &Value) -> Result<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(LoxError::runtime(
            RuntimeErrorKind::TypeMismatch,
            operator,
            "Operands must be numbers.",
        )),
    }
}

/// Order two numbers, or two strings by UTF-16 code units.  `None` for NaN.
fn compare(operator: &Token, left: &Value, right: &Value) -> Result<Option<Ordering>> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(a.partial_cmp(b)),
        (Value::String(a), Value::String(b)) => Ok(Some(a.encode_utf16().cmp(b.encode_utf16()))),
        _ => Err(LoxError::runtime(
            RuntimeErrorKind::TypeMismatch,
            operator,
            "Operands must be two numbers or two strings.",
        )),
    }
}

fn undefined_property(name: &Token) -> LoxError {
    LoxError::runtime(
        RuntimeErrorKind::UndefinedProperty,
        name,
        format!("Undefined property '{}'.", name.lexeme),
    )
}
