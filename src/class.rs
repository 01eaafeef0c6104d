use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::function::{GetterField, LoxFunction};
use crate::value::Value;

/// Name of the method run by a class call.
pub const INIT: &str = "init";

/// What a property name resolved to, before any binding or invocation.
#[derive(Debug, Clone)]
pub enum Member {
    /// Instance field.
    Field(Value),
    Method(Rc<LoxFunction>),
    Getter(Rc<GetterField>),
}

pub struct LoxClass {
    name: String,
    superclass: Option<Rc<LoxClass>>,
    methods: HashMap<String, Rc<LoxFunction>>,
    getters: HashMap<String, Rc<GetterField>>,
}

impl LoxClass {
    pub fn new(
        name: String,
        superclass: Option<Rc<LoxClass>>,
        methods: HashMap<String, Rc<LoxFunction>>,
        getters: HashMap<String, Rc<GetterField>>,
    ) -> Self {
        Self {
            name,
            superclass,
            methods,
            getters,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Method declared here or on the nearest ancestor.
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        match self.methods.get(name) {
            Some(method) => Some(Rc::clone(method)),
            None => self.superclass.as_ref()?.find_method(name),
        }
    }

    /// Getter-field declared here or on the nearest ancestor.
    pub fn find_getter(&self, name: &str) -> Option<Rc<GetterField>> {
        match self.getters.get(name) {
            Some(getter) => Some(Rc::clone(getter)),
            None => self.superclass.as_ref()?.find_getter(name),
        }
    }

    /// Non-static `init`, if the class or an ancestor declares one.
    pub fn initializer(&self) -> Option<Rc<LoxFunction>> {
        self.find_method(INIT).filter(|init| !init.is_static())
    }

    pub fn arity(&self) -> usize {
        self.initializer().map_or(0, |init| init.arity())
    }

    /// Resolve `Class.name`: methods, then getters.  Static variables are
    /// only visible by name inside static members.
    pub fn lookup(&self, name: &str) -> Option<Member> {
        if let Some(method) = self.find_method(name) {
            return Some(Member::Method(method));
        }

        self.find_getter(name).map(Member::Getter)
    }
}

impl fmt::Debug for LoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxClass")
            .field("name", &self.name)
            .field(
                "superclass",
                &self.superclass.as_ref().map(|class| class.name()),
            )
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("getters", &self.getters.keys().collect::<Vec<_>>())
            .finish()
    }
}

pub struct LoxInstance {
    class: Rc<LoxClass>,
    fields: HashMap<String, Value>,
}

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> Self {
        Self {
            class,
            fields: HashMap::new(),
        }
    }

    pub fn class(&self) -> &Rc<LoxClass> {
        &self.class
    }

    /// Resolve `instance.name`: own fields shadow methods, methods shadow
    /// getters.
    pub fn lookup(&self, name: &str) -> Option<Member> {
        if let Some(value) = self.fields.get(name) {
            return Some(Member::Field(value.clone()));
        }

        if let Some(method) = self.class.find_method(name) {
            return Some(Member::Method(method));
        }

        self.class.find_getter(name).map(Member::Getter)
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }
}

impl fmt::Debug for LoxInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxInstance")
            .field("class", &self.class.name())
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}
