use std::io::Write;
use std::ops::ControlFlow;

use indexmap::IndexMap;
use log::{trace, warn};

use rube_core::ast::Node;
use rube_core::location::Location;
use rube_core::syntax::Parse;

use crate::config::{Config, Output};
use crate::error::{FatalError, RuntimeError};
use crate::evaluate::Evaluate;
use crate::frame::CallFrame;
use crate::heap::{Heap, ObjectId, Payload};
use crate::interner::{Interned, Interner};
use crate::invokable::{Eval, Outcome};
use crate::lambda::{Lambda, LambdaBody};
use crate::scope::ScopeRef;
use crate::value::Value;

/// The core classes of the rube interpreter.
///
/// This struct allows to always keep a reference to important classes,
/// even in case of modifications to constants by user-defined code.
#[derive(Debug, Clone)]
pub struct CoreClasses {
    /// The **Object** class.
    pub object: ObjectId,
    /// The **Module** class.
    pub module: ObjectId,
    /// The **Class** class.
    pub class: ObjectId,

    /// The **Kernel** module.
    pub kernel: ObjectId,
    /// The **Comparable** module.
    pub comparable: ObjectId,

    /// The **NilClass** class.
    pub nil_class: ObjectId,
    /// The **TrueClass** class.
    pub true_class: ObjectId,
    /// The **FalseClass** class.
    pub false_class: ObjectId,
    /// The **Integer** class.
    pub integer: ObjectId,
    /// The **Float** class.
    pub float: ObjectId,
    /// The **String** class.
    pub string: ObjectId,
    /// The **Symbol** class.
    pub symbol: ObjectId,
    /// The **Array** class.
    pub array: ObjectId,
    /// The **Proc** class.
    pub proc: ObjectId,
    /// The **Method** class.
    pub method: ObjectId,

    /// The **Exception** class.
    pub exception: ObjectId,
    /// The **ScriptError** class.
    pub script_error: ObjectId,
    /// The **SyntaxError** class.
    pub syntax_error: ObjectId,
    /// The **StandardError** class.
    pub standard_error: ObjectId,
    /// The **RuntimeError** class.
    pub runtime_error: ObjectId,
    /// The **ArgumentError** class.
    pub argument_error: ObjectId,
    /// The **TypeError** class.
    pub type_error: ObjectId,
    /// The **NameError** class.
    pub name_error: ObjectId,
    /// The **NoMethodError** class.
    pub no_method_error: ObjectId,
    /// The **ZeroDivisionError** class.
    pub zero_division_error: ObjectId,
    /// The **IndexError** class.
    pub index_error: ObjectId,
    /// The **LocalJumpError** class.
    pub local_jump_error: ObjectId,
}

impl CoreClasses {
    /// The core classes while only the three root classes exist.
    pub(crate) fn roots(object: ObjectId, module: ObjectId, class: ObjectId) -> Self {
        let unset = ObjectId::UNSET;
        Self {
            object,
            module,
            class,
            kernel: unset,
            comparable: unset,
            nil_class: unset,
            true_class: unset,
            false_class: unset,
            integer: unset,
            float: unset,
            string: unset,
            symbol: unset,
            array: unset,
            proc: unset,
            method: unset,
            exception: unset,
            script_error: unset,
            syntax_error: unset,
            standard_error: unset,
            runtime_error: unset,
            argument_error: unset,
            type_error: unset,
            name_error: unset,
            no_method_error: unset,
            zero_division_error: unset,
            index_error: unset,
            local_jump_error: unset,
        }
    }
}

/// The central data structure for the interpreter.
///
/// It represents the complete state of the interpreter, like the object heap,
/// the constants, the string interner and the call stack.
#[derive(Debug)]
pub struct Runtime {
    /// The string interner for symbols and names.
    pub interner: Interner,
    /// Every object of this runtime.
    pub heap: Heap,
    /// The interpreter's core classes.
    pub core: CoreClasses,
    /// The interpreter's configuration.
    pub config: Config,
    /// The top-level object.
    pub main: Value,
    pub(crate) constants: IndexMap<Interned, Value>,
    pub(crate) top_scope: ScopeRef,
    pub(crate) call_stack: Vec<CallFrame>,
    pub(crate) eval_stack: Vec<Location>,
    pub(crate) next_frame: u64,
}

impl Runtime {
    /// Bootstrap a runtime with the default configuration.
    pub fn new() -> anyhow::Result<Self> {
        Self::with_config(Config::default())
    }

    /// Bootstrap a runtime with the given configuration.
    pub fn with_config(config: Config) -> anyhow::Result<Self> {
        crate::bootstrap::bootstrap(config)
    }

    /// Evaluate a syntax tree at the top level.
    ///
    /// Local variables of the top-level scope persist from one run to the next.
    pub fn run(&mut self, node: &Node) -> Result<Value, RuntimeError> {
        let scope = self.top_scope.clone();
        let outcome = node.evaluate(self, &scope);
        self.call_stack.clear();
        self.eval_stack.clear();
        match outcome {
            Ok(Outcome::Value(value)) | Ok(Outcome::Returned(value, _)) => Ok(value),
            Ok(Outcome::Raised(exception)) => {
                let error = self.uncaught(&exception)?;
                warn!("uncaught exception: {}", error);
                Err(error)
            }
            Err(err) => Err(RuntimeError::Fatal(err)),
        }
    }

    /// Parse some source text with the given front-end, then evaluate it at the top level.
    pub fn run_source<P: Parse>(
        &mut self,
        parser: &P,
        source: &str,
        file: &str,
    ) -> Result<Value, RuntimeError> {
        let node = parser.parse(source, file)?;
        self.run(&node)
    }

    /// Describe an exception that escaped a run.
    fn uncaught(&mut self, exception: &Value) -> Result<RuntimeError, RuntimeError> {
        let class = self.module_name(self.class_of(exception));
        let message = match self.send(exception.clone(), "message", Vec::new())? {
            Outcome::Value(value) => match self.string_of(&value) {
                Some(message) => message,
                None => self.exception_message(exception),
            },
            _ => self.exception_message(exception),
        };
        let backtrace_name = self.intern("@__backtrace");
        let backtrace = self
            .array_of(&self.ivar_get(exception, backtrace_name))
            .unwrap_or_default()
            .iter()
            .filter_map(|line| self.string_of(line))
            .collect();
        Ok(RuntimeError::Uncaught {
            class,
            message,
            backtrace,
        })
    }

    /// Intern a symbol.
    pub fn intern(&mut self, name: &str) -> Interned {
        self.interner.intern(name)
    }

    /// Get the string associated to an interned symbol.
    pub fn lookup_symbol(&self, id: Interned) -> &str {
        self.interner.lookup(id)
    }

    /// Get all constants.
    pub fn constants(&self) -> &IndexMap<Interned, Value> {
        &self.constants
    }

    /// Get all constants, mutably.
    pub fn constants_mut(&mut self) -> &mut IndexMap<Interned, Value> {
        &mut self.constants
    }

    /// Search for a constant.
    pub fn constant(&self, name: &str) -> Option<Value> {
        let name = self.interner.get(name)?;
        self.constants.get(&name).cloned()
    }

    /// Assign a constant (anonymous classes and modules get named after it).
    pub fn set_constant(&mut self, name: &str, value: Value) {
        if let Some(id) = value.as_object() {
            self.name_module(id, name);
        }
        let name = self.intern(name);
        self.constants.insert(name, value);
    }

    /// Allocate a plain instance of a class.
    pub fn new_object(&mut self, class: ObjectId) -> Value {
        Value::Object(self.heap.allocate(class, Payload::Plain))
    }

    /// Allocate a string.
    pub fn new_string(&mut self, value: impl Into<String>) -> Value {
        Value::Object(self.heap.allocate(self.core.string, Payload::String(value.into())))
    }

    /// Allocate an array.
    pub fn new_array(&mut self, values: Vec<Value>) -> Value {
        Value::Object(self.heap.allocate(self.core.array, Payload::Array(values)))
    }

    /// Allocate a closure that sends the named method to its first argument.
    pub fn symbol_proc(&mut self, name: Interned) -> Value {
        let lambda = Lambda {
            body: LambdaBody::Symbol(name),
            is_lambda: false,
            location: self.current_location(),
        };
        Value::Object(self.heap.allocate(self.core.proc, Payload::Lambda(lambda)))
    }

    /// Get the contents of a string value.
    pub fn string_of(&self, value: &Value) -> Option<String> {
        value
            .as_object()
            .and_then(|id| self.heap.string(id))
            .map(String::from)
    }

    /// Get the elements of an array value.
    pub fn array_of(&self, value: &Value) -> Option<Vec<Value>> {
        value
            .as_object()
            .and_then(|id| self.heap.array(id))
            .cloned()
    }

    /// Get an instance variable (`nil` if unset).
    pub fn ivar_get(&self, value: &Value, name: Interned) -> Value {
        value
            .as_object()
            .and_then(|id| self.heap.get(id).ivars.get(&name).cloned())
            .unwrap_or(Value::Nil)
    }

    /// Set an instance variable.
    ///
    /// Returns `false` for immediate values (which have no instance variables).
    pub fn ivar_set(&mut self, value: &Value, name: Interned, new_value: Value) -> bool {
        match value.as_object() {
            Some(id) => {
                self.heap.get_mut(id).ivars.insert(name, new_value);
                true
            }
            None => false,
        }
    }

    /// Create an exception instance.
    pub fn new_exception(&mut self, class: ObjectId, message: Option<String>) -> Value {
        let exception = self.new_object(class);
        if let Some(message) = message {
            let message = self.new_string(message);
            let name = self.intern("@message");
            self.ivar_set(&exception, name, message);
        }
        exception
    }

    /// Get the message of an exception, without dispatching (defaults to its class name).
    pub fn exception_message(&mut self, exception: &Value) -> String {
        let name = self.intern("@message");
        let message = self.ivar_get(exception, name);
        match self.string_of(&message) {
            Some(message) => message,
            None if message.is_nil() => self.module_name(self.class_of(exception)),
            None => self.to_display(&message),
        }
    }

    /// Raise an exception instance.
    ///
    /// The backtrace is recorded the first time an exception is raised, so re-raising keeps the original.
    pub fn raise_value(&mut self, exception: Value) -> Eval {
        let name = self.intern("@__backtrace");
        if self.ivar_get(&exception, name).is_nil() {
            let lines = self
                .backtrace()
                .into_iter()
                .map(|line| self.new_string(line))
                .collect();
            let backtrace = self.new_array(lines);
            self.ivar_set(&exception, name, backtrace);
        }
        trace!(
            "raising {} at {}",
            self.inspect(&exception),
            self.current_location()
        );
        Ok(Outcome::Raised(exception))
    }

    /// Raise a new exception of the given class.
    pub fn raise(&mut self, class: ObjectId, message: impl Into<String>) -> Eval {
        let exception = self.new_exception(class, Some(message.into()));
        self.raise_value(exception)
    }

    /// Raise a new `NameError` (or `NoMethodError`), remembering the missing name.
    pub fn raise_named(&mut self, class: ObjectId, message: String, name: Interned) -> Eval {
        let exception = self.new_exception(class, Some(message));
        let field = self.intern("@name");
        self.ivar_set(&exception, field, Value::Symbol(name));
        self.raise_value(exception)
    }

    /// Raise a new `TypeError`.
    pub fn raise_type_error(&mut self, message: impl Into<String>) -> Eval {
        let class = self.core.type_error;
        self.raise(class, message)
    }

    /// Raise a new `ArgumentError`.
    pub fn raise_argument_error(&mut self, message: impl Into<String>) -> Eval {
        let class = self.core.argument_error;
        self.raise(class, message)
    }

    /// Write some text to the configured output.
    pub fn write_output(&self, text: &str) {
        match &self.config.output {
            Output::Stdout => {
                let stdout = std::io::stdout();
                let mut handle = stdout.lock();
                let _ = handle.write_all(text.as_bytes());
                let _ = handle.flush();
            }
            Output::Buffer(buffer) => buffer.borrow_mut().push_str(text),
        }
    }

    /// Convert a value to a string the way `puts` does (calling `to_s` on non-strings).
    pub fn stringify(&mut self, value: &Value) -> Result<ControlFlow<Outcome, String>, FatalError> {
        if let Some(string) = self.string_of(value) {
            return Ok(ControlFlow::Continue(string));
        }
        match self.send(value.clone(), "to_s", Vec::new())? {
            Outcome::Value(converted) => match self.string_of(&converted) {
                Some(string) => Ok(ControlFlow::Continue(string)),
                None => Ok(ControlFlow::Continue(self.to_display(value))),
            },
            outcome => Ok(ControlFlow::Break(outcome)),
        }
    }

    /// Convert a value to a string the way `p` does (calling `inspect`).
    pub fn inspect_value(&mut self, value: &Value) -> Result<ControlFlow<Outcome, String>, FatalError> {
        match self.send(value.clone(), "inspect", Vec::new())? {
            Outcome::Value(converted) => match self.string_of(&converted) {
                Some(string) => Ok(ControlFlow::Continue(string)),
                None => Ok(ControlFlow::Continue(self.inspect(value))),
            },
            outcome => Ok(ControlFlow::Break(outcome)),
        }
    }

    /// Get a developer-facing representation of a value, without dispatching.
    pub fn inspect(&self, value: &Value) -> String {
        let mut visiting = Vec::new();
        self.inspect_with(value, &mut visiting)
    }

    fn inspect_with(&self, value: &Value, visiting: &mut Vec<ObjectId>) -> String {
        let id = match value {
            Value::Object(id) => *id,
            Value::Symbol(symbol) => return format!(":{}", self.lookup_symbol(*symbol)),
            _ => return self.to_display(value),
        };
        if !self.heap.contains(id) {
            return format!("#<invalid {}>", id);
        }
        match &self.heap.get(id).payload {
            Payload::String(string) => format!("{:?}", string),
            Payload::Array(values) => {
                if visiting.contains(&id) {
                    return "[...]".to_string();
                }
                visiting.push(id);
                let items: Vec<String> = values
                    .iter()
                    .map(|value| self.inspect_with(value, visiting))
                    .collect();
                visiting.pop();
                format!("[{}]", items.join(", "))
            }
            Payload::Plain => {
                let class = self.class_of(value);
                if *value == self.main {
                    return "main".to_string();
                }
                if self.is_exception(value) {
                    let name = self.interner.get("@message");
                    let message = name
                        .map(|name| self.ivar_get(value, name))
                        .and_then(|message| self.string_of(&message))
                        .unwrap_or_else(|| self.module_name(class));
                    return format!("#<{}: {}>", self.module_name(class), message);
                }
                if visiting.contains(&id) {
                    return format!("#<{} ...>", self.module_name(class));
                }
                visiting.push(id);
                let ivars: Vec<String> = self
                    .heap
                    .get(id)
                    .ivars
                    .iter()
                    .filter(|(name, _)| !self.lookup_symbol(**name).starts_with("@__"))
                    .map(|(name, value)| {
                        format!(
                            "{}={}",
                            self.lookup_symbol(*name),
                            self.inspect_with(value, visiting)
                        )
                    })
                    .collect();
                visiting.pop();
                if ivars.is_empty() {
                    format!("#<{}>", self.module_name(class))
                } else {
                    format!("#<{} {}>", self.module_name(class), ivars.join(", "))
                }
            }
            _ => self.to_display(value),
        }
    }

    /// Get a user-facing representation of a value, without dispatching.
    pub fn to_display(&self, value: &Value) -> String {
        match value {
            Value::Nil => String::new(),
            Value::Boolean(value) => value.to_string(),
            Value::Integer(value) => value.to_string(),
            Value::BigInteger(value) => value.to_string(),
            Value::Float(value) => format_float(*value),
            Value::Symbol(symbol) => self.lookup_symbol(*symbol).to_string(),
            Value::Object(id) if !self.heap.contains(*id) => format!("#<invalid {}>", id),
            Value::Object(id) => match &self.heap.get(*id).payload {
                Payload::String(string) => string.clone(),
                Payload::Module(_) => self.module_name(*id),
                Payload::Array(_) => self.inspect(value),
                Payload::Lambda(lambda) => format!(
                    "#<Proc:{} {}{}>",
                    id,
                    lambda.location,
                    if lambda.is_lambda { " (lambda)" } else { "" }
                ),
                Payload::Method(bound) => format!(
                    "#<Method: {}#{}>",
                    self.module_name(self.class_of(&bound.receiver)),
                    self.lookup_symbol(bound.method.name)
                ),
                Payload::Plain if *value == self.main => "main".to_string(),
                Payload::Plain => format!("#<{}>", self.module_name(self.class_of(value))),
            },
        }
    }

    /// Whether a value is an exception.
    pub fn is_exception(&self, value: &Value) -> bool {
        self.is_a(value, self.core.exception).unwrap_or(false)
    }
}

/// Format a float the way the language prints them (`3.0`, `0.1`, `NaN`, `Infinity`).
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}
