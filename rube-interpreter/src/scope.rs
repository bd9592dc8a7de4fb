use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::heap::ObjectId;
use crate::interner::Interned;
use crate::value::Value;
use crate::RubeRef;

/// A shared reference to a scope (closures keep the scope they were created in alive).
pub type ScopeRef = RubeRef<Scope>;

/// Identifies one invocation of a method or lambda (the target of a `return`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub u64);

impl FrameId {
    /// The frame of the top-level program.
    pub const TOP_LEVEL: FrameId = FrameId(0);
}

/// What a method scope remembers about its invocation, for `super`.
#[derive(Debug, Clone)]
pub struct MethodContext {
    /// The module holding the running method.
    pub holder: ObjectId,
    /// The name of the running method.
    pub name: Interned,
    /// The arguments the method was called with.
    pub args: Vec<Value>,
    /// The block the method was called with.
    pub block: Option<Value>,
}

/// Represents a lexical scope.
#[derive(Debug)]
pub struct Scope {
    /// The bindings within this scope.
    pub bindings: HashMap<Interned, Value>,
    /// The self value.
    pub self_value: Value,
    /// The enclosing scope (only for closures).
    pub parent: Option<ScopeRef>,
    /// The block given to the invocation owning this scope.
    pub block: Option<Value>,
    /// The invocation owning this scope, if it is a method or lambda scope.
    pub frame: Option<FrameId>,
    /// The running method, if this is a method scope.
    pub method: Option<MethodContext>,
}

impl Scope {
    /// Construct a root scope (top-level program, class body).
    pub fn root(self_value: Value, frame: Option<FrameId>) -> ScopeRef {
        Rc::new(RefCell::new(Self {
            bindings: HashMap::new(),
            self_value,
            parent: None,
            block: None,
            frame,
            method: None,
        }))
    }

    /// Construct the scope of a method invocation (it does not see the caller's bindings).
    pub fn for_method(
        self_value: Value,
        frame: FrameId,
        block: Option<Value>,
        method: MethodContext,
    ) -> ScopeRef {
        Rc::new(RefCell::new(Self {
            bindings: HashMap::new(),
            self_value,
            parent: None,
            block,
            frame: Some(frame),
            method: Some(method),
        }))
    }

    /// Construct a child scope, optionally with a different self value.
    pub fn extend(parent: &ScopeRef, self_value: Option<Value>) -> ScopeRef {
        let self_value = self_value.unwrap_or_else(|| parent.borrow().self_value.clone());
        Rc::new(RefCell::new(Self {
            bindings: HashMap::new(),
            self_value,
            parent: Some(parent.clone()),
            block: None,
            frame: None,
            method: None,
        }))
    }

    /// Get the self value for this scope.
    pub fn get_self(&self) -> Value {
        self.self_value.clone()
    }

    /// Search for a local binding, walking up enclosing scopes.
    pub fn get(&self, name: Interned) -> Option<Value> {
        if let Some(value) = self.bindings.get(&name) {
            return Some(value.clone());
        }
        self.parent
            .as_ref()
            .and_then(|parent| parent.borrow().get(name))
    }

    /// Whether a binding with this name is visible from this scope.
    pub fn contains(&self, name: Interned) -> bool {
        self.bindings.contains_key(&name)
            || self
                .parent
                .as_ref()
                .map_or(false, |parent| parent.borrow().contains(name))
    }

    /// Assign to a binding: the nearest scope already binding the name gets it, otherwise it becomes a new local.
    pub fn set(&mut self, name: Interned, value: Value) {
        if let Some(local) = self.bindings.get_mut(&name) {
            *local = value;
            return;
        }
        if let Some(parent) = self.parent.as_ref() {
            if parent.borrow().contains(name) {
                parent.borrow_mut().set(name, value);
                return;
            }
        }
        self.bindings.insert(name, value);
    }

    /// Bind a name within this very scope, shadowing any enclosing binding.
    pub fn define(&mut self, name: Interned, value: Value) {
        self.bindings.insert(name, value);
    }

    /// Get the block available to `yield` from this scope.
    pub fn current_block(&self) -> Option<Value> {
        if self.method.is_some() {
            return self.block.clone();
        }
        self.block.clone().or_else(|| {
            self.parent
                .as_ref()
                .and_then(|parent| parent.borrow().current_block())
        })
    }

    /// Get the invocation a `return` from this scope targets.
    pub fn frame(&self) -> Option<FrameId> {
        self.frame.or_else(|| {
            self.parent
                .as_ref()
                .and_then(|parent| parent.borrow().frame())
        })
    }

    /// Get the method running this scope, for `super`.
    pub fn method_context(&self) -> Option<MethodContext> {
        self.method.clone().or_else(|| {
            self.parent
                .as_ref()
                .and_then(|parent| parent.borrow().method_context())
        })
    }
}
