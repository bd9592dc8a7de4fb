use std::fmt;

use indexmap::IndexMap;

use crate::class::ModuleData;
use crate::interner::Interned;
use crate::lambda::Lambda;
use crate::method::BoundMethod;
use crate::value::Value;

/// The identity of a heap-allocated object (its index within the arena).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u32);

impl ObjectId {
    /// A link that has not been written yet (only observable during bootstrap).
    pub const UNSET: ObjectId = ObjectId(u32::MAX);

    /// Get the position of the object within the arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Whether this link has not been written yet.
    pub fn is_unset(self) -> bool {
        self == Self::UNSET
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// What an object carries besides its instance variables.
#[derive(Debug)]
pub enum Payload {
    /// Nothing (plain instances, exceptions, `main`).
    Plain,
    /// A class, module, singleton class or include class.
    Module(ModuleData),
    /// A mutable string.
    String(String),
    /// A mutable array.
    Array(Vec<Value>),
    /// A closure.
    Lambda(Lambda),
    /// A method bound to its receiver.
    Method(BoundMethod),
}

/// Represents a heap-allocated object.
#[derive(Debug)]
pub struct Object {
    /// The class this object dispatches through (its singleton class, if it has one).
    pub klass: ObjectId,
    /// This object's instance variables.
    pub ivars: IndexMap<Interned, Value>,
    /// This object's payload.
    pub payload: Payload,
}

/// The arena holding every object of a runtime.
///
/// Objects are never moved nor freed while the runtime is alive, so an
/// `ObjectId` stays valid for the runtime's whole lifetime.
#[derive(Debug, Default)]
pub struct Heap {
    objects: Vec<Object>,
}

impl Heap {
    /// Create an empty heap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new object.
    pub fn allocate(&mut self, klass: ObjectId, payload: Payload) -> ObjectId {
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(Object {
            klass,
            ivars: IndexMap::new(),
            payload,
        });
        id
    }

    /// Whether the given ID refers to a live object of this heap.
    pub fn contains(&self, id: ObjectId) -> bool {
        id.index() < self.objects.len()
    }

    /// Get an object.
    ///
    /// Panics if the ID does not belong to this heap.
    pub fn get(&self, id: ObjectId) -> &Object {
        &self.objects[id.index()]
    }

    /// Get an object, mutably.
    ///
    /// Panics if the ID does not belong to this heap.
    pub fn get_mut(&mut self, id: ObjectId) -> &mut Object {
        &mut self.objects[id.index()]
    }

    /// Get the number of allocated objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether nothing has been allocated yet.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Iterate over all objects, along with their IDs.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &Object)> {
        self.objects
            .iter()
            .enumerate()
            .map(|(index, object)| (ObjectId(index as u32), object))
    }

    /// Get the module data of an object, if it is module-like.
    pub fn module(&self, id: ObjectId) -> Option<&ModuleData> {
        match &self.get(id).payload {
            Payload::Module(module) => Some(module),
            _ => None,
        }
    }

    /// Get the module data of an object, mutably, if it is module-like.
    pub fn module_mut(&mut self, id: ObjectId) -> Option<&mut ModuleData> {
        match &mut self.get_mut(id).payload {
            Payload::Module(module) => Some(module),
            _ => None,
        }
    }

    /// Get the contents of a string object.
    pub fn string(&self, id: ObjectId) -> Option<&str> {
        match &self.get(id).payload {
            Payload::String(string) => Some(string.as_str()),
            _ => None,
        }
    }

    /// Get the contents of a string object, mutably.
    pub fn string_mut(&mut self, id: ObjectId) -> Option<&mut String> {
        match &mut self.get_mut(id).payload {
            Payload::String(string) => Some(string),
            _ => None,
        }
    }

    /// Get the elements of an array object.
    pub fn array(&self, id: ObjectId) -> Option<&Vec<Value>> {
        match &self.get(id).payload {
            Payload::Array(values) => Some(values),
            _ => None,
        }
    }

    /// Get the elements of an array object, mutably.
    pub fn array_mut(&mut self, id: ObjectId) -> Option<&mut Vec<Value>> {
        match &mut self.get_mut(id).payload {
            Payload::Array(values) => Some(values),
            _ => None,
        }
    }

    /// Get the closure held by a lambda object.
    pub fn lambda(&self, id: ObjectId) -> Option<&Lambda> {
        match &self.get(id).payload {
            Payload::Lambda(lambda) => Some(lambda),
            _ => None,
        }
    }

    /// Get the method held by a method object.
    pub fn bound_method(&self, id: ObjectId) -> Option<&BoundMethod> {
        match &self.get(id).payload {
            Payload::Method(method) => Some(method),
            _ => None,
        }
    }
}
