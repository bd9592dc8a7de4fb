//!
//! This is an implementation of a string interner.
//!
//! It allows to bring down the memory usage from strings and allows for fast comparisons by replacing the strings by essentially an ID.
//!

use std::rc::Rc;

use indexmap::IndexSet;

/// An interned string.
///
/// This is fast to move, clone and compare.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Interned(pub u32);

/// A string interner.
///
/// The position of a string within the set is its ID, so IDs are stable for the lifetime of the interner.
#[derive(Debug, Default)]
pub struct Interner {
    names: IndexSet<Rc<str>>,
}

impl Interner {
    /// Initialize the interner with an initial capacity.
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            names: IndexSet::with_capacity(cap),
        }
    }

    /// Intern a given string.
    pub fn intern(&mut self, name: &str) -> Interned {
        if let Some(index) = self.names.get_index_of(name) {
            return Interned(index as u32);
        }
        let (index, _) = self.names.insert_full(Rc::from(name));
        let id = Interned(index as u32);

        debug_assert!(self.lookup(id) == name);

        id
    }

    /// Get the ID of a string, if it was already interned.
    pub fn get(&self, name: &str) -> Option<Interned> {
        self.names
            .get_index_of(name)
            .map(|index| Interned(index as u32))
    }

    /// Get the string associated to a given interning ID.
    pub fn lookup(&self, id: Interned) -> &str {
        &self.names[id.0 as usize]
    }

    /// Get the number of interned strings.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether nothing has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
