use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use log::debug;

use crate::error::FatalError;
use crate::heap::{ObjectId, Payload};
use crate::interner::Interned;
use crate::method::{Method, MethodKind};
use crate::primitives;
use crate::runtime::Runtime;
use crate::value::Value;
use crate::RubeRef;

/// A method table, in definition order.
pub type MethodTable = IndexMap<Interned, Rc<Method>>;

/// The different flavours of module-like objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    /// A plain module (a mixin).
    Module,
    /// A class.
    Class,
    /// A singleton class, owned by exactly one object.
    /// It is a metaclass when its owner is a class or a module.
    Singleton {
        /// The object this singleton class belongs to.
        owner: ObjectId,
    },
    /// A proxy for an included module, spliced into a superclass chain.
    Include {
        /// The module this proxy stands for.
        module: ObjectId,
    },
}

/// Represents the module-specific part of classes, modules, singleton classes and include classes.
#[derive(Debug, Clone)]
pub struct ModuleData {
    /// The module's name (anonymous modules have none).
    pub name: Option<String>,
    /// What kind of module this is.
    pub kind: ModuleKind,
    /// The module's methods (include classes share the table of their module).
    pub methods: RubeRef<MethodTable>,
    /// The next module in the lookup chain.
    pub super_module: Option<ObjectId>,
}

impl ModuleData {
    /// Construct the data of a class.
    pub fn class(name: Option<&str>, superclass: Option<ObjectId>) -> Self {
        Self {
            name: name.map(String::from),
            kind: ModuleKind::Class,
            methods: Rc::new(RefCell::new(MethodTable::new())),
            super_module: superclass,
        }
    }

    /// Construct the data of a plain module.
    pub fn module(name: Option<&str>) -> Self {
        Self {
            name: name.map(String::from),
            kind: ModuleKind::Module,
            methods: Rc::new(RefCell::new(MethodTable::new())),
            super_module: None,
        }
    }

    /// Whether this is a class (singleton classes included).
    pub fn is_class(&self) -> bool {
        matches!(self.kind, ModuleKind::Class | ModuleKind::Singleton { .. })
    }

    /// Whether this is hidden from `class_of` (singleton classes and include classes).
    pub fn is_hidden(&self) -> bool {
        matches!(
            self.kind,
            ModuleKind::Singleton { .. } | ModuleKind::Include { .. }
        )
    }

    /// The module that user code sees for this entry of a lookup chain.
    pub fn visible(&self, id: ObjectId) -> ObjectId {
        match self.kind {
            ModuleKind::Include { module } => module,
            _ => id,
        }
    }
}

impl Runtime {
    /// Get the module data of a module-like object.
    pub fn module_data(&self, id: ObjectId) -> Result<&ModuleData, FatalError> {
        if id.is_unset() || !self.heap.contains(id) {
            return Err(FatalError::InvalidObject(id, "dangling module link".into()));
        }
        self.heap
            .module(id)
            .ok_or_else(|| FatalError::InvalidObject(id, "not a module".into()))
    }

    /// Whether the value is a class, module or singleton class.
    pub fn is_module_like(&self, value: &Value) -> bool {
        value
            .as_object()
            .and_then(|id| self.heap.module(id))
            .map_or(false, |module| !matches!(module.kind, ModuleKind::Include { .. }))
    }

    /// Whether the value is a class (singleton classes included).
    pub fn is_class(&self, value: &Value) -> bool {
        value
            .as_object()
            .and_then(|id| self.heap.module(id))
            .map_or(false, ModuleData::is_class)
    }

    /// Whether the value is a plain module.
    pub fn is_plain_module(&self, value: &Value) -> bool {
        value
            .as_object()
            .and_then(|id| self.heap.module(id))
            .map_or(false, |module| module.kind == ModuleKind::Module)
    }

    /// Create a new class, along with its metaclass.
    pub fn new_class(
        &mut self,
        name: Option<&str>,
        superclass: ObjectId,
    ) -> Result<ObjectId, FatalError> {
        self.module_data(superclass)?;
        let id = self.heap.allocate(
            self.core.class,
            Payload::Module(ModuleData::class(name, Some(superclass))),
        );
        self.create_singleton_class(id)?;
        debug!(
            "created class {} < {}",
            name.unwrap_or("<anonymous>"),
            self.module_name(superclass)
        );
        Ok(id)
    }

    /// Create a new module, along with its metaclass.
    pub fn new_module(&mut self, name: Option<&str>) -> Result<ObjectId, FatalError> {
        let id = self
            .heap
            .allocate(self.core.module, Payload::Module(ModuleData::module(name)));
        self.create_singleton_class(id)?;
        debug!("created module {}", name.unwrap_or("<anonymous>"));
        Ok(id)
    }

    /// Get the singleton class of an object, if it already has one.
    pub fn existing_singleton_class(&self, id: ObjectId) -> Option<ObjectId> {
        let klass = self.heap.get(id).klass;
        if klass.is_unset() {
            return None;
        }
        match self.heap.module(klass).map(|module| module.kind) {
            Some(ModuleKind::Singleton { owner }) if owner == id => Some(klass),
            _ => None,
        }
    }

    /// Create the singleton class of an object and insert it between the object and its class.
    pub(crate) fn create_singleton_class(&mut self, id: ObjectId) -> Result<ObjectId, FatalError> {
        let kind = self.heap.module(id).map(|module| module.kind);
        let super_module = match kind {
            Some(ModuleKind::Class | ModuleKind::Singleton { .. }) => {
                match self.superclass_of(id)? {
                    Some(superclass) => self.metaclass_of(superclass)?,
                    None => self.core.class,
                }
            }
            Some(ModuleKind::Module) => self.core.module,
            Some(ModuleKind::Include { .. }) => {
                return Err(FatalError::InvalidObject(
                    id,
                    "include classes cannot have a singleton class".into(),
                ))
            }
            None => self.heap.get(id).klass,
        };
        let singleton = self.heap.allocate(
            self.core.class,
            Payload::Module(ModuleData {
                name: None,
                kind: ModuleKind::Singleton { owner: id },
                methods: Rc::new(RefCell::new(MethodTable::new())),
                super_module: Some(super_module),
            }),
        );
        self.heap.get_mut(id).klass = singleton;
        Ok(singleton)
    }

    /// Get the singleton class of a value, creating it on first access.
    ///
    /// Immediate values cannot have a singleton class, `None` is returned for them.
    pub fn singleton_class_of(&mut self, value: &Value) -> Result<Option<ObjectId>, FatalError> {
        let id = match value.as_object() {
            Some(id) => id,
            None => return Ok(None),
        };
        if let Some(singleton) = self.existing_singleton_class(id) {
            return Ok(Some(singleton));
        }
        self.create_singleton_class(id).map(Some)
    }

    /// Get the metaclass of a class or module.
    pub fn metaclass_of(&mut self, class: ObjectId) -> Result<ObjectId, FatalError> {
        self.module_data(class)?;
        match self.existing_singleton_class(class) {
            Some(metaclass) => Ok(metaclass),
            None => self.create_singleton_class(class),
        }
    }

    /// Get the superclass of a class (include classes are skipped).
    pub fn superclass_of(&self, class: ObjectId) -> Result<Option<ObjectId>, FatalError> {
        let mut current = self.module_data(class)?.super_module;
        while let Some(id) = current {
            let module = self.module_data(id)?;
            match module.kind {
                ModuleKind::Include { .. } => current = module.super_module,
                _ => return Ok(Some(id)),
            }
        }
        Ok(None)
    }

    /// Get the class used for dispatching on a value (its singleton class, if it has one).
    pub fn klass_of(&self, value: &Value) -> ObjectId {
        match value {
            Value::Nil => self.core.nil_class,
            Value::Boolean(true) => self.core.true_class,
            Value::Boolean(false) => self.core.false_class,
            Value::Integer(_) | Value::BigInteger(_) => self.core.integer,
            Value::Float(_) => self.core.float,
            Value::Symbol(_) => self.core.symbol,
            Value::Object(id) => self.heap.get(*id).klass,
        }
    }

    /// Get the real class of a value (singleton classes and include classes are skipped).
    pub fn class_of(&self, value: &Value) -> ObjectId {
        let mut klass = self.klass_of(value);
        while let Some(module) = self.heap.module(klass) {
            match (module.is_hidden(), module.super_module) {
                (true, Some(next)) => klass = next,
                _ => break,
            }
        }
        klass
    }

    /// Include a module into a class or module.
    ///
    /// The module (and every module it includes itself) is spliced right above `target`,
    /// unless it already appears in the lookup chain of `target`.
    pub fn include_module(&mut self, target: ObjectId, module: ObjectId) -> Result<(), FatalError> {
        let mut to_include = vec![module];
        let mut current = self.module_data(module)?.super_module;
        while let Some(id) = current {
            let data = self.module_data(id)?;
            if let ModuleKind::Include { module } = data.kind {
                to_include.push(module);
            }
            current = data.super_module;
        }

        let mut insert_after = target;
        for module in to_include {
            if self.chain_contains(target, module)? {
                continue;
            }
            let methods = self.module_data(module)?.methods.clone();
            let super_module = self.module_data(insert_after)?.super_module;
            let include = self.heap.allocate(
                self.core.class,
                Payload::Module(ModuleData {
                    name: None,
                    kind: ModuleKind::Include { module },
                    methods,
                    super_module,
                }),
            );
            if let Some(data) = self.heap.module_mut(insert_after) {
                data.super_module = Some(include);
            }
            insert_after = include;
            debug!(
                "included {} into {}",
                self.module_name(module),
                self.module_name(target)
            );
        }
        Ok(())
    }

    /// Whether a module is already part of the lookup chain starting at `start`.
    fn chain_contains(&self, start: ObjectId, module: ObjectId) -> Result<bool, FatalError> {
        let mut current = Some(start);
        while let Some(id) = current {
            let data = self.module_data(id)?;
            if data.visible(id) == module {
                return Ok(true);
            }
            current = data.super_module;
        }
        Ok(false)
    }

    /// Include a module into the singleton class of an object.
    ///
    /// Returns `false` for immediate values (which cannot be extended).
    pub fn extend_object(&mut self, value: &Value, module: ObjectId) -> Result<bool, FatalError> {
        match self.singleton_class_of(value)? {
            Some(singleton) => {
                self.include_module(singleton, module)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Define (or redefine) a method within a class or module.
    pub fn define_method(
        &mut self,
        on: ObjectId,
        name: Interned,
        kind: MethodKind,
    ) -> Result<Rc<Method>, FatalError> {
        let method = Rc::new(Method {
            name,
            holder: on,
            kind,
        });
        self.module_data(on)?
            .methods
            .borrow_mut()
            .insert(name, method.clone());
        Ok(method)
    }

    /// Define a method implemented by the primitive registered under `key` (eg. `Integer#+`).
    pub fn define_primitive(&mut self, on: ObjectId, name: &str, key: &str) -> Result<(), FatalError> {
        let primitive =
            primitives::lookup(key).ok_or_else(|| FatalError::UnknownPrimitive(key.to_string()))?;
        let name = self.intern(name);
        self.define_method(on, name, MethodKind::Primitive(primitive))?;
        Ok(())
    }

    /// Search for a method, walking up the lookup chain.
    pub fn lookup_method(
        &self,
        class: ObjectId,
        name: Interned,
    ) -> Result<Option<Rc<Method>>, FatalError> {
        let mut current = Some(class);
        while let Some(id) = current {
            let data = self.module_data(id)?;
            if let Some(method) = data.methods.borrow().get(&name) {
                return Ok(Some(method.clone()));
            }
            current = data.super_module;
        }
        Ok(None)
    }

    /// Search for the method that comes after `holder`'s in the lookup chain starting at `class`.
    pub fn lookup_super_method(
        &self,
        class: ObjectId,
        holder: ObjectId,
        name: Interned,
    ) -> Result<Option<Rc<Method>>, FatalError> {
        let mut current = Some(class);
        while let Some(id) = current {
            let data = self.module_data(id)?;
            current = data.super_module;
            if data.visible(id) == holder {
                break;
            }
        }
        match current {
            Some(next) => self.lookup_method(next, name),
            None => Ok(None),
        }
    }

    /// Get the ancestors of a class or module, itself included, in lookup order.
    pub fn ancestors(&self, class: ObjectId) -> Result<Vec<ObjectId>, FatalError> {
        let mut ancestors = Vec::new();
        let mut current = Some(class);
        while let Some(id) = current {
            let data = self.module_data(id)?;
            ancestors.push(data.visible(id));
            current = data.super_module;
        }
        Ok(ancestors)
    }

    /// Whether the value is an instance of the class, of one of its subclasses,
    /// or of a class including the module.
    pub fn is_a(&self, value: &Value, class: ObjectId) -> Result<bool, FatalError> {
        let mut current = Some(self.klass_of(value));
        while let Some(id) = current {
            let data = self.module_data(id)?;
            if data.visible(id) == class {
                return Ok(true);
            }
            current = data.super_module;
        }
        Ok(false)
    }

    /// Get the display name of a class or module.
    pub fn module_name(&self, id: ObjectId) -> String {
        let module = match self.heap.module(id) {
            Some(module) => module,
            None => return format!("#<{}>", id),
        };
        match (&module.name, module.kind) {
            (Some(name), _) => name.clone(),
            (None, ModuleKind::Singleton { owner }) => match self.heap.module(owner) {
                Some(_) => format!("#<Class:{}>", self.module_name(owner)),
                None => {
                    let class = self.class_of(&Value::Object(owner));
                    format!("#<Class:#<{}:{}>>", self.module_name(class), owner)
                }
            },
            (None, ModuleKind::Include { module }) => self.module_name(module),
            (None, ModuleKind::Module) => format!("#<Module:{}>", id),
            (None, ModuleKind::Class) => format!("#<Class:{}>", id),
        }
    }

    /// Give a name to an anonymous class or module (when first assigned to a constant).
    pub fn name_module(&mut self, id: ObjectId, name: &str) {
        if let Some(module) = self.heap.module_mut(id) {
            if module.name.is_none() && !module.is_hidden() {
                module.name = Some(name.to_string());
            }
        }
    }
}
