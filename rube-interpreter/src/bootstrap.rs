use anyhow::anyhow;
use log::debug;

use crate::class::{ModuleData, ModuleKind};
use crate::config::Config;
use crate::error::FatalError;
use crate::heap::{Heap, ObjectId, Payload};
use crate::interner::Interner;
use crate::primitives;
use crate::runtime::{CoreClasses, Runtime};
use crate::scope::{FrameId, Scope};
use crate::value::Value;

/// Build a runtime: the circular core hierarchy first, then the built-in classes and their primitives.
pub fn bootstrap(config: Config) -> anyhow::Result<Runtime> {
    let mut heap = Heap::new();

    let object = heap.allocate(
        ObjectId::UNSET,
        Payload::Module(ModuleData::class(Some("Object"), None)),
    );
    let module = heap.allocate(
        ObjectId::UNSET,
        Payload::Module(ModuleData::class(Some("Module"), Some(object))),
    );
    let class = heap.allocate(
        ObjectId::UNSET,
        Payload::Module(ModuleData::class(Some("Class"), Some(module))),
    );
    let mut runtime = Runtime {
        interner: Interner::with_capacity(512),
        heap,
        core: CoreClasses::roots(object, module, class),
        config,
        main: Value::Nil,
        constants: Default::default(),
        top_scope: Scope::root(Value::Nil, Some(FrameId::TOP_LEVEL)),
        call_stack: Vec::new(),
        eval_stack: Vec::new(),
        next_frame: FrameId::TOP_LEVEL.0,
    };

    for id in [object, module, class] {
        if let Err(err) = runtime.create_singleton_class(id) {
            return Err(anyhow!(
                "could not create the metaclass of {}: {}",
                runtime.module_name(id),
                err
            ));
        }
    }
    debug!("bootstrapped the metaclass graph");

    define_core_classes(&mut runtime)
        .map_err(|err| anyhow!("could not define the core classes: {}", err))?;

    primitives::install(&mut runtime)
        .map_err(|err| anyhow!("could not install primitives: {}", err))?;
    debug!("installed primitives");

    let main = runtime.new_object(object);
    runtime.main = main.clone();
    runtime.top_scope = Scope::root(main, Some(FrameId::TOP_LEVEL));

    verify(&runtime).map_err(|err| anyhow!("core hierarchy is inconsistent: {}", err))?;
    debug!("bootstrap complete ({} objects)", runtime.heap.len());

    Ok(runtime)
}

fn define_core_classes(runtime: &mut Runtime) -> Result<(), FatalError> {
    let core = runtime.core.clone();
    runtime.set_constant("Object", Value::Object(core.object));
    runtime.set_constant("Module", Value::Object(core.module));
    runtime.set_constant("Class", Value::Object(core.class));

    let kernel = define_module(runtime, "Kernel")?;
    runtime.core.kernel = kernel;
    runtime.include_module(core.object, kernel)?;
    let comparable = define_module(runtime, "Comparable")?;
    runtime.core.comparable = comparable;

    runtime.core.nil_class = define_class(runtime, "NilClass", core.object)?;
    runtime.core.true_class = define_class(runtime, "TrueClass", core.object)?;
    runtime.core.false_class = define_class(runtime, "FalseClass", core.object)?;
    runtime.core.integer = define_class(runtime, "Integer", core.object)?;
    runtime.core.float = define_class(runtime, "Float", core.object)?;
    runtime.core.string = define_class(runtime, "String", core.object)?;
    runtime.core.symbol = define_class(runtime, "Symbol", core.object)?;
    runtime.core.array = define_class(runtime, "Array", core.object)?;
    runtime.core.proc = define_class(runtime, "Proc", core.object)?;
    runtime.core.method = define_class(runtime, "Method", core.object)?;

    for class in [runtime.core.integer, runtime.core.float, runtime.core.string] {
        runtime.include_module(class, comparable)?;
    }

    let exception = define_class(runtime, "Exception", core.object)?;
    runtime.core.exception = exception;
    let script_error = define_class(runtime, "ScriptError", exception)?;
    runtime.core.script_error = script_error;
    runtime.core.syntax_error = define_class(runtime, "SyntaxError", script_error)?;
    let standard_error = define_class(runtime, "StandardError", exception)?;
    runtime.core.standard_error = standard_error;
    runtime.core.runtime_error = define_class(runtime, "RuntimeError", standard_error)?;
    runtime.core.argument_error = define_class(runtime, "ArgumentError", standard_error)?;
    runtime.core.type_error = define_class(runtime, "TypeError", standard_error)?;
    let name_error = define_class(runtime, "NameError", standard_error)?;
    runtime.core.name_error = name_error;
    runtime.core.no_method_error = define_class(runtime, "NoMethodError", name_error)?;
    runtime.core.zero_division_error = define_class(runtime, "ZeroDivisionError", standard_error)?;
    runtime.core.index_error = define_class(runtime, "IndexError", standard_error)?;
    runtime.core.local_jump_error = define_class(runtime, "LocalJumpError", standard_error)?;

    Ok(())
}

fn define_class(runtime: &mut Runtime, name: &str, superclass: ObjectId) -> Result<ObjectId, FatalError> {
    let id = runtime.new_class(Some(name), superclass)?;
    runtime.set_constant(name, Value::Object(id));
    Ok(id)
}

fn define_module(runtime: &mut Runtime, name: &str) -> Result<ObjectId, FatalError> {
    let id = runtime.new_module(Some(name))?;
    runtime.set_constant(name, Value::Object(id));
    Ok(id)
}

/// Check the invariants of the core hierarchy: every object has a class, and metaclasses parallel superclasses.
fn verify(runtime: &Runtime) -> Result<(), FatalError> {
    if let Some((id, _)) = runtime.heap.iter().find(|(_, object)| object.klass.is_unset()) {
        return Err(FatalError::Bootstrap(format!("object {} has no class", id)));
    }

    for value in runtime.constants().values() {
        let id = match value.as_object() {
            Some(id) => id,
            None => continue,
        };
        let kind = match runtime.heap.module(id) {
            Some(module) => module.kind,
            None => continue,
        };
        let metaclass = runtime.existing_singleton_class(id).ok_or_else(|| {
            FatalError::Bootstrap(format!("{} has no metaclass", runtime.module_name(id)))
        })?;
        let expected = match (kind, runtime.superclass_of(id)?) {
            (ModuleKind::Class, Some(superclass)) => runtime.existing_singleton_class(superclass),
            (ModuleKind::Class, None) => Some(runtime.core.class),
            (ModuleKind::Module, _) => Some(runtime.core.module),
            _ => continue,
        };
        if runtime.superclass_of(metaclass)? != expected {
            return Err(FatalError::Bootstrap(format!(
                "the metaclass of {} does not parallel its superclass",
                runtime.module_name(id)
            )));
        }
    }

    Ok(())
}
