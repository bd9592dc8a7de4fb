use crate::class::ModuleKind;
use crate::error::FatalError;
use crate::expect_args;
use crate::heap::{ObjectId, Payload};
use crate::invokable::{Eval, Outcome};
use crate::primitives::module::module_receiver;
use crate::primitives::PrimitiveFn;
use crate::propagate;
use crate::runtime::Runtime;
use crate::value::Value;

pub static INSTANCE_PRIMITIVES: &[(&str, PrimitiveFn)] = &[
    ("new", self::new),
    ("allocate", self::allocate),
    ("superclass", self::superclass),
];
pub static CLASS_PRIMITIVES: &[(&str, PrimitiveFn)] = &[("new", self::new_class)];

/// Allocate an uninitialized instance of a class, with the payload its built-in ancestor needs.
pub(crate) fn allocate_instance(runtime: &mut Runtime, class: ObjectId) -> Eval {
    if let ModuleKind::Singleton { .. } = runtime.module_data(class)?.kind {
        return runtime.raise_type_error("can't create instance of singleton class");
    }

    let core = &runtime.core;
    let immediates = [
        core.nil_class,
        core.true_class,
        core.false_class,
        core.integer,
        core.float,
        core.symbol,
        core.proc,
        core.method,
        core.class,
    ];
    let (string, array) = (core.string, core.array);

    let ancestors = runtime.ancestors(class)?;
    if let Some(builtin) = immediates.iter().find(|id| ancestors.contains(id)) {
        let message = format!("allocator undefined for {}", runtime.module_name(*builtin));
        return runtime.raise_type_error(message);
    }
    let payload = if ancestors.contains(&string) {
        Payload::String(String::new())
    } else if ancestors.contains(&array) {
        Payload::Array(Vec::new())
    } else {
        Payload::Plain
    };

    Ok(Outcome::Value(Value::Object(runtime.heap.allocate(class, payload))))
}

fn new(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, block: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Class#new";

    let class = module_receiver(SIGNATURE, runtime, &receiver)?;
    let instance = propagate!(allocate_instance(runtime, class));
    let initialize = runtime.intern("initialize");
    propagate!(runtime.dispatch(instance.clone(), initialize, args, block));

    Ok(Outcome::Value(instance))
}

fn allocate(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Class#allocate";

    expect_args!(runtime, SIGNATURE, args, []);

    let class = module_receiver(SIGNATURE, runtime, &receiver)?;
    allocate_instance(runtime, class)
}

fn superclass(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Class#superclass";

    expect_args!(runtime, SIGNATURE, args, []);

    let class = module_receiver(SIGNATURE, runtime, &receiver)?;
    match runtime.superclass_of(class)? {
        Some(superclass) => Ok(Outcome::Value(Value::Object(superclass))),
        None => Ok(Outcome::Value(Value::Nil)),
    }
}

/// Get the superclass argument of `Class.new`, or raise a `TypeError`.
fn expect_superclass(
    runtime: &mut Runtime,
    value: Option<Value>,
) -> Result<Result<ObjectId, Outcome>, FatalError> {
    let value = match value {
        Some(value) => value,
        None => return Ok(Ok(runtime.core.object)),
    };
    let kind = value
        .as_object()
        .and_then(|id| runtime.heap.module(id))
        .map(|module| module.kind);
    match (value.as_object(), kind) {
        (Some(id), Some(ModuleKind::Class)) => Ok(Ok(id)),
        (_, Some(ModuleKind::Singleton { .. })) => runtime
            .raise_type_error("can't make subclass of singleton class")
            .map(Err),
        _ => {
            let message = format!(
                "superclass must be a Class ({} given)",
                runtime.module_name(runtime.class_of(&value))
            );
            runtime.raise_type_error(message).map(Err)
        }
    }
}

fn new_class(runtime: &mut Runtime, _: Value, args: Vec<Value>, block: Option<Value>) -> Eval {
    if args.len() > 1 {
        return runtime.raise_argument_error(format!(
            "wrong number of arguments (given {}, expected 0..1)",
            args.len()
        ));
    }

    let superclass = match expect_superclass(runtime, args.into_iter().next())? {
        Ok(superclass) => superclass,
        Err(outcome) => return Ok(outcome),
    };
    let class = Value::Object(runtime.new_class(None, superclass)?);
    if let Some(block) = block {
        propagate!(runtime.call_block_with_self(&block, class.clone(), vec![class.clone()]));
    }

    Ok(Outcome::Value(class))
}
