use std::rc::Rc;

use indexmap::IndexSet;

use rube_core::build;

use crate::error::FatalError;
use crate::expect_args;
use crate::heap::ObjectId;
use crate::invokable::{Eval, Outcome};
use crate::method::{MethodBody, MethodKind};
use crate::primitives::PrimitiveFn;
use crate::propagate;
use crate::runtime::Runtime;
use crate::value::Value;

pub static INSTANCE_PRIMITIVES: &[(&str, PrimitiveFn)] = &[
    ("name", self::name),
    ("to_s", self::to_s),
    ("inspect", self::to_s),
    ("include", self::include),
    ("include?", self::includes),
    ("ancestors", self::ancestors),
    ("instance_methods", self::instance_methods),
    ("method_defined?", self::method_defined),
    ("attr_reader", self::attr_reader),
    ("attr_writer", self::attr_writer),
    ("attr_accessor", self::attr_accessor),
    ("const_get", self::const_get),
    ("===", self::case_eq),
    ("define_method", self::define_method),
];
pub static CLASS_PRIMITIVES: &[(&str, PrimitiveFn)] = &[("new", self::new)];

/// Get the class or module a primitive was invoked on.
pub(crate) fn module_receiver(
    signature: &str,
    runtime: &Runtime,
    receiver: &Value,
) -> Result<ObjectId, FatalError> {
    match receiver.as_object() {
        Some(id) if runtime.is_module_like(receiver) => Ok(id),
        _ => Err(super::wrong_receiver(signature, runtime, receiver)),
    }
}

fn name(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Module#name";

    expect_args!(runtime, SIGNATURE, args, []);

    let id = module_receiver(SIGNATURE, runtime, &receiver)?;
    match runtime.module_data(id)?.name.clone() {
        Some(name) => Ok(Outcome::Value(runtime.new_string(name))),
        None => Ok(Outcome::Value(Value::Nil)),
    }
}

fn to_s(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Module#to_s";

    expect_args!(runtime, SIGNATURE, args, []);

    let id = module_receiver(SIGNATURE, runtime, &receiver)?;
    let name = runtime.module_name(id);
    Ok(Outcome::Value(runtime.new_string(name)))
}

fn include(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Module#include";

    let target = module_receiver(SIGNATURE, runtime, &receiver)?;
    if args.is_empty() {
        return runtime.raise_argument_error("wrong number of arguments (given 0, expected 1+)");
    }

    for module in args.iter().rev() {
        let id = match module.as_object() {
            Some(id) if runtime.is_plain_module(module) => id,
            _ => {
                let message = format!(
                    "wrong argument type {} (expected Module)",
                    runtime.module_name(runtime.class_of(module))
                );
                return runtime.raise_type_error(message);
            }
        };
        if id == target || runtime.ancestors(id)?.contains(&target) {
            return runtime.raise_argument_error("cyclic include detected");
        }
        runtime.include_module(target, id)?;
    }

    Ok(Outcome::Value(receiver))
}

fn includes(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Module#include?";

    expect_args!(runtime, SIGNATURE, args, [
        module => module,
    ]);

    let target = module_receiver(SIGNATURE, runtime, &receiver)?;
    let id = match module.as_object() {
        Some(id) if runtime.is_plain_module(&module) => id,
        _ => {
            let message = format!(
                "wrong argument type {} (expected Module)",
                runtime.module_name(runtime.class_of(&module))
            );
            return runtime.raise_type_error(message);
        }
    };
    let included = id != target && runtime.ancestors(target)?.contains(&id);
    Ok(Outcome::Value(Value::Boolean(included)))
}

fn ancestors(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Module#ancestors";

    expect_args!(runtime, SIGNATURE, args, []);

    let id = module_receiver(SIGNATURE, runtime, &receiver)?;
    let ancestors = runtime
        .ancestors(id)?
        .into_iter()
        .map(Value::Object)
        .collect();
    Ok(Outcome::Value(runtime.new_array(ancestors)))
}

fn instance_methods(
    runtime: &mut Runtime,
    receiver: Value,
    args: Vec<Value>,
    _: Option<Value>,
) -> Eval {
    const SIGNATURE: &str = "Module#instance_methods";

    let id = module_receiver(SIGNATURE, runtime, &receiver)?;
    let inherited = match args.as_slice() {
        [] => true,
        [flag] => flag.is_truthy(),
        _ => {
            return runtime.raise_argument_error(format!(
                "wrong number of arguments (given {}, expected 0..1)",
                args.len()
            ))
        }
    };

    let chain = if inherited {
        runtime.ancestors(id)?
    } else {
        vec![id]
    };
    let mut names = IndexSet::new();
    for module in chain {
        names.extend(runtime.module_data(module)?.methods.borrow().keys().copied());
    }

    let names = names.into_iter().map(Value::Symbol).collect();
    Ok(Outcome::Value(runtime.new_array(names)))
}

fn method_defined(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Module#method_defined?";

    expect_args!(runtime, SIGNATURE, args, [
        name => name,
    ]);

    let id = module_receiver(SIGNATURE, runtime, &receiver)?;
    let name = match super::name_of(runtime, &name) {
        Some(name) => runtime.intern(&name),
        None => return super::not_a_name(runtime, &name),
    };
    let defined = runtime.lookup_method(id, name)?.is_some();
    Ok(Outcome::Value(Value::Boolean(defined)))
}

/// Which accessors `attr_*` synthesizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Accessors {
    Reader,
    Writer,
    Both,
}

fn define_accessors(
    signature: &str,
    runtime: &mut Runtime,
    receiver: Value,
    args: Vec<Value>,
    accessors: Accessors,
) -> Eval {
    let id = module_receiver(signature, runtime, &receiver)?;

    let mut defined = Vec::new();
    for arg in args {
        let name = match super::name_of(runtime, &arg) {
            Some(name) => name,
            None => return super::not_a_name(runtime, &arg),
        };
        let ivar = format!("@{}", name);

        if accessors != Accessors::Writer {
            let method = runtime.intern(&name);
            let body = MethodBody {
                params: Rc::new(Vec::new()),
                body: Rc::new(build::ivar(&ivar)),
            };
            runtime.define_method(id, method, MethodKind::Defined(body))?;
            defined.push(Value::Symbol(method));
        }
        if accessors != Accessors::Reader {
            let method = runtime.intern(&format!("{}=", name));
            let body = MethodBody {
                params: Rc::new(vec![build::required("value")]),
                body: Rc::new(build::ivar_assign(&ivar, build::local("value"))),
            };
            runtime.define_method(id, method, MethodKind::Defined(body))?;
            defined.push(Value::Symbol(method));
        }
    }

    Ok(Outcome::Value(runtime.new_array(defined)))
}

fn attr_reader(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    define_accessors("Module#attr_reader", runtime, receiver, args, Accessors::Reader)
}

fn attr_writer(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    define_accessors("Module#attr_writer", runtime, receiver, args, Accessors::Writer)
}

fn attr_accessor(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    define_accessors("Module#attr_accessor", runtime, receiver, args, Accessors::Both)
}

fn const_get(runtime: &mut Runtime, _: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Module#const_get";

    expect_args!(runtime, SIGNATURE, args, [
        name => name,
    ]);

    let name = match super::name_of(runtime, &name) {
        Some(name) => name,
        None => return super::not_a_name(runtime, &name),
    };
    match runtime.constant(&name) {
        Some(value) => Ok(Outcome::Value(value)),
        None => {
            let message = format!("uninitialized constant {}", name);
            let class = runtime.core.name_error;
            let name = runtime.intern(&name);
            runtime.raise_named(class, message, name)
        }
    }
}

fn case_eq(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Module#===";

    expect_args!(runtime, SIGNATURE, args, [
        value => value,
    ]);

    let id = module_receiver(SIGNATURE, runtime, &receiver)?;
    Ok(Outcome::Value(Value::Boolean(runtime.is_a(&value, id)?)))
}

fn define_method(
    runtime: &mut Runtime,
    receiver: Value,
    args: Vec<Value>,
    block: Option<Value>,
) -> Eval {
    const SIGNATURE: &str = "Module#define_method";

    let target = module_receiver(SIGNATURE, runtime, &receiver)?;
    let (name, body) = match (args.len(), block) {
        (1, Some(block)) => (args[0].clone(), block),
        (2, _) => (args[0].clone(), args[1].clone()),
        (1, None) => return runtime.raise_argument_error("tried to create Proc object without a block"),
        (given, _) => {
            return runtime.raise_argument_error(format!(
                "wrong number of arguments (given {}, expected 1..2)",
                given
            ))
        }
    };
    let name = match super::name_of(runtime, &name) {
        Some(name) => runtime.intern(&name),
        None => return super::not_a_name(runtime, &name),
    };

    let id = body.as_object();
    let kind = if let Some(lambda) = id.and_then(|id| runtime.heap.lambda(id)) {
        MethodKind::Closure(lambda.clone())
    } else if let Some(bound) = id.and_then(|id| runtime.heap.bound_method(id)) {
        let (holder, kind) = (bound.method.holder, bound.method.kind.clone());
        if !runtime.ancestors(target)?.contains(&holder) {
            let message = format!(
                "bind argument must be a subclass of {}",
                runtime.module_name(holder)
            );
            return runtime.raise_type_error(message);
        }
        kind
    } else {
        let message = format!(
            "wrong argument type {} (expected Proc/Method)",
            runtime.module_name(runtime.class_of(&body))
        );
        return runtime.raise_type_error(message);
    };

    runtime.define_method(target, name, kind)?;
    Ok(Outcome::Value(Value::Symbol(name)))
}

fn new(runtime: &mut Runtime, _: Value, args: Vec<Value>, block: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Module.new";

    expect_args!(runtime, SIGNATURE, args, []);

    let module = Value::Object(runtime.new_module(None)?);
    if let Some(block) = block {
        propagate!(runtime.call_block_with_self(&block, module.clone(), vec![module.clone()]));
    }
    Ok(Outcome::Value(module))
}
