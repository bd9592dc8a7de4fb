use crate::error::FatalError;
use crate::expect_args;
use crate::heap::Payload;
use crate::invokable::{Eval, Invoke, Outcome};
use crate::lambda::{Lambda, LambdaBody};
use crate::method::BoundMethod;
use crate::primitives::PrimitiveFn;
use crate::runtime::Runtime;
use crate::value::Value;

pub static INSTANCE_PRIMITIVES: &[(&str, PrimitiveFn)] = &[
    ("call", self::call),
    ("name", self::name),
    ("owner", self::owner),
    ("receiver", self::receiver),
    ("arity", self::arity),
    ("to_proc", self::to_proc),
];

fn bound_method(signature: &str, runtime: &Runtime, receiver: &Value) -> Result<BoundMethod, FatalError> {
    receiver
        .as_object()
        .and_then(|id| runtime.heap.bound_method(id))
        .cloned()
        .ok_or_else(|| super::wrong_receiver(signature, runtime, receiver))
}

fn call(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, block: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Method#call";

    let bound = bound_method(SIGNATURE, runtime, &receiver)?;
    bound.method.invoke(runtime, bound.receiver, args, block)
}

fn name(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Method#name";

    expect_args!(runtime, SIGNATURE, args, []);

    let bound = bound_method(SIGNATURE, runtime, &receiver)?;
    Ok(Outcome::Value(Value::Symbol(bound.method.name)))
}

fn owner(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Method#owner";

    expect_args!(runtime, SIGNATURE, args, []);

    let bound = bound_method(SIGNATURE, runtime, &receiver)?;
    let holder = bound.method.holder;
    let owner = runtime.module_data(holder)?.visible(holder);
    Ok(Outcome::Value(Value::Object(owner)))
}

fn receiver(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Method#receiver";

    expect_args!(runtime, SIGNATURE, args, []);

    let bound = bound_method(SIGNATURE, runtime, &receiver)?;
    Ok(Outcome::Value(bound.receiver))
}

fn arity(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Method#arity";

    expect_args!(runtime, SIGNATURE, args, []);

    let bound = bound_method(SIGNATURE, runtime, &receiver)?;
    Ok(Outcome::Value(Value::Integer(bound.method.arity())))
}

fn to_proc(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Method#to_proc";

    expect_args!(runtime, SIGNATURE, args, []);

    let bound = bound_method(SIGNATURE, runtime, &receiver)?;
    let lambda = Lambda {
        body: LambdaBody::Method(bound),
        is_lambda: true,
        location: runtime.current_location(),
    };
    let id = runtime.heap.allocate(runtime.core.proc, Payload::Lambda(lambda));
    Ok(Outcome::Value(Value::Object(id)))
}
