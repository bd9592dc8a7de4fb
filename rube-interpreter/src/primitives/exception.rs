use crate::expect_args;
use crate::invokable::{Eval, Outcome};
use crate::primitives::PrimitiveFn;
use crate::runtime::Runtime;
use crate::value::Value;
use crate::{proceed, propagate};

pub static INSTANCE_PRIMITIVES: &[(&str, PrimitiveFn)] = &[
    ("initialize", self::initialize),
    ("message", self::message),
    ("to_s", self::to_s),
    ("backtrace", self::backtrace),
    ("full_message", self::full_message),
    ("inspect", self::inspect),
];

pub static CLASS_PRIMITIVES: &[(&str, PrimitiveFn)] = &[("exception", self::exception)];

pub static NAME_ERROR_PRIMITIVES: &[(&str, PrimitiveFn)] = &[
    ("initialize", self::initialize_name_error),
    ("name", self::name),
];

fn initialize(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    let message = match args.as_slice() {
        [] => Value::Nil,
        [message] => message.clone(),
        _ => {
            return runtime.raise_argument_error(format!(
                "wrong number of arguments (given {}, expected 0..1)",
                args.len()
            ))
        }
    };

    let field = runtime.intern("@message");
    runtime.ivar_set(&receiver, field, message);
    Ok(Outcome::Value(Value::Nil))
}

fn initialize_name_error(
    runtime: &mut Runtime,
    receiver: Value,
    args: Vec<Value>,
    _: Option<Value>,
) -> Eval {
    let (message, name) = match args.as_slice() {
        [] => (Value::Nil, Value::Nil),
        [message] => (message.clone(), Value::Nil),
        [message, name] => (message.clone(), name.clone()),
        _ => {
            return runtime.raise_argument_error(format!(
                "wrong number of arguments (given {}, expected 0..2)",
                args.len()
            ))
        }
    };

    let field = runtime.intern("@message");
    runtime.ivar_set(&receiver, field, message);
    let field = runtime.intern("@name");
    runtime.ivar_set(&receiver, field, name);
    Ok(Outcome::Value(Value::Nil))
}

fn message(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Exception#message";

    expect_args!(runtime, SIGNATURE, args, []);

    runtime.send(receiver, "to_s", Vec::new())
}

fn to_s(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Exception#to_s";

    expect_args!(runtime, SIGNATURE, args, []);

    let message = runtime.exception_message(&receiver);
    Ok(Outcome::Value(runtime.new_string(message)))
}

fn backtrace(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Exception#backtrace";

    expect_args!(runtime, SIGNATURE, args, []);

    let field = runtime.intern("@__backtrace");
    Ok(Outcome::Value(runtime.ivar_get(&receiver, field)))
}

/// Get the message of an exception through `message`.
fn described_message(runtime: &mut Runtime, receiver: &Value) -> Eval {
    let message = propagate!(runtime.send(receiver.clone(), "message", Vec::new()));
    let message = proceed!(runtime.stringify(&message));
    Ok(Outcome::Value(runtime.new_string(message)))
}

fn full_message(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Exception#full_message";

    expect_args!(runtime, SIGNATURE, args, []);

    let message = propagate!(described_message(runtime, &receiver));
    let message = runtime.string_of(&message).unwrap_or_default();
    let class = runtime.module_name(runtime.class_of(&receiver));

    let field = runtime.intern("@__backtrace");
    let lines: Vec<String> = runtime
        .array_of(&runtime.ivar_get(&receiver, field))
        .unwrap_or_default()
        .iter()
        .filter_map(|line| runtime.string_of(line))
        .collect();

    let mut full = match lines.first() {
        Some(origin) => format!("{}: {} ({})", origin, message, class),
        None => format!("{} ({})", message, class),
    };
    for line in lines.iter().skip(1) {
        full.push_str("\n\tfrom ");
        full.push_str(line);
    }
    Ok(Outcome::Value(runtime.new_string(full)))
}

fn inspect(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Exception#inspect";

    expect_args!(runtime, SIGNATURE, args, []);

    let message = propagate!(runtime.send(receiver.clone(), "to_s", Vec::new()));
    let message = proceed!(runtime.stringify(&message));
    let class = runtime.module_name(runtime.class_of(&receiver));

    let inspected = if message.is_empty() || message == class {
        class
    } else {
        format!("#<{}: {}>", class, message)
    };
    Ok(Outcome::Value(runtime.new_string(inspected)))
}

fn exception(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    runtime.send(receiver, "new", args)
}

fn name(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "NameError#name";

    expect_args!(runtime, SIGNATURE, args, []);

    let field = runtime.intern("@name");
    Ok(Outcome::Value(runtime.ivar_get(&receiver, field)))
}
