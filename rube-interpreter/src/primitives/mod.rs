/// Primitives for the **Array** class.
pub mod array;
/// Primitives for the **NilClass**, **TrueClass** and **FalseClass** classes.
pub mod boolean;
/// Primitives for the **Class** class.
pub mod class;
/// Primitives for the **Comparable** module.
pub mod comparable;
/// Primitives for the **Exception** class and its subclasses.
pub mod exception;
/// Primitives for the **Float** class.
pub mod float;
/// Primitives for the **Integer** class.
pub mod integer;
/// Primitives for the **Kernel** module.
pub mod kernel;
/// Primitives for the **Method** class.
pub mod method;
/// Primitives for the **Module** class.
pub mod module;
/// Primitives for the **Proc** class.
pub mod proc;
/// Primitives for the **String** class.
pub mod string;
/// Primitives for the **Symbol** class.
pub mod symbol;

use crate::error::FatalError;
use crate::invokable::Eval;
use crate::method::Primitive;
use crate::runtime::Runtime;
use crate::value::Value;

/// A interpreter primitive (just a bare function pointer).
pub type PrimitiveFn =
    fn(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, block: Option<Value>) -> Eval;

/// Macro for checking and destructuring arguments passed to primitives.
///
/// A wrong argument count raises `ArgumentError`, an argument not matching its pattern raises `TypeError`.
#[macro_export]
macro_rules! expect_args {
    (@count) => { 0usize };
    (@count $head:pat $(, $tail:pat)*) => { 1usize + $crate::expect_args!(@count $($tail),*) };
    ($runtime:expr, $signature:expr, $args:expr, [ $( $ptrn:pat $( => $name:ident )? ),* $(,)? ]) => {
        #[allow(unused_mut)]
        let ($($(mut $name,)?)*) = {
            let expected = $crate::expect_args!(@count $($ptrn),*);
            if $args.len() != expected {
                ::log::debug!("'{}': called with {} arguments", $signature, $args.len());
                return $runtime.raise_argument_error(format!(
                    "wrong number of arguments (given {}, expected {})",
                    $args.len(),
                    expected,
                ));
            }
            #[allow(unused_variables, unused_mut)]
            let mut iter = $args.into_iter();
            $(#[allow(unreachable_patterns)]
            $(let $name =)? match iter.next() {
                Some($ptrn) => {$($name)?},
                _ => return $runtime.raise_type_error(format!("'{}': wrong argument type", $signature)),
            };)*
            ($($($name,)?)*)
        };
    };
}

/// Every class or module that has primitives, in installation order.
pub static OWNERS: &[&str] = &[
    "Kernel",
    "Module",
    "Class",
    "Comparable",
    "NilClass",
    "TrueClass",
    "FalseClass",
    "Integer",
    "Float",
    "String",
    "Symbol",
    "Array",
    "Proc",
    "Method",
    "Exception",
    "NameError",
];

pub fn get_class_primitives(owner: &str) -> Option<&'static [(&'static str, PrimitiveFn)]> {
    match owner {
        "Array" => Some(self::array::CLASS_PRIMITIVES),
        "Class" => Some(self::class::CLASS_PRIMITIVES),
        "Exception" => Some(self::exception::CLASS_PRIMITIVES),
        "Module" => Some(self::module::CLASS_PRIMITIVES),
        _ if OWNERS.contains(&owner) => Some(&[]),
        _ => None,
    }
}

pub fn get_instance_primitives(owner: &str) -> Option<&'static [(&'static str, PrimitiveFn)]> {
    match owner {
        "Array" => Some(self::array::INSTANCE_PRIMITIVES),
        "Class" => Some(self::class::INSTANCE_PRIMITIVES),
        "Comparable" => Some(self::comparable::INSTANCE_PRIMITIVES),
        "Exception" => Some(self::exception::INSTANCE_PRIMITIVES),
        "FalseClass" => Some(self::boolean::FALSE_PRIMITIVES),
        "Float" => Some(self::float::INSTANCE_PRIMITIVES),
        "Integer" => Some(self::integer::INSTANCE_PRIMITIVES),
        "Kernel" => Some(self::kernel::INSTANCE_PRIMITIVES),
        "Method" => Some(self::method::INSTANCE_PRIMITIVES),
        "Module" => Some(self::module::INSTANCE_PRIMITIVES),
        "NameError" => Some(self::exception::NAME_ERROR_PRIMITIVES),
        "NilClass" => Some(self::boolean::NIL_PRIMITIVES),
        "Proc" => Some(self::proc::INSTANCE_PRIMITIVES),
        "String" => Some(self::string::INSTANCE_PRIMITIVES),
        "Symbol" => Some(self::symbol::INSTANCE_PRIMITIVES),
        "TrueClass" => Some(self::boolean::TRUE_PRIMITIVES),
        _ => None,
    }
}

/// Search the registry for a primitive, given its key (`Owner#name` or `Owner.name`).
pub fn lookup(key: &str) -> Option<Primitive> {
    let separator = key.find(|ch| ch == '#' || ch == '.')?;
    let (owner, rest) = key.split_at(separator);
    let class_side = rest.starts_with('.');
    let name = &rest[1..];

    let owner = OWNERS.iter().copied().find(|candidate| *candidate == owner)?;
    let table = if class_side {
        get_class_primitives(owner)?
    } else {
        get_instance_primitives(owner)?
    };
    table
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(name, function)| Primitive {
            owner,
            name,
            class_side,
            function: *function,
        })
}

/// Define every registered primitive on its class or module (class-side ones on the metaclass).
pub fn install(runtime: &mut Runtime) -> Result<(), FatalError> {
    for owner in OWNERS {
        let id = match runtime.constant(owner).and_then(|value| value.as_object()) {
            Some(id) => id,
            None => {
                return Err(FatalError::Bootstrap(format!(
                    "primitives are registered for `{}`, which does not exist",
                    owner
                )))
            }
        };
        for (name, _) in get_instance_primitives(owner).unwrap_or_default() {
            runtime.define_primitive(id, name, &format!("{}#{}", owner, name))?;
        }
        let class_primitives = get_class_primitives(owner).unwrap_or_default();
        if !class_primitives.is_empty() {
            let metaclass = runtime.metaclass_of(id)?;
            for (name, _) in class_primitives {
                runtime.define_primitive(metaclass, name, &format!("{}.{}", owner, name))?;
            }
        }
    }
    Ok(())
}

/// Get the name designated by a symbol or a string argument.
pub(crate) fn name_of(runtime: &Runtime, value: &Value) -> Option<String> {
    match value {
        Value::Symbol(symbol) => Some(runtime.lookup_symbol(*symbol).to_string()),
        _ => runtime.string_of(value),
    }
}

/// Raise the error for an argument that should have been a symbol or a string.
pub(crate) fn not_a_name(runtime: &mut Runtime, value: &Value) -> Eval {
    let message = format!("{} is not a symbol nor a string", runtime.inspect(value));
    runtime.raise_type_error(message)
}

/// Raise the error for an operand a numeric primitive cannot work with.
pub(crate) fn coercion_error(runtime: &mut Runtime, value: &Value, target: &str) -> Eval {
    let described = match value {
        Value::Nil | Value::Boolean(_) => runtime.inspect(value),
        _ => runtime.module_name(runtime.class_of(value)),
    };
    runtime.raise_type_error(format!("{} can't be coerced into {}", described, target))
}

/// Raise the error for a comparison between values that cannot be ordered.
pub(crate) fn comparison_error(runtime: &mut Runtime, receiver: &Value, other: &Value) -> Eval {
    let message = format!(
        "comparison of {} with {} failed",
        runtime.module_name(runtime.class_of(receiver)),
        runtime.inspect(other)
    );
    runtime.raise_argument_error(message)
}

/// The failure for a primitive invoked on a receiver it was not registered for.
pub(crate) fn wrong_receiver(signature: &str, runtime: &Runtime, receiver: &Value) -> FatalError {
    FatalError::PrimitiveContract {
        key: signature.to_string(),
        message: format!("invoked on {}", runtime.inspect(receiver)),
    }
}

/// Raise the error for a primitive that needs a block but was not given one.
pub(crate) fn no_block(runtime: &mut Runtime) -> Eval {
    let class = runtime.core.local_jump_error;
    runtime.raise(class, "no block given (yield)")
}
