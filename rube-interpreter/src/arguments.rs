use std::collections::HashSet;

use rube_core::ast::{ArgumentPattern, ParameterKind};

use crate::evaluate::Evaluate;
use crate::invokable::{Eval, Outcome};
use crate::propagate;
use crate::runtime::Runtime;
use crate::scope::ScopeRef;
use crate::value::Value;

/// How strictly arguments are matched against parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindMode {
    /// The argument count must fit the pattern (methods and lambdas).
    Strict,
    /// Missing arguments become `nil`, extra ones are dropped and a lone array
    /// is spread across several parameters (blocks).
    Lenient,
}

/// Check that a parameter pattern is well-formed.
pub fn validate(params: &ArgumentPattern) -> Result<(), String> {
    let mut names = HashSet::new();
    let mut seen_splat = false;
    for (index, param) in params.iter().enumerate() {
        if !names.insert(param.name.as_str()) {
            return Err(format!("duplicated argument name `{}`", param.name));
        }
        match param.kind {
            ParameterKind::Required => {}
            ParameterKind::Optional(_) if seen_splat => {
                return Err(format!(
                    "optional argument `{}` cannot follow a splat",
                    param.name
                ));
            }
            ParameterKind::Optional(_) => {}
            ParameterKind::Splat if seen_splat => {
                return Err(format!("more than one splat argument (`*{}`)", param.name));
            }
            ParameterKind::Splat => seen_splat = true,
            ParameterKind::Block if index + 1 != params.len() => {
                return Err(format!("block argument `&{}` must come last", param.name));
            }
            ParameterKind::Block => {}
        }
    }
    Ok(())
}

/// The number of arguments a pattern expects.
///
/// Patterns accepting a variable number of arguments report `-(required + 1)`.
pub fn arity(params: &ArgumentPattern) -> i64 {
    let required = params
        .iter()
        .filter(|param| matches!(param.kind, ParameterKind::Required))
        .count() as i64;
    let variadic = params
        .iter()
        .any(|param| matches!(param.kind, ParameterKind::Optional(_) | ParameterKind::Splat));
    if variadic {
        -(required + 1)
    } else {
        required
    }
}

/// Format the argument count a pattern expects (`2`, `1+` or `1..3`).
pub fn expected_count(params: &ArgumentPattern) -> String {
    let (required, optional, splat) = counts(params);
    if splat {
        format!("{}+", required)
    } else if optional > 0 {
        format!("{}..{}", required, required + optional)
    } else {
        required.to_string()
    }
}

fn counts(params: &ArgumentPattern) -> (usize, usize, bool) {
    params
        .iter()
        .fold((0, 0, false), |(required, optional, splat), param| match param.kind {
            ParameterKind::Required => (required + 1, optional, splat),
            ParameterKind::Optional(_) => (required, optional + 1, splat),
            ParameterKind::Splat => (required, optional, true),
            ParameterKind::Block => (required, optional, splat),
        })
}

impl Runtime {
    /// Bind call arguments to parameters, within the callee's fresh scope.
    ///
    /// Default values are evaluated lazily, in the callee's scope, once the
    /// parameters before them have been bound.
    pub fn bind_arguments(
        &mut self,
        params: &ArgumentPattern,
        mut args: Vec<Value>,
        block: Option<Value>,
        scope: &ScopeRef,
        mode: BindMode,
    ) -> Eval {
        let (required, optional, splat) = counts(params);
        let positional = params
            .iter()
            .filter(|param| !matches!(param.kind, ParameterKind::Block))
            .count();

        match mode {
            BindMode::Strict => {
                if args.len() < required || (!splat && args.len() > required + optional) {
                    return self.raise_argument_error(format!(
                        "wrong number of arguments (given {}, expected {})",
                        args.len(),
                        expected_count(params)
                    ));
                }
            }
            BindMode::Lenient => {
                if args.len() == 1 && positional > 1 {
                    if let Some(values) = self.array_of(&args[0]) {
                        args = values;
                    }
                }
                if args.len() < required {
                    args.resize(required, Value::Nil);
                }
                if !splat && args.len() > required + optional {
                    args.truncate(required + optional);
                }
            }
        }

        let mut spare_optionals = args.len().saturating_sub(required);
        let mut remaining_required = required;
        let mut args = args.into_iter();

        for param in params.iter() {
            let name = self.intern(&param.name);
            let value = match &param.kind {
                ParameterKind::Required => {
                    remaining_required -= 1;
                    args.next().unwrap_or(Value::Nil)
                }
                ParameterKind::Optional(default) => {
                    if spare_optionals > 0 {
                        spare_optionals -= 1;
                        args.next().unwrap_or(Value::Nil)
                    } else {
                        propagate!(default.evaluate(self, scope))
                    }
                }
                ParameterKind::Splat => {
                    let claimed = args.len().saturating_sub(remaining_required);
                    let values: Vec<Value> = args.by_ref().take(claimed).collect();
                    self.new_array(values)
                }
                ParameterKind::Block => block.clone().unwrap_or(Value::Nil),
            };
            scope.borrow_mut().define(name, value);
        }

        Ok(Outcome::Value(Value::Nil))
    }
}
