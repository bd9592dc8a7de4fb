use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;

use rube_core::ast::Node;
use rube_core::build::*;
use rube_core::syntax::{Parse, SyntaxError};
use rube_interpreter::{Config, FatalError, Output, Runtime, RuntimeError, Value};

fn setup_runtime() -> (Runtime, Rc<RefCell<String>>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let (output, buffer) = Output::buffer();
    let config = Config::default().with_output(output);
    let runtime = Runtime::with_config(config).expect("could not bootstrap runtime");
    (runtime, buffer)
}

#[test]
fn literals_evaluate_to_themselves() {
    let (mut runtime, _) = setup_runtime();

    let tests: &[(Node, Value)] = &[
        (nil(), Value::Nil),
        (boolean(true), Value::Boolean(true)),
        (boolean(false), Value::Boolean(false)),
        (int(42), Value::Integer(42)),
        (int(-7), Value::Integer(-7)),
        (float(2.5), Value::Float(2.5)),
    ];

    for (node, expected) in tests {
        let output = runtime.run(node).unwrap();
        assert_eq!(&output, expected, "unexpected value for {:?}", node.kind);
    }

    let value = runtime.run(&symbol("ready")).unwrap();
    assert_eq!(value, Value::Symbol(runtime.intern("ready")));

    let value = runtime.run(&string("hello")).unwrap();
    assert_eq!(runtime.string_of(&value), Some("hello".to_string()));
}

#[test]
fn string_literals_allocate_fresh_strings() {
    let (mut runtime, _) = setup_runtime();

    let program = seq(vec![
        def("make", vec![], vec![string("same")]),
        assign("first", send("make", vec![])),
        call(local("first"), "<<", vec![string("!")]),
        array(vec![local("first"), send("make", vec![])]),
    ]);
    let value = runtime.run(&program).unwrap();
    let values = runtime.array_of(&value).unwrap();

    assert_eq!(runtime.string_of(&values[0]), Some("same!".to_string()));
    assert_eq!(runtime.string_of(&values[1]), Some("same".to_string()));
}

#[test]
fn locals_persist_across_runs() {
    let (mut runtime, _) = setup_runtime();

    runtime.run(&assign("total", int(40))).unwrap();
    let value = runtime
        .run(&call(local("total"), "+", vec![int(2)]))
        .unwrap();

    assert_eq!(value, Value::Integer(42));
}

#[test]
fn bare_identifiers_fall_back_to_method_calls() {
    let (mut runtime, _) = setup_runtime();

    let program = seq(vec![
        def("answer", vec![], vec![int(42)]),
        local("answer"),
    ]);
    assert_eq!(runtime.run(&program).unwrap(), Value::Integer(42));

    match runtime.run(&local("missing")) {
        Err(RuntimeError::Uncaught { class, message, .. }) => {
            assert_eq!(class, "NameError");
            assert_eq!(message, "undefined local variable or method `missing' for main");
        }
        other => panic!("expected a NameError, got {:?}", other),
    }
}

#[test]
fn unknown_constants_are_name_errors() {
    let (mut runtime, _) = setup_runtime();

    match runtime.run(&constant("Nowhere")) {
        Err(RuntimeError::Uncaught { class, message, .. }) => {
            assert_eq!(class, "NameError");
            assert_eq!(message, "uninitialized constant Nowhere");
        }
        other => panic!("expected a NameError, got {:?}", other),
    }
}

#[test]
fn conditionals_treat_only_nil_and_false_as_falsy() {
    let (mut runtime, _) = setup_runtime();

    let tests: &[(Node, i64)] = &[
        (nil(), 2),
        (boolean(false), 2),
        (boolean(true), 1),
        (int(0), 1),
        (string(""), 1),
        (array(vec![]), 1),
    ];

    for (cond, expected) in tests {
        let program = conditional(cond.clone(), int(1), Some(int(2)));
        assert_eq!(runtime.run(&program).unwrap(), Value::Integer(*expected));
    }

    let program = conditional(boolean(false), int(1), None);
    assert_eq!(runtime.run(&program).unwrap(), Value::Nil);
}

#[test]
fn while_loops_run_until_their_condition_fails() {
    let (mut runtime, _) = setup_runtime();

    let program = seq(vec![
        assign("count", int(0)),
        assign("sum", int(0)),
        while_loop(
            call(local("count"), "<", vec![int(5)]),
            vec![
                assign("count", call(local("count"), "+", vec![int(1)])),
                assign("sum", call(local("sum"), "+", vec![local("count")])),
            ],
        ),
    ]);
    assert_eq!(runtime.run(&program).unwrap(), Value::Nil);
    assert_eq!(runtime.run(&local("sum")).unwrap(), Value::Integer(15));
}

#[test]
fn boolean_operators_short_circuit() {
    let (mut runtime, buffer) = setup_runtime();

    let program = seq(vec![
        and(boolean(false), send("puts", vec![string("and")])),
        or(int(1), send("puts", vec![string("or")])),
    ]);
    assert_eq!(runtime.run(&program).unwrap(), Value::Integer(1));
    assert_eq!(buffer.borrow().as_str(), "");

    assert_eq!(runtime.run(&and(int(1), int(2))).unwrap(), Value::Integer(2));
    assert_eq!(runtime.run(&or(nil(), boolean(false))).unwrap(), Value::Boolean(false));
    assert_eq!(runtime.run(&not(nil())).unwrap(), Value::Boolean(true));
    assert_eq!(runtime.run(&not(int(0))).unwrap(), Value::Boolean(false));
}

#[test]
fn output_goes_to_the_configured_buffer() {
    let (mut runtime, buffer) = setup_runtime();

    let program = seq(vec![
        send("puts", vec![string("hello"), int(42)]),
        send("puts", vec![array(vec![int(1), array(vec![int(2), nil()])])]),
        send("print", vec![string("a"), symbol("b")]),
        send("p", vec![string("quoted"), symbol("sym")]),
        send("puts", vec![]),
    ]);
    runtime.run(&program).unwrap();

    assert_eq!(
        buffer.borrow().as_str(),
        "hello\n42\n1\n2\n\nab\"quoted\"\n:sym\n\n"
    );
}

#[test]
fn user_defined_to_s_is_used_by_puts() {
    let (mut runtime, buffer) = setup_runtime();

    let program = seq(vec![
        class_def(
            "Point",
            None,
            vec![
                def(
                    "initialize",
                    vec![required("x"), required("y")],
                    vec![ivar_assign("@x", local("x")), ivar_assign("@y", local("y"))],
                ),
                def(
                    "to_s",
                    vec![],
                    vec![call(
                        call(call(ivar("@x"), "to_s", vec![]), "+", vec![string(",")]),
                        "+",
                        vec![call(ivar("@y"), "to_s", vec![])],
                    )],
                ),
            ],
        ),
        assign("point", call(constant("Point"), "new", vec![int(3), int(4)])),
        send("puts", vec![local("point")]),
        call(local("point"), "inspect", vec![]),
    ]);
    let value = runtime.run(&program).unwrap();

    assert_eq!(buffer.borrow().as_str(), "3,4\n");
    assert_eq!(runtime.string_of(&value), Some("#<Point @x=3, @y=4>".to_string()));
}

#[test]
fn instance_variables_cannot_be_set_on_immediates() {
    let (mut runtime, _) = setup_runtime();

    let program = seq(vec![
        class_def(
            "Integer",
            None,
            vec![def("tag!", vec![], vec![ivar_assign("@tag", int(1))])],
        ),
        call(int(5), "tag!", vec![]),
    ]);

    match runtime.run(&program) {
        Err(RuntimeError::Uncaught { class, .. }) => assert_eq!(class, "RuntimeError"),
        other => panic!("expected a RuntimeError, got {:?}", other),
    }
}

#[test]
fn top_level_return_ends_the_run() {
    let (mut runtime, buffer) = setup_runtime();

    let program = seq(vec![
        ret(Some(int(7))),
        send("puts", vec![string("unreachable")]),
    ]);

    assert_eq!(runtime.run(&program).unwrap(), Value::Integer(7));
    assert_eq!(buffer.borrow().as_str(), "");
}

#[test]
fn return_in_a_class_body_is_a_local_jump_error() {
    let (mut runtime, _) = setup_runtime();

    let program = class_def("Broken", None, vec![ret(Some(int(1)))]);

    match runtime.run(&program) {
        Err(RuntimeError::Uncaught { class, .. }) => assert_eq!(class, "LocalJumpError"),
        other => panic!("expected a LocalJumpError, got {:?}", other),
    }
}

#[test]
fn deep_recursion_is_fatal() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (output, _) = Output::buffer();
    let config = Config::default()
        .with_output(output)
        .with_max_call_depth(64);
    let mut runtime = Runtime::with_config(config).unwrap();

    let program = seq(vec![
        def("forever", vec![], vec![send("forever", vec![])]),
        send("forever", vec![]),
    ]);

    match runtime.run(&program) {
        Err(RuntimeError::Fatal(FatalError::StackDepthExceeded(depth))) => assert_eq!(depth, 64),
        other => panic!("expected a fatal error, got {:?}", other),
    }

    // the runtime is still usable afterwards
    assert_eq!(runtime.run(&int(1)).unwrap(), Value::Integer(1));
}

#[test]
fn recursion_is_bounded_by_the_default_call_depth() {
    let (mut runtime, _) = setup_runtime();

    // def down(n); n == 0 ? 0 : down(n - 1); end
    let program = def(
        "down",
        vec![required("n")],
        vec![conditional(
            call(local("n"), "==", vec![int(0)]),
            int(0),
            Some(send("down", vec![call(local("n"), "-", vec![int(1)])])),
        )],
    );
    runtime.run(&program).unwrap();

    let depth = Config::DEFAULT_MAX_CALL_DEPTH as i64;
    let value = runtime.run(&send("down", vec![int(depth / 2)])).unwrap();
    assert_eq!(value, Value::Integer(0));

    match runtime.run(&send("down", vec![int(depth)])) {
        Err(RuntimeError::Fatal(FatalError::StackDepthExceeded(reached))) => {
            assert_eq!(reached, Config::DEFAULT_MAX_CALL_DEPTH)
        }
        other => panic!("expected a fatal error, got {:?}", other),
    }

    assert_eq!(runtime.call_depth(), 0);
    assert_eq!(runtime.run(&send("down", vec![int(3)])).unwrap(), Value::Integer(0));
}

#[test]
fn method_definitions_evaluate_to_their_name() {
    let (mut runtime, _) = setup_runtime();

    let value = runtime.run(&def("noop", vec![], vec![])).unwrap();

    assert_eq!(value, Value::Symbol(runtime.intern("noop")));
}

#[test]
fn locations_show_up_in_backtraces() {
    let (mut runtime, _) = setup_runtime();

    let program = seq(vec![
        def("explode", vec![], vec![send("raise", vec![string("boom")]).at(2, 3)]).at(1, 1),
        send("explode", vec![]).at(5, 1),
    ]);

    match runtime.run(&program) {
        Err(RuntimeError::Uncaught {
            class,
            message,
            backtrace,
        }) => {
            assert_eq!(class, "RuntimeError");
            assert_eq!(message, "boom");
            assert_eq!(
                backtrace,
                vec![
                    "(ast):2:in 'explode'".to_string(),
                    "(ast):5:in '<main>'".to_string(),
                ]
            );
        }
        other => panic!("expected an uncaught exception, got {:?}", other),
    }
}

struct FixedParser;

impl Parse for FixedParser {
    fn parse(&self, source: &str, file: &str) -> Result<Node, SyntaxError> {
        match source.trim().parse::<i64>() {
            Ok(value) => Ok(int(value)),
            Err(_) => Err(SyntaxError::new(file, 1, 1, "expected an integer")),
        }
    }
}

#[test]
fn source_goes_through_the_parser() {
    let (mut runtime, _) = setup_runtime();

    let value = runtime.run_source(&FixedParser, " 12 ", "(repl)").unwrap();
    assert_eq!(value, Value::Integer(12));

    match runtime.run_source(&FixedParser, "twelve", "(repl)") {
        Err(RuntimeError::Syntax(error)) => {
            assert_eq!(error, SyntaxError::new("(repl)", 1, 1, "expected an integer"));
            assert_eq!(error.to_string(), "(repl):1:1: expected an integer");
        }
        other => panic!("expected a syntax error, got {:?}", other),
    }
}
