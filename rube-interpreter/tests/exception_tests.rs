use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;

use rube_core::ast::Node;
use rube_core::build::*;
use rube_interpreter::{Config, Output, Runtime, RuntimeError, Value};

fn setup_runtime() -> (Runtime, Rc<RefCell<String>>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let (output, buffer) = Output::buffer();
    let config = Config::default().with_output(output);
    let runtime = Runtime::with_config(config).expect("could not bootstrap runtime");
    (runtime, buffer)
}

/// `begin body rescue => err; err.message end`
fn message_of(body: Node) -> Node {
    begin_rescue(
        vec![body],
        vec![rescue(vec![], Some("err"), vec![call(local("err"), "message", vec![])])],
        None,
    )
}

fn run_to_string(runtime: &mut Runtime, program: &Node) -> String {
    let value = runtime.run(program).unwrap();
    runtime
        .string_of(&value)
        .unwrap_or_else(|| panic!("expected a string, got {:?}", value))
}

#[test]
fn filtered_handlers_only_catch_their_classes() {
    let (mut runtime, _) = setup_runtime();

    let program = begin_rescue(
        vec![send("raise", vec![constant("ArgumentError"), string("bad")])],
        vec![
            rescue(vec![constant("TypeError")], None, vec![string("type")]),
            rescue(
                vec![constant("NameError"), constant("ArgumentError")],
                Some("err"),
                vec![call(local("err"), "message", vec![])],
            ),
            rescue(vec![], None, vec![string("anything")]),
        ],
        None,
    );
    assert_eq!(run_to_string(&mut runtime, &program), "bad");

    let program = begin_rescue(
        vec![send("raise", vec![constant("ArgumentError")])],
        vec![rescue(vec![constant("TypeError")], None, vec![string("type")])],
        None,
    );
    match runtime.run(&program) {
        Err(RuntimeError::Uncaught { class, message, .. }) => {
            assert_eq!(class, "ArgumentError");
            assert_eq!(message, "ArgumentError");
        }
        other => panic!("expected an ArgumentError, got {:?}", other),
    }
}

#[test]
fn handlers_match_subclasses() {
    let (mut runtime, _) = setup_runtime();

    let program = begin_rescue(
        vec![call(int(5), "frobnicate", vec![])],
        vec![rescue(
            vec![constant("NameError")],
            Some("err"),
            vec![call(call(local("err"), "class", vec![]), "name", vec![])],
        )],
        None,
    );

    assert_eq!(run_to_string(&mut runtime, &program), "NoMethodError");
}

#[test]
fn errors_raised_by_a_handler_reach_the_outer_handler() {
    let (mut runtime, _) = setup_runtime();

    let program = message_of(begin_rescue(
        vec![send("raise", vec![constant("TypeError"), string("inner")])],
        vec![rescue(
            vec![constant("TypeError")],
            None,
            vec![send("raise", vec![string("from the handler")])],
        )],
        None,
    ));

    assert_eq!(run_to_string(&mut runtime, &program), "from the handler");
}

#[test]
fn ensure_runs_but_does_not_change_the_result() {
    let (mut runtime, buffer) = setup_runtime();

    let program = begin_rescue(
        vec![int(1)],
        vec![],
        Some(vec![send("puts", vec![string("cleanup")]), int(2)]),
    );
    assert_eq!(runtime.run(&program).unwrap(), Value::Integer(1));
    assert_eq!(buffer.borrow().as_str(), "cleanup\n");

    buffer.borrow_mut().clear();
    let program = message_of(begin_rescue(
        vec![send("raise", vec![string("escaping")])],
        vec![],
        Some(vec![send("puts", vec![string("cleanup")])]),
    ));
    assert_eq!(run_to_string(&mut runtime, &program), "escaping");
    assert_eq!(buffer.borrow().as_str(), "cleanup\n");

    buffer.borrow_mut().clear();
    let program = begin_rescue(
        vec![send("raise", vec![string("handled")])],
        vec![rescue(vec![], None, vec![int(3)])],
        Some(vec![send("puts", vec![string("cleanup")])]),
    );
    assert_eq!(runtime.run(&program).unwrap(), Value::Integer(3));
    assert_eq!(buffer.borrow().as_str(), "cleanup\n");
}

#[test]
fn raising_from_ensure_replaces_the_pending_exception() {
    let (mut runtime, _) = setup_runtime();

    let program = message_of(begin_rescue(
        vec![send("raise", vec![constant("ArgumentError"), string("first")])],
        vec![],
        Some(vec![send("raise", vec![string("second")])]),
    ));

    assert_eq!(run_to_string(&mut runtime, &program), "second");
}

#[test]
fn raise_accepts_every_form() {
    let (mut runtime, _) = setup_runtime();

    let tests: Vec<(Vec<Node>, &str, &str)> = vec![
        (vec![], "RuntimeError", "unhandled exception"),
        (vec![string("plain")], "RuntimeError", "plain"),
        (vec![constant("TypeError")], "TypeError", "TypeError"),
        (vec![constant("IndexError"), string("out")], "IndexError", "out"),
        (
            vec![call(constant("ArgumentError"), "new", vec![string("made")])],
            "ArgumentError",
            "made",
        ),
        (
            vec![call(constant("ArgumentError"), "exception", vec![string("built")])],
            "ArgumentError",
            "built",
        ),
        (vec![int(3)], "TypeError", "exception class/object expected"),
    ];

    for (args, expected_class, expected_message) in tests {
        match runtime.run(&send("raise", args)) {
            Err(RuntimeError::Uncaught { class, message, .. }) => {
                assert_eq!(class, expected_class);
                assert_eq!(message, expected_message);
            }
            other => panic!("expected an uncaught {}, got {:?}", expected_class, other),
        }
    }
}

#[test]
fn exceptions_describe_themselves() {
    let (mut runtime, _) = setup_runtime();

    let program = seq(vec![
        assign(
            "err",
            call(constant("ArgumentError"), "new", vec![string("bad input")]),
        ),
        array(vec![
            call(local("err"), "message", vec![]),
            call(local("err"), "to_s", vec![]),
            call(local("err"), "inspect", vec![]),
            call(local("err"), "full_message", vec![]),
            call(call(constant("ArgumentError"), "new", vec![]), "inspect", vec![]),
        ]),
    ]);
    let value = runtime.run(&program).unwrap();
    let strings: Vec<String> = runtime
        .array_of(&value)
        .unwrap()
        .iter()
        .map(|value| runtime.string_of(value).unwrap())
        .collect();

    assert_eq!(
        strings,
        vec![
            "bad input",
            "bad input",
            "#<ArgumentError: bad input>",
            "bad input (ArgumentError)",
            "ArgumentError",
        ]
    );
    assert_eq!(
        runtime.run(&call(local("err"), "backtrace", vec![])).unwrap(),
        Value::Nil
    );
}

#[test]
fn raising_records_a_backtrace() {
    let (mut runtime, _) = setup_runtime();

    let program = seq(vec![
        def(
            "fail_hard",
            vec![],
            vec![send("raise", vec![string("boom")]).at(2, 3)],
        ),
        begin_rescue(
            vec![send("fail_hard", vec![]).at(5, 3)],
            vec![rescue(vec![], Some("err"), vec![local("err")])],
            None,
        ),
    ]);
    runtime.run(&program).unwrap();

    let backtrace = runtime
        .run(&call(call(local("err"), "backtrace", vec![]), "join", vec![string("|")]))
        .unwrap();
    assert_eq!(
        runtime.string_of(&backtrace),
        Some("(ast):2:in 'fail_hard'|(ast):5:in '<main>'".to_string())
    );

    let full = runtime
        .run(&call(local("err"), "full_message", vec![]))
        .unwrap();
    assert_eq!(
        runtime.string_of(&full),
        Some("(ast):2:in 'fail_hard': boom (RuntimeError)\n\tfrom (ast):5:in '<main>'".to_string())
    );

    // re-raising keeps the original backtrace
    match runtime.run(&send("raise", vec![local("err")]).at(9, 1)) {
        Err(RuntimeError::Uncaught { backtrace, .. }) => assert_eq!(
            backtrace,
            vec![
                "(ast):2:in 'fail_hard'".to_string(),
                "(ast):5:in '<main>'".to_string(),
            ]
        ),
        other => panic!("expected an uncaught exception, got {:?}", other),
    }
}

#[test]
fn name_errors_remember_the_missing_name() {
    let (mut runtime, _) = setup_runtime();

    let program = array(vec![
        begin_rescue(
            vec![local("nowhere")],
            vec![rescue(
                vec![constant("NameError")],
                Some("err"),
                vec![call(local("err"), "name", vec![])],
            )],
            None,
        ),
        begin_rescue(
            vec![call(int(1), "explode", vec![])],
            vec![rescue(
                vec![constant("NoMethodError")],
                Some("err"),
                vec![call(local("err"), "name", vec![])],
            )],
            None,
        ),
        call(
            call(constant("NameError"), "new", vec![string("custom"), symbol("thing")]),
            "name",
            vec![],
        ),
    ]);
    let value = runtime.run(&program).unwrap();

    let expected = vec![
        Value::Symbol(runtime.intern("nowhere")),
        Value::Symbol(runtime.intern("explode")),
        Value::Symbol(runtime.intern("thing")),
    ];
    assert_eq!(runtime.array_of(&value), Some(expected));
}

#[test]
fn user_defined_exceptions_can_override_their_message() {
    let (mut runtime, _) = setup_runtime();

    let program = seq(vec![
        class_def(
            "QuotaExceeded",
            Some(constant("StandardError")),
            vec![def("message", vec![], vec![string("quota exceeded")])],
        ),
        class_def("Quiet", Some(constant("StandardError")), vec![]),
        message_of(send("raise", vec![constant("QuotaExceeded")])),
    ]);
    assert_eq!(run_to_string(&mut runtime, &program), "quota exceeded");

    match runtime.run(&send("raise", vec![constant("QuotaExceeded")])) {
        Err(RuntimeError::Uncaught { class, message, .. }) => {
            assert_eq!(class, "QuotaExceeded");
            assert_eq!(message, "quota exceeded");
        }
        other => panic!("expected a QuotaExceeded, got {:?}", other),
    }

    let program = begin_rescue(
        vec![send("raise", vec![constant("Quiet"), string("shh")])],
        vec![rescue(
            vec![constant("StandardError")],
            Some("err"),
            vec![call(local("err"), "is_a?", vec![constant("Exception")])],
        )],
        None,
    );
    assert_eq!(runtime.run(&program).unwrap(), Value::Boolean(true));
}

#[test]
fn exceptions_unwind_through_method_calls() {
    let (mut runtime, buffer) = setup_runtime();

    let program = seq(vec![
        def(
            "inner",
            vec![],
            vec![
                call(int(1), "/", vec![int(0)]),
                send("puts", vec![string("unreachable")]),
            ],
        ),
        def(
            "outer",
            vec![],
            vec![begin_rescue(
                vec![send("inner", vec![])],
                vec![rescue(
                    vec![constant("ZeroDivisionError")],
                    Some("err"),
                    vec![call(local("err"), "message", vec![])],
                )],
                Some(vec![send("puts", vec![string("outer done")])]),
            )],
        ),
        send("outer", vec![]),
    ]);

    assert_eq!(run_to_string(&mut runtime, &program), "divided by 0");
    assert_eq!(buffer.borrow().as_str(), "outer done\n");

    // the call stack is back to normal afterwards
    let program = seq(vec![
        def("plain", vec![], vec![int(4)]),
        send("plain", vec![]),
    ]);
    assert_eq!(runtime.run(&program).unwrap(), Value::Integer(4));
}

#[test]
fn rescue_clauses_need_classes() {
    let (mut runtime, _) = setup_runtime();

    let program = begin_rescue(
        vec![send("raise", vec![string("oops")])],
        vec![rescue(vec![int(1)], None, vec![nil()])],
        None,
    );

    match runtime.run(&program) {
        Err(RuntimeError::Uncaught { class, message, .. }) => {
            assert_eq!(class, "TypeError");
            assert_eq!(message, "class or module required for rescue clause");
        }
        other => panic!("expected a TypeError, got {:?}", other),
    }
}
