use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;

use rube_core::build::*;
use rube_interpreter::{Config, Outcome, Output, Runtime, RuntimeError, Value};

fn setup_runtime() -> (Runtime, Rc<RefCell<String>>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let (output, buffer) = Output::buffer();
    let config = Config::default().with_output(output);
    let runtime = Runtime::with_config(config).expect("could not bootstrap runtime");
    (runtime, buffer)
}

fn inspected(runtime: &mut Runtime, value: Value) -> String {
    let inspect = runtime.send(value, "inspect", Vec::new()).unwrap();
    match inspect {
        Outcome::Value(value) => runtime.string_of(&value).unwrap(),
        other => panic!("`inspect` did not produce a value: {:?}", other),
    }
}

#[test]
fn closures_capture_bindings_by_reference() {
    let (mut runtime, buffer) = setup_runtime();

    let program = seq(vec![
        assign("x", int(2)),
        assign(
            "show_and_reset",
            lambda(
                vec![],
                vec![send("puts", vec![local("x")]), assign("x", int(3))],
            ),
        ),
        assign("x", int(7)),
        call(local("show_and_reset"), "call", vec![]),
        send("puts", vec![local("x")]),
        assign("restore", lambda(vec![], vec![assign("x", int(7))])),
        call(local("restore"), "call", vec![]),
        send("puts", vec![local("x")]),
    ]);
    runtime.run(&program).unwrap();

    assert_eq!(buffer.borrow().as_str(), "7\n3\n7\n");
}

#[test]
fn block_locals_do_not_leak_out() {
    let (mut runtime, _) = setup_runtime();

    let program = seq(vec![
        assign("total", int(0)),
        call_block(
            Some(array(vec![int(1), int(2), int(3)])),
            "each",
            vec![],
            block(
                vec![required("value")],
                vec![
                    assign("scratch", local("value")),
                    assign("total", call(local("total"), "+", vec![local("scratch")])),
                ],
            ),
        ),
        local("total"),
    ]);
    assert_eq!(runtime.run(&program).unwrap(), Value::Integer(6));

    match runtime.run(&local("scratch")) {
        Err(RuntimeError::Uncaught { class, .. }) => assert_eq!(class, "NameError"),
        other => panic!("expected a NameError, got {:?}", other),
    }
}

#[test]
fn return_from_a_block_leaves_the_home_method() {
    let (mut runtime, buffer) = setup_runtime();

    let program = seq(vec![
        def(
            "first_big",
            vec![required("values")],
            vec![
                begin_rescue(
                    vec![call_block(
                        Some(local("values")),
                        "each",
                        vec![],
                        block(
                            vec![required("value")],
                            vec![conditional(
                                call(local("value"), ">", vec![int(1)]),
                                ret(Some(local("value"))),
                                None,
                            )],
                        ),
                    )],
                    vec![rescue(vec![], None, vec![string("rescued")])],
                    Some(vec![send("puts", vec![string("ensure")])]),
                ),
                string("none"),
            ],
        ),
        send("first_big", vec![array(vec![int(1), int(5), int(9)])]),
    ]);

    assert_eq!(runtime.run(&program).unwrap(), Value::Integer(5));
    assert_eq!(buffer.borrow().as_str(), "ensure\n");

    let value = runtime
        .run(&send("first_big", vec![array(vec![int(0)])]))
        .unwrap();
    assert_eq!(runtime.string_of(&value), Some("none".to_string()));
}

#[test]
fn return_from_an_orphaned_proc_is_a_local_jump_error() {
    let (mut runtime, _) = setup_runtime();

    let program = seq(vec![
        def(
            "make",
            vec![],
            vec![call_block(
                None,
                "proc",
                vec![],
                block(vec![], vec![ret(Some(int(1)))]),
            )],
        ),
        call(send("make", vec![]), "call", vec![]),
    ]);

    match runtime.run(&program) {
        Err(RuntimeError::Uncaught { class, message, .. }) => {
            assert_eq!(class, "LocalJumpError");
            assert_eq!(message, "unexpected return");
        }
        other => panic!("expected a LocalJumpError, got {:?}", other),
    }
}

#[test]
fn return_from_a_lambda_is_local() {
    let (mut runtime, buffer) = setup_runtime();

    let program = seq(vec![
        def(
            "run",
            vec![],
            vec![
                assign("early", lambda(vec![], vec![ret(Some(int(1))), int(2)])),
                assign("got", call(local("early"), "call", vec![])),
                send("puts", vec![local("got")]),
                int(10),
            ],
        ),
        send("run", vec![]),
    ]);

    assert_eq!(runtime.run(&program).unwrap(), Value::Integer(10));
    assert_eq!(buffer.borrow().as_str(), "1\n");
}

#[test]
fn procs_report_their_arity_and_kind() {
    let (mut runtime, _) = setup_runtime();

    let program = array(vec![
        call(lambda(vec![required("a"), required("b")], vec![]), "arity", vec![]),
        call(lambda(vec![required("a"), splat("rest")], vec![]), "arity", vec![]),
        call(
            lambda(vec![optional("a", int(1))], vec![]),
            "arity",
            vec![],
        ),
        call(lambda(vec![], vec![]), "lambda?", vec![]),
        call(
            call_block(None, "proc", vec![], block(vec![required("a")], vec![])),
            "lambda?",
            vec![],
        ),
        call(
            call_block(None, "lambda", vec![], block(vec![required("a")], vec![])),
            "lambda?",
            vec![],
        ),
    ]);
    let value = runtime.run(&program).unwrap();

    assert_eq!(
        runtime.array_of(&value),
        Some(vec![
            Value::Integer(2),
            Value::Integer(-2),
            Value::Integer(-1),
            Value::Boolean(true),
            Value::Boolean(false),
            Value::Boolean(true),
        ])
    );
}

#[test]
fn symbols_and_methods_can_be_passed_as_blocks() {
    let (mut runtime, _) = setup_runtime();

    let program = call_with(
        Some(array(vec![int(1), int(-2), int(3)])),
        "map",
        vec![block_arg(symbol("abs"))],
        None,
    );
    let value = runtime.run(&program).unwrap();
    assert_eq!(inspected(&mut runtime, value), "[1, 2, 3]");

    let program = seq(vec![
        def(
            "double",
            vec![required("x")],
            vec![call(local("x"), "*", vec![int(2)])],
        ),
        call_with(
            Some(array(vec![int(1), int(2)])),
            "map",
            vec![block_arg(send("method", vec![symbol("double")]))],
            None,
        ),
    ]);
    let value = runtime.run(&program).unwrap();
    assert_eq!(inspected(&mut runtime, value), "[2, 4]");

    let program = call(
        call(send("method", vec![symbol("double")]), "to_proc", vec![]),
        "call",
        vec![int(21)],
    );
    assert_eq!(runtime.run(&program).unwrap(), Value::Integer(42));

    let program = call(
        call(symbol("upcase"), "to_proc", vec![]),
        "call",
        vec![string("loud")],
    );
    let value = runtime.run(&program).unwrap();
    assert_eq!(runtime.string_of(&value), Some("LOUD".to_string()));
}

#[test]
fn define_method_closes_over_its_block() {
    let (mut runtime, _) = setup_runtime();

    let program = seq(vec![
        assign("factor", int(3)),
        class_def(
            "Scaler",
            None,
            vec![def(
                "initialize",
                vec![required("base")],
                vec![ivar_assign("@base", local("base"))],
            )],
        ),
        call_block(
            Some(constant("Scaler")),
            "define_method",
            vec![symbol("scaled")],
            block(
                vec![required("extra")],
                vec![call(
                    call(ivar("@base"), "*", vec![local("factor")]),
                    "+",
                    vec![local("extra")],
                )],
            ),
        ),
        call(
            call(constant("Scaler"), "new", vec![int(4)]),
            "scaled",
            vec![int(1)],
        ),
    ]);
    assert_eq!(runtime.run(&program).unwrap(), Value::Integer(13));

    let result = runtime.run(&call(
        call(constant("Scaler"), "new", vec![int(4)]),
        "scaled",
        vec![],
    ));
    match result {
        Err(RuntimeError::Uncaught { class, .. }) => assert_eq!(class, "ArgumentError"),
        other => panic!("expected an ArgumentError, got {:?}", other),
    }
}

#[test]
fn yield_without_a_block_is_a_local_jump_error() {
    let (mut runtime, _) = setup_runtime();

    let program = seq(vec![
        def(
            "maybe",
            vec![],
            vec![conditional(
                send("block_given?", vec![]),
                yield_values(vec![int(5)]),
                Some(string("no block")),
            )],
        ),
        def("always", vec![], vec![yield_values(vec![])]),
        call_block(
            None,
            "maybe",
            vec![],
            block(vec![required("v")], vec![call(local("v"), "+", vec![int(1)])]),
        ),
    ]);
    assert_eq!(runtime.run(&program).unwrap(), Value::Integer(6));

    let value = runtime.run(&send("maybe", vec![])).unwrap();
    assert_eq!(runtime.string_of(&value), Some("no block".to_string()));

    match runtime.run(&send("always", vec![])) {
        Err(RuntimeError::Uncaught { class, message, .. }) => {
            assert_eq!(class, "LocalJumpError");
            assert_eq!(message, "no block given (yield)");
        }
        other => panic!("expected a LocalJumpError, got {:?}", other),
    }
}

#[test]
fn blocks_see_the_self_of_their_definition() {
    let (mut runtime, _) = setup_runtime();

    let program = seq(vec![
        class_def(
            "Box",
            None,
            vec![
                def(
                    "initialize",
                    vec![required("items")],
                    vec![ivar_assign("@items", local("items")), ivar_assign("@offset", int(10))],
                ),
                def(
                    "shifted",
                    vec![],
                    vec![call_block(
                        Some(ivar("@items")),
                        "map",
                        vec![],
                        block(
                            vec![required("item")],
                            vec![call(local("item"), "+", vec![ivar("@offset")])],
                        ),
                    )],
                ),
            ],
        ),
        call(
            call(constant("Box"), "new", vec![array(vec![int(1), int(2)])]),
            "shifted",
            vec![],
        ),
    ]);
    let value = runtime.run(&program).unwrap();

    assert_eq!(
        runtime.array_of(&value),
        Some(vec![Value::Integer(11), Value::Integer(12)])
    );
}
