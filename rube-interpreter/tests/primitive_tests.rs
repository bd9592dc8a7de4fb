use std::cell::RefCell;
use std::rc::Rc;

use num_bigint::BigInt;
use pretty_assertions::assert_eq;
use rand::Rng;

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

/// Evaluate `node.inspect` and return the resulting string.
fn inspect(runtime: &mut Runtime, node: Node) -> String {
    let value = runtime.run(&call(node, "inspect", vec![])).unwrap();
    runtime.string_of(&value).unwrap()
}

fn ints(values: &[i64]) -> Vec<Node> {
    values.iter().copied().map(int).collect()
}

fn expect_uncaught(result: Result<Value, RuntimeError>, expected_class: &str, expected_message: &str) {
    match result {
        Err(RuntimeError::Uncaught { class, message, .. }) => {
            assert_eq!(class, expected_class);
            assert_eq!(message, expected_message);
        }
        other => panic!("expected an uncaught {}, got {:?}", expected_class, other),
    }
}

#[test]
fn integer_arithmetic() {
    let (mut runtime, _) = setup_runtime();

    let tests: &[(i64, &str, i64, i64)] = &[
        (3, "+", 4, 7),
        (3, "-", 4, -1),
        (6, "*", -7, -42),
        (7, "/", 2, 3),
        (-7, "/", 2, -4),
        (7, "/", -2, -4),
        (-7, "/", -2, 3),
        (7, "%", 3, 1),
        (-7, "%", 3, 2),
        (7, "%", -3, -2),
        (2, "**", 10, 1024),
        (6, "&", 3, 2),
        (6, "|", 3, 7),
        (6, "^", 3, 5),
        (1, "<<", 10, 1024),
        (1024, ">>", 3, 128),
        (-1, ">>", 10, -1),
        (i64::MIN, "+", 0, i64::MIN),
        (i64::MAX, "-", 0, i64::MAX),
    ];

    for (lhs, op, rhs, expected) in tests {
        let value = runtime.run(&call(int(*lhs), op, vec![int(*rhs)])).unwrap();
        assert_eq!(value, Value::Integer(*expected), "{} {} {}", lhs, op, rhs);
    }
}

#[test]
fn integer_arithmetic_agrees_with_the_host() {
    let (mut runtime, _) = setup_runtime();
    let mut rng = rand::thread_rng();

    for _ in 0..200 {
        let a: i64 = rng.gen_range(-1_000_000..1_000_000);
        let b: i64 = rng.gen_range(-1_000..1_000);
        if b == 0 {
            continue;
        }
        let quotient = (a as f64 / b as f64).floor() as i64;
        let tests = [
            ("+", a + b),
            ("-", a - b),
            ("*", a * b),
            ("/", quotient),
            ("%", a - b * quotient),
        ];
        for (op, expected) in tests {
            let value = runtime.run(&call(int(a), op, vec![int(b)])).unwrap();
            assert_eq!(value, Value::Integer(expected), "{} {} {}", a, op, b);
        }
    }
}

#[test]
fn overflowing_integers_become_big_and_shrink_back() {
    let (mut runtime, _) = setup_runtime();

    let value = runtime
        .run(&call(int(i64::MAX), "+", vec![int(1)]))
        .unwrap();
    assert_eq!(value, Value::BigInteger(BigInt::from(i64::MAX) + 1));

    let value = runtime
        .run(&call(call(int(i64::MAX), "+", vec![int(1)]), "-", vec![int(1)]))
        .unwrap();
    assert_eq!(value, Value::Integer(i64::MAX));

    let value = runtime
        .run(&call(int(i64::MIN), "/", vec![int(-1)]))
        .unwrap();
    assert_eq!(value, Value::BigInteger(-BigInt::from(i64::MIN)));

    let value = runtime
        .run(&call(int(i64::MIN), "-@", vec![]))
        .unwrap();
    assert_eq!(value, Value::BigInteger(-BigInt::from(i64::MIN)));

    let program = call(call(int(2), "**", vec![int(100)]), "to_s", vec![]);
    let value = runtime.run(&program).unwrap();
    assert_eq!(
        runtime.string_of(&value),
        Some("1267650600228229401496703205376".to_string())
    );

    let program = call(
        big_int("123456789012345678901234567890"),
        "%",
        vec![int(1_000_000)],
    );
    assert_eq!(runtime.run(&program).unwrap(), Value::Integer(567_890));
}

#[test]
fn division_by_zero_is_an_error() {
    let (mut runtime, _) = setup_runtime();

    for op in ["/", "%"] {
        let result = runtime.run(&call(int(1), op, vec![int(0)]));
        expect_uncaught(result, "ZeroDivisionError", "divided by 0");
    }

    let value = runtime.run(&call(int(1), "/", vec![float(0.0)])).unwrap();
    assert_eq!(value, Value::Float(f64::INFINITY));
}

#[test]
fn integers_mix_with_floats() {
    let (mut runtime, _) = setup_runtime();

    assert_eq!(
        runtime.run(&call(int(1), "+", vec![float(2.5)])).unwrap(),
        Value::Float(3.5)
    );
    assert_eq!(
        runtime.run(&call(int(7), "/", vec![float(2.0)])).unwrap(),
        Value::Float(3.5)
    );
    assert_eq!(
        runtime.run(&call(float(2.5), "*", vec![int(2)])).unwrap(),
        Value::Float(5.0)
    );
    assert_eq!(
        runtime.run(&call(float(-7.5), "%", vec![int(2)])).unwrap(),
        Value::Float(0.5)
    );

    let result = runtime.run(&call(int(1), "+", vec![string("a")]));
    expect_uncaught(result, "TypeError", "String can't be coerced into Integer");

    let result = runtime.run(&call(int(1), "+", vec![nil()]));
    expect_uncaught(result, "TypeError", "nil can't be coerced into Integer");
}

#[test]
fn floats_print_like_the_language() {
    let (mut runtime, _) = setup_runtime();

    let tests: &[(Node, &str)] = &[
        (float(3.0), "3.0"),
        (float(0.1), "0.1"),
        (float(-2.5), "-2.5"),
        (call(int(10), "/", vec![float(4.0)]), "2.5"),
        (call(float(0.0), "/", vec![float(0.0)]), "NaN"),
        (call(float(-1.0), "/", vec![float(0.0)]), "-Infinity"),
        (call(int(3), "to_f", vec![]), "3.0"),
    ];

    for (node, expected) in tests {
        let value = runtime.run(&call(node.clone(), "to_s", vec![])).unwrap();
        assert_eq!(runtime.string_of(&value).as_deref(), Some(*expected));
    }

    let tests: &[(&str, f64, i64)] = &[
        ("floor", 2.7, 2),
        ("floor", -2.1, -3),
        ("ceil", 2.1, 3),
        ("to_i", -2.7, -2),
        ("round", 2.4, 2),
    ];
    for (op, value, expected) in tests {
        let output = runtime.run(&call(float(*value), op, vec![])).unwrap();
        assert_eq!(output, Value::Integer(*expected), "{}.{}", value, op);
    }
}

#[test]
fn integers_iterate() {
    let (mut runtime, _) = setup_runtime();

    let program = seq(vec![
        assign("seen", array(vec![])),
        call_block(
            Some(int(3)),
            "times",
            vec![],
            block(vec![required("i")], vec![call(local("seen"), "push", vec![local("i")])]),
        ),
        call_block(
            Some(int(5)),
            "upto",
            vec![int(7)],
            block(vec![required("i")], vec![call(local("seen"), "push", vec![local("i")])]),
        ),
        call(local("seen"), "inspect", vec![]),
    ]);
    let value = runtime.run(&program).unwrap();

    assert_eq!(runtime.string_of(&value), Some("[0, 1, 2, 5, 6, 7]".to_string()));
}

#[test]
fn comparable_builds_on_the_spaceship_operator() {
    let (mut runtime, _) = setup_runtime();

    let program = seq(vec![
        class_def(
            "Version",
            None,
            vec![
                send("include", vec![constant("Comparable")]),
                send("attr_reader", vec![symbol("number")]),
                def(
                    "initialize",
                    vec![required("number")],
                    vec![ivar_assign("@number", local("number"))],
                ),
                def(
                    "<=>",
                    vec![required("other")],
                    vec![call(
                        ivar("@number"),
                        "<=>",
                        vec![call(local("other"), "number", vec![])],
                    )],
                ),
            ],
        ),
        assign("old", call(constant("Version"), "new", vec![int(1)])),
        assign("new", call(constant("Version"), "new", vec![int(2)])),
        array(vec![
            call(local("old"), "<", vec![local("new")]),
            call(local("new"), ">=", vec![local("old")]),
            call(local("old"), ">", vec![local("new")]),
            call(local("new"), "between?", vec![local("old"), local("new")]),
            call(string("apple"), "<", vec![string("banana")]),
            call(int(3), "between?", vec![int(1), int(5)]),
        ]),
    ]);
    let value = runtime.run(&program).unwrap();

    assert_eq!(
        runtime.array_of(&value),
        Some(vec![
            Value::Boolean(true),
            Value::Boolean(true),
            Value::Boolean(false),
            Value::Boolean(true),
            Value::Boolean(true),
            Value::Boolean(true),
        ])
    );

    let result = runtime.run(&call(string("apple"), "<", vec![int(1)]));
    expect_uncaught(result, "ArgumentError", "comparison of String with 1 failed");
}

#[test]
fn string_operations() {
    let (mut runtime, _) = setup_runtime();

    let tests: &[(Node, &str)] = &[
        (call(string("ab"), "+", vec![string("cd")]), "\"abcd\""),
        (call(string("ab"), "*", vec![int(3)]), "\"ababab\""),
        (call(string("héllo"), "length", vec![]), "5"),
        (call(string("Hello"), "upcase", vec![]), "\"HELLO\""),
        (call(string("Hello"), "downcase", vec![]), "\"hello\""),
        (call(string("abc"), "reverse", vec![]), "\"cba\""),
        (call(string("hello"), "include?", vec![string("ell")]), "true"),
        (call(string("hello"), "[]", vec![int(1)]), "\"e\""),
        (call(string("hello"), "[]", vec![int(-1)]), "\"o\""),
        (call(string("hello"), "[]", vec![int(1), int(3)]), "\"ell\""),
        (call(string("hello"), "[]", vec![int(10)]), "nil"),
        (call(string("name"), "to_sym", vec![]), ":name"),
        (call(string(" 42abc"), "to_i", vec![]), "42"),
        (call(string("abc"), "to_i", vec![]), "0"),
        (call(string("a"), "==", vec![string("a")]), "true"),
        (call(string("a"), "<=>", vec![string("b")]), "-1"),
        (call(string(""), "empty?", vec![]), "true"),
        (string("say \"hi\""), "\"say \\\"hi\\\"\""),
    ];

    for (node, expected) in tests {
        assert_eq!(inspect(&mut runtime, node.clone()), *expected);
    }

    let result = runtime.run(&call(string("a"), "+", vec![int(1)]));
    expect_uncaught(result, "TypeError", "no implicit conversion of Integer into String");
}

#[test]
fn strings_are_mutable_in_place() {
    let (mut runtime, _) = setup_runtime();

    let program = seq(vec![
        assign("greeting", string("hello")),
        assign("alias", local("greeting")),
        call(local("greeting"), "<<", vec![string(", world")]),
        call(local("alias"), "concat", vec![string("!")]),
        local("greeting"),
    ]);
    let value = runtime.run(&program).unwrap();

    assert_eq!(runtime.string_of(&value), Some("hello, world!".to_string()));
}

#[test]
fn array_access_and_mutation() {
    let (mut runtime, _) = setup_runtime();

    let program = seq(vec![
        assign("list", array(ints(&[1, 2, 3]))),
        call(local("list"), "push", vec![int(4)]),
        call(local("list"), "<<", vec![int(5)]),
        array(vec![
            call(local("list"), "pop", vec![]),
            call(local("list"), "first", vec![]),
            call(local("list"), "last", vec![]),
            call(local("list"), "length", vec![]),
            call(local("list"), "[]", vec![int(-1)]),
            call(local("list"), "[]", vec![int(9)]),
            call(local("list"), "include?", vec![int(2)]),
            call(array(vec![]), "empty?", vec![]),
            call(array(vec![]), "first", vec![]),
        ]),
    ]);
    assert_eq!(inspect(&mut runtime, program), "[5, 1, 4, 4, 4, nil, true, true, nil]");

    let program = seq(vec![
        assign("sparse", array(ints(&[1]))),
        call(local("sparse"), "[]=", vec![int(3), int(4)]),
        call(local("sparse"), "[]=", vec![int(-1), int(9)]),
        local("sparse"),
    ]);
    assert_eq!(inspect(&mut runtime, program), "[1, nil, nil, 9]");

    let result = runtime.run(&call(local("sparse"), "[]=", vec![int(-5), int(0)]));
    expect_uncaught(result, "IndexError", "index -5 too small for array; minimum: -4");
}

#[test]
fn array_iteration() {
    let (mut runtime, _) = setup_runtime();

    let numbers = || array(ints(&[1, 2, 3, 4]));

    let program = call_block(
        Some(numbers()),
        "select",
        vec![],
        block(vec![required("n")], vec![call(local("n"), "even?", vec![])]),
    );
    assert_eq!(inspect(&mut runtime, program), "[2, 4]");

    let program = call_block(
        Some(numbers()),
        "map",
        vec![],
        block(vec![required("n")], vec![call(local("n"), "*", vec![local("n")])]),
    );
    assert_eq!(inspect(&mut runtime, program), "[1, 4, 9, 16]");

    let program = seq(vec![
        assign("pairs", array(vec![])),
        call_block(
            Some(array(vec![string("a"), string("b")])),
            "each_with_index",
            vec![],
            block(
                vec![required("item"), required("index")],
                vec![call(
                    local("pairs"),
                    "push",
                    vec![array(vec![local("index"), local("item")])],
                )],
            ),
        ),
        local("pairs"),
    ]);
    assert_eq!(inspect(&mut runtime, program), "[[0, \"a\"], [1, \"b\"]]");

    let program = call(
        call(numbers(), "reverse", vec![]),
        "+",
        vec![array(ints(&[0]))],
    );
    assert_eq!(inspect(&mut runtime, program), "[4, 3, 2, 1, 0]");
}

#[test]
fn inject_accepts_every_form() {
    let (mut runtime, _) = setup_runtime();

    let numbers = || Some(array(ints(&[1, 2, 3])));
    let sum = || {
        block(
            vec![required("acc"), required("n")],
            vec![call(local("acc"), "+", vec![local("n")])],
        )
    };

    let tests: Vec<(Node, Value)> = vec![
        (call_block(numbers(), "inject", vec![], sum()), Value::Integer(6)),
        (call_block(numbers(), "inject", vec![int(10)], sum()), Value::Integer(16)),
        (call_with(numbers(), "inject", vec![arg(symbol("+"))], None), Value::Integer(6)),
        (
            call_with(numbers(), "inject", vec![arg(int(10)), arg(symbol("*"))], None),
            Value::Integer(60),
        ),
        (call_with(Some(array(vec![])), "inject", vec![arg(symbol("+"))], None), Value::Nil),
        (
            call_block(Some(array(vec![])), "inject", vec![int(5)], sum()),
            Value::Integer(5),
        ),
    ];

    for (program, expected) in tests {
        assert_eq!(runtime.run(&program).unwrap(), expected);
    }
}

#[test]
fn joining_flattens_nested_arrays() {
    let (mut runtime, _) = setup_runtime();

    let program = call(
        array(vec![int(1), array(vec![int(2), array(vec![string("x")])]), nil()]),
        "join",
        vec![string("-")],
    );
    let value = runtime.run(&program).unwrap();
    assert_eq!(runtime.string_of(&value), Some("1-2-x-".to_string()));

    let program = seq(vec![
        assign("looped", array(ints(&[1]))),
        call(local("looped"), "<<", vec![local("looped")]),
        call(local("looped"), "inspect", vec![]),
    ]);
    let value = runtime.run(&program).unwrap();
    assert_eq!(runtime.string_of(&value), Some("[1, [...]]".to_string()));

    let result = runtime.run(&call(local("looped"), "join", vec![]));
    expect_uncaught(result, "ArgumentError", "recursive array join");
}

#[test]
fn arrays_can_be_built_with_new() {
    let (mut runtime, _) = setup_runtime();

    let tests: Vec<(Node, &str)> = vec![
        (call(constant("Array"), "new", vec![]), "[]"),
        (call(constant("Array"), "new", vec![int(2)]), "[nil, nil]"),
        (call(constant("Array"), "new", vec![int(2), int(0)]), "[0, 0]"),
        (
            call_block(
                Some(constant("Array")),
                "new",
                vec![int(3)],
                block(vec![required("i")], vec![call(local("i"), "*", vec![local("i")])]),
            ),
            "[0, 1, 4]",
        ),
    ];

    for (program, expected) in tests {
        assert_eq!(inspect(&mut runtime, program), expected);
    }

    let program = call(
        array(ints(&[1, 2])),
        "==",
        vec![call(constant("Array"), "new", vec![int(2), int(1)])],
    );
    assert_eq!(runtime.run(&program).unwrap(), Value::Boolean(false));
}

#[test]
fn oversized_arrays_are_refused() {
    let (mut runtime, _) = setup_runtime();

    let result = runtime.run(&call(constant("Array"), "new", vec![int(1 << 62)]));
    expect_uncaught(result, "ArgumentError", "array size too big");

    let result = runtime.run(&call(constant("Array"), "new", vec![int(-1)]));
    expect_uncaught(result, "ArgumentError", "negative array size");

    let program = seq(vec![
        assign("values", array(ints(&[1]))),
        begin_rescue(
            vec![call(local("values"), "[]=", vec![int(1 << 61), int(2)])],
            vec![rescue(
                vec![constant("IndexError")],
                Some("err"),
                vec![call(local("err"), "message", vec![])],
            )],
            None,
        ),
    ]);
    let value = runtime.run(&program).unwrap();
    assert_eq!(
        runtime.string_of(&value),
        Some(format!("index {} too big", 1i64 << 61))
    );

    // the array is left untouched
    assert_eq!(inspect(&mut runtime, local("values")), "[1]");
}

#[test]
fn primitives_check_their_argument_count() {
    let (mut runtime, _) = setup_runtime();

    let tests: Vec<(Node, &str)> = vec![
        (call(nil(), "to_s", vec![int(1)]), "wrong number of arguments (given 1, expected 0)"),
        (call(boolean(true), "inspect", vec![int(1)]), "wrong number of arguments (given 1, expected 0)"),
        (call(boolean(false), "&", vec![]), "wrong number of arguments (given 0, expected 1)"),
        (call(symbol("a"), "to_sym", vec![int(1), int(2)]), "wrong number of arguments (given 2, expected 0)"),
        (call(symbol("a"), "to_proc", vec![nil()]), "wrong number of arguments (given 1, expected 0)"),
        (
            call(call(constant("TypeError"), "new", vec![]), "message", vec![int(1)]),
            "wrong number of arguments (given 1, expected 0)",
        ),
    ];

    for (program, expected) in tests {
        expect_uncaught(runtime.run(&program), "ArgumentError", expected);
    }
}

#[test]
fn nil_and_booleans() {
    let (mut runtime, _) = setup_runtime();

    let tests: &[(Node, &str)] = &[
        (call(nil(), "to_s", vec![]), "\"\""),
        (nil(), "nil"),
        (call(nil(), "to_a", vec![]), "[]"),
        (call(nil(), "nil?", vec![]), "true"),
        (call(int(0), "nil?", vec![]), "false"),
        (call(boolean(true), "&", vec![nil()]), "false"),
        (call(boolean(false), "|", vec![int(1)]), "true"),
        (call(boolean(true), "^", vec![boolean(true)]), "false"),
        (call(boolean(true), "to_s", vec![]), "\"true\""),
    ];

    for (node, expected) in tests {
        assert_eq!(inspect(&mut runtime, node.clone()), *expected);
    }
}

#[test]
fn kernel_reflection() {
    let (mut runtime, _) = setup_runtime();

    let program = seq(vec![
        class_def("Bag", None, vec![]),
        assign("bag", call(constant("Bag"), "new", vec![])),
        call(local("bag"), "instance_variable_set", vec![symbol("@size"), int(3)]),
        array(vec![
            call(local("bag"), "instance_variable_get", vec![symbol("@size")]),
            call(local("bag"), "instance_variables", vec![]),
            call(int(1), "is_a?", vec![constant("Comparable")]),
            call(int(1), "instance_of?", vec![constant("Integer")]),
            call(int(1), "respond_to?", vec![symbol("+")]),
            call(int(1), "send", vec![symbol("+"), int(2)]),
            call(local("bag"), "==", vec![local("bag")]),
            call(local("bag"), "!=", vec![call(constant("Bag"), "new", vec![])]),
            call(symbol("a"), "==", vec![call(string("a"), "to_sym", vec![])]),
            call(call(symbol("sym"), "to_s", vec![]), "length", vec![]),
        ]),
    ]);

    assert_eq!(
        inspect(&mut runtime, program),
        "[3, [:@size], true, true, true, 3, true, true, true, 3]"
    );

    let program = call(
        call(local("bag"), "object_id", vec![]),
        "==",
        vec![call(local("bag"), "object_id", vec![])],
    );
    assert_eq!(runtime.run(&program).unwrap(), Value::Boolean(true));
}

#[test]
fn rand_stays_within_its_bounds() {
    let (mut runtime, _) = setup_runtime();

    for _ in 0..50 {
        match runtime.run(&send("rand", vec![int(10)])).unwrap() {
            Value::Integer(value) => assert!((0..10).contains(&value), "{} out of bounds", value),
            other => panic!("expected an integer, got {:?}", other),
        }
        match runtime.run(&send("rand", vec![])).unwrap() {
            Value::Float(value) => assert!((0.0..1.0).contains(&value), "{} out of bounds", value),
            other => panic!("expected a float, got {:?}", other),
        }
    }
}
