use pretty_assertions::assert_eq;

use rube_core::ast::{Argument, Literal, NodeKind, ParameterKind};
use rube_core::build::*;
use rube_core::location::Location;
use rube_core::syntax::SyntaxError;

#[test]
fn literal_builders_test() {
    assert_eq!(int(42).kind, NodeKind::Literal(Literal::Integer(42)));
    assert_eq!(nil().kind, NodeKind::Literal(Literal::Nil));
    assert_eq!(boolean(true).kind, NodeKind::Literal(Literal::True));
    assert_eq!(boolean(false).kind, NodeKind::Literal(Literal::False));
    assert_eq!(
        string("hello").kind,
        NodeKind::Literal(Literal::String(String::from("hello")))
    );
    assert_eq!(
        symbol("ready").kind,
        NodeKind::Literal(Literal::Symbol(String::from("ready")))
    );
    assert_eq!(
        big_int("99999999999999999999").kind,
        NodeKind::Literal(Literal::BigInteger(String::from("99999999999999999999")))
    );
}

#[test]
fn call_builders_test() {
    let node = call(local("list"), "push", vec![int(1)]);

    match node.kind {
        NodeKind::MethodCall(call) => {
            assert_eq!(call.name, "push");
            assert_eq!(call.receiver.map(|node| node.kind), Some(NodeKind::LocalVarRef(String::from("list"))));
            assert_eq!(call.args, vec![Argument::Value(int(1))]);
            assert!(call.block.is_none());
        }
        kind => panic!("expected a method call, got {:?}", kind),
    }

    let node = send("puts", vec![]);
    match node.kind {
        NodeKind::MethodCall(call) => assert!(call.receiver.is_none()),
        kind => panic!("expected a method call, got {:?}", kind),
    }
}

#[test]
fn parameter_builders_test() {
    let params = vec![
        required("a"),
        optional("b", int(2)),
        splat("rest"),
        block_param("blk"),
    ];
    let kinds: Vec<ParameterKind> = params.into_iter().map(|param| param.kind).collect();

    assert_eq!(
        kinds,
        vec![
            ParameterKind::Required,
            ParameterKind::Optional(Box::new(int(2))),
            ParameterKind::Splat,
            ParameterKind::Block,
        ]
    );
}

#[test]
fn kind_name_test() {
    let tests = vec![
        (int(1), "Literal"),
        (self_ref(), "SelfRef"),
        (assign("x", int(1)), "LocalVarAssign"),
        (ivar("@x"), "InstanceVarRef"),
        (constant_assign("X", int(1)), "ConstantAssign"),
        (seq(vec![]), "Sequence"),
        (class_def("Foo", None, vec![]), "ClassDef"),
        (module_def("Bar", vec![]), "ModuleDef"),
        (def("baz", vec![], vec![]), "MethodDef"),
        (while_loop(nil(), vec![]), "WhileLoop"),
        (begin_rescue(vec![], vec![], None), "BeginRescue"),
        (lambda(vec![], vec![]), "LambdaLiteral"),
        (ret(None), "Return"),
        (yield_values(vec![]), "Yield"),
        (super_call(None), "Super"),
        (array(vec![]), "ArrayLiteral"),
        (not(nil()), "Not"),
    ];

    for (node, expected) in tests {
        assert_eq!(node.kind_name(), expected);
    }
}

#[test]
fn children_are_in_evaluation_order_test() {
    let node = call_block(
        Some(local("receiver")),
        "each",
        vec![int(1), int(2)],
        block(vec![optional("x", int(3))], vec![int(4)]),
    );
    let children: Vec<NodeKind> = node.children().into_iter().map(|child| child.kind.clone()).collect();

    assert_eq!(
        children,
        vec![
            NodeKind::LocalVarRef(String::from("receiver")),
            int(1).kind,
            int(2).kind,
            int(3).kind,
            seq(vec![int(4)]).kind,
        ]
    );

    let node = begin_rescue(
        vec![int(1)],
        vec![rescue(vec![constant("TypeError")], Some("err"), vec![int(2)])],
        Some(vec![int(3)]),
    );
    let children: Vec<&str> = node.children().into_iter().map(|child| child.kind_name()).collect();

    assert_eq!(children, vec!["Sequence", "ConstantRef", "Sequence", "Sequence"]);

    assert!(int(1).children().is_empty());
    assert_eq!(ret(Some(int(1))).children().len(), 1);
}

#[test]
fn location_test() {
    let node = int(1);
    assert_eq!(node.location(), &Location::default());
    assert_eq!(node.location().to_string(), "(ast):1:1");

    let node = int(1).at(3, 7);
    assert_eq!(node.location().to_string(), "(ast):3:7");

    let location = Location::new("main.rb", 10, 2);
    assert_eq!(location.moved_to(11, 4), Location::new("main.rb", 11, 4));
}

#[test]
fn syntax_error_test() {
    let error = SyntaxError::new("main.rb", 4, 12, "unexpected `end'");

    assert_eq!(error.to_string(), "main.rb:4:12: unexpected `end'");
    assert_eq!(error.file, "main.rb");
    assert_eq!(error.line, 4);
}
