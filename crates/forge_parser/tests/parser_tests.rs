use forge_parser::parser::{parse_expression_str, parse_program, ParseError};
use forge_parser::*;
use pretty_assertions::assert_eq;

fn create_element(args: Vec<Expression>) -> Expression {
    Expression::call(
        Expression::member(Expression::identifier("React"), "createElement"),
        args,
    )
}

fn prop(key: &str, value: Expression) -> ObjectMember {
    ObjectMember::Property {
        key: PropertyKey::Static(key.to_string()),
        value,
    }
}

#[test]
fn test_function_component() {
    let code = r#"
        import React, { useState } from 'react';

        function Counter() {
            const [count, setCount] = useState(0);
            return (
                <div className="counter">
                    <p>Count: {count}</p>
                    <button onClick={() => setCount(count + 1)}>Increment</button>
                </div>
            );
        }

        export default Counter;
    "#;
    let result = parse_program(code);
    assert!(result.is_ok(), "Failed to parse: {:?}", result.err());
    let program = result.unwrap();
    assert_eq!(program.declared_functions(), vec!["Counter"]);
    assert_eq!(program.body.len(), 3);
}

#[test]
fn test_arrow_component_binding() {
    let code = r#"
        const Greeting = ({ name = "world" }) => {
            return <h1>Hello, {name}!</h1>;
        };
    "#;
    let program = parse_program(code).unwrap();
    match &program.body[0] {
        Statement::Variable { kind, declarations } => {
            assert_eq!(*kind, VarKind::Const);
            assert_eq!(declarations[0].pattern.bound_names(), vec!["Greeting"]);
            match &declarations[0].init {
                Some(Expression::Function(def)) => {
                    assert!(def.is_arrow);
                    assert_eq!(def.params.len(), 1);
                    assert!(matches!(def.params[0].pattern, Pattern::Object { .. }));
                }
                other => panic!("Expected arrow function, got {:?}", other),
            }
        }
        other => panic!("Expected variable statement, got {:?}", other),
    }
}

#[test]
fn test_intrinsic_element_lowering() {
    let expr = parse_expression_str(r#"<div className="box">Hi</div>"#).unwrap();
    let expected = create_element(vec![
        Expression::String("div".into()),
        Expression::Object(vec![prop("className", Expression::String("box".into()))]),
        Expression::String("Hi".into()),
    ]);
    assert_eq!(expr, expected);
}

#[test]
fn test_component_element_lowering() {
    let expr = parse_expression_str("<Counter step={2} disabled />").unwrap();
    let expected = create_element(vec![
        Expression::identifier("Counter"),
        Expression::Object(vec![
            prop("step", Expression::Number(2.0)),
            prop("disabled", Expression::Boolean(true)),
        ]),
    ]);
    assert_eq!(expr, expected);
}

#[test]
fn test_member_tag_and_fragment() {
    let expr = parse_expression_str("<><Theme.Provider /></>").unwrap();
    let inner = create_element(vec![
        Expression::member(Expression::identifier("Theme"), "Provider"),
        Expression::Null,
    ]);
    let expected = create_element(vec![
        Expression::member(Expression::identifier("React"), "Fragment"),
        Expression::Null,
        inner,
    ]);
    assert_eq!(expr, expected);
}

#[test]
fn test_jsx_text_whitespace() {
    let expr = parse_expression_str("<p>\n    Hello\n    world\n</p>").unwrap();
    let expected = create_element(vec![
        Expression::String("p".into()),
        Expression::Null,
        Expression::String("Hello world".into()),
    ]);
    assert_eq!(expr, expected);
}

#[test]
fn test_jsx_space_between_expressions() {
    let expr = parse_expression_str("<p>{a} {b}</p>").unwrap();
    let expected = create_element(vec![
        Expression::String("p".into()),
        Expression::Null,
        Expression::identifier("a"),
        Expression::String(" ".into()),
        Expression::identifier("b"),
    ]);
    assert_eq!(expr, expected);
}

#[test]
fn test_jsx_empty_container_and_entities() {
    let expr = parse_expression_str("<p>{/* note */}Tom &amp; Jerry</p>").unwrap();
    let expected = create_element(vec![
        Expression::String("p".into()),
        Expression::Null,
        Expression::String("Tom & Jerry".into()),
    ]);
    assert_eq!(expr, expected);
}

#[test]
fn test_jsx_spread_attribute() {
    let expr = parse_expression_str("<input {...rest} type='text' />").unwrap();
    let expected = create_element(vec![
        Expression::String("input".into()),
        Expression::Object(vec![
            ObjectMember::Spread(Expression::identifier("rest")),
            prop("type", Expression::String("text".into())),
        ]),
    ]);
    assert_eq!(expr, expected);
}

#[test]
fn test_mismatched_closing_tag() {
    let result = parse_expression_str("<div><span></div></span>");
    assert!(result.is_err());

    let result = parse_expression_str("<div></span>");
    match result {
        Err(ParseError::MismatchedClosingTag { opened, closed }) => {
            assert_eq!(opened, "div");
            assert_eq!(closed, "span");
        }
        other => panic!("Expected mismatched tag error, got {:?}", other),
    }
}

#[test]
fn test_syntax_error_has_location() {
    let code = "function App( {\n  return 1;\n}";
    let err = parse_program(code).unwrap_err();
    assert!(matches!(err, ParseError::PestError(_)));
    assert!(err.location().is_some());
}

#[test]
fn test_invalid_assignment_target() {
    let result = parse_program("1 = 2;");
    assert!(matches!(result, Err(ParseError::InvalidAssignmentTarget)));
}

#[test]
fn test_operator_precedence() {
    let expr = parse_expression_str("1 + 2 * 3").unwrap();
    let expected = Expression::Binary {
        operator: BinaryOp::Add,
        left: Box::new(Expression::Number(1.0)),
        right: Box::new(Expression::Binary {
            operator: BinaryOp::Multiply,
            left: Box::new(Expression::Number(2.0)),
            right: Box::new(Expression::Number(3.0)),
        }),
    };
    assert_eq!(expr, expected);
}

#[test]
fn test_bitwise_precedence() {
    // & binds tighter than |, shifts tighter than comparison
    let expr = parse_expression_str("a | b & 1").unwrap();
    match expr {
        Expression::Binary { operator, right, .. } => {
            assert_eq!(operator, BinaryOp::BitOr);
            assert!(matches!(*right, Expression::Binary { operator: BinaryOp::BitAnd, .. }));
        }
        other => panic!("Expected binary, got {:?}", other),
    }
    let expr = parse_expression_str("1 << 2 < x >>> 1").unwrap();
    assert!(matches!(expr, Expression::Binary { operator: BinaryOp::LessThan, .. }));
    let expr = parse_expression_str("~x").unwrap();
    assert!(matches!(expr, Expression::Unary { operator: UnaryOp::BitNot, .. }));
}

#[test]
fn test_regex_literal_and_division() {
    let expr = parse_expression_str(r"/^[^\s@]+@[^\s@/]+$/i.test(email)").unwrap();
    let Expression::Call { callee, .. } = expr else {
        panic!("Expected call");
    };
    let Expression::Member { object, .. } = *callee else {
        panic!("Expected member");
    };
    assert_eq!(
        *object,
        Expression::RegExp {
            pattern: r"^[^\s@]+@[^\s@/]+$".to_string(),
            flags: "i".to_string(),
        }
    );

    let expr = parse_expression_str("a / b / 2").unwrap();
    assert!(matches!(expr, Expression::Binary { operator: BinaryOp::Divide, .. }));
}

#[test]
fn test_logical_and_ternary() {
    let expr = parse_expression_str("a && b ? 'yes' : 'no'").unwrap();
    match expr {
        Expression::Conditional { test, .. } => {
            assert!(matches!(*test, Expression::Logical { operator: LogicalOp::And, .. }));
        }
        other => panic!("Expected conditional, got {:?}", other),
    }
}

#[test]
fn test_template_literal() {
    let expr = parse_expression_str("`Count: ${count}!`").unwrap();
    assert_eq!(
        expr,
        Expression::Template {
            quasis: vec!["Count: ".into(), "!".into()],
            expressions: vec![Expression::identifier("count")],
        }
    );
}

#[test]
fn test_string_escapes() {
    let expr = parse_expression_str(r#""line\n\"quoted\" A""#).unwrap();
    assert_eq!(expr, Expression::String("line\n\"quoted\" A".into()));
}

#[test]
fn test_import_specifiers() {
    let program = parse_program("import React, { useState as useS, useEffect } from 'react';").unwrap();
    match &program.body[0] {
        Statement::Import(decl) => {
            assert_eq!(decl.source, "react");
            assert_eq!(decl.default, Some(Identifier::new("React")));
            assert_eq!(
                decl.named,
                vec![
                    ("useState".to_string(), Identifier::new("useS")),
                    ("useEffect".to_string(), Identifier::new("useEffect")),
                ]
            );
        }
        other => panic!("Expected import, got {:?}", other),
    }
}

#[test]
fn test_optional_chaining() {
    let expr = parse_expression_str("user?.profile?.name").unwrap();
    match expr {
        Expression::Member { optional, property, .. } => {
            assert!(optional);
            assert_eq!(property, MemberProperty::Named("name".into()));
        }
        other => panic!("Expected member, got {:?}", other),
    }
}

#[test]
fn test_control_flow_statements() {
    let code = r#"
        function total(items) {
            let sum = 0;
            for (let i = 0; i < items.length; i++) {
                if (items[i] < 0) continue;
                sum += items[i];
            }
            for (const item of items) { sum -= 0; }
            while (false) {}
            switch (sum) {
                case 0:
                    return "none";
                default:
                    break;
            }
            try { throw new Error("x"); } catch (e) { sum = 1; } finally { }
            return sum;
        }
    "#;
    let result = parse_program(code);
    assert!(result.is_ok(), "Failed to parse: {:?}", result.err());
}

#[test]
fn test_byte_order_mark_is_ignored() {
    let result = parse_program("\u{feff}function App() { return null; }");
    assert!(result.is_ok(), "Failed to parse: {:?}", result.err());
}

#[test]
fn test_map_with_keys() {
    let code = r#"
        function List() {
            const items = ["a", "b"];
            return (
                <ul>
                    {items.map((item, index) => (
                        <li key={index}>{item}</li>
                    ))}
                </ul>
            );
        }
    "#;
    let result = parse_program(code);
    assert!(result.is_ok(), "Failed to parse: {:?}", result.err());
}
