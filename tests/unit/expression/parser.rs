use super::*;
use crate::foundation::value::Value;

fn shape(src: &str) -> String {
    parse_expression(src).unwrap().to_string()
}

fn syntax_error(src: &str) -> String {
    match parse_expression(src).unwrap_err() {
        SpecbindError::Syntax { message, .. } => message,
        other => panic!("expected a syntax error, got {other:?}"),
    }
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    assert_eq!(shape("$0 + $1 * $2"), "($0 + ($1 * $2))");
    assert_eq!(shape("$0 * $1 + $2"), "(($0 * $1) + $2)");
    assert_eq!(shape("a * b * c + d"), "(((a * b) * c) + d)");
}

#[test]
fn same_precedence_groups_left() {
    assert_eq!(shape("a - b - c"), "((a - b) - c)");
    assert_eq!(shape("a / b * c"), "((a / b) * c)");
}

#[test]
fn parentheses_override_precedence() {
    assert_eq!(shape("($0 + $1) * $2"), "(($0 + $1) * $2)");
    assert_eq!(shape("((a))"), "a");
}

#[test]
fn logical_operators_sit_below_comparison() {
    assert_eq!(shape("a == 1 && b != 2"), "((a == 1) && (b != 2))");
    assert_eq!(shape("a || b && c"), "(a || (b && c))");
}

#[test]
fn concatenation_sits_between_addition_and_multiplication() {
    assert_eq!(shape("a + b .. c * d"), "(a + (b .. (c * d)))");
}

#[test]
fn ternary_is_loosest_and_right_associative() {
    assert_eq!(shape("x == 1 ? 'a' : 'b'"), "((x == 1) ? (\"a\" : \"b\"))");
    assert_eq!(shape("a ? b : c ? d : e"), "(a ? (b : (c ? (d : e))))");
    assert_eq!(shape("a ? b : c || d"), "(a ? (b : (c || d)))");
}

#[test]
fn prefix_operators_apply_to_the_first_operand() {
    assert_eq!(shape("-a + b"), "(-a + b)");
    assert_eq!(shape("!a && b"), "(!a && b)");
    assert_eq!(shape("!(a && b)"), "!(a && b)");
    assert_eq!(shape("a * -b"), "(a * -b)");
    assert_eq!(shape("- -a"), "--a");
}

#[test]
fn leaves() {
    assert_eq!(
        parse_expression("@title").unwrap(),
        Expr::Property("title".to_owned())
    );
    assert_eq!(
        parse_expression("1e3").unwrap(),
        Expr::Literal(1000.0.into())
    );
    assert_eq!(parse_expression("null").unwrap(), Expr::Literal(Value::Null));
}

#[test]
fn template_parsing() {
    assert_eq!(parse_template("Hi $name").unwrap().to_string(), "(\"Hi \" .. $name)");
    assert_eq!(parse_template("plain").unwrap(), Expr::Literal("plain".into()));
    assert_eq!(
        parse_template("{{ a ? \"$x\" : y }}").unwrap().to_string(),
        "(a ? ((\"\" .. $x) : y))"
    );
}

#[test]
fn structural_errors() {
    assert!(syntax_error("(a + b").contains("unbalanced"));
    assert!(syntax_error("a + b)").contains("unexpected"));
    assert!(syntax_error("a b").contains("unexpected"));
    assert!(syntax_error("a ? b").contains("\":\" branch"));
    assert!(syntax_error("* a").contains("left operand"));
    assert!(syntax_error("a +").contains("right operand"));
    assert!(syntax_error("()").contains("empty parentheses"));
    assert!(syntax_error("   ").contains("empty expression"));
    assert!(parse_template("{{  }}").unwrap_err().is_syntax());
}

#[test]
fn nested_ternary_in_then_branch_needs_parentheses() {
    assert!(parse_expression("a ? b ? c : d : e").is_err());
    assert_eq!(
        shape("a ? (b ? c : d) : e"),
        "(a ? ((b ? (c : d)) : e))"
    );
}

#[test]
fn long_templates_parse_in_one_pass() {
    let template: String = (0..2000).map(|i| format!("$x{i} ")).collect();
    let expr = parse_template(&template).unwrap();
    assert_eq!(expr.fields().len(), 2000);
    assert!(matches!(
        expr,
        Expr::Unary {
            op: UnaryOp::Group,
            ..
        }
    ));
}

#[test]
fn long_operator_chains_group_left() {
    let src = (0..2000)
        .map(|i| format!("$x{i}"))
        .collect::<Vec<_>>()
        .join(" + ");
    let expr = parse_expression(&src).unwrap();
    assert_eq!(expr.fields().len(), 2000);
    let Expr::Binary { op, rhs, .. } = &expr else {
        panic!("expected a binary root, got {expr:?}");
    };
    assert_eq!(*op, BinaryOp::Add);
    assert_eq!(**rhs, Expr::Variable("$x1999".to_owned()));
}

#[test]
fn deeply_nested_parentheses_parse() {
    let src = format!("{}a{}", "(".repeat(500), ")".repeat(500));
    assert_eq!(shape(&src), "a");
    assert!(syntax_error(&format!("{}a", "(".repeat(500))).contains("unbalanced"));
}
