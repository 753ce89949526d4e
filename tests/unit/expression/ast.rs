use super::*;
use crate::binding::binding::get_proxy;
use crate::expression::parser::{parse_expression, parse_template};

fn eval(src: &str, data: serde_json::Value) -> Value {
    parse_expression(src)
        .unwrap()
        .exec(&Value::from_json(&data), &Value::Null)
        .unwrap()
}

fn fields(src: &str) -> Vec<String> {
    parse_expression(src).unwrap().fields().into_iter().collect()
}

#[test]
fn arithmetic_follows_precedence() {
    let data = serde_json::json!([3, 3, 3]);
    assert_eq!(eval("$0 + $1 * $2", data), Value::from(12));
    assert_eq!(eval("($0 + $1) * $2", serde_json::json!([2, 1, 3])), Value::from(9));
    assert_eq!(eval("7 % 4 - 10 / 4", serde_json::json!({})), Value::from(0.5));
}

#[test]
fn plus_concatenates_when_either_side_is_text() {
    assert_eq!(eval("'a' + 1", serde_json::json!({})), Value::from("a1"));
    assert_eq!(eval("1 + 2 .. 3", serde_json::json!({})), Value::from("123"));
    assert_eq!(eval("n .. '!'", serde_json::json!({"n": null})), Value::from("!"));
}

#[test]
fn logical_operators_return_an_operand() {
    let data = serde_json::json!({"name": "", "fallback": "anon"});
    assert_eq!(eval("name || fallback", data.clone()), Value::from("anon"));
    assert_eq!(eval("name && fallback", data), Value::from(""));
}

#[test]
fn comparisons() {
    let data = serde_json::json!({"n": 2, "s": "b"});
    assert_eq!(eval("n > 1 && n <= 2", data.clone()), Value::from(true));
    assert_eq!(eval("s < 'c'", data.clone()), Value::from(true));
    assert_eq!(eval("n == '2'", data.clone()), Value::from(true));
    assert_eq!(eval("missing == null", data), Value::from(true));
}

#[test]
fn ternary_evaluates_only_the_chosen_branch() {
    let data = serde_json::json!({"a": true, "x": 1, "y": 2});
    assert_eq!(eval("a ? x : y", data.clone()), Value::from(1));
    assert_eq!(eval("!a ? x : y", data.clone()), Value::from(2));
    assert_eq!(eval("a ? x : $$nowhere", data), Value::from(1));
}

#[test]
fn bare_colon_fails_at_evaluation() {
    let expr = parse_expression("a : b").unwrap();
    let err = expr.exec(&Value::Null, &Value::Null).unwrap_err();
    assert!(matches!(err, SpecbindError::Evaluation(_)));
}

#[test]
fn unary_operators() {
    let data = serde_json::json!({"s": "4"});
    assert_eq!(eval("-s", data.clone()), Value::from(-4));
    assert_eq!(eval("+s + 1", data.clone()), Value::from(5));
    assert_eq!(eval("!s", data), Value::from(false));
}

#[test]
fn scope_depth_walks_parent_members() {
    let data = serde_json::json!({"a": 1, "parent": {"b": 1, "parent": {"c": 1}}});
    assert_eq!(eval("$a + $$b + $$$c", data), Value::from(3));
}

#[test]
fn scope_depth_prefers_binding_parents() {
    let root = get_proxy(
        &Value::from_json(&serde_json::json!({"theme": "dark", "row": {"label": "x"}})),
        None,
    )
    .unwrap();
    let row = root.child("row").unwrap();
    let expr = parse_expression("label .. '/' .. $$theme").unwrap();
    assert_eq!(
        expr.exec(&row.to_value(), &Value::Null).unwrap(),
        Value::from("x/dark")
    );
}

#[test]
fn sigil_only_variable_is_the_scope_itself() {
    let data = Value::from_json(&serde_json::json!({"parent": {"k": 1}}));
    let here = parse_expression("$").unwrap().exec(&data, &Value::Null).unwrap();
    assert_eq!(here, data);
    let up = parse_expression("$$").unwrap().exec(&data, &Value::Null).unwrap();
    assert_eq!(up.as_object().unwrap().get("k"), Value::from(1));
}

#[test]
fn missing_parent_is_an_error() {
    let expr = parse_expression("$$b").unwrap();
    let err = expr
        .exec(&Value::from_json(&serde_json::json!({})), &Value::Null)
        .unwrap_err();
    assert!(err.to_string().contains("$$b"));
}

#[test]
fn properties_read_the_spec_row() {
    let expr = parse_expression("@label .. ':' .. label").unwrap();
    let data = Value::from_json(&serde_json::json!({"label": "data"}));
    let row = Value::from_json(&serde_json::json!({"label": "row"}));
    assert_eq!(expr.exec(&data, &row).unwrap(), Value::from("row:data"));
    assert!(expr.fields().contains("label"));
    assert_eq!(expr.fields().len(), 1);
}

#[test]
fn field_names_drop_one_sigil() {
    assert_eq!(fields("$a + $$b + c + @d + $"), vec!["$b", "a", "c"]);
    assert!(fields("1 + 2").is_empty());
}

#[test]
fn template_keeps_the_result_type() {
    let expr = parse_template("{{ a ? \"$x\" : y }}").unwrap();
    let on = Value::from_json(&serde_json::json!({"a": true, "x": 1, "y": 2}));
    let off = Value::from_json(&serde_json::json!({"a": false, "x": 1, "y": 2}));
    assert_eq!(expr.exec(&on, &Value::Null).unwrap(), Value::from("1"));
    assert_eq!(expr.exec(&off, &Value::Null).unwrap(), Value::from(2));
    let names: Vec<_> = expr.fields().into_iter().collect();
    assert_eq!(names, vec!["a", "x", "y"]);
}

#[test]
fn scope_depth_past_the_guard_is_a_recursion_error() {
    let src = format!("{}x", "$".repeat(MAX_DEPTH + 1));
    let err = parse_expression(&src)
        .unwrap()
        .exec(&Value::from_json(&serde_json::json!({"x": 1})), &Value::Null)
        .unwrap_err();
    assert!(matches!(err, SpecbindError::Recursion(_)));
}
