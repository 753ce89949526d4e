use std::cell::RefCell;
use std::rc::Rc;

use crate::binding::binding::get_proxy;
use crate::expression::FieldSet;
use crate::foundation::value::Value;

fn recorder() -> (Rc<RefCell<Vec<Value>>>, impl Fn(&Value) + 'static) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    (seen, move |v: &Value| sink.borrow_mut().push(v.clone()))
}

#[test]
fn bind_expr_fires_initially_and_on_each_field() {
    let data = get_proxy(&Value::from_json(&serde_json::json!({"a": 1, "b": 2})), None).unwrap();
    let (seen, sink) = recorder();
    let bound = data.binding().bind_expr("a + b", sink, &Value::Null).unwrap();
    assert_eq!(bound.value, Value::from(3));
    assert_eq!(bound.fields.len(), 2);

    data.set("a", 10).unwrap();
    data.set("b", 0).unwrap();
    assert_eq!(
        *seen.borrow(),
        vec![Value::from(3), Value::from(12), Value::from(10)]
    );
}

#[test]
fn constant_templates_never_subscribe() {
    let data = get_proxy(&Value::from_json(&serde_json::json!({})), None).unwrap();
    let (seen, sink) = recorder();
    let bound = data.binding().bind_template("Static", sink, &Value::Null).unwrap();
    assert!(bound.id.is_none());
    assert!(bound.fields.is_empty());
    assert_eq!(*seen.borrow(), vec![Value::from("Static")]);
    assert!(data.binding().is_empty());
}

#[test]
fn template_switches_branch_and_type() {
    let data = get_proxy(
        &Value::from_json(&serde_json::json!({"a": true, "x": 1, "y": 2})),
        None,
    )
    .unwrap();
    let (seen, sink) = recorder();
    let bound = data
        .binding()
        .bind_template("{{ a? \"$x\": y }}", sink, &Value::Null)
        .unwrap();
    let names: Vec<_> = bound.fields.iter().cloned().collect();
    assert_eq!(names, vec!["a", "x", "y"]);
    assert_eq!(bound.value, Value::from("1"));

    data.set("a", false).unwrap();
    assert_eq!(*seen.borrow().last().unwrap(), Value::from(2));
}

#[test]
fn parent_fields_subscribe_on_the_parent() {
    let root = get_proxy(
        &Value::from_json(&serde_json::json!({"unit": "kg", "row": {"n": 3}})),
        None,
    )
    .unwrap();
    let row = root.child("row").unwrap();
    let (seen, sink) = recorder();
    row.binding()
        .bind_template("$n $$unit", sink, &Value::Null)
        .unwrap();
    root.set("unit", "lb").unwrap();
    assert_eq!(
        *seen.borrow(),
        vec![Value::from("3 kg"), Value::from("3 lb")]
    );
}

#[test]
fn unbind_releases_every_field() {
    let data = get_proxy(&Value::from_json(&serde_json::json!({"a": 1, "b": 2})), None).unwrap();
    let (seen, sink) = recorder();
    let bound = data.binding().bind_expr("a .. b", sink, &Value::Null).unwrap();
    assert_eq!(data.binding().len(), 2);

    assert!(data.binding().unbind(bound.id.unwrap()));
    assert!(data.binding().is_empty());
    data.set("a", 5).unwrap();
    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn bind_fields_rolls_back_on_unresolvable_field() {
    let data = get_proxy(&Value::from_json(&serde_json::json!({"a": 1})), None).unwrap();
    let fields: FieldSet = ["a", "$orphan"].into_iter().map(str::to_owned).collect();
    assert!(data.binding().bind_fields(&fields, |_, _| {}).is_err());
    assert!(data.binding().is_empty());
    assert_eq!(data.binding().bind_count(), 0);
}

#[test]
fn bind_fields_reports_the_field_name() {
    let data = get_proxy(&Value::from_json(&serde_json::json!({"a": 1, "b": 2})), None).unwrap();
    let names = Rc::new(RefCell::new(Vec::new()));
    let n = Rc::clone(&names);
    let fields: FieldSet = ["a", "b"].into_iter().map(str::to_owned).collect();
    let id = data
        .binding()
        .bind_fields(&fields, move |name, _| n.borrow_mut().push(name.to_owned()))
        .unwrap();
    assert!(id.is_some());
    data.set("b", 3).unwrap();
    data.delete("a").unwrap();
    assert_eq!(*names.borrow(), vec!["b", "a"]);
}

#[test]
fn syntax_errors_surface_without_subscribing() {
    let data = get_proxy(&Value::from_json(&serde_json::json!({})), None).unwrap();
    let err = data
        .binding()
        .bind_expr("(a", |_| {}, &Value::Null)
        .unwrap_err();
    assert!(err.is_syntax());
    assert!(data.binding().is_empty());
}
