use std::cell::{Cell, RefCell};

use super::*;

fn controller(json: serde_json::Value) -> Controller {
    Controller::new(&Value::from_json(&json)).unwrap()
}

struct Counting(Rc<Cell<u32>>);

impl Dialog for Counting {
    fn run(&self) -> anyhow::Result<()> {
        self.0.set(self.0.get() + 1);
        Ok(())
    }
}

#[test]
fn call_back_dispatches_by_name() {
    let c = controller(serde_json::json!({})).with_callback("double", |args| {
        Ok(Value::Number(args.first().map_or(0.0, Value::to_number) * 2.0))
    });
    assert_eq!(c.call_back("double", &[Value::from(4)]).unwrap(), Value::from(8));
}

#[test]
fn unknown_names_are_errors() {
    let c = controller(serde_json::json!({}));
    assert!(matches!(
        c.call_back("nope", &[]),
        Err(SpecbindError::UnknownCallback(name)) if name == "nope"
    ));
    assert!(matches!(c.open_dialog("nope"), Err(SpecbindError::UnknownDialog(_))));
    assert!(matches!(c.show_view("main"), Err(SpecbindError::NoViewSwitch)));
}

#[test]
fn failing_callback_is_suppressed() {
    let c = controller(serde_json::json!({}))
        .with_callback("boom", |_| Err(anyhow::anyhow!("exploded")));
    assert_eq!(c.call_back("boom", &[]).unwrap(), Value::Null);
}

#[test]
fn dialogs_and_views() {
    let opened = Rc::new(Cell::new(0));
    let shown = Rc::new(RefCell::new(Vec::new()));
    let s = Rc::clone(&shown);
    let c = controller(serde_json::json!({}))
        .with_dialog("about", Counting(Rc::clone(&opened)))
        .with_view_switch(move |name| {
            s.borrow_mut().push(name.to_owned());
            Ok(())
        });
    c.open_dialog("about").unwrap();
    c.show_view("settings").unwrap();
    assert_eq!(opened.get(), 1);
    assert_eq!(*shown.borrow(), vec!["settings"]);
}

#[test]
fn failing_view_switch_surfaces() {
    let c = controller(serde_json::json!({}))
        .with_view_switch(|_| Err(anyhow::anyhow!("no such view")));
    let err = c.show_view("ghost").unwrap_err();
    assert!(format!("{err:#}").contains("ghost"));
}

#[test]
fn bind_walks_paths_and_wires_parents() {
    let c = controller(serde_json::json!({
        "title": "root",
        "player": {"deck": {"volume": 3}}
    }));
    let deck = c.bind("player.deck").unwrap();
    assert_eq!(deck.get("volume"), Value::from(3));

    let player = c.bind("player").unwrap();
    assert!(deck.binding().parent().unwrap().ptr_eq(player.binding()));
    assert!(player.binding().parent().unwrap().ptr_eq(c.data().binding()));
    assert_eq!(
        deck.binding().get_value("$$title").unwrap(),
        Value::from("root")
    );

    assert!(c.bind("").unwrap().ptr_eq(c.data()));
    assert!(c.bind("player.missing").is_err());
}

#[test]
fn root_must_be_bindable() {
    assert!(Controller::new(&Value::from(1)).is_err());
}
