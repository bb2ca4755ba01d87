//! Native events, two-way binding, custom events and method scheduling.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use pretty_assertions::assert_eq;
use spark_dom::{
    Component, Config, Dom, Event, Fields, MemoryDom, NodeId, Program, Record, TaskQueue, Value,
};

fn document() -> (Rc<MemoryDom>, NodeId) {
    let dom = Rc::new(MemoryDom::new());
    let app = dom.element(dom.body(), "div", &[("id", "app")]);
    (dom, app)
}

fn find(dom: &MemoryDom, node: NodeId, tag: &str) -> Option<NodeId> {
    if dom.tag(node).as_deref() == Some(tag) {
        return Some(node);
    }
    dom.children(node).into_iter().find_map(|c| find(dom, c, tag))
}

fn counter() -> (Rc<Cell<usize>>, Rc<Cell<usize>>) {
    let count = Rc::new(Cell::new(0));
    (count.clone(), count)
}

#[test]
fn test_click_calls_method_and_rerenders() {
    struct App {
        message: String,
    }

    let app = Component::builder(r#"<div><p>{{Message}}</p><button @click="Reverse">go</button></div>"#)
        .data(
            || App {
                message: "Hello".to_string(),
            },
            Fields::new().field(
                "Message",
                |a: &App| a.message.clone(),
                |a: &mut App, v: String| a.message = v,
            ),
        )
        .method("Reverse", |ctx| {
            ctx.update(|a: &mut App| a.message = a.message.chars().rev().collect())
        })
        .build();
    let (dom, root) = document();
    let program = Program::mount(dom.clone(), "#app", &app).unwrap();

    let button = find(&dom, root, "button").unwrap();
    assert_eq!(dom.attribute(button, "data-v-on-click").as_deref(), Some("Reverse"));

    dom.dispatch(&mut Event::new("click", button));
    assert_eq!(dom.inner_html(root), r#"<div><p>olleH</p><button data-v-on-click="Reverse">go</button></div>"#);
    assert!(program.take_fault().is_none());
}

#[test]
fn test_model_input_writes_back() {
    let app = Component::builder(r#"<div><input v-model="Message"><p>{{Message}}</p></div>"#)
        .record(Record::new().with("Message", "Hello"))
        .build();
    let (dom, root) = document();
    let program = Program::mount(dom.clone(), "#app", &app).unwrap();

    let input = find(&dom, root, "input").unwrap();
    assert_eq!(dom.attribute(input, "value").as_deref(), Some("Hello"));
    assert_eq!(dom.attribute(input, "data-v-model").as_deref(), Some("Message"));

    dom.set_value(input, "Hi there");
    let mut event = Event::new("input", input);
    dom.dispatch(&mut event);

    assert!(event.is_propagation_stopped());
    assert_eq!(program.get("Message").unwrap(), Value::from("Hi there"));
    let p = find(&dom, root, "p").unwrap();
    assert_eq!(dom.inner_html(p), "Hi there");
    assert_eq!(dom.attribute(input, "value").as_deref(), Some("Hi there"));
}

#[test]
fn test_key_modifiers_filter_events() {
    let (calls, seen) = counter();
    let app = Component::builder(r#"<div><input @keyup.enter.page-down="Submit"></div>"#)
        .method("Submit", move |_ctx| {
            calls.set(calls.get() + 1);
            Ok(())
        })
        .build();
    let (dom, root) = document();
    let _program = Program::mount(dom.clone(), "#app", &app).unwrap();

    let input = find(&dom, root, "input").unwrap();
    assert_eq!(dom.attribute(input, "data-v-keys-keyup").as_deref(), Some("Enter,PageDown"));

    dom.dispatch(&mut Event::new("keyup", input).with_key("a"));
    assert_eq!(seen.get(), 0);
    dom.dispatch(&mut Event::new("keyup", input).with_key("Enter"));
    dom.dispatch(&mut Event::new("keyup", input).with_key("pagedown"));
    assert_eq!(seen.get(), 2);
}

#[test]
fn test_one_native_listener_per_event_type() {
    let app = Component::builder(
        r#"<ul><li v-for="x in Items" @click="Pick">{{x}}</li><li @dblclick="Pick">z</li></ul>"#,
    )
    .record(Record::new().with("Items", vec![1, 2, 3]))
    .build();
    let (dom, root) = document();
    let program = Program::mount(dom.clone(), "#app", &app).unwrap();
    program.render().unwrap();
    assert_eq!(dom.listener_count(root), 2);
    assert_eq!(dom.total_listeners(), 2);
}

/// app (subscribes "pick") > panel (no subscription) > leaf (emits "pick").
fn three_levels(hits: Rc<RefCell<Vec<Value>>>) -> Rc<Component> {
    let leaf = Component::builder(r#"<button @click="Go">go</button>"#)
        .name("leaf")
        .method("Go", |ctx| {
            ctx.emit("pick", vec![Value::from("x")]);
            Ok(())
        })
        .method("Quiet", |ctx| {
            ctx.emit("nobody-listens", vec![]);
            Ok(())
        })
        .build();
    let panel = Component::builder("<section><leaf></leaf></section>")
        .name("panel")
        .component("leaf", leaf)
        .build();
    Component::builder(r#"<div><panel @pick="Picked"></panel><p>{{Last}}</p></div>"#)
        .name("app")
        .record(Record::new().with("Last", ""))
        .method("Picked", move |ctx| {
            let value = ctx.arg(0).cloned().unwrap_or_default();
            hits.borrow_mut().push(value.clone());
            ctx.set("Last", value)
        })
        .component("panel", panel)
        .build()
}

#[test]
fn test_custom_event_bubbles_two_levels() {
    let hits = Rc::new(RefCell::new(Vec::new()));
    let app = three_levels(hits.clone());
    let (dom, root) = document();
    let program = Program::mount(dom.clone(), "#app", &app).unwrap();

    let button = find(&dom, root, "button").unwrap();
    dom.dispatch(&mut Event::new("click", button));

    assert_eq!(*hits.borrow(), vec![Value::from("x")], "ancestor method ran once");
    let p = find(&dom, root, "p").unwrap();
    assert_eq!(dom.inner_html(p), "x");
    assert!(program.take_fault().is_none());
}

#[test]
fn test_unmatched_custom_event_is_silent() {
    let hits = Rc::new(RefCell::new(Vec::new()));
    let app = three_levels(hits.clone());
    let (dom, root) = document();
    let program = Program::mount(dom.clone(), "#app", &app).unwrap();
    let before = dom.inner_html(root);

    let panel = &program.view_model().children()[0];
    let leaf = &panel.children()[0];
    dom.take_mutations();
    program.view_model().call("Nonexistent", &[]).unwrap();
    leaf.call("Quiet", &[]).unwrap();

    assert!(hits.borrow().is_empty());
    assert_eq!(dom.inner_html(root), before);
    assert!(program.take_fault().is_none());
}

#[test]
fn test_listener_errors_land_in_fault_slot() {
    let app = Component::builder(r#"<button @click="Break">x</button>"#)
        .method("Break", |ctx| ctx.set("Missing", 1))
        .build();
    let (dom, root) = document();
    let program = Program::mount(dom.clone(), "#app", &app).unwrap();

    let button = find(&dom, root, "button").unwrap();
    dom.dispatch(&mut Event::new("click", button));
    assert!(matches!(program.take_fault(), Some(spark_dom::Error::UnknownField(_))));
    assert!(program.take_fault().is_none(), "fault is taken once");
}

#[test]
fn test_go_defers_to_spawner() {
    let app = Component::builder("<p>{{Status}}</p>")
        .record(Record::new().with("Status", "idle"))
        .method("Load", |ctx| {
            ctx.set("Status", "loading")?;
            ctx.go("Fetch", vec![Value::from("done")]);
            Ok(())
        })
        .method("Fetch", |ctx| {
            let status = ctx.arg(0).cloned().unwrap_or_default();
            ctx.set("Status", status)
        })
        .build();
    let (dom, root) = document();
    let queue = Rc::new(TaskQueue::new());
    let program = Program::mount_with(dom.clone(), "#app", &app, Config::default(), queue.clone()).unwrap();

    program.call("Load", vec![]).unwrap();
    assert_eq!(dom.inner_html(root), "<p>loading</p>");
    assert_eq!(queue.pending(), 1);

    assert_eq!(queue.run_until_idle(), 1);
    assert_eq!(dom.inner_html(root), "<p>done</p>");
}

#[test]
fn test_call_effect_runs_after_method() {
    let order = Rc::new(RefCell::new(Vec::new()));
    let (first, second) = (order.clone(), order.clone());
    let app = Component::builder("<p>{{N}}</p>")
        .record(Record::new().with("N", 0))
        .method("First", move |ctx| {
            ctx.call("Second", vec![]);
            first.borrow_mut().push("first");
            ctx.set("N", 1)
        })
        .method("Second", move |ctx| {
            second.borrow_mut().push("second");
            ctx.set("N", 2)
        })
        .build();
    let (dom, root) = document();
    let program = Program::mount(dom.clone(), "#app", &app).unwrap();

    program.call("First", vec![]).unwrap();
    assert_eq!(*order.borrow(), vec!["first", "second"]);
    assert_eq!(dom.inner_html(root), "<p>2</p>");
}

#[test]
fn test_custom_config_prefix() {
    let config = Config {
        prefix: "x-".to_string(),
        ..Config::default()
    };
    let app = Component::builder(r#"<ul><li x-for="i in Items">{{i}}</li></ul>"#)
        .record(Record::new().with("Items", vec!["a"]))
        .build();
    let (dom, root) = document();
    Program::mount_with(dom.clone(), "#app", &app, config, Rc::new(spark_dom::Immediate)).unwrap();
    assert_eq!(dom.inner_html(root), "<ul><li>a</li></ul>");
}
