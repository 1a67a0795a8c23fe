//! Integration tests for the store and template bindings

use std::cell::RefCell;
use std::rc::Rc;

use glint::store::Scope;
use glint::template::{bind_subtree, refresh, BindingRecord};
use glint::{App, Document, Store};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn test_same_value_notifies_once() {
    let store = Store::new(Scope::Primary);
    let calls = Rc::new(RefCell::new(0));
    let c = calls.clone();
    let _sub = store.subscribe("k", move |_, _| *c.borrow_mut() += 1);

    assert!(store.set("k", json!({"a": [1, 2]})));
    assert!(!store.set("k", json!({"a": [1, 2]})));
    assert_eq!(*calls.borrow(), 1);
}

#[test]
fn test_unsubscribe_stops_notifications() {
    let app = App::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = seen.clone();
    let sub = app.subscribe("n", move |new, old| {
        s.borrow_mut().push((new.clone(), old.cloned()));
    });

    app.set("n", 1);
    app.set("n", 2);
    sub.unsubscribe();
    app.set("n", 3);

    assert_eq!(
        *seen.borrow(),
        vec![(json!(1), None), (json!(2), Some(json!(1)))]
    );
}

#[test]
fn test_refresh_is_scoped_to_the_changed_key() {
    let app = App::new();
    app.set("y", "why");
    app.render("<p>{x}</p><p>{y}</p>").expect("Should render");
    let before_b = app.with_document(|doc| doc.outer_html(doc.children(doc.body())[1]));

    app.set("x", "ex");

    let (a, b) = app.with_document(|doc| {
        let children = doc.children(doc.body());
        (doc.inner_html(children[0]), doc.outer_html(children[1]))
    });
    assert_eq!(a, "ex");
    assert_eq!(b, before_b);
}

#[test]
fn test_refresh_keeps_node_identity() {
    let app = App::new();
    app.render("<div id=\"greeting\">Hello {name}!</div>").expect("Should render");
    let node = app.select("#greeting").expect("bound node");

    app.set("name", "Ada");
    app.set("name", "Grace");

    assert_eq!(app.select("#greeting"), Some(node));
    assert_eq!(app.with_document(|doc| doc.text_content(node)), "Hello Grace!");
}

#[test]
fn test_bind_subtree_on_detached_document() {
    let store = Store::default();
    let mut doc = Document::new();
    let body = doc.body();
    doc.set_inner_html(body, "<ul><li>{a}</li><li>{b} and {a}</li></ul>")
        .expect("Should parse");

    assert!(bind_subtree(&mut doc, body, &store).is_empty());
    let list = doc.children(body)[0];
    assert_eq!(
        BindingRecord::read(&doc, list),
        Some(BindingRecord {
            keys: vec!["a".to_string(), "b".to_string()],
            template: "<li>{a}</li><li>{b} and {a}</li>".to_string(),
        })
    );

    store.set("a", 1);
    store.set("b", "two");
    let outcome = refresh(&mut doc, "b", &store);
    assert_eq!(outcome.updated, vec![list]);
    assert_eq!(doc.inner_html(list), "<li>1</li><li>two and 1</li>");
}

#[test]
fn test_values_are_displayed_as_text() {
    let app = App::new();
    app.render("<span>{tags}</span><span>{meta}</span><span>{flag}</span>")
        .expect("Should render");
    app.set("tags", json!(["a", "b"]));
    app.set("meta", json!({"n": 1}));
    app.set("flag", false);

    let texts = app.with_document(|doc| {
        doc.children(doc.body())
            .iter()
            .map(|id| doc.text_content(*id))
            .collect::<Vec<_>>()
    });
    assert_eq!(texts, vec!["a,b", r#"{"n":1}"#, "false"]);
}

#[test]
fn test_page_snapshot() {
    let app = App::new();
    app.set("user", "Ada");
    app.render(r#"<header class="top">Signed in as {user}</header><main id="app"></main>"#)
        .expect("Should render");
    insta::assert_snapshot!(
        app.body_html(),
        @r#"<header class="top" data-glint-binding="user" data-glint-template="Signed in as {user}">Signed in as Ada</header><main id="app"></main>"#
    );
}

#[test]
fn test_repeated_sets_do_not_grow_document() {
    let app = App::new();
    app.render("<p>{n}</p>").expect("Should render");
    app.set("n", 0);
    let slots = app.with_document(|doc| doc.slot_count());

    for i in 1..10_000 {
        app.set("n", i);
    }
    assert_eq!(app.with_document(|doc| doc.slot_count()), slots);
    assert_eq!(app.with_document(|doc| doc.text_content(doc.body())), "9999");
}

#[test]
fn test_value_with_stray_closing_tag_stays_text() {
    let app = App::new();
    app.set("note", "see </p> tag");
    app.render("<p>{note}</p>").expect("Should render");

    assert!(app.boundary().reported().is_empty());
    assert_eq!(app.with_document(|doc| doc.text_content(doc.body())), "see </p> tag");

    app.set("note", "<b>bold</b>");
    assert_eq!(
        app.body_html(),
        r#"<p data-glint-binding="note" data-glint-template="{note}"><b>bold</b></p>"#
    );
}
