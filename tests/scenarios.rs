//! End-to-end scenarios across store, binder, router and components

use std::cell::RefCell;
use std::rc::Rc;

use futures::executor::block_on;
use glint::template::bind_subtree;
use glint::{
    App, ComponentDescriptor, Document, ErrorKind, Event, Guard, MemoryHistory, RenderError,
    Router, RouterOptions, Store,
};
use pretty_assertions::assert_eq;

fn recorded(app: &App, name: &'static str) -> Rc<RefCell<Vec<Event>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = seen.clone();
    app.events().on(name, move |event| s.borrow_mut().push(event.clone()));
    seen
}

#[test]
fn test_undefined_placeholder_then_set() {
    let app = App::new();
    app.render("<div>count={count}</div>").expect("Should render");
    let child = app.with_document(|doc| doc.children(doc.body())[0]);
    assert_eq!(app.with_document(|doc| doc.inner_html(child)), "count={count}");

    app.set("count", 5);
    assert_eq!(app.with_document(|doc| doc.inner_html(child)), "count=5");
}

#[test]
fn test_bind_subtree_leaves_unknown_keys_intact() {
    let store = Store::default();
    let mut doc = Document::new();
    let body = doc.body();
    doc.set_inner_html(body, "<div>count={count}</div>").expect("Should parse");

    assert!(bind_subtree(&mut doc, body, &store).is_empty());
    let div = doc.children(body)[0];
    assert_eq!(doc.inner_html(div), "count={count}");
}

#[test]
fn test_guarded_routes() {
    let app = App::new();
    app.render(r#"<main id="app"></main>"#).expect("Should render");
    let router = Router::new(&app, MemoryHistory::new(), RouterOptions::default())
        .expect("Should create");
    router.add("/", "Home-{u}").add("/x", "X");
    router.add_guard(Guard::new(|_, to| to != "/x"));
    let routes = recorded(&app, "route-changed");

    block_on(router.navigate("/x"));
    assert_eq!(router.current_route(), None);
    assert_eq!(app.with_document(|doc| doc.inner_html(router.container())), "");
    assert!(routes.borrow().is_empty());

    app.set("u", "Bob");
    block_on(router.navigate("/"));
    assert_eq!(router.current_route(), Some("/".to_string()));
    assert_eq!(
        app.with_document(|doc| doc.text_content(router.container())),
        "Home-Bob"
    );
    assert_eq!(
        *routes.borrow(),
        vec![Event::RouteChanged {
            path: "/".to_string(),
            template: "Home-Bob".to_string(),
        }]
    );
}

#[test]
fn test_throwing_component_gets_fallback() {
    let app = App::new();
    let errors = recorded(&app, "error");
    app.register_component(
        ComponentDescriptor::new("broken-widget")
            .with_render(|_, _| Err(RenderError::new("render threw"))),
    )
    .expect("Should register");

    app.render("<broken-widget></broken-widget>").expect("Should render");

    assert_eq!(app.body_html(), app.boundary().default_fallback());
    assert_eq!(errors.borrow().len(), 1);
    assert!(matches!(
        &errors.borrow()[0],
        Event::Error { kind: ErrorKind::ComponentRender, .. }
    ));
}
