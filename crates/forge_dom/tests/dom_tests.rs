use forge_dom::html::render_page;
use forge_dom::*;
use pretty_assertions::assert_eq;

fn sample_target() -> (MountTarget, uuid::Uuid) {
    let mut target = MountTarget::new("preview-root");
    let mut button = Element::new("button").with_attribute("class", "btn btn-primary");
    button.add_listener(EventType::Click, HandlerId(7));
    let button_id = button.id;
    target.append(
        Element::new("div")
            .with_child(Element::new("h1").with_text("Hello"))
            .with_child(button.with_text("Go"))
            .into(),
    );
    (target, button_id)
}

#[test]
fn test_listener_lookup_by_element_id() {
    let (target, button_id) = sample_target();
    assert_eq!(target.listener(button_id, EventType::Click), Some(HandlerId(7)));
    assert_eq!(target.listener(button_id, EventType::Change), None);
    assert_eq!(target.handlers(), vec![HandlerId(7)]);
}

#[test]
fn test_class_list() {
    let (target, button_id) = sample_target();
    let button = target.find_element(button_id).unwrap();
    assert_eq!(button.class_list(), vec!["btn", "btn-primary"]);
}

#[test]
fn test_render_page_includes_stylesheets_once() {
    let (target, _) = sample_target();
    let mut sheets = StylesheetRegistry::new();
    sheets.inject("https://cdn.example/theme.css");
    sheets.inject("https://cdn.example/theme.css");

    let page = render_page("Preview", &sheets, &target);
    assert_eq!(page.matches("theme.css").count(), 1);
    assert!(page.contains("<div id=\"preview-root\"><div><h1>Hello</h1>"));
    assert!(page.contains("<button class=\"btn btn-primary\">Go</button>"));
}

#[test]
fn test_json_snapshot_has_tags() {
    let (target, _) = sample_target();
    let json = target.to_json();
    assert_eq!(json[0]["Element"]["tag"], "div");
    assert_eq!(json[0]["Element"]["children"][0]["Element"]["tag"], "h1");
}
