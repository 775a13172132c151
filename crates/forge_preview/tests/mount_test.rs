use forge_dom::{DomNode, Element};
use forge_preview::{
    Failure, FailureKind, MountContent, MountError, MountTicket, PreviewMountManager, StylingChoice,
};
use pretty_assertions::assert_eq;

const TAILWIND: &str = "https://cdn.jsdelivr.net/npm/tailwindcss@2.2.19/dist/tailwind.min.css";

fn paragraph(text: &str) -> MountContent {
    MountContent::Nodes(vec![DomNode::from(Element::new("p").with_text(text))])
}

#[test]
fn test_tickets_are_monotonic() {
    let mut manager = PreviewMountManager::default();
    assert_eq!(manager.latest(), MountTicket(0));
    let first = manager.begin();
    let second = manager.begin();
    assert!(second > first);
    assert_eq!(manager.latest(), second);
}

#[test]
fn test_stale_run_cannot_commit() {
    let mut manager = PreviewMountManager::default();
    let styling = StylingChoice::none();

    let slow = manager.begin();
    let fast = manager.begin();
    manager.mount(fast, paragraph("second"), &styling).unwrap();

    let err = manager.mount(slow, paragraph("first"), &styling).unwrap_err();
    assert_eq!(err, MountError::Stale { ticket: slow, latest: fast });
    assert_eq!(manager.panel_html(), "<p>second</p>");
}

#[test]
fn test_begin_detaches_previous_output() {
    let mut manager = PreviewMountManager::default();
    let styling = StylingChoice::none();
    let ticket = manager.begin();
    manager.mount(ticket, paragraph("old"), &styling).unwrap();
    assert!(!manager.target().is_empty());

    manager.begin();
    assert!(manager.target().is_empty());
}

#[test]
fn test_stylesheet_injected_once() {
    let mut manager = PreviewMountManager::default();
    let styling = StylingChoice::new("Tailwind CSS", Some(TAILWIND));

    for text in ["one", "two", "three"] {
        let ticket = manager.begin();
        manager.mount(ticket, paragraph(text), &styling).unwrap();
    }
    assert_eq!(manager.stylesheets().len(), 1);
    assert!(manager.stylesheets().contains(TAILWIND));

    let page = manager.page_html("Preview");
    assert_eq!(page.matches(TAILWIND).count(), 1);
    assert!(page.contains("<p>three</p>"));
}

#[test]
fn test_failure_replaces_content() {
    let mut manager = PreviewMountManager::default();
    let styling = StylingChoice::none();
    let ticket = manager.begin();
    manager.mount(ticket, paragraph("ok"), &styling).unwrap();

    let ticket = manager.begin();
    let failure = Failure::new(FailureKind::RenderError, "boom");
    manager.mount(ticket, MountContent::Failure(failure), &styling).unwrap();

    let children = manager.target().children();
    assert_eq!(children.len(), 1);
    let panel = children[0].as_element().unwrap();
    assert_eq!(panel.attribute("data-failure"), Some("RenderError"));
    assert_eq!(panel.attribute("class"), Some("alert alert-danger"));
    assert!(panel.text_content().contains("boom"));
}
