use forge_dom::EventType;
use forge_preview::{
    DispatchError, FailureKind, GenerationError, PipelineStage, PreviewSession, StaticGenerator,
    EMPTY_PROMPT_MESSAGE, GENERATION_FAILED_MESSAGE,
};
use forge_runtime::EventPayload;
use pretty_assertions::assert_eq;
use uuid::Uuid;

const COUNTER: &str = r#"```jsx
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
```"#;

fn button_id(session: &PreviewSession) -> Uuid {
    session.mount_manager().target().elements_by_tag("button")[0].id
}

fn paragraph(session: &PreviewSession) -> String {
    session.mount_manager().target().elements_by_tag("p")[0].text_content()
}

#[tokio::test]
async fn test_generated_component_is_previewed() {
    let mut session = PreviewSession::default();
    let report = session
        .generate(&StaticGenerator::new(COUNTER), "a counter")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.stage, PipelineStage::Mounted);
    assert_eq!(report.identifier.as_deref(), Some("Counter"));
    assert_eq!(session.error(), None);
    assert_eq!(paragraph(&session), "Count: 0");
    assert!(session.code_view().starts_with("import React"));
}

#[tokio::test]
async fn test_empty_prompt_is_rejected_without_calling_service() {
    let mut session = PreviewSession::default();
    let err = session
        .generate(&StaticGenerator::failing("should not be called"), "   ")
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::EmptyPrompt));
    assert_eq!(session.error(), Some(EMPTY_PROMPT_MESSAGE));
}

#[tokio::test]
async fn test_failed_generation_keeps_previous_preview() {
    let mut session = PreviewSession::default();
    session
        .generate(&StaticGenerator::new(COUNTER), "a counter")
        .await
        .unwrap();
    let before = session.preview_html();

    let err = session
        .generate(&StaticGenerator::failing("connection refused"), "something else")
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::Transport(_)));
    assert_eq!(session.error(), Some(GENERATION_FAILED_MESSAGE));
    assert_eq!(session.preview_html(), before);
    assert!(session.is_live());
}

#[test]
fn test_click_updates_mounted_preview() {
    let mut session = PreviewSession::default();
    session.set_source(COUNTER);

    for expected in ["Count: 1", "Count: 2"] {
        let report = session
            .dispatch_event(button_id(&session), EventType::Click, EventPayload::default())
            .unwrap();
        assert_eq!(report.stage, PipelineStage::Mounted);
        assert_eq!(report.identifier.as_deref(), Some("Counter"));
        assert_eq!(paragraph(&session), expected);
    }
}

#[test]
fn test_dispatch_errors() {
    let mut session = PreviewSession::default();
    let err = session
        .dispatch_event(Uuid::new_v4(), EventType::Click, EventPayload::default())
        .unwrap_err();
    assert!(matches!(err, DispatchError::NothingMounted));

    session.set_source(COUNTER);
    let err = session
        .dispatch_event(Uuid::new_v4(), EventType::Click, EventPayload::default())
        .unwrap_err();
    assert!(matches!(err, DispatchError::UnknownElement(_)));

    let paragraph_id = session.mount_manager().target().elements_by_tag("p")[0].id;
    let err = session
        .dispatch_event(paragraph_id, EventType::Click, EventPayload::default())
        .unwrap_err();
    assert!(matches!(err, DispatchError::NoHandler { .. }));
    assert_eq!(paragraph(&session), "Count: 0");
}

#[test]
fn test_throwing_handler_mounts_failure() {
    let mut session = PreviewSession::default();
    session.set_source(
        "function Fragile() { return <button onClick={() => { throw new Error('clicked'); }}>Go</button>; }",
    );
    let report = session
        .dispatch_event(button_id(&session), EventType::Click, EventPayload::default())
        .unwrap();
    assert_eq!(report.stage, PipelineStage::Failed(FailureKind::RuntimeError));
    assert_eq!(report.failure.unwrap().message, "clicked");
    assert!(!session.is_live());
}

#[test]
fn test_styling_switch_reruns_and_injects_once() {
    let mut session = PreviewSession::default();
    session.set_source(COUNTER);
    session
        .dispatch_event(button_id(&session), EventType::Click, EventPayload::default())
        .unwrap();

    let report = session.select_styling("Bootstrap").unwrap();
    assert_eq!(report.styling, "Bootstrap");
    // A fresh run starts from initial state.
    assert_eq!(paragraph(&session), "Count: 0");

    session.select_styling("Bootstrap");
    assert_eq!(session.mount_manager().stylesheets().len(), 1);
    assert!(session.page_html().contains("bootstrap.min.css"));

    let report = session.select_styling("Nonexistent").unwrap();
    assert_eq!(report.styling, "None");
}

#[test]
fn test_console_output_is_reported() {
    let mut session = PreviewSession::default();
    let report = session
        .set_source("function Noisy() { console.warn('rendering'); return <i>x</i>; }")
        .unwrap();
    assert_eq!(report.console, vec!["[warn] rendering"]);
}
