use forge_dom::DomNode;
use forge_preview::{FailureKind, PipelineStage, PreviewSession, RunReport};
use pretty_assertions::assert_eq;

fn preview(source: &str) -> (PreviewSession, RunReport) {
    let mut session = PreviewSession::default();
    let report = session.set_source(source).expect("source produced no run");
    (session, report)
}

fn failure_panels(session: &PreviewSession) -> Vec<String> {
    session
        .mount_manager()
        .target()
        .children()
        .iter()
        .filter_map(DomNode::as_element)
        .filter_map(|e| e.attribute("data-failure").map(str::to_string))
        .collect()
}

#[test]
fn test_greet_end_to_end() {
    let (session, report) = preview(
        "```jsx\nfunction Greet() {\n  return <button onClick={() => alert('hi')}>Hi</button>;\n}\n```",
    );
    assert_eq!(report.stage, PipelineStage::Mounted);
    assert_eq!(report.identifier.as_deref(), Some("Greet"));

    let buttons = session.mount_manager().target().elements_by_tag("button");
    assert_eq!(buttons.len(), 1);
    assert_eq!(buttons[0].text_content(), "Hi");
    assert_eq!(session.preview_html(), "<button>Hi</button>");
    assert!(!session.code_view().contains("```"));
}

#[test]
fn test_arrow_component() {
    let (session, report) = preview("const Bar = () => <p className=\"note\">bar</p>;");
    assert_eq!(report.identifier.as_deref(), Some("Bar"));
    assert_eq!(session.preview_html(), "<p class=\"note\">bar</p>");
}

#[test]
fn test_null_component_mounts_nothing() {
    let (session, report) = preview("function Foo(){ return null; }");
    assert_eq!(report.stage, PipelineStage::Mounted);
    assert!(session.mount_manager().target().is_empty());
}

#[test]
fn test_missing_component_is_not_found() {
    let (session, report) = preview("const answer = 42;\nconsole.log(answer);");
    assert_eq!(report.stage, PipelineStage::Failed(FailureKind::NotFound));
    assert_eq!(report.identifier, None);
    assert_eq!(failure_panels(&session), vec!["NotFound"]);
    assert_eq!(report.console, vec!["[log] 42"]);
}

#[test]
fn test_unbalanced_braces_mount_one_syntax_panel() {
    let (session, report) = preview("function Broken() { return <div>oops</div>;");
    assert_eq!(report.stage, PipelineStage::Failed(FailureKind::SyntaxError));
    assert_eq!(failure_panels(&session), vec!["SyntaxError"]);
    assert_eq!(session.mount_manager().target().children().len(), 1);
}

#[test]
fn test_top_level_throw_is_runtime_error() {
    let (session, report) = preview(
        "function Widget() { return <div />; }\nconst config = undefined;\nconst size = config.size;",
    );
    assert_eq!(report.stage, PipelineStage::Failed(FailureKind::RuntimeError));
    let message = report.failure.map(|f| f.message).unwrap_or_default();
    assert!(message.contains("reading 'size'"), "unexpected message: {message}");
    assert_eq!(failure_panels(&session), vec!["RuntimeError"]);
}

#[test]
fn test_render_time_throw_is_render_error() {
    let (session, report) = preview(
        "function Exploding() {\n  const items = null;\n  return <ul>{items.map(i => <li>{i}</li>)}</ul>;\n}",
    );
    assert_eq!(report.stage, PipelineStage::Failed(FailureKind::RenderError));
    assert_eq!(failure_panels(&session), vec!["RenderError"]);
    assert!(!session.is_live());
}

#[test]
fn test_runaway_loop_is_stopped() {
    let (_, report) = preview("function Spin() { while (true) {} return null; }");
    assert_eq!(report.stage, PipelineStage::Failed(FailureKind::RenderError));
    assert!(report.failure.unwrap().message.contains("steps"));
}

#[test]
fn test_conventional_app_fallback() {
    let (session, report) = preview(
        "const App = React.memo(function () { return <h1>Home</h1>; });",
    );
    assert_eq!(report.identifier.as_deref(), Some("App"));
    assert_eq!(session.preview_html(), "<h1>Home</h1>");
}

#[test]
fn test_empty_source_clears_preview() {
    let (mut session, _) = preview("function A() { return <p>a</p>; }");
    assert!(session.set_source("```\n```").is_none());
    assert!(session.mount_manager().target().is_empty());
    assert!(session.last_report().is_none());
}

/// Runs a preview on a thread with room for deep native recursion, returning
/// the report and the rendered panel.
fn preview_on_large_stack(source: &'static str) -> (RunReport, String) {
    std::thread::Builder::new()
        .stack_size(16 * 1024 * 1024)
        .spawn(move || {
            let (session, report) = preview(source);
            (report, session.preview_html())
        })
        .unwrap()
        .join()
        .unwrap()
}

fn render_failure(report: &RunReport) -> String {
    assert_eq!(report.stage, PipelineStage::Failed(FailureKind::RenderError));
    report.failure.as_ref().map(|f| f.message.clone()).unwrap_or_default()
}

#[test]
fn test_huge_allocations_are_render_errors() {
    let (_, report) = preview(
        "function A() { const a = new Array(4294967295); return <p>{a.length}</p>; }",
    );
    assert_eq!(render_failure(&report), "RangeError: Invalid array length");

    let (_, report) = preview("function A() { return <p>{'ab'.repeat(1e13)}</p>; }");
    assert_eq!(render_failure(&report), "RangeError: Invalid string length");
}

#[test]
fn test_self_containing_array_joins_to_text() {
    let (session, report) = preview(
        "function A() { const a = [1]; a.push(a); return <p>{a.join('-')}</p>; }",
    );
    assert_eq!(report.stage, PipelineStage::Mounted);
    assert_eq!(session.preview_html(), "<p>1-</p>");
}

#[test]
fn test_self_containing_array_child_is_render_error() {
    let (report, html) = preview_on_large_stack(
        "function A() { const a = [1]; a.push(a); return <p>{a}</p>; }",
    );
    assert_eq!(render_failure(&report), "Maximum call stack size exceeded");
    assert!(html.contains("RenderError"));
}

#[test]
fn test_unbounded_component_nesting_is_render_error() {
    let (report, _) = preview_on_large_stack(
        "function Root() { return <Deep n={100000} />; }\n\
         function Deep({ n }) { return n > 0 ? <div><Deep n={n - 1} /></div> : <b>end</b>; }",
    );
    assert_eq!(report.identifier.as_deref(), Some("Root"));
    assert_eq!(render_failure(&report), "Maximum call stack size exceeded");
}

#[test]
fn test_shallow_component_nesting_still_renders() {
    let (report, html) = preview_on_large_stack(
        "function Root() { return <Deep n={20} />; }\n\
         function Deep({ n }) { return n > 0 ? <i><Deep n={n - 1} /></i> : <b>end</b>; }",
    );
    assert_eq!(report.stage, PipelineStage::Mounted);
    assert_eq!(html, format!("{}<b>end</b>{}", "<i>".repeat(20), "</i>".repeat(20)));
}

#[test]
fn test_space_between_expressions_is_kept_once() {
    let (session, _) = preview("function A() { return <p>{7 % 3} {2 ** 3}</p>; }");
    assert_eq!(session.preview_html(), "<p>1 8</p>");
}

#[test]
fn test_regex_validation_component() {
    let (session, report) = preview(
        r"function Check() {
            const zip = '12345';
            const valid = /^\d{5}$/.test(zip) && (zip.length & 1) === 1;
            return <p>{valid ? 'valid' : 'invalid'}</p>;
        }",
    );
    assert_eq!(report.stage, PipelineStage::Mounted);
    assert_eq!(session.preview_html(), "<p>valid</p>");
}
