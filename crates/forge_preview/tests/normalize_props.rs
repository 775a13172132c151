use forge_preview::{normalize, resolve_identifier, ResolvedIdentifier};
use proptest::prelude::*;

fn fence() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("```".to_string()),
        Just("```jsx".to_string()),
        Just("```javascript\n".to_string()),
        Just("```react".to_string()),
        Just("```tsx\n".to_string()),
        Just("````".to_string()),
    ]
}

fn fenced_source() -> impl Strategy<Value = String> {
    (fence(), "[ -~\n\t]{0,40}", fence(), "[ \n]{0,3}").prop_map(|(open, body, close, tail)| format!("{open}{body}{close}{tail}"))
}

proptest! {
    #[test]
    fn normalize_is_idempotent(raw in "[ -~\n\t]{0,120}") {
        let once = normalize(&raw);
        prop_assert_eq!(normalize(&once), once.clone());
    }

    #[test]
    fn normalize_is_idempotent_on_fenced_text(raw in fenced_source()) {
        let once = normalize(&raw);
        prop_assert_eq!(normalize(&once), once.clone());
        prop_assert!(!once.contains("```"));
    }

    #[test]
    fn normalized_text_is_trimmed(raw in "[ -~\n\t]{0,80}") {
        let once = normalize(&raw);
        prop_assert_eq!(once.trim(), once.as_str());
    }

    #[test]
    fn declared_functions_resolve(name in "[A-Z][A-Za-z0-9_]{0,12}") {
        let source = format!("function {name}() {{ return null; }}");
        prop_assert_eq!(resolve_identifier(&source), ResolvedIdentifier::Declared(name));
    }
}
