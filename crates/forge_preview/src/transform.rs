use crate::outcome::{FailureKind, PreviewOutcome};
use crate::resolve::ResolvedIdentifier;
use forge_parser::parse_program;
use forge_runtime::builtins::react::create_element;
use forge_runtime::{Interpreter, Value};
use tracing::{debug, instrument};

/// Normalized source bound to the identifier it is expected to define.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutableUnit {
    source: String,
    identifier: ResolvedIdentifier,
}

pub fn build_executable(source: &str, identifier: ResolvedIdentifier) -> ExecutableUnit {
    ExecutableUnit {
        source: source.to_string(),
        identifier,
    }
}

impl ExecutableUnit {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn identifier(&self) -> &ResolvedIdentifier {
        &self.identifier
    }

    /// Compiles the source, runs it in a fresh module scope and instantiates
    /// the component as `<Identifier />`. Every failure becomes a `Failed`
    /// outcome.
    #[instrument(skip_all, fields(identifier = %self.identifier))]
    pub fn run(&self, interp: &mut Interpreter) -> PreviewOutcome {
        let program = match parse_program(&self.source) {
            Ok(program) => program,
            Err(err) => {
                debug!(error = %err, "compile failed");
                return PreviewOutcome::failed(FailureKind::SyntaxError, err.to_string());
            }
        };
        debug!(functions = ?program.declared_functions(), "compiled");

        let module = match interp.run_module(&program) {
            Ok(module) => module,
            Err(err) => {
                debug!(error = %err, "module threw");
                return PreviewOutcome::failed(FailureKind::RuntimeError, err.message());
            }
        };

        let Some(name) = self.identifier.name() else {
            return PreviewOutcome::failed(
                FailureKind::NotFound,
                "Could not find a component definition in the generated code",
            );
        };

        // Only the run's own module scope counts, never the builtins.
        let component = match module.get_local(name) {
            Some(value) if value.is_callable() => value,
            Some(other) => {
                return PreviewOutcome::failed(
                    FailureKind::NotFound,
                    format!("{} is {}, not a component function", name, describe(&other)),
                );
            }
            None => {
                return PreviewOutcome::failed(
                    FailureKind::NotFound,
                    format!("{} is not defined by the generated code", name),
                );
            }
        };

        match create_element(vec![component, Value::Null]) {
            Ok(Value::Element(element)) => PreviewOutcome::Rendered(element),
            Ok(other) => PreviewOutcome::failed(
                FailureKind::RuntimeError,
                format!("expected an element, got {}", other.describe()),
            ),
            Err(err) => PreviewOutcome::failed(FailureKind::RuntimeError, err.message()),
        }
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Undefined => "undefined".to_string(),
        Value::Null => "null".to_string(),
        Value::Element(_) => "an element".to_string(),
        other => format!("a {}", other.type_of()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::resolve_identifier;

    fn run(source: &str) -> PreviewOutcome {
        let unit = build_executable(source, resolve_identifier(source));
        unit.run(&mut Interpreter::new())
    }

    fn kind(outcome: &PreviewOutcome) -> Option<FailureKind> {
        outcome.failure().map(|f| f.kind)
    }

    #[test]
    fn test_declared_component_is_instantiated() {
        match run("function Foo() { return null; }") {
            PreviewOutcome::Rendered(element) => assert_eq!(element.display_name(), "Foo"),
            other => panic!("expected Rendered, got {:?}", other),
        }
    }

    #[test]
    fn test_unbalanced_braces_are_syntax_errors() {
        assert_eq!(kind(&run("function Foo() { return <div>;")), Some(FailureKind::SyntaxError));
    }

    #[test]
    fn test_top_level_throw_is_runtime_error() {
        let outcome = run("function Foo() { return null; }\nthrow new Error('bad setup');");
        assert_eq!(kind(&outcome), Some(FailureKind::RuntimeError));
        assert_eq!(outcome.failure().unwrap().message, "bad setup");
    }

    #[test]
    fn test_unresolved_is_not_found() {
        assert_eq!(kind(&run("const answer = 42;")), Some(FailureKind::NotFound));
    }

    #[test]
    fn test_conventional_app_must_be_callable() {
        assert_eq!(kind(&run("const App = 5;")), Some(FailureKind::NotFound));
        assert!(matches!(run("const App = () => <p>hi</p>;"), PreviewOutcome::Rendered(_)));
    }

    #[test]
    fn test_builtins_never_resolve() {
        let unit = build_executable("", ResolvedIdentifier::Declared("useState".to_string()));
        assert_eq!(kind(&unit.run(&mut Interpreter::new())), Some(FailureKind::NotFound));
    }
}
