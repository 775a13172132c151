//! Execution of a unit with both failure boundaries.

use crate::mount::{MountContent, MountError, MountTicket, PreviewMountManager};
use crate::outcome::{Failure, FailureKind, PipelineStage, PreviewOutcome};
use crate::styling::StylingChoice;
use crate::transform::ExecutableUnit;
use forge_dom::{DomNode, Element, EventType, HandlerId};
use forge_runtime::{
    event_object, render_root, unmount, ElementValue, EventPayload, ExecutionLimits, HandlerTable,
    Interpreter, RuntimeError, RuntimeSideEffect, Value,
};
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxLimits {
    pub max_steps: u64,
    pub max_call_depth: usize,
    pub max_array_len: usize,
    pub max_string_len: usize,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        let limits = ExecutionLimits::default();
        Self {
            max_steps: limits.max_steps,
            max_call_depth: limits.max_call_depth,
            max_array_len: limits.max_array_len,
            max_string_len: limits.max_string_len,
        }
    }
}

impl From<SandboxLimits> for ExecutionLimits {
    fn from(limits: SandboxLimits) -> Self {
        ExecutionLimits {
            max_steps: limits.max_steps,
            max_call_depth: limits.max_call_depth,
            max_array_len: limits.max_array_len,
            max_string_len: limits.max_string_len,
        }
    }
}

/// A mounted component that can still respond to events: its interpreter,
/// hook state and the handlers its DOM refers to.
pub struct LivePreview {
    interp: Interpreter,
    root: Rc<ElementValue>,
    handlers: HandlerTable,
}

impl LivePreview {
    pub fn handler(&self, id: HandlerId) -> Option<&Value> {
        self.handlers.get(id)
    }

    /// Calls the handler bound to `event` on `element`, then renders again.
    /// Returns the new tree and the number of passes it took.
    pub fn dispatch(
        &mut self,
        element: &Element,
        event: EventType,
        payload: &EventPayload,
    ) -> Result<Option<(Vec<DomNode>, usize)>, Failure> {
        let Some(handler) = element.listener(event).and_then(|id| self.handlers.get(id)).cloned() else {
            return Ok(None);
        };

        self.interp.reset_budget();
        let event_value = event_object(event, element, payload);
        if let Err(err) = self.interp.call_function(&handler, Value::Undefined, vec![event_value]) {
            return Err(Failure::new(FailureKind::RuntimeError, err.message()));
        }

        self.interp.reset_budget();
        match render_root(&mut self.interp, &self.root) {
            Ok(output) => {
                self.handlers = output.handlers;
                Ok(Some((output.nodes, output.passes)))
            }
            Err(err) => Err(Failure::new(FailureKind::RenderError, err.message())),
        }
    }

    pub fn take_console(&mut self) -> Vec<String> {
        console_messages(&mut self.interp)
    }

    /// Drops hook state, running effect cleanups.
    pub fn unmount(mut self) {
        if let Err(err) = unmount(&mut self.interp) {
            warn!(error = %err, "effect cleanup failed during unmount");
        }
    }
}

/// What one sandbox run produced.
pub struct SandboxRun {
    pub stage: PipelineStage,
    pub failure: Option<Failure>,
    pub live: Option<LivePreview>,
    pub render_passes: usize,
    pub console: Vec<String>,
    /// Set when a later run began before this one could commit.
    pub stale: Option<MountError>,
}

#[derive(Debug, Clone, Default)]
pub struct Sandbox {
    limits: SandboxLimits,
}

impl Sandbox {
    pub fn new(limits: SandboxLimits) -> Self {
        Self { limits }
    }

    /// Executes `unit` in a fresh interpreter and mounts the result, or the
    /// failure panel, under `ticket`. Never returns an error of the script:
    /// compile, execution and render failures all end up mounted.
    #[instrument(skip_all, fields(%ticket, identifier = %unit.identifier()))]
    pub fn run(
        &self,
        unit: &ExecutableUnit,
        mount: &mut PreviewMountManager,
        ticket: MountTicket,
        styling: &StylingChoice,
    ) -> SandboxRun {
        let mut interp = Interpreter::with_limits(self.limits.into());
        debug!(stage = %PipelineStage::Executing);

        let (content, rendered, render_passes) = match unit.run(&mut interp) {
            PreviewOutcome::Failed(failure) => (MountContent::Failure(failure), None, 0),
            PreviewOutcome::Rendered(root) => {
                debug!(stage = %PipelineStage::Rendering);
                interp.reset_budget();
                match render_root(&mut interp, &root) {
                    Ok(output) => (MountContent::Nodes(output.nodes), Some((root, output.handlers)), output.passes),
                    Err(err) => {
                        // Effects that ran before the failure are torn down.
                        if let Err(cleanup) = unmount(&mut interp) {
                            debug!(error = %cleanup, "cleanup after render failure also failed");
                        }
                        (MountContent::Failure(render_failure(&err)), None, 0)
                    }
                }
            }
        };

        let console = console_messages(&mut interp);
        let live = rendered.map(|(root, handlers)| LivePreview { interp, root, handlers });
        finish(mount, ticket, styling, content, live, render_passes, console)
    }
}

fn render_failure(err: &RuntimeError) -> Failure {
    Failure::new(FailureKind::RenderError, err.message())
}

fn finish(
    mount: &mut PreviewMountManager,
    ticket: MountTicket,
    styling: &StylingChoice,
    content: MountContent,
    live: Option<LivePreview>,
    render_passes: usize,
    console: Vec<String>,
) -> SandboxRun {
    let failure = match &content {
        MountContent::Failure(failure) => Some(failure.clone()),
        MountContent::Nodes(_) => None,
    };
    let stage = match &failure {
        Some(failure) => PipelineStage::Failed(failure.kind),
        None => PipelineStage::Mounted,
    };

    match mount.mount(ticket, content, styling) {
        Ok(()) => {
            debug!(%stage, "run finished");
            SandboxRun {
                stage,
                failure,
                live,
                render_passes,
                console,
                stale: None,
            }
        }
        Err(err) => {
            if let Some(live) = live {
                live.unmount();
            }
            SandboxRun {
                stage,
                failure,
                live: None,
                render_passes,
                console,
                stale: Some(err),
            }
        }
    }
}

fn console_messages(interp: &mut Interpreter) -> Vec<String> {
    interp
        .take_side_effects()
        .into_iter()
        .filter_map(|effect| match effect {
            RuntimeSideEffect::Console { level, message } => Some(format!("[{}] {}", level.as_str(), message)),
            RuntimeSideEffect::Alert(message) => Some(format!("[alert] {}", message)),
            _ => None,
        })
        .collect()
}
