//! The source/styling pair and the preview derived from it.

use crate::config::ForgeConfig;
use crate::generation::{GenerationError, GenerationRequest, GenerationService};
use crate::mount::{MountContent, MountError, PreviewMountManager};
use crate::normalize::normalize;
use crate::outcome::{PipelineStage, RunReport};
use crate::resolve::resolve_identifier;
use crate::sandbox::{LivePreview, Sandbox};
use crate::source::SourceText;
use crate::styling::{StylingCatalog, StylingChoice};
use crate::transform::build_executable;
use forge_dom::EventType;
use forge_runtime::EventPayload;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no component is mounted")]
    NothingMounted,

    #[error("element {0} is not part of the mounted preview")]
    UnknownElement(Uuid),

    #[error("element {element} has no {event} handler")]
    NoHandler { element: Uuid, event: EventType },

    #[error(transparent)]
    Mount(#[from] MountError),
}

/// Keeps the source text, the styling choice and the mounted preview
/// together, so both views always describe the same pair.
pub struct PreviewSession {
    catalog: StylingCatalog,
    sandbox: Sandbox,
    mount: PreviewMountManager,
    page_title: String,
    source: SourceText,
    code: String,
    styling: StylingChoice,
    live: Option<LivePreview>,
    last_report: Option<RunReport>,
    error: Option<String>,
}

impl Default for PreviewSession {
    fn default() -> Self {
        Self::new(&ForgeConfig::default())
    }
}

impl PreviewSession {
    pub fn new(config: &ForgeConfig) -> Self {
        Self {
            catalog: config.catalog.clone(),
            sandbox: Sandbox::new(config.sandbox),
            mount: PreviewMountManager::new(&config.target),
            page_title: config.page_title.clone(),
            source: SourceText::default(),
            code: String::new(),
            styling: StylingChoice::none(),
            live: None,
            last_report: None,
            error: None,
        }
    }

    pub fn catalog(&self) -> &StylingCatalog {
        &self.catalog
    }

    pub fn source(&self) -> &SourceText {
        &self.source
    }

    pub fn styling(&self) -> &StylingChoice {
        &self.styling
    }

    /// Top-level message from the last generation attempt.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn last_report(&self) -> Option<&RunReport> {
        self.last_report.as_ref()
    }

    pub fn mount_manager(&self) -> &PreviewMountManager {
        &self.mount
    }

    pub fn is_live(&self) -> bool {
        self.live.is_some()
    }

    pub fn set_source(&mut self, raw: impl Into<SourceText>) -> Option<RunReport> {
        self.source = raw.into();
        self.refresh()
    }

    /// Unknown names select the unstyled choice.
    pub fn select_styling(&mut self, name: &str) -> Option<RunReport> {
        self.styling = self.catalog.resolve(name);
        self.refresh()
    }

    /// Runs the pipeline for the current pair. The previous preview is
    /// detached first; with no code nothing new is mounted.
    #[instrument(skip(self), fields(styling = %self.styling.name))]
    pub fn refresh(&mut self) -> Option<RunReport> {
        let ticket = self.mount.begin();
        if let Some(live) = self.live.take() {
            live.unmount();
        }

        debug!(stage = %PipelineStage::Normalizing);
        self.code = normalize(self.source.as_str());
        if self.code.is_empty() {
            self.last_report = None;
            return None;
        }

        debug!(stage = %PipelineStage::Resolving);
        let identifier = resolve_identifier(&self.code);
        debug!(stage = %PipelineStage::Transforming, %identifier);
        let unit = build_executable(&self.code, identifier.clone());

        let run = self.sandbox.run(&unit, &mut self.mount, ticket, &self.styling);
        if let Some(stale) = &run.stale {
            warn!(error = %stale, "preview run was superseded");
        }
        self.live = run.live;

        let report = RunReport {
            run_id: ticket.0,
            identifier: identifier.name().map(str::to_string),
            styling: self.styling.name.clone(),
            stage: run.stage,
            failure: run.failure,
            render_passes: run.render_passes,
            console: run.console,
        };
        info!(stage = %report.stage, run_id = report.run_id, "preview updated");
        self.last_report = Some(report.clone());
        Some(report)
    }

    /// Asks `service` for a component and previews it. On failure the
    /// current preview stays as it is and [`PreviewSession::error`] holds
    /// the message to show.
    #[instrument(skip_all, fields(service = service.name()))]
    pub async fn generate(
        &mut self,
        service: &dyn GenerationService,
        prompt: &str,
    ) -> Result<Option<RunReport>, GenerationError> {
        let request = match GenerationRequest::new(prompt, self.styling.clone()) {
            Ok(request) => request,
            Err(err) => {
                self.error = Some(err.user_message().to_string());
                return Err(err);
            }
        };

        self.error = None;
        match service.generate(&request).await {
            Ok(text) => Ok(self.set_source(text)),
            Err(err) => {
                warn!(error = %err, "generation failed");
                self.error = Some(err.user_message().to_string());
                Err(err)
            }
        }
    }

    /// Rendered panel HTML.
    pub fn preview_html(&self) -> String {
        self.mount.panel_html()
    }

    /// The normalized source the preview was built from.
    pub fn code_view(&self) -> &str {
        &self.code
    }

    pub fn page_html(&self) -> String {
        self.mount.page_html(&self.page_title)
    }

    /// Invokes the handler bound to `event` on the mounted element and
    /// re-renders through the mount manager.
    #[instrument(skip(self, payload))]
    pub fn dispatch_event(
        &mut self,
        element_id: Uuid,
        event: EventType,
        payload: EventPayload,
    ) -> Result<RunReport, DispatchError> {
        let live = self.live.as_mut().ok_or(DispatchError::NothingMounted)?;
        let element = self
            .mount
            .target()
            .find_element(element_id)
            .cloned()
            .ok_or(DispatchError::UnknownElement(element_id))?;
        let no_handler = DispatchError::NoHandler {
            element: element_id,
            event,
        };
        match element.listener(event) {
            Some(id) if live.handler(id).is_some() => {}
            _ => return Err(no_handler),
        }

        let result = live.dispatch(&element, event, &payload);
        let console = live.take_console();
        let (content, stage, failure, render_passes) = match result {
            Ok(Some((nodes, passes))) => (MountContent::Nodes(nodes), PipelineStage::Mounted, None, passes),
            Ok(None) => return Err(no_handler),
            Err(failure) => {
                if let Some(live) = self.live.take() {
                    live.unmount();
                }
                let stage = PipelineStage::Failed(failure.kind);
                (MountContent::Failure(failure.clone()), stage, Some(failure), 0)
            }
        };

        let ticket = self.mount.begin();
        self.mount.mount(ticket, content, &self.styling)?;

        let report = RunReport {
            run_id: ticket.0,
            identifier: self.last_report.as_ref().and_then(|r| r.identifier.clone()),
            styling: self.styling.name.clone(),
            stage,
            failure,
            render_passes,
            console,
        };
        debug!(stage = %report.stage, "event handled");
        self.last_report = Some(report.clone());
        Ok(report)
    }
}
