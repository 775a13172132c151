use std::io::{self, Read};
use std::path::{Path, PathBuf};

use forge_dom::EventType;
use forge_preview::{
    ConfigError, DispatchError, ForgeConfig, GenerationError, PreviewSession, RunReport, StylingCatalog,
};
use forge_runtime::EventPayload;
use tracing::{info, info_span, warn};

use crate::cli::{GenerateArgs, OutputArgs, OutputFormatArg, PreviewArgs};
use crate::openai::OpenAiGenerator;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} contains no code", .0.display())]
    EmptySource(PathBuf),

    #[error("{0}")]
    Generation(#[from] GenerationError),

    #[error("missing API key: set {0} or pass --api-key")]
    MissingApiKey(String),

    #[error("cannot click <{0}>: no such element in the preview")]
    NoSuchElement(String),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("failed to serialize report: {0}")]
    Report(#[from] serde_json::Error),
}

pub fn run_preview(args: &PreviewArgs, config: &ForgeConfig) -> Result<RunReport, CliError> {
    let _span = info_span!("preview", source = %args.source.display()).entered();
    let source = read_source(&args.source)?;

    let mut session = PreviewSession::new(config);
    session.select_styling(&args.output.styling);
    let report = session
        .set_source(source)
        .ok_or_else(|| CliError::EmptySource(args.source.clone()))?;

    finish(&mut session, report, &args.output)
}

pub async fn run_generate(args: &GenerateArgs, config: &ForgeConfig) -> Result<RunReport, CliError> {
    let mut generator_config = config.generator.clone();
    if let Some(endpoint) = &args.endpoint {
        generator_config.endpoint = endpoint.clone();
    }
    if let Some(model) = &args.model {
        generator_config.model = model.clone();
    }
    let key = match &args.api_key {
        Some(key) => key.clone(),
        None => std::env::var(&generator_config.api_key_env)
            .map_err(|_| CliError::MissingApiKey(generator_config.api_key_env.clone()))?,
    };
    let generator = OpenAiGenerator::new(&generator_config, key)?;
    info!(model = generator.model(), "generating component");

    let mut session = PreviewSession::new(config);
    session.select_styling(&args.output.styling);
    let report = session
        .generate(&generator, &args.prompt)
        .await?
        .ok_or_else(|| CliError::EmptySource(PathBuf::from("the generated response")))?;

    if let Some(path) = &args.save_code {
        write_output(Some(path), session.code_view())?;
    }
    finish(&mut session, report, &args.output)
}

pub fn run_catalog(config: &ForgeConfig) {
    print!("{}", catalog_table(&config.catalog));
}

fn catalog_table(catalog: &StylingCatalog) -> String {
    let width = catalog.entries().iter().map(|e| e.name.len()).max().unwrap_or(0);
    catalog
        .entries()
        .iter()
        .map(|entry| {
            let locator = entry.locator.as_deref().unwrap_or("-");
            format!("{:<width$}  {}\n", entry.name, locator, width = width)
        })
        .collect()
}

/// Applies the requested clicks, then writes the requested view.
fn finish(session: &mut PreviewSession, mut report: RunReport, output: &OutputArgs) -> Result<RunReport, CliError> {
    for tag in &output.clicks {
        if !report.stage.is_mounted() {
            warn!(%tag, "preview failed, skipping remaining clicks");
            break;
        }
        let element_id = session
            .mount_manager()
            .target()
            .elements_by_tag(tag)
            .first()
            .map(|element| element.id)
            .ok_or_else(|| CliError::NoSuchElement(tag.clone()))?;
        report = session.dispatch_event(element_id, EventType::Click, EventPayload::default())?;
    }

    let text = match output.format {
        OutputFormatArg::Panel => session.preview_html(),
        OutputFormatArg::Page => session.page_html(),
        OutputFormatArg::Code => session.code_view().to_string(),
        OutputFormatArg::Report => serde_json::to_string_pretty(&report)?,
    };
    write_output(output.output.as_deref(), &text)?;

    for line in &report.console {
        info!(target: "forge_cli::console", "{}", line);
    }
    Ok(report)
}

fn read_source(path: &Path) -> Result<String, CliError> {
    let read_error = |source| CliError::Read {
        path: path.to_path_buf(),
        source,
    };
    if path.as_os_str() == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text).map_err(read_error)?;
        Ok(text)
    } else {
        std::fs::read_to_string(path).map_err(read_error)
    }
}

fn write_output(path: Option<&Path>, text: &str) -> Result<(), CliError> {
    match path {
        Some(path) => std::fs::write(path, text).map_err(|source| CliError::Write {
            path: path.to_path_buf(),
            source,
        }),
        None => {
            println!("{}", text);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_preview::{PipelineStage, StylingChoice};

    fn output_args(clicks: &[&str]) -> OutputArgs {
        OutputArgs {
            styling: "None".to_string(),
            format: OutputFormatArg::Panel,
            output: Some(std::env::temp_dir().join(format!("forge-cli-test-{}.html", std::process::id()))),
            clicks: clicks.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn test_catalog_table_aligns_names() {
        let catalog = StylingCatalog::new(vec![StylingChoice::new("Bulma", Some("https://cdn/bulma.css"))]);
        assert_eq!(catalog_table(&catalog), "None   -\nBulma  https://cdn/bulma.css\n");
    }

    #[test]
    fn test_clicks_are_dispatched() {
        let mut session = PreviewSession::default();
        let report = session
            .set_source(
                "function Toggle() { const [on, setOn] = useState(false); \
                 return <button onClick={() => setOn(!on)}>{on ? 'on' : 'off'}</button>; }",
            )
            .unwrap();
        let args = output_args(&["button"]);
        let report = finish(&mut session, report, &args).unwrap();
        assert_eq!(report.stage, PipelineStage::Mounted);
        assert_eq!(session.preview_html(), "<button>on</button>");
        if let Some(path) = &args.output {
            let _ = std::fs::remove_file(path);
        }
    }

    #[test]
    fn test_click_on_missing_tag() {
        let mut session = PreviewSession::default();
        let report = session.set_source("function A() { return <p>a</p>; }").unwrap();
        let err = finish(&mut session, report, &output_args(&["button"])).unwrap_err();
        assert!(matches!(err, CliError::NoSuchElement(tag) if tag == "button"));
    }

    #[test]
    fn test_missing_source_file() {
        let err = read_source(Path::new("/definitely/not/here.jsx")).unwrap_err();
        assert!(matches!(err, CliError::Read { .. }));
    }
}
