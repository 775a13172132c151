//! Command-line arguments of the `forge` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};

#[derive(Parser)]
#[command(
    name = "forge",
    version,
    about = "Preview generated UI components",
    long_about = "Compile a JSX component, run it in a sandbox and render its preview.\n\n\
                  Sources can come from a file or from an OpenAI-compatible\n\
                  chat-completions service."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Log output format.
    #[arg(long = "log-format", value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// JSON settings file (catalog, sandbox limits, generator endpoint).
    #[arg(long, short = 'c', value_name = "PATH", env = "FORGE_CONFIG", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Preview a component source file ("-" reads stdin).
    Preview(PreviewArgs),

    /// Generate a component from a description and preview it.
    Generate(GenerateArgs),

    /// List the styling libraries a preview can load.
    Catalog,
}

/// Options shared by the commands that produce a preview.
#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Styling library from the catalog.
    #[arg(long, short = 's', default_value = "None")]
    pub styling: String,

    /// What to print once the preview is mounted.
    #[arg(long, value_enum, default_value = "panel")]
    pub format: OutputFormatArg,

    /// Write the output to a file instead of stdout.
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Click the first element with this tag after mounting. Repeatable.
    #[arg(long = "click", value_name = "TAG")]
    pub clicks: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct PreviewArgs {
    #[arg(value_name = "FILE")]
    pub source: PathBuf,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// What the component should do, e.g. "shows a counter with a reset button".
    #[arg(value_name = "PROMPT")]
    pub prompt: String,

    /// Chat-completions endpoint (overrides the config file).
    #[arg(long, env = "FORGE_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Model name (overrides the config file).
    #[arg(long, env = "FORGE_MODEL")]
    pub model: Option<String>,

    /// API key; read from the variable named in the config when omitted.
    #[arg(long, env = "FORGE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Also save the generated code.
    #[arg(long = "save-code", value_name = "PATH")]
    pub save_code: Option<PathBuf>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormatArg {
    /// HTML of the mounted panel.
    Panel,
    /// A standalone HTML page with the stylesheets.
    Page,
    /// The normalized code.
    Code,
    /// The run report as JSON.
    Report,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_preview_arguments() {
        let cli = Cli::try_parse_from([
            "forge", "preview", "counter.jsx", "--styling", "Bootstrap", "--format", "page", "--click", "button",
            "--click", "button",
        ])
        .unwrap();
        let Command::Preview(args) = cli.command else {
            panic!("expected the preview command");
        };
        assert_eq!(args.source, PathBuf::from("counter.jsx"));
        assert_eq!(args.output.styling, "Bootstrap");
        assert_eq!(args.output.format, OutputFormatArg::Page);
        assert_eq!(args.output.clicks, vec!["button", "button"]);
    }

    #[test]
    fn test_generate_requires_prompt() {
        assert!(Cli::try_parse_from(["forge", "generate"]).is_err());
    }
}
