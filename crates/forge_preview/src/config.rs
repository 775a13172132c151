use crate::sandbox::SandboxLimits;
use crate::styling::StylingCatalog;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Endpoint settings of the chat-completions service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub endpoint: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub temperature: Option<f32>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 120,
            temperature: None,
        }
    }
}

/// Settings file for the preview pipeline. Every field has a default, so an
/// empty object is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeConfig {
    pub page_title: String,
    pub target: String,
    pub catalog: StylingCatalog,
    pub sandbox: SandboxLimits,
    pub generator: GeneratorConfig,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            page_title: "Component Preview".to_string(),
            target: crate::mount::DEFAULT_TARGET.to_string(),
            catalog: StylingCatalog::default(),
            sandbox: SandboxLimits::default(),
            generator: GeneratorConfig::default(),
        }
    }
}

impl ForgeConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Loads `path` when given, the defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(ForgeConfig::from_json("{}").unwrap(), ForgeConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = ForgeConfig::from_json(
            r#"{ "sandbox": { "max_steps": 500 }, "generator": { "model": "local" } }"#,
        )
        .unwrap();
        assert_eq!(config.sandbox.max_steps, 500);
        assert_eq!(config.sandbox.max_call_depth, SandboxLimits::default().max_call_depth);
        assert_eq!(config.generator.model, "local");
        assert_eq!(config.catalog.entries().len(), 5);
    }

    #[test]
    fn test_catalog_from_file() {
        let config = ForgeConfig::from_json(r#"{ "catalog": [ { "name": "Pico", "locator": "https://cdn/pico.css" } ] }"#)
            .unwrap();
        let names: Vec<&str> = config.catalog.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["None", "Pico"]);
    }

    #[test]
    fn test_missing_file() {
        let err = ForgeConfig::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
