//! Contract with the external text-generation service.

use crate::styling::StylingChoice;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const EMPTY_PROMPT_MESSAGE: &str = "Please enter a description for the component";
pub const GENERATION_FAILED_MESSAGE: &str = "Failed to generate component. Please try again.";

const GUIDELINES: &str = "Important coding guidelines:
1. Always wrap JSX expressions in curly braces: {condition ? 'true-value' : 'false-value'}
2. Always use semicolons to terminate statements
3. Properly close all JSX tags
4. Use consistent quotes - prefer single quotes for strings in JavaScript and double quotes for HTML attributes
5. Ensure all brackets, parentheses, and quotes are properly balanced
6. Define all variables before use with const or let
7. For conditional classes, use a pattern like: className={condition ? 'active-class' : 'inactive-class'}
8. Avoid template literals inside JSX attributes when possible
9. Always define your component with a function declaration: function ComponentName() {...}
10. Return a single parent element from your component

Output only the complete, working React component code without any explanations or markdown.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub styling: StylingChoice,
}

impl GenerationRequest {
    /// Rejects prompts with nothing but whitespace.
    pub fn new(prompt: &str, styling: StylingChoice) -> Result<Self, GenerationError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(GenerationError::EmptyPrompt);
        }
        Ok(Self {
            prompt: prompt.to_string(),
            styling,
        })
    }

    pub fn system_prompt(&self) -> String {
        format!(
            "You are a React component generator. Create clean, functional React components based on user descriptions. {}\n\n{}",
            self.styling.directive(),
            GUIDELINES
        )
    }

    pub fn user_message(&self) -> String {
        format!(
            "Generate a React functional component that {}. Make sure the function is properly declared as a named function (function ComponentName() {{}}) and all JSX syntax is valid.",
            self.prompt
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Please enter a description for the component")]
    EmptyPrompt,

    #[error("generation service request failed: {0}")]
    Transport(String),

    #[error("generation service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("generation service response was malformed: {0}")]
    Malformed(String),
}

impl GenerationError {
    /// The message shown above the preview.
    pub fn user_message(&self) -> &'static str {
        match self {
            GenerationError::EmptyPrompt => EMPTY_PROMPT_MESSAGE,
            _ => GENERATION_FAILED_MESSAGE,
        }
    }
}

#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Returns the raw text of the generated component.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;

    fn name(&self) -> &str;
}

/// Replays a fixed response. Used for offline previews and in tests.
#[derive(Debug, Clone)]
pub struct StaticGenerator {
    response: Result<String, String>,
}

impl StaticGenerator {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: Ok(response.into()),
        }
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            response: Err(reason.into()),
        }
    }
}

#[async_trait]
impl GenerationService for StaticGenerator {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String, GenerationError> {
        self.response.clone().map_err(GenerationError::Transport)
    }

    fn name(&self) -> &str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_prompt_is_rejected() {
        let err = GenerationRequest::new("  \n", StylingChoice::none()).unwrap_err();
        assert!(matches!(err, GenerationError::EmptyPrompt));
        assert_eq!(err.to_string(), EMPTY_PROMPT_MESSAGE);
    }

    #[test]
    fn test_prompts_carry_the_styling_directive() {
        let styling = StylingChoice::new("Bulma", Some("https://cdn/bulma.css"));
        let request = GenerationRequest::new("shows a counter", styling).unwrap();
        assert!(request.system_prompt().contains("Use Bulma for styling. "));
        assert!(request.system_prompt().contains("10. Return a single parent element"));
        assert!(request
            .user_message()
            .starts_with("Generate a React functional component that shows a counter. "));
    }

    #[test]
    fn test_service_failures_share_one_message() {
        let err = GenerationError::Status {
            status: 500,
            body: "oops".to_string(),
        };
        assert_eq!(err.user_message(), GENERATION_FAILED_MESSAGE);
    }
}
