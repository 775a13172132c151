use async_trait::async_trait;
use forge_preview::{GenerationError, GenerationRequest, GenerationService, GeneratorConfig};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, instrument};

/// Client for an OpenAI-compatible chat-completions endpoint.
pub struct OpenAiGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    key: String,
    temperature: Option<f32>,
}

impl OpenAiGenerator {
    pub fn new(config: &GeneratorConfig, key: String) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| GenerationError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            key,
            temperature: config.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, request: &GenerationRequest) -> Value {
        let mut body = json!({
            "model": &self.model,
            "messages": [
                { "role": "system", "content": request.system_prompt() },
                { "role": "user", "content": request.user_message() },
            ],
        });
        if let Some(temperature) = self.temperature {
            body["temperature"] = json!(temperature);
        }
        body
    }
}

/// Text of the first choice in a chat-completions response.
pub fn completion_text(response: &Value) -> Result<String, GenerationError> {
    let message = response
        .get("choices")
        .and_then(|choices| choices.as_array())
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| GenerationError::Malformed("no choices in response".to_string()))?;

    match message.get("content").and_then(|content| content.as_str()) {
        Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
        _ => Err(GenerationError::Malformed("choice has no content".to_string())),
    }
}

#[async_trait]
impl GenerationService for OpenAiGenerator {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let transport = |err: reqwest::Error| GenerationError::Transport(err.to_string());

        let res = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.key)
            .json(&self.request_body(request))
            .send()
            .await
            .map_err(transport)?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.map_err(transport)?;
            return Err(GenerationError::Status { status, body });
        }

        let response: Value = res.json().await.map_err(transport)?;
        let text = completion_text(&response)?;
        debug!(chars = text.len(), "completion received");
        Ok(text)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_preview::StylingChoice;

    fn generator(temperature: Option<f32>) -> OpenAiGenerator {
        let config = GeneratorConfig {
            temperature,
            ..GeneratorConfig::default()
        };
        OpenAiGenerator::new(&config, "test-key".to_string()).unwrap()
    }

    #[test]
    fn test_request_body_carries_both_messages() {
        let request = GenerationRequest::new("shows a greeting", StylingChoice::none()).unwrap();
        let body = generator(None).request_body(&request);
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert!(body["messages"][0]["content"].as_str().unwrap().contains("Use plain CSS for styling."));
        assert!(body["messages"][1]["content"].as_str().unwrap().contains("that shows a greeting."));
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_temperature_is_forwarded() {
        let request = GenerationRequest::new("x", StylingChoice::none()).unwrap();
        let body = generator(Some(0.5)).request_body(&request);
        assert_eq!(body["temperature"], 0.5);
    }

    #[test]
    fn test_completion_text() {
        let response = json!({ "choices": [ { "message": { "role": "assistant", "content": "function A() {}" } } ] });
        assert_eq!(completion_text(&response).unwrap(), "function A() {}");

        let empty = json!({ "choices": [] });
        assert!(matches!(completion_text(&empty), Err(GenerationError::Malformed(_))));

        let blank = json!({ "choices": [ { "message": { "content": "  " } } ] });
        assert!(matches!(completion_text(&blank), Err(GenerationError::Malformed(_))));
    }
}
