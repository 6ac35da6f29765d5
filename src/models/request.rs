//! Request bodies for the chat and generate endpoints.

use serde::Serialize;

use super::{ChatMessage, GenerationSettings, ModelOptions};

/// Body of `POST /chat`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub think: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<ModelOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,
}

impl ChatRequest {
    /// Build a request for `model` from the message history and settings.
    pub fn new(
        model: impl Into<String>,
        messages: Vec<ChatMessage>,
        settings: &GenerationSettings,
    ) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: settings.stream,
            think: settings.think,
            options: settings.options(),
            keep_alive: settings.keep_alive.clone(),
        }
    }
}

/// Body of `POST /generate`: a single prompt without history.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub think: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<ModelOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,
}

impl GenerateRequest {
    pub fn new(
        model: impl Into<String>,
        prompt: impl Into<String>,
        settings: &GenerationSettings,
    ) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            stream: settings.stream,
            think: settings.think,
            options: settings.options(),
            keep_alive: settings.keep_alive.clone(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        let system = system.into();
        self.system = if system.is_empty() { None } else { Some(system) };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_request_minimal_body() {
        let request = ChatRequest::new(
            "llama3",
            vec![ChatMessage::user("Hi")],
            &GenerationSettings::default(),
        );
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "model": "llama3",
                "messages": [{"role": "user", "content": "Hi"}],
                "stream": true
            })
        );
    }

    #[test]
    fn test_chat_request_carries_settings() {
        let settings = GenerationSettings::default()
            .with_stream(false)
            .with_think(true)
            .with_temperature(0.5);
        let request = ChatRequest::new("qwen3", vec![], &settings);
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["stream"], json!(false));
        assert_eq!(body["think"], json!(true));
        assert_eq!(body["options"]["temperature"], json!(0.5));
    }

    #[test]
    fn test_generate_request_skips_empty_system() {
        let request = GenerateRequest::new("llama3", "Why is the sky blue?", &Default::default())
            .with_system("");
        let body = serde_json::to_value(&request).unwrap();
        assert!(body.get("system").is_none());
        assert_eq!(body["prompt"], json!("Why is the sky blue?"));
    }
}
