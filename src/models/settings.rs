//! Generation settings attached to a conversation.

use serde::{Deserialize, Serialize};

/// Per-conversation generation settings as stored with the record.
///
/// Sampling fields left as `None` are omitted from the request so the model
/// server applies its own defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default = "default_stream")]
    pub stream: bool,
    /// Ask reasoning models to emit their thinking separately.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub think: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_ctx: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    /// How long the server keeps the model loaded, e.g. `"5m"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,
}

fn default_stream() -> bool {
    true
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: None,
            stream: true,
            think: None,
            temperature: None,
            top_p: None,
            top_k: None,
            num_ctx: None,
            seed: None,
            keep_alive: None,
        }
    }
}

impl GenerationSettings {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_think(mut self, think: bool) -> Self {
        self.think = Some(think);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sampling options in the shape the model server expects, or `None`
    /// when nothing is overridden.
    pub fn options(&self) -> Option<ModelOptions> {
        let options = ModelOptions {
            temperature: self.temperature,
            top_p: self.top_p,
            top_k: self.top_k,
            num_ctx: self.num_ctx,
            seed: self.seed,
        };
        if options.is_empty() {
            None
        } else {
            Some(options)
        }
    }
}

/// The `options` object of a chat or generate request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_ctx: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
}

impl ModelOptions {
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.top_p.is_none()
            && self.top_k.is_none()
            && self.num_ctx.is_none()
            && self.seed.is_none()
    }
}
