//! Common test utilities for integration tests.

use ollama_chat::session::{AssistantMessage, StreamUpdate};

pub const BASE_URL: &str = "http://localhost:8000/api";

pub fn api_url(path: &str) -> String {
    format!("{}/{}", BASE_URL, path)
}

/// Observer that keeps every update it sees.
///
/// ```ignore
/// let mut recorder = Recorder::default();
/// session.start(&client, &url, &body, &mut recorder.observer()).await;
/// ```
#[derive(Debug, Default)]
pub struct Recorder {
    pub updates: Vec<StreamUpdate>,
}

impl Recorder {
    pub fn observer(&mut self) -> impl FnMut(&StreamUpdate, &AssistantMessage) + '_ {
        move |update: &StreamUpdate, _: &AssistantMessage| self.updates.push(update.clone())
    }

    /// Text deltas in order.
    pub fn deltas(&self) -> Vec<String> {
        self.updates
            .iter()
            .filter_map(|update| match update {
                StreamUpdate::Text { delta, .. } => Some(delta.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn finished_count(&self) -> usize {
        self.updates
            .iter()
            .filter(|update| matches!(update, StreamUpdate::Finished(_)))
            .count()
    }
}
