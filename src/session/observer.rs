//! Observer interface for session updates.

use super::{AssistantMessage, StreamUpdate};

/// Receives every update of a session, in arrival order.
///
/// `message` is the accumulator right after the update was applied, so a
/// renderer can redraw from it without keeping its own copy.
pub trait SessionObserver {
    fn on_update(&mut self, update: &StreamUpdate, message: &AssistantMessage);
}

impl<F> SessionObserver for F
where
    F: FnMut(&StreamUpdate, &AssistantMessage),
{
    fn on_update(&mut self, update: &StreamUpdate, message: &AssistantMessage) {
        self(update, message)
    }
}

/// Discards all updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {
    fn on_update(&mut self, _update: &StreamUpdate, _message: &AssistantMessage) {}
}
