//! Plain-text rendering of session updates for a terminal.

use std::io::Write;

use crate::models::{format_size, ChatMessage, Conversation, ModelInfo, Role, RunningModel};
use crate::ndjson::PullEvent;
use crate::session::{AssistantMessage, SessionObserver, SessionState, StreamUpdate};

/// Writes assistant text to `out` as it arrives; reasoning and annotations
/// go to `err` so piped output holds only the reply.
pub struct TerminalObserver<O, E> {
    out: O,
    err: E,
    in_reasoning: bool,
}

impl<O: Write, E: Write> TerminalObserver<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self {
            out,
            err,
            in_reasoning: false,
        }
    }

    pub fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }

    fn end_reasoning(&mut self) {
        if self.in_reasoning {
            let _ = writeln!(self.err);
            self.in_reasoning = false;
        }
    }
}

impl<O: Write, E: Write> SessionObserver for TerminalObserver<O, E> {
    fn on_update(&mut self, update: &StreamUpdate, _message: &AssistantMessage) {
        // Terminal write failures (closed pipe) must not stop the session.
        match update {
            StreamUpdate::Reasoning { delta, .. } => {
                if !self.in_reasoning {
                    let _ = write!(self.err, "[thinking] ");
                    self.in_reasoning = true;
                }
                let _ = write!(self.err, "{}", delta);
                let _ = self.err.flush();
            }
            StreamUpdate::Text { delta, .. } => {
                self.end_reasoning();
                let _ = write!(self.out, "{}", delta);
                let _ = self.out.flush();
            }
            StreamUpdate::ToolCalls { calls } => {
                self.end_reasoning();
                for call in calls {
                    let _ = writeln!(self.err, "[tool call] {}", call);
                }
            }
            StreamUpdate::Annotation(annotation) => {
                self.end_reasoning();
                let label = if annotation.is_fatal() { "error" } else { "warning" };
                let _ = writeln!(self.err, "\n[{}] {}", label, annotation.message);
            }
            StreamUpdate::Finished(state) => {
                self.end_reasoning();
                let _ = writeln!(self.out);
                match state {
                    SessionState::Aborted => {
                        let _ = writeln!(self.err, "[stopped]");
                    }
                    SessionState::Failed => {
                        let _ = writeln!(self.err, "[failed]");
                    }
                    _ => {}
                }
                let _ = self.out.flush();
            }
        }
    }
}

pub fn write_models<W: Write>(out: &mut W, models: &[ModelInfo]) -> std::io::Result<()> {
    if models.is_empty() {
        return writeln!(out, "No models installed.");
    }
    for model in models {
        let params = model
            .details
            .as_ref()
            .and_then(|d| d.parameter_size.as_deref())
            .unwrap_or("");
        writeln!(
            out,
            "{:<32} {:>10} {}",
            model.display_name(),
            format_size(model.size),
            params
        )?;
    }
    Ok(())
}

pub fn write_running<W: Write>(out: &mut W, models: &[RunningModel]) -> std::io::Result<()> {
    if models.is_empty() {
        return writeln!(out, "No models loaded.");
    }
    for model in models {
        writeln!(
            out,
            "{:<32} {:>10} vram {:>10} until {}",
            if model.name.is_empty() { &model.model } else { &model.name },
            format_size(model.size),
            format_size(model.size_vram),
            model.expires_at.as_deref().unwrap_or("-")
        )?;
    }
    Ok(())
}

/// One progress line for a pull event.
pub fn pull_line(event: &PullEvent) -> String {
    match event {
        PullEvent::Status { status } => status.clone(),
        PullEvent::Progress { status, .. } => match event.fraction() {
            Some(fraction) => format!("{} {:>5.1}%", status, fraction * 100.0),
            None => status.clone(),
        },
        PullEvent::Success => "success".to_string(),
        PullEvent::Error { message } => format!("error: {}", message),
        PullEvent::Malformed { raw } => format!("unreadable progress line: {}", raw),
    }
}

pub fn write_conversation<W: Write>(out: &mut W, conversation: &Conversation) -> std::io::Result<()> {
    writeln!(out, "# {} ({})", conversation.title, conversation.id)?;
    if let Some(model) = conversation.settings.model.as_deref() {
        writeln!(out, "model: {}", model)?;
    }
    if !conversation.system.is_empty() {
        writeln!(out, "system: {}", conversation.system)?;
    }
    for message in &conversation.messages {
        writeln!(out)?;
        write_message(out, message)?;
    }
    Ok(())
}

fn write_message<W: Write>(out: &mut W, message: &ChatMessage) -> std::io::Result<()> {
    let role = match message.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };
    writeln!(out, "[{}]", role)?;
    if let Some(thinking) = message.thinking.as_deref().filter(|t| !t.is_empty()) {
        writeln!(out, "(thinking) {}", thinking)?;
    }
    writeln!(out, "{}", message.content)?;
    for error in &message.errors {
        writeln!(out, "[error] {}", error)?;
    }
    Ok(())
}
