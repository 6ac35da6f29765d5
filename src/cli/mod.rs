//! CLI module for ollama-chat.
//!
//! - Argument parsing ([`args`])
//! - Terminal rendering of streams and listings ([`render`])
//! - Command handlers ([`execute`])
//!
//! # Usage
//!
//! ```ignore
//! use ollama_chat::cli::{parse_args, run_cli_command};
//! use ollama_chat::config::ClientConfig;
//!
//! let config = ClientConfig::load()?;
//! let command = parse_args(std::env::args());
//! run_cli_command(command, &config).await?;
//! ```

pub mod args;
pub mod render;
pub mod version;

pub use args::{parse_args, ChatArgs, CliCommand, GenerateArgs, USAGE};
pub use version::{version_string, VERSION};

use std::io::Write;

use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use tracing::debug;

use crate::adapters::ReqwestHttpClient;
use crate::api::{ApiClient, PullOutcome};
use crate::config::ClientConfig;
use crate::error::ChatError;
use crate::models::{Conversation, GenerateRequest, GenerationSettings};
use crate::orchestrator::ChatOrchestrator;
use crate::session::{CancelHandle, SessionState};
use crate::traits::{ConversationStore, HttpClient};
use render::TerminalObserver;

/// Run a parsed command against the configured backend.
///
/// Ctrl-C aborts the running request through its [`CancelHandle`].
pub async fn run_cli_command(command: CliCommand, config: &ClientConfig) -> Result<()> {
    let mut out = std::io::stdout();
    let mut err = std::io::stderr();

    match command {
        CliCommand::Version => {
            writeln!(out, "{}", version_string())?;
            Ok(())
        }
        CliCommand::Help => {
            writeln!(out, "{}", USAGE)?;
            Ok(())
        }
        CliCommand::Invalid(message) => Err(eyre!("{}\n\n{}", message, USAGE)),
        CliCommand::Config => {
            writeln!(out, "{}", serde_json::to_string_pretty(config)?)?;
            Ok(())
        }
        command => {
            let http = ReqwestHttpClient::new().with_request_timeout(config.request_timeout());
            let api = ApiClient::new(config.api_url.clone(), http)
                .with_max_line_bytes(config.max_line_bytes);
            let cancel = CancelHandle::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    debug!("Interrupted, aborting request");
                    on_interrupt.abort();
                }
            });
            let result = execute(
                command,
                &api,
                config.default_model.as_deref(),
                &cancel,
                &mut out,
                &mut err,
            )
            .await;
            if let Err(report) = &result {
                write_hint(&mut err, report);
            }
            result
        }
    }
}

/// Print the recovery hint for the first [`ChatError`] behind `report`.
fn write_hint<E: Write>(err: &mut E, report: &color_eyre::Report) {
    let category = report
        .chain()
        .find_map(|cause| cause.downcast_ref::<ChatError>())
        .map(ChatError::category);
    if let Some(category) = category {
        let _ = writeln!(err, "hint: {}", category.recovery_hint());
    }
}

/// Execute a backend command, writing results to `out` and diagnostics to
/// `err`.
pub async fn execute<C, O, E>(
    command: CliCommand,
    api: &ApiClient<C>,
    default_model: Option<&str>,
    cancel: &CancelHandle,
    out: &mut O,
    err: &mut E,
) -> Result<()>
where
    C: HttpClient + Clone,
    O: Write,
    E: Write,
{
    match command {
        CliCommand::Models => {
            let models = api.list_models().await.wrap_err("Failed to list models")?;
            render::write_models(out, &models)?;
        }
        CliCommand::Running => {
            let models = api
                .list_running()
                .await
                .wrap_err("Failed to list running models")?;
            render::write_running(out, &models)?;
        }
        CliCommand::Pull { name, wait } => pull(api, &name, wait, cancel, out).await?,
        CliCommand::Chat(args) => chat(api, args, default_model, cancel, out, err).await?,
        CliCommand::Generate(args) => generate(api, args, default_model, cancel, out, err).await?,
        CliCommand::Conversations => {
            let conversations = api.list().await.wrap_err("Failed to list conversations")?;
            if conversations.is_empty() {
                writeln!(out, "No conversations.")?;
            }
            for summary in conversations {
                let updated = summary
                    .updated_at
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                writeln!(out, "{}  {:<16}  {}", summary.id, updated, summary.title)?;
            }
        }
        CliCommand::Show { id } => {
            let conversation = api
                .get(&id)
                .await?
                .ok_or_else(|| eyre!("Conversation {} not found", id))?;
            render::write_conversation(out, &conversation)?;
        }
        CliCommand::Delete { id } => {
            if !api.delete(&id).await? {
                return Err(eyre!("Conversation {} not found", id));
            }
            writeln!(out, "Deleted {}", id)?;
        }
        CliCommand::Version
        | CliCommand::Help
        | CliCommand::Config
        | CliCommand::Invalid(_) => {
            return Err(eyre!("Not a backend command"));
        }
    }
    Ok(())
}

async fn pull<C, O>(
    api: &ApiClient<C>,
    name: &str,
    wait: bool,
    cancel: &CancelHandle,
    out: &mut O,
) -> Result<()>
where
    C: HttpClient,
    O: Write,
{
    let outcome = if wait {
        api.pull_model_blocking(name).await?
    } else {
        api.pull_model(name, cancel, |event| {
            let _ = writeln!(out, "{}", render::pull_line(event));
        })
        .await?
    };
    match outcome {
        PullOutcome::Success => {
            writeln!(out, "Pulled {}", name)?;
            Ok(())
        }
        PullOutcome::Aborted => {
            writeln!(out, "Stopped pulling {}", name)?;
            Ok(())
        }
        PullOutcome::Failed(message) => Err(eyre!("Pull failed: {}", message)),
        PullOutcome::Incomplete => Err(eyre!("Pull of {} ended without a final status", name)),
    }
}

async fn chat<C, O, E>(
    api: &ApiClient<C>,
    args: ChatArgs,
    default_model: Option<&str>,
    cancel: &CancelHandle,
    out: &mut O,
    err: &mut E,
) -> Result<()>
where
    C: HttpClient + Clone,
    O: Write,
    E: Write,
{
    let mut conversation = match args.conversation.as_deref() {
        Some(id) => api
            .get(id)
            .await?
            .ok_or_else(|| eyre!("Conversation {} not found", id))?,
        None => Conversation::new(),
    };
    if let Some(system) = args.system {
        conversation.system = system;
    }

    let mut settings = conversation.settings.clone().with_stream(args.stream);
    if let Some(model) = args.model {
        settings.model = Some(model);
    }
    if args.think {
        settings.think = Some(true);
    }

    let orchestrator = ChatOrchestrator::new(api.clone(), api.clone())
        .with_default_model(default_model.map(str::to_string));
    let mut observer = TerminalObserver::new(&mut *out, &mut *err);
    let result = orchestrator
        .send(&mut conversation, &args.text, &settings, cancel, &mut observer)
        .await;
    drop(observer);

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(ChatError::Store(message)) => {
            writeln!(err, "Warning: conversation not saved: {}", message)?;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    writeln!(err, "conversation: {}", conversation.id)?;
    match outcome.state {
        SessionState::Failed => Err(eyre!("The reply did not complete")),
        _ => Ok(()),
    }
}

async fn generate<C, O, E>(
    api: &ApiClient<C>,
    args: GenerateArgs,
    default_model: Option<&str>,
    cancel: &CancelHandle,
    out: &mut O,
    err: &mut E,
) -> Result<()>
where
    C: HttpClient,
    O: Write,
    E: Write,
{
    let model = args
        .model
        .or_else(|| default_model.map(str::to_string))
        .ok_or(ChatError::MissingModel)?;
    let mut settings = GenerationSettings::default().with_model(model.clone());
    if args.think {
        settings.think = Some(true);
    }
    let request = GenerateRequest::new(model, args.prompt, &settings)
        .with_system(args.system.unwrap_or_default());

    let mut session = api.new_session(cancel.clone());
    let mut observer = TerminalObserver::new(&mut *out, &mut *err);
    let state = api
        .stream_generate(&request, &mut session, &mut observer)
        .await?;
    match state {
        SessionState::Failed => Err(eyre!("The completion did not finish")),
        _ => Ok(()),
    }
}
