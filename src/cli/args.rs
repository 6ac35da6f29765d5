//! Command-line argument parsing for the ollama-chat CLI.
//!
//! Parsing is hand-rolled: the grammar is a subcommand, a few flags and a
//! trailing free-text message.

/// Options of the `chat` command.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChatArgs {
    pub model: Option<String>,
    /// Continue this stored conversation instead of starting a new one.
    pub conversation: Option<String>,
    pub system: Option<String>,
    /// `false` with `--no-stream`.
    pub stream: bool,
    pub think: bool,
    pub text: String,
}

/// Options of the `generate` command.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenerateArgs {
    pub model: Option<String>,
    pub system: Option<String>,
    pub think: bool,
    pub prompt: String,
}

/// Parsed CLI command to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Show version information
    Version,
    /// Show usage
    Help,
    /// List installed models
    Models,
    /// List models loaded in memory
    Running,
    /// Download a model; `wait` skips progress output
    Pull { name: String, wait: bool },
    Chat(ChatArgs),
    Generate(GenerateArgs),
    /// List stored conversations
    Conversations,
    /// Print one stored conversation
    Show { id: String },
    Delete { id: String },
    /// Print the effective configuration
    Config,
    /// Arguments could not be parsed
    Invalid(String),
}

pub const USAGE: &str = "\
Usage: ollama-chat <command> [options]

Commands:
  models                         List installed models
  running                        List models loaded in memory
  pull <name> [--wait]           Download a model
  chat [options] <text...>       Send a message and stream the reply
      -m, --model <name>         Model to use
      -c, --conversation <id>    Continue a stored conversation
      -s, --system <text>        System prompt for a new conversation
      --no-stream                Wait for the whole reply
      --think                    Ask for the model's reasoning
  generate [options] <prompt...> Complete a prompt without history
      -m, --model <name>
      -s, --system <text>
      --think
  conversations                  List stored conversations
  show <id>                      Print a stored conversation
  delete <id>                    Delete a stored conversation
  config                         Print the effective configuration
  -V, --version                  Show version
  -h, --help                     Show this help

Environment:
  OLLAMA_CHAT_API_URL, OLLAMA_CHAT_MODEL, OLLAMA_CHAT_TIMEOUT_SECS,
  OLLAMA_CHAT_MAX_LINE_BYTES, OLLAMA_CHAT_LOG, RUST_LOG";

/// Parse command-line arguments and return the appropriate command.
///
/// # Examples
///
/// ```
/// use ollama_chat::cli::args::{parse_args, CliCommand};
///
/// let args = vec!["ollama-chat".to_string(), "--version".to_string()];
/// assert_eq!(parse_args(args.into_iter()), CliCommand::Version);
/// ```
pub fn parse_args<I>(args: I) -> CliCommand
where
    I: Iterator<Item = String>,
{
    // Skip the program name
    let mut args = args.skip(1);
    let command = match args.next() {
        Some(command) => command,
        None => return CliCommand::Help,
    };

    match command.as_str() {
        "--version" | "-V" | "version" => CliCommand::Version,
        "--help" | "-h" | "help" => CliCommand::Help,
        "models" | "list" => CliCommand::Models,
        "running" | "ps" => CliCommand::Running,
        "conversations" => CliCommand::Conversations,
        "config" => CliCommand::Config,
        "show" => single_id(args, |id| CliCommand::Show { id }, "show"),
        "delete" => single_id(args, |id| CliCommand::Delete { id }, "delete"),
        "pull" => parse_pull(args),
        "chat" => parse_chat(args),
        "generate" => parse_generate(args),
        other => CliCommand::Invalid(format!("Unknown command: {}", other)),
    }
}

fn single_id<I, F>(mut args: I, build: F, command: &str) -> CliCommand
where
    I: Iterator<Item = String>,
    F: FnOnce(String) -> CliCommand,
{
    match (args.next(), args.next()) {
        (Some(id), None) => build(id),
        (None, _) => CliCommand::Invalid(format!("{} needs a conversation id", command)),
        (Some(_), Some(extra)) => CliCommand::Invalid(format!("Unexpected argument: {}", extra)),
    }
}

fn parse_pull<I: Iterator<Item = String>>(args: I) -> CliCommand {
    let mut name = None;
    let mut wait = false;
    for arg in args {
        match arg.as_str() {
            "--wait" | "--no-stream" => wait = true,
            flag if flag.starts_with('-') => {
                return CliCommand::Invalid(format!("Unknown option for pull: {}", flag))
            }
            _ if name.is_none() => name = Some(arg),
            _ => return CliCommand::Invalid(format!("Unexpected argument: {}", arg)),
        }
    }
    match name {
        Some(name) => CliCommand::Pull { name, wait },
        None => CliCommand::Invalid("pull needs a model name".to_string()),
    }
}

fn parse_chat<I: Iterator<Item = String>>(mut args: I) -> CliCommand {
    let mut chat = ChatArgs {
        stream: true,
        ..Default::default()
    };
    let mut words = Vec::new();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-m" | "--model" => match args.next() {
                Some(value) => chat.model = Some(value),
                None => return missing_value(&arg),
            },
            "-c" | "--conversation" => match args.next() {
                Some(value) => chat.conversation = Some(value),
                None => return missing_value(&arg),
            },
            "-s" | "--system" => match args.next() {
                Some(value) => chat.system = Some(value),
                None => return missing_value(&arg),
            },
            "--no-stream" => chat.stream = false,
            "--think" => chat.think = true,
            // Everything after `--` is message text.
            "--" => {
                words.extend(args.by_ref());
                break;
            }
            flag if flag.starts_with('-') && words.is_empty() => {
                return CliCommand::Invalid(format!("Unknown option for chat: {}", flag))
            }
            _ => words.push(arg),
        }
    }
    chat.text = words.join(" ");
    if chat.text.trim().is_empty() {
        return CliCommand::Invalid("chat needs a message".to_string());
    }
    CliCommand::Chat(chat)
}

fn parse_generate<I: Iterator<Item = String>>(mut args: I) -> CliCommand {
    let mut generate = GenerateArgs::default();
    let mut words = Vec::new();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-m" | "--model" => match args.next() {
                Some(value) => generate.model = Some(value),
                None => return missing_value(&arg),
            },
            "-s" | "--system" => match args.next() {
                Some(value) => generate.system = Some(value),
                None => return missing_value(&arg),
            },
            "--think" => generate.think = true,
            "--" => {
                words.extend(args.by_ref());
                break;
            }
            flag if flag.starts_with('-') && words.is_empty() => {
                return CliCommand::Invalid(format!("Unknown option for generate: {}", flag))
            }
            _ => words.push(arg),
        }
    }
    generate.prompt = words.join(" ");
    if generate.prompt.trim().is_empty() {
        return CliCommand::Invalid("generate needs a prompt".to_string());
    }
    CliCommand::Generate(generate)
}

fn missing_value(flag: &str) -> CliCommand {
    CliCommand::Invalid(format!("{} needs a value", flag))
}
