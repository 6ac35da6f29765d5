use ollama_chat::cli::{parse_args, run_cli_command, version_string, CliCommand};
use ollama_chat::config::ClientConfig;

use color_eyre::Result;
use tracing_subscriber::EnvFilter;

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins over the configured filter. Output goes to stderr so
/// streamed replies on stdout stay clean.
fn init_tracing(config_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config_filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> Result<()> {
    let command = parse_args(std::env::args());

    // Version needs no config, runtime or logging
    if command == CliCommand::Version {
        println!("{}", version_string());
        return Ok(());
    }

    color_eyre::install()?;

    let config = ClientConfig::load()?;
    init_tracing(&config.log_filter);
    tracing::debug!(api_url = %config.api_url, "Loaded configuration");

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_cli_command(command, &config))
}
