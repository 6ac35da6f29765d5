//! Version command for the ollama-chat CLI.

/// The current version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Text printed by `--version`.
pub fn version_string() -> String {
    format!("ollama-chat {}", VERSION)
}
