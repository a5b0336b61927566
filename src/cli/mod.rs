//! CLI entry point for skein.

pub mod chat;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// skein coding-agent CLI
#[derive(Parser, Debug)]
#[command(name = "skein", version, about = "Conversational coding agent with sub-agent delegation")]
pub struct Cli {
    /// Config file (defaults to ~/.skein/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send one prompt to a thread and print the reply
    Chat(ChatArgs),
}

/// Arguments for the `chat` subcommand.
#[derive(Parser, Debug)]
pub struct ChatArgs {
    /// Thread name (generated when omitted)
    #[arg(long)]
    pub thread: Option<String>,

    /// Working directory for the thread's tools
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Model override
    #[arg(short, long)]
    pub model: Option<String>,

    /// User prompt
    pub prompt: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_chat_minimal() {
        let cli = Cli::try_parse_from(["skein", "chat", "list the files"]).unwrap();
        match cli.command {
            Commands::Chat(args) => {
                assert_eq!(args.prompt, "list the files");
                assert!(args.thread.is_none());
                assert!(args.dir.is_none());
                assert!(args.model.is_none());
            }
        }
        assert!(cli.config.is_none());
    }

    #[test]
    fn parse_chat_with_all_options() {
        let cli = Cli::try_parse_from([
            "skein",
            "--config",
            "/tmp/skein.toml",
            "chat",
            "--thread",
            "calm-otter-0001",
            "-d",
            "/tmp",
            "-m",
            "gpt-4o",
            "hi",
        ])
        .unwrap();
        let Commands::Chat(args) = cli.command;
        assert_eq!(args.thread.as_deref(), Some("calm-otter-0001"));
        assert_eq!(args.dir, Some(PathBuf::from("/tmp")));
        assert_eq!(args.model.as_deref(), Some("gpt-4o"));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/skein.toml")));
    }

    #[test]
    fn chat_requires_prompt() {
        assert!(Cli::try_parse_from(["skein", "chat"]).is_err());
    }

    #[test]
    fn missing_subcommand_is_error() {
        assert!(Cli::try_parse_from(["skein"]).is_err());
    }
}
