//! Command-line interface definition.

use crate::core::types::{parse_opcode, Opcode};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// opsift: search directories of packet captures for an opcode
#[derive(Parser, Debug)]
#[command(name = "opsift")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors and hide the status line
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Use this configuration file instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine processing
    Json,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search a directory tree for records carrying an opcode
    Scan {
        /// Directory to search recursively
        root: PathBuf,

        /// Opcode to count, in hex (e.g. F7B0 or 0xF7B0)
        #[arg(short, long, value_parser = opcode_arg)]
        opcode: Opcode,

        /// File extension to include (repeatable; defaults to the configured list)
        #[arg(short, long = "ext")]
        extensions: Vec<String>,

        /// Report every message code seen in fragments
        #[arg(long)]
        census: bool,

        /// Report occurrences of this game event code (hex, repeatable)
        #[arg(long = "game-event", value_parser = opcode_arg)]
        game_events: Vec<u32>,

        /// Number of worker threads
        #[arg(short, long)]
        workers: Option<usize>,

        /// Progress report interval in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Export the summary to a file (.csv or .json)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Configure settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show application information
    Info,
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Reset configuration to defaults
    Reset,

    /// Print the configuration file location
    Path,
}

fn opcode_arg(text: &str) -> std::result::Result<Opcode, String> {
    parse_opcode(text).map_err(|e| e.to_string())
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
