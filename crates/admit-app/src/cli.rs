//! CLI argument definitions for the admissions assistant.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Admissions assistant: answers prospective students' questions from a
/// curated knowledge base, with a generative fallback.
#[derive(Parser, Debug)]
#[command(name = "admit", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Path to the knowledge base JSON file.
    #[arg(short = 'k', long = "knowledge-base", global = true)]
    pub knowledge_base: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the HTTP API server.
    Serve {
        /// API server port.
        #[arg(short = 'p', long = "port")]
        port: Option<u16>,
    },
    /// Interactive question-and-answer loop on the terminal.
    Chat,
    /// Answer a single question and print the reply as JSON.
    Ask {
        /// The question to ask.
        question: String,
    },
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > ADMIT_CONFIG env var > ~/.admit/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("ADMIT_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the API server port.
    ///
    /// Priority: --port flag > ADMIT_PORT env var > config file value.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        let flag = match self.command {
            Command::Serve { port } => port,
            _ => None,
        };
        resolve_port_from(flag, std::env::var("ADMIT_PORT").ok(), config_port)
    }

    /// Resolve the knowledge base path.
    ///
    /// Priority: --knowledge-base flag > config file value.
    pub fn resolve_knowledge_base(&self, config_path: &str) -> PathBuf {
        self.knowledge_base
            .clone()
            .unwrap_or_else(|| PathBuf::from(config_path))
    }
}

fn resolve_port_from(flag: Option<u16>, env: Option<String>, config_port: u16) -> u16 {
    flag.or_else(|| env.and_then(|v| v.parse::<u16>().ok()))
        .unwrap_or(config_port)
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".admit").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".admit").join("config.toml");
    }
    PathBuf::from("config.toml")
}
