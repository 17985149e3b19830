//! Admissions assistant binary - composition root.
//!
//! 1. Parse CLI flags and read `.env`
//! 2. Load configuration and initialise logging
//! 3. Load and validate the knowledge base
//! 4. Build the completion backend and the response composer
//! 5. Run the chosen front end: HTTP server, terminal chat, or one-shot ask

mod cli;

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use admit_api::handlers::ChatResponse;
use admit_api::state::AppState;
use admit_chat::{
    ChatError, DisabledCompleter, GeminiCompleter, ResponseComposer, SessionStore, TextCompleter,
};
use admit_core::config::{AdmitConfig, CompletionProvider, GenerationConfig};
use admit_core::AdmitError;
use admit_knowledge::KnowledgeBase;

use cli::{CliArgs, Command};

/// Load the config file if it exists, otherwise use defaults.
///
/// A file that exists but fails to parse or validate is an error.
fn load_config(path: &Path) -> Result<AdmitConfig, AdmitError> {
    if path.exists() {
        AdmitConfig::load(path)
    } else {
        let config = AdmitConfig::default();
        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(flag: Option<&str>, config: Option<&AdmitConfig>) {
    let fallback = flag
        .map(str::to_string)
        .or_else(|| config.map(|c| c.general.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback)),
        )
        .init();
}

/// Pick the completion backend named in config.
fn build_completer(config: &GenerationConfig) -> Result<Arc<dyn TextCompleter>, AdmitError> {
    match config.provider {
        CompletionProvider::Disabled => {
            tracing::warn!("Generation disabled; unmatched queries get the fallback message");
            Ok(Arc::new(DisabledCompleter))
        }
        CompletionProvider::Gemini => {
            let key = std::env::var(&config.api_key_env).map_err(|_| {
                AdmitError::Config(format!(
                    "{} is not set; export it or set generation.provider = \"disabled\"",
                    config.api_key_env
                ))
            })?;
            let completer = GeminiCompleter::new(config, key)
                .map_err(|e| AdmitError::Config(e.to_string()))?;
            tracing::info!(model = %config.model, "Gemini completer ready");
            Ok(Arc::new(completer))
        }
    }
}

/// Periodically drop idle sessions.
async fn session_sweeper(sessions: Arc<SessionStore>, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    // First tick fires immediately
    interval.tick().await;
    loop {
        interval.tick().await;
        if let Err(e) = sessions.remove_expired() {
            tracing::warn!(error = %e, "Session sweep failed");
        }
    }
}

/// Clear the terminal session. A session that does not exist yet has
/// nothing to clear.
fn reset_conversation(composer: &ResponseComposer, session_id: &str) -> Result<(), ChatError> {
    match composer.reset_session(session_id) {
        Err(ChatError::SessionNotFound(_)) => Ok(()),
        other => other,
    }
}

async fn run_chat(composer: &ResponseComposer) -> Result<(), Box<dyn std::error::Error>> {
    let session_id = uuid::Uuid::new_v4().to_string();
    println!(
        "Admissions assistant. Type 'quit' to exit, 'reset' to start over, 'stats' for statistics."
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\nYou: ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        match query.to_lowercase().as_str() {
            "quit" | "exit" => break,
            "reset" => {
                if let Err(e) = reset_conversation(composer, &session_id) {
                    tracing::warn!(session_id = %session_id, error = %e, "Reset failed");
                }
                println!("Conversation reset.");
            }
            "stats" => {
                println!("{}", serde_json::to_string_pretty(&composer.statistics())?);
            }
            _ => {
                let reply = composer.respond(query, Some(&session_id)).await;
                println!("Assistant: {}", reply.reply);
                println!("[{}, {:.2}]", reply.source, reply.confidence);
            }
        }
    }
    println!("Goodbye.");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is normal
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();

    // Config, then tracing so the configured level applies.
    let config_file = args.resolve_config_path();
    let config = load_config(&config_file);
    init_tracing(args.log_level.as_deref(), config.as_ref().ok());
    let mut config = match config {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(path = %config_file.display(), error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };
    tracing::info!(path = %config_file.display(), "Configuration ready");

    // Knowledge base.
    let kb_path = args.resolve_knowledge_base(&config.general.knowledge_base);
    let kb = match KnowledgeBase::load(&kb_path) {
        Ok(kb) => Arc::new(kb),
        Err(e) => {
            tracing::error!(path = %kb_path.display(), error = %e, "Failed to load knowledge base");
            return Err(AdmitError::from(e).into());
        }
    };

    let completer = match build_completer(&config.generation) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "Failed to set up generation backend");
            return Err(e.into());
        }
    };
    let composer = Arc::new(ResponseComposer::new(kb, &config, completer));

    match args.command.clone() {
        Command::Serve { .. } => {
            config.server.port = args.resolve_port(config.server.port);

            let sessions = composer.sessions();
            let sweep_secs = config.session.sweep_interval_secs;
            tokio::spawn(async move {
                session_sweeper(sessions, sweep_secs).await;
            });

            let server = config.server.clone();
            let state = AppState::new(Arc::clone(&composer), config);
            if let Err(e) = admit_api::start_server(&server, state).await {
                tracing::error!(error = %e, "API server stopped");
                return Err(e.into());
            }
        }
        Command::Chat => run_chat(&composer).await?,
        Command::Ask { question } => {
            let reply = composer.respond(&question, None).await;
            println!(
                "{}",
                serde_json::to_string_pretty(&ChatResponse::from(reply))?
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn composer() -> ResponseComposer {
        let kb =
            KnowledgeBase::from_json(include_str!("../../../data/knowledge_base.json")).unwrap();
        ResponseComposer::new(Arc::new(kb), &AdmitConfig::default(), Arc::new(DisabledCompleter))
    }

    // ---- Chat reset ----

    #[test]
    fn test_reset_before_first_question_is_ok() {
        let c = composer();
        assert!(reset_conversation(&c, "fresh").is_ok());
    }

    #[tokio::test]
    async fn test_reset_clears_history() {
        let c = composer();
        c.respond("What is the fee structure?", Some("term")).await;
        assert_eq!(c.history("term").unwrap().len(), 1);
        reset_conversation(&c, "term").unwrap();
        assert!(c.history("term").unwrap().is_empty());
    }
}
