//! Colloquy CLI - chat with a model while history is trimmed and summarized

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colloquy_core::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "colloquy")]
#[command(about = "Chat with an LLM using bounded, summarized history", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to colloquy.toml plus COLLOQUY_* variables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the provider ("openai" or "echo")
    #[arg(long, global = true, env = "COLLOQUY_PROVIDER")]
    provider: Option<LLMProviderType>,

    /// Override the model name
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat on stdin
    Chat {
        /// Session id
        #[arg(short, long, default_value = "default")]
        session: String,
    },
    /// Send each message as a turn in one session, then print the history
    Ask {
        /// Session id
        #[arg(short, long, default_value = "demo")]
        session: String,

        /// Print replies and history as JSON
        #[arg(long)]
        json: bool,

        /// Messages, sent in order
        #[arg(required = true)]
        messages: Vec<String>,
    },
    /// Print the effective configuration
    Config,
    /// Version information
    Version,
}

fn load_config(cli: &Cli) -> Result<ColloquyConfig> {
    let mut config = match &cli.config {
        Some(path) => ColloquyConfig::from_file(path)?,
        None => ColloquyConfig::load()?,
    };

    if let Some(provider) = cli.provider {
        config.llm.provider = provider;
    }
    if let Some(model) = &cli.model {
        config.llm.model = Some(model.clone());
    }

    config.validate()?;
    Ok(config)
}

fn build_session(config: &ColloquyConfig) -> Result<ConversationSession> {
    let provider =
        LLMProviderFactory::create(&config.llm).context("Failed to create LLM provider")?;
    Ok(ConversationSession::from_config(config, provider)?)
}

fn print_history(history: &[SequencedMessage]) {
    for entry in history {
        println!("[{}] {}: {}", entry.sequence, entry.role(), entry.content());
    }
}

async fn run_chat(session: &ConversationSession, session_id: &str) -> Result<()> {
    println!("Session '{}'. Commands: /history, /reset, /quit", session_id);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();

        match input {
            "" => continue,
            "/quit" | "/exit" => break,
            "/history" => print_history(&session.history(session_id).await),
            "/reset" => {
                session.reset(session_id).await;
                println!("History cleared.");
            }
            _ => match session.turn_with_report(session_id, input).await {
                Ok(outcome) => {
                    for compaction in outcome.compactions.iter().filter(|c| c.compacted) {
                        tracing::info!(
                            policy = compaction.policy.name(),
                            before = compaction.before,
                            after = compaction.after,
                            "History compacted"
                        );
                    }
                    println!("{}", outcome.reply);
                }
                // History is untouched on failure, so the user can retry.
                Err(e) => eprintln!("error: {}", e),
            },
        }
    }

    Ok(())
}

async fn run_ask(
    session: &ConversationSession,
    session_id: &str,
    messages: &[String],
    json: bool,
) -> Result<()> {
    let mut outcomes = Vec::with_capacity(messages.len());
    for message in messages {
        let outcome = session.turn_with_report(session_id, message).await?;
        if !json {
            println!("{}", outcome.reply);
        }
        outcomes.push(outcome);
    }

    let history = session.history(session_id).await;
    if json {
        let report = serde_json::json!({
            "session": session_id,
            "turns": outcomes,
            "history": history,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!();
        print_history(&history);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Version => {
            println!("colloquy {}", env!("CARGO_PKG_VERSION"));
            println!("colloquy-core {}", colloquy_core::VERSION);
        }
        Commands::Config => {
            let config = load_config(&cli)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Chat { session } => {
            let config = load_config(&cli)?;
            let conversation = build_session(&config)?;
            run_chat(&conversation, session).await?;
        }
        Commands::Ask {
            session,
            json,
            messages,
        } => {
            let config = load_config(&cli)?;
            let conversation = build_session(&config)?;
            run_ask(&conversation, session, messages, *json).await?;
        }
    }

    Ok(())
}
