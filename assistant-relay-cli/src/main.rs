//! CLI entry point for assistant-relay

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use assistant_relay_core::config::ConfigLoader;
use assistant_relay_core::logging::init_logging;
use assistant_relay_core::utils::mask_secret;
use assistant_relay_providers::OpenAiAssistantsClient;
use assistant_relay_server::{run_server, AppState, ProxyConfig, SessionProxy};

use assistant_relay_cli::client::{ApiClient, ChatSession, ClientError};

#[derive(Parser)]
#[command(name = "assistant-relay")]
#[command(about = "Relay chat turns to a hosted assistant")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP relay
    Serve {
        /// Address to bind (overrides server.host)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Chat with a running relay from the terminal
    Chat {
        /// Base URL of the relay API, e.g. http://localhost:3000/api
        #[arg(short, long)]
        url: Option<String>,
    },
    /// Send one message straight through the session proxy
    Ask {
        /// Message to send
        #[arg(short, long)]
        message: String,
        /// Session to continue
        #[arg(short, long)]
        session: Option<String>,
    },
    /// Show effective configuration
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };

    match cli.command {
        Commands::Serve { host, port } => run_serve(&config_loader, host, port).await?,
        Commands::Chat { url } => {
            init_quiet_logging();
            run_chat(&config_loader, url).await?;
        }
        Commands::Ask { message, session } => {
            init_quiet_logging();
            run_ask(&config_loader, &message, session).await?;
        }
        Commands::Status => run_status(&config_loader)?,
    }

    Ok(())
}

/// Warnings only on stderr, so interactive output stays readable
fn init_quiet_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        bar.set_style(spinner_style);
    }
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

async fn run_serve(loader: &ConfigLoader, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = loader.load()?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let _log_guard = init_logging(&config.logging);

    if !config.assistant.has_api_key() {
        warn!("No API key configured; remote calls will fail until one is set");
    }
    info!(
        "Relaying to assistant {} at {}",
        config.assistant.assistant_id, config.assistant.api_base
    );

    let backend = Arc::new(OpenAiAssistantsClient::from_config(&config.assistant));
    let state = AppState::new(backend, &config);

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let host = config.server.host.clone();
    let port = config.server.port;
    let mut server_handle =
        tokio::spawn(async move { run_server(state, &host, port, shutdown_rx).await });

    println!(
        "{} on http://{}:{}",
        style("assistant-relay is running").bold().cyan(),
        config.server.host,
        config.server.port
    );
    println!("{}", style("Press Ctrl+C to stop.").dim());

    // The server task can also end on its own, e.g. when the bind fails.
    let finished_early = tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            println!("\n{}", style("Shutting down...").yellow());
            let _ = shutdown_tx.send(());
            None
        }
        outcome = &mut server_handle => Some(outcome),
    };
    let outcome = match finished_early {
        Some(outcome) => outcome,
        None => server_handle.await,
    };

    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!("Server error: {}", e);
            return Err(e);
        }
        Err(e) => anyhow::bail!("Server task failed: {}", e),
    }

    println!("{}", style("Relay stopped.").green());
    Ok(())
}

async fn run_chat(loader: &ConfigLoader, url: Option<String>) -> Result<()> {
    let base_url = match url {
        Some(url) => url,
        None => {
            let config = loader.load_unvalidated()?;
            format!("http://{}:{}/api", config.server.host, config.server.port)
        }
    };

    let mut chat = ChatSession::new(ApiClient::new(Some(base_url)));

    println!("{}", style("assistant-relay chat").bold().cyan());
    println!("Relay: {}", chat.api().base_url());
    println!("{}", style("/new starts a new chat, /quit exits").dim());

    match chat.bootstrap().await {
        Ok(id) => println!("Session: {}\n", style(id).dim()),
        Err(e) => {
            // The relay creates a session on the first message anyway.
            warn!("Could not create a session up front: {}", e);
            println!();
        }
    }

    loop {
        let line = tokio::task::spawn_blocking(|| {
            Input::<String>::new()
                .with_prompt("You")
                .allow_empty(true)
                .interact_text()
        })
        .await??;

        match line.trim() {
            "/quit" | "/exit" => break,
            "/new" => {
                match chat.new_chat().await {
                    Ok(id) => println!("{} {}\n", style("New chat:").green(), id),
                    Err(e) => println!("{} {}\n", style("Error:").red().bold(), e),
                }
                continue;
            }
            _ => {}
        }

        let Some(turn) = chat.begin(&line) else {
            continue;
        };

        let bar = spinner("Assistant is typing...");
        let result = chat
            .api()
            .send(turn.session_id.as_deref(), &turn.text)
            .await;
        bar.finish_and_clear();

        match chat.complete(result) {
            Ok(entry) => {
                println!(
                    "{} {}\n{}\n",
                    style("Assistant").bold().green(),
                    style(entry.timestamp.format("%H:%M:%S")).dim(),
                    entry.text
                );
            }
            Err(ClientError::Server { message, .. }) => {
                println!("{} {}\n", style("Error:").red().bold(), message);
            }
            Err(e) => {
                println!("{} {}\n", style("Error:").red().bold(), e);
            }
        }
    }

    Ok(())
}

async fn run_ask(loader: &ConfigLoader, message: &str, session: Option<String>) -> Result<()> {
    let config = loader.load()?;
    let proxy = SessionProxy::new(
        Arc::new(OpenAiAssistantsClient::from_config(&config.assistant)),
        ProxyConfig::from_config(&config),
    );

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_cancel.cancel();
        }
    });

    let bar = spinner("Waiting for the assistant...");
    let result = proxy
        .send_message_with_cancel(session.as_deref(), message, &cancel)
        .await;
    bar.finish_and_clear();

    match result {
        Ok(reply) => {
            println!("{}", style("Response:").bold());
            println!("{}", reply.text);
            println!("\n{} {}", style("Session:").dim(), reply.session_id);
            Ok(())
        }
        Err(e) => {
            if let Some(session_id) = &e.session_id {
                println!("{} {}", style("Session:").dim(), session_id);
            }
            anyhow::bail!("Failed to process message: {}", e)
        }
    }
}

fn run_status(loader: &ConfigLoader) -> Result<()> {
    let config = loader.load_unvalidated()?;

    println!("{}", style("assistant-relay status").bold().cyan());
    println!("Version: {}\n", env!("CARGO_PKG_VERSION"));

    println!("{}", style("Configuration:").bold());
    println!("  Config file: {}", loader.config_path().display());
    println!("  Log directory: {}", config.logging.dir);
    println!();

    println!("{}", style("Assistant:").bold());
    let key_status = if config.assistant.has_api_key() {
        style(mask_secret(config.assistant.api_key.trim())).green()
    } else {
        style(mask_secret("")).red()
    };
    println!("  API key: {}", key_status);
    println!("  API base: {}", config.assistant.api_base);
    let assistant_id = if config.assistant.assistant_id.is_empty() {
        style("not configured".to_string()).red()
    } else {
        style(config.assistant.assistant_id.clone()).green()
    };
    println!("  Assistant: {}", assistant_id);
    if !config.assistant.vector_store_ids.is_empty() {
        println!(
            "  Vector stores: {}",
            config.assistant.vector_store_ids.join(", ")
        );
    }
    println!();

    println!("{}", style("Polling:").bold());
    println!("  Interval: {} ms", config.polling.interval_ms);
    println!("  Max attempts: {}", config.polling.max_attempts);
    println!("  History limit: {}", config.polling.history_limit);
    println!();

    println!("{}", style("Server:").bold());
    println!("  Listen: {}:{}", config.server.host, config.server.port);
    println!(
        "  Require session: {}",
        if config.session.require_session {
            "yes"
        } else {
            "no"
        }
    );
    println!();

    match loader.load() {
        Ok(_) => println!("{}", style("Configuration is valid.").green()),
        Err(e) => println!("{} {}", style("Configuration problems:").red().bold(), e),
    }

    Ok(())
}
