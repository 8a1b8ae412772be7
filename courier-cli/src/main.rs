//! CLI entry point for courier

mod bridge;

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use courier_channels::{Connection, Dispatcher, SenderSet};
use courier_core::config::{Config, ConfigLoader};
use courier_core::history::{DeliveryLog, JsonlDeliveryLog, MemoryDeliveryLog};
use courier_core::logging::init_logging;
use courier_core::reply::{ConversationId, Platform};
use courier_scheduler::{Courier, Scheduler, SchedulerOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "courier")]
#[command(about = "Outbound reply scheduling for chat agents")]
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
    /// Write a default configuration file
    Init {
        /// Overwrite an existing configuration
        #[arg(short, long)]
        force: bool,
    },
    /// Run the scheduler, reading producer commands from stdin
    Run,
    /// Deliver one message immediately
    Send {
        /// Target conversation (chat, channel or group id)
        #[arg(long)]
        conversation: String,
        /// Message text
        #[arg(short, long)]
        text: Option<String>,
        /// Message to reply to
        #[arg(short, long)]
        reply_to: Option<String>,
        /// File to send as rich content
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Caption for the file
        #[arg(long)]
        caption: Option<String>,
    },
    /// Show configuration and delivery status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };

    match cli.command {
        Commands::Init { force } => {
            init_console_logging();
            run_init(&config_loader, force)?;
        }
        Commands::Run => {
            run_scheduler(&config_loader).await?;
        }
        Commands::Send {
            conversation,
            text,
            reply_to,
            file,
            caption,
        } => {
            init_console_logging();
            run_send(&config_loader, conversation, text, reply_to, file, caption).await?;
        }
        Commands::Status => {
            init_console_logging();
            run_status(&config_loader).await?;
        }
    }

    Ok(())
}

/// Plain stderr logging for one-shot commands
fn init_console_logging() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
}

/// Resolve a possibly relative path against the config directory
fn resolve_path(loader: &ConfigLoader, path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        loader.config_dir().join(path)
    }
}

fn delivery_log(loader: &ConfigLoader, config: &Config) -> Arc<dyn DeliveryLog> {
    if config.delivery_log.enabled {
        Arc::new(JsonlDeliveryLog::new(resolve_path(
            loader,
            &config.delivery_log.path,
        )))
    } else {
        Arc::new(MemoryDeliveryLog::new())
    }
}

/// Build the context and install the configured platform's connection
fn build_courier(config: &Config) -> Result<Courier> {
    let senders = SenderSet::from_config(&config.channels);
    let courier = Courier::from_config(config, senders.clone())?;

    let platform = courier.dispatcher().platform();
    match senders.get(platform) {
        Some(sender) => courier.set_connection(Connection::from_sender(sender)),
        None => match senders.all().first() {
            Some(sender) => {
                warn!(
                    "No sender for configured platform {}, connecting {} instead",
                    platform,
                    sender.platform()
                );
                courier.set_connection(Connection::from_sender(sender.clone()));
            }
            None => warn!("No channel enabled; deliveries will fail until one is configured"),
        },
    }

    Ok(courier)
}

fn run_init(loader: &ConfigLoader, force: bool) -> Result<()> {
    let config_path = loader.config_dir().join("config.json");
    if config_path.exists() && !force {
        println!(
            "{} already exists, use --force to overwrite",
            config_path.display()
        );
        return Ok(());
    }

    loader.save(&Config::default())?;
    println!(
        "{} {}",
        style("Wrote").green(),
        config_path.display()
    );
    println!("Enable a channel under \"channels\" and set its token to start delivering.");
    Ok(())
}

async fn run_scheduler(loader: &ConfigLoader) -> Result<()> {
    let config = loader.load()?;
    let _log_guard = init_logging(&config.logging);

    let courier = Arc::new(build_courier(&config)?);
    let default_platform = courier.dispatcher().platform();
    let options = SchedulerOptions::from_config(
        &config.scheduler,
        config.dispatch.special_content_label.clone(),
    );
    let scheduler = Arc::new(Scheduler::new(
        &courier,
        delivery_log(loader, &config),
        options,
    ));

    eprintln!("{}", style("Starting courier...").bold().cyan());
    eprintln!("Platform: {}", default_platform);
    eprintln!(
        "Tick: {}ms, thinking timeout: {}s",
        config.scheduler.tick_interval_ms, config.scheduler.thinking_timeout_secs
    );

    scheduler.start();

    let bridge_courier = courier.clone();
    let bridge_handle = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let response = bridge::execute_line(&bridge_courier, default_platform, line);
                    println!("{}", response);
                }
                Ok(None) => {
                    info!("Producer input closed");
                    break;
                }
                Err(e) => {
                    error!("Failed to read producer input: {}", e);
                    break;
                }
            }
        }
    });

    eprintln!(
        "{}",
        style("Courier is running. Press Ctrl+C to stop.").green()
    );
    tokio::signal::ctrl_c().await?;
    eprintln!("\n{}", style("Shutting down...").yellow());

    bridge_handle.abort();
    let _ = bridge_handle.await;
    scheduler.stop().await;

    let pending: usize = courier.registry().pending_counts().values().sum();
    if pending > 0 {
        warn!("{} queued replies dropped at shutdown", pending);
    }

    eprintln!("{}", style("Courier stopped.").green());
    Ok(())
}

async fn run_send(
    loader: &ConfigLoader,
    conversation: String,
    text: Option<String>,
    reply_to: Option<String>,
    file: Option<PathBuf>,
    caption: Option<String>,
) -> Result<()> {
    let config = loader.load()?;
    let senders = SenderSet::from_config(&config.channels);
    let dispatcher = Dispatcher::from_config(&config.dispatch, senders.clone())?;
    let sender = senders.get(dispatcher.platform()).ok_or_else(|| {
        anyhow::anyhow!(
            "Channel {} is not enabled or missing credentials",
            dispatcher.platform()
        )
    })?;
    dispatcher.set_connection(Connection::from_sender(sender));

    let target = ConversationId::from(conversation);
    match (file, text) {
        (Some(file), _) => {
            dispatcher
                .deliver_special(&target, &file, caption.as_deref(), reply_to.as_deref())
                .await?;
        }
        (None, Some(text)) => {
            dispatcher
                .deliver(&target, &text, reply_to.as_deref())
                .await?;
        }
        (None, None) => anyhow::bail!("Provide --text or --file"),
    }

    println!("{} to {}", style("Delivered").green(), target);
    Ok(())
}

async fn run_status(loader: &ConfigLoader) -> Result<()> {
    let config = loader.load()?;

    println!("{}", style("Courier Status").bold().cyan());
    println!("Version: {}\n", env!("CARGO_PKG_VERSION"));

    println!("{}", style("Configuration:").bold());
    println!("  Config directory: {}", loader.config_dir().display());
    println!("  Platform: {}", config.dispatch.platform);
    println!("  Tick interval: {}ms", config.scheduler.tick_interval_ms);
    println!(
        "  Thinking timeout: {}s",
        config.scheduler.thinking_timeout_secs
    );
    println!("  Max queue size: {}", config.scheduler.max_queue_size);
    println!(
        "  Typing delay cap: {}s",
        config.dispatch.typing.max_delay_secs
    );
    println!();

    println!("{}", style("Channels:").bold());
    let channels = [
        (
            Platform::Telegram,
            config.channels.telegram.enabled,
            config.channels.telegram.token.is_empty(),
        ),
        (
            Platform::Discord,
            config.channels.discord.enabled,
            config.channels.discord.token.is_empty(),
        ),
        (
            Platform::OneBot,
            config.channels.onebot.enabled,
            config.channels.onebot.api_url.is_empty(),
        ),
    ];
    for (platform, enabled, missing_creds) in channels {
        if enabled {
            if missing_creds {
                println!(
                    "  {}: {} (missing credentials)",
                    platform,
                    style("enabled").yellow()
                );
            } else {
                println!("  {}: {}", platform, style("enabled").green());
            }
        } else {
            println!("  {}: {}", platform, style("disabled").dim());
        }
    }
    println!();

    println!("{}", style("Delivery log:").bold());
    if config.delivery_log.enabled {
        let log = JsonlDeliveryLog::new(resolve_path(loader, &config.delivery_log.path));
        let records = log.read_all().await?;
        println!("  Path: {}", log.path().display());
        println!("  Records: {}", records.len());
        if let Some(last) = records.last() {
            println!(
                "  Last: {} -> {} at {}",
                last.platform,
                last.conversation_id,
                last.delivered_at.to_rfc3339()
            );
        }
    } else {
        println!("  {}", style("disabled").dim());
    }

    Ok(())
}
