use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use medtrack::banner::{BannerInfo, print_banner, print_session_summary};
use medtrack::bootstrap::{Bootstrapper, ProcessHost};
use medtrack::commands::{CommandRegistry, CommandResult, SessionInfo};
use medtrack::config::Config;
use medtrack::consts::{LOG_ENV, default_db_path};
use medtrack::entry::{EntryPointCatalog, EntryPointRef};
use medtrack::error::TriggerError;
use medtrack::events::{Event, EventBus};
use medtrack::registry::EngineRegistry;
use medtrack::trigger::{Dispatch, Trigger, TriggerHandler, TriggerKind};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    Alarm,
    Notification,
    Broadcast,
}

impl From<Kind> for TriggerKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Alarm => TriggerKind::Alarm,
            Kind::Notification => TriggerKind::Notification,
            Kind::Broadcast => TriggerKind::Broadcast,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "medtrack",
    version,
    about = "Medication reminders that keep running in the background."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// SQLite settings database (use :memory: for ephemeral; default ~/.medtrack/medtrack.db)
    #[arg(short, long)]
    db: Option<String>,

    /// Entry point to bind the background engine to (overrides the stored setting)
    #[arg(short, long)]
    entry_point: Option<String>,

    /// Dispatch timeout in seconds, at least 1 (overrides the stored setting)
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Fire triggers of this kind concurrently and exit (non-interactive)
    #[arg(short, long, value_enum)]
    fire: Option<Kind>,

    /// Number of concurrent triggers sent by --fire
    #[arg(short = 'n', long, default_value_t = 1)]
    count: usize,

    /// Payload attached to each trigger sent by --fire
    #[arg(short, long, default_value = "")]
    payload: String,
}

#[derive(Subcommand)]
enum Command {
    /// Read or change stored settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print a setting
    Get { key: String },
    /// Store a setting
    Set { key: String, value: String },
    /// Remove a setting, restoring its default
    Unset { key: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let db_path = match &cli.db {
        Some(path) => path.clone(),
        None => {
            let path = default_db_path()?;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            path.to_string_lossy().into_owned()
        }
    };
    let config = Config::open(&db_path)?;

    if let Some(Command::Config { action }) = &cli.command {
        return handle_config(&config, action);
    }

    // Base initialization first; the startup hook refuses to run before it.
    let host = ProcessHost::new();
    host.initialize();

    let entry_point = match &cli.entry_point {
        Some(name) => EntryPointRef::new(name.clone()),
        None => config.entry_point()?,
    };
    let mut engine_config = config.engine_config()?;
    if let Some(secs) = cli.timeout {
        engine_config.dispatch_timeout = Duration::from_secs(secs);
    }

    let registry = Arc::new(EngineRegistry::new());
    let events = Arc::new(EventBus::default());
    tokio::spawn(log_events(events.subscribe()));

    let catalog = EntryPointCatalog::with_builtins();
    let bootstrapper = Bootstrapper::new(Arc::clone(&registry), &catalog, &entry_point)?
        .with_config(engine_config)
        .with_events(Arc::clone(&events));
    let outcome = bootstrapper
        .bootstrap(&host)
        .context("background engine startup failed")?;
    let engine = Arc::clone(outcome.handle());

    let handler = Arc::new(
        TriggerHandler::new(Arc::clone(&registry), bootstrapper.engine_id())?
            .with_events(Arc::clone(&events)),
    );

    // Fire mode: N concurrent triggers, then exit
    if let Some(kind) = cli.fire {
        let trigger = Trigger::new(kind.into(), cli.payload.clone());
        let tasks: Vec<_> = (0..cli.count.max(1))
            .map(|_| {
                let handler = Arc::clone(&handler);
                let trigger = trigger.clone();
                tokio::spawn(async move { handler.handle(&trigger).await })
            })
            .collect();

        for joined in futures::future::join_all(tasks).await {
            report(joined.context("trigger task panicked")?);
        }
        print_session_summary(engine.dispatch_count());
        return Ok(());
    }

    print_banner(&BannerInfo {
        engine_id: bootstrapper.engine_id(),
        instance: engine.instance(),
        entry_point: engine.entry_point(),
        outcome: if outcome.is_created() {
            "created"
        } else {
            "reused"
        },
        timeout_secs: engine.config().dispatch_timeout.as_secs(),
        settings: &db_path,
    });

    let commands = CommandRegistry::new();
    let info = SessionInfo {
        engine_id: bootstrapper.engine_id(),
        registry: &registry,
        bootstrapper: Some(&bootstrapper),
        db_path: &db_path,
    };

    // REPL: async stdin so Ctrl+C is caught at the prompt too
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        print!("\nmedtrack> ");
        io::stdout().flush()?;

        let line = tokio::select! {
            result = lines.next_line() => {
                match result {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        // Ctrl+D (EOF)
                        println!();
                        break;
                    }
                    Err(e) => {
                        eprintln!("input error: {}", e);
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match commands.dispatch(input, &info).await {
            CommandResult::Quit => break,
            CommandResult::Handled => continue,
            CommandResult::NotACommand => {}
        }

        let trigger = match Trigger::parse(input) {
            Ok(trigger) => trigger,
            Err(e) => {
                println!("  {e}");
                println!("  type /help for available commands");
                continue;
            }
        };

        // Ctrl+C during dispatch abandons the trigger, not the REPL
        tokio::select! {
            result = handler.handle(&trigger) => report(result),
            _ = tokio::signal::ctrl_c() => {
                println!("\n\ninterrupted");
            }
        }
    }

    print_session_summary(engine.dispatch_count());
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

async fn log_events(mut rx: broadcast::Receiver<Event>) {
    loop {
        match rx.recv().await {
            Ok(event) => debug!(?event, "engine event"),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "event listener lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn report(result: Result<Dispatch, TriggerError>) {
    match result {
        Ok(Dispatch::Completed { instance, output }) => println!("  [#{instance}] ✓ {output}"),
        Ok(Dispatch::Unavailable) => println!("  ✗ no background engine cached"),
        Err(e) => println!("  ✗ {e}"),
    }
}

fn handle_config(config: &Config, action: &ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => match config.get(key)? {
            Some(value) => println!("{value}"),
            None => println!("(unset)"),
        },
        ConfigAction::Set { key, value } => {
            config.set(key, value)?;
            println!("✓ {key} = {value}");
        }
        ConfigAction::Unset { key } => {
            config.remove(key)?;
            println!("✓ {key} unset");
        }
    }
    Ok(())
}
