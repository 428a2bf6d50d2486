use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use rook_bot::application::broker::VariableBroker;
use rook_bot::application::dispatch::{Dispatcher, EventRegistry};
use rook_bot::application::services::ServerWorkers;
use rook_bot::domain::entities::{PrivilegeTier, ProtocolEvent, Sender, ServerId};
use rook_bot::domain::traits::{AdminCommand, ModuleInvoker};
use rook_bot::infrastructure::adapters::ConsoleSink;
use rook_bot::infrastructure::config::Config;
use rook_bot::infrastructure::modules::{ModuleFactory, ModuleManager, ModuleTable};

#[derive(Parser)]
#[command(name = "rook-bot")]
#[command(about = "Module-hosting core for a multi-server chat bot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot with a console adapter
    Run,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => {
            run_bot(cli.config).await;
        }
        Commands::Version => {
            println!("rook-bot v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::InitConfig => {
            init_config();
        }
    }
}

async fn run_bot(config_path: String) {
    let config = if std::path::Path::new(&config_path).exists() {
        Config::load(&config_path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config: {}, using defaults", e);
            Config::default()
        })
    } else {
        Config::default()
    };

    tracing::info!("Starting {}", config.bot.name);

    let registry = Arc::new(EventRegistry::new());
    let table = Arc::new(ModuleTable::new());

    // Publish per-server values modules may query.
    let broker = Arc::new(VariableBroker::new());
    for server in &config.servers {
        let id = ServerId(server.id);
        broker.set(id, "server-name", &server.name);
        for (key, value) in &server.vars {
            broker.set(id, key, value);
        }
    }

    let descriptors = config
        .modules
        .iter()
        .map(|m| (m.descriptor(), m.trusted))
        .collect();
    let (manager, admin_rx) = ModuleManager::new(
        ModuleFactory::with_builtins(),
        registry.clone(),
        table.clone(),
        broker,
        config.dispatch.handler_timeout(),
        descriptors,
    );
    tokio::spawn(manager.clone().serve_admin(admin_rx));

    let auto_load: Vec<String> = config
        .modules
        .iter()
        .filter(|m| m.auto_load)
        .map(|m| m.name.clone())
        .collect();
    manager.load_all(&auto_load).await;

    let dispatcher = Arc::new(Dispatcher::new(
        registry,
        table as Arc<dyn ModuleInvoker>,
        config.bot.prefix.clone(),
    ));
    let workers = ServerWorkers::new(
        dispatcher,
        Arc::new(ConsoleSink::new()),
        config.dispatch.queue_depth,
    );

    // The console stands in for the protocol layer: announce each server's
    // connect, then feed typed lines in as channel messages.
    for server in &config.servers {
        let event = ProtocolEvent::named(
            ServerId(server.id),
            Sender::new(&config.bot.name),
            "connect",
        );
        workers.ingest(event).await;
    }

    let operator = Sender::new("operator").with_tier(PrivilegeTier::Owner);
    let home_server = ServerId(config.servers.first().map(|s| s.id).unwrap_or(1));

    println!("{} console. Messages dispatch as channel text;", config.bot.name);
    println!("!status, !load <m>, !unload <m>, !reload <m>, /quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }
        if let Some(rest) = line.strip_prefix('!') {
            run_admin(&manager, rest, &operator).await;
            continue;
        }
        let event = ProtocolEvent::channel_message(home_server, operator.clone(), "#console", line);
        workers.ingest(event).await;
    }

    workers.shutdown().await;
    tracing::info!("Shutting down");
}

async fn run_admin(manager: &ModuleManager, input: &str, operator: &Sender) {
    let mut parts = input.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("status"), _) => {
            for status in manager.status().await {
                println!("  [{}] {} ({})", status.slot, status.name, status.state);
            }
        }
        (Some(op @ ("load" | "unload" | "reload")), Some(name)) => {
            let command = match op {
                "load" => AdminCommand::Load(name.to_string()),
                "unload" => AdminCommand::Unload(name.to_string()),
                _ => AdminCommand::Reload(name.to_string()),
            };
            match manager.execute_admin(&command, operator).await {
                Ok(summary) => println!("{}", summary),
                Err(e) => println!("Error: {}", e),
            }
        }
        _ => println!("Usage: !status | !load <module> | !unload <module> | !reload <module>"),
    }
}

fn init_config() {
    let path = "config.yaml";
    if std::path::Path::new(path).exists() {
        println!("{} already exists, not overwriting", path);
        return;
    }
    match std::fs::write(path, Config::default_yaml()) {
        Ok(()) => println!("Wrote default config to {}", path),
        Err(e) => eprintln!("Failed to write {}: {}", path, e),
    }
}
