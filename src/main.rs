use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use gate_bot::application::errors::BotError;
use gate_bot::application::messaging::{CommandDispatcher, CommandParser};
use gate_bot::application::services::{CommandService, SessionOutcome, SessionSupervisor};
use gate_bot::domain::traits::Connector;
use gate_bot::infrastructure::adapters::{BridgeConnector, BridgeSettings, ConsoleConnector};
use gate_bot::infrastructure::config::{AdapterKind, Config};
use gate_bot::infrastructure::pairing::TerminalQr;
use gate_bot::infrastructure::process::ProcessScriptRunner;
use gate_bot::infrastructure::storage::FileCredentialStore;

#[derive(Parser)]
#[command(name = "gate-bot")]
#[command(about = "Relays /gate and /repair chat commands to local scripts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml", global = true)]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot
    Run {
        /// Transport to use (overrides config)
        #[arg(long, value_enum)]
        adapter: Option<AdapterKind>,
    },
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
    /// Show which command a message text maps to, without running it
    Parse {
        text: String,
    },
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { adapter } => run_bot(&cli.config, adapter),
        Commands::Version => {
            println!("gate-bot v{}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        Commands::InitConfig => init_config(),
        Commands::Parse { text } => parse_text(&cli.config, &text),
    }
}

fn run_bot(config_path: &str, adapter: Option<AdapterKind>) -> ExitCode {
    let mut config = match Config::resolve(config_path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(adapter) = adapter {
        config.session.adapter = adapter;
        if let Err(e) = config.validate() {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };
    rt.block_on(serve(config))
}

async fn serve(config: Config) -> ExitCode {
    let supervisor = match build_supervisor(&config) {
        Ok(supervisor) => supervisor,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    tracing::info!("Starting {} ({:?} adapter)", config.bot.name, config.session.adapter);

    let mut states = supervisor.subscribe();
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = states.borrow_and_update().clone();
            tracing::debug!(?state, "Session state changed");
        }
    });

    tokio::select! {
        outcome = supervisor.run() => match outcome {
            SessionOutcome::LoggedOut => {
                tracing::info!("Logged out, not reconnecting. Remove {} and restart to pair again.", config.session.auth_dir.display());
                ExitCode::SUCCESS
            }
            SessionOutcome::GaveUp { attempts } => {
                tracing::error!("Could not reconnect after {} attempts", attempts);
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, shutting down");
            ExitCode::SUCCESS
        }
    }
}

fn build_supervisor(config: &Config) -> Result<SessionSupervisor, BotError> {
    let scripts = config.script_settings()?;
    tracing::info!("Scripts run from {}", scripts.project_root.display());

    let runner = Arc::new(ProcessScriptRunner::new().with_timeout(config.script_timeout()));
    let commands = CommandService::new(runner, scripts);
    let parser = CommandParser::new(config.scripts.default_submission.as_str());
    let dispatcher = Arc::new(CommandDispatcher::new(parser, commands, config.dispatch_settings()));

    let store = Arc::new(FileCredentialStore::new(&config.session.auth_dir));

    let connector: Arc<dyn Connector> = match config.session.adapter {
        AdapterKind::Bridge => Arc::new(BridgeConnector::new(BridgeSettings {
            command: config.bridge.command.clone(),
            args: config.bridge.args.clone(),
            working_dir: config.bridge.working_dir.clone(),
            auth_dir: config.session.auth_dir.clone(),
        })),
        AdapterKind::Console => Arc::new(ConsoleConnector::new()),
    };

    Ok(SessionSupervisor::new(
        connector,
        store,
        dispatcher,
        Arc::new(TerminalQr),
        config.reconnect_policy(),
    ))
}

fn parse_text(config_path: &str, text: &str) -> ExitCode {
    let config = Config::resolve(config_path).unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}, using defaults", e);
        Config::default()
    });
    let parser = CommandParser::new(config.scripts.default_submission.as_str());
    let command = parser.parse(text);
    println!("normalized: {}", CommandParser::normalize(text));
    println!("command:    {}", command);

    if let Ok(scripts) = config.script_settings() {
        let commands = CommandService::new(Arc::new(ProcessScriptRunner::new()), scripts);
        if let Some(invocation) = commands.invocation(&command) {
            println!("would run:  {} (in {})", invocation, invocation.working_dir.display());
        }
    }
    ExitCode::SUCCESS
}

fn init_config() -> ExitCode {
    match Config::default().to_yaml() {
        Ok(yaml) => {
            println!("{}", yaml);
            println!("\nSave this to config.yaml and adjust as needed.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
