mod config_commands;
mod console;

use std::{path::PathBuf, sync::Arc};

use {
    afk_auto_reply::{AutoResponder, CompletionClient, ReplyGenerator, StateStore, local_user},
    afk_config::AfkConfig,
    clap::{Parser, Subcommand},
    tracing::{debug, info},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use crate::{config_commands::ConfigFormat, console::ConsoleChannel};

#[derive(Parser)]
#[command(name = "afk", about = "afk: answers your direct messages while you're away")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery in ./ and ~/.config/afk/).
    #[arg(long, global = true, env = "AFK_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the responder against a console conversation (default).
    Run,
    /// Request a single completion and print the reply.
    Ask {
        #[arg(short, long)]
        message: String,
    },
    /// Print the effective configuration.
    Config {
        #[arg(long, value_enum, default_value_t)]
        format: ConfigFormat,
    },
}

/// Crates whose logs `debug_mode` raises to debug.
const DEBUG_MODE_TARGETS: &[&str] = &["afk", "afk_auto_reply", "afk_channels"];

fn init_telemetry(cli: &Cli, debug_mode: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut directives = cli.log_level.clone();
        if debug_mode {
            for target in DEBUG_MODE_TARGETS {
                directives.push_str(&format!(",{target}=debug"));
            }
        }
        EnvFilter::new(directives)
    });

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn load(cli: &Cli) -> anyhow::Result<(AfkConfig, Option<PathBuf>)> {
    match &cli.config {
        Some(path) => Ok((afk_config::load_config(path)?, Some(path.clone()))),
        None => Ok((afk_config::discover_and_load(), afk_config::find_config_file())),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let (config, source) = load(&cli)?;
    init_telemetry(&cli, config.responder.debug_mode);

    info!(version = env!("CARGO_PKG_VERSION"), "afk starting");
    debug!(config = ?config, "effective config");

    match cli.command {
        None | Some(Commands::Run) => {
            let channel = Arc::new(ConsoleChannel);
            let responder = AutoResponder::from_config(&config, Arc::<ConsoleChannel>::clone(&channel), channel)?;
            console::run(Arc::new(responder)).await
        },
        Some(Commands::Ask { message }) => {
            let channel = Arc::new(ConsoleChannel);
            let client = CompletionClient::new(
                config.endpoint.clone(),
                config.responder.clone(),
                Arc::new(StateStore::default()),
                channel,
            )?;
            let user = local_user(&config.user);
            let reply = client
                .generate_reply(
                    &message,
                    config.responder.uses_custom_key(),
                    user.display_name(),
                    console::CONSOLE_CHANNEL,
                )
                .await;
            println!("{reply}");
            Ok(())
        },
        Some(Commands::Config { format }) => {
            config_commands::show_config(&config, source.as_deref(), format)
        },
    }
}
