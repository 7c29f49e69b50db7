//! kvpool - inspect and exercise named Redis connection pools

mod commands;
mod config;
mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use kvpool_connection::Registry;
use kvpool_driver_redis::RedisConnector;

use crate::logging::{LogFormat, LoggingConfig};

#[derive(Parser, Debug)]
#[command(name = "kvpool", version, about = "Named Redis connection pools")]
struct Cli {
    /// Configuration file (TOML); defaults to the platform config directory
    #[arg(short, long, env = "KVPOOL_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Console log format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    log_format: LogFormat,

    /// Also write JSON logs to the default log directory
    #[arg(long, global = true)]
    log_to_file: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print results as JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List configured sources
    Sources,
    /// Borrow a connection from each source and send PING
    Ping {
        /// Sources to ping; all when omitted
        names: Vec<String>,
    },
    /// Run a single command on a source
    Exec {
        /// Source name
        source: String,
        /// Command name, e.g. GET
        command: String,
        /// Command arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Show pool statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut log_config = if cli.verbose {
        LoggingConfig::verbose()
    } else {
        LoggingConfig::default()
    }
    .with_format(cli.log_format);
    if cli.log_to_file {
        log_config = log_config.with_log_dir(logging::log_directory());
    }
    let _log_guard = logging::init(&log_config)?;

    let settings = config::load(cli.config.as_deref())?;
    let registry = Registry::initialize(&settings, Arc::new(RedisConnector::new()))
        .context("failed to initialize connection registry")?;

    let result = run(&cli, &registry).await;
    registry.shutdown();
    result
}

async fn run(cli: &Cli, registry: &Registry) -> anyhow::Result<()> {
    match &cli.command {
        Command::Sources => {
            if cli.json {
                let sources: Vec<_> = registry
                    .source_names()
                    .into_iter()
                    .filter_map(|name| registry.source(name).ok())
                    .map(|source| {
                        let config = source.config();
                        serde_json::json!({
                            "name": config.name(),
                            "endpoint": config.endpoint().to_string(),
                            "authenticated": config.password().is_some(),
                            "pool": config.pool(),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&sources)?);
            } else {
                println!("{}", commands::sources_table(registry));
            }
            Ok(())
        }
        Command::Ping { names } => {
            let outcomes = commands::ping(registry, names).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&outcomes)?);
            } else {
                println!("{}", commands::ping_table(&outcomes));
            }
            commands::check_outcomes(&outcomes)
        }
        Command::Exec {
            source,
            command,
            args,
        } => {
            let reply = commands::exec(registry, source, command, args).await?;
            if cli.json {
                println!("{}", serde_json::to_string(&reply.to_string())?);
            } else {
                println!("{}", reply);
            }
            Ok(())
        }
        Command::Stats => {
            if cli.json {
                let stats: serde_json::Map<String, serde_json::Value> = registry
                    .all_stats()
                    .into_iter()
                    .map(|(name, stats)| serde_json::to_value(stats).map(|value| (name, value)))
                    .collect::<Result<_, serde_json::Error>>()?;
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("{}", commands::stats_table(registry));
            }
            Ok(())
        }
    }
}
