//! Flextape entry point.
//!
//! ## Subcommands
//!
//! - `flextape` or `flextape serve` - Run the engine with its sweeper
//! - `flextape config show` - Print the effective configuration as JSON
//! - `flextape config validate` - Check configuration (exit 0/2)

use std::process::ExitCode;

use flextape::config as flextape_config;
use flextape::telemetry::{init_logging, LogConfig};
use flextape::{Service, ServiceConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("serve");

    match command {
        "serve" | "" => {
            let env = match flextape_config::load() {
                Ok(env) => env,
                Err(e) => {
                    eprintln!("Configuration error: {}", e);
                    return ExitCode::from(2u8);
                }
            };
            if let Err(e) = init_logging(&LogConfig::from_env()) {
                eprintln!("Logging setup failed: {}", e);
                return ExitCode::FAILURE;
            }
            match serve(env.into()).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("Server error: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
        "config" => {
            let subcommand = args.get(2).map(|s| s.as_str()).unwrap_or("show");
            run_config(subcommand)
        }
        "help" | "--help" | "-h" => {
            print_usage();
            ExitCode::SUCCESS
        }
        "version" | "--version" | "-V" => {
            println!("flextape {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            ExitCode::FAILURE
        }
    }
}

fn print_usage() {
    eprintln!(
        "flextape {} - license arbitration engine

USAGE:
    flextape [COMMAND]

COMMANDS:
    serve            Run the engine and expiry sweeper (default)
    config show      Print effective configuration as JSON
    config validate  Validate configuration (exit 0 if valid, 2 if not)
    version          Show version information
    help             Show this help message

ENVIRONMENT:
    FLEXTAPE_LICENSE_FILE       TOML table of license capacities
    FLEXTAPE_DEFAULT_CAPACITY   Capacity for license types not in the table
    FLEXTAPE_CHECKIN_INTERVAL   Expected client check-in period (secs)
    FLEXTAPE_EXPIRY_MULTIPLIER  Missed check-ins before expiry
    FLEXTAPE_SWEEP_INTERVAL     Expiry sweep period (secs)
    FLEXTAPE_STATS_INTERVAL     Usage gauge export period (secs)
    FLEXTAPE_REAP_EMPTY         Drop idle ledgers during sweeps
    FLEXTAPE_LOG                Log filter (default: info)
    FLEXTAPE_LOG_FORMAT         json or pretty
    FLEXTAPE_LOG_FILE           Write logs to a file instead of stderr

EXIT CODES:
    0  Success
    1  Failure
    2  Configuration error",
        env!("CARGO_PKG_VERSION")
    );
}

fn run_config(subcommand: &str) -> ExitCode {
    let env = match flextape_config::load() {
        Ok(env) => env,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::from(2u8);
        }
    };
    match subcommand {
        "show" => match serde_json::to_string_pretty(&env.effective_config()) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Failed to render configuration: {}", e);
                ExitCode::FAILURE
            }
        },
        "validate" => {
            if env.registry.capacities.is_empty() && env.registry.default_capacity.is_none() {
                eprintln!("No licenses configured: set FLEXTAPE_LICENSE_FILE or FLEXTAPE_DEFAULT_CAPACITY");
                return ExitCode::from(2u8);
            }
            println!("Configuration valid");
            ExitCode::SUCCESS
        }
        _ => {
            eprintln!("Unknown config subcommand: {}", subcommand);
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: ServiceConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        licenses = config.registry.capacities.len(),
        default_capacity = ?config.registry.default_capacity,
        expiry_window_secs = config.sweeper.expiry_window().as_secs(),
        "flextape starting"
    );
    let service = Service::start(config);

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    service.shutdown().await;
    Ok(())
}
