//! Command-line interface for dbtuner: database maintenance operations.
//!
//! This file implements the CLI entry point, which parses the command line, sets up logging and
//! dispatches to the registered sub-commands.
//!
//! ### Example
//!
//! ```sh
//! dbtuner -c dev archive -st firds -tt firds_backup --date_condition 20201130
//! ```
use dbtuner::cli::{self, GlobalArgs};
use dbtuner::commands;
use dbtuner::config::EnvironmentRegistry;
use dbtuner::connection::IntegratedCredential;
use dbtuner::store::MssqlConnector;
use std::process;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let registry = match EnvironmentRegistry::builtin() {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Invalid built-in environment configuration: {}", e);
            process::exit(1);
        }
    };
    let commands = commands::registry();
    let invocation = match cli::parse_from(&commands, &registry, std::env::args_os()) {
        Ok(invocation) => invocation,
        Err(e) => e.exit(),
    };

    if let Err(e) = init_tracing(&invocation.global) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    if let Err(e) = run_cli(&commands, &registry, &invocation).await {
        tracing::error!("Error: {}", e);
        process::exit(1);
    }
}

fn init_tracing(global: &GlobalArgs) -> anyhow::Result<()> {
    let level = match global.log_level.to_lowercase().as_str() {
        "error" => tracing::Level::ERROR,
        "warn" => tracing::Level::WARN,
        "info" => tracing::Level::INFO,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        other => {
            eprintln!("Unknown log level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    };

    let writer: Box<dyn Fn() -> Box<dyn std::io::Write + Send> + Send + Sync> =
        if global.log_dest == "stderr" {
            Box::new(|| Box::new(std::io::stderr()))
        } else {
            let file = std::fs::File::create(&global.log_dest).map_err(|e| {
                anyhow::anyhow!("cannot create log file '{}': {}", global.log_dest, e)
            })?;
            Box::new(move || match file.try_clone() {
                Ok(file) => Box::new(file) as Box<dyn std::io::Write + Send>,
                Err(_) => Box::new(std::io::stderr()),
            })
        };

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(writer)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Run the selected sub-command.
///
/// Sessions are opened with the SQL Server connector and integrated authentication.
/// Operator-facing text goes to stdout; logs go to the configured log destination.
async fn run_cli(
    commands: &[Box<dyn dbtuner::SubCommand>],
    registry: &EnvironmentRegistry,
    invocation: &cli::Invocation,
) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout();

    cli::dispatch(
        commands,
        invocation,
        registry,
        &MssqlConnector,
        &IntegratedCredential,
        &mut stdout,
    )
    .await?;
    Ok(())
}
