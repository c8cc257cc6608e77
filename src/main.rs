#[cfg(not(feature = "cli"))]
compile_error!("The `s7sim` binary requires the `cli` feature. Build with `--features cli`.");

use clap::Parser;
use std::fs::File;
use std::io::Write;
use std::process;

use s7sim::cli;
use s7sim::cli::app::{Cli, ColorMode, Commands};
use s7sim::SimError;

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.color {
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Auto => {} // colored auto-detects tty
    }

    let writer_result: Result<Box<dyn Write>, SimError> = match &cli.output {
        Some(path) => File::create(path)
            .map(|f| Box::new(f) as Box<dyn Write>)
            .map_err(|e| SimError::Io(format!("Cannot create {}: {}", path, e))),
        None => Ok(Box::new(std::io::stdout()) as Box<dyn Write>),
    };

    let mut writer = match writer_result {
        Ok(w) => w,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run {
            config,
            port,
            sync_interval_ms,
            script,
            duration,
        } => cli::run::execute(
            &cli::run::RunOptions {
                config,
                port,
                sync_interval_ms,
                script,
                duration_ms: duration,
            },
            &mut writer,
        ),

        Commands::Validate { config, json } => cli::validate::execute(
            &cli::validate::ValidateOptions { config, json },
            &mut writer,
        ),

        Commands::Fields { config, json } => cli::fields::execute(
            &cli::fields::FieldsOptions { config, json },
            &mut writer,
        ),

        Commands::Export { config } => {
            cli::export::execute(&cli::export::ExportOptions { config }, &mut writer)
        }

        Commands::CheckScript { script, json } => cli::check_script::execute(
            &cli::check_script::CheckScriptOptions { script, json },
            &mut writer,
        ),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
