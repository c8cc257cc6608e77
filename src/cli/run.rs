//! CLI implementation for the `s7sim run` subcommand.
//!
//! Brings the simulator up from a YAML configuration over the in-process
//! loopback backend, optionally loads and starts a script, and runs
//! until Ctrl+C (or `--duration`). Script log lines stream to stdout as
//! they happen.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use colored::Colorize;

use crate::cli::wprintln;
use crate::s7::config::Config;
use crate::s7::script::{RunState, ScriptEngine};
use crate::s7::server::LoopbackServer;
use crate::s7::simulator::{Simulator, SimulatorOptions};
use crate::s7::store::DbMemory;
use crate::SimError;

/// Options for the `s7sim run` subcommand.
pub struct RunOptions {
    /// Path to the YAML configuration file.
    pub config: String,
    /// TCP port handed to the server backend.
    pub port: u16,
    /// Synchronizer period in milliseconds.
    pub sync_interval_ms: u64,
    /// Optional script file to execute.
    pub script: Option<String>,
    /// Stop automatically after this many milliseconds.
    pub duration_ms: Option<u64>,
}

/// Execute the run subcommand.
pub fn execute(opts: &RunOptions, writer: &mut dyn Write) -> Result<(), SimError> {
    let config = Config::load(&opts.config)?;

    wprintln!(writer, "{}", "S7 PLC simulator".cyan().bold())?;
    for db in &config.dbs {
        wprintln!(
            writer,
            "  DB {} ({} fields, {} bytes)",
            db.db_number,
            db.fields.len(),
            DbMemory::size_of(&db.fields)
        )?;
    }

    let sim = Simulator::start(
        config,
        Box::new(LoopbackServer::new()),
        SimulatorOptions {
            tcp_port: opts.port,
            sync_interval: Duration::from_millis(opts.sync_interval_ms),
        },
    )?;
    wprintln!(
        writer,
        "Serving on port {} (sync every {} ms)",
        opts.port,
        opts.sync_interval_ms
    )?;

    let mut engine = None;
    if let Some(path) = &opts.script {
        let mut e = ScriptEngine::new(Arc::clone(&sim));
        e.set_log_callback(Arc::new(|line| println!("{}", line)));
        let count = e.load_file(path)?;
        wprintln!(writer, "Script {} loaded ({} commands)", path, count)?;
        e.start()?;
        engine = Some(e);
    }

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    if let Err(e) = ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst)) {
        tracing::warn!(error = %e, "cannot install Ctrl+C handler");
    }
    if opts.duration_ms.is_none() {
        wprintln!(writer, "Press Ctrl+C to stop")?;
    }

    let started = Instant::now();
    while running.load(Ordering::SeqCst) {
        if let Some(duration) = opts.duration_ms {
            if started.elapsed() >= Duration::from_millis(duration) {
                break;
            }
        }
        thread::sleep(Duration::from_millis(100));
    }

    if let Some(engine) = &engine {
        engine.stop();
        let deadline = Instant::now() + Duration::from_millis(500);
        while engine.is_running() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
        }
        let verdict = match engine.state() {
            RunState::Completed => "completed",
            RunState::Stopped => "stopped",
            RunState::Errored => "errored",
            _ => "still running",
        };
        wprintln!(writer, "Script {}", verdict)?;
    }

    sim.stop();
    wprintln!(writer, "Simulator stopped")?;
    Ok(())
}
