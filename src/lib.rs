//! Siemens S7 PLC simulator.
//!
//! The `s7sim-utils` crate (library name `s7sim`) simulates an S7 PLC on the
//! host: numbered Data Blocks (DBs) hold typed fields at explicit byte
//! offsets inside contiguous byte buffers, a pluggable server backend
//! publishes those buffers to S7 clients, and a small line-oriented script
//! language drives field values to exercise client logic.
//!
//! # CLI Reference
//!
//! The `s7sim` binary wraps the library behind a handful of subcommands.
//!
//! | Command | Purpose |
//! |---------|---------|
//! | [`s7sim run`](cli::app::Commands::Run) | Start the simulator from a YAML config, optionally drive it with a script |
//! | [`s7sim validate`](cli::app::Commands::Validate) | Check a configuration file and report the first violation |
//! | [`s7sim fields`](cli::app::Commands::Fields) | List DBs and fields with computed buffer sizes |
//! | [`s7sim export`](cli::app::Commands::Export) | Export the field layout as flat CSV |
//! | [`s7sim check-script`](cli::app::Commands::CheckScript) | Parse a script file and summarize its commands |
//!
//! All subcommands accept `--color <auto|always|never>` and `--output <file>`.
//! Most also accept `--json` for machine-readable output.
//!
//! # Library API
//!
//! ```no_run
//! use s7sim::s7::config::Config;
//! use s7sim::s7::server::LoopbackServer;
//! use s7sim::s7::simulator::{Simulator, SimulatorOptions};
//! use s7sim::s7::types::S7Type;
//! use s7sim::s7::value::Value;
//!
//! let config = Config::load("plc.yaml").unwrap();
//! let sim = Simulator::start(
//!     config,
//!     Box::new(LoopbackServer::new()),
//!     SimulatorOptions::default(),
//! )
//! .unwrap();
//!
//! sim.write_value(1, 4, &S7Type::Int, &Value::Int(-12345), None);
//! let speed = sim.read_value(1, 4, &S7Type::Int, None).unwrap();
//! assert_eq!(speed, Value::Int(-12345));
//! sim.stop();
//! ```
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`s7::types`] | The closed set of S7 type tags and their byte-size contract |
//! | [`s7::value`] | Runtime value domain, literal parsing, comparisons |
//! | [`s7::codec`] | Bit-exact pack/unpack for every supported type |
//! | [`s7::config`] | Configuration model and tree validator |
//! | [`s7::files`] | YAML load/save and CSV export |
//! | [`s7::store`] | Mutex-guarded DB byte buffers with typed access |
//! | [`s7::server`] | The injected server backend contract and loopback fake |
//! | [`s7::sync`] | Background synchronizer bridging internal/external buffers |
//! | [`s7::simulator`] | Simulator construction and lifecycle |
//! | [`s7::script`] | Script parser and threaded execution engine |
//!
//! ## Feature flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli` | on | Builds the `s7sim` binary (clap, colored, ctrlc, tracing-subscriber). |

#[cfg(feature = "cli")]
pub mod cli;
pub mod s7;

use thiserror::Error;

/// Errors returned by `s7sim` operations.
#[derive(Error, Debug)]
pub enum SimError {
    /// An I/O error occurred (file open, read, or write failure).
    #[error("I/O error: {0}")]
    Io(String),

    /// The configuration tree failed validation. `path` points at the
    /// offending node (e.g. `dbs[1].fields[0].value`).
    #[error("invalid config at {path}: {reason}")]
    InvalidConfig { path: String, reason: String },

    /// A value does not satisfy the textual or range constraints of the
    /// type it is being packed as.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// Fewer bytes than the type's fixed size were supplied to unpack.
    #[error("short buffer: need {needed} bytes, got {got}")]
    ShortBuffer { needed: usize, got: usize },

    /// A read or write would extend past the end of the DB buffer, or the
    /// DB number is not defined.
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// A script failed to parse; the script is not runnable.
    #[error("script parse error at line {line}: {reason}")]
    ScriptParse { line: usize, reason: String },

    /// A script referenced an unknown field at execution time.
    #[error("script runtime error: {0}")]
    ScriptRuntime(String),

    /// The server backend failed to start; simulator construction aborts.
    #[error("server start failed: {0}")]
    ServerStart(String),
}
