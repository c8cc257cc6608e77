use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "s7sim")]
#[command(about = "Siemens S7 PLC simulator")]
#[command(version)]
pub struct Cli {
    /// Control colored output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Write output to a file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<String>,

    /// Show debug-level diagnostics
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the simulator from a YAML configuration
    Run {
        /// Path to the YAML configuration file
        #[arg(short, long)]
        config: String,

        /// TCP port handed to the server backend
        #[arg(short, long, default_value = "102")]
        port: u16,

        /// Synchronizer period in milliseconds (clamped to 10..5000)
        #[arg(long = "sync-interval", default_value = "20")]
        sync_interval_ms: u64,

        /// Script file to execute against the running simulator
        #[arg(short, long)]
        script: Option<String>,

        /// Stop automatically after this many milliseconds
        /// (default: run until Ctrl+C)
        #[arg(long)]
        duration: Option<u64>,
    },

    /// Validate a configuration file and report the first violation
    Validate {
        /// Path to the YAML configuration file
        #[arg(short, long)]
        config: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List DBs and fields with computed buffer sizes
    Fields {
        /// Path to the YAML configuration file
        #[arg(short, long)]
        config: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Export the field layout as flat CSV
    Export {
        /// Path to the YAML configuration file
        #[arg(short, long)]
        config: String,
    },

    /// Parse a script file and summarize its commands
    CheckScript {
        /// Path to the script file
        #[arg(short, long)]
        script: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}
