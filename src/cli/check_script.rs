//! CLI implementation for the `s7sim check-script` subcommand.
//!
//! Parses a script file without executing it and prints either the
//! command summary or the parse error with its line number.

use std::fs;
use std::io::Write;

use colored::Colorize;
use serde::Serialize;

use crate::cli::wprintln;
use crate::s7::script::{parse_script, CommandKind};
use crate::SimError;

/// Options for the `s7sim check-script` subcommand.
pub struct CheckScriptOptions {
    /// Path to the script file.
    pub script: String,
    /// Emit output as JSON.
    pub json: bool,
}

#[derive(Serialize)]
struct ScriptReport {
    file: String,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    commands: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

fn describe(kind: &CommandKind) -> String {
    match kind {
        CommandKind::Set {
            db_number,
            name,
            literal,
        } => format!("SET {}.{} = {}", db_number, name, literal),
        CommandKind::Wait { ms } => format!("WAIT {}", ms),
        CommandKind::WaitUntil {
            db_number,
            name,
            op,
            literal,
            timeout_ms,
        } => {
            let timeout = timeout_ms
                .map(|t| format!(" TIMEOUT {}", t))
                .unwrap_or_default();
            format!(
                "WAIT_UNTIL {}.{} {} {}{}",
                db_number,
                name,
                op.as_str(),
                literal,
                timeout
            )
        }
        CommandKind::Loop { count, .. } => format!("LOOP {}", count),
        CommandKind::EndLoop { .. } => "END_LOOP".to_string(),
    }
}

/// Execute the check-script subcommand.
pub fn execute(opts: &CheckScriptOptions, writer: &mut dyn Write) -> Result<(), SimError> {
    let text = fs::read_to_string(&opts.script)
        .map_err(|e| SimError::Io(format!("cannot read {}: {}", opts.script, e)))?;

    // the parser only ever fails with ScriptParse
    let verdict = match parse_script(&text) {
        Ok(commands) => Ok(commands),
        Err(SimError::ScriptParse { line, reason }) => Err((line, reason)),
        Err(e) => return Err(e),
    };

    let report = match &verdict {
        Ok(commands) => ScriptReport {
            file: opts.script.clone(),
            valid: true,
            commands: Some(commands.len()),
            line: None,
            reason: None,
        },
        Err((line, reason)) => ScriptReport {
            file: opts.script.clone(),
            valid: false,
            commands: None,
            line: Some(*line),
            reason: Some(reason.clone()),
        },
    };

    if opts.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| SimError::Io(format!("JSON serialization error: {}", e)))?;
        wprintln!(writer, "{}", json)?;
        return Ok(());
    }

    match &verdict {
        Ok(commands) => {
            wprintln!(
                writer,
                "{}: {} ({} commands)",
                opts.script,
                "OK".green().bold(),
                commands.len()
            )?;
            for cmd in commands {
                wprintln!(writer, "  {:>4}  {}", cmd.line, describe(&cmd.kind))?;
            }
        }
        Err((line, reason)) => {
            wprintln!(writer, "{}: {}", opts.script, "INVALID".red().bold())?;
            wprintln!(writer, "  line {}: {}", line, reason)?;
        }
    }
    Ok(())
}
