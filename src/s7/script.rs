//! Script parser and threaded execution engine.
//!
//! Scripts automate DB variable operations with a line-oriented language:
//!
//! ```text
//! # Set motor to running
//! SET 1.MotorStatus = true
//! WAIT 1000
//! WAIT_UNTIL 1.Temperature > 50 TIMEOUT 5000
//! LOOP 3
//!     SET 1.Counter = 0
//!     WAIT 500
//! END_LOOP
//! ```
//!
//! Keywords are case-insensitive; blank lines and `#` comments are
//! ignored; `WAIT_UNTIL` operators are `== != > < >= <=`. Literals are
//! parsed against the target field's declared type.
//!
//! The parser links every `LOOP` to its `END_LOOP`, and the executor
//! runs an explicit iteration stack instead of recursing, so nested
//! loops run their bodies exactly `inner x outer` times. Execution
//! happens on a background thread with a cooperative cancel flag
//! observed at every suspension point.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::s7::simulator::Simulator;
use crate::s7::value::{CmpOp, Value};
use crate::SimError;

/// Slice size for interruptible sleeps and condition polling.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A parsed script statement with its source line number.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptCommand {
    pub line: usize,
    pub kind: CommandKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    Set {
        db_number: u32,
        name: String,
        literal: String,
    },
    Wait {
        ms: u64,
    },
    WaitUntil {
        db_number: u32,
        name: String,
        op: CmpOp,
        literal: String,
        timeout_ms: Option<u64>,
    },
    Loop {
        count: i64,
        /// Index of the matching `END_LOOP`, linked by the parser.
        end_index: usize,
    },
    EndLoop {
        /// Index of the matching `LOOP`.
        start_index: usize,
    },
}

/// Lifecycle of a script run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Loaded,
    Running,
    Completed,
    Stopped,
    Errored,
}

/// Subscriber for timestamped script log lines.
pub type LogCallback = Arc<dyn Fn(&str) + Send + Sync>;

fn parse_error(line: usize, reason: impl Into<String>) -> SimError {
    SimError::ScriptParse {
        line,
        reason: reason.into(),
    }
}

/// Parse `<db>.<name>` (digits, a dot, then an identifier).
fn parse_target(text: &str, line: usize) -> Result<(u32, String), SimError> {
    let (db, name) = text
        .split_once('.')
        .ok_or_else(|| parse_error(line, format!("expected <db>.<name>, got '{}'", text)))?;
    let db_number: u32 = db
        .trim()
        .parse()
        .map_err(|_| parse_error(line, format!("invalid DB number '{}'", db)))?;
    let name = name.trim();
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(parse_error(line, format!("invalid variable name '{}'", name)));
    }
    Ok((db_number, name.to_string()))
}

/// Find the earliest comparison operator in a condition (longest match
/// wins at equal positions, so `>=` is never read as `>`).
fn split_condition(rest: &str, line: usize) -> Result<(String, CmpOp, String), SimError> {
    const OPS: [&str; 6] = [">=", "<=", "==", "!=", ">", "<"];
    let mut best: Option<(usize, &str)> = None;
    for op in OPS {
        if let Some(pos) = rest.find(op) {
            if best.map_or(true, |(bpos, _)| pos < bpos) {
                best = Some((pos, op));
            }
        }
    }
    let (pos, op) = best
        .ok_or_else(|| parse_error(line, "expected a comparison operator"))?;
    let target = rest[..pos].trim().to_string();
    let literal = rest[pos + op.len()..].trim().to_string();
    if target.is_empty() || literal.is_empty() {
        return Err(parse_error(line, "malformed WAIT_UNTIL condition"));
    }
    Ok((target, CmpOp::parse(op).expect("ops table"), literal))
}

/// Split a trailing `TIMEOUT <ms>` clause off a condition literal.
/// A `TIMEOUT` whose argument does not parse stays part of the literal.
fn strip_timeout(literal: &str) -> (String, Option<u64>) {
    let upper = literal.to_uppercase();
    if let Some(pos) = upper.rfind("TIMEOUT") {
        let boundary_before = pos > 0 && upper.as_bytes()[pos - 1].is_ascii_whitespace();
        if boundary_before {
            if let Ok(ms) = literal[pos + "TIMEOUT".len()..].trim().parse::<u64>() {
                return (literal[..pos].trim().to_string(), Some(ms));
            }
        }
    }
    (literal.to_string(), None)
}

/// Parse a script into a command list.
///
/// Fails with [`SimError::ScriptParse`] on unknown commands, malformed
/// arguments, an orphan `END_LOOP`, or an unclosed `LOOP` (reported at
/// the `LOOP` line).
pub fn parse_script(text: &str) -> Result<Vec<ScriptCommand>, SimError> {
    let mut commands: Vec<ScriptCommand> = Vec::new();
    let mut loop_stack: Vec<usize> = Vec::new();

    for (line_idx, raw) in text.lines().enumerate() {
        let line = line_idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (keyword, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((k, r)) => (k.to_uppercase(), r.trim()),
            None => (trimmed.to_uppercase(), ""),
        };

        let kind = match keyword.as_str() {
            "SET" => {
                let (lhs, rhs) = rest
                    .split_once('=')
                    .ok_or_else(|| parse_error(line, "SET requires '='"))?;
                let (db_number, name) = parse_target(lhs.trim(), line)?;
                let literal = rhs.trim();
                if literal.is_empty() {
                    return Err(parse_error(line, "SET requires a value"));
                }
                CommandKind::Set {
                    db_number,
                    name,
                    literal: literal.to_string(),
                }
            }
            "WAIT" => {
                let ms = rest
                    .parse::<u64>()
                    .map_err(|_| parse_error(line, format!("invalid WAIT duration '{}'", rest)))?;
                CommandKind::Wait { ms }
            }
            "WAIT_UNTIL" => {
                let (target, op, literal) = split_condition(rest, line)?;
                let (db_number, name) = parse_target(&target, line)?;
                let (literal, timeout_ms) = strip_timeout(&literal);
                if literal.is_empty() {
                    return Err(parse_error(line, "malformed WAIT_UNTIL condition"));
                }
                CommandKind::WaitUntil {
                    db_number,
                    name,
                    op,
                    literal,
                    timeout_ms,
                }
            }
            "LOOP" => {
                let count = rest
                    .parse::<i64>()
                    .map_err(|_| parse_error(line, format!("invalid LOOP count '{}'", rest)))?;
                loop_stack.push(commands.len());
                CommandKind::Loop {
                    count,
                    end_index: 0, // linked below
                }
            }
            "END_LOOP" => {
                if !rest.is_empty() {
                    return Err(parse_error(
                        line,
                        format!("unexpected text after END_LOOP: '{}'", rest),
                    ));
                }
                let start_index = loop_stack
                    .pop()
                    .ok_or_else(|| parse_error(line, "END_LOOP without matching LOOP"))?;
                let end_index = commands.len();
                match &mut commands[start_index].kind {
                    CommandKind::Loop {
                        end_index: slot, ..
                    } => *slot = end_index,
                    _ => unreachable!("loop stack holds LOOP indices"),
                }
                CommandKind::EndLoop { start_index }
            }
            _ => return Err(parse_error(line, format!("unknown command: {}", trimmed))),
        };
        commands.push(ScriptCommand { line, kind });
    }

    if let Some(start_index) = loop_stack.pop() {
        return Err(parse_error(
            commands[start_index].line,
            "LOOP without matching END_LOOP",
        ));
    }
    Ok(commands)
}

enum Outcome {
    Completed,
    Stopped,
}

struct Executor<'a> {
    simulator: &'a Simulator,
    cancel: &'a AtomicBool,
    log: &'a dyn Fn(String),
}

impl Executor<'_> {
    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    fn run(&self, commands: &[ScriptCommand]) -> Result<Outcome, SimError> {
        // (LOOP index, total, current iteration)
        let mut loop_stack: Vec<(usize, i64, i64)> = Vec::new();
        let mut idx = 0;

        while idx < commands.len() {
            if self.cancelled() {
                return Ok(Outcome::Stopped);
            }
            let cmd = &commands[idx];
            match &cmd.kind {
                CommandKind::Set {
                    db_number,
                    name,
                    literal,
                } => {
                    self.execute_set(*db_number, name, literal)?;
                    idx += 1;
                }
                CommandKind::Wait { ms } => {
                    (self.log)(format!("WAIT {}ms", ms));
                    if !self.sleep_cancellable(Duration::from_millis(*ms)) {
                        return Ok(Outcome::Stopped);
                    }
                    idx += 1;
                }
                CommandKind::WaitUntil {
                    db_number,
                    name,
                    op,
                    literal,
                    timeout_ms,
                } => {
                    if !self.execute_wait_until(*db_number, name, *op, literal, *timeout_ms)? {
                        return Ok(Outcome::Stopped);
                    }
                    idx += 1;
                }
                CommandKind::Loop { count, end_index } => {
                    if *count <= 0 {
                        idx = *end_index + 1;
                        continue;
                    }
                    (self.log)(format!("LOOP {} iterations", count));
                    (self.log)(format!("  Iteration 1/{}", count));
                    loop_stack.push((idx, *count, 1));
                    idx += 1;
                }
                CommandKind::EndLoop { start_index } => {
                    let (start, total, iteration) =
                        loop_stack.last_mut().expect("parser links loops");
                    debug_assert_eq!(*start, *start_index);
                    if *iteration < *total {
                        *iteration += 1;
                        (self.log)(format!("  Iteration {}/{}", iteration, total));
                        idx = *start_index + 1;
                    } else {
                        loop_stack.pop();
                        idx += 1;
                    }
                }
            }
        }
        Ok(Outcome::Completed)
    }

    /// Write a field. A missing field is logged and skipped; a literal
    /// that does not fit the field type ends the run.
    fn execute_set(&self, db_number: u32, name: &str, literal: &str) -> Result<(), SimError> {
        let Some(field) = self.simulator.field(db_number, name) else {
            (self.log)(format!("ERROR: Variable {}.{} not found", db_number, name));
            return Ok(());
        };
        let value = Value::parse_literal(literal, &field.ty).map_err(|e| {
            SimError::ScriptRuntime(format!("SET {}.{}: {}", db_number, name, e))
        })?;
        self.simulator
            .write_value(db_number, field.offset, &field.ty, &value, field.bit);
        (self.log)(format!("SET {}.{} = {}", db_number, name, value));
        Ok(())
    }

    /// Poll a condition. Returns `Ok(false)` when cancelled. A timeout is
    /// not a failure: it is logged and execution continues.
    fn execute_wait_until(
        &self,
        db_number: u32,
        name: &str,
        op: CmpOp,
        literal: &str,
        timeout_ms: Option<u64>,
    ) -> Result<bool, SimError> {
        let Some(field) = self.simulator.field(db_number, name) else {
            (self.log)(format!("ERROR: Variable {}.{} not found", db_number, name));
            return Err(SimError::ScriptRuntime(format!(
                "WAIT_UNTIL {}.{}: variable not found",
                db_number, name
            )));
        };
        let expected = Value::parse_literal(literal, &field.ty).map_err(|e| {
            SimError::ScriptRuntime(format!("WAIT_UNTIL {}.{}: {}", db_number, name, e))
        })?;
        let timeout_note = timeout_ms
            .map(|t| format!(" (timeout: {}ms)", t))
            .unwrap_or_default();
        (self.log)(format!(
            "WAIT_UNTIL {}.{} {} {}{}",
            db_number,
            name,
            op.as_str(),
            expected,
            timeout_note
        ));

        let start = Instant::now();
        loop {
            if self.cancelled() {
                return Ok(false);
            }
            // an unreadable field simply does not match yet
            if let Ok(actual) =
                self.simulator
                    .read_value(db_number, field.offset, &field.ty, field.bit)
            {
                if actual.compare(op, &expected) {
                    (self.log)(format!(
                        "  Condition met: {} {} {}",
                        actual,
                        op.as_str(),
                        expected
                    ));
                    return Ok(true);
                }
                if let Some(timeout) = timeout_ms {
                    if start.elapsed() >= Duration::from_millis(timeout) {
                        (self.log)(format!(
                            "  TIMEOUT: condition not met after {}ms (current value: {})",
                            timeout, actual
                        ));
                        return Ok(true);
                    }
                }
            } else if let Some(timeout) = timeout_ms {
                if start.elapsed() >= Duration::from_millis(timeout) {
                    (self.log)(format!(
                        "  TIMEOUT: condition not met after {}ms",
                        timeout
                    ));
                    return Ok(true);
                }
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Sleep in poll-interval slices, checking the cancel flag between
    /// slices. Returns false when cancelled.
    fn sleep_cancellable(&self, total: Duration) -> bool {
        let mut remaining = total;
        while !remaining.is_zero() {
            if self.cancelled() {
                return false;
            }
            let slice = remaining.min(POLL_INTERVAL);
            thread::sleep(slice);
            remaining -= slice;
        }
        !self.cancelled()
    }
}

/// Parses scripts and executes them on a background thread.
pub struct ScriptEngine {
    simulator: Arc<Simulator>,
    commands: Arc<Vec<ScriptCommand>>,
    state: Arc<Mutex<RunState>>,
    cancel: Arc<AtomicBool>,
    log_callback: Option<LogCallback>,
    handle: Option<JoinHandle<()>>,
    script_path: Option<String>,
}

impl ScriptEngine {
    pub fn new(simulator: Arc<Simulator>) -> ScriptEngine {
        ScriptEngine {
            simulator,
            commands: Arc::new(Vec::new()),
            state: Arc::new(Mutex::new(RunState::Idle)),
            cancel: Arc::new(AtomicBool::new(false)),
            log_callback: None,
            handle: None,
            script_path: None,
        }
    }

    /// Subscribe to timestamped script log lines (for a front end).
    pub fn set_log_callback(&mut self, callback: LogCallback) {
        self.log_callback = Some(callback);
    }

    /// Parse and load a script from text. Returns the command count.
    /// On a parse error the previously loaded script is kept.
    pub fn load_str(&mut self, text: &str) -> Result<usize, SimError> {
        let commands = parse_script(text)?;
        let count = commands.len();
        self.commands = Arc::new(commands);
        *self.state.lock().expect("state lock") = RunState::Loaded;
        self.emit(format!("Script loaded ({} commands)", count));
        Ok(count)
    }

    /// Parse and load a script file.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<usize, SimError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| SimError::Io(format!("cannot read {}: {}", path.display(), e)))?;
        let count = self.load_str(&text)?;
        self.script_path = Some(path.display().to_string());
        Ok(count)
    }

    /// Path of the last loaded script file, if any.
    pub fn script_path(&self) -> Option<&str> {
        self.script_path.as_deref()
    }

    /// Start execution on a background thread.
    ///
    /// Rejected while a run is in progress or when no script is loaded.
    pub fn start(&mut self) -> Result<(), SimError> {
        {
            let mut state = self.state.lock().expect("state lock");
            if *state == RunState::Running {
                return Err(SimError::ScriptRuntime(
                    "script is already running".to_string(),
                ));
            }
            if self.commands.is_empty() {
                return Err(SimError::ScriptRuntime("no script loaded".to_string()));
            }
            *state = RunState::Running;
        }
        self.cancel.store(false, Ordering::SeqCst);
        // detach any previous, already-finished run thread
        drop(self.handle.take());

        let simulator = Arc::clone(&self.simulator);
        let commands = Arc::clone(&self.commands);
        let state = Arc::clone(&self.state);
        let cancel = Arc::clone(&self.cancel);
        let callback = self.log_callback.clone();

        let handle = thread::Builder::new()
            .name("s7sim-script".to_string())
            .spawn(move || {
                let log = |message: String| emit_line(callback.as_ref(), &message);
                log("Script execution started".to_string());
                let executor = Executor {
                    simulator: &simulator,
                    cancel: &cancel,
                    log: &log,
                };
                let final_state = match executor.run(&commands) {
                    Ok(Outcome::Completed) => {
                        log("Script execution completed".to_string());
                        RunState::Completed
                    }
                    Ok(Outcome::Stopped) => {
                        log("Script execution stopped by user".to_string());
                        RunState::Stopped
                    }
                    Err(e) => {
                        log(format!("Script execution error: {}", e));
                        RunState::Errored
                    }
                };
                *state.lock().expect("state lock") = final_state;
            })
            .expect("spawn script thread");
        self.handle = Some(handle);
        Ok(())
    }

    /// Request a cooperative stop. Returns immediately; the run thread
    /// exits at its next suspension point.
    pub fn stop(&self) {
        if self.is_running() {
            self.emit("Stopping script...".to_string());
            self.cancel.store(true, Ordering::SeqCst);
        }
    }

    pub fn state(&self) -> RunState {
        *self.state.lock().expect("state lock")
    }

    pub fn is_running(&self) -> bool {
        self.state() == RunState::Running
    }

    fn emit(&self, message: String) {
        emit_line(self.log_callback.as_ref(), &message);
    }
}

fn emit_line(callback: Option<&LogCallback>, message: &str) {
    let stamped = format!(
        "[{}] {}",
        chrono::Local::now().format("%H:%M:%S%.3f"),
        message
    );
    tracing::info!("{}", message);
    if let Some(cb) = callback {
        cb(&stamped);
    }
}
