use std::sync::mpsc::RecvTimeoutError;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::RunConfig;
use crate::error::RunError;
use crate::instrument::{parse_tag, GeneratedProgram};

use super::fuser::fuse;
use super::session::{InterpreterSession, StreamEvent};
use super::stderr::{classify_stderr, StderrReport};
use super::stream::ChunkDemuxer;
use super::{CancellationHandle, LineResult};

/// Terminal states of one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Completed,
    TimedOut,
    Cancelled,
    Crashed,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub state: RunState,
    pub results: Vec<LineResult>,
}

/// Spawn the interpreter on the generated program and collect per-line
/// results. Failure to spawn is the only error that aborts the pipeline;
/// everything else (target crashes, guard violations, timeout) is folded
/// into the result list.
pub fn run_to_completion(
    gen: &GeneratedProgram,
    config: &RunConfig,
    cancel: &CancellationHandle,
) -> Result<RunOutcome, RunError> {
    let argv = config.interpreter_argv();
    let mut session =
        InterpreterSession::spawn(&argv, &gen.program).map_err(|source| RunError::Spawn {
            command: argv.join(" "),
            source,
        })?;

    let deadline = Instant::now() + Duration::from_millis(config.timeout_ms);
    let mut demux = ChunkDemuxer::new();
    let mut stderr_buf = String::new();
    let mut eofs = 0u8;
    let mut state = RunState::Completed;

    loop {
        if cancel.is_cancelled() {
            state = RunState::Cancelled;
            session.kill();
            break;
        }
        let now = Instant::now();
        if now >= deadline {
            state = RunState::TimedOut;
            session.kill();
            break;
        }
        let wait = (deadline - now).min(Duration::from_millis(100));
        match session.recv_timeout(wait) {
            Ok(StreamEvent::Stdout(data)) => demux.push(&data),
            Ok(StreamEvent::Stderr(data)) => stderr_buf.push_str(&data),
            Ok(StreamEvent::Eof) => {
                eofs += 1;
                if eofs >= 2 {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    // one finalization path for exit, timeout and cancellation
    let status = session.wait().ok();
    debug!(?state, exit = ?status, "run finalized");

    if state == RunState::Cancelled {
        // a cancelled run never commits results
        return Ok(RunOutcome {
            state,
            results: Vec::new(),
        });
    }

    let chunks = demux.finish();
    let mut results = fuse(&chunks);

    match classify_stderr(&stderr_buf) {
        StderrReport::Guard { line, message } => {
            upsert_error(&mut results, line, &message);
            backfill_below(&mut results, line);
        }
        StderrReport::Runtime { gen_line, message } => {
            let (line, message) = match resolve_error_line(gen, gen_line) {
                Some(line) => (line, message),
                None => (0, format!("internal error: {message}")),
            };
            upsert_error(&mut results, line, &message);
            backfill_below(&mut results, line);
            if state == RunState::Completed {
                state = RunState::Crashed;
            }
        }
        StderrReport::Quiet => {}
    }

    if state == RunState::TimedOut {
        let past_last = chunks
            .iter()
            .filter_map(|c| parse_tag(c).map(|(t, _)| t))
            .max()
            .map(|t| t + 1)
            .unwrap_or(0);
        upsert_error(
            &mut results,
            past_last,
            &format!("timed out after {} ms", config.timeout_ms),
        );
    }

    results.sort_by_key(|r| r.line);
    Ok(RunOutcome { state, results })
}

/// Map a 1-based generated-program line back to an original line: the
/// pre-run map first, then a backward scan for the nearest preceding probe.
fn resolve_error_line(gen: &GeneratedProgram, gen_line: Option<usize>) -> Option<usize> {
    let gen_index = gen_line?.checked_sub(1)?;
    if let Some(orig) = gen.line_map.get(gen_index) {
        return Some(orig);
    }
    let lines: Vec<&str> = gen.program.lines().collect();
    let start = gen_index.min(lines.len().saturating_sub(1));
    for i in (0..=start).rev() {
        if let Some(orig) = crate::instrument::probe_target(lines[i]) {
            return Some(orig);
        }
    }
    None
}

/// Merge an error message into the entry for `line`, creating it if
/// needed. Existing observed values are kept, concatenated ahead of the
/// message.
fn upsert_error(results: &mut Vec<LineResult>, line: usize, message: &str) {
    if let Some(entry) = results.iter_mut().find(|r| r.line == line) {
        if entry.value.is_empty() {
            entry.value = message.to_string();
        } else {
            entry.value = format!("{} {}", entry.value, message);
        }
        entry.is_error = true;
    } else {
        results.push(LineResult {
            line,
            value: message.to_string(),
            is_error: true,
        });
    }
}

/// Ensure every index below an error line has an entry, inserting empty
/// placeholders, so the final array has no gaps under the error.
fn backfill_below(results: &mut Vec<LineResult>, error_line: usize) {
    for line in 0..error_line {
        if !results.iter().any(|r| r.line == line) {
            results.push(LineResult {
                line,
                value: String::new(),
                is_error: false,
            });
        }
    }
}
