mod cancel;
mod collector;
mod fuser;
mod session;
mod stderr;
mod stream;

pub use cancel::CancellationHandle;
pub use collector::{run_to_completion, RunOutcome, RunState};
pub use fuser::fuse;
pub use session::{InterpreterSession, StreamEvent};
pub use stderr::{classify_stderr, StderrReport};
pub use stream::ChunkDemuxer;

use serde::{Deserialize, Serialize};

use crate::config::RunConfig;
use crate::error::RunError;
use crate::instrument::GeneratedProgram;

/// One observed value for one original line. `value` is single-line
/// renderable (embedded newlines are encoded as literal `\n`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineResult {
    pub line: usize,
    pub value: String,
    pub is_error: bool,
}

/// Run an instrumented program and collect its per-line results.
pub fn execute(
    program: &GeneratedProgram,
    config: &RunConfig,
    cancel: &CancellationHandle,
) -> Result<RunOutcome, RunError> {
    run_to_completion(program, config, cancel)
}
