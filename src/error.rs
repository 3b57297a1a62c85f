use std::io;

use thiserror::Error;

/// Pipeline errors. Everything the target program does wrong is folded
/// into `LineResult` entries; only failing to start the interpreter at all
/// aborts a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to spawn interpreter `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("interpreter i/o error: {0}")]
    Io(#[from] io::Error),
}
