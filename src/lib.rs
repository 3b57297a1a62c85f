pub mod config;
pub mod error;
pub mod harness;
pub mod instrument;
pub mod orchestrator;
pub mod parser;

pub use config::RunConfig;
pub use error::RunError;
pub use harness::{execute, CancellationHandle, LineResult, RunOutcome, RunState};
pub use instrument::{instrument, GeneratedProgram, LineIndexMap};
pub use orchestrator::DocumentSessionRegistry;
