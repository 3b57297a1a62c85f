mod guards;
mod linemap;
mod preamble;
mod probes;
mod rewriter;

pub use linemap::{parse_tag, LineIndexMap};
pub use probes::{probe_target, GUARD_PREFIX};
pub use rewriter::{GeneratedProgram, RewriteOptions};

use crate::config::RunConfig;

/// Instrument source text with settings drawn from the run configuration.
pub fn instrument(source: &str, config: &RunConfig) -> GeneratedProgram {
    rewriter::instrument(source, &config.rewrite_options())
}
