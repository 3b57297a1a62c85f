use serde::{Deserialize, Serialize};

use crate::instrument::RewriteOptions;
use crate::parser::IndentUnit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndentMode {
    Spaces,
    Tabs,
}

/// Display colors for the renderer: normal/active values and their error
/// counterparts. The core only threads these through; the CLI maps them to
/// ANSI escapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayColors {
    pub normal: String,
    pub active: String,
    pub error: String,
    pub active_error: String,
}

impl Default for DisplayColors {
    fn default() -> Self {
        DisplayColors {
            normal: "green".to_string(),
            active: "cyan".to_string(),
            error: "red".to_string(),
            active_error: "magenta".to_string(),
        }
    }
}

/// Externally supplied run configuration, deserializable from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Spaces per indentation level; ignored in tab mode. Minimum 1.
    pub indent_width: usize,
    pub indent_mode: IndentMode,
    pub timeout_ms: u64,
    /// Default call-count guard limit for blocking calls.
    pub call_limit: usize,
    /// Interpreter command line; the generated program is appended as the
    /// final argument.
    pub interpreter: String,
    pub colors: DisplayColors,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            indent_width: 4,
            indent_mode: IndentMode::Spaces,
            timeout_ms: 10_000,
            call_limit: 100,
            interpreter: "python3 -u -c".to_string(),
            colors: DisplayColors::default(),
        }
    }
}

impl RunConfig {
    pub fn indent_unit(&self) -> IndentUnit {
        match self.indent_mode {
            IndentMode::Spaces => IndentUnit::Spaces(self.indent_width.max(1)),
            IndentMode::Tabs => IndentUnit::Tab,
        }
    }

    /// Interpreter command split into argv (quotes honored).
    pub fn interpreter_argv(&self) -> Vec<String> {
        shlex::split(&self.interpreter).unwrap_or_else(|| vec![self.interpreter.clone()])
    }

    pub fn rewrite_options(&self) -> RewriteOptions {
        RewriteOptions {
            unit: self.indent_unit(),
            call_limit: self.call_limit,
        }
    }
}
