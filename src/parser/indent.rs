use super::scanner::{comment_start, scan_open_state, StringState};

/// Configured indentation unit: N spaces or a single tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndentUnit {
    Spaces(usize),
    Tab,
}

impl IndentUnit {
    /// Indentation text for `level` block levels.
    pub fn render(&self, level: usize) -> String {
        match self {
            IndentUnit::Spaces(n) => " ".repeat(n * level),
            IndentUnit::Tab => "\t".repeat(level),
        }
    }
}

/// Indentation level of a raw line: whole leading units, stopping at the
/// first character that doesn't extend a full unit. Partial leading
/// whitespace shorter than one unit counts as the boundary; malformed
/// whitespace never errors, it just stops the count.
pub fn measure_indent(line: &str, unit: IndentUnit) -> usize {
    match unit {
        IndentUnit::Tab => line.chars().take_while(|c| *c == '\t').count(),
        IndentUnit::Spaces(n) => {
            let n = n.max(1);
            let spaces = line.chars().take_while(|c| *c == ' ').count();
            spaces / n
        }
    }
}

/// The indentation a dependent block under `line` must have: the line's own
/// level, plus one when its comment-stripped text ends in `:` (unless
/// `ignore_colon`).
pub fn entry_indent(line: &str, unit: IndentUnit, ignore_colon: bool) -> usize {
    let level = measure_indent(line, unit);
    if ignore_colon {
        return level;
    }
    let code = match comment_start(line) {
        Some(c) => &line[..c],
        None => line,
    };
    if code.trim_end().ends_with(':') {
        level + 1
    } else {
        level
    }
}

/// True when the (multi-line) statement text, comments stripped, ends with a
/// top-level colon.
pub fn ends_with_colon(code: &str) -> bool {
    code.trim_end().ends_with(':')
}

/// True when the statement text still has every bracket closed and every
/// string terminated (used by recognizers that only apply to well-formed
/// single statements).
#[allow(dead_code)]
pub fn is_balanced(text: &str) -> bool {
    let mut depth = 0i32;
    let mut state = StringState::None;
    for line in text.split('\n') {
        let (d, s) = scan_open_state(line, state);
        depth += d;
        state = s;
    }
    depth == 0 && state == StringState::None
}
