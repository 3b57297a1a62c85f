use crate::instrument::GUARD_PREFIX;

/// Structured reading of the interpreter's stderr.
#[derive(Debug, Clone, PartialEq)]
pub enum StderrReport {
    /// A call-count guard fired inside the generated program. `line` is the
    /// original line index the guard carried; `message` is the cleaned,
    /// user-facing text.
    Guard { line: usize, message: String },
    /// An uncaught interpreter exception. `gen_line` is the 1-based line of
    /// the innermost frame in generated-program coordinates, when one could
    /// be found.
    Runtime {
        gen_line: Option<usize>,
        message: String,
    },
    Quiet,
}

/// Classify raw stderr text. Guard markers win over traceback parsing;
/// otherwise the *last* `line <n>` occurrence (the innermost frame) names
/// the failing generated line.
pub fn classify_stderr(text: &str) -> StderrReport {
    if text.trim().is_empty() {
        return StderrReport::Quiet;
    }

    if let Some(at) = text.find(GUARD_PREFIX) {
        let rest = &text[at + GUARD_PREFIX.len()..];
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        if !digits.is_empty() && rest[digits.len()..].starts_with(':') {
            if let Ok(line) = digits.parse() {
                let tail = &rest[digits.len() + 1..];
                let message = tail.lines().next().unwrap_or("").trim().to_string();
                return StderrReport::Guard { line, message };
            }
        }
    }

    let gen_line = last_reported_line(text);
    let message = text
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("error")
        .to_string();
    StderrReport::Runtime { gen_line, message }
}

/// The number in the last `line <n>` fragment of a traceback.
fn last_reported_line(text: &str) -> Option<usize> {
    let mut found = None;
    let mut rest = text;
    while let Some(at) = rest.find("line ") {
        let tail = &rest[at + 5..];
        let digits: String = tail.chars().take_while(|c| c.is_ascii_digit()).collect();
        if !digits.is_empty() {
            if let Ok(n) = digits.parse() {
                found = Some(n);
            }
        }
        rest = &rest[at + 5..];
    }
    found
}
