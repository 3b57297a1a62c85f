/// Message prefix for call-count guard violations raised inside the
/// generated program; the harness strips it and relabels the entry as an
/// advisory.
pub const GUARD_PREFIX: &str = "ClemExcep";

/// Existence-only probe: reports that the line ran, with no value.
pub fn probe_empty(idx: usize) -> String {
    format!("print(\"{idx}:\")")
}

/// Value probe. Multi-token expressions are parenthesized so the payload is
/// evaluated as one expression.
pub fn probe_value(idx: usize, expr: &str) -> String {
    if is_simple_name(expr) {
        format!("print(\"{idx}:\" + str({expr}))")
    } else {
        format!("print(\"{idx}:\" + str(({expr})))")
    }
}

/// Per-parameter probe under a `def` header.
pub fn probe_param(idx: usize, name: &str) -> String {
    format!("print(\"{idx}:{name}: \" + str({name}))")
}

pub fn register_branch(idx: usize) -> String {
    format!("_probe_register(\"{idx}\")")
}

pub fn enter_branch(idx: usize) -> String {
    format!("_probe_enter(\"{idx}\")")
}

pub fn guard_call(site: usize, limit: usize, idx: usize) -> String {
    format!("_probe_guard(\"s{site}\", {limit}, {idx})")
}

fn is_simple_name(expr: &str) -> bool {
    !expr.is_empty()
        && expr
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// If a generated line is one of our probe emissions, the original line
/// index it reports for.
pub fn probe_target(gen_line: &str) -> Option<usize> {
    let rest = gen_line.trim_start().strip_prefix("print(\"")?;
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    if !rest[digits.len()..].starts_with(':') {
        return None;
    }
    digits.parse().ok()
}
