use crate::parser::{classify, find_unquoted_char, Directives, Statement, StringState};

/// Result of the call-safety pass over one statement's code: the (possibly
/// rewritten) code plus the guard limit to enforce, if any.
pub struct CallSafety {
    pub code: String,
    pub guard_limit: Option<usize>,
}

/// Rewrite blocking-interactive calls and apply `mock`/`limit` directives.
///
/// A blocking `input(...)` call is always replaced: by the declared mock
/// expression when present, by the empty-string literal otherwise, and the
/// site gets a call-count guard (directive limit or the configured
/// default). A `limit` directive alone guards the line as-is; a `mock`
/// directive alone replaces the assigned value of an assignment form.
pub fn apply_call_safety(code: &str, directives: &Directives, default_limit: usize) -> CallSafety {
    if let Some((start, end)) = find_blocking_call(code) {
        let replacement = directives
            .mock
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "\"\"".to_string());
        let mut rewritten = String::with_capacity(code.len());
        rewritten.push_str(&code[..start]);
        rewritten.push_str(&replacement);
        rewritten.push_str(&code[end..]);
        return CallSafety {
            code: rewritten,
            guard_limit: Some(directives.limit.unwrap_or(default_limit)),
        };
    }

    let mut code = code.to_string();
    if let Some(mock) = &directives.mock {
        if let Some(rewritten) = replace_assigned_value(&code, mock) {
            code = rewritten;
        }
    }
    CallSafety {
        guard_limit: directives.limit,
        code,
    }
}

/// Byte range of the first `input( ... )` call appearing outside strings
/// and comments, including both parentheses.
fn find_blocking_call(code: &str) -> Option<(usize, usize)> {
    let mut state = StringState::None;
    let mut iter = code.char_indices().peekable();

    while let Some((pos, ch)) = iter.next() {
        match state {
            StringState::None => match ch {
                '#' => {
                    // comment runs to end of line
                    for (_, c) in iter.by_ref() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                '\'' => state = StringState::Single,
                '"' => {
                    if code[pos..].starts_with("\"\"\"") {
                        state = StringState::Triple;
                        iter.next();
                        iter.next();
                    } else {
                        state = StringState::Double;
                    }
                }
                'i' if code[pos..].starts_with("input") && word_boundary_before(code, pos) => {
                    let after = pos + "input".len();
                    let open = after
                        + code[after..]
                            .chars()
                            .take_while(|c| *c == ' ' || *c == '\t')
                            .map(char::len_utf8)
                            .sum::<usize>();
                    if code[open..].starts_with('(') {
                        if let Some(close) = find_unquoted_char(&code[open + 1..], ')', 0) {
                            return Some((pos, open + 1 + close + 1));
                        }
                    }
                }
                _ => {}
            },
            StringState::Single => match ch {
                '\\' => {
                    iter.next();
                }
                '\'' => state = StringState::None,
                _ => {}
            },
            StringState::Double => match ch {
                '\\' => {
                    iter.next();
                }
                '"' => state = StringState::None,
                _ => {}
            },
            StringState::Triple => match ch {
                '\\' => {
                    iter.next();
                }
                '"' if code[pos..].starts_with("\"\"\"") => {
                    state = StringState::None;
                    iter.next();
                    iter.next();
                }
                _ => {}
            },
        }
    }
    None
}

fn word_boundary_before(code: &str, pos: usize) -> bool {
    match code[..pos].chars().next_back() {
        None => true,
        Some(c) => !c.is_ascii_alphanumeric() && c != '_' && c != '.',
    }
}

/// Replace the assigned value of an assignment-form statement with the mock
/// expression. Returns None when the statement has no assignment to mock.
fn replace_assigned_value(code: &str, mock: &str) -> Option<String> {
    match classify(code) {
        Statement::Assignment { .. } | Statement::TypedAssignment { .. } => {
            let eq = assignment_eq_offset(code)?;
            Some(format!("{}= {}", &code[..eq], mock))
        }
        Statement::AugmentedAssignment { target, op, .. } => {
            Some(format!("{target} {op}= {mock}"))
        }
        _ => None,
    }
}

/// Byte offset of the first top-level `=` that is an assignment (not part
/// of `==`).
fn assignment_eq_offset(code: &str) -> Option<usize> {
    let mut from = 0usize;
    loop {
        let eq = find_unquoted_char(code, '=', from)?;
        if code[eq..].starts_with("==") {
            from = eq + 2;
            continue;
        }
        // skip comparison operators ending in '='
        if eq > 0 {
            let prev = code[..eq].chars().next_back();
            if matches!(prev, Some('<') | Some('>') | Some('!') | Some('+') | Some('-') | Some('*') | Some('/')) {
                from = eq + 1;
                continue;
            }
        }
        return Some(eq);
    }
}
