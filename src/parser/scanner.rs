use super::types::LogicalStatement;

/// String context carried from one physical line into the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StringState {
    #[default]
    None,
    Single,
    Double,
    Triple,
}

/// Compute net bracket delta for a line, honoring strings, escapes and
/// `#` comments. Returns the delta together with the string state to carry
/// into the next physical line.
pub fn scan_open_state(line: &str, carry_in: StringState) -> (i32, StringState) {
    let chars: Vec<char> = line.chars().collect();
    let mut state = carry_in;
    let mut delta = 0i32;
    let mut i = 0usize;

    while i < chars.len() {
        let ch = chars[i];
        match state {
            StringState::None => match ch {
                '#' => break,
                '\'' => state = StringState::Single,
                '"' => {
                    if chars.get(i + 1) == Some(&'"') && chars.get(i + 2) == Some(&'"') {
                        state = StringState::Triple;
                        i += 2;
                    } else {
                        state = StringState::Double;
                    }
                }
                '(' | '[' | '{' => delta += 1,
                ')' | ']' | '}' => delta -= 1,
                _ => {}
            },
            StringState::Single => match ch {
                '\\' => i += 1,
                '\'' => state = StringState::None,
                _ => {}
            },
            StringState::Double => match ch {
                '\\' => i += 1,
                '"' => state = StringState::None,
                _ => {}
            },
            StringState::Triple => match ch {
                '\\' => i += 1,
                '"' if chars.get(i + 1) == Some(&'"') && chars.get(i + 2) == Some(&'"') => {
                    state = StringState::None;
                    i += 2;
                }
                _ => {}
            },
        }
        i += 1;
    }

    (delta, state)
}

/// Locate `target` outside any string or bracket nesting, at or after byte
/// offset `from`. Scanning stops at an unquoted `#`.
pub fn find_unquoted_char(text: &str, target: char, from: usize) -> Option<usize> {
    let mut state = StringState::None;
    let mut depth = 0i32;
    let mut iter = text.char_indices().peekable();

    while let Some((pos, ch)) = iter.next() {
        match state {
            StringState::None => match ch {
                _ if ch == target && depth <= 0 && pos >= from => return Some(pos),
                '#' => return None,
                '\'' => state = StringState::Single,
                '"' => {
                    if triple_ahead(text, pos) {
                        state = StringState::Triple;
                        iter.next();
                        iter.next();
                    } else {
                        state = StringState::Double;
                    }
                }
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => depth -= 1,
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
                '"' if triple_ahead(text, pos) => {
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

fn triple_ahead(text: &str, pos: usize) -> bool {
    text[pos..].starts_with("\"\"\"")
}

/// Strip every unquoted `#` comment from (possibly multi-line) statement
/// text. Newlines are kept so bracketed continuations stay balanced.
pub fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut state = StringState::None;
    for line in text.split('\n') {
        if !out.is_empty() {
            out.push('\n');
        }
        match state {
            StringState::None => {
                let cut = comment_start(line);
                match cut {
                    Some(c) => out.push_str(line[..c].trim_end()),
                    None => out.push_str(line),
                }
            }
            // inside a string carried over from the previous line: emit as-is
            _ => out.push_str(line),
        }
        let (_, next) = scan_open_state(line, state);
        state = next;
    }
    out
}

/// Byte offset of the first unquoted `#` on a single line, if any.
pub fn comment_start(line: &str) -> Option<usize> {
    let mut state = StringState::None;
    let mut iter = line.char_indices().peekable();
    while let Some((pos, ch)) = iter.next() {
        match state {
            StringState::None => match ch {
                '#' => return Some(pos),
                '\'' => state = StringState::Single,
                '"' => {
                    if triple_ahead(line, pos) {
                        state = StringState::Triple;
                        iter.next();
                        iter.next();
                    } else {
                        state = StringState::Double;
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
                '"' if triple_ahead(line, pos) => {
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

/// First identifier token of a line (its leading keyword, if it has one).
pub fn leading_keyword(text: &str) -> Option<&str> {
    let trimmed = text.trim_start();
    let end = trimmed
        .char_indices()
        .find(|(_, c)| !c.is_ascii_alphanumeric() && *c != '_')
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());
    if end == 0 {
        return None;
    }
    let first = trimmed.chars().next().unwrap_or(' ');
    if first.is_ascii_digit() {
        return None;
    }
    Some(&trimmed[..end])
}

/// Fuse one logical statement starting at `start`: physical lines joined
/// across open brackets, open strings and trailing-backslash continuations.
///
/// An unterminated string or unbalanced bracket at EOF consumes whatever
/// lines remain; the boundary rule is bracket delta <= 0, string state back
/// to None, and no backslash continuation.
pub fn collect_statement(lines: &[&str], start: usize) -> LogicalStatement {
    let mut depth = 0i32;
    let mut state = StringState::None;
    let mut text = String::new();
    let mut i = start;

    loop {
        let line = lines[i];
        if i > start {
            text.push('\n');
        }
        text.push_str(line);

        let entry_state = state;
        let (delta, next_state) = scan_open_state(line, state);
        depth += delta;
        state = next_state;

        let continues_backslash = state == StringState::None && {
            let code = match entry_state {
                StringState::None => match comment_start(line) {
                    Some(c) => &line[..c],
                    None => line,
                },
                _ => line,
            };
            code.trim_end().ends_with('\\')
        };

        if depth <= 0 && state == StringState::None && !continues_backslash {
            break;
        }
        if i + 1 >= lines.len() {
            break;
        }
        i += 1;
    }

    let return_led = leading_keyword(lines[start]) == Some("return");

    LogicalStatement {
        text,
        start,
        end: i,
        return_led,
    }
}

/// Byte offset of the last top-level ` in ` keyword (used to pull the
/// iterable expression out of a `for` header).
pub fn find_last_top_level_in(text: &str) -> Option<usize> {
    let mut state = StringState::None;
    let mut depth = 0i32;
    let mut found = None;
    let mut iter = text.char_indices().peekable();

    while let Some((pos, ch)) = iter.next() {
        match state {
            StringState::None => match ch {
                '#' => break,
                '\'' => state = StringState::Single,
                '"' => {
                    if triple_ahead(text, pos) {
                        state = StringState::Triple;
                        iter.next();
                        iter.next();
                    } else {
                        state = StringState::Double;
                    }
                }
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => depth -= 1,
                'i' if depth <= 0 => {
                    let before_ws = pos == 0
                        || text[..pos]
                            .chars()
                            .next_back()
                            .map(|c| c.is_whitespace())
                            .unwrap_or(true);
                    if before_ws && text[pos..].starts_with("in")
                        && text[pos + 2..]
                            .chars()
                            .next()
                            .map(|c| c.is_whitespace())
                            .unwrap_or(false)
                    {
                        found = Some(pos);
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
                '"' if triple_ahead(text, pos) => {
                    state = StringState::None;
                    iter.next();
                    iter.next();
                }
                _ => {}
            },
        }
    }
    found
}
