use super::indent::ends_with_colon;
use super::scanner::{find_last_top_level_in, find_unquoted_char, leading_keyword};

/// Keywords whose compound headers never get a value probe (control
/// transfer and clause continuations).
pub const HEADER_NO_PROBE: &[&str] = &[
    "break", "continue", "pass", "except", "finally", "raise", "else", "elif",
];

/// Keywords passed through untouched when they appear without a colon.
pub const BARE_PASSTHROUGH: &[&str] =
    &["break", "continue", "pass", "except", "finally", "raise"];

/// Branch constructs tracked by the never-runs bookkeeping.
pub const BRANCH_KEYWORDS: &[&str] = &["if", "elif", "else", "while", "for"];

/// Keywords that may legally head an inline `header: body` one-liner.
const COMPOUND_KEYWORDS: &[&str] = &[
    "if", "elif", "else", "while", "for", "with", "try", "def", "class", "except",
    "finally", "async",
];

const PY_KEYWORDS: &[&str] = &[
    "if", "elif", "else", "while", "for", "def", "return", "try", "except",
    "finally", "with", "class", "pass", "break", "continue", "raise", "import",
    "from", "global", "nonlocal", "del", "assert", "yield", "lambda", "async",
    "await", "not", "and", "or", "in", "is", "None", "True", "False",
];

/// A recognized construct. Produced from comment-stripped statement text;
/// the rewriter dispatches on it in fixed priority order.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Decorator,
    Assignment { target: String },
    AugmentedAssignment { target: String, op: char, rhs: String },
    TypedAssignment { target: String },
    PrintCall,
    ForHeader { iterable: String },
    ReturnStatement { value: Option<String> },
    DefHeader { name: String, params: Vec<String> },
    CompoundHeader { keyword: Option<String> },
    InlineCompound { head: String, body: String },
    BareKeyword,
    Plain,
}

pub fn is_branch_keyword(kw: &str) -> bool {
    BRANCH_KEYWORDS.contains(&kw)
}

/// Classify a comment-stripped statement. Priority mirrors the rewrite
/// dispatch: assignment forms, `print`, `for`, `return`, `def`, trailing
/// colon, inline colon, bare keyword, plain.
pub fn classify(code: &str) -> Statement {
    let trimmed = code.trim_start();
    if trimmed.starts_with('@') {
        return Statement::Decorator;
    }

    if let Some(target) = recognize_assignment(trimmed) {
        return Statement::Assignment { target };
    }
    if let Some((target, op, rhs)) = recognize_augmented(trimmed) {
        return Statement::AugmentedAssignment { target, op, rhs };
    }
    if let Some(target) = recognize_typed_assignment(trimmed) {
        return Statement::TypedAssignment { target };
    }
    if recognize_print(trimmed) {
        return Statement::PrintCall;
    }

    let kw = leading_keyword(trimmed);

    if kw == Some("for") && ends_with_colon(code) {
        if let Some(iterable) = extract_for_iterable(trimmed) {
            return Statement::ForHeader { iterable };
        }
    }
    if kw == Some("return") {
        let rest = trimmed[6..].trim();
        let value = if rest.is_empty() {
            None
        } else {
            Some(rest.to_string())
        };
        return Statement::ReturnStatement { value };
    }
    if kw == Some("def") && ends_with_colon(code) {
        if let Some((name, params)) = extract_def_signature(trimmed) {
            return Statement::DefHeader { name, params };
        }
    }
    if ends_with_colon(code) {
        return Statement::CompoundHeader {
            keyword: kw.map(str::to_string),
        };
    }
    if let Some(colon) = find_unquoted_char(trimmed, ':', 0) {
        let head = &trimmed[..colon];
        let body = &trimmed[colon + 1..];
        let head_kw = leading_keyword(head);
        if !body.trim().is_empty()
            && head_kw.map(|k| COMPOUND_KEYWORDS.contains(&k)).unwrap_or(false)
        {
            return Statement::InlineCompound {
                head: head.trim_end().to_string(),
                body: body.trim().to_string(),
            };
        }
    }
    if kw.map(|k| BARE_PASSTHROUGH.contains(&k)).unwrap_or(false) {
        return Statement::BareKeyword;
    }
    Statement::Plain
}

/// Leading dotted identifier (`a`, `a.b.c`): returns it plus the byte
/// length consumed. Plain names only, no subscripts.
fn parse_dotted_ident(s: &str) -> Option<(&str, usize)> {
    let mut end = 0usize;
    for (i, c) in s.char_indices() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
            end = i + c.len_utf8();
        } else {
            break;
        }
    }
    if end == 0 {
        return None;
    }
    let ident = &s[..end];
    let first = ident.chars().next()?;
    if first.is_ascii_digit() || first == '.' || ident.ends_with('.') {
        return None;
    }
    Some((ident, end))
}

fn recognize_assignment(code: &str) -> Option<String> {
    let (ident, len) = parse_dotted_ident(code)?;
    if PY_KEYWORDS.contains(&ident) {
        return None;
    }
    let rest = code[len..].trim_start();
    if rest.starts_with('=') && !rest.starts_with("==") {
        return Some(ident.to_string());
    }
    None
}

fn recognize_augmented(code: &str) -> Option<(String, char, String)> {
    let (ident, len) = parse_dotted_ident(code)?;
    if PY_KEYWORDS.contains(&ident) {
        return None;
    }
    let rest = code[len..].trim_start();
    let mut chars = rest.chars();
    let op = chars.next()?;
    if !matches!(op, '+' | '-' | '*' | '/') {
        return None;
    }
    if chars.next()? != '=' {
        return None;
    }
    let rhs = rest[op.len_utf8() + 1..].trim().to_string();
    if rhs.is_empty() {
        return None;
    }
    Some((ident.to_string(), op, rhs))
}

fn recognize_typed_assignment(code: &str) -> Option<String> {
    let (ident, len) = parse_dotted_ident(code)?;
    if PY_KEYWORDS.contains(&ident) {
        return None;
    }
    let rest = code[len..].trim_start();
    if !rest.starts_with(':') {
        return None;
    }
    let after = &rest[1..];
    let eq = find_unquoted_char(after, '=', 0)?;
    if after[eq..].starts_with("==") {
        return None;
    }
    Some(ident.to_string())
}

fn recognize_print(code: &str) -> bool {
    let Some(rest) = code.strip_prefix("print") else {
        return false;
    };
    rest.trim_start().starts_with('(')
}

/// Text after the last top-level ` in ` and before the trailing colon.
fn extract_for_iterable(code: &str) -> Option<String> {
    let pos = find_last_top_level_in(code)?;
    let tail = code[pos + 2..].trim_end();
    let tail = tail.strip_suffix(':')?;
    let iterable = tail.trim();
    if iterable.is_empty() {
        None
    } else {
        Some(iterable.to_string())
    }
}

/// `def name(params):` → name plus declared parameter names, with defaults,
/// annotations, star prefixes and a leading `self` stripped.
fn extract_def_signature(code: &str) -> Option<(String, Vec<String>)> {
    let after_def = code.strip_prefix("def")?.trim_start();
    let (name, len) = parse_dotted_ident(after_def)?;
    let rest = after_def[len..].trim_start();
    if !rest.starts_with('(') {
        return None;
    }
    let inner = matching_paren_inner(rest)?;

    let mut params = Vec::new();
    let mut from = 0usize;
    let mut parts = Vec::new();
    loop {
        match find_unquoted_char(inner, ',', from) {
            Some(c) => {
                parts.push(&inner[from..c]);
                from = c + 1;
            }
            None => {
                parts.push(&inner[from..]);
                break;
            }
        }
    }

    for (i, part) in parts.iter().enumerate() {
        let mut p = part.trim();
        while let Some(stripped) = p.strip_prefix('*') {
            p = stripped;
        }
        for stop in [':', '='] {
            if let Some(at) = find_unquoted_char(p, stop, 0) {
                p = p[..at].trim_end();
            }
        }
        let p = p.trim();
        if p.is_empty() || p == "/" {
            continue;
        }
        if i == 0 && p == "self" {
            continue;
        }
        if p
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !p.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(true)
        {
            params.push(p.to_string());
        }
    }

    Some((name.to_string(), params))
}

/// Inner text of the bracket group opening at the first character of `s`
/// (which must be `(`).
fn matching_paren_inner(s: &str) -> Option<&str> {
    let close = find_unquoted_char(&s[1..], ')', 0)?;
    Some(&s[1..1 + close])
}
