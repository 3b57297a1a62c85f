use super::scanner::comment_start;

/// Trailing-comment instrumentation directives: `# mock(<expr>)` replaces a
/// blocking call or assigned value, `# limit(<n>)` overrides the call-count
/// guard limit. Both may appear in one comment, in either order and either
/// spacing (`mock(x)` / `mock (x)`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Directives {
    pub mock: Option<String>,
    pub limit: Option<usize>,
}

impl Directives {
    pub fn is_empty(&self) -> bool {
        self.mock.is_none() && self.limit.is_none()
    }
}

/// Parse directives out of every comment carried by (possibly multi-line)
/// raw statement text. First occurrence of each directive wins.
pub fn parse_directives(raw: &str) -> Directives {
    let mut out = Directives::default();
    for line in raw.split('\n') {
        let Some(at) = comment_start(line) else {
            continue;
        };
        let comment = &line[at + 1..];
        if out.mock.is_none() {
            out.mock = extract_call(comment, "mock").map(str::to_string);
        }
        if out.limit.is_none() {
            out.limit = extract_call(comment, "limit").and_then(|s| s.trim().parse().ok());
        }
    }
    out
}

/// Find `name ( ... )` inside comment text and return the argument text
/// between the balanced parentheses.
fn extract_call<'a>(comment: &'a str, name: &str) -> Option<&'a str> {
    let bytes = comment.as_bytes();
    let mut search = 0usize;
    loop {
        let rel = comment[search..].find(name)?;
        let at = search + rel;
        let boundary_ok = at == 0
            || !comment[..at]
                .chars()
                .next_back()
                .map(|c| c.is_ascii_alphanumeric() || c == '_')
                .unwrap_or(false);
        let after = at + name.len();
        if boundary_ok {
            let mut open = after;
            while open < bytes.len() && (bytes[open] == b' ' || bytes[open] == b'\t') {
                open += 1;
            }
            if open < bytes.len() && bytes[open] == b'(' {
                if let Some(close) = matching_close(comment, open) {
                    return Some(&comment[open + 1..close]);
                }
            }
        }
        search = after;
    }
}

/// Byte offset of the parenthesis closing the one at `open`, honoring
/// nesting and quoted strings inside the argument text.
fn matching_close(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (pos, ch) in text[open..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if let Some(q) = quote {
            match ch {
                '\\' => escaped = true,
                c if c == q => quote = None,
                _ => {}
            }
            continue;
        }
        match ch {
            '\'' | '"' => quote = Some(ch),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + pos);
                }
            }
            _ => {}
        }
    }
    None
}
