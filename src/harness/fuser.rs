use crate::instrument::parse_tag;

use super::LineResult;

/// Merge raw probe chunks into one ordered entry per original line.
///
/// Exact-duplicate chunks collapse to their first occurrence; the chunks
/// remaining for each tagged line are trimmed and space-joined in encounter
/// order; entries left empty after trimming are dropped. Embedded newlines
/// in a payload are kept but encoded as literal `\n` so a result renders on
/// one line.
pub fn fuse(raw_chunks: &[String]) -> Vec<LineResult> {
    let mut deduped: Vec<&str> = Vec::new();
    for chunk in raw_chunks {
        let c = chunk.as_str();
        if !deduped.contains(&c) {
            deduped.push(c);
        }
    }

    let max_tag = deduped
        .iter()
        .filter_map(|c| parse_tag(c).map(|(t, _)| t))
        .max();
    let Some(max_tag) = max_tag else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for line in 0..=max_tag {
        let mut payloads = Vec::new();
        for chunk in &deduped {
            if let Some((tag, payload)) = parse_tag(chunk) {
                if tag == line {
                    let trimmed = payload.trim();
                    if !trimmed.is_empty() {
                        payloads.push(trimmed);
                    }
                }
            }
        }
        if payloads.is_empty() {
            continue;
        }
        out.push(LineResult {
            line,
            value: encode_newlines(&payloads.join(" ")),
            is_error: false,
        });
    }
    out
}

fn encode_newlines(value: &str) -> String {
    value.replace('\r', "").replace('\n', "\\n")
}
