use super::probes::probe_target;

/// Split a probe-tagged chunk into `(original_line, payload)`. Tags are
/// non-negative integers followed by `:` at the very start of the chunk.
pub fn parse_tag(chunk: &str) -> Option<(usize, &str)> {
    let digits_len = chunk.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits_len == 0 {
        return None;
    }
    let rest = &chunk[digits_len..];
    if !rest.starts_with(':') {
        return None;
    }
    let tag = chunk[..digits_len].parse().ok()?;
    Some((tag, &rest[1..]))
}

/// Many-to-one mapping from generated-line index (or emitted-chunk
/// position) to original-line index. Missing entries resolve to the literal
/// index rather than failing.
#[derive(Debug, Clone, Default)]
pub struct LineIndexMap {
    entries: Vec<Option<usize>>,
}

impl LineIndexMap {
    /// Pre-run map: scan the generated program's own probe literals. A probe
    /// line maps to its tag; every other line inherits the most recently
    /// seen probe's target, so a runtime error on a plain generated line
    /// still resolves to a nearby original line.
    pub fn from_generated(program: &str) -> Self {
        let mut entries = Vec::new();
        let mut current = None;
        for line in program.lines() {
            if let Some(target) = probe_target(line) {
                current = Some(target);
                entries.push(Some(target));
            } else {
                entries.push(current);
            }
        }
        LineIndexMap { entries }
    }

    /// Post-run map: chunk positions to the tag each emitted chunk carries.
    /// Untagged chunks are left unset.
    pub fn from_output<'a, I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let entries = chunks
            .into_iter()
            .map(|c| parse_tag(c).map(|(tag, _)| tag))
            .collect();
        LineIndexMap { entries }
    }

    pub fn get(&self, index: usize) -> Option<usize> {
        self.entries.get(index).copied().flatten()
    }

    /// Resolve with identity fallback.
    pub fn resolve(&self, index: usize) -> usize {
        self.get(index).unwrap_or(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
