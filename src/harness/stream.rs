/// Incremental splitter for interleaved probe output.
///
/// A chunk boundary is a newline immediately followed by a `<digits>:` tag.
/// Anything after the last confirmed boundary stays pending until more data
/// arrives (a tail without its trailing newline is re-joined with the next
/// incoming chunk), so no bytes are dropped or duplicated at arrival
/// boundaries.
#[derive(Debug, Default)]
pub struct ChunkDemuxer {
    pending: String,
    chunks: Vec<String>,
}

impl ChunkDemuxer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, data: &str) {
        self.pending.push_str(data);
        self.drain_complete();
    }

    /// Flush the trailing partial chunk and return everything seen.
    pub fn finish(mut self) -> Vec<String> {
        self.drain_complete();
        if !self.pending.trim().is_empty() {
            self.chunks.push(std::mem::take(&mut self.pending));
        }
        self.chunks
    }

    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    fn drain_complete(&mut self) {
        while let Some(cut) = next_boundary(&self.pending) {
            let chunk: String = self.pending.drain(..cut).collect();
            self.chunks.push(chunk);
        }
    }
}

/// Offset of the first position after a newline where a `<digits>:` tag
/// starts. Digits running into the end of the buffer are not a boundary
/// yet; the colon must be visible.
fn next_boundary(buf: &str) -> Option<usize> {
    let bytes = buf.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b != b'\n' {
            continue;
        }
        let rest = &bytes[i + 1..];
        let digits = rest.iter().take_while(|c| c.is_ascii_digit()).count();
        if digits > 0 && rest.get(digits) == Some(&b':') {
            return Some(i + 1);
        }
    }
    None
}
