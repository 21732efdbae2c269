//! Chunk-to-line splitting for streamed output.

/// Rolling buffer that turns arbitrary byte chunks into complete lines.
///
/// An incomplete trailing fragment is kept until the next chunk, so a line
/// split across chunk boundaries is yielded exactly once. `\r\n` and `\n`
/// both terminate a line; empty lines are dropped.
#[derive(Debug, Default)]
pub struct LineSplitter {
    buffer: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(line) = decode(&raw[..raw.len() - 1]) {
                lines.push(line);
            }
        }
        lines
    }

    /// Take whatever fragment remains after the stream ended.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        decode(&rest)
    }

    /// Bytes currently held back.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

fn decode(raw: &[u8]) -> Option<String> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    if raw.is_empty() {
        return None;
    }
    Some(String::from_utf8_lossy(raw).into_owned())
}
