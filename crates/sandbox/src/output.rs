//! Captured stdout/stderr, bounded to 1 MB and middle-truncated — unlike the
//! tail-only buffer used by background process sessions, a sandboxed
//! execution's output must preserve both its start and its end.

pub const MAX_OUTPUT_BYTES: usize = 1024 * 1024;

#[derive(Debug, Default)]
pub struct CapturedOutput {
    buf: Vec<u8>,
}

impl CapturedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Renders the captured bytes as a (lossy) string, middle-truncating to
    /// `MAX_OUTPUT_BYTES` if needed: the first and last thirds are kept and
    /// a marker replaces the dropped middle.
    pub fn finish(self) -> String {
        if self.buf.len() <= MAX_OUTPUT_BYTES {
            return String::from_utf8_lossy(&self.buf).into_owned();
        }

        let keep_each = MAX_OUTPUT_BYTES / 3;
        let head = char_boundary_slice(&self.buf, 0, keep_each);
        let tail_start = char_boundary_start(&self.buf, self.buf.len() - keep_each);
        let dropped = tail_start - head.len();

        format!(
            "{}\n... [{dropped} bytes truncated] ...\n{}",
            String::from_utf8_lossy(&self.buf[..head.len()]),
            String::from_utf8_lossy(&self.buf[tail_start..])
        )
    }
}

fn char_boundary_slice(buf: &[u8], start: usize, len: usize) -> Vec<u8> {
    let mut end = (start + len).min(buf.len());
    while end > start && !is_boundary(buf, end) {
        end -= 1;
    }
    buf[start..end].to_vec()
}

fn char_boundary_start(buf: &[u8], at: usize) -> usize {
    let mut at = at.min(buf.len());
    while at < buf.len() && !is_boundary(buf, at) {
        at += 1;
    }
    at
}

fn is_boundary(buf: &[u8], idx: usize) -> bool {
    idx == buf.len() || (buf[idx] & 0xC0) != 0x80
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_output_passes_through_unchanged() {
        let mut out = CapturedOutput::new();
        out.push(b"hello world");
        assert_eq!(out.finish(), "hello world");
    }

    #[test]
    fn long_output_is_middle_truncated() {
        let mut out = CapturedOutput::new();
        out.push(&vec![b'a'; MAX_OUTPUT_BYTES * 2]);
        let result = out.finish();
        assert!(result.len() < MAX_OUTPUT_BYTES * 2);
        assert!(result.contains("truncated"));
        assert!(result.starts_with('a'));
        assert!(result.ends_with('a'));
    }
}
