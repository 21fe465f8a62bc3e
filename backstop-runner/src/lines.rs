//! Line splitting with carry-over
//!
//! A read returns whatever bytes the pipe holds, which may end in the
//! middle of a line (or of a UTF-8 sequence). The unterminated tail is
//! kept and prefixed to the next chunk of the same stream.

/// Per-stream line assembler
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `chunk` and returns every line it completed
    ///
    /// Empty lines are dropped and a trailing `\r` is removed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let Some(last_newline) = self.pending.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };

        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);

        complete
            .split(|&b| b == b'\n')
            .filter_map(decode_line)
            .collect()
    }

    /// Returns the held fragment once the stream is closed
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        decode_line(&rest)
    }

    /// Whether an unterminated fragment is being held
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

fn decode_line(raw: &[u8]) -> Option<String> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    if raw.is_empty() {
        return None;
    }
    Some(String::from_utf8_lossy(raw).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_lines() {
        let mut buf = LineBuffer::new();
        assert_eq!(buf.push(b"one\ntwo\n"), vec!["one", "two"]);
        assert!(!buf.has_pending());
        assert_eq!(buf.finish(), None);
    }

    #[test]
    fn test_fragment_is_carried_over() {
        let mut buf = LineBuffer::new();
        assert_eq!(buf.push(b"a\nb"), vec!["a"]);
        assert!(buf.has_pending());
        assert_eq!(buf.push(b"c\nd"), vec!["bc"]);
        assert_eq!(buf.finish(), Some("d".to_string()));
    }

    #[test]
    fn test_chunk_without_newline() {
        let mut buf = LineBuffer::new();
        assert!(buf.push(b"par").is_empty());
        assert!(buf.push(b"tial").is_empty());
        assert_eq!(buf.push(b"\n"), vec!["partial"]);
    }

    #[test]
    fn test_empty_lines_and_crlf() {
        let mut buf = LineBuffer::new();
        assert_eq!(buf.push(b"a\r\n\n\r\nb\n"), vec!["a", "b"]);
    }

    #[test]
    fn test_utf8_split_across_chunks() {
        let text = "größe\n".as_bytes();
        let (head, tail) = text.split_at(3); // inside the two-byte 'ö'
        let mut buf = LineBuffer::new();
        assert!(buf.push(head).is_empty());
        assert_eq!(buf.push(tail), vec!["größe"]);
    }
}
