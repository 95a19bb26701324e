use std::collections::VecDeque;

/// Byte buffer that hands out complete lines and keeps the partial tail
/// until the next chunk arrives.
pub struct LineBuffer {
    buffer: VecDeque<u8>,
}

impl LineBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
        }
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend(bytes);
    }

    /// Extract the next `\n`-terminated line without its terminator.
    /// Returns None if no complete line is available.
    pub fn next_line(&mut self) -> Option<String> {
        let newline_pos = self.buffer.iter().position(|&b| b == b'\n')?;
        let line_bytes: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
        Some(Self::decode(&line_bytes[..line_bytes.len() - 1]))
    }

    /// Drain whatever is left once the body has ended
    pub fn take_remaining(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest: Vec<u8> = self.buffer.drain(..).collect();
        Some(Self::decode(&rest))
    }

    fn decode(bytes: &[u8]) -> String {
        let text = String::from_utf8_lossy(bytes);
        text.strip_suffix('\r').unwrap_or(&text).to_string()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_buffer_basic() {
        let mut buffer = LineBuffer::with_capacity(64);

        buffer.extend(b"line1\nline2\r\n");

        assert_eq!(buffer.next_line().unwrap(), "line1");
        assert_eq!(buffer.next_line().unwrap(), "line2");
        assert!(buffer.next_line().is_none());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_partial_line() {
        let mut buffer = LineBuffer::with_capacity(64);

        buffer.extend(b"partial");
        assert!(buffer.next_line().is_none());
        assert_eq!(buffer.len(), 7);

        buffer.extend(b" line\n");
        assert_eq!(buffer.next_line().unwrap(), "partial line");
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        let mut buffer = LineBuffer::with_capacity(64);
        let bytes = "café\n".as_bytes();

        buffer.extend(&bytes[..4]);
        assert!(buffer.next_line().is_none());
        buffer.extend(&bytes[4..]);
        assert_eq!(buffer.next_line().unwrap(), "café");
    }

    #[test]
    fn test_take_remaining() {
        let mut buffer = LineBuffer::with_capacity(64);
        buffer.extend(b"done\ntail");

        assert_eq!(buffer.next_line().unwrap(), "done");
        assert_eq!(buffer.take_remaining().unwrap(), "tail");
        assert!(buffer.take_remaining().is_none());
    }
}
