//! Non-blocking byte source consumed by the decoder

use std::collections::VecDeque;

use bytes::{Buf, BytesMut};

/// A source of received bytes that never blocks
///
/// The decoder only reads what [`available`](ByteSource::available) reports;
/// a source may deliver zero, one or many bytes between readiness events.
#[cfg_attr(test, mockall::automock)]
pub trait ByteSource {
    /// Number of bytes that can be read without waiting
    fn available(&self) -> usize;

    /// Next byte, or `None` if nothing is buffered
    fn read_byte(&mut self) -> Option<u8>;
}

impl ByteSource for &[u8] {
    fn available(&self) -> usize {
        self.len()
    }

    fn read_byte(&mut self) -> Option<u8> {
        let (&first, rest) = self.split_first()?;
        *self = rest;
        Some(first)
    }
}

impl ByteSource for VecDeque<u8> {
    fn available(&self) -> usize {
        self.len()
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.pop_front()
    }
}

impl ByteSource for BytesMut {
    fn available(&self) -> usize {
        self.remaining()
    }

    fn read_byte(&mut self) -> Option<u8> {
        if self.has_remaining() {
            Some(self.get_u8())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_source() {
        let mut source: &[u8] = b"V\t";
        assert_eq!(source.available(), 2);
        assert_eq!(source.read_byte(), Some(b'V'));
        assert_eq!(source.read_byte(), Some(b'\t'));
        assert_eq!(source.read_byte(), None);
        assert_eq!(source.available(), 0);
    }

    #[test]
    fn test_deque_source() {
        let mut source: VecDeque<u8> = b"ab".iter().copied().collect();
        assert_eq!(source.available(), 2);
        assert_eq!(source.read_byte(), Some(b'a'));
        source.push_back(b'c');
        assert_eq!(source.available(), 2);
    }

    #[test]
    fn test_bytes_mut_source() {
        let mut source = BytesMut::from(&b"\r\n"[..]);
        assert_eq!(source.available(), 2);
        assert_eq!(source.read_byte(), Some(b'\r'));
        assert_eq!(source.read_byte(), Some(b'\n'));
        assert_eq!(source.read_byte(), None);
        // Drained buffer can be refilled by the reader
        source.extend_from_slice(b"V");
        assert_eq!(source.available(), 1);
    }
}
