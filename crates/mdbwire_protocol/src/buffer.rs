use std::io::{self, Read};

const MIN_CAPACITY: usize = 256;

/// Growable byte store with an explicit used-length cursor.
///
/// The allocation is kept zero-filled up to `capacity()`, so the unused tail
/// can be handed to a socket read without reallocating (see
/// [`read_from`](Self::read_from)). Growth doubles the
/// allocation and keeps every used byte at its original offset; the buffer
/// never shrinks on its own.
///
/// The slice returned by [`used`](Self::used) borrows the buffer, so it cannot
/// outlive the next mutating call.
#[derive(Debug, Clone, Default)]
pub struct IoBuffer {
    data: Vec<u8>,
    used: usize,
}

impl IoBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity],
            used: 0,
        }
    }

    /// Copies `bytes` past the used region, growing first if needed.
    pub fn append(&mut self, bytes: &[u8]) {
        self.reserve(bytes.len());
        let end = self.used + bytes.len();
        self.data[self.used..end].copy_from_slice(bytes);
        self.used = end;
    }

    pub fn used_len(&self) -> usize {
        self.used
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Forgets the used bytes; capacity is retained.
    pub fn reset(&mut self) {
        self.used = 0;
    }

    pub fn used(&self) -> &[u8] {
        &self.data[..self.used]
    }

    /// Ensures room for `additional` bytes past the used region.
    pub fn reserve(&mut self, additional: usize) {
        let required = self.used + additional;
        if required <= self.data.len() {
            return;
        }

        let grown = (self.data.len() * 2).max(required).max(MIN_CAPACITY);
        log::trace!("IoBuffer growing {} -> {} bytes", self.data.len(), grown);
        self.data.resize(grown, 0);
    }

    /// Performs one `read` into the space past the used region, taking at
    /// most `max` bytes. Returns the number of bytes added; `Ok(0)` with a
    /// non-zero `max` means the reader hit end of stream.
    pub fn read_from<R: Read + ?Sized>(&mut self, reader: &mut R, max: usize) -> io::Result<usize> {
        self.reserve(max);
        let start = self.used;
        let n = reader.read(&mut self.data[start..start + max])?.min(max);
        self.advance(n);
        Ok(n)
    }

    fn advance(&mut self, count: usize) {
        debug_assert!(self.used + count <= self.data.len());
        self.used = (self.used + count).min(self.data.len());
    }

    /// Drops used bytes past `len`. No-op when `len >= used_len()`.
    pub fn truncate(&mut self, len: usize) {
        self.used = self.used.min(len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn used_length_is_sum_of_appends_across_growth() {
        let mut buffer = IoBuffer::with_capacity(4);
        let mut expected = Vec::new();

        for i in 0..200u8 {
            let chunk: Vec<u8> = (0..=i % 7).map(|j| i.wrapping_add(j)).collect();
            buffer.append(&chunk);
            expected.extend_from_slice(&chunk);

            assert_eq!(buffer.used_len(), expected.len());
            assert!(buffer.used_len() <= buffer.capacity());
            assert_eq!(buffer.used(), expected.as_slice());
        }
    }

    #[test]
    fn growth_doubles_capacity() {
        let mut buffer = IoBuffer::with_capacity(MIN_CAPACITY);
        buffer.append(&[1; MIN_CAPACITY]);
        assert_eq!(buffer.capacity(), MIN_CAPACITY);

        buffer.append(&[2]);
        assert_eq!(buffer.capacity(), MIN_CAPACITY * 2);
        assert_eq!(buffer.used()[MIN_CAPACITY - 1], 1);
        assert_eq!(buffer.used()[MIN_CAPACITY], 2);
    }

    #[test]
    fn reset_keeps_capacity() {
        let mut buffer = IoBuffer::new();
        buffer.append(b"hello world");
        let capacity = buffer.capacity();

        buffer.reset();

        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), capacity);
        buffer.append(b"hi");
        assert_eq!(buffer.used(), b"hi");
    }

    #[test]
    fn read_from_fills_unused_tail_in_place() {
        let mut buffer = IoBuffer::with_capacity(2);
        buffer.append(b"ab");
        let mut source: &[u8] = b"cdefg";

        assert_eq!(buffer.read_from(&mut source, 3).unwrap(), 3);
        assert_eq!(buffer.used(), b"abcde");
        assert_eq!(source, b"fg");

        assert_eq!(buffer.read_from(&mut source, 8).unwrap(), 2);
        assert_eq!(buffer.read_from(&mut source, 8).unwrap(), 0);
        assert_eq!(buffer.used(), b"abcdefg");
    }

    #[test]
    fn truncate_only_shrinks_used_region() {
        let mut buffer = IoBuffer::new();
        buffer.append(b"abcdef");

        buffer.truncate(10);
        assert_eq!(buffer.used_len(), 6);

        buffer.truncate(2);
        assert_eq!(buffer.used(), b"ab");
    }

    /// Claims to have read more than it was offered.
    struct OverReportingReader;

    impl Read for OverReportingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            buf.fill(b'z');
            Ok(buf.len() + 10)
        }
    }

    #[test]
    fn read_from_never_grows_past_what_was_offered() {
        let mut buffer = IoBuffer::with_capacity(4);
        buffer.append(b"a");

        let n = buffer.read_from(&mut OverReportingReader, 2).unwrap();

        assert_eq!(n, 2);
        assert_eq!(buffer.used(), b"azz");
        assert!(buffer.used_len() <= buffer.capacity());
    }
}
