use mdbwire_core::{DriverError, EncodeError};

use crate::buffer::IoBuffer;

/// Destination for sealed frames.
pub trait FrameSink {
    /// Writes every byte or fails; a short write never reports success.
    fn send_all(&mut self, bytes: &[u8]) -> Result<(), DriverError>;
}

impl FrameSink for Vec<u8> {
    fn send_all(&mut self, bytes: &[u8]) -> Result<(), DriverError> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

/// Outgoing request buffer.
///
/// Bytes are appended by the encoder, [`seal`](Self::seal) marks the end of a
/// complete self-delimited frame, and [`flush`](Self::flush) hands every
/// sealed byte to a [`FrameSink`] before resetting for reuse. Several frames
/// may be sealed before a single flush.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buffer: IoBuffer,
    sealed_len: usize,
    sealed_frames: usize,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: IoBuffer::with_capacity(capacity),
            ..Self::default()
        }
    }

    pub fn append(&mut self, bytes: &[u8]) {
        self.buffer.append(bytes);
    }

    /// Marks everything appended so far as one complete frame.
    pub fn seal(&mut self) {
        self.sealed_len = self.buffer.used_len();
        self.sealed_frames += 1;
    }

    /// True when there is at least one frame and nothing after the last seal.
    pub fn is_sealed(&self) -> bool {
        self.sealed_frames > 0 && self.sealed_len == self.buffer.used_len()
    }

    pub fn sealed_frames(&self) -> usize {
        self.sealed_frames
    }

    pub fn used_len(&self) -> usize {
        self.buffer.used_len()
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    pub fn bytes(&self) -> &[u8] {
        self.buffer.used()
    }

    /// Sends all sealed bytes and resets the buffer, keeping its capacity.
    ///
    /// Fails without sending when bytes were appended after the last seal. On
    /// a sink error the contents are left in place and the caller should
    /// [`discard`](Self::discard) them.
    pub fn flush<S: FrameSink + ?Sized>(&mut self, sink: &mut S) -> Result<(), DriverError> {
        let unsealed = self.buffer.used_len() - self.sealed_len;
        if unsealed > 0 {
            return Err(EncodeError::UnsealedFrame { unsealed }.into());
        }

        if self.buffer.is_empty() {
            return Ok(());
        }

        log::debug!(
            "Flushing {} frame(s), {} bytes",
            self.sealed_frames,
            self.buffer.used_len()
        );
        sink.send_all(self.buffer.used())?;
        self.discard();
        Ok(())
    }

    /// Drops all contents, sealed or not.
    pub fn discard(&mut self) {
        self.buffer.reset();
        self.sealed_len = 0;
        self.sealed_frames = 0;
    }
}
