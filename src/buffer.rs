//! Bounded message buffer.
//!
//! Holds exactly the bytes read from the peer and nothing more. The buffer
//! grows on demand up to its limit; callers only ever see the valid prefix,
//! so there is no terminator to rely on and no stale trailing data.

use bytes::{Bytes, BytesMut};
use std::borrow::Cow;
use std::io::{self, Read};

/// Default receive limit in bytes.
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 1024;

/// A growable byte buffer with a hard upper bound.
#[derive(Debug)]
pub struct MessageBuffer {
    data: BytesMut,
    limit: usize,
}

impl MessageBuffer {
    /// Create an empty buffer that will never hold more than `limit` bytes.
    pub fn new(limit: usize) -> Self {
        Self {
            data: BytesMut::new(),
            limit,
        }
    }

    /// Maximum number of bytes this buffer accepts.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Bytes that can still be read before the limit is reached.
    pub fn remaining(&self) -> usize {
        self.limit - self.data.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.remaining() == 0
    }

    /// The bytes read so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Lossy UTF-8 view of exactly the bytes read.
    pub fn to_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }

    /// Perform a single read from `source`, appending at most `remaining()`
    /// bytes.
    ///
    /// Returns the number of bytes read. Zero means the source reached end
    /// of stream, or that the buffer is already full. Interrupted reads are
    /// retried.
    pub fn read_from<R: Read + ?Sized>(&mut self, source: &mut R) -> io::Result<usize> {
        let want = self.remaining();
        if want == 0 {
            return Ok(0);
        }

        let start = self.data.len();
        self.data.resize(start + want, 0);

        let result = loop {
            match source.read(&mut self.data[start..start + want]) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => break other,
            }
        };

        // Keep only what was actually read
        let n = *result.as_ref().unwrap_or(&0);
        self.data.truncate(start + n);
        result
    }

    /// Take the contents, leaving the buffer empty with the same limit.
    pub fn take(&mut self) -> Bytes {
        self.data.split().freeze()
    }
}
