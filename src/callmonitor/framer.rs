//! Line framing for the call monitor byte stream
//!
//! The router sends one record per line. TCP delivers those lines in
//! arbitrary chunks, so the framer accumulates bytes across reads and hands
//! out complete lines once a line feed arrives.

/// Default line buffer size in bytes
pub const DEFAULT_LINE_CAPACITY: usize = 1024;

const CARRIAGE_RETURN: u8 = 0x0d;
const LINE_FEED: u8 = 0x0a;

/// Fixed-capacity line buffer fed from the call monitor socket
///
/// The buffer holds at most `capacity - 1` bytes. When a byte arrives while
/// the buffer is at that limit, the accumulated bytes are flushed as a line
/// and the arriving byte is consumed by the flush. Carriage returns are
/// dropped wherever they appear.
#[derive(Debug, Clone)]
pub struct LineFramer {
    buffer: Vec<u8>,
    capacity: usize,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineFramer {
    /// Create a framer with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LINE_CAPACITY)
    }

    /// Create a framer with a custom capacity (at least 2 bytes)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            buffer: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Buffer capacity including the reserved terminator slot
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of bytes waiting for a line terminator
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Discard any partially received line
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Take the buffered bytes as a line and leave the buffer empty
    pub fn take_line(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();
        line
    }

    /// Feed a chunk of bytes, yielding each line it completes in byte order
    ///
    /// Bytes after the last terminator stay buffered for the next call.
    /// Empty lines are yielded too; the record parser rejects them.
    pub fn feed<'a>(&'a mut self, data: &'a [u8]) -> FramedLines<'a> {
        FramedLines {
            framer: self,
            input: data,
            position: 0,
        }
    }

    fn is_full(&self) -> bool {
        self.buffer.len() >= self.capacity - 1
    }
}

/// Lazy iterator over the lines completed by one [`LineFramer::feed`] call
///
/// Dropping the iterator early leaves the unconsumed input unprocessed.
pub struct FramedLines<'a> {
    framer: &'a mut LineFramer,
    input: &'a [u8],
    position: usize,
}

impl Iterator for FramedLines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        while self.position < self.input.len() {
            let byte = self.input[self.position];
            self.position += 1;

            if byte == CARRIAGE_RETURN {
                continue;
            }
            if byte == LINE_FEED || self.framer.is_full() {
                return Some(self.framer.take_line());
            }
            self.framer.buffer.push(byte);
        }
        None
    }
}
