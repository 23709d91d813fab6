use bytes::BytesMut;
use memchr::memchr;

/// Size of a session's input accumulation buffer.
pub const READ_BLOCK: usize = 8096;

/// A complete line taken off the front of an input buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framed {
    /// Printable ASCII content of the line, terminator excluded.
    pub line: String,
    /// Bytes removed from the buffer, terminator included.
    pub consumed: usize,
    /// The line held more than `max_line` printable bytes and was cut.
    pub truncated: bool,
}

/// Take the first `\n`-terminated line off the front of `buf`.
///
/// Returns `None` (consuming nothing) when no terminator has arrived yet.
/// Control and non-ASCII bytes are dropped from the copy; at most `max_line`
/// bytes are kept. Bytes after the terminator stay in `buf`.
pub fn frame(buf: &mut BytesMut, max_line: usize) -> Option<Framed> {
    let i = memchr(b'\n', buf)?;
    let raw = buf.split_to(i + 1);

    let mut line = String::with_capacity(i.min(max_line));
    let mut truncated = false;
    for &b in &raw[..i] {
        if !b.is_ascii() || b.is_ascii_control() {
            continue;
        }
        if line.len() == max_line {
            truncated = true;
            break;
        }
        line.push(b as char);
    }

    Some(Framed {
        line,
        consumed: raw.len(),
        truncated,
    })
}

/// Bounded accumulation buffer for one connection's inbound bytes.
///
/// A partial line survives across reads. When the buffer fills up without a
/// terminator the pending bytes can never form a line, so `make_room` throws
/// them away and reports how many were lost.
#[derive(Debug)]
pub struct LineBuffer {
    buf: BytesMut,
    cap: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::with_capacity(READ_BLOCK)
    }

    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.max(2);
        Self {
            buf: BytesMut::with_capacity(cap),
            cap,
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Free bytes left before the buffer is full.
    pub fn spare(&self) -> usize {
        self.cap - self.buf.len()
    }

    /// Ensure the next read has somewhere to go.
    ///
    /// Returns `Some(discarded)` when the buffer was full and had to be
    /// emptied.
    pub fn make_room(&mut self) -> Option<usize> {
        if self.spare() > 0 {
            return None;
        }
        let discarded = self.buf.len();
        self.buf.clear();
        Some(discarded)
    }

    /// Append freshly read bytes. Anything beyond `spare()` is dropped and
    /// counted in the return value.
    pub fn extend(&mut self, data: &[u8]) -> usize {
        let take = data.len().min(self.spare());
        self.buf.extend_from_slice(&data[..take]);
        data.len() - take
    }

    /// Next complete line, if any. Lines are cut to the buffer size.
    pub fn next_line(&mut self) -> Option<Framed> {
        frame(&mut self.buf, self.cap - 1)
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}
