/// Bytes a string field may hold before it is flagged as overflowed.
pub const STRING_CAPACITY: usize = 16;

/// Copies a short string field into a fixed buffer.
///
/// Once more than [`STRING_CAPACITY`] bytes arrive the parser flags
/// overflow and ignores the rest; callers must then discard the field.
#[derive(Debug, Clone, Default)]
pub struct StringParser {
    buf: [u8; STRING_CAPACITY],
    len: usize,
    overflow: bool,
}

impl StringParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn execute(&mut self, chunk: &[u8]) {
        if self.overflow {
            return;
        }
        if self.len + chunk.len() > STRING_CAPACITY {
            self.overflow = true;
            return;
        }
        self.buf[self.len..self.len + chunk.len()].copy_from_slice(chunk);
        self.len += chunk.len();
    }

    pub fn is_overflow(&self) -> bool {
        self.overflow
    }

    /// The collected bytes, or `None` after overflow.
    pub fn result(&self) -> Option<&[u8]> {
        (!self.overflow).then(|| &self.buf[..self.len])
    }
}
