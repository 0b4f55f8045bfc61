const TOKEN_CAPACITY: usize = 5;

/// Matches a case-sensitive truthy token.
///
/// `true` and `1` are truthy. Anything else, including text longer than
/// any accepted token, yields `false`.
#[derive(Debug, Clone, Default)]
pub struct BoolParser {
    token: [u8; TOKEN_CAPACITY],
    len: usize,
    overflow: bool,
}

impl BoolParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn execute(&mut self, chunk: &[u8]) {
        for &b in chunk {
            if self.len == TOKEN_CAPACITY {
                self.overflow = true;
                return;
            }
            self.token[self.len] = b;
            self.len += 1;
        }
    }

    pub fn result(&self) -> bool {
        !self.overflow && matches!(&self.token[..self.len], b"true" | b"1")
    }
}
