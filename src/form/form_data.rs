//! `Content-Disposition` name extraction for multipart part headers.
//!
//! Header names and values arrive in chunks, tagged with the header's index
//! within the part. The parser watches for the `Content-Disposition` header
//! and hands back the bytes of its `name` parameter as they stream past.

const FIELD_CAPACITY: usize = 32;
const KEY_CAPACITY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueState {
    /// Not a Content-Disposition value, or nothing left to find.
    Ignore,
    ParamStart,
    Key,
    ValueStart,
    QuotedName,
    BareName,
    SkipQuoted,
    SkipBare,
}

#[derive(Debug, Clone)]
pub struct FormDataParser {
    index: Option<usize>,
    field: [u8; FIELD_CAPACITY],
    field_len: usize,
    field_overflow: bool,
    in_value: bool,
    value: ValueState,
    key: [u8; KEY_CAPACITY],
    key_len: usize,
    key_overflow: bool,
    key_is_name: bool,
}

impl Default for FormDataParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FormDataParser {
    pub fn new() -> Self {
        Self {
            index: None,
            field: [0; FIELD_CAPACITY],
            field_len: 0,
            field_overflow: false,
            in_value: false,
            value: ValueState::Ignore,
            key: [0; KEY_CAPACITY],
            key_len: 0,
            key_overflow: false,
            key_is_name: false,
        }
    }

    fn begin_header(&mut self, index: usize) {
        self.index = Some(index);
        self.field_len = 0;
        self.field_overflow = false;
        self.in_value = false;
        self.value = ValueState::Ignore;
    }

    /// Feeds a chunk of the header name at `index`.
    pub fn header_field(&mut self, chunk: &[u8], index: usize) {
        if self.in_value || self.index != Some(index) {
            self.begin_header(index);
        }
        let room = FIELD_CAPACITY - self.field_len;
        if chunk.len() > room {
            self.field_overflow = true;
            return;
        }
        self.field[self.field_len..self.field_len + chunk.len()].copy_from_slice(chunk);
        self.field_len += chunk.len();
    }

    /// Feeds a chunk of the header value at `index`.
    ///
    /// Returns the part of `chunk` that belongs to the part name, if any. A
    /// name split across chunks comes back in pieces, in order.
    pub fn header_value<'a>(&mut self, chunk: &'a [u8], index: usize) -> Option<&'a [u8]> {
        if self.index != Some(index) {
            // value with no name seen for this header
            self.begin_header(index);
            self.field_overflow = true;
        }
        if !self.in_value {
            self.in_value = true;
            self.value = if self.is_disposition() {
                ValueState::ParamStart
            } else {
                ValueState::Ignore
            };
        }
        self.scan_value(chunk)
    }

    fn is_disposition(&self) -> bool {
        !self.field_overflow
            && self.field[..self.field_len].eq_ignore_ascii_case(b"content-disposition")
    }

    fn push_key(&mut self, b: u8) {
        if self.key_len == KEY_CAPACITY {
            self.key_overflow = true;
        } else {
            self.key[self.key_len] = b;
            self.key_len += 1;
        }
    }

    fn scan_value<'a>(&mut self, chunk: &'a [u8]) -> Option<&'a [u8]> {
        let mut run = match self.value {
            ValueState::QuotedName | ValueState::BareName => Some(0),
            _ => None,
        };
        for (i, &b) in chunk.iter().enumerate() {
            match self.value {
                ValueState::Ignore => return None,
                ValueState::ParamStart => {
                    if !matches!(b, b' ' | b'\t' | b';') {
                        self.key_len = 0;
                        self.key_overflow = false;
                        self.value = ValueState::Key;
                        self.push_key(b);
                    }
                }
                ValueState::Key => match b {
                    b'=' => {
                        self.key_is_name =
                            !self.key_overflow && self.key[..self.key_len].eq_ignore_ascii_case(b"name");
                        self.value = ValueState::ValueStart;
                    }
                    b';' => self.value = ValueState::ParamStart,
                    b' ' | b'\t' => {}
                    _ => self.push_key(b),
                },
                ValueState::ValueStart => match (b, self.key_is_name) {
                    (b' ' | b'\t', _) => {}
                    (b'"', true) => {
                        self.value = ValueState::QuotedName;
                        run = Some(i + 1);
                    }
                    (b'"', false) => self.value = ValueState::SkipQuoted,
                    (b';', _) => self.value = ValueState::ParamStart,
                    (_, true) => {
                        self.value = ValueState::BareName;
                        run = Some(i);
                    }
                    (_, false) => self.value = ValueState::SkipBare,
                },
                ValueState::QuotedName => {
                    if b == b'"' {
                        self.value = ValueState::Ignore;
                        return run.map(|start| &chunk[start..i]).filter(|s| !s.is_empty());
                    }
                }
                ValueState::BareName => {
                    if matches!(b, b';' | b' ' | b'\t') {
                        self.value = ValueState::Ignore;
                        return run.map(|start| &chunk[start..i]).filter(|s| !s.is_empty());
                    }
                }
                ValueState::SkipQuoted => {
                    if b == b'"' {
                        self.value = ValueState::SkipBare;
                    }
                }
                ValueState::SkipBare => {
                    if b == b';' {
                        self.value = ValueState::ParamStart;
                    }
                }
            }
        }
        run.map(|start| &chunk[start..]).filter(|s| !s.is_empty())
    }
}
