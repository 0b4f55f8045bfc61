//! Streaming `multipart/form-data` scanner.
//!
//! Splits a body into part header names, header values and part data as the
//! bytes arrive. Nothing is buffered beyond a partially matched boundary,
//! which is held back by count and replayed from the delimiter itself when
//! it turns out not to be a boundary.

use crate::http::parser::RequestSink;

/// RFC 2046 caps boundaries at 70 characters.
const MAX_BOUNDARY_LEN: usize = 70;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MultipartError {
    #[error("multipart Content-Type has no boundary")]
    MissingBoundary,
    #[error("multipart boundary is empty or too long")]
    InvalidBoundary,
    #[error("malformed multipart body")]
    Malformed,
}

/// Extracts the boundary from a `multipart/form-data` Content-Type value.
///
/// Returns `Ok(None)` for any other media type.
pub fn parse_boundary(content_type: &str) -> Result<Option<String>, MultipartError> {
    let content_type = content_type.trim();
    let main = content_type.split(';').next().unwrap_or("").trim();
    if !main.eq_ignore_ascii_case("multipart/form-data") {
        return Ok(None);
    }

    for part in content_type.split(';').skip(1) {
        let Some((k, v)) = part.trim().split_once('=') else {
            continue;
        };
        if k.trim().eq_ignore_ascii_case("boundary") {
            let boundary = v.trim().trim_matches('"');
            if boundary.is_empty() || boundary.len() > MAX_BOUNDARY_LEN {
                return Err(MultipartError::InvalidBoundary);
            }
            return Ok(Some(boundary.to_string()));
        }
    }

    Err(MultipartError::MissingBoundary)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderState {
    LineStart,
    Field,
    ValueSpace,
    Value,
    LineFeed,
    EndFeed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Preamble,
    AfterBoundary,
    Headers(HeaderState),
    Data,
    Epilogue,
}

#[derive(Debug)]
pub struct MultipartScanner {
    /// `\r\n--` followed by the boundary.
    delimiter: Vec<u8>,
    state: State,
    /// Delimiter bytes matched so far.
    matched: usize,
    /// Of `matched`, how many came from earlier chunks.
    carried: usize,
    boundary_tail: Option<u8>,
    header_index: usize,
    /// Some of the current header value went out in an earlier chunk.
    value_seen: bool,
}

impl MultipartScanner {
    pub fn new(boundary: &str) -> Self {
        let mut delimiter = Vec::with_capacity(boundary.len() + 4);
        delimiter.extend_from_slice(b"\r\n--");
        delimiter.extend_from_slice(boundary.as_bytes());
        // the first boundary has no leading CRLF; pretend it was seen
        Self {
            delimiter,
            state: State::Preamble,
            matched: 2,
            carried: 2,
            boundary_tail: None,
            header_index: 0,
            value_seen: false,
        }
    }

    /// True once the closing boundary has been read.
    pub fn is_finished(&self) -> bool {
        self.state == State::Epilogue
    }

    pub fn feed<S: RequestSink>(&mut self, input: &[u8], sink: &mut S) -> Result<(), MultipartError> {
        let mut at = 0;
        while at < input.len() {
            let rest = &input[at..];
            at += match self.state {
                State::Preamble | State::Data => self.scan_delimiter(rest, sink),
                State::AfterBoundary => self.after_boundary(rest)?,
                State::Headers(headers) => self.scan_headers(headers, rest, sink)?,
                State::Epilogue => rest.len(),
            };
        }
        Ok(())
    }

    /// Flushes a partial boundary left at the end of an unterminated body.
    pub fn finish<S: RequestSink>(&mut self, sink: &mut S) {
        if self.state == State::Data && self.carried > 0 {
            sink.on_part_data(&self.delimiter[..self.carried]);
        }
        self.carried = 0;
        self.matched = 0;
    }

    fn scan_delimiter<S: RequestSink>(&mut self, input: &[u8], sink: &mut S) -> usize {
        let emit = self.state == State::Data;
        let len = self.delimiter.len();
        let mut i = 0;
        while i < input.len() {
            if input[i] == self.delimiter[self.matched] {
                self.matched += 1;
                i += 1;
                if self.matched == len {
                    let begin = i - (len - self.carried);
                    if emit && begin > 0 {
                        sink.on_part_data(&input[..begin]);
                    }
                    self.matched = 0;
                    self.carried = 0;
                    self.state = State::AfterBoundary;
                    return i;
                }
            } else if self.matched > 0 {
                // '\r' only opens the delimiter, so restarting at 0 loses no match
                if emit && self.carried > 0 {
                    sink.on_part_data(&self.delimiter[..self.carried]);
                }
                self.matched = 0;
                self.carried = 0;
            } else {
                i += 1;
            }
        }
        let end = input.len() - (self.matched - self.carried);
        if emit && end > 0 {
            sink.on_part_data(&input[..end]);
        }
        self.carried = self.matched;
        input.len()
    }

    fn after_boundary(&mut self, input: &[u8]) -> Result<usize, MultipartError> {
        for (i, &b) in input.iter().enumerate() {
            match (self.boundary_tail, b) {
                (None, b' ' | b'\t') => {}
                (None, b'-' | b'\r') => self.boundary_tail = Some(b),
                (Some(b'-'), b'-') => {
                    self.boundary_tail = None;
                    self.state = State::Epilogue;
                    return Ok(i + 1);
                }
                (Some(b'\r'), b'\n') => {
                    self.boundary_tail = None;
                    self.header_index = 0;
                    self.state = State::Headers(HeaderState::LineStart);
                    return Ok(i + 1);
                }
                _ => return Err(MultipartError::Malformed),
            }
        }
        Ok(input.len())
    }

    fn scan_headers<S: RequestSink>(
        &mut self,
        mut state: HeaderState,
        input: &[u8],
        sink: &mut S,
    ) -> Result<usize, MultipartError> {
        let mut run = 0;
        let mut i = 0;
        while i < input.len() {
            let b = input[i];
            match state {
                HeaderState::LineStart => {
                    if b == b'\r' {
                        state = HeaderState::EndFeed;
                        i += 1;
                    } else {
                        state = HeaderState::Field;
                        run = i;
                    }
                }
                HeaderState::Field => match b {
                    b':' => {
                        if i > run {
                            sink.on_multipart_header_field(&input[run..i], self.header_index);
                        }
                        state = HeaderState::ValueSpace;
                        self.value_seen = false;
                        i += 1;
                    }
                    b'\r' | b'\n' => return Err(MultipartError::Malformed),
                    _ => i += 1,
                },
                HeaderState::ValueSpace => {
                    if matches!(b, b' ' | b'\t') {
                        i += 1;
                    } else {
                        state = HeaderState::Value;
                        run = i;
                    }
                }
                HeaderState::Value => {
                    if b == b'\r' {
                        // every header gets a value event, even an empty one
                        if i > run || !self.value_seen {
                            sink.on_multipart_header_value(&input[run..i], self.header_index);
                        }
                        state = HeaderState::LineFeed;
                    }
                    i += 1;
                }
                HeaderState::LineFeed => {
                    if b != b'\n' {
                        return Err(MultipartError::Malformed);
                    }
                    self.header_index += 1;
                    state = HeaderState::LineStart;
                    i += 1;
                }
                HeaderState::EndFeed => {
                    if b != b'\n' {
                        return Err(MultipartError::Malformed);
                    }
                    self.state = State::Data;
                    self.matched = 0;
                    self.carried = 0;
                    return Ok(i + 1);
                }
            }
        }
        match state {
            HeaderState::Field if input.len() > run => {
                sink.on_multipart_header_field(&input[run..], self.header_index);
            }
            HeaderState::Value if input.len() > run => {
                sink.on_multipart_header_value(&input[run..], self.header_index);
                self.value_seen = true;
            }
            _ => {}
        }
        self.state = State::Headers(state);
        Ok(input.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_quoted_and_bare() {
        assert_eq!(
            parse_boundary("multipart/form-data; boundary=abc").unwrap(),
            Some("abc".to_string())
        );
        assert_eq!(
            parse_boundary("multipart/form-data; Boundary=\"a b\"").unwrap(),
            Some("a b".to_string())
        );
        assert_eq!(parse_boundary("text/plain").unwrap(), None);
    }

    #[test]
    fn boundary_missing_or_too_long() {
        assert_eq!(
            parse_boundary("multipart/form-data"),
            Err(MultipartError::MissingBoundary)
        );
        let long = format!("multipart/form-data; boundary={}", "x".repeat(71));
        assert_eq!(parse_boundary(&long), Err(MultipartError::InvalidBoundary));
    }
}
