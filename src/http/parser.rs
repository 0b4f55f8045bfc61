//! Incremental HTTP/1.1 request tokenizer.
//!
//! The request head is buffered until its blank line arrives, then the body
//! is streamed by `Content-Length`. Every piece is handed to a
//! [`RequestSink`] in wire order: path, query string, then for multipart
//! bodies the part header names, values and data, and finally completion.

use std::collections::HashMap;

use crate::http::multipart::{parse_boundary, MultipartError, MultipartScanner};
use crate::http::request::{Method, RequestHead};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("invalid request line")]
    InvalidRequest,
    #[error("unknown request method")]
    InvalidMethod,
    #[error("malformed header line")]
    InvalidHeader,
    #[error("invalid Content-Length")]
    InvalidContentLength,
    #[error("request head larger than {0} bytes")]
    HeadTooLarge(usize),
    #[error("Transfer-Encoding is not supported")]
    UnsupportedTransferEncoding,
    #[error(transparent)]
    Multipart(#[from] MultipartError),
}

/// Receives request pieces from [`RequestParser`], in order.
pub trait RequestSink {
    fn on_path(&mut self, path: &[u8]);
    fn on_query_string(&mut self, query: &[u8]);
    fn on_multipart_header_field(&mut self, chunk: &[u8], index: usize);
    fn on_multipart_header_value(&mut self, chunk: &[u8], index: usize);
    fn on_part_data(&mut self, chunk: &[u8]);
    fn on_complete(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Incomplete,
    Complete,
}

#[derive(Debug)]
enum Phase {
    Head,
    Body {
        remaining: usize,
        multipart: Option<MultipartScanner>,
    },
    Done,
}

#[derive(Debug)]
pub struct RequestParser {
    phase: Phase,
    buffer: Vec<u8>,
    max_head: usize,
    head: Option<RequestHead>,
}

impl RequestParser {
    pub fn new(max_head: usize) -> Self {
        Self {
            phase: Phase::Head,
            buffer: Vec::new(),
            max_head,
            head: None,
        }
    }

    /// The parsed request line and headers, once available.
    pub fn head(&self) -> Option<&RequestHead> {
        self.head.as_ref()
    }

    /// Feeds the next bytes read from the connection.
    ///
    /// Bytes past the end of the body are ignored; one connection carries one
    /// request.
    pub fn execute<S: RequestSink>(&mut self, input: &[u8], sink: &mut S) -> Result<Progress, ParseError> {
        match self.phase {
            Phase::Head => self.execute_head(input, sink),
            Phase::Body { .. } => self.execute_body(input, sink),
            Phase::Done => Ok(Progress::Complete),
        }
    }

    fn execute_head<S: RequestSink>(&mut self, input: &[u8], sink: &mut S) -> Result<Progress, ParseError> {
        let search_from = self.buffer.len().saturating_sub(3);
        self.buffer.extend_from_slice(input);

        let Some(headers_end) = find_headers_end(&self.buffer[search_from..]).map(|p| p + search_from)
        else {
            if self.buffer.len() > self.max_head {
                return Err(ParseError::HeadTooLarge(self.max_head));
            }
            return Ok(Progress::Incomplete);
        };
        if headers_end + 4 > self.max_head {
            return Err(ParseError::HeadTooLarge(self.max_head));
        }

        let body = self.buffer.split_off(headers_end + 4);
        let head = parse_head(&self.buffer[..headers_end])?;
        self.buffer = Vec::new();

        let content_length = head
            .header("Content-Length")
            .map(|v| v.trim().parse::<usize>().map_err(|_| ParseError::InvalidContentLength))
            .transpose()?
            .unwrap_or(0);
        if head.header("Transfer-Encoding").is_some() {
            return Err(ParseError::UnsupportedTransferEncoding);
        }
        let multipart = match head.header("Content-Type") {
            Some(content_type) => parse_boundary(content_type)?.map(|b| MultipartScanner::new(&b)),
            None => None,
        };

        sink.on_path(head.path.as_bytes());
        if let Some(query) = head.query.as_deref().filter(|q| !q.is_empty()) {
            sink.on_query_string(query.as_bytes());
        }
        self.head = Some(head);
        self.phase = Phase::Body {
            remaining: content_length,
            multipart,
        };
        self.execute_body(&body, sink)
    }

    fn execute_body<S: RequestSink>(&mut self, input: &[u8], sink: &mut S) -> Result<Progress, ParseError> {
        let Phase::Body { remaining, multipart } = &mut self.phase else {
            return Ok(Progress::Complete);
        };
        let take = input.len().min(*remaining);
        if let Some(scanner) = multipart.as_mut() {
            scanner.feed(&input[..take], sink)?;
        }
        *remaining -= take;
        if *remaining > 0 {
            return Ok(Progress::Incomplete);
        }
        if let Some(scanner) = multipart.as_mut() {
            if !scanner.is_finished() {
                tracing::debug!("multipart body ended without a closing boundary");
            }
            scanner.finish(sink);
        }
        self.phase = Phase::Done;
        sink.on_complete();
        Ok(Progress::Complete)
    }
}

/// Parses the request line and headers (without the blank line).
pub fn parse_head(buf: &[u8]) -> Result<RequestHead, ParseError> {
    let headers_str = std::str::from_utf8(buf)
        .map_err(|_| ParseError::InvalidRequest)?;

    let mut lines = headers_str.split("\r\n");

    // Request line
    let request_line = lines.next().ok_or(ParseError::InvalidRequest);
    let mut parts = request_line?.split_whitespace();

    let method_str = parts.next().ok_or(ParseError::InvalidRequest)?;
    let target = parts.next().ok_or(ParseError::InvalidRequest)?;
    let version = parts.next().ok_or(ParseError::InvalidRequest)?;

    let method = Method::from_str(method_str).ok_or(ParseError::InvalidMethod)?;
    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, Some(query.to_string())),
        None => (target, None),
    };

    // Headers
    let mut headers = HashMap::new();

    for line in lines {
        if line.is_empty() {
            continue;
        }

        let (key, value) = line
            .split_once(':')
            .ok_or(ParseError::InvalidHeader)?;

        headers.insert(
           key.trim().to_string(),
           value.trim().to_string(),
        );
    }

    Ok(RequestHead {
        method,
        path: path.to_string(),
        query,
        version: version.to_string(),
        headers,
    })
}

fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|w| w == b"\r\n\r\n")
}
