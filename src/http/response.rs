use std::fmt;

use bytes::Bytes;

use crate::buffer::GrowBuf;

/// HTTP status codes the service answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 400 Bad Request
    BadRequest,
    /// 404 Not Found
    NotFound,
    /// 500 Internal Server Error
    InternalServerError,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use detectserve::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::InternalServerError => 500,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }
}

pub const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";
pub const CONTENT_TYPE_HTML: &str = "text/html";

pub const HTTP_NOT_FOUND: &[u8] = b"HTTP/1.1 404 Not Found\r\nCache-Control: no-cache\r\nContent-Type: application/json; charset=utf-8\r\nContent-Length: 6\r\n\r\nfalse\n";

pub const HTTP_BAD_REQUEST: &[u8] = b"HTTP/1.1 400 Bad Request\r\nCache-Control: no-cache\r\nContent-Type: application/json; charset=utf-8\r\nContent-Length: 6\r\n\r\nfalse\n";

pub const HTTP_INTERNAL_ERROR: &[u8] = b"HTTP/1.1 500 Internal Server Error\r\nCache-Control: no-cache\r\nContent-Type: application/json; charset=utf-8\r\nContent-Length: 6\r\n\r\nfalse\n";

pub const HTTP_EMPTY_ARRAY: &[u8] = b"HTTP/1.1 200 OK\r\nCache-Control: no-cache\r\nContent-Type: application/json; charset=utf-8\r\nContent-Length: 3\r\n\r\n[]\n";

/// Runs once the response bytes have been written; receives the bytes back.
pub type ReleaseHook = Box<dyn FnOnce(Bytes) + Send + 'static>;

/// A complete, serialised HTTP response.
///
/// Static responses point at string literals and carry no release hook.
/// Heap-built responses always carry one. [`Response::release`] consumes
/// the value, so the hook can run at most once.
pub struct Response {
    data: Bytes,
    release: Option<ReleaseHook>,
}

impl Response {
    /// A response backed by a literal.
    pub fn fixed(data: &'static [u8]) -> Self {
        Self {
            data: Bytes::from_static(data),
            release: None,
        }
    }

    /// A heap-built response with its release hook.
    pub fn owned(data: Vec<u8>, release: ReleaseHook) -> Self {
        Self {
            data: Bytes::from(data),
            release: Some(release),
        }
    }

    /// Wraps an assembled buffer; its release hook frees the bytes.
    pub fn from_buf(buf: GrowBuf) -> Self {
        Self::owned(
            buf.into_vec(),
            Box::new(|data| tracing::trace!(bytes = data.len(), "response buffer released")),
        )
    }

    pub fn not_found() -> Self {
        Self::fixed(HTTP_NOT_FOUND)
    }

    pub fn bad_request() -> Self {
        Self::fixed(HTTP_BAD_REQUEST)
    }

    pub fn internal_error() -> Self {
        Self::fixed(HTTP_INTERNAL_ERROR)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn has_release(&self) -> bool {
        self.release.is_some()
    }

    /// Consumes the response and runs its release hook, if any.
    pub fn release(self) {
        if let Some(hook) = self.release {
            hook(self.data);
        }
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("len", &self.data.len())
            .field("release", &self.release.is_some())
            .finish()
    }
}
