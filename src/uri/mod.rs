//! Route handlers and the dispatch registry.
//!
//! A route is a [`UriHandler`]: its value is the long-lived handler context
//! shared by every request, and its `Parsed` type is the per-request state
//! built from parse events on the connection task and then moved, whole,
//! into `get`/`post` on a worker thread.

pub mod registry;

use std::any::Any;
use std::collections::TryReserveError;

use crate::http::request::Method;
use crate::http::response::Response;

pub use registry::{Registry, RegistryBuilder};

/// One incremental piece of a request, as seen by a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseEvent<'a> {
    QueryString(&'a [u8]),
    /// Chunk of a part header name, with the header's index in its part.
    MultipartHeaderField(&'a [u8], usize),
    /// Chunk of a part header value, with the header's index in its part.
    MultipartHeaderValue(&'a [u8], usize),
    MultipartData(&'a [u8]),
    /// The request is complete; commit any field still open.
    Terminate,
}

/// Why a handler refused a request. Every variant is answered with 400.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("route does not serve this method")]
    Unsupported,
    #[error("request carried no source payload")]
    MissingSource,
    #[error("source payload is not a decodable image: {0}")]
    Undecodable(#[from] image::ImageError),
    #[error("no model selected for detection")]
    NoModel,
    #[error("detection failed")]
    DetectionFailed,
    #[error("out of memory buffering request: {0}")]
    Alloc(#[from] TryReserveError),
    #[error("parsed state does not belong to this route")]
    StateMismatch,
}

pub type HandlerResult = Result<Response, HandlerError>;

/// What a matched request will run on the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Get,
    Post,
    Intro,
}

/// A route's callbacks.
///
/// `supports` decides which of `get`/`post` exist; the defaults describe a
/// route that serves nothing.
pub trait UriHandler: Send + Sync + 'static {
    type Parsed: Send + 'static;

    /// Fresh per-request state, created on the first parse event.
    fn parsed(&self) -> Self::Parsed;

    fn parse(&self, parsed: &mut Self::Parsed, event: ParseEvent<'_>);

    fn supports(&self, _method: &Method) -> bool {
        false
    }

    fn get(&self, _parsed: Self::Parsed) -> HandlerResult {
        Err(HandlerError::Unsupported)
    }

    fn post(&self, _parsed: Self::Parsed) -> HandlerResult {
        Err(HandlerError::Unsupported)
    }

    /// Describes the route to a bare GET when it has no `get`.
    fn intro(&self) -> Option<Response> {
        None
    }
}

/// Type-erased parsed state.
pub type Parsed = Box<dyn Any + Send>;

/// Object-safe face of a [`UriHandler`], as stored in the registry.
pub trait Dispatch: Send + Sync {
    /// Forwards an event, creating the parsed state on first use.
    fn feed(&self, parsed: &mut Option<Parsed>, event: ParseEvent<'_>);

    /// Picks the callback for `method`; `None` means 404.
    ///
    /// POST falls back to `get` when the route has no `post`; GET falls back
    /// to `intro`.
    fn route(&self, method: &Method) -> Option<Action>;

    fn execute(&self, action: Action, parsed: Option<Parsed>) -> HandlerResult;
}

impl<H: UriHandler> Dispatch for H {
    fn feed(&self, parsed: &mut Option<Parsed>, event: ParseEvent<'_>) {
        let state = parsed.get_or_insert_with(|| Box::new(self.parsed()));
        if let Some(state) = state.downcast_mut::<H::Parsed>() {
            self.parse(state, event);
        }
    }

    fn route(&self, method: &Method) -> Option<Action> {
        match method {
            Method::POST if self.supports(&Method::POST) => Some(Action::Post),
            Method::POST | Method::GET if self.supports(&Method::GET) => Some(Action::Get),
            Method::GET if self.intro().is_some() => Some(Action::Intro),
            _ => None,
        }
    }

    fn execute(&self, action: Action, parsed: Option<Parsed>) -> HandlerResult {
        if action == Action::Intro {
            return self.intro().ok_or(HandlerError::Unsupported);
        }
        let parsed = match parsed {
            Some(state) => *state
                .downcast::<H::Parsed>()
                .map_err(|_| HandlerError::StateMismatch)?,
            None => self.parsed(),
        };
        match action {
            Action::Get => self.get(parsed),
            Action::Post => self.post(parsed),
            Action::Intro => Err(HandlerError::Unsupported),
        }
    }
}
