use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::http::parser::{Progress, RequestParser, RequestSink};
use crate::http::request::Method;
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;
use crate::server::offload::{self, Job};
use crate::uri::{Dispatch, ParseEvent, Parsed, Registry};

/// The single in-flight request of a connection.
///
/// Resolves its route when the path arrives and forwards every later event
/// to that route. Lives on the connection task; only `parsed` ever leaves,
/// moved into the worker job.
pub struct Request {
    registry: Arc<Registry>,
    dispatcher: Option<Arc<dyn Dispatch>>,
    parsed: Option<Parsed>,
    path: String,
}

impl Request {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            dispatcher: None,
            parsed: None,
            path: String::new(),
        }
    }

    fn forward(&mut self, event: ParseEvent<'_>) {
        if let Some(dispatcher) = &self.dispatcher {
            dispatcher.feed(&mut self.parsed, event);
        }
    }

    /// Produces the response: 404 on the spot, otherwise via a worker.
    pub async fn respond(self, method: &Method) -> Response {
        let Some(dispatcher) = self.dispatcher else {
            info!(path = %self.path, "no route");
            return Response::not_found();
        };
        let Some(action) = dispatcher.route(method) else {
            info!(path = %self.path, method = ?method, "method not served by route");
            return Response::not_found();
        };
        offload::submit(Job {
            dispatch: dispatcher,
            action,
            parsed: self.parsed,
            path: self.path,
        })
        .wait()
        .await
    }
}

impl RequestSink for Request {
    fn on_path(&mut self, path: &[u8]) {
        self.path = String::from_utf8_lossy(path).into_owned();
        self.dispatcher = self.registry.find_bytes(path);
    }

    fn on_query_string(&mut self, query: &[u8]) {
        self.forward(ParseEvent::QueryString(query));
    }

    fn on_multipart_header_field(&mut self, chunk: &[u8], index: usize) {
        self.forward(ParseEvent::MultipartHeaderField(chunk, index));
    }

    fn on_multipart_header_value(&mut self, chunk: &[u8], index: usize) {
        self.forward(ParseEvent::MultipartHeaderValue(chunk, index));
    }

    fn on_part_data(&mut self, chunk: &[u8]) {
        self.forward(ParseEvent::MultipartData(chunk));
    }

    fn on_complete(&mut self) {
        self.forward(ParseEvent::Terminate);
    }
}

pub struct Connection<S> {
    stream: S,
    registry: Arc<Registry>,
    read_buffer_size: usize,
    max_header_bytes: usize,
    state: ConnectionState,
}

pub enum ConnectionState {
    Reading,
    Dispatching(Method, Request),
    Writing(Response),
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, registry: Arc<Registry>, cfg: &ServerConfig) -> Self {
        Self {
            stream,
            registry,
            read_buffer_size: cfg.read_buffer_size.max(1),
            max_header_bytes: cfg.max_header_bytes,
            state: ConnectionState::Reading,
        }
    }

    /// Serves one request, then closes.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            self.state = match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => self.read_request().await?,

                ConnectionState::Dispatching(method, request) => {
                    ConnectionState::Writing(request.respond(&method).await)
                }

                ConnectionState::Writing(response) => {
                    let written = ResponseWriter::new(response)
                        .write_to_stream(&mut self.stream)
                        .await?;
                    debug!(bytes = written, "response written");
                    ConnectionState::Closed
                }

                ConnectionState::Closed => {
                    break;
                }
            };
        }

        if let Err(e) = self.stream.shutdown().await {
            debug!(error = %e, "shutdown after response failed");
        }
        Ok(())
    }

    async fn read_request(&mut self) -> anyhow::Result<ConnectionState> {
        let mut parser = RequestParser::new(self.max_header_bytes);
        let mut request = Request::new(Arc::clone(&self.registry));
        let mut chunk = vec![0u8; self.read_buffer_size];

        loop {
            let n = self.stream.read(&mut chunk).await?;

            if n == 0 {
                debug!("client closed before the request completed");
                return Ok(ConnectionState::Closed);
            }

            match parser.execute(&chunk[..n], &mut request) {
                Ok(Progress::Complete) => {
                    let method = parser
                        .head()
                        .map(|head| head.method.clone())
                        .unwrap_or(Method::GET);
                    return Ok(ConnectionState::Dispatching(method, request));
                }
                Ok(Progress::Incomplete) => {}
                Err(e) => {
                    warn!(error = %e, "malformed request");
                    return Ok(ConnectionState::Writing(Response::bad_request()));
                }
            }
        }
    }
}
