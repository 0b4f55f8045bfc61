//! Handler offload and completion.
//!
//! A matched request is moved, whole, into a job on tokio's blocking pool.
//! The job runs the route callback and sends the response back through a
//! oneshot channel to the connection task, which alone touches the socket.

use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{debug, error, warn};

use crate::http::response::Response;
use crate::uri::{Action, Dispatch, Parsed};

/// Everything a worker needs to run one request.
pub struct Job {
    pub dispatch: Arc<dyn Dispatch>,
    pub action: Action,
    pub parsed: Option<Parsed>,
    pub path: String,
}

impl Job {
    /// Runs the handler; failures become the fixed 400 response.
    pub fn run(self) -> Response {
        match self.dispatch.execute(self.action, self.parsed) {
            Ok(response) => response,
            Err(e) => {
                warn!(path = %self.path, error = %e, "handler rejected request");
                Response::bad_request()
            }
        }
    }
}

/// Receiving end of a submitted job.
pub struct Completion {
    rx: oneshot::Receiver<Response>,
}

impl Completion {
    /// Waits for the worker's response.
    ///
    /// A worker that ends without answering (a panicking handler) yields the
    /// fixed 500 response.
    pub async fn wait(self) -> Response {
        match self.rx.await {
            Ok(response) => response,
            Err(_) => {
                error!("worker finished without a response");
                Response::internal_error()
            }
        }
    }
}

/// Hands `job` to the blocking pool without waiting for it.
pub fn submit(job: Job) -> Completion {
    let (tx, rx) = oneshot::channel();
    debug!(path = %job.path, action = ?job.action, "offloading request");
    tokio::task::spawn_blocking(move || {
        let response = job.run();
        if let Err(response) = tx.send(response) {
            // connection went away; nothing will be written
            response.release();
        }
    });
    Completion { rx }
}
