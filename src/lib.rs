//! detectserve - object detection over HTTP
//!
//! Streams multipart uploads into per-route parsers on the connection task
//! and runs the detection on a worker pool.

pub mod bbf;
pub mod buffer;
pub mod config;
pub mod form;
pub mod http;
pub mod server;
pub mod uri;
