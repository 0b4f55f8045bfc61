//! HTTP protocol implementation.
//!
//! This module implements a one-request-per-connection HTTP/1.1 server whose
//! request bodies are streamed rather than buffered.
//!
//! # Architecture
//!
//! - **`connection`**: Per-connection state machine and the in-flight request
//! - **`parser`**: Incremental tokenizer emitting request events in order
//! - **`multipart`**: Streaming `multipart/form-data` boundary scanner
//! - **`request`**: Request method and head
//! - **`response`**: Serialised responses with their release hook
//! - **`writer`**: Writes a response to the client, then releases it
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Feed socket bytes to the tokenizer
//!        └──────┬──────┘
//!               │ Request complete
//!               ▼
//!        ┌──────────────────┐
//!        │   Dispatching    │ ← 404 at once, or wait for the worker
//!        └──────┬───────────┘
//!               │ Response ready
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← Send response, then release it
//!        └──────┬───────────┘
//!               │
//!               └─ Closed
//! ```

pub mod connection;
pub mod multipart;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
