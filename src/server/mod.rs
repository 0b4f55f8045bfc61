//! Listener and worker offload.
//!
//! Connections are served on the runtime's core thread; route handlers run on
//! the blocking pool (see [`offload`]).

pub mod listener;
pub mod offload;

use crate::bbf::{DetectObjects, Models, DETECT_OBJECTS_PATH};
use crate::uri::Registry;

/// Builds the service's route table around the preloaded models.
pub fn routes(models: Models) -> Registry {
    Registry::builder()
        .route(DETECT_OBJECTS_PATH, DetectObjects::init(models))
        .build()
}
