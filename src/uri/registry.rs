//! Exact-path route registry
//!
//! Built once before the listener starts and read-only afterwards. Each
//! handler is constructed (its context loaded) by the caller and handed to
//! [`RegistryBuilder::route`]; the finished registry is shared behind an
//! `Arc` by every connection for the life of the process.

use std::collections::HashMap;
use std::sync::Arc;

use super::{Dispatch, UriHandler};

/// Builder collecting routes before the registry is frozen.
#[derive(Default)]
pub struct RegistryBuilder {
    routes: HashMap<String, Arc<dyn Dispatch>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` at `path`, replacing any earlier handler there.
    pub fn route<H: UriHandler>(mut self, path: impl Into<String>, handler: H) -> Self {
        let path = path.into();
        tracing::debug!(path = %path, "route registered");
        self.routes.insert(path, Arc::new(handler));
        self
    }

    pub fn build(self) -> Registry {
        Registry {
            routes: self.routes,
        }
    }
}

/// Immutable mapping from request path to route.
pub struct Registry {
    routes: HashMap<String, Arc<dyn Dispatch>>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Looks up `path` by exact match.
    pub fn find(&self, path: &str) -> Option<Arc<dyn Dispatch>> {
        self.routes.get(path).cloned()
    }

    /// Looks up a raw path; non-UTF-8 paths never match.
    pub fn find_bytes(&self, path: &[u8]) -> Option<Arc<dyn Dispatch>> {
        std::str::from_utf8(path).ok().and_then(|p| self.find(p))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }
}
