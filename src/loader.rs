//! Async resource loading for scenes.
//!
//! A scene declares the text/binary resources it needs by logical name; the
//! host kicks off [`load_async`] and polls the returned [`LoadHandle`] once
//! per frame. Loading runs on a background thread via [`std::thread::spawn`]
//! and communicates only through an mpsc channel, so nothing in the render
//! loop blocks. All resources are resolved before the scene's `start` runs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

use thiserror::Error;

/// How a requested resource should be decoded.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    Text,
    Binary,
}

/// A single named resource request: where to read it and how to decode it.
#[derive(Debug, Clone)]
pub struct ResourceRequest {
    pub path: PathBuf,
    pub kind: ResourceKind,
}

impl ResourceRequest {
    pub fn text(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ResourceKind::Text,
        }
    }

    pub fn binary(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ResourceKind::Binary,
        }
    }
}

/// A resolved resource payload.
#[derive(Debug, Clone)]
pub enum Resource {
    Text(String),
    Binary(Vec<u8>),
}

/// Errors produced while resolving resource requests.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to load resource '{name}' from {path}: {source}")]
    Io {
        name: String,
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Resolved payloads, exposed to scenes by logical name.
#[derive(Debug, Default)]
pub struct ResourceMap {
    resources: HashMap<String, Resource>,
}

impl ResourceMap {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.resources.get(name) {
            Some(Resource::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn binary(&self, name: &str) -> Option<&[u8]> {
        match self.resources.get(name) {
            Some(Resource::Binary(bytes)) => Some(bytes),
            _ => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resources.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn insert(&mut self, name: impl Into<String>, resource: Resource) {
        self.resources.insert(name.into(), resource);
    }
}

/// The result of a completed load operation.
pub type LoadResult = Result<ResourceMap, LoadError>;

/// Receiver side of an in-flight load. Poll [`LoadHandle::try_recv`] once per
/// frame; it yields the result exactly once.
pub struct LoadHandle {
    receiver: mpsc::Receiver<LoadResult>,
}

impl LoadHandle {
    /// Returns the load result if loading has finished, `None` while still
    /// in flight. Never blocks.
    pub fn try_recv(&self) -> Option<LoadResult> {
        self.receiver.try_recv().ok()
    }
}

/// Starts resolving the given requests on a background thread.
///
/// The whole batch fails on the first unreadable resource; partial results
/// are never surfaced, so `start` can rely on every declared name being
/// present.
pub fn load_async(requests: HashMap<String, ResourceRequest>) -> LoadHandle {
    let (sender, receiver) = mpsc::channel();

    thread::spawn(move || {
        let result = load_all(requests);
        // The receiver may have been dropped (scene switch mid-load); that
        // just discards the result.
        let _ = sender.send(result);
    });

    LoadHandle { receiver }
}

fn load_all(requests: HashMap<String, ResourceRequest>) -> LoadResult {
    let mut resources = HashMap::with_capacity(requests.len());

    for (name, request) in requests {
        let payload = match request.kind {
            ResourceKind::Text => std::fs::read_to_string(&request.path).map(Resource::Text),
            ResourceKind::Binary => std::fs::read(&request.path).map(Resource::Binary),
        };
        match payload {
            Ok(resource) => {
                log::debug!("loaded resource '{name}' from {}", request.path.display());
                resources.insert(name, resource);
            }
            Err(source) => {
                return Err(LoadError::Io {
                    name,
                    path: request.path,
                    source,
                });
            }
        }
    }

    Ok(ResourceMap { resources })
}

/// Resolves an asset name against the crate's `assets/` directory.
pub fn asset_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("assets").join(name)
}
