//! Static file serving from fixed and dynamic document roots.
//!
//! Both kinds of root are ordinary [`RequestHandler`]s: a file that exists
//! under the root is streamed back, anything else is "no opinion".

use crate::http::{Request, Response};
use crate::routing::RequestHandler;

use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, warn};

/// Produces a root directory at request time.
pub type PathSupplier = dyn Fn() -> PathBuf + Send + Sync;

/// Serves files found under one fixed directory.
#[derive(Debug, Clone)]
pub struct DocumentRoot {
    root: PathBuf,
}

impl DocumentRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl RequestHandler for DocumentRoot {
    fn handle(&self, request: &Request) -> Option<Response> {
        serve_from(&self.root, &request.path)
    }
}

/// Named roots whose directory is recomputed on every request.
///
/// Roots are consulted in registration order and the first root holding the
/// requested file wins. Re-registering a name swaps its supplier in place.
#[derive(Default)]
pub struct DynamicRoots {
    roots: RwLock<Vec<(String, Arc<PathSupplier>)>>,
}

impl DynamicRoots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<F>(&self, name: impl Into<String>, supplier: F)
    where
        F: Fn() -> PathBuf + Send + Sync + 'static,
    {
        let name = name.into();
        let supplier: Arc<PathSupplier> = Arc::new(supplier);
        let mut roots = self.roots.write().unwrap_or_else(PoisonError::into_inner);

        match roots.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => {
                debug!("Replacing dynamic root {name}");
                entry.1 = supplier;
            }
            None => {
                debug!("Adding dynamic root {name}");
                roots.push((name, supplier));
            }
        }
    }

    pub fn remove(&self, name: &str) -> bool {
        let mut roots = self.roots.write().unwrap_or_else(PoisonError::into_inner);
        let before = roots.len();
        roots.retain(|(existing, _)| existing != name);
        roots.len() != before
    }

    pub fn names(&self) -> Vec<String> {
        self.roots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.roots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RequestHandler for DynamicRoots {
    fn handle(&self, request: &Request) -> Option<Response> {
        // Suppliers run outside the lock; they are application code.
        let roots = self
            .roots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        roots.iter().find_map(|(name, supplier)| {
            let root = supplier();
            let response = serve_from(&root, &request.path);
            if response.is_some() {
                debug!("{} served from dynamic root {}", request.path, name);
            }
            response
        })
    }
}

/// Map a request path onto `root`, refusing anything that would escape it.
pub fn resolve(root: &Path, request_path: &str) -> Option<PathBuf> {
    let mut resolved = root.to_path_buf();
    for component in Path::new(request_path.trim_start_matches('/')).components() {
        match component {
            Component::Normal(segment) => resolved.push(segment),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(resolved)
}

/// Stream the file at `root` + `request_path` if it exists.
pub fn serve_from(root: &Path, request_path: &str) -> Option<Response> {
    let path = resolve(root, request_path)?;
    if !path.is_file() {
        return None;
    }

    match Response::file(&path) {
        Ok(response) => Some(response),
        Err(e) => {
            warn!("Failed to open {}: {}", path.display(), e);
            None
        }
    }
}
