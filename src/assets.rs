//! Asset fetching
//!
//! Shader sources and texture images are fetched through [`AssetSource`].
//! Fetches return `'static` futures so they can be held across frames while
//! the render loop keeps running.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use futures::channel::oneshot;
use futures::future::{self, BoxFuture, FutureExt};

use crate::error::AssetFetchError;

/// Where shader text and images come from
pub trait AssetSource {
    /// Starts fetching `url`; the future resolves to the raw bytes.
    fn fetch(&self, url: &str) -> BoxFuture<'static, Result<Vec<u8>, AssetFetchError>>;
}

impl<T: AssetSource + ?Sized> AssetSource for Arc<T> {
    fn fetch(&self, url: &str) -> BoxFuture<'static, Result<Vec<u8>, AssetFetchError>> {
        (**self).fetch(url)
    }
}

/// Reads assets from a directory on a background thread per request
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

impl AssetSource for FileSource {
    fn fetch(&self, url: &str) -> BoxFuture<'static, Result<Vec<u8>, AssetFetchError>> {
        let path = self.root.join(url);
        let url = url.to_owned();
        let (sender, receiver) = oneshot::channel();

        let spawned = std::thread::Builder::new()
            .name("asset-fetch".to_owned())
            .spawn({
                let url = url.clone();
                move || {
                    let result = std::fs::read(&path).map_err(|e| AssetFetchError::from_io(url, &e));
                    // The receiver may have been dropped; nothing to do then
                    let _ = sender.send(result);
                }
            });

        if let Err(e) = spawned {
            log::error!("Failed to spawn fetch thread for '{}': {}", url, e);
            return future::ready(Err(AssetFetchError::new(url, 500))).boxed();
        }

        receiver
            .map(move |received| received.unwrap_or_else(|_| Err(AssetFetchError::new(url, 500))))
            .boxed()
    }
}

/// In-memory assets keyed by URL; missing entries fetch as 404
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    assets: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>, bytes: Vec<u8>) {
        if let Ok(mut assets) = self.assets.write() {
            assets.insert(url.into(), bytes);
        }
    }

    pub fn with_asset(mut self, url: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.insert(url, bytes);
        self
    }
}

impl AssetSource for MemorySource {
    fn fetch(&self, url: &str) -> BoxFuture<'static, Result<Vec<u8>, AssetFetchError>> {
        let result = self
            .assets
            .read()
            .ok()
            .and_then(|assets| assets.get(url).cloned())
            .ok_or_else(|| AssetFetchError::new(url, 404));
        future::ready(result).boxed()
    }
}
