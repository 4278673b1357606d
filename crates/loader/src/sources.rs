//! Where the raw datasets come from.
//!
//! This module defines the `DataSource` trait and the implementations the
//! loader ships with:
//! - Filesystem (resources relative to a data directory)
//! - Remote HTTP (resources relative to a base URL)
//! - In-memory (tests and embedding)
//!
//! A source only moves bytes; parsing and fallback decisions belong to the
//! loader.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSourceErrorKind {
    NotFound,
    /// Non-success transport status.
    Status(u16),
    Transport,
    Io,
}

/// Error type for data source operations.
#[derive(Debug)]
pub struct DataSourceError {
    pub kind: DataSourceErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for DataSourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl DataSourceError {
    pub fn new(kind: DataSourceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        kind: DataSourceErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new(DataSourceErrorKind::NotFound, format!("{resource} not found"))
    }
}

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait for dataset sources.
///
/// Methods return boxed futures for dyn-compatibility.
pub trait DataSource: Send + Sync {
    /// Human-readable location, used in log lines.
    fn describe(&self) -> String;

    /// Full body of `resource`.
    fn fetch(&self, resource: &str) -> BoxFuture<'_, Result<Vec<u8>, DataSourceError>>;
}

/// Resources as files under a root directory.
pub struct FilesystemSource {
    root: PathBuf,
}

impl FilesystemSource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl DataSource for FilesystemSource {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    fn fetch(&self, resource: &str) -> BoxFuture<'_, Result<Vec<u8>, DataSourceError>> {
        let path = self.root.join(resource);
        let resource = resource.to_string();

        Box::pin(async move {
            match tokio::fs::read(&path).await {
                Ok(data) => Ok(data),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Err(DataSourceError::not_found(&resource))
                }
                Err(e) => Err(DataSourceError::with_source(
                    DataSourceErrorKind::Io,
                    format!("failed to read {}", path.display()),
                    e,
                )),
            }
        })
    }
}

/// Resources relative to a base URL.
pub struct HttpSource {
    base_url: String,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    fn resource_url(&self, resource: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            resource.trim_start_matches('/')
        )
    }
}

impl DataSource for HttpSource {
    fn describe(&self) -> String {
        self.base_url.clone()
    }

    fn fetch(&self, resource: &str) -> BoxFuture<'_, Result<Vec<u8>, DataSourceError>> {
        let url = self.resource_url(resource);
        Box::pin(async move {
            let resp = self.client.get(&url).send().await.map_err(|e| {
                DataSourceError::with_source(
                    DataSourceErrorKind::Transport,
                    format!("request to {url} failed"),
                    e,
                )
            })?;

            let status = resp.status();
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(DataSourceError::not_found(&url));
            }
            if !status.is_success() {
                return Err(DataSourceError::new(
                    DataSourceErrorKind::Status(status.as_u16()),
                    format!("{url} returned {status}"),
                ));
            }

            let bytes = resp.bytes().await.map_err(|e| {
                DataSourceError::with_source(
                    DataSourceErrorKind::Transport,
                    format!("failed to read body of {url}"),
                    e,
                )
            })?;
            Ok(bytes.to_vec())
        })
    }
}

#[derive(Debug, Clone)]
enum MemoryEntry {
    Body(Vec<u8>),
    Status(u16),
}

/// In-memory source. Unknown resources are `NotFound`.
#[derive(Default)]
pub struct MemorySource {
    entries: RwLock<HashMap<String, MemoryEntry>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource(mut self, resource: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.entries
            .get_mut()
            .insert(resource.into(), MemoryEntry::Body(body.into()));
        self
    }

    /// Makes `resource` answer with a non-success status.
    pub fn with_status(mut self, resource: impl Into<String>, status: u16) -> Self {
        self.entries
            .get_mut()
            .insert(resource.into(), MemoryEntry::Status(status));
        self
    }

    pub async fn set_resource(&self, resource: impl Into<String>, body: Vec<u8>) {
        self.entries
            .write()
            .await
            .insert(resource.into(), MemoryEntry::Body(body));
    }

    pub async fn remove_resource(&self, resource: &str) -> bool {
        self.entries.write().await.remove(resource).is_some()
    }
}

impl DataSource for MemorySource {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn fetch(&self, resource: &str) -> BoxFuture<'_, Result<Vec<u8>, DataSourceError>> {
        let resource = resource.to_string();
        Box::pin(async move {
            match self.entries.read().await.get(&resource) {
                Some(MemoryEntry::Body(body)) => Ok(body.clone()),
                Some(MemoryEntry::Status(status)) => Err(DataSourceError::new(
                    DataSourceErrorKind::Status(*status),
                    format!("{resource} returned {status}"),
                )),
                None => Err(DataSourceError::not_found(&resource)),
            }
        })
    }
}
