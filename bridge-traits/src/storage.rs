//! Remote Object Storage Abstraction
//!
//! Read-only view of a remote bucket: list the objects of a folder and
//! download one object's bytes.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One entry of a folder listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObject {
    /// Object name relative to the listed folder
    pub name: String,
    /// Size in bytes, when the store reports it
    pub size: Option<u64>,
    pub mime_type: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl RemoteObject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: None,
            mime_type: None,
            updated_at: None,
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Folder placeholders carry no metadata at all.
    pub fn is_folder(&self) -> bool {
        self.size.is_none() && self.mime_type.is_none()
    }
}

/// Remote object store trait
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::RemoteObjectStore;
///
/// async fn first_track(store: &dyn RemoteObjectStore) -> Result<Bytes> {
///     let objects = store.list("files").await?;
///     store.download(&format!("files/{}", objects[0].name)).await
/// }
/// ```
#[async_trait]
pub trait RemoteObjectStore: Send + Sync {
    /// List the objects directly under `folder`, sorted by name ascending.
    async fn list(&self, folder: &str) -> Result<Vec<RemoteObject>>;

    /// Download the object at `path` (`<folder>/<name>`).
    ///
    /// Returns [`BridgeError::NotFound`](crate::error::BridgeError::NotFound)
    /// when the object does not exist.
    async fn download(&self, path: &str) -> Result<Bytes>;
}
