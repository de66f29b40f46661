//! Supabase Storage API request and response types

use serde::{Deserialize, Serialize};

/// Body of `POST /storage/v1/object/list/{bucket}`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListObjectsRequest {
    /// Folder to list, without leading or trailing slash
    pub prefix: String,
    pub limit: u32,
    pub offset: u32,
    pub sort_by: SortBy,
}

impl ListObjectsRequest {
    /// Name-ascending page of `prefix`.
    pub fn by_name(prefix: impl Into<String>, limit: u32, offset: u32) -> Self {
        Self {
            prefix: prefix.into(),
            limit,
            offset,
            sort_by: SortBy {
                column: "name".to_string(),
                order: "asc".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SortBy {
    pub column: String,
    pub order: String,
}

/// One entry of a listing response.
///
/// Folders come back with `id` and `metadata` set to `null`.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageObject {
    pub name: String,

    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub updated_at: Option<String>,

    #[serde(default)]
    pub metadata: Option<ObjectMetadata>,
}

/// Subset of the object metadata the player uses
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    #[serde(default)]
    pub size: Option<u64>,

    #[serde(default)]
    pub mimetype: Option<String>,
}

/// Error body returned by the storage API.
///
/// `statusCode` is a string in this API (e.g. `"404"`), and may be
/// present on a response whose HTTP status is 400.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageErrorBody {
    #[serde(default)]
    pub status_code: Option<String>,

    #[serde(default)]
    pub error: Option<String>,

    #[serde(default)]
    pub message: Option<String>,
}

impl StorageErrorBody {
    pub fn is_not_found(&self) -> bool {
        self.status_code.as_deref() == Some("404")
            || self.error.as_deref() == Some("not_found")
    }

    pub fn describe(&self) -> String {
        self.message
            .clone()
            .or_else(|| self.error.clone())
            .unwrap_or_else(|| "unknown storage error".to_string())
    }
}
