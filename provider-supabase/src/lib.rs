//! # Supabase Storage Provider
//!
//! Implements `RemoteObjectStore` for the Supabase Storage REST API.
//!
//! ## Overview
//!
//! This module provides:
//! - Folder listing sorted by name, paged with `limit`/`offset`
//! - Object download by `<folder>/<name>` path
//! - `apikey` + bearer authentication with the project's anon or service key
//! - Exponential backoff on rate limiting and server errors

pub mod connector;
pub mod error;
pub mod types;

pub use connector::SupabaseStorageConnector;
pub use error::{Result, SupabaseStorageError};
