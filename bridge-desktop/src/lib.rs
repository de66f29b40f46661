//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! Only [`HttpClient`](bridge_traits::HttpClient) has a desktop shim. Media
//! output is either supplied by the host or served by the headless backend in
//! `core-playback`.
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use bridge_desktop::ReqwestHttpClient;
//!
//! let http_client = Arc::new(ReqwestHttpClient::new()?);
//! let config = PlayerConfig::builder()
//!     .http_client(http_client)
//!     // ...
//!     .build()?;
//! ```

mod http;

pub use http::ReqwestHttpClient;
