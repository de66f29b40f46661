//! # Host Bridge Traits
//!
//! Capability traits the player core consumes but does not implement itself.
//!
//! ## Overview
//!
//! The playback controller never talks to a network stack or an audio device
//! directly. Everything that touches the outside world is expressed as a trait
//! in this crate and injected by the host:
//!
//! - [`HttpClient`](http::HttpClient) - async HTTP with retry policy hints
//! - [`RemoteObjectStore`](storage::RemoteObjectStore) - folder listing and
//!   object download against a remote bucket
//! - [`MediaBackend`](playback::MediaBackend) - content references, media
//!   handles, transport commands and lifecycle signals
//! - [`LoggerSink`](time::LoggerSink) - mirror structured logs to a host logger
//!
//! ## Implementations
//!
//! | Capability | Crate |
//! |------------|-------|
//! | `HttpClient` | `bridge-desktop` (reqwest) |
//! | `RemoteObjectStore` | `provider-supabase` |
//! | `MediaBackend` | `core-playback` (headless), or host supplied |
//!
//! ## Error Handling
//!
//! Every bridge call returns [`BridgeError`](error::BridgeError). Implementations
//! should convert their native errors into it and keep the message actionable
//! (include the object path, HTTP status, or handle id involved).
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync` so a single implementation can be shared
//! behind an `Arc` between the controller, its signal pump and the host.

pub mod error;
pub mod http;
pub mod playback;
pub mod storage;
pub mod time;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use playback::{
    ContentRefId, MediaBackend, MediaEvent, MediaEventReceiver, MediaEventSender, MediaHandleId,
    MediaSignal,
};
pub use storage::{RemoteObject, RemoteObjectStore};
pub use time::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
