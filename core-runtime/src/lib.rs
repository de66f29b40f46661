//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the player core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the playback and service
//! crates depend on. It establishes the logging conventions, the builder-based
//! configuration with capability resolution, and the event broadcasting used to
//! keep presentation layers in sync with playback.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{PlaybackSettings, PlayerConfig, PlayerConfigBuilder, StorageSettings};
pub use error::{Error, Result};
