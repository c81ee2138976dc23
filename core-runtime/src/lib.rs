//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the media bridge:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the playback and service crates
//! depend on. It establishes the logging conventions, the fail-fast
//! configuration builder, and the broadcast channel that carries player
//! events toward the host.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{BridgeConfig, BridgeConfigBuilder, FeatureFlags};
pub use error::{Error, Result};
pub use events::{CoreEvent, DownloadEvent, EventBus, EventStream, MediaEvent};
