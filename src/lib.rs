//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (`core-service`, `core-playback`). Host applications can
//! depend on `media-bridge-workspace` and enable the documented features
//! without needing to wire each crate individually.

#[cfg(feature = "service")]
pub use core_service::{Dispatcher, MediaBridge};

#[cfg(feature = "playback-only")]
pub use core_playback::{DownloadSession, MediaQueue, PlaybackSession};
