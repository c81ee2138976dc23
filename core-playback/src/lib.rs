//! # Playback Module
//!
//! Queue and session engine behind the media bridge.
//!
//! ## Overview
//!
//! This crate handles:
//! - The [`MediaQueue`]: songs kept index-aligned with the player's timeline
//! - Audio and video [`PlaybackSession`]s over an opaque host player
//! - Translation of player callbacks into [`MediaEvent`](core_runtime::events::MediaEvent)s
//! - The [`DownloadSession`] tracking host downloads by URL
//! - The playlist JSON codec

pub mod config;
pub mod download;
pub mod error;
pub mod listener;
pub mod playlist;
pub mod queue;
pub mod session;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use config::PlaybackConfig;
pub use download::DownloadSession;
pub use error::{PlaybackError, Result};
pub use listener::{ListenerId, SessionListener};
pub use playlist::{songs_from_json, PlaylistDocument};
pub use queue::MediaQueue;
pub use session::{PlaybackSession, SessionSnapshot};
