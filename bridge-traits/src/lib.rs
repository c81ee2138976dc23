//! # Host Bridge Traits
//!
//! Collaborator traits that each host platform implements for the media bridge.
//!
//! ## Overview
//!
//! This crate defines the contract between the playback core and the mobile
//! host. The core never decodes media, renders frames or moves bytes over the
//! network; it drives opaque handles that the host hands it and translates
//! their callbacks into events.
//!
//! ## Traits
//!
//! ### Media
//! - [`MediaEngine`](media::MediaEngine) - Factory for opaque player handles
//! - [`MediaPlayer`](media::MediaPlayer) - Concatenated-source player (ExoPlayer, AVQueuePlayer)
//! - [`PlayerEventHandler`](media::PlayerEventHandler) - Player callbacks consumed by the core
//!
//! ### Downloads
//! - [`DownloadService`](download::DownloadService) - Background download engine
//! - [`DownloadListener`](download::DownloadListener) - Download state notifications
//!
//! ### Platform Integration
//! - [`TextureRegistry`](surface::TextureRegistry) - Surface textures for video output
//! - [`AssetResolver`](surface::AssetResolver) - Bundled asset lookup
//! - [`MethodChannel`](channel::MethodChannel) - Outward event push to the app framework
//!
//! ### Utilities
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Player | Downloads | Status |
//! |----------|--------|-----------|--------|
//! | Android  | ExoPlayer | `DownloadService` | ✅ In Progress |
//! | iOS      | AVQueuePlayer | background `URLSession` | 📋 Planned |
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with descriptive errors when a required capability is
//! missing:
//!
//! ```ignore
//! use core_runtime::error::Error;
//!
//! let engine = self.media_engine
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "MediaEngine".to_string(),
//!         message: "No media engine provided. \
//!                  Inject the platform player adapter.".to_string(),
//!     })?;
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Platform
//! implementations should convert native exceptions into it and keep the
//! message actionable.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so handles can be shared between
//! the control thread and the engine's callback thread.
//!
//! ## Examples
//!
//! ### Implementing DownloadService
//!
//! ```ignore
//! use bridge_traits::download::{DownloadListener, DownloadService, DownloadState};
//! use bridge_traits::error::Result;
//! use std::sync::Arc;
//!
//! pub struct AndroidDownloads { /* JNI handles */ }
//!
//! impl DownloadService for AndroidDownloads {
//!     fn start_download(&self, url: &str) -> Result<()> { todo!() }
//!     fn remove_download(&self, url: &str) -> Result<()> { todo!() }
//!     fn is_downloaded(&self, url: &str) -> bool { todo!() }
//!     fn current_downloads(&self) -> Vec<(String, DownloadState)> { Vec::new() }
//!     fn set_listener(&self, listener: Option<Arc<dyn DownloadListener>>) { todo!() }
//! }
//! ```

pub mod channel;
pub mod download;
pub mod error;
pub mod logging;
pub mod media;
pub mod platform;
pub mod song;
pub mod surface;

pub use error::BridgeError;

// Re-export commonly used types
pub use channel::{MethodCall, MethodChannel, MethodResponse};
pub use download::{DownloadListener, DownloadService, DownloadState};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use media::{
    CompletionAction, MediaEngine, MediaKind, MediaPlayer, PlayerError, PlayerErrorKind,
    PlayerEventHandler, PlayerState, RepeatMode, SourceHandle, TextureId,
};
pub use platform::{PlatformSend, PlatformSendSync};
pub use song::Song;
pub use surface::{AssetResolver, TextureEntry, TextureRegistry};
