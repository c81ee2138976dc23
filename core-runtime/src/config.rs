//! # Bridge Configuration Module
//!
//! Provides configuration management for the media bridge.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! `BridgeConfig` holding the host collaborators and settings the bridge
//! needs. It fails fast when a required collaborator is missing, before any
//! player handle is created.
//!
//! ## Required Dependencies
//!
//! - `MediaEngine` - Creates the audio and video player handles
//! - `MethodChannel` - Pushes events back into the app framework
//!
//! ## Optional Dependencies
//!
//! - `DownloadService` - Required when downloads are enabled
//! - `TextureRegistry` - Required when video is enabled
//! - `AssetResolver` - Resolves bundled video assets
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::BridgeConfig;
//! use std::sync::Arc;
//!
//! let config = BridgeConfig::builder()
//!     .media_engine(Arc::new(ExoPlayerEngine::new(context)))
//!     .method_channel(Arc::new(FlutterChannel::new(messenger)))
//!     .download_service(Arc::new(AndroidDownloads::new(context)))
//!     .texture_registry(Arc::new(FlutterTextures::new(registrar)))
//!     .event_buffer_size(512)
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::BridgeConfig;
//!
//! // Panics with an actionable message naming the missing MediaEngine
//! let config = BridgeConfig::builder()
//!     .build()
//!     .expect("Should fail - missing required bridges");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{AssetResolver, DownloadService, MediaEngine, MethodChannel, TextureRegistry};
use std::sync::Arc;

/// Default name given to the audio playlist until the host sets one.
pub const DEFAULT_PLAYLIST_NAME: &str = "default";

/// Bridge configuration.
///
/// Use [`BridgeConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct BridgeConfig {
    /// Player factory (required)
    pub media_engine: Arc<dyn MediaEngine>,

    /// Outward event channel (required)
    pub method_channel: Arc<dyn MethodChannel>,

    /// Download engine (required when downloads are enabled)
    pub download_service: Option<Arc<dyn DownloadService>>,

    /// Video surface registry (required when video is enabled)
    pub texture_registry: Option<Arc<dyn TextureRegistry>>,

    /// Bundled asset lookup (optional)
    pub asset_resolver: Option<Arc<dyn AssetResolver>>,

    /// Capacity of the event bus
    pub event_buffer_size: usize,

    /// Playlist name used until the host sets one
    pub default_playlist_name: String,

    /// Feature flags
    pub features: FeatureFlags,
}

impl std::fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("media_engine", &"MediaEngine { ... }")
            .field("method_channel", &"MethodChannel { ... }")
            .field(
                "download_service",
                &self
                    .download_service
                    .as_ref()
                    .map(|_| "DownloadService { ... }"),
            )
            .field(
                "texture_registry",
                &self
                    .texture_registry
                    .as_ref()
                    .map(|_| "TextureRegistry { ... }"),
            )
            .field(
                "asset_resolver",
                &self.asset_resolver.as_ref().map(|_| "AssetResolver { ... }"),
            )
            .field("event_buffer_size", &self.event_buffer_size)
            .field("default_playlist_name", &self.default_playlist_name)
            .field("features", &self.features)
            .finish()
    }
}

/// Feature flags control optional functionality.
///
/// Each enabled feature requires its bridge to be provided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Serve `VIDEO/*` requests (requires TextureRegistry)
    pub enable_video: bool,

    /// Serve `DOWNLOAD/*` requests (requires DownloadService)
    pub enable_downloads: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_video: true,
            enable_downloads: true,
        }
    }
}

impl BridgeConfig {
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Event buffer size is reasonable (> 0 and <= 65536)
    /// - Playlist name is not empty
    /// - Feature flags are consistent with available bridges
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > 65_536 {
            return Err(Error::Config(
                "Event buffer size exceeds maximum of 65536 events".to_string(),
            ));
        }

        if self.default_playlist_name.is_empty() {
            return Err(Error::Config(
                "Default playlist name cannot be empty".to_string(),
            ));
        }

        if self.features.enable_video && self.texture_registry.is_none() {
            return Err(Error::Config(
                "Video enabled but no TextureRegistry provided. \
                 Disable the feature or inject a TextureRegistry implementation."
                    .to_string(),
            ));
        }

        if self.features.enable_downloads && self.download_service.is_none() {
            return Err(Error::Config(
                "Downloads enabled but no DownloadService provided. \
                 Disable the feature or inject a DownloadService implementation."
                    .to_string(),
            ));
        }

        Ok(())
    }
}

fn media_engine_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "MediaEngine".to_string(),
        message: "MediaEngine implementation is required to create players. \
                 Android: inject the ExoPlayer-backed engine. \
                 iOS: inject the AVFoundation-backed engine."
            .to_string(),
    }
}

fn method_channel_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "MethodChannel".to_string(),
        message: "MethodChannel implementation is required to deliver player events. \
                 Inject the host framework's channel adapter."
            .to_string(),
    }
}

/// Builder for [`BridgeConfig`].
#[derive(Default)]
pub struct BridgeConfigBuilder {
    media_engine: Option<Arc<dyn MediaEngine>>,
    method_channel: Option<Arc<dyn MethodChannel>>,
    download_service: Option<Arc<dyn DownloadService>>,
    texture_registry: Option<Arc<dyn TextureRegistry>>,
    asset_resolver: Option<Arc<dyn AssetResolver>>,
    event_buffer_size: Option<usize>,
    default_playlist_name: Option<String>,
    features: FeatureFlags,
}

impl BridgeConfigBuilder {
    pub fn media_engine(mut self, engine: Arc<dyn MediaEngine>) -> Self {
        self.media_engine = Some(engine);
        self
    }

    pub fn method_channel(mut self, channel: Arc<dyn MethodChannel>) -> Self {
        self.method_channel = Some(channel);
        self
    }

    pub fn download_service(mut self, service: Arc<dyn DownloadService>) -> Self {
        self.download_service = Some(service);
        self
    }

    pub fn texture_registry(mut self, registry: Arc<dyn TextureRegistry>) -> Self {
        self.texture_registry = Some(registry);
        self
    }

    pub fn asset_resolver(mut self, resolver: Arc<dyn AssetResolver>) -> Self {
        self.asset_resolver = Some(resolver);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn default_playlist_name(mut self, name: impl Into<String>) -> Self {
        self.default_playlist_name = Some(name.into());
        self
    }

    pub fn enable_video(mut self, enabled: bool) -> Self {
        self.features.enable_video = enabled;
        self
    }

    pub fn enable_downloads(mut self, enabled: bool) -> Self {
        self.features.enable_downloads = enabled;
        self
    }

    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    pub fn build(self) -> Result<BridgeConfig> {
        let media_engine = self.media_engine.ok_or_else(media_engine_missing_error)?;
        let method_channel = self
            .method_channel
            .ok_or_else(method_channel_missing_error)?;

        let config = BridgeConfig {
            media_engine,
            method_channel,
            download_service: self.download_service,
            texture_registry: self.texture_registry,
            asset_resolver: self.asset_resolver,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            default_playlist_name: self
                .default_playlist_name
                .unwrap_or_else(|| DEFAULT_PLAYLIST_NAME.to_string()),
            features: self.features,
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::{
        BridgeError, DownloadListener, DownloadState, MediaKind, MediaPlayer, TextureEntry,
        TextureId,
    };
    use serde_json::Value;

    // Mock implementations for testing
    struct MockEngine;

    impl MediaEngine for MockEngine {
        fn create_player(
            &self,
            _kind: MediaKind,
        ) -> std::result::Result<Arc<dyn MediaPlayer>, BridgeError> {
            Err(BridgeError::NotAvailable("test engine".to_string()))
        }
    }

    struct MockChannel;

    #[async_trait]
    impl MethodChannel for MockChannel {
        async fn invoke_method(
            &self,
            _method: &str,
            _arguments: Value,
        ) -> std::result::Result<(), BridgeError> {
            Ok(())
        }
    }

    struct MockDownloads;

    impl DownloadService for MockDownloads {
        fn start_download(&self, _url: &str) -> std::result::Result<(), BridgeError> {
            Ok(())
        }

        fn remove_download(&self, _url: &str) -> std::result::Result<(), BridgeError> {
            Ok(())
        }

        fn is_downloaded(&self, _url: &str) -> bool {
            false
        }

        fn current_downloads(&self) -> Vec<(String, DownloadState)> {
            Vec::new()
        }

        fn set_listener(&self, _listener: Option<Arc<dyn DownloadListener>>) {}
    }

    struct MockTextures;

    impl TextureRegistry for MockTextures {
        fn create_surface_texture(&self) -> std::result::Result<TextureEntry, BridgeError> {
            Ok(TextureEntry { id: TextureId(1) })
        }

        fn release_texture(&self, _id: TextureId) {}
    }

    fn complete_builder() -> BridgeConfigBuilder {
        BridgeConfig::builder()
            .media_engine(Arc::new(MockEngine))
            .method_channel(Arc::new(MockChannel))
            .download_service(Arc::new(MockDownloads))
            .texture_registry(Arc::new(MockTextures))
    }

    #[test]
    fn test_builder_requires_media_engine() {
        let result = BridgeConfig::builder()
            .method_channel(Arc::new(MockChannel))
            .build();

        let err = result.unwrap_err();
        assert!(matches!(err, Error::CapabilityMissing { ref capability, .. } if capability == "MediaEngine"));
        assert!(err.to_string().contains("create players"));
    }

    #[test]
    fn test_builder_requires_method_channel() {
        let result = BridgeConfig::builder()
            .media_engine(Arc::new(MockEngine))
            .build();

        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("MethodChannel"));
    }

    #[test]
    fn test_builder_with_all_bridges() {
        let config = complete_builder().build().unwrap();

        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert_eq!(config.default_playlist_name, "default");
        assert_eq!(config.features, FeatureFlags::default());
        assert!(config.asset_resolver.is_none());
    }

    #[test]
    fn test_validate_rejects_zero_buffer() {
        let result = complete_builder().event_buffer_size(0).build();
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Event buffer size must be greater than 0"));
    }

    #[test]
    fn test_validate_rejects_empty_playlist_name() {
        let result = complete_builder().default_playlist_name("").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_video_requires_texture_registry() {
        let result = BridgeConfig::builder()
            .media_engine(Arc::new(MockEngine))
            .method_channel(Arc::new(MockChannel))
            .download_service(Arc::new(MockDownloads))
            .build();

        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("TextureRegistry"));
    }

    #[test]
    fn test_downloads_require_service() {
        let result = BridgeConfig::builder()
            .media_engine(Arc::new(MockEngine))
            .method_channel(Arc::new(MockChannel))
            .texture_registry(Arc::new(MockTextures))
            .build();

        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("DownloadService"));
    }

    #[test]
    fn test_audio_only_configuration() {
        let config = BridgeConfig::builder()
            .media_engine(Arc::new(MockEngine))
            .method_channel(Arc::new(MockChannel))
            .enable_video(false)
            .enable_downloads(false)
            .default_playlist_name("queue")
            .build()
            .unwrap();

        assert!(!config.features.enable_video);
        assert_eq!(config.default_playlist_name, "queue");
    }

    #[test]
    fn test_debug_hides_bridges() {
        let config = complete_builder().build().unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("MediaEngine { ... }"));
        assert!(debug.contains("event_buffer_size: 256"));
    }
}
