//! # Session Configuration
//!
//! Per-session settings for playback sessions.

use crate::error::{PlaybackError, Result};
use serde::{Deserialize, Serialize};

/// Playback session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackConfig {
    /// Name the queue carries until a playlist with its own name is set.
    ///
    /// Default: `"default"`.
    #[serde(default = "default_playlist_name")]
    pub playlist_name: String,

    /// Whether `addAndPlay` also starts playback once the song is queued.
    ///
    /// Default: true.
    #[serde(default = "default_play_on_add")]
    pub play_on_add: bool,

    /// URI prefix for bundled assets resolved through the host.
    ///
    /// Default: `"assets:///"`.
    #[serde(default = "default_asset_scheme")]
    pub asset_scheme: String,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            playlist_name: default_playlist_name(),
            play_on_add: default_play_on_add(),
            asset_scheme: default_asset_scheme(),
        }
    }
}

impl PlaybackConfig {
    pub fn with_playlist_name(mut self, name: impl Into<String>) -> Self {
        self.playlist_name = name.into();
        self
    }

    pub fn with_play_on_add(mut self, play: bool) -> Self {
        self.play_on_add = play;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.playlist_name.is_empty() {
            return Err(PlaybackError::Config(
                "playlist_name must not be empty".to_string(),
            ));
        }

        if !self.asset_scheme.ends_with('/') {
            return Err(PlaybackError::Config(
                "asset_scheme must end with '/'".to_string(),
            ));
        }

        Ok(())
    }

    /// Playable URI for a host asset lookup key.
    pub fn asset_uri(&self, lookup_key: &str) -> String {
        format!("{}{}", self.asset_scheme, lookup_key)
    }
}

fn default_playlist_name() -> String {
    "default".to_string()
}

fn default_play_on_add() -> bool {
    true
}

fn default_asset_scheme() -> String {
    "assets:///".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PlaybackConfig::default();
        assert_eq!(config.playlist_name, "default");
        assert!(config.play_on_add);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: PlaybackConfig =
            serde_json::from_str(r#"{ "playlistName": "Morning" }"#).unwrap();
        assert_eq!(config.playlist_name, "Morning");
        assert_eq!(config.asset_scheme, "assets:///");
    }

    #[test]
    fn asset_uri_prefixes_lookup_key() {
        let config = PlaybackConfig::default();
        assert_eq!(
            config.asset_uri("flutter_assets/videos/intro.mp4"),
            "assets:///flutter_assets/videos/intro.mp4"
        );
    }

    #[test]
    fn rejects_empty_name() {
        let config = PlaybackConfig::default().with_playlist_name("");
        assert!(matches!(config.validate(), Err(PlaybackError::Config(_))));
    }
}
