//! Playlist JSON codec.
//!
//! `{ "playlistName": "...", "songs": [ { "key": ..., "url": ... }, ... ] }`

use crate::error::Result;
use bridge_traits::Song;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistDocument {
    /// Absent in documents written by older hosts.
    #[serde(default)]
    pub playlist_name: Option<String>,
    #[serde(default)]
    pub songs: Vec<Song>,
}

impl PlaylistDocument {
    pub fn new(name: impl Into<String>, songs: Vec<Song>) -> Self {
        Self {
            playlist_name: Some(name.into()),
            songs,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Ordered songs of a playlist document.
pub fn songs_from_json(json: &str) -> Result<Vec<Song>> {
    Ok(PlaylistDocument::from_json(json)?.songs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlaybackError;

    #[test]
    fn document_without_name_is_accepted() {
        let doc = PlaylistDocument::from_json(r#"{"songs":[{"key":"a","url":"u1"}]}"#).unwrap();
        assert!(doc.playlist_name.is_none());
        assert_eq!(doc.songs[0].key(), "a");
        assert_eq!(doc.songs[0].media_url(), "u1");
    }

    #[test]
    fn garbage_is_a_format_error() {
        let err = songs_from_json("not json").unwrap_err();
        assert!(matches!(err, PlaybackError::PlaylistFormat(_)));
    }
}
