//! The playable item exchanged with the host.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::hash::{Hash, Hasher};

/// One playable item.
///
/// Immutable once built. Two songs are the same song when their keys match,
/// whatever their other fields say.
///
/// The flat record form uses the keys `key`, `title`, `artists`, `album`,
/// `albumArtUrl` and `url`; absent optional fields are written as `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    key: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    artists: Option<String>,
    #[serde(default)]
    album: Option<String>,
    #[serde(default)]
    album_art_url: Option<String>,
    #[serde(rename = "url")]
    media_url: String,
}

impl Song {
    pub fn new(key: impl Into<String>, media_url: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: None,
            artists: None,
            album: None,
            album_art_url: None,
            media_url: media_url.into(),
        }
    }

    /// Song keyed by its own URI, for items that carry no metadata.
    pub fn from_uri(uri: impl Into<String>) -> Self {
        let uri = uri.into();
        Self::new(uri.clone(), uri)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_artists(mut self, artists: impl Into<String>) -> Self {
        self.artists = Some(artists.into());
        self
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_album_art_url(mut self, url: impl Into<String>) -> Self {
        self.album_art_url = Some(url.into());
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn artists(&self) -> Option<&str> {
        self.artists.as_deref()
    }

    pub fn album(&self) -> Option<&str> {
        self.album.as_deref()
    }

    pub fn album_art_url(&self) -> Option<&str> {
        self.album_art_url.as_deref()
    }

    pub fn media_url(&self) -> &str {
        &self.media_url
    }

    /// Flat string-keyed record.
    pub fn to_record(&self) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert("key".into(), Value::String(self.key.clone()));
        record.insert("title".into(), optional(&self.title));
        record.insert("artists".into(), optional(&self.artists));
        record.insert("album".into(), optional(&self.album));
        record.insert("albumArtUrl".into(), optional(&self.album_art_url));
        record.insert("url".into(), Value::String(self.media_url.clone()));
        record
    }

    /// Inverse of [`Song::to_record`]. `key` and `url` are required; other
    /// fields may be missing or `null`. Unknown keys are ignored.
    pub fn from_record(record: &Map<String, Value>) -> Result<Self> {
        Self::from_value(&Value::Object(record.clone()))
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        Ok(Song::deserialize(value)?)
    }
}

fn optional(field: &Option<String>) -> Value {
    field.clone().map(Value::String).unwrap_or(Value::Null)
}

impl PartialEq for Song {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Song {}

impl Hash for Song {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_song() -> Song {
        Song::new("k-1", "https://cdn.example.com/a.mp3")
            .with_title("Title")
            .with_artists("A, B")
            .with_album("Album")
            .with_album_art_url("https://cdn.example.com/a.jpg")
    }

    #[test]
    fn record_round_trip_full() {
        let song = full_song();
        let back = Song::from_record(&song.to_record()).unwrap();
        assert_eq!(back, song);
        assert_eq!(back.to_record(), song.to_record());
    }

    #[test]
    fn record_round_trip_sparse_and_empty() {
        let sparse = Song::new("", "");
        let back = Song::from_record(&sparse.to_record()).unwrap();
        assert_eq!(back.to_record(), sparse.to_record());
        assert_eq!(back.title(), None);

        let empty_strings = Song::new("k", "u").with_title("").with_album("");
        let back = Song::from_record(&empty_strings.to_record()).unwrap();
        assert_eq!(back.title(), Some(""));
        assert_eq!(back.album(), Some(""));
        assert_eq!(back.artists(), None);
    }

    #[test]
    fn record_shape() {
        let record = full_song().to_record();
        assert_eq!(record.len(), 6);
        assert_eq!(record["albumArtUrl"], json!("https://cdn.example.com/a.jpg"));
        assert_eq!(record["url"], json!("https://cdn.example.com/a.mp3"));

        let sparse = Song::new("k", "u").to_record();
        assert_eq!(sparse["title"], Value::Null);
    }

    #[test]
    fn missing_optional_fields_decode_as_none() {
        let song = Song::from_value(&json!({ "key": "k", "url": "u" })).unwrap();
        assert_eq!(song.key(), "k");
        assert_eq!(song.album_art_url(), None);
    }

    #[test]
    fn missing_key_is_rejected() {
        assert!(Song::from_value(&json!({ "url": "u" })).is_err());
        assert!(Song::from_value(&json!({ "key": "k" })).is_err());
    }

    #[test]
    fn identity_is_by_key() {
        let a = Song::new("same", "u1").with_title("one");
        let b = Song::new("same", "u2").with_title("two");
        assert_eq!(a, b);
        assert_ne!(a, Song::new("other", "u1"));
    }

    #[test]
    fn from_uri_uses_uri_as_key() {
        let song = Song::from_uri("assets:///flutter_assets/intro.mp4");
        assert_eq!(song.key(), song.media_url());
    }
}
