//! # Media Queue
//!
//! Ordered songs paired one-to-one with the sources of the player's
//! concatenated timeline.
//!
//! `songs[i]` is always the song behind `sources[i]`, and `sources[i]` is the
//! source at window `i` of the player. Every mutation goes to the player
//! first and only touches the local lists once the player accepted it, so a
//! failed host call leaves the queue as it was.
//!
//! Shuffle never reorders the queue; it is a flag on the player's own
//! shuffle order.

use crate::error::{PlaybackError, Result};
use bridge_traits::{CompletionAction, MediaPlayer, SourceHandle, Song};
use core_runtime::logging::redact_url;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

pub struct MediaQueue {
    name: String,
    songs: Vec<Song>,
    sources: Vec<SourceHandle>,
    player: Arc<dyn MediaPlayer>,
}

impl MediaQueue {
    pub fn new(name: impl Into<String>, player: Arc<dyn MediaPlayer>) -> Self {
        Self {
            name: name.into(),
            songs: Vec::new(),
            sources: Vec::new(),
            player,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Add `song` at the tail.
    pub fn append(&mut self, song: Song) -> Result<SourceHandle> {
        let index = self.songs.len();
        self.insert_with(index, song, |_| None)
    }

    /// Add `song` at the tail; `on_complete` builds the action the player
    /// runs once the new source is part of its timeline.
    pub fn append_with<F>(&mut self, song: Song, on_complete: F) -> Result<SourceHandle>
    where
        F: FnOnce(SourceHandle) -> Option<CompletionAction>,
    {
        let index = self.songs.len();
        self.insert_with(index, song, on_complete)
    }

    /// Insert `song` before `index`. `index == len` appends.
    ///
    /// Returns `Ok(false)` and leaves the queue untouched when `index` is
    /// past the end.
    pub fn insert_at(&mut self, index: usize, song: Song) -> Result<bool> {
        if index > self.songs.len() {
            warn!(
                index,
                size = self.songs.len(),
                "Insert index is greater than the queue size"
            );
            return Ok(false);
        }

        self.insert_with(index, song, |_| None)?;
        Ok(true)
    }

    fn insert_with<F>(&mut self, index: usize, song: Song, on_complete: F) -> Result<SourceHandle>
    where
        F: FnOnce(SourceHandle) -> Option<CompletionAction>,
    {
        let source = self.player.create_source(song.media_url())?;
        self.player.add_source(index, source, on_complete(source))?;

        debug!(
            index,
            key = song.key(),
            url = %redact_url(song.media_url()),
            "Song queued"
        );
        self.songs.insert(index, song);
        self.sources.insert(index, source);
        Ok(source)
    }

    /// Remove the first song whose key is `key`.
    pub fn remove_by_key(&mut self, key: &str) -> Result<bool> {
        let Some(index) = self.songs.iter().position(|song| song.key() == key) else {
            debug!(key, "No queued song with this key");
            return Ok(false);
        };

        self.player.remove_source(index)?;
        self.songs.remove(index);
        self.sources.remove(index);
        debug!(index, key, "Song removed");
        Ok(true)
    }

    /// Empty the queue and the player's timeline.
    ///
    /// The local lists are emptied even when the player refuses; the error is
    /// still returned.
    pub fn clear(&mut self) -> Result<()> {
        let result = self.player.clear_sources();
        self.songs.clear();
        self.sources.clear();
        result.map_err(PlaybackError::from)
    }

    /// Forget every song without touching the player. Used once the player is
    /// released.
    pub(crate) fn discard(&mut self) {
        self.songs.clear();
        self.sources.clear();
    }

    /// Replace the whole queue.
    pub fn replace(&mut self, songs: Vec<Song>) -> Result<()> {
        self.clear()?;
        for song in songs {
            self.append(song)?;
        }
        Ok(())
    }

    pub fn song_at(&self, index: usize) -> Option<&Song> {
        self.songs.get(index)
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// Current position of a source added earlier.
    pub fn index_of_source(&self, source: SourceHandle) -> Option<usize> {
        self.sources.iter().position(|s| *s == source)
    }

    /// Number of queued songs.
    ///
    /// Fails with [`PlaybackError::QueueInconsistent`] when the song list,
    /// the source list and the player's timeline disagree.
    pub fn size(&self) -> Result<usize> {
        let songs = self.songs.len();
        let player_sources = self.player.source_count();

        if songs != self.sources.len() || songs != player_sources {
            error!(
                songs,
                sources = self.sources.len(),
                player_sources,
                "Queue and player timeline are out of sync"
            );
            return Err(PlaybackError::QueueInconsistent {
                songs,
                sources: player_sources,
            });
        }

        Ok(songs)
    }

    /// Seek to the start of window `index`.
    ///
    /// Returns `Ok(false)` without moving the player when `index` is out of
    /// range.
    pub fn skip_to_index(&self, index: usize) -> Result<bool> {
        let size = self.size()?;
        if index >= size {
            warn!(index, size, "Can't skip to index");
            return Ok(false);
        }

        self.player.seek_to_window(index, Some(Duration::ZERO));
        Ok(true)
    }

    /// Seek to the player's next window, if it has one.
    pub fn skip_to_next(&self) -> bool {
        match self.player.next_window_index() {
            Some(index) => {
                self.player.seek_to_window(index, Some(Duration::ZERO));
                true
            }
            None => false,
        }
    }

    /// Seek to the player's previous window, if it has one.
    pub fn skip_to_previous(&self) -> bool {
        match self.player.previous_window_index() {
            Some(index) => {
                self.player.seek_to_window(index, Some(Duration::ZERO));
                true
            }
            None => false,
        }
    }

    /// Prepare the player, unless it is already prepared or playing.
    ///
    /// Returns whether `prepare` was issued.
    pub fn prepare(&self) -> Result<bool> {
        prepare_player(self.player.as_ref())
    }
}

/// Prepare `player` unless it is already prepared or playing.
pub(crate) fn prepare_player(player: &dyn MediaPlayer) -> Result<bool> {
    if !player.playback_state().needs_prepare() {
        return Ok(false);
    }

    player.prepare()?;
    Ok(true)
}

impl std::fmt::Debug for MediaQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaQueue")
            .field("name", &self.name)
            .field("songs", &self.songs.len())
            .field("sources", &self.sources.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePlayer;
    use bridge_traits::{MediaKind, PlayerState, RepeatMode};

    fn song(key: &str) -> Song {
        Song::new(key, format!("https://cdn.example.com/{}.mp3", key))
    }

    fn queue() -> (MediaQueue, Arc<FakePlayer>) {
        let player = FakePlayer::new(MediaKind::Audio);
        let queue = MediaQueue::new("default", player.clone());
        (queue, player)
    }

    fn keys(queue: &MediaQueue) -> Vec<&str> {
        queue.songs().iter().map(|s| s.key()).collect()
    }

    #[test]
    fn lengths_stay_aligned_across_mutations() {
        let (mut queue, player) = queue();

        queue.append(song("a")).unwrap();
        assert_eq!(queue.size().unwrap(), 1);
        queue.append(song("b")).unwrap();
        assert_eq!(queue.size().unwrap(), 2);
        queue.insert_at(1, song("c")).unwrap();
        assert_eq!(queue.size().unwrap(), 3);
        assert!(queue.remove_by_key("a").unwrap());
        assert_eq!(queue.size().unwrap(), 2);
        assert!(!queue.insert_at(9, song("z")).unwrap());
        assert_eq!(queue.size().unwrap(), 2);
        queue.clear().unwrap();
        assert_eq!(queue.size().unwrap(), 0);
        assert_eq!(player.source_count(), 0);
    }

    #[test]
    fn insert_keeps_alignment_with_player_sources() {
        let (mut queue, player) = queue();
        queue.append(song("a")).unwrap();
        queue.append(song("b")).unwrap();
        queue.insert_at(1, song("c")).unwrap();

        assert_eq!(keys(&queue), vec!["a", "c", "b"]);
        assert_eq!(
            player.timeline_uris(),
            vec![
                "https://cdn.example.com/a.mp3",
                "https://cdn.example.com/c.mp3",
                "https://cdn.example.com/b.mp3",
            ]
        );
    }

    #[test]
    fn insert_at_end_appends() {
        let (mut queue, _player) = queue();
        queue.append(song("a")).unwrap();
        assert!(queue.insert_at(1, song("b")).unwrap());
        assert_eq!(keys(&queue), vec!["a", "b"]);
    }

    #[test]
    fn insert_past_end_leaves_queue_unchanged() {
        let (mut queue, player) = queue();
        queue.append(song("a")).unwrap();

        assert!(!queue.insert_at(2, song("b")).unwrap());
        assert_eq!(keys(&queue), vec!["a"]);
        assert_eq!(player.created_uris().len(), 1);
    }

    #[test]
    fn remove_by_key_removes_first_match_only() {
        let (mut queue, player) = queue();
        queue.append(song("a")).unwrap();
        queue.append(Song::new("b", "u1")).unwrap();
        queue.append(Song::new("b", "u2")).unwrap();

        assert!(queue.remove_by_key("b").unwrap());
        assert_eq!(keys(&queue), vec!["a", "b"]);
        assert_eq!(queue.song_at(1).unwrap().media_url(), "u2");
        assert_eq!(
            player.timeline_uris(),
            vec!["https://cdn.example.com/a.mp3", "u2"]
        );

        assert!(!queue.remove_by_key("missing").unwrap());
    }

    #[test]
    fn failed_source_creation_leaves_queue_unchanged() {
        let (mut queue, _player) = queue();
        queue.append(song("a")).unwrap();

        let result = queue.append(Song::new("bad", "bad://nowhere"));
        assert!(matches!(result, Err(PlaybackError::Bridge(_))));
        assert_eq!(queue.size().unwrap(), 1);
    }

    #[test]
    fn song_at_out_of_range_is_none() {
        let (mut queue, _player) = queue();
        assert!(queue.song_at(0).is_none());
        queue.append(song("a")).unwrap();
        assert_eq!(queue.song_at(0).unwrap().key(), "a");
        assert!(queue.song_at(1).is_none());
    }

    #[test]
    fn size_detects_drift_from_player_timeline() {
        let (mut queue, player) = queue();
        queue.append(song("a")).unwrap();
        queue.append(song("b")).unwrap();

        // Host dropped a source behind the queue's back
        player.remove_source(0).unwrap();

        match queue.size() {
            Err(PlaybackError::QueueInconsistent { songs, sources }) => {
                assert_eq!(songs, 2);
                assert_eq!(sources, 1);
            }
            other => panic!("expected inconsistency, got {:?}", other),
        }
    }

    #[test]
    fn skip_to_index_out_of_range_does_not_seek() {
        let (mut queue, player) = queue();
        queue.append(song("a")).unwrap();
        queue.append(song("b")).unwrap();

        assert!(!queue.skip_to_index(2).unwrap());
        assert!(player.seeks().is_empty());

        assert!(queue.skip_to_index(1).unwrap());
        assert_eq!(player.seeks(), vec![(1, Some(Duration::ZERO))]);
        assert_eq!(player.current_window_index(), 1);
    }

    #[test]
    fn skip_next_and_previous_follow_player_navigation() {
        let (mut queue, player) = queue();
        queue.append(song("a")).unwrap();
        queue.append(song("b")).unwrap();

        assert!(!queue.skip_to_previous());
        assert!(queue.skip_to_next());
        assert_eq!(player.current_window_index(), 1);
        assert!(!queue.skip_to_next());

        player.set_repeat_mode(RepeatMode::All);
        assert!(queue.skip_to_next());
        assert_eq!(player.current_window_index(), 0);
        assert!(queue.skip_to_previous());
        assert_eq!(player.current_window_index(), 1);
    }

    #[test]
    fn prepare_only_from_idle_or_ended() {
        let (queue, player) = queue();

        assert!(queue.prepare().unwrap());
        assert_eq!(player.prepare_calls(), 1);
        assert!(!queue.prepare().unwrap());
        assert_eq!(player.prepare_calls(), 1);

        player.force_state(PlayerState::Ended);
        assert!(queue.prepare().unwrap());
        assert_eq!(player.prepare_calls(), 2);
    }

    #[test]
    fn replace_swaps_every_song() {
        let (mut queue, player) = queue();
        queue.append(song("old")).unwrap();

        queue.replace(vec![song("a"), song("b")]).unwrap();
        assert_eq!(keys(&queue), vec!["a", "b"]);
        assert_eq!(player.source_count(), 2);
    }

    #[test]
    fn completion_action_receives_the_new_source() {
        let (mut queue, player) = queue();
        queue.append(song("a")).unwrap();

        let seen = Arc::new(parking_lot::Mutex::new(None));
        let sink = seen.clone();
        let handle = queue
            .append_with(song("b"), move |source| {
                let action: CompletionAction = Box::new(move || *sink.lock() = Some(source));
                Some(action)
            })
            .unwrap();

        assert!(seen.lock().is_none());
        player.flush_completions();
        assert_eq!(*seen.lock(), Some(handle));
        assert_eq!(queue.index_of_source(handle), Some(1));
    }
}
