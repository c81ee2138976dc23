//! # Playback Session
//!
//! One [`PlaybackSession`] exists per media kind. It owns the player handle
//! and the [`MediaQueue`] feeding it, and translates player callbacks into
//! [`MediaEvent`]s for its listeners.
//!
//! ## Threading
//!
//! Control operations are expected from a single caller thread. Player
//! callbacks arrive on the engine's thread and only read session state.
//! The queue sits behind a mutex that is only held while sources are added
//! to or removed from the player, never across `prepare`, `play`/`pause` or
//! the repeat/shuffle setters. Players may report those synchronously, and a
//! period callback arriving meanwhile only waits for the source edit in
//! progress.
//!
//! ## Deferred seeks
//!
//! [`PlaybackSession::add_and_play`] seeks to the new song only once the
//! player has the source in its timeline. The completion action looks the
//! source up again when it runs, so a queue that changed in the meantime is
//! never seeked past its end, and a released session ignores it entirely.

use crate::config::PlaybackConfig;
use crate::error::{PlaybackError, Result};
use crate::listener::{ListenerId, ListenerSet, SessionListener};
use crate::playlist::PlaylistDocument;
use crate::queue::{prepare_player, MediaQueue};
use bridge_traits::{
    CompletionAction, MediaEngine, MediaKind, MediaPlayer, PlayerError, PlayerEventHandler,
    PlayerState, RepeatMode, Song, SourceHandle, TextureId,
};
use core_runtime::events::MediaEvent;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, error, info, instrument};

// ============================================================================
// Snapshot
// ============================================================================

/// What a repeated `initialize` reports about a live session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub play_when_ready: bool,
    pub playback_state: PlayerState,
    /// Song at the player's current window, if any.
    pub current_playing_song: Option<Song>,
}

impl SessionSnapshot {
    pub fn to_value(&self) -> Value {
        json!({
            "playWhenReady": self.play_when_ready,
            "playbackState": self.playback_state.code(),
            "currentPlayingSong": self
                .current_playing_song
                .as_ref()
                .map(|song| Value::Object(song.to_record()))
                .unwrap_or(Value::Null),
        })
    }
}

// ============================================================================
// Session
// ============================================================================

struct SessionInner {
    kind: MediaKind,
    player: Arc<dyn MediaPlayer>,
    queue: Mutex<MediaQueue>,
    listeners: ListenerSet,
    config: PlaybackConfig,
    texture: Mutex<Option<TextureId>>,
    released: AtomicBool,
}

impl SessionInner {
    fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    fn notify(&self, event: MediaEvent) {
        self.listeners
            .for_each(|listener| listener.on_media_event(self.kind, event.clone()));
    }

    /// Completion action body for `add_and_play`.
    fn seek_to_source(&self, source: SourceHandle) {
        if self.is_released() {
            debug!(kind = %self.kind, "Dropping deferred seek: session released");
            return;
        }

        let index = self.queue.lock().index_of_source(source);
        match index {
            Some(index) => self.player.seek_to_window(index, None),
            None => debug!(kind = %self.kind, "Dropping deferred seek: song no longer queued"),
        }
    }
}

/// Handle to a playback session. Clones share the same session.
#[derive(Clone)]
pub struct PlaybackSession {
    inner: Arc<SessionInner>,
}

impl PlaybackSession {
    /// Wrap `player` in a new session with an empty queue.
    pub fn new(kind: MediaKind, player: Arc<dyn MediaPlayer>, config: PlaybackConfig) -> Self {
        let queue = MediaQueue::new(config.playlist_name.clone(), player.clone());
        let inner = Arc::new(SessionInner {
            kind,
            player: player.clone(),
            queue: Mutex::new(queue),
            listeners: ListenerSet::default(),
            config,
            texture: Mutex::new(None),
            released: AtomicBool::new(false),
        });

        player.set_event_handler(Some(Arc::new(SessionEventHandler {
            session: Arc::downgrade(&inner),
        })));

        Self { inner }
    }

    /// Acquire a player of `kind` from `engine` and wrap it.
    pub fn open(engine: &dyn MediaEngine, kind: MediaKind, config: PlaybackConfig) -> Result<Self> {
        config.validate()?;
        let player = engine.create_player(kind)?;
        info!(%kind, playlist = %config.playlist_name, "Playback session opened");
        Ok(Self::new(kind, player, config))
    }

    pub fn kind(&self) -> MediaKind {
        self.inner.kind
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.inner.config
    }

    pub fn is_released(&self) -> bool {
        self.inner.is_released()
    }

    fn ensure_live(&self) -> Result<()> {
        if self.inner.is_released() {
            return Err(PlaybackError::SessionReleased);
        }
        Ok(())
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    pub fn add_listener(&self, listener: Arc<dyn SessionListener>) -> Result<ListenerId> {
        self.ensure_live()?;
        Ok(self.inner.listeners.add(listener))
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn snapshot(&self) -> SessionSnapshot {
        let player = &self.inner.player;
        let current_playing_song = self
            .inner
            .queue
            .lock()
            .song_at(player.current_window_index())
            .cloned();

        SessionSnapshot {
            play_when_ready: player.play_when_ready(),
            playback_state: player.playback_state(),
            current_playing_song,
        }
    }

    /// Queue as a playlist JSON document.
    pub fn get_playlist(&self) -> Result<String> {
        self.ensure_live()?;
        let queue = self.inner.queue.lock();
        PlaylistDocument::new(queue.name(), queue.songs().to_vec()).to_json()
    }

    pub fn songs(&self) -> Vec<Song> {
        self.inner.queue.lock().songs().to_vec()
    }

    pub fn size(&self) -> Result<usize> {
        self.inner.queue.lock().size()
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.inner.player.repeat_mode()
    }

    pub fn shuffle_mode_enabled(&self) -> bool {
        self.inner.player.shuffle_mode_enabled()
    }

    /// Surface the player renders into, once attached.
    pub fn texture(&self) -> Option<TextureId> {
        *self.inner.texture.lock()
    }

    // ========================================================================
    // Transport
    // ========================================================================

    pub fn play(&self) -> Result<()> {
        self.ensure_live()?;
        self.inner.player.set_play_when_ready(true);
        Ok(())
    }

    pub fn pause(&self) -> Result<()> {
        self.ensure_live()?;
        self.inner.player.set_play_when_ready(false);
        Ok(())
    }

    pub fn stop(&self) -> Result<()> {
        self.ensure_live()?;
        self.inner.player.stop();
        Ok(())
    }

    /// Seek within the current window.
    pub fn seek_to(&self, position_ms: u64) -> Result<()> {
        self.ensure_live()?;
        self.inner.player.seek_to(Duration::from_millis(position_ms));
        Ok(())
    }

    pub fn set_repeat_mode(&self, mode: RepeatMode) -> Result<()> {
        self.ensure_live()?;
        self.inner.player.set_repeat_mode(mode);
        Ok(())
    }

    pub fn set_shuffle_mode_enabled(&self, enabled: bool) -> Result<()> {
        self.ensure_live()?;
        self.inner.player.set_shuffle_mode_enabled(enabled);
        Ok(())
    }

    pub fn skip_to_next(&self) -> Result<bool> {
        self.ensure_live()?;
        Ok(self.inner.queue.lock().skip_to_next())
    }

    pub fn skip_to_previous(&self) -> Result<bool> {
        self.ensure_live()?;
        Ok(self.inner.queue.lock().skip_to_previous())
    }

    pub fn skip_to_index(&self, index: usize) -> Result<bool> {
        self.ensure_live()?;
        self.inner.queue.lock().skip_to_index(index)
    }

    /// Route video output to `texture`.
    pub fn attach_surface(&self, texture: TextureId) -> Result<()> {
        self.ensure_live()?;
        self.inner.player.set_video_surface(texture)?;
        *self.inner.texture.lock() = Some(texture);
        debug!(kind = %self.inner.kind, texture = texture.0, "Surface attached");
        Ok(())
    }

    // ========================================================================
    // Queue
    // ========================================================================

    /// Append `song`, prepare the player if it is idle, and jump to the song
    /// once the player has it.
    pub fn add_and_play(&self, song: Song) -> Result<()> {
        self.ensure_live()?;
        let session = Arc::downgrade(&self.inner);

        self.inner.queue.lock().append_with(song, move |source| {
            let action: CompletionAction = Box::new(move || {
                if let Some(inner) = session.upgrade() {
                    inner.seek_to_source(source);
                }
            });
            Some(action)
        })?;
        prepare_player(self.inner.player.as_ref())?;
        Ok(())
    }

    pub fn add_song(&self, song: Song) -> Result<()> {
        self.ensure_live()?;
        self.inner.queue.lock().append(song)?;
        Ok(())
    }

    /// Insert `song` right after the current window.
    pub fn play_next(&self, song: Song) -> Result<()> {
        self.ensure_live()?;
        let mut queue = self.inner.queue.lock();
        let index = if queue.is_empty() {
            0
        } else {
            (self.inner.player.current_window_index() + 1).min(queue.songs().len())
        };
        queue.insert_at(index, song)?;
        Ok(())
    }

    /// Returns `Ok(false)` when `index` is past the end.
    pub fn add_song_at_index(&self, index: usize, song: Song) -> Result<bool> {
        self.ensure_live()?;
        self.inner.queue.lock().insert_at(index, song)
    }

    pub fn remove_song(&self, key: &str) -> Result<bool> {
        self.ensure_live()?;
        self.inner.queue.lock().remove_by_key(key)
    }

    /// Replace the queue with `playlist` and prepare the player.
    #[instrument(skip(self, playlist), fields(kind = %self.inner.kind, songs = playlist.songs.len()))]
    pub fn set_playlist(&self, playlist: PlaylistDocument) -> Result<()> {
        self.ensure_live()?;
        let name = {
            let mut queue = self.inner.queue.lock();
            queue.replace(playlist.songs)?;
            if let Some(name) = playlist.playlist_name {
                queue.set_name(name);
            }
            queue.name().to_string()
        };
        prepare_player(self.inner.player.as_ref())?;
        info!(playlist = %name, "Playlist loaded");
        Ok(())
    }

    pub fn set_playlist_json(&self, json: &str) -> Result<()> {
        self.set_playlist(PlaylistDocument::from_json(json)?)
    }

    pub fn clear_playlist(&self) -> Result<()> {
        self.ensure_live()?;
        self.inner.queue.lock().clear()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Release the player. No listener hears from this session afterwards and
    /// pending deferred seeks are dropped. Calling it twice is harmless.
    #[instrument(skip(self), fields(kind = %self.inner.kind))]
    pub fn release(&self) {
        if self.inner.released.swap(true, Ordering::AcqRel) {
            return;
        }

        self.inner.listeners.clear();
        self.inner.player.set_event_handler(None);
        self.inner.player.release();
        self.inner.queue.lock().discard();
        info!("Playback session released");
    }
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("kind", &self.inner.kind)
            .field("queue", &*self.inner.queue.lock())
            .field("released", &self.inner.is_released())
            .finish()
    }
}

// ============================================================================
// Player callbacks
// ============================================================================

struct SessionEventHandler {
    session: Weak<SessionInner>,
}

impl SessionEventHandler {
    fn live(&self) -> Option<Arc<SessionInner>> {
        self.session
            .upgrade()
            .filter(|session| !session.is_released())
    }
}

impl PlayerEventHandler for SessionEventHandler {
    fn on_player_state_changed(&self, play_when_ready: bool, state: PlayerState) {
        if let Some(session) = self.live() {
            session.notify(MediaEvent::PlayerStateChanged {
                play_when_ready,
                playback_state: state,
            });
        }
    }

    fn on_repeat_mode_changed(&self, mode: RepeatMode) {
        if let Some(session) = self.live() {
            session.notify(MediaEvent::RepeatModeChanged { repeat_mode: mode });
        }
    }

    fn on_shuffle_mode_enabled_changed(&self, enabled: bool) {
        if let Some(session) = self.live() {
            session.notify(MediaEvent::ShuffleModeEnabledChanged {
                shuffle_mode_enabled: enabled,
            });
        }
    }

    fn on_media_period_created(&self, window_index: usize) {
        if let Some(session) = self.live() {
            let current_playing_song = session.queue.lock().song_at(window_index).cloned();
            session.notify(MediaEvent::MediaPeriodCreated {
                window_index,
                current_playing_song,
            });
        }
    }

    fn on_playback_update(&self, position: Duration, duration: Duration) {
        if let Some(session) = self.live() {
            session.notify(MediaEvent::PlaybackUpdate {
                position_ms: position.as_millis() as u64,
                duration_ms: duration.as_millis() as u64,
            });
        }
    }

    fn on_buffered_update(&self, percent: u8) {
        if let Some(session) = self.live() {
            session.notify(MediaEvent::BufferedUpdate { percent });
        }
    }

    fn on_player_status(&self, message: String) {
        if let Some(session) = self.live() {
            session.notify(MediaEvent::PlayerStatus { message });
        }
    }

    fn on_player_error(&self, err: PlayerError) {
        if let Some(session) = self.live() {
            error!(kind = %session.kind, error = %err, "Player error");
            session.notify(MediaEvent::PlayerStatus {
                message: err.to_string(),
            });
        }
    }

    fn on_video_size_changed(&self, width: u32, height: u32, duration: Duration) {
        let Some(session) = self.live() else {
            return;
        };
        let Some(texture_id) = *session.texture.lock() else {
            debug!(width, height, "Video size known before a surface was attached");
            return;
        };
        session.notify(MediaEvent::VideoInitialized {
            texture_id,
            width,
            height,
            duration_ms: duration.as_millis() as u64,
        });
    }

    fn on_timeline_changed(&self, window_count: usize) {
        debug!(window_count, "Timeline changed");
    }

    fn on_loading_changed(&self, is_loading: bool) {
        debug!(is_loading, "Loading changed");
    }

    fn on_seek_processed(&self) {
        debug!("Seek processed");
    }
}
