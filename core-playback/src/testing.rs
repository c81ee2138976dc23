//! In-memory player engine for tests.
//!
//! [`FakePlayer`] keeps a timeline of source handles and behaves like a
//! concatenating player with one twist: source-add completion actions and
//! window-change callbacks are queued until the test flushes them, so tests
//! decide when the "player thread" runs. State changes caused by
//! `set_play_when_ready`, `prepare`, `set_repeat_mode` and
//! `set_shuffle_mode_enabled` are reported synchronously.

use crate::listener::SessionListener;
use bridge_traits::{
    BridgeError, CompletionAction, MediaEngine, MediaKind, MediaPlayer, PlayerError,
    PlayerEventHandler, PlayerState, RepeatMode, SourceHandle, TextureId,
};
use core_runtime::events::{DownloadEvent, MediaEvent};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

/// URIs with this prefix are rejected by [`FakePlayer::create_source`].
pub const UNPLAYABLE_SCHEME: &str = "bad://";

#[derive(Default)]
struct FakeState {
    next_handle: u64,
    uris: HashMap<SourceHandle, String>,
    created: Vec<String>,
    timeline: Vec<SourceHandle>,
    pending: VecDeque<CompletionAction>,
    playback_state: Option<PlayerState>,
    play_when_ready: bool,
    current_window: usize,
    position: Duration,
    repeat_mode: RepeatMode,
    shuffle: bool,
    prepare_calls: usize,
    seeks: Vec<(usize, Option<Duration>)>,
    surface: Option<TextureId>,
    start_on_prepare: Option<usize>,
    stopped: bool,
    released: bool,
}

pub struct FakePlayer {
    kind: MediaKind,
    state: Mutex<FakeState>,
    handler: Mutex<Option<Arc<dyn PlayerEventHandler>>>,
}

impl FakePlayer {
    pub fn new(kind: MediaKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            state: Mutex::new(FakeState::default()),
            handler: Mutex::new(None),
        })
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    fn handler(&self) -> Option<Arc<dyn PlayerEventHandler>> {
        self.handler.lock().clone()
    }

    /// Run every queued source-add completion action, in order.
    pub fn flush_completions(&self) -> usize {
        let actions: Vec<CompletionAction> = self.state.lock().pending.drain(..).collect();
        let count = actions.len();
        for action in actions {
            action();
        }
        count
    }

    pub fn pending_completions(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Report that window `index` started playing.
    pub fn start_window(&self, index: usize) {
        self.state.lock().current_window = index;
        if let Some(handler) = self.handler() {
            handler.on_media_period_created(index);
        }
    }

    /// Make the next `prepare` report window `index` as started before it
    /// returns, the way an eager engine thread can.
    pub fn start_window_on_prepare(&self, index: usize) {
        self.state.lock().start_on_prepare = Some(index);
    }

    pub fn emit_state(&self, state: PlayerState) {
        let play_when_ready = {
            let mut inner = self.state.lock();
            inner.playback_state = Some(state);
            inner.play_when_ready
        };
        if let Some(handler) = self.handler() {
            handler.on_player_state_changed(play_when_ready, state);
        }
    }

    pub fn emit_progress(&self, position: Duration, duration: Duration) {
        if let Some(handler) = self.handler() {
            handler.on_playback_update(position, duration);
        }
    }

    pub fn emit_buffered(&self, percent: u8) {
        if let Some(handler) = self.handler() {
            handler.on_buffered_update(percent);
        }
    }

    pub fn emit_status(&self, message: &str) {
        if let Some(handler) = self.handler() {
            handler.on_player_status(message.to_string());
        }
    }

    pub fn emit_error(&self, error: PlayerError) {
        {
            let mut inner = self.state.lock();
            inner.playback_state = Some(PlayerState::Idle);
            inner.play_when_ready = false;
        }
        if let Some(handler) = self.handler() {
            handler.on_player_error(error);
        }
    }

    pub fn emit_video_size(&self, width: u32, height: u32, duration: Duration) {
        if let Some(handler) = self.handler() {
            handler.on_video_size_changed(width, height, duration);
        }
    }

    pub fn emit_diagnostics(&self) {
        if let Some(handler) = self.handler() {
            let windows = self.state.lock().timeline.len();
            handler.on_timeline_changed(windows);
            handler.on_loading_changed(true);
            handler.on_seek_processed();
        }
    }

    /// Set the reported state without notifying anyone.
    pub fn force_state(&self, state: PlayerState) {
        self.state.lock().playback_state = Some(state);
    }

    pub fn prepare_calls(&self) -> usize {
        self.state.lock().prepare_calls
    }

    pub fn seeks(&self) -> Vec<(usize, Option<Duration>)> {
        self.state.lock().seeks.clone()
    }

    pub fn position(&self) -> Duration {
        self.state.lock().position
    }

    /// URIs of every source created, including ones never added.
    pub fn created_uris(&self) -> Vec<String> {
        self.state.lock().created.clone()
    }

    /// URIs of the sources currently in the timeline, in window order.
    pub fn timeline_uris(&self) -> Vec<String> {
        let inner = self.state.lock();
        inner
            .timeline
            .iter()
            .filter_map(|handle| inner.uris.get(handle).cloned())
            .collect()
    }

    pub fn surface(&self) -> Option<TextureId> {
        self.state.lock().surface
    }

    pub fn has_handler(&self) -> bool {
        self.handler.lock().is_some()
    }

    pub fn is_stopped(&self) -> bool {
        self.state.lock().stopped
    }

    pub fn is_released(&self) -> bool {
        self.state.lock().released
    }
}

impl MediaPlayer for FakePlayer {
    fn create_source(&self, uri: &str) -> Result<SourceHandle, BridgeError> {
        if uri.starts_with(UNPLAYABLE_SCHEME) {
            return Err(BridgeError::InvalidSource(uri.to_string()));
        }

        let mut inner = self.state.lock();
        inner.next_handle += 1;
        let handle = SourceHandle(inner.next_handle);
        inner.uris.insert(handle, uri.to_string());
        inner.created.push(uri.to_string());
        Ok(handle)
    }

    fn add_source(
        &self,
        index: usize,
        source: SourceHandle,
        on_complete: Option<CompletionAction>,
    ) -> Result<(), BridgeError> {
        let mut inner = self.state.lock();
        if index > inner.timeline.len() {
            return Err(BridgeError::OperationFailed(format!(
                "index {} out of bounds",
                index
            )));
        }
        inner.timeline.insert(index, source);
        if let Some(action) = on_complete {
            inner.pending.push_back(action);
        }
        Ok(())
    }

    fn remove_source(&self, index: usize) -> Result<(), BridgeError> {
        let mut inner = self.state.lock();
        if index >= inner.timeline.len() {
            return Err(BridgeError::OperationFailed(format!(
                "index {} out of bounds",
                index
            )));
        }
        inner.timeline.remove(index);
        Ok(())
    }

    fn clear_sources(&self) -> Result<(), BridgeError> {
        let mut inner = self.state.lock();
        inner.timeline.clear();
        inner.current_window = 0;
        Ok(())
    }

    fn source_count(&self) -> usize {
        self.state.lock().timeline.len()
    }

    fn prepare(&self) -> Result<(), BridgeError> {
        let (play_when_ready, start) = {
            let mut inner = self.state.lock();
            inner.prepare_calls += 1;
            inner.stopped = false;
            inner.playback_state = Some(PlayerState::Buffering);
            (inner.play_when_ready, inner.start_on_prepare.take())
        };
        if let Some(handler) = self.handler() {
            handler.on_player_state_changed(play_when_ready, PlayerState::Buffering);
        }
        if let Some(index) = start {
            self.start_window(index);
        }
        Ok(())
    }

    fn playback_state(&self) -> PlayerState {
        self.state.lock().playback_state.unwrap_or(PlayerState::Idle)
    }

    fn set_play_when_ready(&self, play_when_ready: bool) {
        let state = {
            let mut inner = self.state.lock();
            inner.play_when_ready = play_when_ready;
            inner.playback_state.unwrap_or(PlayerState::Idle)
        };
        if let Some(handler) = self.handler() {
            handler.on_player_state_changed(play_when_ready, state);
        }
    }

    fn play_when_ready(&self) -> bool {
        self.state.lock().play_when_ready
    }

    fn seek_to_window(&self, window_index: usize, position: Option<Duration>) {
        let mut inner = self.state.lock();
        inner.seeks.push((window_index, position));
        inner.current_window = window_index;
        inner.position = position.unwrap_or(Duration::ZERO);
    }

    fn seek_to(&self, position: Duration) {
        self.state.lock().position = position;
    }

    fn current_window_index(&self) -> usize {
        self.state.lock().current_window
    }

    fn next_window_index(&self) -> Option<usize> {
        let inner = self.state.lock();
        let len = inner.timeline.len();
        if len == 0 {
            return None;
        }
        match inner.repeat_mode {
            RepeatMode::One => Some(inner.current_window),
            _ if inner.current_window + 1 < len => Some(inner.current_window + 1),
            RepeatMode::All => Some(0),
            RepeatMode::Off => None,
        }
    }

    fn previous_window_index(&self) -> Option<usize> {
        let inner = self.state.lock();
        let len = inner.timeline.len();
        if len == 0 {
            return None;
        }
        match inner.repeat_mode {
            RepeatMode::One => Some(inner.current_window),
            _ if inner.current_window > 0 => Some(inner.current_window - 1),
            RepeatMode::All => Some(len - 1),
            RepeatMode::Off => None,
        }
    }

    fn set_repeat_mode(&self, mode: RepeatMode) {
        self.state.lock().repeat_mode = mode;
        if let Some(handler) = self.handler() {
            handler.on_repeat_mode_changed(mode);
        }
    }

    fn repeat_mode(&self) -> RepeatMode {
        self.state.lock().repeat_mode
    }

    fn set_shuffle_mode_enabled(&self, enabled: bool) {
        self.state.lock().shuffle = enabled;
        if let Some(handler) = self.handler() {
            handler.on_shuffle_mode_enabled_changed(enabled);
        }
    }

    fn shuffle_mode_enabled(&self) -> bool {
        self.state.lock().shuffle
    }

    fn set_video_surface(&self, texture: TextureId) -> Result<(), BridgeError> {
        if self.kind != MediaKind::Video {
            return Err(BridgeError::NotAvailable(
                "player has no video output".to_string(),
            ));
        }
        self.state.lock().surface = Some(texture);
        Ok(())
    }

    fn stop(&self) {
        let mut inner = self.state.lock();
        inner.stopped = true;
        inner.playback_state = Some(PlayerState::Idle);
    }

    fn release(&self) {
        let mut inner = self.state.lock();
        inner.released = true;
        inner.playback_state = Some(PlayerState::Idle);
    }

    fn set_event_handler(&self, handler: Option<Arc<dyn PlayerEventHandler>>) {
        *self.handler.lock() = handler;
    }
}

/// Engine handing out one [`FakePlayer`] per call and remembering the last
/// player of each kind.
#[derive(Default)]
pub struct FakeEngine {
    players: Mutex<HashMap<MediaKind, Arc<FakePlayer>>>,
    created: Mutex<usize>,
    unavailable: Mutex<Vec<MediaKind>>,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Most recent player created for `kind`.
    pub fn player(&self, kind: MediaKind) -> Option<Arc<FakePlayer>> {
        self.players.lock().get(&kind).cloned()
    }

    pub fn players_created(&self) -> usize {
        *self.created.lock()
    }

    /// Make `create_player` fail for `kind`.
    pub fn refuse(&self, kind: MediaKind) {
        self.unavailable.lock().push(kind);
    }
}

impl MediaEngine for FakeEngine {
    fn create_player(&self, kind: MediaKind) -> Result<Arc<dyn MediaPlayer>, BridgeError> {
        if self.unavailable.lock().contains(&kind) {
            return Err(BridgeError::NotAvailable(format!("no {} decoder", kind)));
        }

        let player = FakePlayer::new(kind);
        self.players.lock().insert(kind, player.clone());
        *self.created.lock() += 1;
        Ok(player)
    }
}

/// Listener that records everything it is told.
#[derive(Default)]
pub struct RecordingListener {
    media: Mutex<Vec<(MediaKind, MediaEvent)>>,
    downloads: Mutex<Vec<DownloadEvent>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn media_events(&self) -> Vec<(MediaKind, MediaEvent)> {
        self.media.lock().clone()
    }

    pub fn download_events(&self) -> Vec<DownloadEvent> {
        self.downloads.lock().clone()
    }

    pub fn clear(&self) {
        self.media.lock().clear();
        self.downloads.lock().clear();
    }
}

impl SessionListener for RecordingListener {
    fn on_media_event(&self, kind: MediaKind, event: MediaEvent) {
        self.media.lock().push((kind, event));
    }

    fn on_download_event(&self, event: DownloadEvent) {
        self.downloads.lock().push(event);
    }
}
