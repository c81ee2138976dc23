//! Media engine bridge traits and the wire value types shared with the host.
//!
//! The core never decodes or renders media itself. A host platform provides a
//! [`MediaEngine`] that hands out opaque [`MediaPlayer`] handles, each of which
//! owns a concatenated source timeline (one window per prepared source) and
//! reports its state transitions through a [`PlayerEventHandler`].
//!
//! ## Callback contract
//!
//! Players deliver [`PlayerEventHandler::on_media_period_created`] and
//! source-add completion actions from their own thread, never re-entrantly
//! from inside a control call such as [`MediaPlayer::add_source`] or
//! [`MediaPlayer::seek_to_window`]. State-change callbacks triggered by
//! [`MediaPlayer::set_play_when_ready`] may be delivered synchronously.

use crate::{error::Result, platform::PlatformSendSync, BridgeError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Request namespace on the method channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaKind {
    Audio,
    Video,
    Download,
}

impl MediaKind {
    /// Wire prefix used for requests and event pushes.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Audio => "AUDIO",
            MediaKind::Video => "VIDEO",
            MediaKind::Download => "DOWNLOAD",
        }
    }

    /// Parse a wire prefix. Older hosts send `AUDIO_TYPE` style prefixes,
    /// which are accepted as aliases.
    pub fn from_wire(value: &str) -> Option<Self> {
        let name = value.strip_suffix("_TYPE").unwrap_or(value);
        match name {
            "AUDIO" => Some(MediaKind::Audio),
            "VIDEO" => Some(MediaKind::Video),
            "DOWNLOAD" => Some(MediaKind::Download),
            _ => None,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Playback state reported by the opaque player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerState {
    /// No source prepared, or the player was stopped.
    Idle,
    /// Waiting for data before playback can continue.
    Buffering,
    /// Able to play immediately from the current position.
    Ready,
    /// Reached the end of the timeline.
    Ended,
}

impl PlayerState {
    /// Integer code used on the wire.
    pub fn code(&self) -> i32 {
        match self {
            PlayerState::Idle => 1,
            PlayerState::Buffering => 2,
            PlayerState::Ready => 3,
            PlayerState::Ended => 4,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(PlayerState::Idle),
            2 => Some(PlayerState::Buffering),
            3 => Some(PlayerState::Ready),
            4 => Some(PlayerState::Ended),
            _ => None,
        }
    }

    /// `true` when `prepare` would take effect.
    pub fn needs_prepare(&self) -> bool {
        matches!(self, PlayerState::Idle | PlayerState::Ended)
    }
}

/// Repeat behaviour of the player timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RepeatMode {
    #[default]
    Off,
    /// Repeat the current window.
    One,
    /// Repeat the whole timeline.
    All,
}

impl RepeatMode {
    pub fn code(&self) -> i32 {
        match self {
            RepeatMode::Off => 0,
            RepeatMode::One => 1,
            RepeatMode::All => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(RepeatMode::Off),
            1 => Some(RepeatMode::One),
            2 => Some(RepeatMode::All),
            _ => None,
        }
    }
}

/// Opaque handle to a source the player has built from a media URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceHandle(pub u64);

/// Identifier of a host surface texture that video frames render into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureId(pub i64);

/// Action run by the player once an added source is part of its timeline.
pub type CompletionAction = Box<dyn FnOnce() + Send + 'static>;

/// Category of a fatal player error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerErrorKind {
    /// Loading or parsing the media failed (network, container).
    Source,
    /// Decoding or rendering failed.
    Renderer,
    Unexpected,
}

/// Fatal error reported by the player. Playback halts; the player stays usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerError {
    pub kind: PlayerErrorKind,
    pub message: String,
}

impl PlayerError {
    pub fn new(kind: PlayerErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for PlayerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            PlayerErrorKind::Source => "source",
            PlayerErrorKind::Renderer => "renderer",
            PlayerErrorKind::Unexpected => "unexpected",
        };
        write!(f, "{} error: {}", kind, self.message)
    }
}

/// Receiver for player callbacks.
///
/// Callbacks run on the player's thread and must return quickly.
pub trait PlayerEventHandler: PlatformSendSync {
    fn on_player_state_changed(&self, play_when_ready: bool, state: PlayerState);

    fn on_repeat_mode_changed(&self, mode: RepeatMode);

    fn on_shuffle_mode_enabled_changed(&self, enabled: bool);

    /// A new window started playing.
    fn on_media_period_created(&self, window_index: usize);

    fn on_playback_update(&self, position: Duration, duration: Duration);

    fn on_buffered_update(&self, percent: u8);

    /// Free-form status line from the engine.
    fn on_player_status(&self, message: String);

    fn on_player_error(&self, error: PlayerError);

    /// First frame size known for the attached video surface.
    fn on_video_size_changed(&self, _width: u32, _height: u32, _duration: Duration) {}

    fn on_timeline_changed(&self, _window_count: usize) {}

    fn on_loading_changed(&self, _is_loading: bool) {}

    fn on_seek_processed(&self) {}
}

/// Opaque player handle owning a concatenated source timeline.
pub trait MediaPlayer: PlatformSendSync {
    /// Build a source for `uri`. The source is not yet part of the timeline.
    fn create_source(&self, uri: &str) -> Result<SourceHandle>;

    /// Insert `source` into the timeline at `index`. `on_complete` runs on
    /// the player's thread once the timeline includes the new window.
    fn add_source(
        &self,
        index: usize,
        source: SourceHandle,
        on_complete: Option<CompletionAction>,
    ) -> Result<()>;

    fn remove_source(&self, index: usize) -> Result<()>;

    fn clear_sources(&self) -> Result<()>;

    /// Number of sources in the concatenated source.
    fn source_count(&self) -> usize;

    /// Prepare the player with its concatenated source.
    fn prepare(&self) -> Result<()>;

    fn playback_state(&self) -> PlayerState;

    fn set_play_when_ready(&self, play_when_ready: bool);

    fn play_when_ready(&self) -> bool;

    /// Seek into a window. `None` leaves the position unset so the player
    /// picks the window's default start.
    fn seek_to_window(&self, window_index: usize, position: Option<Duration>);

    /// Seek within the current window.
    fn seek_to(&self, position: Duration);

    fn current_window_index(&self) -> usize;

    /// Next window under the current repeat and shuffle modes.
    fn next_window_index(&self) -> Option<usize>;

    fn previous_window_index(&self) -> Option<usize>;

    fn set_repeat_mode(&self, mode: RepeatMode);

    fn repeat_mode(&self) -> RepeatMode;

    fn set_shuffle_mode_enabled(&self, enabled: bool);

    fn shuffle_mode_enabled(&self) -> bool;

    /// Route video output into a host surface. Audio-only players keep the
    /// default.
    fn set_video_surface(&self, _texture: TextureId) -> Result<()> {
        Err(BridgeError::NotAvailable(
            "player has no video output".to_string(),
        ))
    }

    fn stop(&self);

    /// Relinquish the player's native resources.
    fn release(&self);

    fn set_event_handler(&self, handler: Option<Arc<dyn PlayerEventHandler>>);
}

/// Factory for player handles.
pub trait MediaEngine: PlatformSendSync {
    fn create_player(&self, kind: MediaKind) -> Result<Arc<dyn MediaPlayer>>;
}
