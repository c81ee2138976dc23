//! # Event Bus System
//!
//! Typed events produced by playback and download sessions, delivered through
//! `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: [`CoreEvent`] wrapping [`MediaEvent`] and [`DownloadEvent`]
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   player callback   ┌───────────┐
//! │ Audio player ├────────────────────>│           │
//! └──────────────┘                     │           │
//! ┌──────────────┐   player callback   │ EventBus  │   subscribe   ┌───────────────┐
//! │ Video player ├────────────────────>│ (broadcast├──────────────>│ EventForwarder│──> MethodChannel
//! └──────────────┘                     │  channel) │               └───────────────┘
//! ┌──────────────┐   download change   │           │
//! │ Downloads    ├────────────────────>│           │
//! └──────────────┘                     └───────────┘
//! ```
//!
//! Every event knows its outward wire form: [`CoreEvent::method_name`] gives
//! the `"<KIND>/<event>"` name pushed to the host and [`CoreEvent::arguments`]
//! the argument record.
//!
//! ## Usage
//!
//! ```rust
//! use bridge_traits::{MediaKind, PlayerState};
//! use core_runtime::events::{CoreEvent, EventBus, MediaEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::media(
//!         MediaKind::Audio,
//!         MediaEvent::PlayerStateChanged {
//!             play_when_ready: true,
//!             playback_state: PlayerState::Ready,
//!         },
//!     ))
//!     .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.method_name(), "AUDIO/onPlayerStateChanged");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   Non-fatal; the subscriber continues with newer events.
//! - **`RecvError::Closed`**: All senders have been dropped. Treat as shutdown.
//!
//! ## Ordering
//!
//! A single broadcast channel carries every event, so subscribers observe
//! events in the order the player callbacks produced them.

use bridge_traits::{DownloadState, MediaKind, PlayerState, RepeatMode, Song, TextureId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Position ticks arrive several times a second per player, so the buffer is
/// sized to absorb a stalled forwarder for a few seconds.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Event from the audio or video playback session.
    Media { kind: MediaKind, event: MediaEvent },
    /// Event from the download session.
    Download(DownloadEvent),
}

impl CoreEvent {
    pub fn media(kind: MediaKind, event: MediaEvent) -> Self {
        CoreEvent::Media { kind, event }
    }

    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Media { event, .. } => event.description(),
            CoreEvent::Download(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Media {
                event: MediaEvent::PlayerStatus { .. },
                ..
            } => EventSeverity::Warning,
            CoreEvent::Download(DownloadEvent::Changed {
                state: DownloadState::Failed,
                ..
            }) => EventSeverity::Error,
            CoreEvent::Media {
                event: MediaEvent::PlaybackUpdate { .. } | MediaEvent::BufferedUpdate { .. },
                ..
            } => EventSeverity::Debug,
            _ => EventSeverity::Info,
        }
    }

    /// Outward method name, `"<KIND>/<event>"`.
    pub fn method_name(&self) -> String {
        match self {
            CoreEvent::Media { kind, event } => format!("{}/{}", kind, event.wire_name()),
            CoreEvent::Download(e) => format!("{}/{}", MediaKind::Download, e.wire_name()),
        }
    }

    /// Outward argument record.
    pub fn arguments(&self) -> Value {
        match self {
            CoreEvent::Media { event, .. } => event.arguments(),
            CoreEvent::Download(e) => e.arguments(),
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// High-frequency ticks
    Debug,
    /// State transitions
    Info,
    /// Player reported a problem
    Warning,
    /// Something failed for good
    Error,
}

impl fmt::Display for EventSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventSeverity::Debug => write!(f, "DEBUG"),
            EventSeverity::Info => write!(f, "INFO"),
            EventSeverity::Warning => write!(f, "WARNING"),
            EventSeverity::Error => write!(f, "ERROR"),
        }
    }
}

// ============================================================================
// Media Events
// ============================================================================

/// Events translated from player callbacks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum MediaEvent {
    /// Play/pause flag or playback state changed.
    PlayerStateChanged {
        play_when_ready: bool,
        playback_state: PlayerState,
    },
    RepeatModeChanged {
        repeat_mode: RepeatMode,
    },
    ShuffleModeEnabledChanged {
        shuffle_mode_enabled: bool,
    },
    /// A new window started playing.
    MediaPeriodCreated {
        window_index: usize,
        /// Song at `window_index`, if the queue still holds one there.
        current_playing_song: Option<Song>,
    },
    /// Position tick.
    PlaybackUpdate {
        position_ms: u64,
        duration_ms: u64,
    },
    BufferedUpdate {
        percent: u8,
    },
    /// Free-form status, including fatal player errors.
    PlayerStatus {
        message: String,
    },
    /// First frame size is known for the attached video surface.
    VideoInitialized {
        texture_id: TextureId,
        width: u32,
        height: u32,
        duration_ms: u64,
    },
}

impl MediaEvent {
    fn description(&self) -> &str {
        match self {
            MediaEvent::PlayerStateChanged { .. } => "Player state changed",
            MediaEvent::RepeatModeChanged { .. } => "Repeat mode changed",
            MediaEvent::ShuffleModeEnabledChanged { .. } => "Shuffle mode changed",
            MediaEvent::MediaPeriodCreated { .. } => "Now playing changed",
            MediaEvent::PlaybackUpdate { .. } => "Playback position updated",
            MediaEvent::BufferedUpdate { .. } => "Buffered percentage updated",
            MediaEvent::PlayerStatus { .. } => "Player status",
            MediaEvent::VideoInitialized { .. } => "Video surface initialized",
        }
    }

    /// Event half of the outward method name.
    pub fn wire_name(&self) -> &'static str {
        match self {
            MediaEvent::PlayerStateChanged { .. } => "onPlayerStateChanged",
            MediaEvent::RepeatModeChanged { .. } => "onRepeatModeChanged",
            MediaEvent::ShuffleModeEnabledChanged { .. } => "onShuffleModeEnabledChanged",
            MediaEvent::MediaPeriodCreated { .. } => "onMediaPeriodCreated",
            MediaEvent::PlaybackUpdate { .. } => "onPlaybackUpdate",
            MediaEvent::BufferedUpdate { .. } => "onBufferedUpdate",
            MediaEvent::PlayerStatus { .. } => "onPlayerStatus",
            MediaEvent::VideoInitialized { .. } => "videoInitialize",
        }
    }

    pub fn arguments(&self) -> Value {
        match self {
            MediaEvent::PlayerStateChanged {
                play_when_ready,
                playback_state,
            } => json!({
                "playWhenReady": play_when_ready,
                "playbackState": playback_state.code(),
            }),
            MediaEvent::RepeatModeChanged { repeat_mode } => json!({
                "repeatMode": repeat_mode.code(),
            }),
            MediaEvent::ShuffleModeEnabledChanged {
                shuffle_mode_enabled,
            } => json!({
                "shuffleModeEnabled": shuffle_mode_enabled,
            }),
            MediaEvent::MediaPeriodCreated {
                window_index,
                current_playing_song,
            } => json!({
                "windowIndex": window_index,
                "currentPlayingSong": current_playing_song
                    .as_ref()
                    .map(|song| Value::Object(song.to_record()))
                    .unwrap_or(Value::Null),
            }),
            MediaEvent::PlaybackUpdate {
                position_ms,
                duration_ms,
            } => json!({
                "position": position_ms,
                "audioLength": duration_ms,
            }),
            MediaEvent::BufferedUpdate { percent } => json!({ "percent": percent }),
            MediaEvent::PlayerStatus { message } => json!({ "message": message }),
            MediaEvent::VideoInitialized {
                texture_id,
                width,
                height,
                duration_ms,
            } => json!({
                "textureId": texture_id.0,
                "width": width,
                "height": height,
                "duration": duration_ms,
            }),
        }
    }
}

// ============================================================================
// Download Events
// ============================================================================

/// Events from the download engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum DownloadEvent {
    /// A tracked download moved to a new state.
    Changed { url: String, state: DownloadState },
}

impl DownloadEvent {
    fn description(&self) -> &str {
        match self {
            DownloadEvent::Changed { state, .. } => match state {
                DownloadState::Queued => "Download queued",
                DownloadState::Downloading => "Download in progress",
                DownloadState::Completed => "Download completed",
                DownloadState::Failed => "Download failed",
                DownloadState::Removed => "Download removed",
            },
        }
    }

    pub fn wire_name(&self) -> &'static str {
        match self {
            DownloadEvent::Changed { .. } => "onDownloadChanged",
        }
    }

    pub fn arguments(&self) -> Value {
        match self {
            DownloadEvent::Changed { url, state } => json!({
                "url": url,
                "state": state.code(),
            }),
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends, callable from a player's callback thread
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events to buffer per subscriber.
    ///   When a subscriber falls behind by more than this amount, it will
    ///   receive a `RecvError::Lagged` error.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new event bus with the default buffer size.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are none. Sessions ignore that error: events emitted
    /// before the host attaches a listener are dropped.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    ///
    /// ```rust
    /// use core_runtime::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.subscriber_count(), 0);
    ///
    /// let _subscriber = event_bus.subscribe();
    /// assert_eq!(event_bus.subscriber_count(), 1);
    /// ```
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with filtering.
///
/// ```rust
/// use bridge_traits::MediaKind;
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let video_only = EventStream::new(event_bus.subscribe()).filter(|event| {
///     matches!(event, CoreEvent::Media { kind: MediaKind::Video, .. })
/// });
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            let Some(filter) = &self.filter else {
                return Ok(event);
            };

            if filter(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    let Some(filter) = &self.filter else {
                        return Some(Ok(event));
                    };

                    if filter(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
