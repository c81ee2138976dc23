//! # Session Listeners
//!
//! Sessions report what their player and download engine do through
//! [`SessionListener`]s. The host-facing [`EventBus`] is one; tests use a
//! recording listener.

use bridge_traits::MediaKind;
use core_runtime::events::{CoreEvent, DownloadEvent, EventBus, MediaEvent};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Receiver of session events.
///
/// Called on whatever thread the player or download engine reports on.
/// Implementations must not call back into the session that notifies them.
pub trait SessionListener: Send + Sync {
    fn on_media_event(&self, _kind: MediaKind, _event: MediaEvent) {}

    fn on_download_event(&self, _event: DownloadEvent) {}
}

impl SessionListener for EventBus {
    fn on_media_event(&self, kind: MediaKind, event: MediaEvent) {
        // No subscriber yet: the event is dropped
        let _ = self.emit(CoreEvent::media(kind, event));
    }

    fn on_download_event(&self, event: DownloadEvent) {
        let _ = self.emit(CoreEvent::Download(event));
    }
}

/// Handle returned by `add_listener`, used to remove that listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub(crate) struct ListenerSet {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(ListenerId, Arc<dyn SessionListener>)>>,
}

impl ListenerSet {
    pub(crate) fn add(&self, listener: Arc<dyn SessionListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, listener));
        id
    }

    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub(crate) fn clear(&self) {
        self.listeners.write().clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// Call `f` for every listener. The set is snapshotted first so a
    /// listener may add or remove listeners without deadlocking.
    pub(crate) fn for_each(&self, f: impl Fn(&dyn SessionListener)) {
        let snapshot: Vec<Arc<dyn SessionListener>> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in snapshot {
            f(listener.as_ref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingListener;
    use bridge_traits::DownloadState;

    #[test]
    fn removed_listener_stops_receiving() {
        let set = ListenerSet::default();
        let first = RecordingListener::new();
        let second = RecordingListener::new();
        let id = set.add(first.clone());
        set.add(second.clone());

        set.for_each(|l| l.on_media_event(MediaKind::Audio, status("one")));
        assert!(set.remove(id));
        assert!(!set.remove(id));
        set.for_each(|l| l.on_media_event(MediaKind::Audio, status("two")));

        assert_eq!(first.media_events().len(), 1);
        assert_eq!(second.media_events().len(), 2);
        assert_eq!(set.len(), 1);
    }

    #[tokio::test]
    async fn event_bus_listener_publishes_core_events() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        bus.on_download_event(DownloadEvent::Changed {
            url: "https://cdn.example.com/a.mp3".to_string(),
            state: DownloadState::Completed,
        });
        bus.on_media_event(MediaKind::Video, status("buffering"));

        let first = rx.recv().await.unwrap();
        assert_eq!(first.method_name(), "DOWNLOAD/onDownloadChanged");
        let second = rx.recv().await.unwrap();
        assert_eq!(second.method_name(), "VIDEO/onPlayerStatus");
    }

    #[test]
    fn event_bus_without_subscribers_drops_silently() {
        let bus = EventBus::new(8);
        bus.on_media_event(MediaKind::Audio, status("nobody listening"));
        assert_eq!(bus.subscriber_count(), 0);
    }

    fn status(message: &str) -> MediaEvent {
        MediaEvent::PlayerStatus {
            message: message.to_string(),
        }
    }
}
