//! # Download Session
//!
//! Tracks downloads requested through the bridge, keyed by URL, and reports
//! every state change of a tracked download to its listeners.
//!
//! The session adopts whatever the download engine already knows about when
//! it is created, so `is_downloaded` holds across process restarts.

use crate::error::Result;
use crate::listener::{ListenerId, ListenerSet, SessionListener};
use bridge_traits::{DownloadListener, DownloadService, DownloadState};
use core_runtime::events::DownloadEvent;
use core_runtime::logging::redact_url;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

struct DownloadInner {
    service: Arc<dyn DownloadService>,
    downloads: RwLock<HashMap<String, DownloadState>>,
    listeners: ListenerSet,
}

impl DownloadInner {
    fn notify(&self, url: &str, state: DownloadState) {
        let event = DownloadEvent::Changed {
            url: url.to_string(),
            state,
        };
        self.listeners
            .for_each(|listener| listener.on_download_event(event.clone()));
    }
}

/// Handle to the download session. Clones share the same state.
#[derive(Clone)]
pub struct DownloadSession {
    inner: Arc<DownloadInner>,
}

impl DownloadSession {
    pub fn new(service: Arc<dyn DownloadService>) -> Self {
        let downloads: HashMap<String, DownloadState> = service
            .current_downloads()
            .into_iter()
            .filter(|(_, state)| *state != DownloadState::Removed)
            .collect();
        info!(tracked = downloads.len(), "Download session opened");

        let inner = Arc::new(DownloadInner {
            service: service.clone(),
            downloads: RwLock::new(downloads),
            listeners: ListenerSet::default(),
        });

        service.set_listener(Some(Arc::new(DownloadTracker {
            session: Arc::downgrade(&inner),
        })));

        Self { inner }
    }

    pub fn add_listener(&self, listener: Arc<dyn SessionListener>) -> ListenerId {
        self.inner.listeners.add(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }

    /// Request `url`. Already tracked URLs are left alone unless their last
    /// attempt failed.
    ///
    /// The URL is tracked as queued before the engine hears about it, so
    /// reports the engine sends while the request is still in flight are
    /// kept. Returns whether a new request was issued.
    pub fn download(&self, url: &str) -> Result<bool> {
        let previous = self.state(url);
        if let Some(state) = previous {
            if state != DownloadState::Failed {
                debug!(url = %redact_url(url), ?state, "Download already tracked");
                return Ok(false);
            }
        }

        self.inner
            .downloads
            .write()
            .insert(url.to_string(), DownloadState::Queued);
        info!(url = %redact_url(url), "Download requested");
        self.inner.notify(url, DownloadState::Queued);

        if let Err(err) = self.inner.service.start_download(url) {
            warn!(url = %redact_url(url), error = %err, "Download engine refused request");
            let restored = {
                let mut downloads = self.inner.downloads.write();
                match previous {
                    Some(state) => {
                        downloads.insert(url.to_string(), state);
                        Some(state)
                    }
                    None => downloads.remove(url).map(|_| DownloadState::Removed),
                }
            };
            if let Some(state) = restored {
                self.inner.notify(url, state);
            }
            return Err(err.into());
        }
        Ok(true)
    }

    /// Cancel or delete `url`. Untracked URLs are ignored.
    pub fn remove_download(&self, url: &str) -> Result<bool> {
        if self.state(url).is_none() {
            debug!(url = %redact_url(url), "Remove for untracked download");
            return Ok(false);
        }

        self.inner.service.remove_download(url)?;
        // The engine may already have reported the removal
        if self.inner.downloads.write().remove(url).is_some() {
            self.inner.notify(url, DownloadState::Removed);
        }
        info!(url = %redact_url(url), "Download removed");
        Ok(true)
    }

    /// Tracked URLs answer from the session; anything else is asked of the
    /// engine.
    pub fn is_downloaded(&self, url: &str) -> bool {
        match self.state(url) {
            Some(state) => state == DownloadState::Completed,
            None => self.inner.service.is_downloaded(url),
        }
    }

    pub fn state(&self, url: &str) -> Option<DownloadState> {
        self.inner.downloads.read().get(url).copied()
    }

    /// Detach from the download engine.
    pub fn close(&self) {
        self.inner.service.set_listener(None);
        self.inner.listeners.clear();
    }
}

impl std::fmt::Debug for DownloadSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadSession")
            .field("tracked", &self.inner.downloads.read().len())
            .finish()
    }
}

struct DownloadTracker {
    session: Weak<DownloadInner>,
}

impl DownloadListener for DownloadTracker {
    fn on_download_changed(&self, url: &str, state: DownloadState) {
        let Some(session) = self.session.upgrade() else {
            return;
        };

        let changed = {
            let mut downloads = session.downloads.write();
            match downloads.get(url).copied() {
                None => {
                    debug!(url = %redact_url(url), ?state, "Ignoring untracked download");
                    false
                }
                Some(_) if state == DownloadState::Removed => {
                    downloads.remove(url);
                    true
                }
                Some(previous) if previous == state => false,
                Some(_) => {
                    downloads.insert(url.to_string(), state);
                    true
                }
            }
        };

        if changed {
            match state {
                DownloadState::Failed => warn!(url = %redact_url(url), "Download failed"),
                state if state.is_terminal() => {
                    info!(url = %redact_url(url), ?state, "Download finished")
                }
                _ => {}
            }
            session.notify(url, state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingListener;
    use bridge_traits::BridgeError;
    use mockall::mock;
    use parking_lot::Mutex;

    mock! {
        Service {}

        impl DownloadService for Service {
            fn start_download(&self, url: &str) -> bridge_traits::error::Result<()>;
            fn remove_download(&self, url: &str) -> bridge_traits::error::Result<()>;
            fn is_downloaded(&self, url: &str) -> bool;
            fn current_downloads(&self) -> Vec<(String, DownloadState)>;
            fn set_listener(&self, listener: Option<Arc<dyn DownloadListener>>);
        }
    }

    const URL: &str = "http://x/y.mp4";

    /// Mock service that hands its listener back to the test.
    fn service(
        existing: Vec<(String, DownloadState)>,
    ) -> (MockService, Arc<Mutex<Option<Arc<dyn DownloadListener>>>>) {
        let slot: Arc<Mutex<Option<Arc<dyn DownloadListener>>>> = Arc::new(Mutex::new(None));
        let mut service = MockService::new();
        service
            .expect_current_downloads()
            .return_once(move || existing);
        let sink = slot.clone();
        service
            .expect_set_listener()
            .returning(move |listener| *sink.lock() = listener);
        (service, slot)
    }

    fn engine_reports(slot: &Mutex<Option<Arc<dyn DownloadListener>>>, state: DownloadState) {
        let listener = slot.lock().clone().unwrap();
        listener.on_download_changed(URL, state);
    }

    #[test]
    fn completes_after_engine_reports() {
        let (mut service, slot) = service(vec![]);
        service
            .expect_start_download()
            .withf(|url| url == URL)
            .times(1)
            .returning(|_| Ok(()));
        let session = DownloadSession::new(Arc::new(service));
        let listener = RecordingListener::new();
        session.add_listener(listener.clone());

        assert!(session.download(URL).unwrap());
        assert!(!session.is_downloaded(URL));

        engine_reports(&slot, DownloadState::Downloading);
        engine_reports(&slot, DownloadState::Downloading);
        engine_reports(&slot, DownloadState::Completed);
        assert!(session.is_downloaded(URL));

        let states: Vec<DownloadState> = listener
            .download_events()
            .into_iter()
            .map(|DownloadEvent::Changed { state, .. }| state)
            .collect();
        assert_eq!(
            states,
            vec![
                DownloadState::Queued,
                DownloadState::Downloading,
                DownloadState::Completed
            ]
        );
    }

    #[test]
    fn download_is_idempotent() {
        let (mut service, _slot) = service(vec![]);
        service
            .expect_start_download()
            .times(1)
            .returning(|_| Ok(()));
        let session = DownloadSession::new(Arc::new(service));

        assert!(session.download(URL).unwrap());
        assert!(!session.download(URL).unwrap());
    }

    #[test]
    fn failed_download_can_be_retried() {
        let (mut service, slot) = service(vec![]);
        service
            .expect_start_download()
            .times(2)
            .returning(|_| Ok(()));
        let session = DownloadSession::new(Arc::new(service));

        session.download(URL).unwrap();
        engine_reports(&slot, DownloadState::Failed);
        assert_eq!(session.state(URL), Some(DownloadState::Failed));
        assert!(session.download(URL).unwrap());
        assert_eq!(session.state(URL), Some(DownloadState::Queued));
    }

    #[test]
    fn engine_refusal_is_not_tracked() {
        let (mut service, _slot) = service(vec![]);
        service
            .expect_start_download()
            .returning(|_| Err(BridgeError::OperationFailed("disk full".into())));
        let session = DownloadSession::new(Arc::new(service));

        assert!(session.download(URL).is_err());
        assert_eq!(session.state(URL), None);
    }

    #[test]
    fn remove_untracked_is_a_noop() {
        let (mut service, _slot) = service(vec![]);
        service.expect_remove_download().never();
        let session = DownloadSession::new(Arc::new(service));

        assert!(!session.remove_download(URL).unwrap());
    }

    #[test]
    fn remove_tracked_download() {
        let (mut service, _slot) = service(vec![(URL.to_string(), DownloadState::Completed)]);
        service
            .expect_remove_download()
            .withf(|url| url == URL)
            .times(1)
            .returning(|_| Ok(()));
        service.expect_is_downloaded().returning(|_| false);
        let session = DownloadSession::new(Arc::new(service));
        let listener = RecordingListener::new();
        session.add_listener(listener.clone());

        assert!(session.is_downloaded(URL));
        assert!(session.remove_download(URL).unwrap());
        assert!(!session.is_downloaded(URL));
        assert_eq!(
            listener.download_events(),
            vec![DownloadEvent::Changed {
                url: URL.to_string(),
                state: DownloadState::Removed
            }]
        );
    }

    #[test]
    fn untracked_engine_updates_are_ignored() {
        let (mut service, slot) = service(vec![]);
        service.expect_is_downloaded().returning(|_| false);
        let session = DownloadSession::new(Arc::new(service));
        let listener = RecordingListener::new();
        session.add_listener(listener.clone());

        engine_reports(&slot, DownloadState::Completed);
        assert!(!session.is_downloaded(URL));
        assert!(listener.download_events().is_empty());
    }

    #[test]
    fn reports_during_the_request_are_kept() {
        let (mut service, slot) = service(vec![]);
        let engine = slot.clone();
        service.expect_start_download().times(1).returning(move |url| {
            let listener = engine.lock().clone().unwrap();
            listener.on_download_changed(url, DownloadState::Downloading);
            listener.on_download_changed(url, DownloadState::Completed);
            Ok(())
        });
        let session = DownloadSession::new(Arc::new(service));
        let listener = RecordingListener::new();
        session.add_listener(listener.clone());

        assert!(session.download(URL).unwrap());
        assert!(session.is_downloaded(URL));

        let states: Vec<DownloadState> = listener
            .download_events()
            .into_iter()
            .map(|DownloadEvent::Changed { state, .. }| state)
            .collect();
        assert_eq!(
            states,
            vec![
                DownloadState::Queued,
                DownloadState::Downloading,
                DownloadState::Completed
            ]
        );
    }

    #[test]
    fn refused_retry_stays_failed() {
        let (mut service, _slot) = service(vec![(URL.to_string(), DownloadState::Failed)]);
        service
            .expect_start_download()
            .returning(|_| Err(BridgeError::OperationFailed("disk full".into())));
        let session = DownloadSession::new(Arc::new(service));
        let listener = RecordingListener::new();
        session.add_listener(listener.clone());

        assert!(session.download(URL).is_err());
        assert_eq!(session.state(URL), Some(DownloadState::Failed));
        let states: Vec<DownloadState> = listener
            .download_events()
            .into_iter()
            .map(|DownloadEvent::Changed { state, .. }| state)
            .collect();
        assert_eq!(states, vec![DownloadState::Queued, DownloadState::Failed]);
    }

    #[test]
    fn removal_reported_by_engine_is_announced_once() {
        let (mut service, slot) = service(vec![(URL.to_string(), DownloadState::Completed)]);
        let engine = slot.clone();
        service.expect_remove_download().times(1).returning(move |url| {
            let listener = engine.lock().clone().unwrap();
            listener.on_download_changed(url, DownloadState::Removed);
            Ok(())
        });
        let session = DownloadSession::new(Arc::new(service));
        let listener = RecordingListener::new();
        session.add_listener(listener.clone());

        assert!(session.remove_download(URL).unwrap());
        assert_eq!(session.state(URL), None);
        assert_eq!(
            listener.download_events(),
            vec![DownloadEvent::Changed {
                url: URL.to_string(),
                state: DownloadState::Removed
            }]
        );
    }

    #[test]
    fn untracked_urls_are_answered_by_the_engine() {
        let (mut service, _slot) = service(vec![]);
        service
            .expect_is_downloaded()
            .withf(|url| url == URL)
            .times(1)
            .returning(|_| true);
        let session = DownloadSession::new(Arc::new(service));

        assert!(session.is_downloaded(URL));
        assert_eq!(session.state(URL), None);
    }

    #[test]
    fn close_detaches_from_engine() {
        let (service, slot) = service(vec![(URL.to_string(), DownloadState::Downloading)]);
        let session = DownloadSession::new(Arc::new(service));
        assert!(slot.lock().is_some());

        session.close();
        assert!(slot.lock().is_none());
    }
}
