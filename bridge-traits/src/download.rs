//! Download engine bridge traits.
//!
//! The host owns the actual transfer (Android `DownloadService`, iOS
//! background `URLSession`). The core only requests downloads by URL and
//! observes their state changes.

use crate::{error::Result, platform::PlatformSendSync};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Lifecycle of a single download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DownloadState {
    Queued,
    Downloading,
    Completed,
    Failed,
    Removed,
}

impl DownloadState {
    /// Integer code used on the wire.
    pub fn code(&self) -> i32 {
        match self {
            DownloadState::Queued => 0,
            DownloadState::Downloading => 2,
            DownloadState::Completed => 3,
            DownloadState::Failed => 4,
            DownloadState::Removed => 5,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(DownloadState::Queued),
            2 => Some(DownloadState::Downloading),
            3 => Some(DownloadState::Completed),
            4 => Some(DownloadState::Failed),
            5 => Some(DownloadState::Removed),
            _ => None,
        }
    }

    /// No further transitions are expected without a new request.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DownloadState::Completed | DownloadState::Failed | DownloadState::Removed
        )
    }
}

/// Receiver for download state changes. Called on the engine's thread.
pub trait DownloadListener: PlatformSendSync {
    fn on_download_changed(&self, url: &str, state: DownloadState);
}

/// Opaque download engine.
pub trait DownloadService: PlatformSendSync {
    /// Enqueue a download for `url`.
    fn start_download(&self, url: &str) -> Result<()>;

    /// Cancel and delete the download for `url`.
    fn remove_download(&self, url: &str) -> Result<()>;

    /// Whether the engine holds a completed copy of `url`.
    fn is_downloaded(&self, url: &str) -> bool;

    /// Downloads the engine already knows about, e.g. from a previous run.
    fn current_downloads(&self) -> Vec<(String, DownloadState)>;

    fn set_listener(&self, listener: Option<Arc<dyn DownloadListener>>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_state_codes_round_trip() {
        for state in [
            DownloadState::Queued,
            DownloadState::Downloading,
            DownloadState::Completed,
            DownloadState::Failed,
            DownloadState::Removed,
        ] {
            assert_eq!(DownloadState::from_code(state.code() as i64), Some(state));
        }
        assert_eq!(DownloadState::from_code(1), None);
    }

    #[test]
    fn terminal_states() {
        assert!(!DownloadState::Queued.is_terminal());
        assert!(!DownloadState::Downloading.is_terminal());
        assert!(DownloadState::Completed.is_terminal());
        assert!(DownloadState::Failed.is_terminal());
    }
}
