use bridge_traits::{BridgeError, MediaKind, MethodResponse};
use core_playback::PlaybackError;
use thiserror::Error;

/// Message given when video is requested without a foreground surface host.
pub const NO_ACTIVITY_MESSAGE: &str = "video_player plugin requires a foreground activity";

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Malformed method name: {0}")]
    MalformedMethod(String),

    #[error("Unknown media kind: {0}")]
    UnknownMediaKind(String),

    #[error("{kind} has no operation `{operation}`")]
    NotImplemented { kind: MediaKind, operation: String },

    #[error("Invalid argument `{name}`: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("{message}")]
    MissingResource { resource: String, message: String },

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

impl ServiceError {
    pub fn invalid_argument(name: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::InvalidArgument {
            name: name.into(),
            message: message.into(),
        }
    }

    /// No foreground activity can host a video surface.
    pub fn no_activity() -> Self {
        ServiceError::MissingResource {
            resource: "TextureRegistry".to_string(),
            message: NO_ACTIVITY_MESSAGE.to_string(),
        }
    }

    /// Stable error code reported to the caller.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::MalformedMethod(_) => "malformed_method",
            ServiceError::UnknownMediaKind(_) => "unknown_media_kind",
            ServiceError::NotImplemented { .. } => "not_implemented",
            ServiceError::InvalidArgument { .. } => "invalid_argument",
            ServiceError::MissingResource { .. } => "no_activity",
            ServiceError::Playback(PlaybackError::PlaylistFormat(_)) => "playlist_error",
            ServiceError::Runtime(_) | ServiceError::Playback(_) | ServiceError::Bridge(_) => {
                "internal_error"
            }
        }
    }

    pub fn into_response(self) -> MethodResponse {
        match self {
            ServiceError::NotImplemented { .. } => MethodResponse::NotImplemented,
            other => MethodResponse::error(other.code(), other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_visible_codes() {
        assert_eq!(
            ServiceError::MalformedMethod("play".into()).code(),
            "malformed_method"
        );
        assert_eq!(
            ServiceError::invalid_argument("index", "missing").code(),
            "invalid_argument"
        );
        assert_eq!(
            ServiceError::from(PlaybackError::QueueInconsistent {
                songs: 2,
                sources: 1
            })
            .code(),
            "internal_error"
        );

        let format = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(
            ServiceError::from(PlaybackError::from(format)).code(),
            "playlist_error"
        );
    }

    #[test]
    fn no_activity_response_carries_host_message() {
        let response = ServiceError::no_activity().into_response();
        assert_eq!(
            response,
            MethodResponse::error("no_activity", NO_ACTIVITY_MESSAGE)
        );
    }

    #[test]
    fn unknown_operation_is_not_implemented() {
        let err = ServiceError::NotImplemented {
            kind: MediaKind::Video,
            operation: "rewind".into(),
        };
        assert_eq!(err.to_string(), "VIDEO has no operation `rewind`");
        assert_eq!(err.into_response(), MethodResponse::NotImplemented);
    }
}
