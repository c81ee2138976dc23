//! Typed requests decoded from method calls.
//!
//! A method name is `"<KIND>/<operation>"`; everything before the first `/`
//! selects the session, the rest the operation. Arguments are decoded here
//! once, so the dispatcher only ever sees well-typed values.

use crate::error::{Result, ServiceError};
use bridge_traits::{MediaKind, MethodCall, RepeatMode, Song};
use serde::de::DeserializeOwned;

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Audio(AudioOp),
    Video(VideoOp),
    Download(DownloadOp),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AudioOp {
    Initialize,
    Play,
    Pause,
    Stop,
    Release,
    SeekTo { position_ms: u64 },
    AddAndPlay(Song),
    AddSong(Song),
    PlayNext(Song),
    AddSongAtIndex { index: usize, song: Song },
    RemoveSong(Song),
    /// Raw playlist JSON.
    SetPlaylist(String),
    GetPlaylist,
    ClearPlaylist,
    SetRepeatMode(RepeatMode),
    GetRepeatMode,
    SetShuffleModeEnabled(bool),
    GetShuffleModeEnabled,
    SkipToNext,
    SkipToPrevious,
    SkipToIndex(usize),
}

/// Where a video comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    Uri(String),
    /// Bundled asset name, resolved through the host.
    Asset(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum VideoOp {
    Initialize,
    AddAndPlay(VideoSource),
    InitSetTexture,
    Play,
    Pause,
    Release,
}

/// Download operations. A missing `url` is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOp {
    Download(Option<String>),
    Remove(Option<String>),
    IsDownloaded(Option<String>),
}

impl Request {
    pub fn parse(call: &MethodCall) -> Result<Self> {
        let Some((kind, operation)) = call.method.split_once('/') else {
            return Err(ServiceError::MalformedMethod(call.method.clone()));
        };
        if operation.is_empty() {
            return Err(ServiceError::MalformedMethod(call.method.clone()));
        }

        let kind = MediaKind::from_wire(kind)
            .ok_or_else(|| ServiceError::UnknownMediaKind(kind.to_string()))?;

        match kind {
            MediaKind::Audio => parse_audio(operation, call).map(Request::Audio),
            MediaKind::Video => parse_video(operation, call).map(Request::Video),
            MediaKind::Download => parse_download(operation, call).map(Request::Download),
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            Request::Audio(_) => MediaKind::Audio,
            Request::Video(_) => MediaKind::Video,
            Request::Download(_) => MediaKind::Download,
        }
    }
}

fn parse_audio(operation: &str, call: &MethodCall) -> Result<AudioOp> {
    let op = match operation {
        "initialize" => AudioOp::Initialize,
        "play" => AudioOp::Play,
        "pause" => AudioOp::Pause,
        "stop" => AudioOp::Stop,
        "release" => AudioOp::Release,
        "seekTo" => AudioOp::SeekTo {
            position_ms: required(call, "position")?,
        },
        "addAndPlay" => AudioOp::AddAndPlay(song(call)?),
        "addSong" => AudioOp::AddSong(song(call)?),
        "playNext" => AudioOp::PlayNext(song(call)?),
        "addSongAtIndex" => AudioOp::AddSongAtIndex {
            index: required(call, "index")?,
            song: song(call)?,
        },
        "removeSong" => AudioOp::RemoveSong(song(call)?),
        "setPlaylist" => AudioOp::SetPlaylist(required(call, "playlist")?),
        "getPlaylist" => AudioOp::GetPlaylist,
        "clearPlaylist" => AudioOp::ClearPlaylist,
        "setRepeatMode" => {
            let code: i64 = required(call, "repeatMode")?;
            let mode = RepeatMode::from_code(code).ok_or_else(|| {
                ServiceError::invalid_argument("repeatMode", format!("unknown repeat mode {}", code))
            })?;
            AudioOp::SetRepeatMode(mode)
        }
        "getRepeatMode" => AudioOp::GetRepeatMode,
        "setShuffleModeEnabled" => {
            AudioOp::SetShuffleModeEnabled(required(call, "shuffleModeEnabled")?)
        }
        "getShuffleModeEnabled" => AudioOp::GetShuffleModeEnabled,
        "skipToNext" => AudioOp::SkipToNext,
        "skipToPrevious" => AudioOp::SkipToPrevious,
        "skipToIndex" => AudioOp::SkipToIndex(required(call, "index")?),
        other => return Err(not_implemented(MediaKind::Audio, other)),
    };
    Ok(op)
}

fn parse_video(operation: &str, call: &MethodCall) -> Result<VideoOp> {
    let op = match operation {
        "initialize" => VideoOp::Initialize,
        "addAndPlay" => {
            let uri: Option<String> = optional(call, "uri")?;
            let asset: Option<String> = optional(call, "asset")?;
            let source = match (uri, asset) {
                (Some(uri), None) => VideoSource::Uri(uri),
                (None, Some(asset)) => VideoSource::Asset(asset),
                (Some(_), Some(_)) => {
                    return Err(ServiceError::invalid_argument(
                        "uri",
                        "give either `uri` or `asset`, not both",
                    ))
                }
                (None, None) => {
                    return Err(ServiceError::invalid_argument(
                        "uri",
                        "one of `uri` or `asset` is required",
                    ))
                }
            };
            VideoOp::AddAndPlay(source)
        }
        "initSetTexture" => VideoOp::InitSetTexture,
        "play" => VideoOp::Play,
        "pause" => VideoOp::Pause,
        "release" => VideoOp::Release,
        other => return Err(not_implemented(MediaKind::Video, other)),
    };
    Ok(op)
}

fn parse_download(operation: &str, call: &MethodCall) -> Result<DownloadOp> {
    let url: Option<String> = optional(call, "url")?;
    let op = match operation {
        "download" => DownloadOp::Download(url),
        "downloadRemove" => DownloadOp::Remove(url),
        "isDownloaded" => DownloadOp::IsDownloaded(url),
        other => return Err(not_implemented(MediaKind::Download, other)),
    };
    Ok(op)
}

fn not_implemented(kind: MediaKind, operation: &str) -> ServiceError {
    ServiceError::NotImplemented {
        kind,
        operation: operation.to_string(),
    }
}

fn optional<T: DeserializeOwned>(call: &MethodCall, key: &str) -> Result<Option<T>> {
    call.argument(key)
        .map_err(|err| ServiceError::invalid_argument(key, err.to_string()))
}

fn required<T: DeserializeOwned>(call: &MethodCall, key: &str) -> Result<T> {
    optional(call, key)?.ok_or_else(|| ServiceError::invalid_argument(key, "missing"))
}

/// The argument record itself carries the song fields.
fn song(call: &MethodCall) -> Result<Song> {
    Song::from_value(&call.arguments)
        .map_err(|err| ServiceError::invalid_argument("song", err.to_string()))
}
