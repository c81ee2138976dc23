//! Request routing.
//!
//! The [`Dispatcher`] owns the audio, video and download sessions and routes
//! decoded [`Request`]s to them. Sessions are created by `initialize`
//! (downloads on first use); operations on a session that does not exist
//! yet succeed with a null answer.
//!
//! Audio and video never play at the same time: starting one pauses the
//! other.

use crate::error::{Result, ServiceError};
use crate::request::{AudioOp, DownloadOp, Request, VideoOp, VideoSource};
use bridge_traits::{
    AssetResolver, DownloadService, MediaEngine, MediaKind, MethodCall, MethodResponse, Song,
    TextureId, TextureRegistry,
};
use core_playback::{DownloadSession, PlaybackConfig, PlaybackSession, SessionListener};
use core_runtime::config::{BridgeConfig, FeatureFlags};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct Dispatcher {
    engine: Arc<dyn MediaEngine>,
    download_service: Option<Arc<dyn DownloadService>>,
    texture_registry: Option<Arc<dyn TextureRegistry>>,
    asset_resolver: Option<Arc<dyn AssetResolver>>,
    features: FeatureFlags,
    playback_config: PlaybackConfig,
    listener: Arc<dyn SessionListener>,

    audio: Option<PlaybackSession>,
    video: Option<PlaybackSession>,
    downloads: Option<DownloadSession>,
}

impl Dispatcher {
    /// Sessions created by this dispatcher report to `listener`.
    pub fn new(config: &BridgeConfig, listener: Arc<dyn SessionListener>) -> Self {
        let playback_config =
            PlaybackConfig::default().with_playlist_name(config.default_playlist_name.clone());

        Self {
            engine: config.media_engine.clone(),
            download_service: config.download_service.clone(),
            texture_registry: config.texture_registry.clone(),
            asset_resolver: config.asset_resolver.clone(),
            features: config.features,
            playback_config,
            listener,
            audio: None,
            video: None,
            downloads: None,
        }
    }

    /// Override the per-session settings used for sessions created from now on.
    pub fn set_playback_config(&mut self, config: PlaybackConfig) {
        self.playback_config = config;
    }

    pub fn audio(&self) -> Option<&PlaybackSession> {
        self.audio.as_ref()
    }

    pub fn video(&self) -> Option<&PlaybackSession> {
        self.video.as_ref()
    }

    pub fn downloads(&self) -> Option<&DownloadSession> {
        self.downloads.as_ref()
    }

    /// Decode and run one call.
    pub fn handle(&mut self, call: &MethodCall) -> MethodResponse {
        debug!(method = %call.method, "Dispatching method call");

        let result = Request::parse(call).and_then(|request| self.dispatch(request));
        match result {
            Ok(value) => MethodResponse::Success(value),
            Err(err) => {
                match &err {
                    ServiceError::NotImplemented { .. } => {
                        debug!(method = %call.method, "Not implemented")
                    }
                    ServiceError::Playback(playback) if playback.is_invariant_violation() => {
                        error!(method = %call.method, error = %err, "Session state is inconsistent")
                    }
                    _ => warn!(method = %call.method, error = %err, "Method call failed"),
                }
                err.into_response()
            }
        }
    }

    pub fn dispatch(&mut self, request: Request) -> Result<Value> {
        match request {
            Request::Audio(op) => self.handle_audio(op),
            Request::Video(op) => {
                if !self.features.enable_video {
                    return Err(disabled(MediaKind::Video));
                }
                self.handle_video(op)
            }
            Request::Download(op) => {
                if !self.features.enable_downloads {
                    return Err(disabled(MediaKind::Download));
                }
                self.handle_download(op)
            }
        }
    }

    /// Release every session.
    pub fn release_all(&mut self) {
        if let Some(audio) = self.audio.take() {
            audio.release();
        }
        self.release_video();
        if let Some(downloads) = self.downloads.take() {
            downloads.close();
        }
    }

    fn open_session(&self, kind: MediaKind) -> Result<PlaybackSession> {
        let session =
            PlaybackSession::open(self.engine.as_ref(), kind, self.playback_config.clone())?;
        session.add_listener(self.listener.clone())?;
        Ok(session)
    }

    // ========================================================================
    // Audio
    // ========================================================================

    fn handle_audio(&mut self, op: AudioOp) -> Result<Value> {
        let audio = match (&op, self.audio.clone()) {
            (AudioOp::Initialize, Some(audio)) => return Ok(audio.snapshot().to_value()),
            (AudioOp::Initialize, None) => {
                self.audio = Some(self.open_session(MediaKind::Audio)?);
                return Ok(Value::Null);
            }
            (_, None) => {
                debug!(?op, "Audio session not initialized");
                return Ok(Value::Null);
            }
            (_, Some(audio)) => audio,
        };

        match op {
            AudioOp::Initialize => {}
            AudioOp::Play => self.play(&audio)?,
            AudioOp::Pause => audio.pause()?,
            AudioOp::Stop => audio.stop()?,
            AudioOp::Release => {
                audio.release();
                self.audio = None;
            }
            AudioOp::SeekTo { position_ms } => audio.seek_to(position_ms)?,
            AudioOp::AddAndPlay(song) => {
                audio.add_and_play(song)?;
                if audio.config().play_on_add {
                    self.play(&audio)?;
                }
            }
            AudioOp::AddSong(song) => audio.add_song(song)?,
            AudioOp::PlayNext(song) => audio.play_next(song)?,
            AudioOp::AddSongAtIndex { index, song } => {
                audio.add_song_at_index(index, song)?;
            }
            AudioOp::RemoveSong(song) => {
                audio.remove_song(song.key())?;
            }
            AudioOp::SetPlaylist(playlist) => audio.set_playlist_json(&playlist)?,
            AudioOp::GetPlaylist => return Ok(Value::String(audio.get_playlist()?)),
            AudioOp::ClearPlaylist => audio.clear_playlist()?,
            AudioOp::SetRepeatMode(mode) => audio.set_repeat_mode(mode)?,
            AudioOp::GetRepeatMode => return Ok(json!(audio.repeat_mode().code())),
            AudioOp::SetShuffleModeEnabled(enabled) => audio.set_shuffle_mode_enabled(enabled)?,
            AudioOp::GetShuffleModeEnabled => return Ok(json!(audio.shuffle_mode_enabled())),
            AudioOp::SkipToNext => {
                audio.skip_to_next()?;
            }
            AudioOp::SkipToPrevious => {
                audio.skip_to_previous()?;
            }
            AudioOp::SkipToIndex(index) => {
                audio.skip_to_index(index)?;
            }
        }
        Ok(Value::Null)
    }

    // ========================================================================
    // Video
    // ========================================================================

    fn handle_video(&mut self, op: VideoOp) -> Result<Value> {
        let video = match (&op, self.video.clone()) {
            (VideoOp::Initialize, Some(_)) => return Ok(Value::Null),
            (VideoOp::Initialize, None) => {
                self.video = Some(self.open_session(MediaKind::Video)?);
                return Ok(Value::Null);
            }
            (_, None) => {
                debug!(?op, "Video session not initialized");
                return Ok(Value::Null);
            }
            (_, Some(video)) => video,
        };

        match op {
            VideoOp::Initialize => {}
            VideoOp::AddAndPlay(source) => {
                self.ensure_surface(&video)?;
                let uri = match source {
                    VideoSource::Uri(uri) => uri,
                    VideoSource::Asset(asset) => {
                        let key = match &self.asset_resolver {
                            Some(resolver) => resolver.lookup_key_for_asset(&asset),
                            None => asset,
                        };
                        debug!(asset_key = %key, "Resolved bundled asset");
                        video.config().asset_uri(&key)
                    }
                };
                video.add_and_play(Song::from_uri(uri))?;
                if video.config().play_on_add {
                    self.play(&video)?;
                }
            }
            VideoOp::InitSetTexture => {
                let texture = self.ensure_surface(&video)?;
                return Ok(json!(texture.0));
            }
            VideoOp::Play => self.play(&video)?,
            VideoOp::Pause => video.pause()?,
            VideoOp::Release => self.release_video(),
        }
        Ok(Value::Null)
    }

    /// Surface of `video`, creating and attaching one if needed.
    fn ensure_surface(&self, video: &PlaybackSession) -> Result<TextureId> {
        if let Some(texture) = video.texture() {
            return Ok(texture);
        }

        let registry = self
            .texture_registry
            .as_ref()
            .ok_or_else(ServiceError::no_activity)?;
        let entry = registry.create_surface_texture().map_err(|err| {
            warn!(error = %err, "Surface texture unavailable");
            ServiceError::no_activity()
        })?;

        if let Err(err) = video.attach_surface(entry.id) {
            registry.release_texture(entry.id);
            return Err(err.into());
        }
        info!(texture = entry.id.0, "Video surface created");
        Ok(entry.id)
    }

    fn release_video(&mut self) {
        let Some(video) = self.video.take() else {
            return;
        };
        let texture = video.texture();
        video.release();
        if let (Some(texture), Some(registry)) = (texture, &self.texture_registry) {
            registry.release_texture(texture);
        }
    }

    /// Start `session` and pause its sibling.
    fn play(&self, session: &PlaybackSession) -> Result<()> {
        session.play()?;
        let sibling = match session.kind() {
            MediaKind::Audio => self.video.as_ref(),
            _ => self.audio.as_ref(),
        };
        if let Some(sibling) = sibling {
            sibling.pause()?;
        }
        Ok(())
    }

    // ========================================================================
    // Downloads
    // ========================================================================

    fn handle_download(&mut self, op: DownloadOp) -> Result<Value> {
        let downloads = self.download_session()?;

        match op {
            DownloadOp::Download(Some(url)) => {
                downloads.download(&url)?;
            }
            DownloadOp::Remove(Some(url)) => {
                downloads.remove_download(&url)?;
            }
            DownloadOp::IsDownloaded(Some(url)) => return Ok(json!(downloads.is_downloaded(&url))),
            DownloadOp::IsDownloaded(None) => return Ok(json!(false)),
            DownloadOp::Download(None) | DownloadOp::Remove(None) => {
                debug!("Download call without url");
            }
        }
        Ok(Value::Null)
    }

    fn download_session(&mut self) -> Result<DownloadSession> {
        if let Some(downloads) = &self.downloads {
            return Ok(downloads.clone());
        }

        let service = self.download_service.clone().ok_or_else(|| {
            ServiceError::Runtime(core_runtime::Error::CapabilityMissing {
                capability: "DownloadService".to_string(),
                message: "No download engine was provided".to_string(),
            })
        })?;
        let downloads = DownloadSession::new(service);
        downloads.add_listener(self.listener.clone());
        self.downloads = Some(downloads.clone());
        Ok(downloads)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("audio", &self.audio)
            .field("video", &self.video)
            .field("downloads", &self.downloads)
            .field("features", &self.features)
            .finish()
    }
}

fn disabled(kind: MediaKind) -> ServiceError {
    ServiceError::NotImplemented {
        kind,
        operation: "*".to_string(),
    }
}
