//! Media bridge façade.
//!
//! This crate wires host-provided bridge implementations (media engine,
//! method channel, download engine, surface registry) into the playback
//! core. Hosts build a [`BridgeConfig`], create one [`MediaBridge`], feed it
//! every incoming [`MethodCall`] and start the [`EventForwarder`] so player
//! events reach the host.
//!
//! ```no_run
//! # async fn example(config: core_runtime::BridgeConfig) -> core_service::Result<()> {
//! use bridge_traits::MethodCall;
//! use core_service::MediaBridge;
//!
//! let mut bridge = MediaBridge::new(config)?;
//! bridge.spawn_forwarder()?;
//!
//! let response = bridge.handle(&MethodCall::bare("AUDIO/initialize"));
//! assert!(response.is_success());
//!
//! bridge.teardown().await;
//! # Ok(())
//! # }
//! ```

pub mod dispatcher;
pub mod error;
pub mod forwarder;
pub mod request;

pub use dispatcher::Dispatcher;
pub use error::{Result, ServiceError, NO_ACTIVITY_MESSAGE};
pub use forwarder::EventForwarder;
pub use request::{AudioOp, DownloadOp, Request, VideoOp, VideoSource};

use bridge_traits::{MethodCall, MethodResponse};
use core_playback::PlaybackConfig;
use core_runtime::config::BridgeConfig;
use core_runtime::events::{EventBus, EventStream};
use std::sync::Arc;
use tracing::info;

/// Primary façade exposed to host applications.
///
/// Owns the event bus, the dispatcher and, once started, the forwarder task.
/// Nothing is global: drop or [`teardown`](MediaBridge::teardown) the bridge
/// and every session goes with it.
pub struct MediaBridge {
    config: BridgeConfig,
    bus: EventBus,
    dispatcher: Dispatcher,
    forwarder: Option<EventForwarder>,
}

impl MediaBridge {
    /// Validate `config` and create a bridge with no sessions yet.
    pub fn new(config: BridgeConfig) -> Result<Self> {
        config.validate()?;

        let bus = EventBus::new(config.event_buffer_size);
        let dispatcher = Dispatcher::new(&config, Arc::new(bus.clone()));
        info!(features = ?config.features, "Media bridge created");

        Ok(Self {
            config,
            bus,
            dispatcher,
            forwarder: None,
        })
    }

    /// Replace the settings used for sessions created from now on.
    pub fn with_playback_config(mut self, config: PlaybackConfig) -> Result<Self> {
        config.validate()?;
        self.dispatcher.set_playback_config(config);
        Ok(self)
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Answer one incoming call.
    pub fn handle(&mut self, call: &MethodCall) -> MethodResponse {
        self.dispatcher.handle(call)
    }

    /// Subscribe to session events directly.
    pub fn events(&self) -> EventStream {
        EventStream::new(self.bus.subscribe())
    }

    /// Start pushing events to the host's method channel. Calling it again
    /// while a forwarder runs does nothing.
    ///
    /// Fails when no tokio runtime is running.
    pub fn spawn_forwarder(&mut self) -> Result<()> {
        if self.forwarder.as_ref().is_some_and(|f| !f.is_finished()) {
            return Ok(());
        }

        if tokio::runtime::Handle::try_current().is_err() {
            return Err(ServiceError::Runtime(core_runtime::Error::Internal(
                "event forwarding needs a tokio runtime".to_string(),
            )));
        }

        self.forwarder = Some(EventForwarder::spawn(
            &self.bus,
            self.config.method_channel.clone(),
        ));
        Ok(())
    }

    /// Release every session and stop the forwarder once the events already
    /// emitted have been pushed.
    pub async fn teardown(mut self) {
        self.dispatcher.release_all();
        let forwarder = self.forwarder.take();
        // The forwarder ends once every sender is gone
        drop(self);
        if let Some(forwarder) = forwarder {
            forwarder.join().await;
        }
        info!("Media bridge torn down");
    }
}

impl Drop for MediaBridge {
    fn drop(&mut self) {
        self.dispatcher.release_all();
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
    }
}

impl std::fmt::Debug for MediaBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaBridge")
            .field("dispatcher", &self.dispatcher)
            .field("forwarder", &self.forwarder)
            .finish()
    }
}
