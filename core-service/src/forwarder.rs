//! Pushes bus events to the host.
//!
//! [`EventForwarder`] runs on the tokio runtime, draining an [`EventStream`]
//! and invoking `"<KIND>/<event>"` on the [`MethodChannel`] for every event,
//! in bus order.

use bridge_traits::MethodChannel;
use core_runtime::events::{EventBus, EventSeverity, EventStream};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

pub struct EventForwarder {
    task: JoinHandle<()>,
}

impl EventForwarder {
    /// Subscribe to `bus` and start forwarding.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(bus: &EventBus, channel: Arc<dyn MethodChannel>) -> Self {
        let stream = EventStream::new(bus.subscribe());
        let task = tokio::spawn(forward(stream, channel));
        Self { task }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop forwarding. Events still buffered are dropped.
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Wait until the bus closes and every buffered event has been pushed.
    pub async fn join(self) {
        if let Err(err) = self.task.await {
            if !err.is_cancelled() {
                warn!(error = %err, "Event forwarder task failed");
            }
        }
    }
}

impl std::fmt::Debug for EventForwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventForwarder")
            .field("finished", &self.task.is_finished())
            .finish()
    }
}

async fn forward(mut stream: EventStream, channel: Arc<dyn MethodChannel>) {
    loop {
        match stream.recv().await {
            Ok(event) => {
                let method = event.method_name();
                if event.severity() == EventSeverity::Debug {
                    trace!(%method, "Forwarding event");
                } else {
                    debug!(%method, "Forwarding event");
                }

                if let Err(err) = channel.invoke_method(&method, event.arguments()).await {
                    warn!(%method, error = %err, "Host rejected event");
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Event forwarder fell behind; events dropped");
            }
            Err(RecvError::Closed) => {
                info!("Event bus closed, forwarder stopping");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{BridgeError, MediaKind, PlayerState};
    use core_runtime::events::{CoreEvent, MediaEvent};
    use mockall::mock;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    mock! {
        Channel {}

        #[async_trait::async_trait]
        impl MethodChannel for Channel {
            async fn invoke_method(&self, method: &str, arguments: Value) -> BridgeResult<()>;
        }
    }

    fn state_changed() -> CoreEvent {
        CoreEvent::media(
            MediaKind::Audio,
            MediaEvent::PlayerStateChanged {
                play_when_ready: true,
                playback_state: PlayerState::Ready,
            },
        )
    }

    #[tokio::test]
    async fn forwards_events_in_order_until_bus_closes() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut channel = MockChannel::new();
        channel.expect_invoke_method().returning(move |method, args| {
            sink.lock().unwrap().push((method.to_string(), args));
            Ok(())
        });

        let bus = EventBus::new(16);
        let forwarder = EventForwarder::spawn(&bus, Arc::new(channel));

        bus.emit(state_changed()).unwrap();
        bus.emit(CoreEvent::media(
            MediaKind::Audio,
            MediaEvent::BufferedUpdate { percent: 80 },
        ))
        .unwrap();
        drop(bus);
        forwarder.join().await;

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (
                    "AUDIO/onPlayerStateChanged".to_string(),
                    json!({ "playWhenReady": true, "playbackState": 3 })
                ),
                (
                    "AUDIO/onBufferedUpdate".to_string(),
                    json!({ "percent": 80 })
                ),
            ]
        );
    }

    #[tokio::test]
    async fn host_errors_do_not_stop_forwarding() {
        let calls = Arc::new(Mutex::new(0usize));
        let counter = calls.clone();
        let mut channel = MockChannel::new();
        channel.expect_invoke_method().returning(move |_, _| {
            *counter.lock().unwrap() += 1;
            Err(BridgeError::OperationFailed("engine detached".into()))
        });

        let bus = EventBus::new(16);
        let forwarder = EventForwarder::spawn(&bus, Arc::new(channel));
        bus.emit(state_changed()).unwrap();
        bus.emit(state_changed()).unwrap();
        drop(bus);
        forwarder.join().await;

        assert_eq!(*calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn abort_stops_the_task() {
        let channel = MockChannel::new();
        let bus = EventBus::new(16);
        let forwarder = EventForwarder::spawn(&bus, Arc::new(channel));

        forwarder.abort();
        tokio::task::yield_now().await;
        forwarder.join().await;
        assert_eq!(bus.subscriber_count(), 0);
    }
}
