//! Reconnecting WebSocket client for server-initiated message events.

use futures_util::{SinkExt, StreamExt};
use midora_shared::{config::ClientConfig, models::{Message, RealtimeFrame}};
use std::{
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::{net::TcpStream, sync::mpsc::UnboundedSender, time::MissedTickBehavior};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message as WsMessage,
};
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::{
    error::{ClientError, normalize_error},
    store::ConversationStore,
};

/// Keepalive frame sent on every ping interval.
const PING_FRAME: &str = r#"{"type":"ping"}"#;

/// Notifications surfaced to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RealtimeEvent {
    /// The channel is up.
    Connected,
    /// An out-of-band message was applied to the open conversation.
    MessageApplied {
        /// Conversation the message landed in.
        conversation_id: Uuid,
        /// The applied message.
        message_id: Uuid,
    },
    /// The server pushed an error frame.
    ServerError {
        /// Machine-readable error code.
        code: String,
        /// Human-readable description.
        message: String,
    },
    /// Reconnection attempts are exhausted; a reload is required.
    Terminated {
        /// Normalized user-facing message.
        message: String,
    },
}

/// Maintains the per-user WebSocket channel and routes incoming events
/// into the [`ConversationStore`].
#[derive(Debug)]
pub struct RealtimeNotifier {
    store: Arc<Mutex<ConversationStore>>,
    events: UnboundedSender<RealtimeEvent>,
    ping_interval: Duration,
    reconnect_delay: Duration,
    max_reconnects: u32,
    connected: Arc<AtomicBool>,
}

impl RealtimeNotifier {
    /// Wires the notifier against shared state.
    #[must_use]
    pub fn new(
        config: &ClientConfig,
        store: Arc<Mutex<ConversationStore>>,
        events: UnboundedSender<RealtimeEvent>,
    ) -> Self {
        Self {
            store,
            events,
            ping_interval: config.ws_ping_interval(),
            reconnect_delay: config.ws_reconnect_delay(),
            max_reconnects: config.ws_max_reconnects,
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether the channel is currently up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Runs the channel until the reconnect budget is exhausted.
    ///
    /// Every unexpected close or connect failure consumes one reconnect
    /// attempt after a fixed delay; there is no backoff growth. Once the
    /// budget is spent the notifier goes terminal and stays down until
    /// the application restarts it.
    ///
    /// # Errors
    /// [`ClientError::RealtimeExhausted`] after the final attempt.
    pub async fn run(&self, endpoint: Url) -> Result<(), ClientError> {
        let mut reconnects: u32 = 0;

        loop {
            match connect_async(endpoint.as_str()).await {
                Ok((socket, _response)) => {
                    self.connected.store(true, Ordering::SeqCst);
                    let _ = self.events.send(RealtimeEvent::Connected);
                    self.drive(socket).await;
                    self.connected.store(false, Ordering::SeqCst);
                    warn!("realtime channel lost");
                }
                Err(err) => {
                    warn!("realtime connect failed: {err}");
                }
            }

            if reconnects >= self.max_reconnects {
                let err = ClientError::RealtimeExhausted {
                    attempts: reconnects,
                };
                let _ = self.events.send(RealtimeEvent::Terminated {
                    message: normalize_error(&err).to_string(),
                });
                return Err(err);
            }
            reconnects += 1;
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    /// Pumps one connection until the peer closes or the transport
    /// breaks.
    async fn drive(&self, socket: WebSocketStream<MaybeTlsStream<TcpStream>>) {
        let (mut sink, mut stream) = socket.split();
        let mut ping = tokio::time::interval(self.ping_interval);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the connection itself is
        // proof of life, so skip it.
        ping.tick().await;

        loop {
            tokio::select! {
                _ = ping.tick() => {
                    if sink.send(WsMessage::text(PING_FRAME)).await.is_err() {
                        return;
                    }
                }
                incoming = stream.next() => {
                    match incoming {
                        Some(Ok(WsMessage::Text(text))) => {
                            if let Some(reply) = self.handle_frame(text.as_str()) {
                                if sink.send(reply).await.is_err() {
                                    return;
                                }
                            }
                        }
                        Some(Ok(WsMessage::Ping(payload))) => {
                            if sink.send(WsMessage::Pong(payload)).await.is_err() {
                                return;
                            }
                        }
                        Some(Ok(WsMessage::Close(_))) | None => return,
                        Some(Ok(_)) => {}
                        Some(Err(err)) => {
                            warn!("realtime read failed: {err}");
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Handles one JSON frame; malformed payloads are logged and dropped
    /// without tearing down the connection.
    fn handle_frame(&self, raw: &str) -> Option<WsMessage> {
        let frame: RealtimeFrame = match serde_json::from_str(raw) {
            Ok(frame) => frame,
            Err(err) => {
                warn!("dropping malformed realtime frame: {err}");
                return None;
            }
        };

        match frame {
            RealtimeFrame::UserChannelConnected { user_id } => {
                debug!(%user_id, "user channel ready");
            }
            RealtimeFrame::MessageGenerate { message }
            | RealtimeFrame::MessageRegenerate { message } => {
                self.apply_message(message);
            }
            RealtimeFrame::Ping => {
                return serde_json::to_string(&RealtimeFrame::Pong)
                    .ok()
                    .map(WsMessage::text);
            }
            RealtimeFrame::Pong => {}
            RealtimeFrame::Error { code, message } => {
                warn!(code, "realtime server error: {message}");
                let _ = self
                    .events
                    .send(RealtimeEvent::ServerError { code, message });
            }
        }
        None
    }

    /// Applies a pushed message when it targets the open conversation;
    /// events for other conversations are dropped.
    fn apply_message(&self, message: Message) {
        let conversation_id = message.conversation_id;
        let message_id = message.id;

        let applied = {
            let mut store = self.lock_store();
            if store.active() == Some(conversation_id) {
                store.upsert_message(conversation_id, message);
                true
            } else {
                false
            }
        };

        if applied {
            let _ = self.events.send(RealtimeEvent::MessageApplied {
                conversation_id,
                message_id,
            });
        } else {
            debug!(%conversation_id, "dropping realtime event for inactive conversation");
        }
    }

    fn lock_store(&self) -> MutexGuard<'_, ConversationStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
