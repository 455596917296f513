//! WebSocket support for real-time ledger events
//!
//! Provides a broadcast channel for pushing events to connected clients.

use crate::token::EventRecord;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};

/// Maximum number of events to buffer per subscriber
const BROADCAST_CAPACITY: usize = 100;

/// WebSocket events that can be broadcast to clients
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum WsEvent {
    /// A ledger event was committed
    Ledger(EventRecord),
    /// Connection established
    Connected { message: String },
    /// This client fell behind and `missed` events were dropped; fetch
    /// `/api/events?since=<last seen sequence>` to resync
    Lagged { missed: u64 },
    /// Heartbeat to keep connection alive
    Ping,
}

/// Broadcaster for WebSocket events
#[derive(Debug)]
pub struct WsBroadcaster {
    sender: broadcast::Sender<WsEvent>,
}

impl WsBroadcaster {
    /// Create a new broadcaster
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { sender }
    }

    /// Broadcast an event to all connected clients
    pub fn broadcast(&self, event: WsEvent) {
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(event);
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<WsEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for WsBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<crate::api::handlers::ApiState>,
) -> impl IntoResponse {
    let broadcaster = state.ws_broadcaster.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, broadcaster))
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, broadcaster: Arc<WsBroadcaster>) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe to broadcast events
    let mut rx = broadcaster.subscribe();

    // Send welcome message
    let welcome = WsEvent::Connected {
        message: "Connected to bond-token event stream".to_string(),
    };
    if let Ok(json) = serde_json::to_string(&welcome) {
        let _ = sender.send(Message::Text(json.into())).await;
    }

    // Spawn task to forward broadcast events to this client
    let mut send_task = tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(missed)) => {
                    log::warn!("WebSocket client lagged, {} events dropped", missed);
                    WsEvent::Lagged { missed }
                }
                Err(RecvError::Closed) => break,
            };
            if let Ok(json) = serde_json::to_string(&event) {
                if sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    // Handle incoming messages (for ping/pong and graceful close)
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => break,
                Ok(Message::Ping(data)) => {
                    // Pong is handled automatically by axum
                    log::debug!("Received ping: {:?}", data);
                }
                Ok(Message::Text(text)) => {
                    log::debug!("Received text message: {}", text);
                }
                Err(e) => {
                    log::warn!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    log::info!("WebSocket connection closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcaster_creation() {
        let broadcaster = WsBroadcaster::new();
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[test]
    fn test_broadcast_with_no_subscribers() {
        let broadcaster = WsBroadcaster::new();
        // Should not panic even with no subscribers
        broadcaster.broadcast(WsEvent::Ping);
    }

    #[test]
    fn test_event_serialization() {
        use crate::core::Address;
        use crate::token::{EventLog, TransferEvent};

        let mut log = EventLog::new();
        log.append(TransferEvent {
            from: Address::NULL,
            to: Address::new([0xab; 20]),
            value: 50,
        });

        let event = WsEvent::Ledger(log.records()[0].clone());
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("Ledger"));
        assert!(json.contains("Transfer"));
        assert!(json.contains("abab"));
    }

    #[tokio::test]
    async fn test_subscriber_receives_broadcast() {
        let broadcaster = WsBroadcaster::new();
        let mut rx = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 1);

        broadcaster.broadcast(WsEvent::Ping);
        assert!(matches!(rx.recv().await.unwrap(), WsEvent::Ping));
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags_instead_of_closing() {
        let broadcaster = WsBroadcaster::new();
        let mut rx = broadcaster.subscribe();

        for _ in 0..BROADCAST_CAPACITY * 2 {
            broadcaster.broadcast(WsEvent::Ping);
        }

        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(n)) if n > 0));
        // The stream keeps going after the gap
        assert!(matches!(rx.recv().await, Ok(WsEvent::Ping)));

        let json = serde_json::to_string(&WsEvent::Lagged { missed: 5 }).unwrap();
        assert_eq!(json, r#"{"type":"Lagged","data":{"missed":5}}"#);
    }
}
