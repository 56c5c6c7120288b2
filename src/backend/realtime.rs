// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Realtime channel client (Phoenix channel protocol over websocket).
//!
//! One websocket per subscription. The join is acknowledged before the
//! subscription is handed out; afterwards a background task forwards
//! `INSERT` records, sends heartbeats, and leaves the channel when the
//! [`Subscription`] is dropped.

use crate::backend::{Subscription, SUBSCRIPTION_BUFFER};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::LogEntry;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const JOIN_TIMEOUT: Duration = Duration::from_secs(10);
const JOIN_REF: &str = "1";

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Phoenix channel envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
}

impl ChannelMessage {
    fn new(topic: impl Into<String>, event: &str, payload: Value, reference: String) -> Self {
        Self {
            topic: topic.into(),
            event: event.to_string(),
            payload,
            reference: Some(reference),
        }
    }
}

/// Topic for change notifications on a table in the `public` schema.
pub fn topic_for(table: &str) -> String {
    format!("realtime:public:{}", table)
}

/// Join message asking for `INSERT` notifications on `table`.
pub fn join_message(table: &str, access_token: &str) -> ChannelMessage {
    ChannelMessage::new(
        topic_for(table),
        "phx_join",
        serde_json::json!({
            "config": {
                "broadcast": { "self": false },
                "presence": { "key": "" },
                "postgres_changes": [
                    { "event": "INSERT", "schema": "public", "table": table }
                ]
            },
            "access_token": access_token
        }),
        JOIN_REF.to_string(),
    )
}

/// What a single incoming message means for the subscriber.
#[derive(Debug, PartialEq)]
pub enum Inbound {
    /// A new row
    Insert(Value),
    /// Join acknowledged
    Joined,
    /// Server refused or dropped the channel
    Closed(String),
    /// Heartbeat replies, presence, system notices
    Ignored,
}

/// Classify a message received on the socket.
pub fn classify(message: &ChannelMessage, topic: &str) -> Inbound {
    if message.topic != topic {
        return Inbound::Ignored;
    }

    match message.event.as_str() {
        "postgres_changes" => {
            let data = &message.payload["data"];
            if data["type"] == "INSERT" {
                Inbound::Insert(data["record"].clone())
            } else {
                Inbound::Ignored
            }
        }
        // Older servers emit the change type as the event name.
        "INSERT" => Inbound::Insert(message.payload["record"].clone()),
        "phx_reply" if message.reference.as_deref() == Some(JOIN_REF) => {
            if message.payload["status"] == "ok" {
                Inbound::Joined
            } else {
                Inbound::Closed(format!("join rejected: {}", message.payload["response"]))
            }
        }
        "phx_error" => Inbound::Closed("channel error".to_string()),
        "phx_close" => Inbound::Closed("channel closed by server".to_string()),
        _ => Inbound::Ignored,
    }
}

/// Open a websocket, join the channel for `table`, and start forwarding inserts.
pub async fn subscribe_inserts(
    config: &Config,
    table: &str,
    access_token: &str,
) -> Result<Subscription> {
    let (mut socket, _) = connect_async(config.realtime_url())
        .await
        .map_err(|e| AppError::Realtime(format!("connect failed: {}", e)))?;

    let topic = topic_for(table);
    send(&mut socket, &join_message(table, access_token)).await?;

    tokio::time::timeout(JOIN_TIMEOUT, wait_for_join(&mut socket, &topic))
        .await
        .map_err(|_| AppError::Realtime("timed out joining channel".to_string()))??;
    tracing::info!(topic = %topic, "Realtime channel joined");

    let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(forward_inserts(socket, topic, tx, shutdown_rx));

    Ok(Subscription::new(rx, shutdown_tx))
}

async fn send(socket: &mut Socket, message: &ChannelMessage) -> Result<()> {
    let text = serde_json::to_string(message)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("encode channel message: {}", e)))?;
    socket
        .send(Message::text(text))
        .await
        .map_err(|e| AppError::Realtime(format!("send failed: {}", e)))
}

/// Read until the join reply arrives.
async fn wait_for_join(socket: &mut Socket, topic: &str) -> Result<()> {
    while let Some(frame) = socket.next().await {
        let frame = frame.map_err(|e| AppError::Realtime(format!("receive failed: {}", e)))?;
        let Some(message) = decode(&frame) else {
            continue;
        };
        match classify(&message, topic) {
            Inbound::Joined => return Ok(()),
            Inbound::Closed(reason) => return Err(AppError::Realtime(reason)),
            Inbound::Insert(_) | Inbound::Ignored => {}
        }
    }
    Err(AppError::Realtime("socket closed before join".to_string()))
}

fn decode(frame: &Message) -> Option<ChannelMessage> {
    match frame {
        Message::Text(text) => match serde_json::from_str(text.as_str()) {
            Ok(message) => Some(message),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring undecodable realtime frame");
                None
            }
        },
        _ => None,
    }
}

/// Forward inserts until the subscriber goes away or the server closes.
async fn forward_inserts(
    mut socket: Socket,
    topic: String,
    tx: mpsc::Sender<LogEntry>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await;
    let mut next_ref: u64 = 2;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                let leave = ChannelMessage::new(&topic, "phx_leave", serde_json::json!({}), next_ref.to_string());
                if let Err(e) = send(&mut socket, &leave).await {
                    tracing::debug!(error = %e, "Leave not delivered");
                }
                let _ = socket.close(None).await;
                tracing::info!(topic = %topic, "Realtime channel released");
                return;
            }
            _ = heartbeat.tick() => {
                let beat = ChannelMessage::new("phoenix", "heartbeat", serde_json::json!({}), next_ref.to_string());
                next_ref += 1;
                if let Err(e) = send(&mut socket, &beat).await {
                    tracing::warn!(error = %e, "Realtime heartbeat failed");
                    return;
                }
            }
            frame = socket.next() => {
                let frame = match frame {
                    Some(Ok(frame)) => frame,
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "Realtime socket error");
                        return;
                    }
                    None => {
                        tracing::warn!(topic = %topic, "Realtime socket closed");
                        return;
                    }
                };
                let Some(message) = decode(&frame) else {
                    continue;
                };
                match classify(&message, &topic) {
                    Inbound::Insert(record) => match serde_json::from_value::<LogEntry>(record) {
                        Ok(entry) => {
                            if tx.send(entry).await.is_err() {
                                return;
                            }
                        }
                        Err(e) => tracing::warn!(error = %e, "Dropping malformed realtime record"),
                    },
                    Inbound::Closed(reason) => {
                        tracing::warn!(topic = %topic, reason = %reason, "Realtime channel closed");
                        return;
                    }
                    Inbound::Joined | Inbound::Ignored => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(value: Value) -> ChannelMessage {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_join_message_shape() {
        let join = join_message("logs", "token-123");
        let json = serde_json::to_value(&join).unwrap();
        assert_eq!(json["topic"], "realtime:public:logs");
        assert_eq!(json["event"], "phx_join");
        assert_eq!(json["ref"], "1");
        assert_eq!(json["payload"]["access_token"], "token-123");
        assert_eq!(
            json["payload"]["config"]["postgres_changes"][0]["event"],
            "INSERT"
        );
    }

    #[test]
    fn test_classify_postgres_insert() {
        let msg = message(serde_json::json!({
            "topic": "realtime:public:logs",
            "event": "postgres_changes",
            "payload": {
                "data": {
                    "type": "INSERT",
                    "table": "logs",
                    "record": { "id": 1, "notes": "hi" }
                },
                "ids": [42]
            },
            "ref": null
        }));
        match classify(&msg, "realtime:public:logs") {
            Inbound::Insert(record) => assert_eq!(record["notes"], "hi"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_classify_join_replies() {
        let ok = message(serde_json::json!({
            "topic": "realtime:public:logs",
            "event": "phx_reply",
            "payload": { "status": "ok", "response": {} },
            "ref": "1"
        }));
        assert_eq!(classify(&ok, "realtime:public:logs"), Inbound::Joined);

        let err = message(serde_json::json!({
            "topic": "realtime:public:logs",
            "event": "phx_reply",
            "payload": { "status": "error", "response": { "reason": "unauthorized" } },
            "ref": "1"
        }));
        assert!(matches!(
            classify(&err, "realtime:public:logs"),
            Inbound::Closed(_)
        ));

        let heartbeat_reply = message(serde_json::json!({
            "topic": "phoenix",
            "event": "phx_reply",
            "payload": { "status": "ok" },
            "ref": "7"
        }));
        assert_eq!(
            classify(&heartbeat_reply, "realtime:public:logs"),
            Inbound::Ignored
        );
    }

    #[test]
    fn test_non_insert_changes_ignored() {
        let msg = message(serde_json::json!({
            "topic": "realtime:public:logs",
            "event": "postgres_changes",
            "payload": { "data": { "type": "UPDATE", "record": {} } }
        }));
        assert_eq!(classify(&msg, "realtime:public:logs"), Inbound::Ignored);
    }
}
