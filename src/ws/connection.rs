//! WebSocket connection loop.
//!
//! Handles the read/write loop for a single WebSocket connection,
//! dispatching subscription commands and forwarding matching activities.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::messages::{WsCommand, WsMessage, WsMessageType};
use super::subscription::SubscriptionManager;
use crate::domain::{Activity, ActivityCategory};

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads commands from the client and applies them to its subscriptions.
/// - Forwards matching activities from the [`broadcast::Receiver`].
pub async fn run_connection(socket: WebSocket, mut activity_rx: broadcast::Receiver<Activity>) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut subs = SubscriptionManager::new();

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let response = handle_text_message(&text, &mut subs);
                        if let Some(resp_json) = response
                            && ws_tx.send(Message::text(resp_json)).await.is_err() {
                                break;
                            }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
            activity = activity_rx.recv() => {
                match activity {
                    Ok(activity) => {
                        if !subs.matches(activity.category()) {
                            continue;
                        }
                        let msg = WsMessage::server(
                            uuid::Uuid::new_v4().to_string(),
                            WsMessageType::Event,
                            serde_json::to_value(&activity).unwrap_or_default(),
                        );
                        let json = serde_json::to_string(&msg).unwrap_or_default();
                        if ws_tx.send(Message::text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "ws client lagged behind activity bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::debug!("ws connection closed");
}

/// Handles a text message from the client, returning an optional JSON response.
fn handle_text_message(text: &str, subs: &mut SubscriptionManager) -> Option<String> {
    let Ok(msg) = serde_json::from_str::<WsMessage>(text) else {
        return serde_json::to_string(&WsMessage::error(String::new(), 400, "malformed JSON")).ok();
    };
    let Ok(command) = serde_json::from_value::<WsCommand>(msg.payload) else {
        return serde_json::to_string(&WsMessage::error(msg.id, 404, "unknown command")).ok();
    };

    let response = match command {
        WsCommand::Subscribe { categories } => {
            let (parsed, wildcard, rejected) = parse_categories(&categories);
            subs.subscribe(&parsed, wildcard);
            serde_json::json!({
                "subscribed": subs.categories(),
                "wildcard": subs.is_subscribed_all(),
                "rejected": rejected,
            })
        }
        WsCommand::Unsubscribe { categories } => {
            let (parsed, wildcard, rejected) = parse_categories(&categories);
            subs.unsubscribe(&parsed, wildcard);
            serde_json::json!({
                "subscribed": subs.categories(),
                "wildcard": subs.is_subscribed_all(),
                "rejected": rejected,
            })
        }
    };

    serde_json::to_string(&WsMessage::server(msg.id, WsMessageType::Response, response)).ok()
}

/// Splits raw tags into known categories, the wildcard flag, and unknown tags.
fn parse_categories(raw: &[String]) -> (Vec<ActivityCategory>, bool, Vec<String>) {
    let mut parsed = Vec::new();
    let mut wildcard = false;
    let mut rejected = Vec::new();
    for tag in raw {
        if tag == "*" {
            wildcard = true;
        } else if let Ok(category) = tag.parse::<ActivityCategory>() {
            parsed.push(category);
        } else {
            rejected.push(tag.clone());
        }
    }
    (parsed, wildcard, rejected)
}
