//! Feed WebSocket Handler
//!
//! Each connection holds one scoped subscription. Events are pushed as
//! JSON text frames. A subscriber that falls behind the broadcast channel
//! is closed with a "resync" close frame; it reconnects and repopulates
//! through the query API, which is cheaper than buffering an unbounded
//! backlog per client.

use axum::{
    extract::{
        Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use serde::Deserialize;

use shared::order::FeedScope;

use crate::core::ServerState;
use crate::feed::FeedLapse;
use crate::utils::{AppError, AppResult};

/// Close code sent when the subscriber lagged and must resync
const CLOSE_RESYNC: u16 = 4000;

/// Subscription query params - exactly one of the two must be set
#[derive(Debug, Deserialize)]
pub struct SubscribeQuery {
    pub canteen_id: Option<String>,
    pub user_id: Option<String>,
}

impl SubscribeQuery {
    fn into_scope(self) -> Result<FeedScope, AppError> {
        match (self.canteen_id, self.user_id) {
            (Some(canteen_id), None) => Ok(FeedScope::Canteen(canteen_id)),
            (None, Some(user_id)) => Ok(FeedScope::User(user_id)),
            _ => Err(AppError::validation(
                "exactly one of canteen_id or user_id is required",
            )),
        }
    }
}

/// Upgrade to a scoped feed subscription
pub async fn subscribe(
    State(state): State<ServerState>,
    Query(query): Query<SubscribeQuery>,
    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    let scope = query.into_scope()?;
    tracing::debug!(scope = ?scope, "Feed subscriber connecting");
    Ok(ws.on_upgrade(move |socket| pump(socket, state, scope)))
}

/// One loop turn: what to do next
enum Step {
    /// Push a serialized event frame
    Forward(String),
    /// Close with the resync code (subscriber lagged)
    CloseLagged(u64),
    /// Close normally (shutdown or hub gone)
    Close,
    /// Peer went away
    Stop,
    /// Nothing to do (unserializable event, non-close incoming frame)
    Continue,
}

/// Forward in-scope events to the socket until either side goes away
async fn pump(mut socket: WebSocket, state: ServerState, scope: FeedScope) {
    let mut subscription = state.feed().subscribe_scoped(scope);
    let shutdown = state.feed().shutdown_token().clone();

    loop {
        let step = tokio::select! {
            _ = shutdown.cancelled() => Step::Close,

            event = subscription.recv() => match event {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(text) => Step::Forward(text),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to serialize feed event");
                        Step::Continue
                    }
                },
                Err(FeedLapse::Lagged(n)) => Step::CloseLagged(n),
                Err(FeedLapse::Closed) => Step::Close,
            },

            // Drain incoming frames; the feed is one-way
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => Step::Stop,
                Some(Ok(_)) => Step::Continue,
            },
        };

        match step {
            Step::Forward(text) => {
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            Step::CloseLagged(n) => {
                tracing::warn!(dropped = n, "Feed subscriber lagged, closing for resync");
                let _ = socket
                    .send(Message::Close(Some(CloseFrame {
                        code: CLOSE_RESYNC,
                        reason: "lagged, resync required".into(),
                    })))
                    .await;
                break;
            }
            Step::Close => {
                let _ = socket.send(Message::Close(None)).await;
                break;
            }
            Step::Stop => break,
            Step::Continue => continue,
        }
    }
}
