//! Feed hub - broadcast channel with scoped subscriptions

use shared::order::{FeedScope, OrderFeedEvent};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Default capacity of the broadcast channel
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Feed hub - fans order events out to subscribed clients
///
/// Publishing never blocks the order path: a slow subscriber falls behind
/// in its own receiver and is told so via [`FeedLapse::Lagged`], at which
/// point it resyncs through the query API instead of stalling the feed.
#[derive(Debug, Clone)]
pub struct FeedHub {
    tx: broadcast::Sender<OrderFeedEvent>,
    shutdown_token: CancellationToken,
}

impl FeedHub {
    /// Create a hub with the default channel capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a hub with the given channel capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Publish an event to all subscribers
    ///
    /// Having no subscribers is not an error; the order path must not
    /// depend on anyone listening.
    pub fn publish(&self, event: OrderFeedEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Feed event dropped: no active subscribers");
        }
    }

    /// Subscribe to the raw, unfiltered stream (internal use and tests)
    pub fn subscribe(&self) -> broadcast::Receiver<OrderFeedEvent> {
        self.tx.subscribe()
    }

    /// Subscribe with a server-side ownership filter
    pub fn subscribe_scoped(&self, scope: FeedScope) -> FeedSubscription {
        FeedSubscription {
            rx: self.tx.subscribe(),
            scope,
        }
    }

    /// Token cancelled on graceful shutdown
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown_token
    }

    /// Cancel all subscription loops
    pub fn shutdown(&self) {
        tracing::info!("Shutting down feed hub");
        self.shutdown_token.cancel();
    }
}

impl Default for FeedHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a subscription stopped yielding events
#[derive(Debug, PartialEq, Eq)]
pub enum FeedLapse {
    /// The subscriber fell behind and `n` events were dropped; it must
    /// resync through the query API
    Lagged(u64),
    /// The hub was dropped
    Closed,
}

/// A scoped feed subscription
///
/// Events outside the subscriber's scope are filtered out here, on the
/// server, before anything reaches the wire.
pub struct FeedSubscription {
    rx: broadcast::Receiver<OrderFeedEvent>,
    scope: FeedScope,
}

impl FeedSubscription {
    /// Receive the next in-scope event
    pub async fn recv(&mut self) -> Result<OrderFeedEvent, FeedLapse> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.scope.covers(&event.order) => return Ok(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => return Err(FeedLapse::Lagged(n)),
                Err(broadcast::error::RecvError::Closed) => return Err(FeedLapse::Closed),
            }
        }
    }

    /// The scope this subscription is bound to
    pub fn scope(&self) -> &FeedScope {
        &self.scope
    }
}
