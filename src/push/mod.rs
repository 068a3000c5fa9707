//! Push Channel
//!
//! Real-time delivery of newly created reservations.
//!
//! ## Architecture
//!
//! - **PushSource**: anything that can open a subscription
//! - **SocketIoPush**: Socket.IO client over tokio-tungstenite
//! - **Subscription**: the session's handle on an open channel. Dropping
//!   it releases the connection, so every exit path unsubscribes.
//!
//! A background task owns the websocket, answers keepalive pings and
//! forwards `nueva-reserva` events as [`PushEvent::NewReservation`].

mod channel;
pub mod protocol;

pub use channel::{ws_url_from_http, PushConfig, SocketIoPush};
pub use protocol::{EnginePacket, OpenInfo, ProtocolError, SocketPacket};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::model::{RecordError, Reservation};

/// Events delivered to a subscribed session
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// A reservation was created on the server
    NewReservation(Reservation),
    /// The channel gave up reconnecting; no more events will arrive
    Disconnected { reason: String },
}

/// Opens push subscriptions
#[async_trait]
pub trait PushSource: Send + Sync {
    async fn subscribe(&self) -> Result<Subscription, PushError>;
}

/// Live handle on a push channel
///
/// Dropping the subscription signals the transport to unsubscribe and
/// close; use [`Subscription::close`] to also wait for it to finish.
pub struct Subscription {
    events: mpsc::Receiver<PushEvent>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(events: mpsc::Receiver<PushEvent>, shutdown: oneshot::Sender<()>) -> Self {
        Self {
            events,
            shutdown: Some(shutdown),
            task: None,
        }
    }

    /// Attach the task driving the channel
    pub fn with_task(mut self, task: JoinHandle<()>) -> Self {
        self.task = Some(task);
        self
    }

    /// Wait for the next event; `None` once the channel is gone
    pub async fn next(&mut self) -> Option<PushEvent> {
        self.events.recv().await
    }

    /// Unsubscribe and wait for the transport to shut down
    ///
    /// The event queue is closed first so a task blocked on a full queue
    /// gets a send error instead of waiting forever.
    pub async fn close(mut self) {
        self.signal_shutdown();
        self.events.close();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Push task ended abnormally");
            }
        }
    }

    fn signal_shutdown(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.signal_shutdown();
    }
}

/// Push channel errors
#[derive(Debug, Error)]
pub enum PushError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Invalid event record: {0}")]
    Record(#[from] RecordError),

    #[error("Connection refused by server: {0}")]
    Rejected(String),

    #[error("Connection timeout")]
    Timeout,

    #[error("Connection closed")]
    Closed,
}
