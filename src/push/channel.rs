//! Socket.IO push client
//!
//! 1. Connect the websocket and wait for the Engine.IO open packet
//! 2. Join the namespace and wait for the server to accept it
//! 3. Answer pings, forward reservation events to the subscriber
//! 4. Reconnect with exponential backoff on unexpected disconnect
//! 5. On unsubscribe, leave the namespace and close the socket

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::protocol::{EnginePacket, OpenInfo, SocketPacket};
use super::{PushError, PushEvent, PushSource, Subscription};
use crate::model::{RecordError, Reservation};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Longest pause between reconnect attempts
const MAX_RECONNECT_DELAY_MS: u64 = 30_000;

/// Push channel configuration
#[derive(Debug, Clone)]
pub struct PushConfig {
    /// Websocket origin of the service (e.g., "ws://localhost:3001")
    pub url: String,
    /// Socket.IO endpoint path
    pub path: String,
    /// Namespace to join
    pub namespace: String,
    /// Event carrying new reservations
    pub event: String,
    /// Handshake timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Reconnect attempts before giving up
    pub max_reconnect_attempts: u32,
    /// Events buffered before the transport waits for the session
    pub buffer: usize,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:3001".to_string(),
            path: "/socket.io/".to_string(),
            namespace: "/".to_string(),
            event: "nueva-reserva".to_string(),
            connect_timeout_ms: 5_000,
            max_reconnect_attempts: 5,
            buffer: 64,
        }
    }
}

impl PushConfig {
    /// Full websocket URL for the Engine.IO v4 transport
    pub fn endpoint(&self) -> String {
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        format!(
            "{}{}?EIO=4&transport=websocket",
            self.url.trim_end_matches('/'),
            path
        )
    }
}

/// Derive the websocket origin from the REST base URL
pub fn ws_url_from_http(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base.to_string()
    }
}

/// Socket.IO implementation of [`PushSource`]
pub struct SocketIoPush {
    config: PushConfig,
}

impl SocketIoPush {
    pub fn new(config: PushConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PushConfig {
        &self.config
    }
}

#[async_trait]
impl PushSource for SocketIoPush {
    async fn subscribe(&self) -> Result<Subscription, PushError> {
        let (ws, open) = connect(&self.config).await?;

        let (events_tx, events_rx) = mpsc::channel(self.config.buffer.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(run(self.config.clone(), ws, open, events_tx, shutdown_rx));

        tracing::info!(endpoint = %self.config.endpoint(), event = %self.config.event, "Push channel subscribed");
        Ok(Subscription::new(events_rx, shutdown_tx).with_task(task))
    }
}

/// Open the websocket and complete both handshakes within the connect timeout
async fn connect(config: &PushConfig) -> Result<(WsStream, OpenInfo), PushError> {
    tokio::time::timeout(
        Duration::from_millis(config.connect_timeout_ms),
        handshake(config),
    )
    .await
    .map_err(|_| PushError::Timeout)?
}

async fn handshake(config: &PushConfig) -> Result<(WsStream, OpenInfo), PushError> {
    let endpoint = config.endpoint();
    let (mut ws, _response) = tokio_tungstenite::connect_async(endpoint.as_str()).await?;

    let open = loop {
        match next_packet(&mut ws).await? {
            EnginePacket::Open(info) => break info,
            other => tracing::debug!(packet = ?other, "Ignoring packet before open"),
        }
    };

    send_packet(
        &mut ws,
        EnginePacket::Message(SocketPacket::connect(&config.namespace)),
    )
    .await?;

    loop {
        match next_packet(&mut ws).await? {
            EnginePacket::Message(SocketPacket::Connect { namespace, .. })
                if namespace == config.namespace =>
            {
                break
            }
            EnginePacket::Message(SocketPacket::ConnectError { message, .. }) => {
                return Err(PushError::Rejected(message))
            }
            EnginePacket::Ping(payload) => send_packet(&mut ws, EnginePacket::Pong(payload)).await?,
            other => tracing::debug!(packet = ?other, "Ignoring packet during handshake"),
        }
    }

    tracing::debug!(sid = %open.sid, namespace = %config.namespace, "Socket.IO handshake complete");
    Ok((ws, open))
}

async fn next_packet(ws: &mut WsStream) -> Result<EnginePacket, PushError> {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => return Ok(EnginePacket::parse(&text)?),
            Some(Ok(Message::Close(_))) | None => return Err(PushError::Closed),
            Some(Ok(_)) => continue, // Binary, Ping, Pong
            Some(Err(e)) => return Err(e.into()),
        }
    }
}

async fn send_packet(ws: &mut WsStream, packet: EnginePacket) -> Result<(), PushError> {
    ws.send(Message::Text(packet.encode())).await?;
    Ok(())
}

/// Why a connection stopped pumping
enum Stop {
    /// The subscriber unsubscribed or went away
    Shutdown,
    /// The connection dropped and may be re-established
    Disconnected(String),
}

/// Background task owning the websocket for the lifetime of a subscription
async fn run(
    config: PushConfig,
    mut ws: WsStream,
    mut open: OpenInfo,
    events: mpsc::Sender<PushEvent>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut attempts: u32 = 0;

    loop {
        match pump(&config, &mut ws, &open, &events, &mut shutdown).await {
            Stop::Shutdown => {
                let _ = send_packet(
                    &mut ws,
                    EnginePacket::Message(SocketPacket::disconnect(&config.namespace)),
                )
                .await;
                let _ = ws.close(None).await;
                tracing::info!("Push channel unsubscribed");
                return;
            }
            Stop::Disconnected(reason) => {
                tracing::warn!(reason = %reason, "Push channel disconnected");

                loop {
                    if attempts >= config.max_reconnect_attempts {
                        tracing::error!(attempts, "Push channel gave up reconnecting");
                        let _ = events.send(PushEvent::Disconnected { reason }).await;
                        return;
                    }

                    let delay = reconnect_delay(attempts);
                    attempts += 1;

                    tokio::select! {
                        _ = &mut shutdown => return,
                        _ = tokio::time::sleep(delay) => {}
                    }

                    tracing::info!(attempt = attempts, "Reconnecting push channel");
                    match connect(&config).await {
                        Ok((new_ws, new_open)) => {
                            ws = new_ws;
                            open = new_open;
                            attempts = 0;
                            tracing::info!("Push channel reconnected");
                            break;
                        }
                        Err(e) => tracing::warn!(error = %e, "Push reconnect failed"),
                    }
                }
            }
        }
    }
}

/// Forward events until the connection stops or the subscriber leaves
async fn pump(
    config: &PushConfig,
    ws: &mut WsStream,
    open: &OpenInfo,
    events: &mpsc::Sender<PushEvent>,
    shutdown: &mut oneshot::Receiver<()>,
) -> Stop {
    let liveness = Duration::from_millis(open.liveness_ms());
    let watchdog = tokio::time::sleep(liveness);
    tokio::pin!(watchdog);

    loop {
        tokio::select! {
            _ = &mut *shutdown => return Stop::Shutdown,

            _ = &mut watchdog => {
                return Stop::Disconnected("no ping from server".to_string());
            }

            msg = ws.next() => {
                let text = match msg {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(frame))) => {
                        let reason = frame
                            .map(|f| f.reason.to_string())
                            .unwrap_or_else(|| "closed by server".to_string());
                        return Stop::Disconnected(reason);
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Stop::Disconnected(e.to_string()),
                    None => return Stop::Disconnected("stream ended".to_string()),
                };

                match EnginePacket::parse(&text) {
                    Ok(EnginePacket::Ping(payload)) => {
                        watchdog.as_mut().reset(Instant::now() + liveness);
                        if let Err(e) = send_packet(ws, EnginePacket::Pong(payload)).await {
                            return Stop::Disconnected(e.to_string());
                        }
                    }
                    Ok(EnginePacket::Message(SocketPacket::Event { namespace, name, args, .. }))
                        if namespace == config.namespace && name == config.event =>
                    {
                        match decode_event_record(args) {
                            Ok(reservation) => {
                                tracing::debug!(id = %reservation.id, "Push event received");
                                if events.send(PushEvent::NewReservation(reservation)).await.is_err() {
                                    return Stop::Shutdown;
                                }
                            }
                            Err(e) => tracing::warn!(error = %e, "Dropping malformed push event"),
                        }
                    }
                    Ok(EnginePacket::Message(SocketPacket::Disconnect { namespace }))
                        if namespace == config.namespace =>
                    {
                        return Stop::Disconnected("namespace closed by server".to_string());
                    }
                    Ok(EnginePacket::Close) => {
                        return Stop::Disconnected("engine closed by server".to_string());
                    }
                    Ok(other) => tracing::trace!(packet = ?other, "Ignoring packet"),
                    Err(e) => tracing::warn!(error = %e, "Unparseable push frame"),
                }
            }
        }
    }
}

fn decode_event_record(args: Vec<serde_json::Value>) -> Result<Reservation, PushError> {
    let record = args
        .into_iter()
        .next()
        .ok_or_else(|| RecordError::Malformed("event carried no record".to_string()))?;
    Ok(Reservation::from_json(record)?)
}

/// Exponential backoff: 1s, 2s, 4s ... capped at 30s
fn reconnect_delay(attempt: u32) -> Duration {
    let ms = 1_000u64.saturating_mul(1u64 << attempt.min(16));
    Duration::from_millis(ms.min(MAX_RECONNECT_DELAY_MS))
}
