//! Socket.IO wire format
//!
//! The reservation service emits events through Socket.IO (protocol v5)
//! over the Engine.IO v4 websocket transport. Each websocket text frame is
//! one Engine.IO packet; Engine.IO `message` packets carry a Socket.IO
//! packet:
//!
//! ```text
//! 0{"sid":"…","pingInterval":25000,"pingTimeout":20000}   engine open
//! 2 / 3                                                   engine ping / pong
//! 40                                                      connect to "/"
//! 40{"sid":"…"}                                           connect accepted
//! 44{"message":"…"}                                       connect refused
//! 42["nueva-reserva",{…}]                                 event
//! 42/admin,7["evento",{…}]                                event on a namespace with ack id
//! 41                                                      disconnect
//! ```
//!
//! Binary packets are not used by the service and are rejected.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Default namespace
pub const ROOT_NAMESPACE: &str = "/";

/// Engine.IO packet (one websocket frame)
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(OpenInfo),
    Close,
    Ping(String),
    Pong(String),
    Message(SocketPacket),
    Upgrade,
    Noop,
}

/// Handshake data sent with the Engine.IO open packet
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenInfo {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

fn default_ping_interval() -> u64 {
    25_000
}

fn default_ping_timeout() -> u64 {
    20_000
}

impl OpenInfo {
    /// How long the connection may stay silent before it is considered dead
    pub fn liveness_ms(&self) -> u64 {
        self.ping_interval + self.ping_timeout
    }
}

/// Socket.IO packet, carried inside an Engine.IO message
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect {
        namespace: String,
        data: Option<Value>,
    },
    Disconnect {
        namespace: String,
    },
    Event {
        namespace: String,
        ack_id: Option<u64>,
        name: String,
        args: Vec<Value>,
    },
    Ack {
        namespace: String,
        ack_id: u64,
        args: Vec<Value>,
    },
    ConnectError {
        namespace: String,
        message: String,
    },
}

impl SocketPacket {
    /// Client request to join a namespace
    pub fn connect(namespace: &str) -> Self {
        SocketPacket::Connect {
            namespace: namespace.to_string(),
            data: None,
        }
    }

    /// Client request to leave a namespace
    pub fn disconnect(namespace: &str) -> Self {
        SocketPacket::Disconnect {
            namespace: namespace.to_string(),
        }
    }

    fn type_digit(&self) -> char {
        match self {
            SocketPacket::Connect { .. } => '0',
            SocketPacket::Disconnect { .. } => '1',
            SocketPacket::Event { .. } => '2',
            SocketPacket::Ack { .. } => '3',
            SocketPacket::ConnectError { .. } => '4',
        }
    }

    fn namespace(&self) -> &str {
        match self {
            SocketPacket::Connect { namespace, .. }
            | SocketPacket::Disconnect { namespace }
            | SocketPacket::Event { namespace, .. }
            | SocketPacket::Ack { namespace, .. }
            | SocketPacket::ConnectError { namespace, .. } => namespace,
        }
    }

    /// Encode without the Engine.IO prefix
    pub fn encode(&self) -> String {
        let mut out = String::new();
        out.push(self.type_digit());

        let namespace = self.namespace();
        if namespace != ROOT_NAMESPACE && !namespace.is_empty() {
            out.push_str(namespace);
            out.push(',');
        }

        match self {
            SocketPacket::Connect { data: Some(data), .. } => out.push_str(&data.to_string()),
            SocketPacket::Connect { data: None, .. } | SocketPacket::Disconnect { .. } => {}
            SocketPacket::Event {
                ack_id, name, args, ..
            } => {
                if let Some(id) = ack_id {
                    out.push_str(&id.to_string());
                }
                let mut payload = Vec::with_capacity(args.len() + 1);
                payload.push(Value::String(name.clone()));
                payload.extend(args.iter().cloned());
                out.push_str(&Value::Array(payload).to_string());
            }
            SocketPacket::Ack { ack_id, args, .. } => {
                out.push_str(&ack_id.to_string());
                out.push_str(&Value::Array(args.clone()).to_string());
            }
            SocketPacket::ConnectError { message, .. } => {
                out.push_str(&serde_json::json!({ "message": message }).to_string());
            }
        }

        out
    }

    /// Decode a packet (without the Engine.IO prefix)
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let mut chars = text.chars();
        let kind = chars.next().ok_or(ProtocolError::Empty)?;
        let rest = chars.as_str();

        if matches!(kind, '5' | '6') {
            return Err(ProtocolError::UnsupportedBinary);
        }
        if !matches!(kind, '0'..='4') {
            return Err(ProtocolError::UnknownType(kind));
        }

        let (namespace, rest) = split_namespace(rest);
        let (ack_id, payload) = split_ack_id(rest)?;

        let packet = match kind {
            '0' => SocketPacket::Connect {
                namespace,
                data: parse_optional_json(payload)?,
            },
            '1' => SocketPacket::Disconnect { namespace },
            '2' => {
                let mut items = parse_array(payload)?.into_iter();
                let name = match items.next() {
                    Some(Value::String(name)) => name,
                    _ => return Err(ProtocolError::MissingEventName),
                };
                SocketPacket::Event {
                    namespace,
                    ack_id,
                    name,
                    args: items.collect(),
                }
            }
            '3' => SocketPacket::Ack {
                namespace,
                ack_id: ack_id.ok_or_else(|| {
                    ProtocolError::InvalidPayload("ack packet without id".to_string())
                })?,
                args: parse_array(payload)?,
            },
            _ => SocketPacket::ConnectError {
                namespace,
                message: connect_error_message(payload),
            },
        };

        Ok(packet)
    }
}

impl EnginePacket {
    /// Encode as a websocket text frame
    pub fn encode(&self) -> String {
        match self {
            EnginePacket::Open(info) => format!(
                "0{}",
                serde_json::json!({
                    "sid": info.sid,
                    "upgrades": info.upgrades,
                    "pingInterval": info.ping_interval,
                    "pingTimeout": info.ping_timeout,
                })
            ),
            EnginePacket::Close => "1".to_string(),
            EnginePacket::Ping(payload) => format!("2{}", payload),
            EnginePacket::Pong(payload) => format!("3{}", payload),
            EnginePacket::Message(packet) => format!("4{}", packet.encode()),
            EnginePacket::Upgrade => "5".to_string(),
            EnginePacket::Noop => "6".to_string(),
        }
    }

    /// Decode a websocket text frame
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let mut chars = text.chars();
        let kind = chars.next().ok_or(ProtocolError::Empty)?;
        let rest = chars.as_str();

        match kind {
            '0' => serde_json::from_str(rest)
                .map(EnginePacket::Open)
                .map_err(|e| ProtocolError::InvalidPayload(e.to_string())),
            '1' => Ok(EnginePacket::Close),
            '2' => Ok(EnginePacket::Ping(rest.to_string())),
            '3' => Ok(EnginePacket::Pong(rest.to_string())),
            '4' => SocketPacket::parse(rest).map(EnginePacket::Message),
            '5' => Ok(EnginePacket::Upgrade),
            '6' => Ok(EnginePacket::Noop),
            other => Err(ProtocolError::UnknownType(other)),
        }
    }
}

fn split_namespace(rest: &str) -> (String, &str) {
    if rest.starts_with('/') {
        match rest.find(',') {
            Some(idx) => (rest[..idx].to_string(), &rest[idx + 1..]),
            None => (rest.to_string(), ""),
        }
    } else {
        (ROOT_NAMESPACE.to_string(), rest)
    }
}

fn split_ack_id(rest: &str) -> Result<(Option<u64>, &str), ProtocolError> {
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return Ok((None, rest));
    }

    let id = rest[..digits]
        .parse::<u64>()
        .map_err(|e| ProtocolError::InvalidPayload(format!("ack id: {}", e)))?;
    Ok((Some(id), &rest[digits..]))
}

fn parse_optional_json(payload: &str) -> Result<Option<Value>, ProtocolError> {
    if payload.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(payload)
        .map(Some)
        .map_err(|e| ProtocolError::InvalidPayload(e.to_string()))
}

fn parse_array(payload: &str) -> Result<Vec<Value>, ProtocolError> {
    match serde_json::from_str::<Value>(payload) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(_) => Err(ProtocolError::InvalidPayload(
            "expected a JSON array".to_string(),
        )),
        Err(e) => Err(ProtocolError::InvalidPayload(e.to_string())),
    }
}

fn connect_error_message(payload: &str) -> String {
    match serde_json::from_str::<Value>(payload) {
        Ok(Value::Object(map)) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| Value::Object(map.clone()).to_string()),
        Ok(Value::String(message)) => message,
        _ => payload.to_string(),
    }
}

/// Wire format errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    #[error("empty packet")]
    Empty,

    #[error("unknown packet type `{0}`")]
    UnknownType(char),

    #[error("binary packets are not supported")]
    UnsupportedBinary,

    #[error("event packet without a name")]
    MissingEventName,

    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_open() {
        let packet = EnginePacket::parse(
            r#"0{"sid":"lv_VI97HAXpY6yYWAAAC","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#,
        )
        .unwrap();

        match packet {
            EnginePacket::Open(info) => {
                assert_eq!(info.sid, "lv_VI97HAXpY6yYWAAAC");
                assert_eq!(info.liveness_ms(), 45_000);
                assert_eq!(info.max_payload, Some(1_000_000));
            }
            other => panic!("Expected Open, got {:?}", other),
        }
    }

    #[test]
    fn test_ping_pong() {
        assert_eq!(EnginePacket::parse("2").unwrap(), EnginePacket::Ping(String::new()));
        assert_eq!(EnginePacket::Pong(String::new()).encode(), "3");
        assert_eq!(EnginePacket::Pong("probe".to_string()).encode(), "3probe");
    }

    #[test]
    fn test_parse_event() {
        let packet = EnginePacket::parse(r#"42["nueva-reserva",{"_id":"a","personas":2}]"#).unwrap();

        assert_eq!(
            packet,
            EnginePacket::Message(SocketPacket::Event {
                namespace: "/".to_string(),
                ack_id: None,
                name: "nueva-reserva".to_string(),
                args: vec![json!({"_id": "a", "personas": 2})],
            })
        );
    }

    #[test]
    fn test_parse_event_with_namespace_and_ack() {
        let packet = SocketPacket::parse(r#"2/admin,13["ping",1,2]"#).unwrap();

        match packet {
            SocketPacket::Event {
                namespace,
                ack_id,
                name,
                args,
            } => {
                assert_eq!(namespace, "/admin");
                assert_eq!(ack_id, Some(13));
                assert_eq!(name, "ping");
                assert_eq!(args, vec![json!(1), json!(2)]);
            }
            other => panic!("Expected Event, got {:?}", other),
        }
    }

    #[test]
    fn test_connect_and_disconnect_encoding() {
        assert_eq!(
            EnginePacket::Message(SocketPacket::connect("/")).encode(),
            "40"
        );
        assert_eq!(
            EnginePacket::Message(SocketPacket::connect("/admin")).encode(),
            "40/admin,"
        );
        assert_eq!(
            EnginePacket::Message(SocketPacket::disconnect("/")).encode(),
            "41"
        );
    }

    #[test]
    fn test_parse_connect_ack() {
        let packet = EnginePacket::parse(r#"40{"sid":"wZX3oN0bSVIhsaknAAAI"}"#).unwrap();
        assert_eq!(
            packet,
            EnginePacket::Message(SocketPacket::Connect {
                namespace: "/".to_string(),
                data: Some(json!({"sid": "wZX3oN0bSVIhsaknAAAI"})),
            })
        );
    }

    #[test]
    fn test_parse_connect_error() {
        let packet = SocketPacket::parse(r#"4{"message":"Not authorized"}"#).unwrap();
        assert_eq!(
            packet,
            SocketPacket::ConnectError {
                namespace: "/".to_string(),
                message: "Not authorized".to_string(),
            }
        );
    }

    #[test]
    fn test_event_roundtrip_keeps_name_first() {
        let packet = SocketPacket::Event {
            namespace: "/".to_string(),
            ack_id: Some(4),
            name: "nueva-reserva".to_string(),
            args: vec![json!({"nombre": "Ana"})],
        };
        let encoded = packet.encode();
        assert_eq!(encoded, r#"24["nueva-reserva",{"nombre":"Ana"}]"#);
        assert_eq!(SocketPacket::parse(&encoded).unwrap(), packet);
    }

    #[test]
    fn test_rejects_bad_packets() {
        assert_eq!(EnginePacket::parse("").unwrap_err(), ProtocolError::Empty);
        assert_eq!(EnginePacket::parse("9").unwrap_err(), ProtocolError::UnknownType('9'));
        assert_eq!(
            SocketPacket::parse(r#"51-["file",{"_placeholder":true,"num":0}]"#).unwrap_err(),
            ProtocolError::UnsupportedBinary
        );
        assert_eq!(
            SocketPacket::parse("2[42]").unwrap_err(),
            ProtocolError::MissingEventName
        );
        assert!(matches!(
            SocketPacket::parse("2{not json").unwrap_err(),
            ProtocolError::InvalidPayload(_)
        ));
    }
}
