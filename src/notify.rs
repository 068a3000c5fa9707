//! User-facing notifications
//!
//! Transient messages ("toasts") raised by the dashboard and the booking
//! form. Nothing here is fatal; a notification is the whole error report
//! for recoverable failures.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tokio::sync::mpsc;

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Info,
    Success,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Level::Info => "info",
            Level::Success => "ok",
            Level::Error => "error",
        };
        f.write_str(label)
    }
}

/// A transient message for the user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub level: Level,
    pub message: String,
    pub raised_at: DateTime<Utc>,
    /// Ask the view for an audible cue
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub chime: bool,
}

impl Notification {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            raised_at: Utc::now(),
            chime: false,
        }
    }

    pub fn with_chime(mut self) -> Self {
        self.chime = true;
        self
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Level::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Level::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Level::Error, message)
    }
}

/// Receives notifications raised by the client
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            Level::Error => tracing::warn!(text = %notification.message, "Notification"),
            Level::Info | Level::Success => {
                tracing::info!(level = %notification.level, text = %notification.message, "Notification")
            }
        }
    }
}

/// Forwards notifications to a channel, for a view to display
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    /// Create a notifier and the receiving end of its feed
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        if self.sender.send(notification).is_err() {
            tracing::debug!("Notification dropped, no listener");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_notifier_delivers_in_order() {
        let (notifier, mut feed) = ChannelNotifier::new();
        notifier.notify(Notification::info("uno"));
        notifier.notify(Notification::error("dos"));

        let first = feed.try_recv().unwrap();
        assert_eq!(first.level, Level::Info);
        assert_eq!(first.message, "uno");
        assert_eq!(feed.try_recv().unwrap().level, Level::Error);
        assert!(feed.try_recv().is_err());
    }

    #[test]
    fn test_channel_notifier_without_listener() {
        let (notifier, feed) = ChannelNotifier::new();
        drop(feed);
        notifier.notify(Notification::success("nadie escucha"));
    }

    #[test]
    fn test_chime_serialized_only_when_set() {
        let plain = serde_json::to_value(Notification::info("uno")).unwrap();
        assert!(plain.get("chime").is_none());

        let loud = serde_json::to_value(Notification::info("dos").with_chime()).unwrap();
        assert_eq!(loud["chime"], true);
    }

    #[test]
    fn test_level_display() {
        assert_eq!(Level::Success.to_string(), "ok");
        assert_eq!(Level::Error.to_string(), "error");
    }
}
