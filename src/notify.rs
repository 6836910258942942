//! User-visible notifications.
//!
//! Notifications are fire-and-forget: nothing in the engine depends on whether
//! they were displayed.

use log::{error, info};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Default,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub severity: Severity,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, body: &str, severity: Severity);
}

/// Writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, body: &str, severity: Severity) {
        match severity {
            Severity::Error => error!("🔔 {title}: {body}"),
            Severity::Default | Severity::Success => info!("🔔 {title}: {body}"),
        }
    }
}

/// Forwards notifications to a channel, e.g. for a UI event loop.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { sender: tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, title: &str, body: &str, severity: Severity) {
        // A closed receiver just means nobody is listening anymore.
        let _ = self.sender.send(Notification {
            title: title.to_string(),
            body: body.to_string(),
            severity,
        });
    }
}
