//! Live-reload signaling.
//!
//! After a rebuild the dev loop tells connected clients what to do: a
//! style-only change can be injected in place, anything else needs a
//! full page reload.

use crate::asset::Artifact;
use crate::console::timestamp;
use serde::{Deserialize, Serialize};
use std::sync::mpsc;

/// What clients should do after a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReloadSignal {
    /// Swap stylesheets in place without losing page state
    InjectStyles,
    /// Reload the whole page
    FullReload,
}

impl std::fmt::Display for ReloadSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReloadSignal::InjectStyles => write!(f, "inject-styles"),
            ReloadSignal::FullReload => write!(f, "full-reload"),
        }
    }
}

/// Derive the signal for a set of freshly written artifacts.
///
/// Returns `None` when nothing was written (no client action needed).
/// Style injection is only safe when every artifact is a stylesheet.
pub fn signal_for(artifacts: &[&Artifact]) -> Option<ReloadSignal> {
    if artifacts.is_empty() {
        return None;
    }
    if artifacts.iter().all(|a| a.is_style()) {
        Some(ReloadSignal::InjectStyles)
    } else {
        Some(ReloadSignal::FullReload)
    }
}

/// Delivery seam for reload signals.
pub trait ReloadNotifier: Send {
    /// Deliver one signal.
    fn notify(&mut self, signal: ReloadSignal);
}

/// Prints signals to the console.
pub struct LogNotifier;

impl ReloadNotifier for LogNotifier {
    fn notify(&mut self, signal: ReloadSignal) {
        println!("[{}] reload: {}", timestamp(), signal);
    }
}

/// Forwards signals over a channel, for embedding and tests.
pub struct ChannelNotifier {
    tx: mpsc::Sender<ReloadSignal>,
}

impl ChannelNotifier {
    /// Notifier plus the receiving end.
    pub fn new() -> (Self, mpsc::Receiver<ReloadSignal>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }
}

impl ReloadNotifier for ChannelNotifier {
    fn notify(&mut self, signal: ReloadSignal) {
        // Receiver gone means the embedder stopped listening
        let _ = self.tx.send(signal);
    }
}
