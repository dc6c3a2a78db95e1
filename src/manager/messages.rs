//! Control message protocol
//!
//! Hosts drive the manager at runtime with a small JSON command set. The
//! wire strings (`SKIP_WAITING`, `GET_VERSION`, `CLEAR_CACHE`,
//! `CACHE_URLS`, `SW_UPDATED`) are part of the protocol and existing
//! clients depend on them exactly as spelled.
//!
//! Every command carries a one-shot reply channel. Replying consumes the
//! message, so a command is answered exactly once by construction.

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// A command sent by a host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    /// Activate immediately instead of waiting for a restart
    #[serde(rename = "SKIP_WAITING")]
    SkipWaiting,

    /// Ask for the running version tag
    #[serde(rename = "GET_VERSION")]
    GetVersion,

    /// Delete every store this manager owns
    #[serde(rename = "CLEAR_CACHE")]
    ClearCache,

    /// Fetch and store the given URLs on demand, best-effort
    #[serde(rename = "CACHE_URLS")]
    CacheUrls { urls: Vec<String> },
}

impl Command {
    /// Command name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Command::SkipWaiting => "SKIP_WAITING",
            Command::GetVersion => "GET_VERSION",
            Command::ClearCache => "CLEAR_CACHE",
            Command::CacheUrls { .. } => "CACHE_URLS",
        }
    }
}

/// Reply to a command. Fields absent from the wire form stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandReply {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
}

impl CommandReply {
    pub fn version(version: impl Into<String>) -> Self {
        Self {
            version: Some(version.into()),
            success: None,
        }
    }

    pub fn success(success: bool) -> Self {
        Self {
            version: None,
            success: Some(success),
        }
    }
}

/// A command paired with its reply channel
#[derive(Debug)]
pub struct ControlMessage {
    pub command: Command,
    reply: oneshot::Sender<CommandReply>,
}

impl ControlMessage {
    /// Wrap a command, returning the message and the receiver the sender
    /// should await for the reply
    pub fn new(command: Command) -> (Self, oneshot::Receiver<CommandReply>) {
        let (tx, rx) = oneshot::channel();
        (Self { command, reply: tx }, rx)
    }

    /// Answer the command. Consumes the message; a sender that already
    /// went away is logged, not an error.
    pub fn reply(self, reply: CommandReply) {
        let name = self.command.name();
        if self.reply.send(reply).is_err() {
            tracing::debug!(command = name, "command sender went away before the reply");
        }
    }
}

/// Broadcast lifecycle notification
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum LifecycleEvent {
    /// A new version finished activating
    #[serde(rename = "SW_UPDATED")]
    Updated { version: String },
}
