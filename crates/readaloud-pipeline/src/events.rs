//! Events emitted by the [`InterruptController`](crate::controller::InterruptController).

use serde::Serialize;

use readaloud_core::{ConnectionId, VoiceId};

use crate::producer::SessionMetrics;
use crate::session::{SessionId, SessionOutcome};

/// Why an active session was cancelled from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InterruptReason {
    /// A newer utterance replaced it.
    Superseded,
    /// Manual stop.
    Stopped,
    /// The voice channel emptied out.
    ConnectionEmpty,
    /// The connection was detached (moved or kicked by someone else).
    Detached,
}

/// Why a voice connection was torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TeardownReason {
    ChannelEmpty,
    SinkFailure,
}

/// Narration lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NarrationEvent {
    /// A session was started on a connection.
    SessionStarted {
        connection: ConnectionId,
        session: SessionId,
        voice: VoiceId,
    },

    /// An active session was cancelled.
    SessionInterrupted {
        connection: ConnectionId,
        session: SessionId,
        reason: InterruptReason,
    },

    /// A session reached a terminal state.
    SessionFinished {
        connection: ConnectionId,
        session: SessionId,
        outcome: SessionOutcome,
        metrics: SessionMetrics,
    },

    /// The voice connection was disconnected and forgotten.
    ConnectionTornDown {
        connection: ConnectionId,
        reason: TeardownReason,
    },
}

impl NarrationEvent {
    pub const fn connection(&self) -> ConnectionId {
        match self {
            Self::SessionStarted { connection, .. }
            | Self::SessionInterrupted { connection, .. }
            | Self::SessionFinished { connection, .. }
            | Self::ConnectionTornDown { connection, .. } => *connection,
        }
    }

    /// The session this event is about, if any.
    pub const fn session(&self) -> Option<SessionId> {
        match self {
            Self::SessionStarted { session, .. }
            | Self::SessionInterrupted { session, .. }
            | Self::SessionFinished { session, .. } => Some(*session),
            Self::ConnectionTornDown { .. } => None,
        }
    }
}
