//! Voice connection teardown port.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::ConnectionId;

/// Errors from the voice transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectionError {
    /// The connection is not known to the transport.
    #[error("Voice connection {0} not found")]
    NotFound(ConnectionId),

    /// The transport failed while disconnecting.
    #[error("Voice transport error: {0}")]
    Transport(String),
}

/// Port to the voice transport; only teardown is needed by the pipeline.
#[async_trait]
pub trait VoiceConnectionPort: Send + Sync {
    /// Leave the voice channel behind `connection`.
    async fn disconnect(&self, connection: ConnectionId) -> Result<(), ConnectionError>;
}

/// Connection port for hosts without a real voice transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopVoiceConnections;

#[async_trait]
impl VoiceConnectionPort for NoopVoiceConnections {
    async fn disconnect(&self, connection: ConnectionId) -> Result<(), ConnectionError> {
        tracing::debug!(connection = %connection, "Disconnect requested (no transport)");
        Ok(())
    }
}
