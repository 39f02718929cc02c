//! Domain types for the narration pipeline.
//!
//! These are pure data types with no infrastructure dependencies.

pub mod chunk;
pub mod ids;
pub mod voice;

pub use chunk::{Chunk, ChunkKind};
pub use ids::{ChannelId, ConnectionId, VoiceId};
pub use voice::VoiceInfo;
