//! Port definitions (trait abstractions) for external collaborators.
//!
//! Ports define the interfaces that the narration pipeline expects from
//! infrastructure. They contain no implementation details and use only
//! domain types.
//!
//! # Design Rules
//!
//! - No transport types (HTTP, gateway, codec) in any signature
//! - Traits are object-safe so hosts can hand out `Arc<dyn Port>`

pub mod synthesizer;
pub mod voice_connection;
pub mod voice_preference;

pub use synthesizer::{ChunkStream, SynthesisError, SynthesisRequest, Synthesizer};
pub use voice_connection::{ConnectionError, NoopVoiceConnections, VoiceConnectionPort};
pub use voice_preference::{InMemoryVoicePreferences, PreferenceError, VoicePreferencePort};
