//! Services that own cached state for voice selection.

pub mod preference_cache;
pub mod voice_catalog;

pub use preference_cache::CachedVoicePreferences;
pub use voice_catalog::VoiceCatalog;
