//! Voice catalog entries.

use serde::{Deserialize, Serialize};

use super::ids::VoiceId;

/// A voice offered by the synthesizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceInfo {
    /// Identifier passed back to the synthesizer.
    pub id: VoiceId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// BCP-47 locale, e.g. `en-US`.
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    pub gender: Option<String>,
}

impl VoiceInfo {
    pub fn new(id: impl Into<VoiceId>, locale: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.as_str().to_string(),
            id,
            locale: locale.into(),
            gender: None,
        }
    }
}
