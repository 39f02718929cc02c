//! CLI bootstrap - the composition root.
//!
//! The only place where concrete implementations are wired together:
//! - Settings layers (file, environment, flags)
//! - The HTTP synthesizer and the voice catalog over it
//! - The paced player, interrupt controller and narrator
//!
//! Handlers receive a [`CliContext`] and never construct infrastructure.

use std::sync::Arc;

use tokio::sync::mpsc;

use readaloud_core::{
    CachedVoicePreferences, ConnectionId, InMemoryVoicePreferences, NoopVoiceConnections,
    Settings, VoiceCatalog,
};
use readaloud_pipeline::{InterruptController, NarrationEvent, Narrator, PacedPlayer, SessionConfig};

use crate::error::CliError;
use crate::http::HttpSynthesizer;
use crate::output::OutputKind;
use crate::parser::Cli;

/// The CLI drives a single local "connection".
pub const LOCAL_CONNECTION: ConnectionId = ConnectionId::new(0);

/// Resolved configuration for one CLI invocation.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub settings: Settings,
    /// Synthesizer base URL (required).
    pub endpoint: String,
    pub output: OutputKind,
}

impl CliConfig {
    /// Resolve settings from the config file, `READALOUD_*` variables and
    /// command-line flags, in increasing priority.
    pub fn resolve(cli: &Cli) -> Result<Self, CliError> {
        Self::resolve_with(cli, |key| std::env::var(key).ok())
    }

    /// Like [`resolve`](Self::resolve) with an explicit environment lookup.
    pub fn resolve_with<F>(cli: &Cli, env: F) -> Result<Self, CliError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::with_defaults();

        if let Some(path) = &cli.config {
            settings.merge(&Settings::load(path)?);
        }
        settings.merge(&Settings::from_lookup(env));
        settings.merge(&Settings {
            default_voice: cli.voice.clone(),
            synthesizer_endpoint: cli.endpoint.clone(),
            ..Default::default()
        });
        settings.validate()?;

        let endpoint = settings
            .synthesizer_endpoint
            .clone()
            .ok_or(CliError::MissingEndpoint)?;

        Ok(Self {
            settings,
            endpoint,
            output: cli.output,
        })
    }
}

/// Composed application context for CLI commands.
pub struct CliContext {
    pub config: CliConfig,
    pub synthesizer: Arc<HttpSynthesizer>,
    pub catalog: Arc<VoiceCatalog>,
}

/// The narration pipeline, built on demand so that commands which only
/// talk to the synthesizer never open an audio output.
pub struct Narration {
    pub narrator: Narrator,
    pub events: mpsc::UnboundedReceiver<NarrationEvent>,
    pub connection: ConnectionId,
}

impl CliContext {
    pub fn new(config: CliConfig) -> Result<Self, CliError> {
        let synthesizer = Arc::new(HttpSynthesizer::new(&config.endpoint)?);
        let catalog = Arc::new(VoiceCatalog::new(
            synthesizer.clone(),
            config.settings.effective_voice_cache_ttl(),
        ));
        Ok(Self {
            config,
            synthesizer,
            catalog,
        })
    }

    /// Open the output and wire the player, controller and narrator.
    ///
    /// Must be called inside a tokio runtime.
    pub fn narration(&self) -> Result<Narration, CliError> {
        let settings = &self.config.settings;
        let (output, pacing) = self.config.output.open()?;
        let player = Arc::new(PacedPlayer::new(output, pacing));

        let (controller, events) = InterruptController::new(
            self.synthesizer.clone(),
            Arc::new(NoopVoiceConnections),
            SessionConfig::from_settings(settings),
        );
        controller.attach(LOCAL_CONNECTION, player);

        let preferences = Arc::new(CachedVoicePreferences::new(
            Arc::new(InMemoryVoicePreferences::new()),
            settings.effective_preference_cache_ttl(),
        ));
        let narrator =
            Narrator::from_settings(controller, preferences, self.catalog.clone(), settings);

        tracing::debug!(
            endpoint = %self.config.endpoint,
            output = ?self.config.output,
            ?pacing,
            "Narration pipeline ready"
        );

        Ok(Narration {
            narrator,
            events,
            connection: LOCAL_CONNECTION,
        })
    }
}

/// Resolve configuration and build the context.
pub fn bootstrap(cli: &Cli) -> Result<CliContext, CliError> {
    CliContext::new(CliConfig::resolve(cli)?)
}
