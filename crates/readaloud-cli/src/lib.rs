//! Command-line front end for readaloud.
//!
//! Speaks text through an HTTP streaming synthesizer, writing 48 kHz stereo
//! PCM to stdout, discarding it, or (with the `speaker` feature) playing it
//! on the default audio device.

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Used by main.rs only
use dotenvy as _;
use tracing_subscriber as _;

#[cfg(test)]
use tokio_test as _;

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod http;
pub mod output;
pub mod parser;
#[cfg(feature = "speaker")]
pub mod speaker;

// Re-export primary types for convenient access
pub use bootstrap::{CliConfig, CliContext, LOCAL_CONNECTION, Narration, bootstrap};
pub use commands::Commands;
pub use error::CliError;
pub use http::HttpSynthesizer;
pub use output::OutputKind;
pub use parser::Cli;
