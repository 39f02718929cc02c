//! HTTP synthesizer backend.
//!
//! - `POST {endpoint}/synthesize` with `{"text": .., "voice": ..}` streams
//!   compressed audio as the response body; every body chunk becomes one
//!   audio [`Chunk`]. `204 No Content` means the text produced no audio.
//! - `GET {endpoint}/voices` returns a JSON array of [`VoiceInfo`].

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::StatusCode;
use serde::Serialize;

use readaloud_core::{Chunk, ChunkStream, SynthesisError, SynthesisRequest, Synthesizer, VoiceInfo};

/// Connect timeout only: a synthesis body may legitimately stream for as
/// long as the utterance lasts.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct SynthesizeBody<'a> {
    text: &'a str,
    voice: &'a str,
}

/// [`Synthesizer`] backed by a streaming HTTP endpoint.
pub struct HttpSynthesizer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSynthesizer {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, SynthesisError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| SynthesisError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self::with_client(client, endpoint))
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Self { client, endpoint }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.endpoint)
    }
}

#[async_trait]
impl Synthesizer for HttpSynthesizer {
    async fn stream(&self, request: &SynthesisRequest) -> Result<ChunkStream, SynthesisError> {
        let response = self
            .client
            .post(self.url("synthesize"))
            .json(&SynthesizeBody {
                text: &request.text,
                voice: request.voice.as_str(),
            })
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Err(SynthesisError::NoAudio);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(rejection(status, &body));
        }

        tracing::debug!(
            voice = %request.voice,
            content_type = ?response.headers().get(reqwest::header::CONTENT_TYPE),
            "Synthesis stream opened"
        );

        Ok(response
            .bytes_stream()
            .map(|item| item.map(Chunk::audio).map_err(transport))
            .boxed())
    }

    async fn voices(&self) -> Result<Vec<VoiceInfo>, SynthesisError> {
        let response = self
            .client
            .get(self.url("voices"))
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(rejection(status, &body));
        }
        response.json().await.map_err(transport)
    }

    fn name(&self) -> &str {
        "http"
    }
}

fn transport(e: reqwest::Error) -> SynthesisError {
    SynthesisError::Transport(e.to_string())
}

fn rejection(status: StatusCode, body: &str) -> SynthesisError {
    let body = body.trim();
    if body.is_empty() {
        SynthesisError::Rejected(status.to_string())
    } else {
        SynthesisError::Rejected(format!("{status}: {body}"))
    }
}
