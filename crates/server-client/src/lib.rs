//! Cutforge Server Client
//!
//! Thin JSON-over-HTTP wrapper for the remote job and media servers. Every
//! endpoint is a POST with a JSON body and a JSON envelope reply; every
//! call carries the client's fixed timeout and never retries internally.
//! Retry policy belongs to the callers.

pub mod wire;

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use cutforge_instruction_model::{Generation, GenerationStatus, MediaRecord};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::wire::{
    decode_chunk, ApiEnvelope, ChunkPayload, ChunkReadData, ChunkReadRequest, ChunkWriteRequest,
    GenerationCompleteRequest, NewMedia, ProbeRequest, StatusUpdateRequest,
};

/// Transport-level failures: network, timeout, decode, or a server-side
/// rejection (`ok: false`). None of these are retried here.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Server rejected request: {message}")]
    Rejected { message: String },
}

impl TransportError {
    fn rejected(message: Option<String>) -> Self {
        Self::Rejected {
            message: message.unwrap_or_else(|| "no message".to_string()),
        }
    }
}

/// Client for the job/media server at a fixed base URL.
#[derive(Debug, Clone)]
pub struct ServerClient {
    base_url: String,
    client: reqwest::Client,
}

impl ServerClient {
    /// Build a client with the given per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Serialize `body`, POST it, parse the JSON reply. The single helper
    /// every endpoint goes through.
    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, TransportError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.endpoint(path))
            .json(body)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    /// Ask the job server whether a generation is queued for this machine.
    /// A falsy envelope or an empty payload means "no job".
    pub async fn probe_generation(
        &self,
        machine: &str,
    ) -> Result<Option<Generation>, TransportError> {
        let envelope: ApiEnvelope<Generation> = self
            .post_json("probe_new_generation", &ProbeRequest { machine })
            .await?;

        if let Some(message) = &envelope.message {
            tracing::debug!(message = %message, "Probe response");
        }

        if !envelope.ok {
            return Ok(None);
        }
        Ok(envelope.data)
    }

    /// Mirror a status transition to the server.
    pub async fn update_status(
        &self,
        generation_id: &str,
        status: GenerationStatus,
    ) -> Result<(), TransportError> {
        let envelope: ApiEnvelope<serde_json::Value> = self
            .post_json(
                "update_generation_status",
                &StatusUpdateRequest {
                    id: generation_id,
                    status: status.as_str(),
                    time: chrono::Utc::now().to_rfc3339(),
                },
            )
            .await?;

        if !envelope.ok {
            return Err(TransportError::rejected(envelope.message));
        }
        Ok(())
    }

    /// Report a finished generation along with its uploaded media id.
    pub async fn generation_complete(
        &self,
        generation_id: &str,
        editor_media: &str,
    ) -> Result<(), TransportError> {
        let envelope: ApiEnvelope<serde_json::Value> = self
            .post_json(
                "generation_complete",
                &GenerationCompleteRequest {
                    id: generation_id,
                    editor_media,
                },
            )
            .await?;

        if !envelope.ok {
            return Err(TransportError::rejected(envelope.message));
        }
        Ok(())
    }

    /// Fetch one chunk of a remote media file. The reply carries the chunk
    /// bytes (base64 on the wire) and the total chunk count.
    pub async fn read_chunk(
        &self,
        media_id: &str,
        index: u64,
    ) -> Result<ChunkPayload, TransportError> {
        let envelope: ApiEnvelope<ChunkReadData> = self
            .post_json("read_upload", &ChunkReadRequest { media_id, index })
            .await?;

        if !envelope.ok {
            return Err(TransportError::rejected(envelope.message));
        }
        let data = envelope
            .data
            .ok_or_else(|| TransportError::Decode("chunk reply without data".to_string()))?;

        decode_chunk(data)
    }

    /// Upload one chunk of a local media file.
    pub async fn write_chunk(
        &self,
        media_id: &str,
        index: u64,
        total_chunks: u64,
        bytes: &[u8],
    ) -> Result<(), TransportError> {
        let envelope: ApiEnvelope<serde_json::Value> = self
            .post_json(
                "upload_media",
                &ChunkWriteRequest {
                    media_id,
                    chunk: BASE64.encode(bytes),
                    index,
                    size: bytes.len() as u64,
                    total_chunks,
                },
            )
            .await?;

        if !envelope.ok {
            return Err(TransportError::rejected(envelope.message));
        }
        Ok(())
    }

    /// Register uploaded media. The `ok` flag gates success; chunks are
    /// never re-sent on a rejection here.
    pub async fn add_media(&self, media: &NewMedia<'_>) -> Result<MediaRecord, TransportError> {
        let envelope: ApiEnvelope<MediaRecord> = self.post_json("add_media", media).await?;

        if !envelope.ok {
            return Err(TransportError::rejected(envelope.message));
        }
        envelope
            .data
            .ok_or_else(|| TransportError::Decode("registration reply without data".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_normalization() {
        let client =
            ServerClient::new("http://127.0.0.1:8000/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.endpoint("/probe_new_generation"),
            "http://127.0.0.1:8000/probe_new_generation"
        );
        assert_eq!(
            client.endpoint("read_upload"),
            "http://127.0.0.1:8000/read_upload"
        );
    }
}
