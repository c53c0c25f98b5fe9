//! Wire types for the job/media server protocol.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};

use crate::TransportError;

/// Shared reply envelope: `{ ok, message?, data? }`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub ok: bool,

    #[serde(default)]
    pub message: Option<String>,

    pub data: Option<T>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProbeRequest<'a> {
    pub machine: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct StatusUpdateRequest<'a> {
    #[serde(rename = "_id")]
    pub id: &'a str,
    pub status: &'a str,
    pub time: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerationCompleteRequest<'a> {
    #[serde(rename = "_id")]
    pub id: &'a str,
    pub editor_media: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChunkReadRequest<'a> {
    pub media_id: &'a str,
    pub index: u64,
}

/// Chunk read reply payload as it appears on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkReadData {
    /// Base64-encoded chunk bytes.
    pub chunk: String,

    pub total_chunks: u64,
}

/// A decoded chunk: raw bytes plus the total count the server reported.
#[derive(Debug, Clone)]
pub struct ChunkPayload {
    pub data: Vec<u8>,
    pub total_chunks: u64,
}

/// Decode the wire form of a chunk reply into raw bytes.
pub fn decode_chunk(data: ChunkReadData) -> Result<ChunkPayload, TransportError> {
    let bytes = BASE64
        .decode(data.chunk.as_bytes())
        .map_err(|e| TransportError::Decode(format!("chunk base64: {e}")))?;
    Ok(ChunkPayload {
        data: bytes,
        total_chunks: data.total_chunks,
    })
}

#[derive(Debug, Serialize)]
pub(crate) struct ChunkWriteRequest<'a> {
    pub media_id: &'a str,
    /// Base64-encoded chunk bytes.
    pub chunk: String,
    pub index: u64,
    pub size: u64,
    pub total_chunks: u64,
}

/// Media registration payload.
#[derive(Debug, Serialize)]
pub struct NewMedia<'a> {
    #[serde(rename = "_id")]
    pub id: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub user: &'a str,
    pub mime: &'a str,
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub total_size: u64,
}
