//! Timeline instruction documents.
//!
//! An instruction is the declarative description of one edit: a sequence
//! of tracks holding clips, plus the output specification for the render.
//! Instructions are created by the remote server and are immutable once
//! loaded for a given job.

use serde::{Deserialize, Serialize};

use crate::clip_ref::ClipRef;

/// Top-level timeline instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    /// Server-assigned identifier.
    #[serde(rename = "_id", default)]
    pub id: String,

    /// Human-readable name.
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Editor/client that produced the document.
    #[serde(default)]
    pub editor: String,

    /// The tracks and their shared frame rate.
    pub sequence: Sequence,

    /// Render output specification.
    #[serde(default)]
    pub output: OutputSpec,
}

/// The edited sequence: a frame rate and ordered tracks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    /// Frame rate every millisecond timing in this sequence converts at.
    pub fps: u32,

    /// Ordered tracks. Track order has no semantic effect beyond the
    /// layer stacking each clip carries.
    #[serde(default)]
    pub tracks: Vec<Track>,
}

/// One track: an ordered run of clips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    #[serde(default)]
    pub clips: Vec<Clip>,
}

/// One scheduled element on a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    /// Unique instance identifier within the instruction; used to name
    /// the strips the host creates.
    #[serde(rename = "instanceId", default)]
    pub instance_id: String,

    /// Absolute start from timeline zero, in milliseconds.
    #[serde(default)]
    pub start_ms: i64,

    /// Duration override in milliseconds. Absent or zero means the
    /// media's natural duration stands (text defaults separately).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,

    /// Layer/channel for stacking order.
    #[serde(default = "default_layer")]
    pub layer: u32,

    /// What this clip points at.
    #[serde(rename = "clipRef")]
    pub clip_ref: ClipRef,
}

fn default_layer() -> u32 {
    1
}

/// Render output specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSpec {
    #[serde(default)]
    pub video: VideoOutput,

    #[serde(default)]
    pub audio: AudioOutput,

    /// Container format (e.g. "mp4").
    #[serde(default = "default_container")]
    pub container: String,
}

/// Video encoding parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoOutput {
    #[serde(default = "default_fps")]
    pub fps: u32,

    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    #[serde(default = "default_video_codec")]
    pub codec: String,

    /// Video bitrate in bits per second.
    #[serde(default = "default_video_bitrate")]
    pub bitrate: u64,
}

/// Audio encoding parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioOutput {
    #[serde(default = "default_audio_codec")]
    pub codec: String,

    /// Audio bitrate in bits per second.
    #[serde(default = "default_audio_bitrate")]
    pub bitrate: u64,

    #[serde(default = "default_channels")]
    pub channels: u32,
}

fn default_container() -> String {
    "mp4".to_string()
}

fn default_fps() -> u32 {
    24
}

fn default_width() -> u32 {
    1920
}

fn default_height() -> u32 {
    1080
}

fn default_video_codec() -> String {
    "h264".to_string()
}

fn default_video_bitrate() -> u64 {
    24_000_000
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

fn default_audio_bitrate() -> u64 {
    256_000
}

fn default_channels() -> u32 {
    2
}

impl Default for OutputSpec {
    fn default() -> Self {
        Self {
            video: VideoOutput::default(),
            audio: AudioOutput::default(),
            container: default_container(),
        }
    }
}

impl Default for VideoOutput {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            width: default_width(),
            height: default_height(),
            codec: default_video_codec(),
            bitrate: default_video_bitrate(),
        }
    }
}

impl Default for AudioOutput {
    fn default() -> Self {
        Self {
            codec: default_audio_codec(),
            bitrate: default_audio_bitrate(),
            channels: default_channels(),
        }
    }
}

impl Instruction {
    /// Parse an instruction document from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Total number of clips across all tracks.
    pub fn clip_count(&self) -> usize {
        self.sequence.tracks.iter().map(|t| t.clips.len()).sum()
    }
}
