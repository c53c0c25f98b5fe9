//! Frame-accurate edit operations.
//!
//! One operation per clip, discriminated by media kind. Every frame value
//! here was converted from milliseconds at the sequence fps; the host
//! engine applies them without further time arithmetic.

use serde::Serialize;

use cutforge_instruction_model::MediaRef;

/// A trim window converted to frames at the sequence fps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CutFrames {
    /// Trim-in point, frames into the media.
    pub start_frame: i64,

    /// Trim-out point, frames into the media.
    pub end_frame: i64,
}

impl CutFrames {
    /// Frames hidden at the head of the media.
    pub fn head_offset(&self) -> i64 {
        self.start_frame
    }

    /// Frames hidden at the tail of the media. Needs the raw media
    /// duration, which only the host knows once the file is loaded.
    pub fn tail_offset(&self, raw_media_frames: i64) -> i64 {
        (raw_media_frames - self.end_frame).max(0)
    }
}

/// Placement of a video or audio strip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaOp {
    pub instance_id: String,

    /// The media to resolve and load.
    pub media: MediaRef,

    /// Stacking channel.
    pub channel: u32,

    /// Where the visible portion lands on the timeline.
    pub start_frame: i64,

    /// Frame the host inserts the strip at. When a cut is present this is
    /// `start_frame - cut.start_frame`, so that after the head trim the
    /// visible portion still begins exactly at `start_frame`.
    pub placement_frame: i64,

    /// Trim window, when the clip carries a cut.
    pub cut: Option<CutFrames>,

    /// Duration override in frames; `None` leaves the media's natural
    /// duration standing.
    pub final_duration_frames: Option<i64>,
}

/// Placement of a still image strip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageOp {
    pub instance_id: String,
    pub media: MediaRef,
    pub channel: u32,
    pub start_frame: i64,

    /// Display duration in frames; `None` leaves the host default.
    pub duration_frames: Option<i64>,
}

/// Placement of a text strip. Text is addressed by start/end frame rather
/// than a duration field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextOp {
    pub instance_id: String,
    pub text: String,
    pub channel: u32,
    pub start_frame: i64,
    pub end_frame: i64,
}

/// Discriminated edit operation, one per compiled clip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ClipOp {
    Video(MediaOp),
    Audio(MediaOp),
    Image(ImageOp),
    Text(TextOp),

    /// A clip whose `mediatype` is outside the known set. Recorded so the
    /// build can report it and continue with the remaining clips.
    Unsupported {
        instance_id: String,
        media_type: String,
        track: usize,
    },
}

impl ClipOp {
    pub fn instance_id(&self) -> &str {
        match self {
            ClipOp::Video(op) | ClipOp::Audio(op) => &op.instance_id,
            ClipOp::Image(op) => &op.instance_id,
            ClipOp::Text(op) => &op.instance_id,
            ClipOp::Unsupported { instance_id, .. } => instance_id,
        }
    }

    /// Short kind tag for logs and plan listings.
    pub fn kind(&self) -> &'static str {
        match self {
            ClipOp::Video(_) => "video",
            ClipOp::Audio(_) => "audio",
            ClipOp::Image(_) => "image",
            ClipOp::Text(_) => "text",
            ClipOp::Unsupported { .. } => "unsupported",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_offset_clamps_at_zero() {
        let cut = CutFrames {
            start_frame: 12,
            end_frame: 36,
        };
        // Media shorter than the cut-out point: nothing to hide.
        assert_eq!(cut.tail_offset(30), 0);
        // 100-frame media trimmed out at 36 hides 64 tail frames.
        assert_eq!(cut.tail_offset(100), 64);
    }
}
