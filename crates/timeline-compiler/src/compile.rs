//! Instruction → operation compilation.

use serde::Serialize;

use cutforge_common::clock::{ms_to_frames, FrameRange};
use cutforge_instruction_model::{Clip, ClipRef, Instruction, MediaRef};

use crate::ops::{ClipOp, CutFrames, ImageOp, MediaOp, TextOp};

/// Default display duration for text clips that carry none.
const DEFAULT_TEXT_DURATION_MS: i64 = 5000;

/// Errors that abort compilation of a whole instruction.
///
/// Per-clip problems never land here; an unknown media type compiles to
/// an [`ClipOp::Unsupported`] marker and the build continues.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("instruction has no tracks; nothing to build")]
    EmptyTimeline,
}

/// The compiled form of one instruction: flat operation list in track
/// order, clips in declaration order.
#[derive(Debug, Clone, Serialize)]
pub struct CompiledTimeline {
    /// Sequence frame rate every operation was converted at.
    pub fps: u32,
    pub ops: Vec<ClipOp>,
}

impl CompiledTimeline {
    /// Number of clips that compiled to `Unsupported` markers.
    pub fn unsupported_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, ClipOp::Unsupported { .. }))
            .count()
    }

    /// Operations the host can actually place (everything but markers).
    pub fn buildable_ops(&self) -> impl Iterator<Item = &ClipOp> {
        self.ops
            .iter()
            .filter(|op| !matches!(op, ClipOp::Unsupported { .. }))
    }

    /// Known frame extent of the compiled operations. Media standing on
    /// its natural duration contributes only its start frame; the host
    /// learns the real end once the file is loaded. Falls back to five
    /// seconds when nothing was placed.
    pub fn frame_range(&self) -> FrameRange {
        let mut range: Option<FrameRange> = None;

        for op in &self.ops {
            let op_range = match op {
                ClipOp::Video(media_op) | ClipOp::Audio(media_op) => {
                    let known_frames = media_op
                        .final_duration_frames
                        .or_else(|| {
                            media_op
                                .cut
                                .map(|c| (c.end_frame - c.start_frame).max(0))
                        })
                        .unwrap_or(0);
                    FrameRange::new(media_op.start_frame, media_op.start_frame + known_frames)
                }
                ClipOp::Image(image_op) => FrameRange::new(
                    image_op.start_frame,
                    image_op.start_frame + image_op.duration_frames.unwrap_or(0),
                ),
                ClipOp::Text(text_op) => {
                    FrameRange::new(text_op.start_frame, text_op.end_frame)
                }
                ClipOp::Unsupported { .. } => continue,
            };
            range = Some(match range {
                Some(acc) => acc.union(op_range),
                None => op_range,
            });
        }

        range.unwrap_or_else(|| FrameRange::seconds(5, self.fps))
    }
}

/// Compile an instruction into frame-accurate operations.
///
/// Scene references produce no operation. Unknown media types produce an
/// `Unsupported` marker and compilation continues; only an instruction
/// with zero tracks is rejected outright.
pub fn compile(instruction: &Instruction) -> Result<CompiledTimeline, CompileError> {
    let fps = instruction.sequence.fps;
    let tracks = &instruction.sequence.tracks;

    if tracks.is_empty() {
        return Err(CompileError::EmptyTimeline);
    }

    let mut ops = Vec::with_capacity(instruction.clip_count());

    for (track_index, track) in tracks.iter().enumerate() {
        for clip in &track.clips {
            match &clip.clip_ref {
                ClipRef::Video(media) => {
                    ops.push(ClipOp::Video(media_op(clip, media, fps)));
                }
                ClipRef::Audio(media) => {
                    ops.push(ClipOp::Audio(media_op(clip, media, fps)));
                }
                ClipRef::Image(media) => {
                    ops.push(ClipOp::Image(image_op(clip, media, fps)));
                }
                ClipRef::Text { text } => {
                    ops.push(ClipOp::Text(text_op(clip, text, fps)));
                }
                ClipRef::Scene => {
                    tracing::debug!(
                        instance = %clip.instance_id,
                        track = track_index,
                        "Scene clip dropped from build"
                    );
                }
                ClipRef::Unsupported { media_type } => {
                    tracing::warn!(
                        instance = %clip.instance_id,
                        media_type = %media_type,
                        track = track_index,
                        "Unsupported media type; clip skipped"
                    );
                    ops.push(ClipOp::Unsupported {
                        instance_id: clip.instance_id.clone(),
                        media_type: media_type.clone(),
                        track: track_index,
                    });
                }
            }
        }
    }

    Ok(CompiledTimeline { fps, ops })
}

fn media_op(clip: &Clip, media: &MediaRef, fps: u32) -> MediaOp {
    let start_frame = ms_to_frames(clip.start_ms, fps);

    let cut = media.cut.map(|c| CutFrames {
        start_frame: ms_to_frames(c.start_ms, fps),
        end_frame: ms_to_frames(c.end_ms, fps),
    });

    // Insert the strip early by the head-trim amount so the visible
    // portion still lands at start_frame after trimming.
    let placement_frame = match &cut {
        Some(c) => start_frame - c.start_frame,
        None => start_frame,
    };

    MediaOp {
        instance_id: clip.instance_id.clone(),
        media: media.clone(),
        channel: clip.layer,
        start_frame,
        placement_frame,
        cut,
        final_duration_frames: duration_override(clip, fps),
    }
}

fn image_op(clip: &Clip, media: &MediaRef, fps: u32) -> ImageOp {
    ImageOp {
        instance_id: clip.instance_id.clone(),
        media: media.clone(),
        channel: clip.layer,
        start_frame: ms_to_frames(clip.start_ms, fps),
        duration_frames: duration_override(clip, fps),
    }
}

fn text_op(clip: &Clip, text: &str, fps: u32) -> TextOp {
    let duration_ms = match clip.duration_ms {
        Some(ms) if ms != 0 => ms,
        _ => DEFAULT_TEXT_DURATION_MS,
    };

    TextOp {
        instance_id: clip.instance_id.clone(),
        text: text.to_string(),
        channel: clip.layer,
        start_frame: ms_to_frames(clip.start_ms, fps),
        end_frame: ms_to_frames(clip.start_ms + duration_ms, fps),
    }
}

/// A present, non-zero duration_ms overrides the media's natural length.
fn duration_override(clip: &Clip, fps: u32) -> Option<i64> {
    match clip.duration_ms {
        Some(ms) if ms != 0 => Some(ms_to_frames(ms, fps)),
        _ => None,
    }
}
