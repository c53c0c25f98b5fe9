//! Frame clock: millisecond ↔ frame conversion.
//!
//! All timeline instructions address time in integer milliseconds from
//! timeline zero; the editing host addresses time in integer frames at the
//! sequence frame rate. This module is the single place that conversion
//! happens so every caller truncates the same way.
//!
//! Callers must use the same fps for every conversion within one clip;
//! the clip's fps comes from the enclosing sequence, never re-derived
//! per call site.

use serde::{Deserialize, Serialize};

/// Convert a millisecond timestamp to a frame count at the given rate.
///
/// Equivalent to `floor(ms * fps / 1000)` for non-negative input. Integer
/// arithmetic keeps the result exact; no float rounding is involved.
pub fn ms_to_frames(ms: i64, fps: u32) -> i64 {
    ms * fps as i64 / 1000
}

/// Convert a frame count back to milliseconds (frame start time).
pub fn frames_to_ms(frames: i64, fps: u32) -> i64 {
    frames * 1000 / fps as i64
}

/// An inclusive-start, exclusive-end frame interval on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRange {
    pub start: i64,
    pub end: i64,
}

impl FrameRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// A range covering the given number of seconds from frame zero.
    /// Used as the render fallback when no strips were placed.
    pub fn seconds(secs: i64, fps: u32) -> Self {
        Self {
            start: 0,
            end: secs * fps as i64,
        }
    }

    /// Smallest range containing both `self` and `other`.
    pub fn union(self, other: FrameRange) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn len(&self) -> i64 {
        (self.end - self.start).max(0)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ms_to_frames_reference_values() {
        assert_eq!(ms_to_frames(1500, 24), 36);
        assert_eq!(ms_to_frames(999, 30), 29);
        assert_eq!(ms_to_frames(0, 24), 0);
        assert_eq!(ms_to_frames(1000, 24), 24);
    }

    #[test]
    fn test_ms_to_frames_truncates_toward_zero() {
        // 41ms @ 24fps = 0.984 frames
        assert_eq!(ms_to_frames(41, 24), 0);
        // 42ms @ 24fps = 1.008 frames
        assert_eq!(ms_to_frames(42, 24), 1);
    }

    #[test]
    fn test_frames_to_ms_round_trip_is_lossy_but_stable() {
        let ms = frames_to_ms(36, 24);
        assert_eq!(ms, 1500);
        assert_eq!(ms_to_frames(ms, 24), 36);
    }

    #[test]
    fn test_frame_range_union() {
        let a = FrameRange::new(10, 50);
        let b = FrameRange::new(0, 30);
        assert_eq!(a.union(b), FrameRange::new(0, 50));
    }

    #[test]
    fn test_frame_range_seconds_fallback() {
        let range = FrameRange::seconds(5, 24);
        assert_eq!(range.len(), 120);
        assert!(!range.is_empty());
    }
}
