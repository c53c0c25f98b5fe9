//! Cutforge Instruction Model
//!
//! Defines the core data contracts for Cutforge render jobs:
//! - **Instruction:** A declarative timeline: tracks of media/text clips
//!   with millisecond timings plus an output specification
//! - **ClipRef:** The closed media-reference union (video, audio, image,
//!   text, scene) with an explicit variant for unknown types
//! - **Generation:** A render job record owned by the remote job server
//!
//! All timings are integer milliseconds from timeline zero; conversion to
//! frames is the timeline compiler's concern, not the model's.

pub mod clip_ref;
pub mod generation;
pub mod instruction;

pub use clip_ref::*;
pub use generation::*;
pub use instruction::*;
