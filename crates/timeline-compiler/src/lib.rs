//! Cutforge Timeline Compiler
//!
//! Converts a millisecond-addressed [`Instruction`] into frame-accurate
//! edit operations the host engine can apply directly: placement frames,
//! trim windows, and duration overrides, all computed at the sequence
//! frame rate.
//!
//! This crate does no I/O and has no host dependencies; everything in and
//! out is plain data, so compilation is deterministic and unit-testable.
//!
//! [`Instruction`]: cutforge_instruction_model::Instruction

pub mod compile;
pub mod ops;

pub use compile::{compile, CompileError, CompiledTimeline};
pub use ops::{ClipOp, CutFrames, ImageOp, MediaOp, TextOp};
