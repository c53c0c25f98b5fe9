//! Cutforge Render Worker
//!
//! The unattended job loop: probe the job server, acquire at most one
//! generation at a time, compile and build its timeline, drive the host
//! render through one-shot lifecycle events, upload the output, report
//! completion, and resume polling. Probe failures never stop the loop;
//! a failed job never wedges the worker.

pub mod latch;
pub mod orchestrator;
pub mod slot;

pub use latch::RenderLatch;
pub use orchestrator::{apply_timeline, BuildReport, RenderOrchestrator};
pub use slot::JobSlot;
