//! Cutforge Render Engine
//!
//! The boundary between the worker and whatever actually renders:
//! - [`HostEngine`]: the abstract timeline/render contract. Insert
//!   video/audio/image/text strips at frame/channel positions with trim
//!   and duration controls, configure output, start an asynchronous
//!   render with one-shot lifecycle notifications
//! - [`FfmpegEngine`]: a reference implementation over the ffmpeg CLI so
//!   the worker is exercisable end-to-end without an external NLE host

pub mod engine;
pub mod ffmpeg;

pub use engine::{HostEngine, HostError, RenderEvent, RenderLifecycle};
pub use ffmpeg::FfmpegEngine;
