//! The host engine contract and render lifecycle.

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;

use cutforge_instruction_model::OutputSpec;
use cutforge_timeline_compiler::{ImageOp, MediaOp, TextOp};

/// Errors from the host side of the boundary.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("host rejected operation: {message}")]
    Operation { message: String },

    #[error("render failed: {message}")]
    Render { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl HostError {
    pub fn operation(msg: impl Into<String>) -> Self {
        Self::Operation {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }
}

/// Render lifecycle notifications, in order of arrival.
#[derive(Debug)]
pub enum RenderEvent {
    /// The host began rendering.
    Started,

    /// The render finished; carries the output path or the failure.
    Completed(Result<PathBuf, HostError>),
}

/// One-shot lifecycle notifier handed to the host for a single render
/// attempt.
///
/// `render_started` is guarded by an armed→fired transition, and
/// `render_complete` consumes the notifier, so each event can be emitted
/// at most once per render no matter how the host behaves. Dropping the
/// notifier without completing counts as a failed render, so the listener
/// can never wait forever.
#[derive(Debug)]
pub struct RenderLifecycle {
    events: mpsc::UnboundedSender<RenderEvent>,
    started: bool,
    completed: bool,
}

impl RenderLifecycle {
    /// Create a lifecycle notifier and the receiver its events arrive on.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RenderEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                events: tx,
                started: false,
                completed: false,
            },
            rx,
        )
    }

    /// Notify that rendering began. A second call is a no-op.
    pub fn render_started(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        let _ = self.events.send(RenderEvent::Started);
    }

    /// Notify that rendering finished. Consumes the notifier, so a second
    /// completion is unrepresentable.
    pub fn render_complete(mut self, result: Result<PathBuf, HostError>) {
        self.completed = true;
        let _ = self.events.send(RenderEvent::Completed(result));
    }
}

impl Drop for RenderLifecycle {
    fn drop(&mut self) {
        if !self.completed {
            let _ = self.events.send(RenderEvent::Completed(Err(
                HostError::render("render lifecycle dropped without completing"),
            )));
        }
    }
}

/// The abstract host engine: a timeline that accepts frame-accurate strip
/// placements and renders asynchronously.
///
/// The render call returns once the render is underway; the lifecycle
/// notifier fires `Started` and `Completed` as separate events later.
pub trait HostEngine: Send {
    /// Clear all placed strips and output state for a fresh build.
    fn reset(&mut self) -> Result<(), HostError>;

    /// Place a video strip, plus its paired audio strip on the next
    /// channel up, from the same media file.
    fn add_video(&mut self, op: &MediaOp, media: &Path) -> Result<(), HostError>;

    /// Place an audio-only strip.
    fn add_audio(&mut self, op: &MediaOp, media: &Path) -> Result<(), HostError>;

    /// Place a still-image strip.
    fn add_image(&mut self, op: &ImageOp, media: &Path) -> Result<(), HostError>;

    /// Place a text strip.
    fn add_text(&mut self, op: &TextOp) -> Result<(), HostError>;

    /// Apply the output specification and destination path. The frame
    /// range is derived from the placed strips.
    fn configure_output(&mut self, spec: &OutputSpec, output_path: &Path)
        -> Result<(), HostError>;

    /// Kick off the render. Must return promptly; progress is reported
    /// through the lifecycle notifier.
    fn start_render(&mut self, lifecycle: RenderLifecycle) -> Result<(), HostError>;

    /// Whether this engine can run on the current system.
    fn is_available(&self) -> bool;

    /// Engine name for logs.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lifecycle_events_arrive_in_order() {
        let (mut lifecycle, mut rx) = RenderLifecycle::channel();

        lifecycle.render_started();
        lifecycle.render_complete(Ok(PathBuf::from("/tmp/out.mp4")));

        assert!(matches!(rx.recv().await, Some(RenderEvent::Started)));
        assert!(matches!(
            rx.recv().await,
            Some(RenderEvent::Completed(Ok(path))) if path == PathBuf::from("/tmp/out.mp4")
        ));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_started_fires_at_most_once() {
        let (mut lifecycle, mut rx) = RenderLifecycle::channel();

        lifecycle.render_started();
        lifecycle.render_started();
        lifecycle.render_complete(Err(HostError::render("boom")));

        assert!(matches!(rx.recv().await, Some(RenderEvent::Started)));
        // The second start was swallowed; next event is the completion.
        assert!(matches!(
            rx.recv().await,
            Some(RenderEvent::Completed(Err(_)))
        ));
    }

    #[tokio::test]
    async fn test_dropped_lifecycle_reports_failure() {
        let (lifecycle, mut rx) = RenderLifecycle::channel();
        drop(lifecycle);

        assert!(matches!(
            rx.recv().await,
            Some(RenderEvent::Completed(Err(HostError::Render { .. })))
        ));
    }
}
