//! The job-polling orchestration state machine.
//!
//! One loop, one job at a time: probe → compile → resolve media → hand
//! ops to the host → render (event-driven) → upload → report → poll
//! again. Probe and per-clip failures are absorbed; only a compile error
//! aborts a job, and even that resets state and resumes polling.

use std::path::PathBuf;
use std::time::Duration;

use cutforge_common::config::WorkerConfig;
use cutforge_common::error::{CutforgeError, CutforgeResult};
use cutforge_instruction_model::{Generation, GenerationStatus};
use cutforge_media_cache::{ChunkSource, ChunkStore, UploadRequest};
use cutforge_render_engine::{HostEngine, RenderEvent, RenderLifecycle};
use cutforge_server_client::ServerClient;
use cutforge_timeline_compiler::{compile, ClipOp, CompiledTimeline};

use crate::latch::RenderLatch;
use crate::slot::JobSlot;

/// What a timeline build actually placed.
#[derive(Debug, Default, Clone)]
pub struct BuildReport {
    /// Strips handed to the host.
    pub applied: usize,

    /// Instance ids of clips that were skipped, with the reason.
    pub skipped: Vec<(String, String)>,
}

/// Resolve each compiled operation's media and hand it to the host.
///
/// Per-clip failures (a missing chunk, an unsupported type, a host
/// rejection) skip that clip and continue; the report says what was
/// dropped. Only a host `reset` failure aborts the build.
pub async fn apply_timeline<E, S>(
    engine: &mut E,
    store: &ChunkStore<S>,
    compiled: &CompiledTimeline,
) -> CutforgeResult<BuildReport>
where
    E: HostEngine,
    S: ChunkSource,
{
    engine
        .reset()
        .map_err(|e| CutforgeError::host_operation(e.to_string()))?;

    let mut report = BuildReport::default();

    for op in &compiled.ops {
        let outcome = match op {
            ClipOp::Video(media_op) => match store.resolve_file(&media_op.media).await {
                Ok(path) => engine
                    .add_video(media_op, &path)
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            },
            ClipOp::Audio(media_op) => match store.resolve_file(&media_op.media).await {
                Ok(path) => engine
                    .add_audio(media_op, &path)
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            },
            ClipOp::Image(image_op) => match store.resolve_file(&image_op.media).await {
                Ok(path) => engine
                    .add_image(image_op, &path)
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            },
            ClipOp::Text(text_op) => engine.add_text(text_op).map_err(|e| e.to_string()),
            ClipOp::Unsupported {
                instance_id,
                media_type,
                ..
            } => {
                report
                    .skipped
                    .push((instance_id.clone(), format!("unsupported type {media_type}")));
                continue;
            }
        };

        match outcome {
            Ok(()) => report.applied += 1,
            Err(reason) => {
                tracing::warn!(
                    instance = %op.instance_id(),
                    kind = op.kind(),
                    reason = %reason,
                    "Clip skipped"
                );
                report.skipped.push((op.instance_id().to_string(), reason));
            }
        }
    }

    tracing::info!(
        applied = report.applied,
        skipped = report.skipped.len(),
        "Timeline build finished"
    );
    Ok(report)
}

/// The worker state machine. Owns the single job slot and the render
/// latch; everything else is plumbing between the server, the cache, and
/// the host engine.
pub struct RenderOrchestrator<E> {
    config: WorkerConfig,
    client: ServerClient,
    store: ChunkStore<ServerClient>,
    engine: E,
    slot: JobSlot,
    latch: RenderLatch,
}

impl<E: HostEngine> RenderOrchestrator<E> {
    pub fn new(config: WorkerConfig, engine: E) -> CutforgeResult<Self> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let client = ServerClient::new(config.server_url.clone(), timeout)
            .map_err(|e| CutforgeError::transport(e.to_string()))?;
        let store = ChunkStore::new(&config.cache_dir, client.clone())
            .with_chunk_size(config.chunk_size_bytes);

        Ok(Self {
            config,
            client,
            store,
            engine,
            slot: JobSlot::new(),
            latch: RenderLatch::new(),
        })
    }

    /// Run the worker loop forever. Never returns under normal operation;
    /// no failure inside a tick escalates to termination.
    pub async fn run(&mut self) -> CutforgeResult<()> {
        let interval = Duration::from_secs(self.config.poll_interval_secs);
        tracing::info!(
            server = %self.config.server_url,
            machine = %self.config.machine_id,
            interval_secs = interval.as_secs(),
            "Worker loop started"
        );

        loop {
            self.poll_tick().await;
            tokio::time::sleep(interval).await;
        }
    }

    /// One probe. A transport or parse failure is logged and treated
    /// exactly like "no job"; the loop always survives to the next tick.
    pub async fn poll_tick(&mut self) {
        tracing::debug!("Polling for work");

        match self.client.probe_generation(&self.config.machine_id).await {
            Ok(Some(generation)) => {
                tracing::info!(generation = %generation.id, "Found generation");
                self.run_job(generation).await;
            }
            Ok(None) => {
                tracing::debug!("No job queued");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Probe failed; retrying next tick");
            }
        }
    }

    /// Drive one generation through build, render, upload, and report.
    /// State is reset on every exit path so the loop can poll again.
    async fn run_job(&mut self, generation: Generation) {
        if !self.slot.try_acquire() {
            tracing::warn!(
                generation = %generation.id,
                "Job already in flight; ignoring new generation"
            );
            return;
        }

        if let Err(e) = self.execute_job(&generation).await {
            tracing::error!(generation = %generation.id, error = %e, "Job failed");
        }

        self.latch.reset();
        self.slot.release();
        tracing::info!(generation = %generation.id, "Job finished; resuming poll");
    }

    async fn execute_job(&mut self, generation: &Generation) -> CutforgeResult<()> {
        let id = &generation.id;
        self.update_status(id, GenerationStatus::ResolvingMedia).await;

        // A compile error aborts the whole job; no partial render.
        let compiled = compile(&generation.config)
            .map_err(|e| CutforgeError::compile(e.to_string()))?;

        apply_timeline(&mut self.engine, &self.store, &compiled).await?;

        let output_path = self.output_path(generation);
        self.engine
            .configure_output(&generation.config.output, &output_path)
            .map_err(|e| CutforgeError::host_operation(e.to_string()))?;

        // Arming twice for overlapping jobs is a bug; guard, log, bail.
        if !self.latch.try_arm() {
            tracing::warn!(generation = %id, "Render hooks already armed; bailing");
            return Ok(());
        }

        let (lifecycle, mut events) = RenderLifecycle::channel();
        self.engine
            .start_render(lifecycle)
            .map_err(|e| CutforgeError::host_operation(e.to_string()))?;

        while let Some(event) = events.recv().await {
            match event {
                RenderEvent::Started => {
                    tracing::info!(generation = %id, "Render started");
                    self.update_status(id, GenerationStatus::Rendering).await;
                }
                RenderEvent::Completed(result) => {
                    // Stop listening before any completion work so a
                    // misbehaving host cannot re-enter this path.
                    events.close();
                    self.finish_job(id, result).await;
                    break;
                }
            }
        }

        Ok(())
    }

    /// Completion sequence: upload, report, mark done. Every failure here
    /// is logged but must not prevent the state reset in `run_job`; a
    /// stuck job must not wedge the worker.
    async fn finish_job(
        &mut self,
        generation_id: &str,
        result: Result<PathBuf, cutforge_render_engine::HostError>,
    ) {
        match result {
            Ok(output_path) => {
                tracing::info!(
                    generation = %generation_id,
                    output = %output_path.display(),
                    "Render complete"
                );

                let request = UploadRequest {
                    title: output_path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| format!("{generation_id}.mp4")),
                    description: format!("Render of generation {generation_id}"),
                    user: self.config.machine_id.clone(),
                    mime: "video/mp4".to_string(),
                    kind: "video".to_string(),
                };

                match self.store.upload(&output_path, &request).await {
                    Ok(record) => {
                        if let Err(e) = self
                            .client
                            .generation_complete(generation_id, &record.id)
                            .await
                        {
                            tracing::error!(
                                generation = %generation_id,
                                error = %e,
                                "Completion notification failed"
                            );
                        }
                    }
                    Err(e) => {
                        tracing::error!(
                            generation = %generation_id,
                            error = %e,
                            "Upload failed; generation left without a success record"
                        );
                    }
                }
            }
            Err(e) => {
                tracing::error!(generation = %generation_id, error = %e, "Render failed");
            }
        }

        self.update_status(generation_id, GenerationStatus::Done).await;
    }

    /// Mirror a status transition; failures are logged and absorbed.
    async fn update_status(&self, generation_id: &str, status: GenerationStatus) {
        if let Err(e) = self.client.update_status(generation_id, status).await {
            tracing::warn!(
                generation = %generation_id,
                status = status.as_str(),
                error = %e,
                "Status update failed"
            );
        }
    }

    fn output_path(&self, generation: &Generation) -> PathBuf {
        let container = &generation.config.output.container;
        self.config
            .output_dir
            .join(format!("{}.{container}", generation.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;

    use cutforge_instruction_model::{Instruction, MediaRecord, OutputSpec};
    use cutforge_render_engine::HostError;
    use cutforge_server_client::wire::{ChunkPayload, NewMedia};
    use cutforge_server_client::TransportError;
    use cutforge_timeline_compiler::{ImageOp, MediaOp, TextOp};

    /// Chunk source that serves one tiny chunk for any media id except
    /// ids containing "missing".
    struct StubSource;

    #[async_trait]
    impl ChunkSource for StubSource {
        async fn fetch_chunk(
            &self,
            media_id: &str,
            _index: u64,
        ) -> Result<ChunkPayload, TransportError> {
            if media_id.contains("missing") {
                return Err(TransportError::Rejected {
                    message: "no such media".to_string(),
                });
            }
            Ok(ChunkPayload {
                data: b"xx".to_vec(),
                total_chunks: 1,
            })
        }

        async fn push_chunk(
            &self,
            _media_id: &str,
            _index: u64,
            _total_chunks: u64,
            _bytes: &[u8],
        ) -> Result<(), TransportError> {
            Ok(())
        }

        async fn register_media(
            &self,
            media: &NewMedia<'_>,
        ) -> Result<MediaRecord, TransportError> {
            Ok(MediaRecord {
                id: media.id.to_string(),
                title: media.title.to_string(),
                mime: None,
                kind: media.kind.to_string(),
                total_size: media.total_size,
            })
        }
    }

    /// Engine that records what was handed to it.
    #[derive(Default)]
    struct RecordingEngine {
        placed: Mutex<Vec<String>>,
        reject_audio: bool,
    }

    impl HostEngine for RecordingEngine {
        fn reset(&mut self) -> Result<(), HostError> {
            self.placed.lock().unwrap().clear();
            Ok(())
        }

        fn add_video(&mut self, op: &MediaOp, _media: &Path) -> Result<(), HostError> {
            self.placed.lock().unwrap().push(format!("video:{}", op.instance_id));
            Ok(())
        }

        fn add_audio(&mut self, op: &MediaOp, _media: &Path) -> Result<(), HostError> {
            if self.reject_audio {
                return Err(HostError::operation("audio refused"));
            }
            self.placed.lock().unwrap().push(format!("audio:{}", op.instance_id));
            Ok(())
        }

        fn add_image(&mut self, op: &ImageOp, _media: &Path) -> Result<(), HostError> {
            self.placed.lock().unwrap().push(format!("image:{}", op.instance_id));
            Ok(())
        }

        fn add_text(&mut self, op: &TextOp) -> Result<(), HostError> {
            self.placed.lock().unwrap().push(format!("text:{}", op.instance_id));
            Ok(())
        }

        fn configure_output(
            &mut self,
            _spec: &OutputSpec,
            _output_path: &Path,
        ) -> Result<(), HostError> {
            Ok(())
        }

        fn start_render(&mut self, mut lifecycle: RenderLifecycle) -> Result<(), HostError> {
            lifecycle.render_started();
            lifecycle.render_complete(Ok(PathBuf::from("/tmp/out.mp4")));
            Ok(())
        }

        fn is_available(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    fn scratch_store(name: &str) -> ChunkStore<StubSource> {
        let dir = std::env::temp_dir().join(format!("cutforge_worker_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        ChunkStore::new(dir, StubSource)
    }

    fn compiled(json: &str) -> CompiledTimeline {
        compile(&Instruction::from_json(json).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_apply_timeline_places_good_clips_and_skips_broken_ones() {
        let store = scratch_store("mixed");
        let mut engine = RecordingEngine::default();

        let compiled = compiled(
            r#"{
                "sequence": {"fps": 24, "tracks": [{"clips": [
                    {"instanceId": "ok", "start_ms": 0,
                     "clipRef": {"mediatype": "video", "mediaid": "m-good", "mime": "video/mp4"}},
                    {"instanceId": "gone", "start_ms": 0,
                     "clipRef": {"mediatype": "video", "mediaid": "m-missing", "mime": "video/mp4"}},
                    {"instanceId": "label", "start_ms": 0,
                     "clipRef": {"mediatype": "text", "text": "Title"}},
                    {"instanceId": "odd", "start_ms": 0,
                     "clipRef": {"mediatype": "wiggle"}}
                ]}]}
            }"#,
        );

        let report = apply_timeline(&mut engine, &store, &compiled).await.unwrap();

        assert_eq!(report.applied, 2);
        assert_eq!(report.skipped.len(), 2);
        let placed = engine.placed.lock().unwrap().clone();
        assert_eq!(placed, vec!["video:ok", "text:label"]);
    }

    #[tokio::test]
    async fn test_apply_timeline_absorbs_host_rejections_per_clip() {
        let store = scratch_store("host_reject");
        let mut engine = RecordingEngine {
            reject_audio: true,
            ..RecordingEngine::default()
        };

        let compiled = compiled(
            r#"{
                "sequence": {"fps": 24, "tracks": [{"clips": [
                    {"instanceId": "a", "start_ms": 0,
                     "clipRef": {"mediatype": "audio", "mediaid": "m-1", "mime": "audio/wav"}},
                    {"instanceId": "v", "start_ms": 0,
                     "clipRef": {"mediatype": "video", "mediaid": "m-2", "mime": "video/mp4"}}
                ]}]}
            }"#,
        );

        let report = apply_timeline(&mut engine, &store, &compiled).await.unwrap();

        assert_eq!(report.applied, 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].0, "a");
    }
}
