//! Start the unattended render worker.

use std::path::PathBuf;

use cutforge_common::config::WorkerConfig;
use cutforge_render_engine::{FfmpegEngine, HostEngine};
use cutforge_render_worker::RenderOrchestrator;

pub async fn run(
    server: Option<String>,
    machine: Option<String>,
    interval: Option<u64>,
    cache_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut config = WorkerConfig::load();
    if let Some(server) = server {
        config.server_url = server;
    }
    if let Some(machine) = machine {
        config.machine_id = machine;
    }
    if let Some(interval) = interval {
        config.poll_interval_secs = interval.max(1);
    }
    if let Some(cache_dir) = cache_dir {
        config.cache_dir = cache_dir;
    }
    if let Some(output_dir) = output_dir {
        config.output_dir = output_dir;
    }

    std::fs::create_dir_all(&config.cache_dir)?;
    std::fs::create_dir_all(&config.output_dir)?;

    let engine = FfmpegEngine::new();
    if !engine.is_available() {
        anyhow::bail!("ffmpeg not found in PATH; the render engine cannot run");
    }

    let mut orchestrator = RenderOrchestrator::new(config, engine)
        .map_err(|e| anyhow::anyhow!("Failed to start worker: {e}"))?;

    orchestrator
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("Worker loop exited: {e}"))
}
