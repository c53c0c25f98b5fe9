//! Check engine availability and show the effective configuration.

use cutforge_common::config::WorkerConfig;
use cutforge_render_engine::{FfmpegEngine, HostEngine};

pub fn run() -> anyhow::Result<()> {
    let config = WorkerConfig::load();

    println!("Cutforge worker check");
    println!("  Server:        {}", config.server_url);
    println!("  Machine id:    {}", config.machine_id);
    println!("  Poll interval: {}s", config.poll_interval_secs);
    println!("  Cache dir:     {}", config.cache_dir.display());
    println!("  Output dir:    {}", config.output_dir.display());
    println!(
        "  Chunk size:    {} KiB",
        config.chunk_size_bytes / 1024
    );

    let engine = FfmpegEngine::new();
    if engine.is_available() {
        println!("  Engine:        {} (available)", engine.name());
    } else {
        println!("  Engine:        {} (NOT FOUND in PATH)", engine.name());
    }

    Ok(())
}
