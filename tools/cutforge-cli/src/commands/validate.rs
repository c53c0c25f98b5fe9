//! Validate a local instruction document.

use std::path::PathBuf;

use cutforge_instruction_model::{ClipRef, Instruction};
use cutforge_timeline_compiler::compile;

pub fn run(instruction_path: PathBuf) -> anyhow::Result<()> {
    println!("Validating: {}", instruction_path.display());

    let json = std::fs::read_to_string(&instruction_path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", instruction_path.display()))?;
    let instruction = Instruction::from_json(&json)
        .map_err(|e| anyhow::anyhow!("Invalid instruction document: {e}"))?;

    let mut warnings = vec![];

    for (track_index, track) in instruction.sequence.tracks.iter().enumerate() {
        for clip in &track.clips {
            match &clip.clip_ref {
                ClipRef::Unsupported { media_type } => {
                    warnings.push(format!(
                        "track {track_index}, clip {}: unsupported mediatype {media_type:?}",
                        clip.instance_id
                    ));
                }
                ClipRef::Text { text } if text.is_empty() => {
                    warnings.push(format!(
                        "track {track_index}, clip {}: empty text",
                        clip.instance_id
                    ));
                }
                _ => {}
            }
            if clip.start_ms < 0 {
                warnings.push(format!(
                    "track {track_index}, clip {}: negative start_ms",
                    clip.instance_id
                ));
            }
        }
    }

    let compiled = compile(&instruction).map_err(|e| anyhow::anyhow!("Compile failed: {e}"))?;

    for warning in &warnings {
        println!("  warning: {warning}");
    }

    println!(
        "OK: {} operation(s), {} unsupported, {} warning(s)",
        compiled.ops.len(),
        compiled.unsupported_count(),
        warnings.len()
    );

    Ok(())
}
