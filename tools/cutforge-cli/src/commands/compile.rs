//! Compile a local instruction document and print the operation plan.

use std::path::PathBuf;

use cutforge_instruction_model::Instruction;
use cutforge_timeline_compiler::{compile, ClipOp};

pub fn run(instruction_path: PathBuf) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(&instruction_path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", instruction_path.display()))?;
    let instruction = Instruction::from_json(&json)
        .map_err(|e| anyhow::anyhow!("Failed to parse instruction: {e}"))?;

    let compiled =
        compile(&instruction).map_err(|e| anyhow::anyhow!("Compile failed: {e}"))?;

    let range = compiled.frame_range();
    println!(
        "Instruction: {} ({} clips @ {} fps, frames {}..{})",
        if instruction.name.is_empty() {
            instruction_path.display().to_string()
        } else {
            instruction.name.clone()
        },
        instruction.clip_count(),
        compiled.fps,
        range.start,
        range.end,
    );

    for op in &compiled.ops {
        match op {
            ClipOp::Video(media_op) | ClipOp::Audio(media_op) => {
                let trim = media_op
                    .cut
                    .map(|c| format!(", trim {}..{}", c.start_frame, c.end_frame))
                    .unwrap_or_default();
                let duration = media_op
                    .final_duration_frames
                    .map(|f| format!(", duration {f}f"))
                    .unwrap_or_default();
                println!(
                    "  {:<12} {:<16} ch{} @ frame {} (placed {}){trim}{duration}",
                    op.kind(),
                    media_op.instance_id,
                    media_op.channel,
                    media_op.start_frame,
                    media_op.placement_frame,
                );
            }
            ClipOp::Image(image_op) => {
                let duration = image_op
                    .duration_frames
                    .map(|f| format!(", duration {f}f"))
                    .unwrap_or_default();
                println!(
                    "  {:<12} {:<16} ch{} @ frame {}{duration}",
                    op.kind(),
                    image_op.instance_id,
                    image_op.channel,
                    image_op.start_frame,
                );
            }
            ClipOp::Text(text_op) => {
                println!(
                    "  {:<12} {:<16} ch{} frames {}..{} {:?}",
                    op.kind(),
                    text_op.instance_id,
                    text_op.channel,
                    text_op.start_frame,
                    text_op.end_frame,
                    text_op.text,
                );
            }
            ClipOp::Unsupported {
                instance_id,
                media_type,
                track,
            } => {
                println!(
                    "  {:<12} {:<16} track {} (mediatype {:?} will be skipped)",
                    op.kind(),
                    instance_id,
                    track,
                    media_type,
                );
            }
        }
    }

    if compiled.unsupported_count() > 0 {
        println!(
            "Warning: {} clip(s) have unsupported media types",
            compiled.unsupported_count()
        );
    }

    Ok(())
}
