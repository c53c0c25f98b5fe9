//! Reference host engine over the ffmpeg CLI.
//!
//! Strips accumulate into a compositing plan: every media strip becomes an
//! ffmpeg input with trim/offset filters, stacked by channel onto a black
//! base; text strips become drawtext filters on the composited video. The
//! render runs on a blocking task and reports through the lifecycle
//! notifier like any other host.

use std::path::{Path, PathBuf};
use std::process::Command;

use cutforge_instruction_model::OutputSpec;
use cutforge_timeline_compiler::{ImageOp, MediaOp, TextOp};

use crate::engine::{HostEngine, HostError, RenderLifecycle};

/// Fallback strip length when no duration is declared and the media
/// cannot be probed.
const DEFAULT_STRIP_SECS: f64 = 5.0;

#[derive(Debug, Clone)]
enum Strip {
    Video { op: MediaOp, path: PathBuf },
    Audio { op: MediaOp, path: PathBuf },
    Image { op: ImageOp, path: PathBuf },
    Text(TextOp),
}

#[derive(Debug, Clone)]
struct OutputTarget {
    spec: OutputSpec,
    path: PathBuf,
}

/// ffmpeg-backed [`HostEngine`].
#[derive(Debug, Default)]
pub struct FfmpegEngine {
    strips: Vec<Strip>,
    output: Option<OutputTarget>,
}

#[derive(Debug, Clone)]
struct RenderPlan {
    args: Vec<String>,
    output_path: PathBuf,
}

impl FfmpegEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Visible duration of a media strip in seconds: explicit override,
    /// then the cut window, then the probed media length.
    fn media_strip_secs(op: &MediaOp, path: &Path, fps: u32) -> f64 {
        if let Some(frames) = op.final_duration_frames {
            return frames as f64 / fps as f64;
        }
        if let Some(cut) = &op.cut {
            return (cut.end_frame - cut.start_frame).max(0) as f64 / fps as f64;
        }
        probe_duration_secs(path).unwrap_or(DEFAULT_STRIP_SECS)
    }

    fn build_plan(&self) -> Result<RenderPlan, HostError> {
        let target = self
            .output
            .as_ref()
            .ok_or_else(|| HostError::operation("render started before output configuration"))?;

        let spec = &target.spec;
        let fps = spec.video.fps.max(1);
        let (width, height) = (spec.video.width, spec.video.height);

        // Stack order: higher channels composite on top.
        let mut video_strips: Vec<&Strip> = self
            .strips
            .iter()
            .filter(|s| matches!(s, Strip::Video { .. } | Strip::Image { .. }))
            .collect();
        video_strips.sort_by_key(|s| match s {
            Strip::Video { op, .. } => op.channel,
            Strip::Image { op, .. } => op.channel,
            _ => 0,
        });

        let audio_strips: Vec<&Strip> = self
            .strips
            .iter()
            .filter(|s| matches!(s, Strip::Video { .. } | Strip::Audio { .. }))
            .collect();

        let text_strips: Vec<&TextOp> = self
            .strips
            .iter()
            .filter_map(|s| match s {
                Strip::Text(op) => Some(op),
                _ => None,
            })
            .collect();

        // Total timeline length: the furthest strip end, five seconds
        // when nothing was placed.
        let mut end_secs: f64 = 0.0;
        for strip in &self.strips {
            end_secs = end_secs.max(self.strip_end_secs(strip, fps));
        }
        if end_secs <= 0.0 {
            end_secs = DEFAULT_STRIP_SECS;
        }

        let mut args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
        ];

        // Media inputs, addressed in the filter graph by the order they
        // are added here. The black base is synthesized inside the graph
        // and takes no input slot.
        let mut input_index = 0usize;
        let mut video_inputs: Vec<(usize, &Strip)> = Vec::new();
        for &strip in &video_strips {
            match strip {
                Strip::Video { path, .. } => {
                    args.push("-i".to_string());
                    args.push(path.display().to_string());
                }
                Strip::Image { op, path } => {
                    let secs = op
                        .duration_frames
                        .map(|f| f as f64 / fps as f64)
                        .unwrap_or(DEFAULT_STRIP_SECS);
                    args.push("-loop".to_string());
                    args.push("1".to_string());
                    args.push("-t".to_string());
                    args.push(format!("{secs:.3}"));
                    args.push("-i".to_string());
                    args.push(path.display().to_string());
                }
                _ => unreachable!("filtered to video/image above"),
            }
            video_inputs.push((input_index, strip));
            input_index += 1;
        }

        let mut audio_inputs: Vec<(usize, &MediaOp)> = Vec::new();
        for &strip in &audio_strips {
            match strip {
                // Video audio rides the already-added video input.
                Strip::Video { op, .. } => {
                    if let Some((idx, _)) = video_inputs
                        .iter()
                        .find(|(_, s)| matches!(s, Strip::Video { op: o, .. } if o.instance_id == op.instance_id))
                    {
                        audio_inputs.push((*idx, op));
                    }
                }
                Strip::Audio { op, path } => {
                    args.push("-i".to_string());
                    args.push(path.display().to_string());
                    audio_inputs.push((input_index, op));
                    input_index += 1;
                }
                _ => unreachable!("filtered to video/audio above"),
            }
        }

        let filter = self.build_filter_graph(
            fps,
            width,
            height,
            end_secs,
            &video_inputs,
            &audio_inputs,
            &text_strips,
        );

        args.push("-filter_complex".to_string());
        args.push(filter);
        args.push("-map".to_string());
        args.push("[vout]".to_string());
        if !audio_inputs.is_empty() {
            args.push("-map".to_string());
            args.push("[aout]".to_string());
        }

        args.push("-r".to_string());
        args.push(fps.to_string());
        args.push("-t".to_string());
        args.push(format!("{end_secs:.3}"));

        args.extend(codec_args(spec));
        args.push(target.path.display().to_string());

        Ok(RenderPlan {
            args,
            output_path: target.path.clone(),
        })
    }

    fn strip_end_secs(&self, strip: &Strip, fps: u32) -> f64 {
        match strip {
            Strip::Video { op, path } | Strip::Audio { op, path } => {
                op.start_frame as f64 / fps as f64 + Self::media_strip_secs(op, path, fps)
            }
            Strip::Image { op, .. } => {
                op.start_frame as f64 / fps as f64
                    + op.duration_frames
                        .map(|f| f as f64 / fps as f64)
                        .unwrap_or(DEFAULT_STRIP_SECS)
            }
            Strip::Text(op) => op.end_frame as f64 / fps as f64,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn build_filter_graph(
        &self,
        fps: u32,
        width: u32,
        height: u32,
        duration_secs: f64,
        video_inputs: &[(usize, &Strip)],
        audio_inputs: &[(usize, &MediaOp)],
        text_strips: &[&TextOp],
    ) -> String {
        let mut graph = format!(
            "color=c=black:s={width}x{height}:r={fps}:d={duration_secs:.3}[base]"
        );

        let mut current = "base".to_string();
        for (layer, (input_idx, strip)) in video_inputs.iter().enumerate() {
            let (start_frame, trim, label) = match strip {
                Strip::Video { op, path } => (
                    op.start_frame,
                    Some((
                        op.cut.map(|c| c.start_frame).unwrap_or(0) as f64 / fps as f64,
                        Self::media_strip_secs(op, path, fps),
                    )),
                    format!("v{layer}"),
                ),
                Strip::Image { op, .. } => (op.start_frame, None, format!("v{layer}")),
                _ => continue,
            };
            let start_secs = start_frame as f64 / fps as f64;

            let mut chain = format!("[{input_idx}:v]");
            if let Some((trim_start, trim_secs)) = trim {
                chain.push_str(&format!(
                    "trim=start={trim_start:.3}:duration={trim_secs:.3},"
                ));
            }
            chain.push_str(&format!(
                "scale={width}:{height},setpts=PTS-STARTPTS+{start_secs:.3}/TB[{label}]"
            ));

            let next = format!("c{layer}");
            graph.push_str(&format!(
                ";{chain};[{current}][{label}]overlay=eof_action=pass[{next}]"
            ));
            current = next;
        }

        // Text goes on top of the composited video.
        let mut text_filters = String::new();
        for op in text_strips {
            let start = op.start_frame as f64 / fps as f64;
            let end = op.end_frame as f64 / fps as f64;
            if !text_filters.is_empty() {
                text_filters.push(',');
            }
            text_filters.push_str(&format!(
                "drawtext=text='{}':fontcolor=white:fontsize=48:\
                 x=(w-text_w)/2:y=h-text_h-60:enable='between(t,{start:.3},{end:.3})'",
                escape_drawtext(&op.text)
            ));
        }
        if text_filters.is_empty() {
            graph.push_str(&format!(";[{current}]null[vout]"));
        } else {
            graph.push_str(&format!(";[{current}]{text_filters}[vout]"));
        }

        // Audio: per-strip trim + delay, mixed down.
        if !audio_inputs.is_empty() {
            let mut mix_labels = String::new();
            for (layer, (input_idx, op)) in audio_inputs.iter().enumerate() {
                let delay_ms = (op.start_frame.max(0) as f64 / fps as f64 * 1000.0) as i64;
                let mut chain = format!("[{input_idx}:a]");
                if let Some(cut) = &op.cut {
                    let trim_start = cut.start_frame as f64 / fps as f64;
                    let trim_end = cut.end_frame as f64 / fps as f64;
                    chain.push_str(&format!("atrim=start={trim_start:.3}:end={trim_end:.3},"));
                }
                chain.push_str(&format!(
                    "asetpts=PTS-STARTPTS,adelay={delay_ms}:all=1[a{layer}]"
                ));
                graph.push_str(&format!(";{chain}"));
                mix_labels.push_str(&format!("[a{layer}]"));
            }
            graph.push_str(&format!(
                ";{mix_labels}amix=inputs={}:duration=longest:normalize=0[aout]",
                audio_inputs.len()
            ));
        }

        graph
    }
}

impl HostEngine for FfmpegEngine {
    fn reset(&mut self) -> Result<(), HostError> {
        self.strips.clear();
        self.output = None;
        Ok(())
    }

    fn add_video(&mut self, op: &MediaOp, media: &Path) -> Result<(), HostError> {
        if !media.exists() {
            return Err(HostError::operation(format!(
                "media file missing: {}",
                media.display()
            )));
        }
        self.strips.push(Strip::Video {
            op: op.clone(),
            path: media.to_path_buf(),
        });
        Ok(())
    }

    fn add_audio(&mut self, op: &MediaOp, media: &Path) -> Result<(), HostError> {
        if !media.exists() {
            return Err(HostError::operation(format!(
                "media file missing: {}",
                media.display()
            )));
        }
        self.strips.push(Strip::Audio {
            op: op.clone(),
            path: media.to_path_buf(),
        });
        Ok(())
    }

    fn add_image(&mut self, op: &ImageOp, media: &Path) -> Result<(), HostError> {
        if !media.exists() {
            return Err(HostError::operation(format!(
                "media file missing: {}",
                media.display()
            )));
        }
        self.strips.push(Strip::Image {
            op: op.clone(),
            path: media.to_path_buf(),
        });
        Ok(())
    }

    fn add_text(&mut self, op: &TextOp) -> Result<(), HostError> {
        self.strips.push(Strip::Text(op.clone()));
        Ok(())
    }

    fn configure_output(
        &mut self,
        spec: &OutputSpec,
        output_path: &Path,
    ) -> Result<(), HostError> {
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.output = Some(OutputTarget {
            spec: spec.clone(),
            path: output_path.to_path_buf(),
        });
        Ok(())
    }

    fn start_render(&mut self, mut lifecycle: RenderLifecycle) -> Result<(), HostError> {
        let plan = self.build_plan()?;

        tokio::spawn(async move {
            lifecycle.render_started();

            let result = tokio::task::spawn_blocking(move || run_ffmpeg(&plan))
                .await
                .unwrap_or_else(|e| Err(HostError::render(format!("render task panicked: {e}"))));

            lifecycle.render_complete(result);
        });

        Ok(())
    }

    fn is_available(&self) -> bool {
        command_exists("ffmpeg")
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

fn run_ffmpeg(plan: &RenderPlan) -> Result<PathBuf, HostError> {
    tracing::debug!(args = ?plan.args, "Running ffmpeg");

    let output = Command::new("ffmpeg")
        .args(&plan.args)
        .output()
        .map_err(|e| HostError::render(format!("failed to start ffmpeg: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(HostError::render(format!(
            "ffmpeg exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(plan.output_path.clone())
}

/// Map the output spec's codec names onto ffmpeg encoder arguments.
fn codec_args(spec: &OutputSpec) -> Vec<String> {
    let video_codec = match spec.video.codec.to_ascii_lowercase().as_str() {
        "h265" | "hevc" => "libx265",
        "vp9" => "libvpx-vp9",
        _ => "libx264",
    };
    let audio_codec = match spec.audio.codec.to_ascii_lowercase().as_str() {
        "opus" => "libopus",
        "mp3" => "libmp3lame",
        _ => "aac",
    };

    vec![
        "-c:v".to_string(),
        video_codec.to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-b:v".to_string(),
        spec.video.bitrate.to_string(),
        "-c:a".to_string(),
        audio_codec.to_string(),
        "-b:a".to_string(),
        spec.audio.bitrate.to_string(),
        "-ac".to_string(),
        spec.audio.channels.clamp(1, 2).to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
    ]
}

/// Escape a string for use inside a drawtext `text='…'` argument.
fn escape_drawtext(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            ':' => escaped.push_str("\\:"),
            '%' => escaped.push_str("\\%"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn probe_duration_secs(path: &Path) -> Option<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "csv=p=0",
        ])
        .arg(path)
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let raw = String::from_utf8(output.stdout).ok()?;
    raw.trim().parse::<f64>().ok()
}

fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutforge_instruction_model::MediaRef;
    use cutforge_timeline_compiler::CutFrames;

    fn media_op(instance_id: &str, start_frame: i64, cut: Option<CutFrames>) -> MediaOp {
        MediaOp {
            instance_id: instance_id.to_string(),
            media: MediaRef {
                media_id: format!("m-{instance_id}"),
                mime: Some("video/mp4".to_string()),
                title: None,
                cut: None,
            },
            channel: 1,
            start_frame,
            placement_frame: start_frame - cut.map(|c| c.start_frame).unwrap_or(0),
            cut,
            final_duration_frames: None,
        }
    }

    fn scratch_media(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("cutforge_ffmpeg_tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, b"stub").unwrap();
        path
    }

    #[test]
    fn test_plan_requires_configured_output() {
        let engine = FfmpegEngine::new();
        assert!(matches!(
            engine.build_plan(),
            Err(HostError::Operation { .. })
        ));
    }

    #[test]
    fn test_plan_maps_codecs_and_duration() {
        let mut engine = FfmpegEngine::new();
        let media = scratch_media("clip_a.mp4");

        let mut op = media_op(
            "a",
            24,
            Some(CutFrames {
                start_frame: 0,
                end_frame: 48,
            }),
        );
        op.final_duration_frames = Some(48);
        engine.add_video(&op, &media).unwrap();

        let spec: OutputSpec = serde_json::from_str(
            r#"{"video": {"fps": 24, "codec": "h265", "bitrate": 8000000},
                "audio": {"codec": "opus", "bitrate": 192000, "channels": 2},
                "container": "mp4"}"#,
        )
        .unwrap();
        let out = std::env::temp_dir().join("cutforge_ffmpeg_tests/out.mp4");
        engine.configure_output(&spec, &out).unwrap();

        let plan = engine.build_plan().unwrap();
        let args = plan.args.join(" ");

        assert!(args.contains("-c:v libx265"));
        assert!(args.contains("-c:a libopus"));
        // strip: starts at 1s, runs 2s → timeline ends at 3s
        assert!(args.contains("-t 3.000"));
        assert!(args.contains("[vout]"));
        assert!(args.contains("[aout]"));
    }

    #[test]
    fn test_text_only_plan_has_no_audio_map() {
        let mut engine = FfmpegEngine::new();
        engine
            .add_text(&TextOp {
                instance_id: "t".to_string(),
                text: "It's 100%: done".to_string(),
                channel: 1,
                start_frame: 0,
                end_frame: 120,
            })
            .unwrap();

        let spec = OutputSpec::default();
        let out = std::env::temp_dir().join("cutforge_ffmpeg_tests/text_out.mp4");
        engine.configure_output(&spec, &out).unwrap();

        let plan = engine.build_plan().unwrap();
        let args = plan.args.join(" ");

        assert!(!args.contains("[aout]"));
        assert!(args.contains("drawtext"));
        // drawtext specials are escaped
        assert!(args.contains("\\'"));
        assert!(args.contains("\\:"));
        assert!(args.contains("\\%"));
    }

    #[test]
    fn test_reset_clears_strips_and_output() {
        let mut engine = FfmpegEngine::new();
        engine
            .add_text(&TextOp {
                instance_id: "t".to_string(),
                text: "x".to_string(),
                channel: 1,
                start_frame: 0,
                end_frame: 10,
            })
            .unwrap();
        engine.reset().unwrap();
        assert!(engine.strips.is_empty());
        assert!(engine.output.is_none());
    }

    #[test]
    fn test_missing_media_is_a_host_operation_error() {
        let mut engine = FfmpegEngine::new();
        let op = media_op("ghost", 0, None);
        let result = engine.add_video(&op, Path::new("/nonexistent/ghost.mp4"));
        assert!(matches!(result, Err(HostError::Operation { .. })));
    }
}
