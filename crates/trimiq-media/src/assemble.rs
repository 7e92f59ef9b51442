//! Final video assembly and keyframe extraction.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use trimiq_models::Resolution;

use crate::error::{MediaError, MediaResult};

/// Extract a single representative frame from a clip as a JPEG.
///
/// The frame is scaled to 336px width (CLIP preprocessing input size class)
/// so the embedding service does not receive full-resolution stills.
pub async fn extract_keyframe(
    clip_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
) -> MediaResult<()> {
    let clip_path = clip_path.as_ref();
    let output_path = output_path.as_ref();

    if !clip_path.exists() {
        return Err(MediaError::FileNotFound(clip_path.to_path_buf()));
    }
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

    let output = Command::new("ffmpeg")
        .arg("-y")
        .arg("-i")
        .arg(clip_path)
        .args(["-vf", "thumbnail,scale=336:-1", "-frames:v", "1"])
        .arg(output_path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::ffmpeg_failed(
            "keyframe extraction failed",
            Some(String::from_utf8_lossy(&output.stderr).to_string()),
            output.status.code(),
        ));
    }

    debug!(clip = %clip_path.display(), "Extracted keyframe");
    Ok(())
}

/// Concatenate clips into a single output, scaled to the requested
/// resolution, with an optional narration track muxed in.
///
/// Uploads arrive in whatever codec and size the client had, so each input
/// is normalized through the concat filter (scale, pad, constant frame
/// rate) rather than the concat demuxer, which requires uniform stream
/// parameters across inputs. With a narration track the output stops at
/// the shorter of video and audio; without one the output is silent.
pub async fn concat_clips(
    clips: &[impl AsRef<Path>],
    narration: Option<&Path>,
    resolution: Resolution,
    output_path: impl AsRef<Path>,
) -> MediaResult<()> {
    let output_path = output_path.as_ref();

    if clips.is_empty() {
        return Err(MediaError::InvalidMedia("no clips to assemble".to_string()));
    }
    for clip in clips {
        if !clip.as_ref().exists() {
            return Err(MediaError::FileNotFound(clip.as_ref().to_path_buf()));
        }
    }
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

    if let Some(parent) = output_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut command = Command::new("ffmpeg");
    command.arg("-y");
    for clip in clips {
        command.arg("-i").arg(clip.as_ref());
    }
    if let Some(narration) = narration {
        if !narration.exists() {
            return Err(MediaError::FileNotFound(narration.to_path_buf()));
        }
        command.arg("-i").arg(narration);
    }

    let filter = concat_filter(clips.len(), resolution);
    command
        .args(["-filter_complex", &filter])
        .args(["-map", "[vout]"]);

    if narration.is_some() {
        // Narration is the input after the clips
        command
            .args(["-map", &format!("{}:a:0", clips.len())])
            .args(["-c:a", "aac"])
            .arg("-shortest");
    }

    let output = command
        .args(["-c:v", "libx264", "-preset", "veryfast", "-pix_fmt", "yuv420p"])
        .arg(output_path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::ffmpeg_failed(
            "clip concatenation failed",
            Some(String::from_utf8_lossy(&output.stderr).to_string()),
            output.status.code(),
        ));
    }

    info!(
        clips = clips.len(),
        resolution = %resolution,
        output = %output_path.display(),
        "Assembled output video"
    );
    Ok(())
}

/// Filter graph that normalizes each clip to the target dimensions and a
/// constant frame rate, then joins them with the concat filter.
fn concat_filter(clip_count: usize, resolution: Resolution) -> String {
    let (width, height) = resolution.dimensions();
    let mut filter = String::new();
    for i in 0..clip_count {
        filter.push_str(&format!(
            "[{i}:v]scale={width}:{height}:force_original_aspect_ratio=decrease,\
             pad={width}:{height}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps=30[v{i}];"
        ));
    }
    for i in 0..clip_count {
        filter.push_str(&format!("[v{i}]"));
    }
    filter.push_str(&format!("concat=n={clip_count}:v=1:a=0[vout]"));
    filter
}
