//! External media tool invocation.
//!
//! ffmpeg/ffprobe are driven as subprocesses behind the
//! [`MediaToolExecutor`] trait so the assembly pipeline can be tested
//! without the binaries installed. Two fixed command shapes: a stream-copy
//! concat over a generated list file, and a re-encoding mux of one video
//! and one audio input trimmed to the shorter stream.

use crate::domain::blueprint::EncodeSettings;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command as TokioCommand;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaToolExecutor: Send + Sync {
    /// Concatenate the clips named in `list_file` (concat demuxer syntax)
    /// into `output` without re-encoding.
    async fn concat(&self, list_file: &Path, output: &Path) -> io::Result<Output>;

    /// Combine `video` and `audio` into `output`, re-encoding with
    /// `settings` and trimming to the shorter input.
    async fn mux(
        &self,
        video: &Path,
        audio: &Path,
        settings: &EncodeSettings,
        output: &Path,
    ) -> io::Result<Output>;

    /// Probe a media file's container duration.
    async fn probe_duration(&self, media_path: &Path) -> io::Result<Output>;
}

/// Real ffmpeg/ffprobe invocations, each bounded by `timeout`.
pub struct FfmpegExecutor {
    timeout: Duration,
}

impl FfmpegExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn run(&self, tool: &'static str, mut command: TokioCommand) -> io::Result<Output> {
        match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("{} did not finish within {:?}", tool, self.timeout),
            )),
        }
    }
}

#[async_trait]
impl MediaToolExecutor for FfmpegExecutor {
    async fn concat(&self, list_file: &Path, output: &Path) -> io::Result<Output> {
        let mut command = TokioCommand::new("ffmpeg");
        command
            .arg("-y")
            .arg("-f")
            .arg("concat")
            .arg("-safe")
            .arg("0")
            .arg("-i")
            .arg(list_file)
            .arg("-c")
            .arg("copy")
            .arg(output);
        self.run("ffmpeg", command).await
    }

    async fn mux(
        &self,
        video: &Path,
        audio: &Path,
        settings: &EncodeSettings,
        output: &Path,
    ) -> io::Result<Output> {
        let mut command = TokioCommand::new("ffmpeg");
        command
            .arg("-y")
            .arg("-i")
            .arg(video)
            .arg("-i")
            .arg(audio)
            .arg("-map")
            .arg("0:v:0")
            .arg("-map")
            .arg("1:a:0")
            .arg("-c:v")
            .arg(&settings.video_codec)
            .arg("-b:v")
            .arg(&settings.video_bitrate)
            .arg("-c:a")
            .arg(&settings.audio_codec)
            .arg("-b:a")
            .arg(&settings.audio_bitrate)
            .arg("-r")
            .arg(settings.frame_rate.to_string())
            .arg("-shortest")
            .arg(output);
        self.run("ffmpeg", command).await
    }

    async fn probe_duration(&self, media_path: &Path) -> io::Result<Output> {
        let mut command = TokioCommand::new("ffprobe");
        command
            .arg("-v")
            .arg("error")
            .arg("-show_entries")
            .arg("format=duration")
            .arg("-of")
            .arg("default=noprint_wrappers=1:nokey=1")
            .arg(media_path);
        self.run("ffprobe", command).await
    }
}

/// Write a concat-demuxer list file referencing `clips` in order.
/// Single quotes are escaped per the demuxer's quoting rules.
pub async fn write_concat_list(clips: &[PathBuf], list_file: &Path) -> io::Result<()> {
    let mut contents = String::new();
    for clip in clips {
        let escaped = clip.to_string_lossy().replace('\'', "'\\''");
        contents.push_str(&format!("file '{}'\n", escaped));
    }
    tokio::fs::write(list_file, contents).await
}

/// Parse ffprobe's duration output (one float on stdout).
pub fn parse_probed_duration(output: &Output) -> Option<f64> {
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d > 0.0)
}

/// Diagnostic text of a failed tool run, for the error record. ffmpeg puts
/// the useful part at the end of stderr, so only the last lines are kept.
pub fn tool_diagnostic(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let start = lines.len().saturating_sub(5);
    let tail = lines[start..].join(" | ");
    if tail.is_empty() {
        format!(
            "exit status {:?}, no diagnostic output",
            output.status.code()
        )
    } else {
        tail
    }
}
