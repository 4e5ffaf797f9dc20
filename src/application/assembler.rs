//! The assembly orchestrator.
//!
//! Turns one validated blueprint into one uploaded video:
//! `pending → fetching → concatenating → muxing → uploading → completed`,
//! with `failed` reachable from every non-terminal stage. Every transition
//! is published through the injected [`TaskStatusReporter`]; the workspace
//! is removed on every exit path.

use crate::application::workspace::Workspace;
use crate::domain::blueprint::Blueprint;
use crate::domain::error::AssemblyError;
use crate::domain::ffmpeg::{
    parse_probed_duration, tool_diagnostic, write_concat_list, MediaToolExecutor,
};
use crate::ports::reporter::{StatusUpdate, TaskStatus, TaskStatusReporter};
use crate::ports::storage::StoragePort;
use futures::stream::StreamExt;
use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    /// Upper bound on in-flight fetches during the fan-out stage.
    pub max_concurrent_fetches: usize,
    /// Retain the workspace after the run, for debugging.
    pub keep_workspace: bool,
    /// Directory to create workspaces under; system temp when unset.
    pub workspace_root: Option<PathBuf>,
    /// Lifetime of the signed result URL.
    pub signed_url_ttl: Duration,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: 10,
            keep_workspace: false,
            workspace_root: None,
            signed_url_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Result descriptor recorded on the task when a run completes.
#[derive(Debug, Clone, Serialize)]
pub struct AssemblyResult {
    pub output: String,
    pub video_url: String,
    pub duration_seconds: f64,
    pub clip_count: usize,
}

/// Terminal outcome of one run. Failures are reported through the status
/// record, never propagated as `Err` to the caller.
#[derive(Debug)]
pub enum RunOutcome {
    Completed(AssemblyResult),
    Failed(AssemblyError),
}

pub struct AssemblerService<S, R, M> {
    storage: S,
    reporter: R,
    tool: M,
    config: AssemblerConfig,
}

impl<S, R, M> AssemblerService<S, R, M>
where
    S: StoragePort,
    R: TaskStatusReporter,
    M: MediaToolExecutor,
{
    pub fn new(storage: S, reporter: R, tool: M, config: AssemblerConfig) -> Self {
        Self {
            storage,
            reporter,
            tool,
            config,
        }
    }

    /// Run one assembly to its terminal state. Expects a blueprint that
    /// already passed validation; invalid input must be rejected before a
    /// task is ever marked started.
    pub async fn run(&self, blueprint: &Blueprint) -> RunOutcome {
        let progress = ProgressTracker {
            reporter: &self.reporter,
            task_id: &blueprint.task_id,
            last: AtomicU8::new(0),
        };

        progress
            .publish(
                TaskStatus::Started,
                10,
                "pending",
                format!("assembly accepted: {} clips", blueprint.moves.len()),
                None,
                None,
            )
            .await;

        // A panicking stage must still leave a terminal `failed` record;
        // unwinding drops the workspace on the way out.
        let execution = AssertUnwindSafe(self.execute(blueprint, &progress))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(AssemblyError::Internal(panic_detail(payload))));

        match execution {
            Ok(result) => {
                info!(
                    task_id = %blueprint.task_id,
                    output = %result.output,
                    duration_seconds = result.duration_seconds,
                    "assembly completed"
                );
                let payload = serde_json::to_value(&result).ok();
                progress
                    .publish(
                        TaskStatus::Completed,
                        100,
                        "completed",
                        "video assembled and uploaded".to_string(),
                        payload,
                        None,
                    )
                    .await;
                RunOutcome::Completed(result)
            }
            Err(err) => {
                error!(task_id = %blueprint.task_id, error = %err, "assembly failed");
                let stage = err.stage();
                progress
                    .publish(
                        TaskStatus::Failed,
                        progress.current(),
                        stage,
                        format!("assembly failed during {}", stage),
                        None,
                        Some(err.to_string()),
                    )
                    .await;
                RunOutcome::Failed(err)
            }
        }
    }

    async fn execute(
        &self,
        blueprint: &Blueprint,
        progress: &ProgressTracker<'_, R>,
    ) -> Result<AssemblyResult, AssemblyError> {
        // The workspace is owned by this scope: dropped (and removed) on
        // every return below, success or failure.
        let workspace = Workspace::create(
            &blueprint.task_id,
            self.config.workspace_root.as_deref(),
            self.config.keep_workspace,
        )?;

        let audio_local = workspace.audio_path(&blueprint.audio_path);
        let clip_paths: Vec<PathBuf> = (0..blueprint.moves.len())
            .map(|i| workspace.clip_path(i))
            .collect();

        self.fetch_media(blueprint, &audio_local, &clip_paths, progress)
            .await?;

        progress
            .running(50, "concatenating", format!("concatenating {} clips", clip_paths.len()))
            .await;
        let concatenated = self.concatenate(&workspace, &clip_paths).await?;

        progress
            .running(70, "muxing", "muxing audio track into video".to_string())
            .await;
        let muxed = self.mux(&workspace, &concatenated, &audio_local, blueprint).await?;

        progress
            .running(85, "uploading", format!("uploading to {}", blueprint.output_config.output_path))
            .await;
        let output = self.upload(&muxed, blueprint).await?;

        progress
            .running(95, "finalizing", "recording result".to_string())
            .await;
        let duration_seconds = self.probe_duration(&muxed, blueprint).await;
        let video_url = match self
            .storage
            .signed_url(&blueprint.output_config.output_path, self.config.signed_url_ttl)
            .await
        {
            Ok(url) => url,
            Err(err) => {
                warn!(task_id = %blueprint.task_id, error = %err, "signed URL unavailable, using storage path");
                output.clone()
            }
        };

        Ok(AssemblyResult {
            output,
            video_url,
            duration_seconds,
            clip_count: blueprint.moves.len(),
        })
    }

    /// Fan out the audio fetch plus one fetch per move, at most
    /// `max_concurrent_fetches` in flight. The first failure aborts the
    /// stage; unfinished sibling fetches are dropped with it.
    async fn fetch_media(
        &self,
        blueprint: &Blueprint,
        audio_local: &Path,
        clip_paths: &[PathBuf],
        progress: &ProgressTracker<'_, R>,
    ) -> Result<(), AssemblyError> {
        let total = blueprint.moves.len() + 1;
        progress
            .running(20, "fetching", format!("fetching {} media files", total))
            .await;

        let mut jobs: Vec<(&str, &Path)> = Vec::with_capacity(total);
        jobs.push((blueprint.audio_path.as_str(), audio_local));
        for (m, dest) in blueprint.moves.iter().zip(clip_paths) {
            jobs.push((m.video_path.as_str(), dest.as_path()));
        }

        // Fetches run concurrently; progress is published only from this
        // single consumer loop so updates leave in nondecreasing order.
        let mut fetches = futures::stream::iter(jobs.into_iter().map(|(reference, dest)| {
            async move {
                self.storage.fetch(reference, dest).await.map_err(|err| {
                    AssemblyError::MediaNotFound {
                        reference: reference.to_string(),
                        detail: err.to_string(),
                    }
                })
            }
        }))
        .buffer_unordered(self.config.max_concurrent_fetches.max(1));

        let mut completed = 0usize;
        while let Some(result) = fetches.next().await {
            result?;
            completed += 1;
            // Fetch progress fills the 20-50 band.
            let pct = (20 + completed * 30 / total) as u8;
            progress
                .running(pct, "fetching", format!("fetched {}/{} media files", completed, total))
                .await;
        }

        Ok(())
    }

    async fn concatenate(
        &self,
        workspace: &Workspace,
        clip_paths: &[PathBuf],
    ) -> Result<PathBuf, AssemblyError> {
        let list_file = workspace.concat_list_path();
        write_concat_list(clip_paths, &list_file).await?;

        let output_path = workspace.concatenated_path();
        let output = self
            .tool
            .concat(&list_file, &output_path)
            .await
            .map_err(|err| AssemblyError::ToolExecution {
                stage: "concatenating",
                detail: err.to_string(),
            })?;
        ensure_tool_output("concatenating", &output, &output_path).await?;
        Ok(output_path)
    }

    async fn mux(
        &self,
        workspace: &Workspace,
        video: &Path,
        audio: &Path,
        blueprint: &Blueprint,
    ) -> Result<PathBuf, AssemblyError> {
        let settings = blueprint.output_config.encode_settings();
        let output_path = workspace.muxed_path();
        let output = self
            .tool
            .mux(video, audio, &settings, &output_path)
            .await
            .map_err(|err| AssemblyError::ToolExecution {
                stage: "muxing",
                detail: err.to_string(),
            })?;
        ensure_tool_output("muxing", &output, &output_path).await?;
        Ok(output_path)
    }

    async fn upload(&self, muxed: &Path, blueprint: &Blueprint) -> Result<String, AssemblyError> {
        let destination = &blueprint.output_config.output_path;
        let output = self
            .storage
            .upload(muxed, destination)
            .await
            .map_err(|err| AssemblyError::Upload {
                destination: destination.clone(),
                detail: err.to_string(),
            })?;

        match self.storage.exists(destination).await {
            Ok(true) => {}
            Ok(false) => {
                return Err(AssemblyError::Upload {
                    destination: destination.clone(),
                    detail: "object not present after upload".to_string(),
                })
            }
            // An unreadable head after a successful put is not worth
            // failing the run over.
            Err(err) => {
                warn!(destination = %destination, error = %err, "could not verify upload")
            }
        }
        Ok(output)
    }

    async fn probe_duration(&self, muxed: &Path, blueprint: &Blueprint) -> f64 {
        match self.tool.probe_duration(muxed).await {
            Ok(output) => parse_probed_duration(&output),
            Err(err) => {
                warn!(error = %err, "duration probe failed");
                None
            }
        }
        .unwrap_or_else(|| blueprint.planned_duration())
    }
}

fn panic_detail(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("task panicked: {}", msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("task panicked: {}", msg)
    } else {
        "task panicked".to_string()
    }
}

/// Verify a tool invocation succeeded and actually produced output.
async fn ensure_tool_output(
    stage: &'static str,
    output: &std::process::Output,
    expected: &Path,
) -> Result<(), AssemblyError> {
    if !output.status.success() {
        return Err(AssemblyError::ToolExecution {
            stage,
            detail: tool_diagnostic(output),
        });
    }
    match tokio::fs::metadata(expected).await {
        Ok(meta) if meta.len() > 0 => Ok(()),
        _ => Err(AssemblyError::ToolExecution {
            stage,
            detail: format!(
                "tool exited successfully but produced no output file ({})",
                expected
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            ),
        }),
    }
}

/// Publishes status updates with a monotone progress clamp. Reporting
/// failures are logged and swallowed so a flaky status store cannot strand
/// a run.
struct ProgressTracker<'a, R> {
    reporter: &'a R,
    task_id: &'a str,
    last: AtomicU8,
}

impl<'a, R: TaskStatusReporter> ProgressTracker<'a, R> {
    fn current(&self) -> u8 {
        self.last.load(Ordering::SeqCst)
    }

    async fn running(&self, progress: u8, stage: &str, message: String) {
        self.publish(TaskStatus::Running, progress, stage, message, None, None)
            .await;
    }

    async fn publish(
        &self,
        status: TaskStatus,
        progress: u8,
        stage: &str,
        message: String,
        result: Option<serde_json::Value>,
        error: Option<String>,
    ) {
        let clamped = self.last.fetch_max(progress, Ordering::SeqCst).max(progress);
        let update = StatusUpdate {
            task_id: self.task_id.to_string(),
            status,
            progress: clamped,
            stage: stage.to_string(),
            message,
            result,
            error,
        };
        if let Err(err) = self.reporter.update_task_status(&update).await {
            warn!(task_id = %self.task_id, error = %err, "status update failed");
        }
    }
}
