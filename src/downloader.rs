use crate::args::{ToolArgs, NATIVE_EXT_TEMPLATE};
use crate::config::Config;
use crate::error::Result;
use crate::job::{DownloadJob, JobStatus};
use crate::process::{run_captured, run_streaming, RunOutcome, ToolCommand};
use crate::progress::{classify_stderr_line, BatchSummary, LogEntry, LogSink};
use crate::sanitize::sanitize_for_filename;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Terminal state of a batch that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every job ran.
    Completed,
    /// The caller cancelled; the remaining jobs were not started.
    Cancelled,
}

/// How a single job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobOutcome {
    Completed,
    ToolFailed,
    Cancelled,
}

/// Sequential batch downloader driving the external tool.
///
/// Jobs run strictly one after another. Each one streams the tool's output
/// into the caller's [`LogSink`], and a cancelled job cancels the rest of
/// the batch.
///
/// # Fields
/// * `config` - Settings snapshot taken when the batch was set up
pub struct Downloader {
    config: Arc<Config>,
}

impl Downloader {
    /// Creates a new `Downloader` bound to one settings snapshot
    ///
    /// # Arguments
    /// * `config` - Settings to use for every job of the batch
    pub fn new(config: impl Into<Arc<Config>>) -> Self {
        Self {
            config: config.into(),
        }
    }

    /// Runs `jobs` in order, updating each job's title and status.
    ///
    /// # Returns
    /// * `Ok(Completed)` - every job was attempted
    /// * `Ok(Cancelled)` - `cancel` fired; the job in flight was killed and
    ///   the following ones never started
    ///
    /// # Errors
    /// Any other failure (tool cannot be started, pipe failure) aborts the
    /// batch. It is logged at error severity before being returned.
    #[instrument(skip_all, fields(jobs = jobs.len()))]
    pub async fn run_batch(
        &self,
        jobs: &mut [DownloadJob],
        sink: &dyn LogSink,
        cancel: &CancellationToken,
    ) -> Result<BatchOutcome> {
        let mut summary = BatchSummary::new(jobs.len());

        for job in jobs.iter_mut() {
            if cancel.is_cancelled() {
                info!(remaining = summary.remaining(), "Batch cancelled before next job");
                return Ok(BatchOutcome::Cancelled);
            }

            job.status = JobStatus::Processing;
            match self.process_job(job, sink, cancel).await {
                Ok(JobOutcome::Completed) => {
                    job.status = JobStatus::Completed;
                    summary.record_completed();
                }
                Ok(JobOutcome::ToolFailed) => {
                    job.status = JobStatus::Failed;
                    summary.record_completed();
                }
                Ok(JobOutcome::Cancelled) => {
                    job.status = JobStatus::Cancelled;
                    return Ok(BatchOutcome::Cancelled);
                }
                Err(e) => {
                    job.status = JobStatus::Failed;
                    error!(url = %job.url, error = %e, "Batch aborted");
                    sink.log(LogEntry::error(format!("Fatal error: {}", e)));
                    return Err(e);
                }
            }
        }

        info!(
            completed = summary.completed,
            elapsed_secs = summary.elapsed().as_secs_f64(),
            "Batch finished"
        );
        Ok(BatchOutcome::Completed)
    }

    /// Downloads a single job
    ///
    /// # Details
    /// 1. Resolves the title if the job only carries a placeholder
    /// 2. Builds the output template from the (sanitized) title
    /// 3. Picks tool arguments from the selected offer
    /// 4. Streams the tool's output until it exits or is cancelled
    async fn process_job(
        &self,
        job: &mut DownloadJob,
        sink: &dyn LogSink,
        cancel: &CancellationToken,
    ) -> Result<JobOutcome> {
        sink.log(LogEntry::info(format!("--- Processing: {} ---", job.url)));

        if job.needs_title() {
            sink.log(LogEntry::info("Resolving title..."));
            let title = self.resolve_title(&job.url, cancel).await;
            if cancel.is_cancelled() {
                warn!(url = %job.url, "Cancelled while resolving title");
                sink.log(LogEntry::warning("Process cancelled by user."));
                return Ok(JobOutcome::Cancelled);
            }
            job.title = Some(title);
        }
        let raw_title = job.title.clone().unwrap_or_default();
        let file_stem = if self.config.sanitize_filenames {
            sanitize_for_filename(&raw_title)
        } else {
            raw_title
        };

        let output_template = self.output_template(&file_stem);
        sink.log(LogEntry::info(format!("Target file: {}", file_stem)));

        let args = ToolArgs::download(&self.config, &job.format, &output_template, &job.url);
        let cmd = ToolCommand::new(&self.config.ytdlp_path, args);

        let outcome = run_streaming(
            &cmd,
            cancel,
            |line| {
                if !line.trim().is_empty() {
                    sink.log(LogEntry::info(line));
                }
            },
            |line| {
                if let Some(severity) = classify_stderr_line(&line) {
                    sink.log(LogEntry::new(line, severity));
                }
            },
        )
        .await?;

        match outcome {
            RunOutcome::Cancelled => {
                warn!(url = %job.url, "Download cancelled");
                sink.log(LogEntry::warning("Process cancelled by user."));
                Ok(JobOutcome::Cancelled)
            }
            RunOutcome::Exited(status) if status.success() => {
                sink.log(LogEntry::success("Download completed successfully."));
                Ok(JobOutcome::Completed)
            }
            RunOutcome::Exited(status) => {
                warn!(url = %job.url, %status, "Tool reported failure");
                sink.log(LogEntry::error(format!("Download failed ({}).", status)));
                Ok(JobOutcome::ToolFailed)
            }
        }
    }

    /// Asks the tool for the item title, falling back to a synthetic one.
    ///
    /// Never fails: any probe problem yields [`fallback_title`].
    pub async fn resolve_title(&self, url: &str, cancel: &CancellationToken) -> String {
        let cmd = ToolCommand::new(&self.config.ytdlp_path, ToolArgs::get_title(&self.config, url));

        match run_captured(&cmd, cancel).await {
            Ok(Some(output)) => {
                let title = output.stdout.lines().map(str::trim).find(|l| !l.is_empty());
                match title {
                    Some(title) if output.success() => return title.to_string(),
                    _ => debug!(status = %output.status, "Title probe returned nothing"),
                }
            }
            Ok(None) => debug!("Title probe cancelled"),
            Err(e) => debug!(error = %e, "Title probe failed"),
        }

        fallback_title()
    }

    fn output_template(&self, file_stem: &str) -> PathBuf {
        self.config
            .output_dir
            .join(format!("{}.{}", file_stem, NATIVE_EXT_TEMPLATE))
    }
}

/// Synthetic title used when the tool cannot tell us the real one.
pub fn fallback_title() -> String {
    format!("media_extracted_{}", chrono::Local::now().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_titles_are_tagged() {
        let title = fallback_title();
        assert!(title.starts_with("media_extracted_"));
        assert!(title["media_extracted_".len()..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn output_template_uses_native_extension() {
        let downloader = Downloader::new(Config {
            output_dir: PathBuf::from("/media/out"),
            ..Config::default()
        });
        assert_eq!(
            downloader.output_template("Song"),
            PathBuf::from("/media/out/Song.%(ext)s")
        );
    }

    #[tokio::test]
    async fn already_cancelled_batch_starts_nothing() {
        let downloader = Downloader::new(Config::default());
        let mut jobs = vec![DownloadJob::new("https://a", crate::MediaFormat::best_audio())];
        let token = CancellationToken::new();
        token.cancel();

        let sink = |_entry: LogEntry| {};
        let outcome = downloader.run_batch(&mut jobs, &sink, &token).await.unwrap();
        assert_eq!(outcome, BatchOutcome::Cancelled);
        assert_eq!(jobs[0].status, JobStatus::Pending);
    }
}
