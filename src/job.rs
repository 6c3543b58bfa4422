use crate::error::{AppError, Result};
use crate::format::{MediaFormat, BEST_AUDIO_ID, BEST_VIDEO_ID, MP3_EXT};
use serde::Deserialize;
use std::fmt;
use std::io::Read;
use std::path::Path;

/// Titles that mean "not resolved yet" and trigger a title probe.
const PLACEHOLDER_TITLES: &[&str] = &["Extraction...", "Unknown", "Inconnu"];

/// Audio-only containers a user may name in a job file.
const AUDIO_CONTAINERS: &[&str] = &["m4a", "mp3", "opus", "aac", "ogg", "wav", "flac"];

/// Lifecycle of a queued job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Cancelled,
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobStatus::Pending => "Pending",
            JobStatus::Processing => "Processing",
            JobStatus::Completed => "Completed",
            JobStatus::Cancelled => "Cancelled",
            JobStatus::Failed => "Failed",
        };
        f.write_str(label)
    }
}

/// One requested download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    pub url: String,
    /// Resolved lazily by the batch executor when missing or a placeholder.
    pub title: Option<String>,
    pub format: MediaFormat,
    pub status: JobStatus,
}

impl DownloadJob {
    pub fn new(url: impl Into<String>, format: MediaFormat) -> Self {
        Self {
            url: url.into(),
            title: None,
            format,
            status: JobStatus::Pending,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// True when the title has to be fetched from the tool.
    pub fn needs_title(&self) -> bool {
        match self.title.as_deref().map(str::trim) {
            None => true,
            Some(t) => t.is_empty() || PLACEHOLDER_TITLES.contains(&t),
        }
    }
}

/// Ordered list of jobs waiting for a batch run.
#[derive(Debug, Clone, Default)]
pub struct JobQueue {
    jobs: Vec<DownloadJob>,
}

#[derive(Debug, Deserialize)]
struct JobRow {
    url: String,
    #[serde(default)]
    format: String,
    #[serde(default)]
    title: Option<String>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, job: DownloadJob) {
        self.jobs.push(job);
    }

    pub fn remove(&mut self, index: usize) -> Option<DownloadJob> {
        (index < self.jobs.len()).then(|| self.jobs.remove(index))
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DownloadJob> {
        self.jobs.iter()
    }

    pub fn jobs_mut(&mut self) -> &mut [DownloadJob] {
        &mut self.jobs
    }

    /// Drops every job a batch finished, keeping the rest in order.
    pub fn remove_finished(&mut self) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|j| j.status != JobStatus::Completed);
        before - self.jobs.len()
    }

    /// Queues every item of an expanded playlist with the same format.
    pub fn extend_from_playlist<I>(&mut self, urls: I, format: &MediaFormat)
    where
        I: IntoIterator<Item = String>,
    {
        self.jobs
            .extend(urls.into_iter().map(|url| DownloadJob::new(url, format.clone())));
    }

    /// Reads jobs from CSV rows `url,format,title` (header required).
    ///
    /// The format column accepts `bestaudio`, `bestvideo`, a format id, or
    /// `<id>:<ext>` such as `140:mp3`. An empty or missing column means best
    /// audio, and rows may stop after the URL.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);
        let headers = csv.headers()?.clone();

        let mut queue = Self::new();
        let mut record = csv::StringRecord::new();
        while csv.read_record(&mut record)? {
            // short rows would otherwise fail with UnexpectedEndOfRow
            while record.len() < headers.len() {
                record.push_field("");
            }
            let row: JobRow = record.deserialize(Some(&headers))?;
            if row.url.is_empty() {
                continue;
            }
            let mut job = DownloadJob::new(row.url, parse_format_spec(&row.format)?);
            job.title = row.title.filter(|t| !t.is_empty());
            queue.push(job);
        }
        Ok(queue)
    }

    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file)
    }
}

impl FromIterator<DownloadJob> for JobQueue {
    fn from_iter<T: IntoIterator<Item = DownloadJob>>(iter: T) -> Self {
        Self {
            jobs: iter.into_iter().collect(),
        }
    }
}

/// Turns a user-written format selector into an offer.
pub fn parse_format_spec(spec: &str) -> Result<MediaFormat> {
    let spec = spec.trim();
    match spec {
        "" | BEST_AUDIO_ID => return Ok(MediaFormat::best_audio()),
        BEST_VIDEO_ID => return Ok(MediaFormat::best_video()),
        _ => {}
    }

    let (id, ext) = spec.split_once(':').unwrap_or((spec, ""));
    if id.is_empty() {
        return Err(AppError::Custom(format!("invalid format selector '{}'", spec)));
    }
    let ext = ext.to_ascii_lowercase();
    let is_audio = AUDIO_CONTAINERS.contains(&ext.as_str());

    Ok(MediaFormat {
        id: id.to_string(),
        note: if ext == MP3_EXT {
            "Convert to MP3".to_string()
        } else {
            String::new()
        },
        ext,
        resolution: None,
        is_audio,
    })
}

/// Reads one URL per line, skipping blank lines.
pub async fn read_url_list(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}
