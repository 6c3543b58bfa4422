/// Format discovery and batch downloading on top of an external media tool.
///
/// This library drives a yt-dlp style probe/downloader: it lists the formats
/// a URL offers (intersected across playlist items), expands playlists into
/// item URLs, and runs a cancellable, strictly sequential batch of downloads
/// while streaming classified log lines to the caller.
///
/// # Architecture
///
/// The library is structured into several key components:
/// - `classifier`: Pure URL checks (worth probing? a playlist?)
/// - `process`: Scoped, cancellable launching of the external tool
/// - `parser`: Format table parsing and cross-item intersection
/// - `FormatDiscovery`: Single-flight format probing
/// - `Downloader`: Sequential batch execution
/// - `playlist`: Playlist expansion
///
/// # Example
/// ```no_run
/// use ytbatch::{Config, DiscoveryOutcome, FormatDiscovery};
///
/// async fn example() {
///     let config = Config::default();
///     let discovery = FormatDiscovery::new();
///     match discovery.discover(&config, "https://youtu.be/dQw4w9WgXcQ").await {
///         Ok(DiscoveryOutcome::Formats(formats)) => println!("{} offers", formats.len()),
///         Ok(DiscoveryOutcome::Cancelled) => println!("superseded"),
///         Err(e) => eprintln!("probe failed: {e}"),
///     }
/// }
/// ```
pub mod args;
pub mod classifier;
pub mod config;
pub mod discovery;
pub mod downloader;
pub mod error;
pub mod format;
pub mod job;
pub mod parser;
pub mod playlist;
pub mod process;
pub mod progress;
pub mod sanitize;

// Re-export commonly used items
pub use config::Config;
pub use discovery::{DiscoveryOutcome, FormatDiscovery};
pub use downloader::{BatchOutcome, Downloader};
pub use error::AppError;
pub use format::MediaFormat;
pub use job::{DownloadJob, JobQueue, JobStatus};
pub use progress::{BatchSummary, LogEntry, LogSink, Severity};
pub use tokio_util::sync::CancellationToken;
