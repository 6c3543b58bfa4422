use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use ytbatch::classifier::{is_playlist, must_refresh_formats};
use ytbatch::error::Result;
use ytbatch::job::{parse_format_spec, read_url_list};
use ytbatch::playlist::expand_playlist;
use ytbatch::{
    BatchOutcome, CancellationToken, Config, DiscoveryOutcome, DownloadJob, Downloader,
    FormatDiscovery, JobQueue, LogEntry, Severity,
};

/// Exit code used when the user interrupts a batch.
const EXIT_CANCELLED: i32 = 130;

#[derive(Parser)]
#[command(name = "ytbatch", version, about = "Discover media formats and run download batches")]
struct Cli {
    /// JSON settings file; defaults are used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the output directory
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the formats offered by a URL (falls back to the last used URL)
    Formats { url: Option<String> },

    /// Show whether a URL is worth probing and whether it is a playlist
    Classify { url: String },

    /// Print the item URLs of a playlist
    Playlist { url: String },

    /// Download one or more URLs, sequentially
    Download {
        /// bestaudio, bestvideo, a format id, or <id>:mp3
        #[arg(short, long, default_value = "bestaudio")]
        format: String,

        /// CSV job file with columns url,format,title
        #[arg(long)]
        jobs: Option<PathBuf>,

        /// Text file with one URL per line
        #[arg(long)]
        input: Option<PathBuf>,

        /// Expand playlist URLs into their items
        #[arg(long)]
        playlist: bool,

        urls: Vec<String>,
    },
}

/// Main entry point for the application.
///
/// # Steps
/// 1. Initializes logging (`RUST_LOG`, default `info`)
/// 2. Runs the subcommand
/// 3. Maps the outcome to an exit code (130 when cancelled, 1 on error)
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match run_application(cli).await {
        Ok(BatchOutcome::Completed) => {}
        Ok(BatchOutcome::Cancelled) => std::process::exit(EXIT_CANCELLED),
        Err(e) => {
            error!("Application error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Loads the settings snapshot and dispatches the requested subcommand.
async fn run_application(cli: Cli) -> Result<BatchOutcome> {
    let config = load_config(&cli)?;

    match cli.command {
        Command::Classify { url } => {
            println!("must refresh formats: {}", must_refresh_formats(&url));
            println!("playlist:             {}", is_playlist(&url));
        }
        Command::Formats { url } => {
            let url = url
                .or_else(|| config.last_url.clone())
                .ok_or("no URL given and no last URL in the settings")?;
            list_formats(&config, &url).await?;
        }
        Command::Playlist { url } => {
            config.validate()?;
            for item in expand_playlist(&config, &url, &CancellationToken::new()).await {
                println!("{}", item);
            }
        }
        Command::Download {
            format,
            jobs,
            input,
            playlist,
            urls,
        } => {
            let queue = build_queue(&config, &format, jobs, input, playlist, urls).await?;
            return run_download(config, queue).await;
        }
    }
    Ok(BatchOutcome::Completed)
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(output) = &cli.output {
        config.output_dir = output.clone();
    }
    Ok(config.with_resolved_tools())
}

async fn list_formats(config: &Config, url: &str) -> Result<()> {
    config.validate()?;
    if !must_refresh_formats(url) {
        warn!(url, "URL is not a recognized media page, probing anyway");
    }

    let discovery = FormatDiscovery::new();
    match discovery.discover(config, url).await? {
        DiscoveryOutcome::Cancelled => println!("Discovery cancelled"),
        DiscoveryOutcome::Formats(formats) if formats.is_empty() => {
            println!("No formats found for {}", url)
        }
        DiscoveryOutcome::Formats(formats) => {
            let mut group = "";
            for format in &formats {
                if format.group_label() != group {
                    group = format.group_label();
                    println!("{}", group);
                }
                println!("  {:<10} {}", selector_for(format), format.display_name());
            }
        }
    }
    Ok(())
}

/// Selector text accepted back by `download --format`.
fn selector_for(format: &ytbatch::MediaFormat) -> String {
    if format.is_mp3_variant() {
        format!("{}:mp3", format.id)
    } else {
        format.id.clone()
    }
}

/// Collects jobs from the CSV file, URL list and positional arguments.
async fn build_queue(
    config: &Config,
    format: &str,
    jobs: Option<PathBuf>,
    input: Option<PathBuf>,
    expand: bool,
    mut urls: Vec<String>,
) -> Result<JobQueue> {
    let format = parse_format_spec(format)?;
    let mut queue = match jobs {
        Some(path) => JobQueue::from_csv_path(path)?,
        None => JobQueue::new(),
    };

    if let Some(path) = input {
        urls.extend(read_url_list(path).await?);
    }

    for url in urls {
        // a typo should fail before anything is downloaded
        url::Url::parse(&url)?;
        if expand && is_playlist(&url) {
            let items = expand_playlist(config, &url, &CancellationToken::new()).await;
            info!(url = %url, items = items.len(), "Queued playlist");
            queue.extend_from_playlist(items, &format);
        } else {
            queue.push(DownloadJob::new(url, format.clone()));
        }
    }

    Ok(queue)
}

/// Runs the queue as one batch with Ctrl+C wired to cancellation.
async fn run_download(config: Config, mut queue: JobQueue) -> Result<BatchOutcome> {
    if queue.is_empty() {
        println!("Nothing to download");
        return Ok(BatchOutcome::Completed);
    }
    config.validate()?;
    tokio::fs::create_dir_all(&config.output_dir).await?;

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Cancellation requested...");
            on_ctrl_c.cancel();
        }
    });

    println!("Found {} jobs to download", queue.len());
    let downloader = Downloader::new(config);
    let sink = |entry: LogEntry| match entry.severity {
        Severity::Error | Severity::Warning => eprintln!("[{}] {}", entry.severity, entry.text),
        Severity::Info | Severity::Success => println!("[{}] {}", entry.severity, entry.text),
    };

    let outcome = downloader
        .run_batch(queue.jobs_mut(), &sink, &cancel)
        .await;

    let removed = queue.remove_finished();
    println!("\nDownload Summary:");
    println!("Completed: {}", removed);
    for job in queue.iter() {
        println!("Left in queue [{}]: {}", job.status, job.url);
    }

    match &outcome {
        Ok(BatchOutcome::Completed) => println!("Batch finished"),
        Ok(BatchOutcome::Cancelled) => println!("Batch cancelled"),
        Err(e) => eprintln!("Batch aborted: {}", e),
    }
    outcome
}
