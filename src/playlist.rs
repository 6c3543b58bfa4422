use crate::args::ToolArgs;
use crate::config::Config;
use crate::process::{run_captured, ToolCommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Flattens a collection URL into its item URLs.
///
/// The tool is run in flat-listing mode, so nothing is downloaded. Only
/// lines that start with an http(s) scheme are kept.
///
/// Any failure (tool missing, non-zero exit, cancellation) degrades to
/// an empty list, meaning "nothing to expand".
#[instrument(skip(config, cancel))]
pub async fn expand_playlist(config: &Config, url: &str, cancel: &CancellationToken) -> Vec<String> {
    let cmd = ToolCommand::new(&config.ytdlp_path, ToolArgs::expand_playlist(config, url));

    let output = match run_captured(&cmd, cancel).await {
        Ok(Some(output)) => output,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!(error = %e, "Playlist expansion failed");
            return Vec::new();
        }
    };

    if !output.success() {
        warn!(status = %output.status, "Playlist listing exited with failure");
    }

    let urls = item_urls(&output.stdout);
    info!(count = urls.len(), "Expanded playlist");
    urls
}

/// Keeps the trimmed lines that look like http(s) URLs.
pub fn item_urls(listing: &str) -> Vec<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with("http://") || l.starts_with("https://"))
        .map(str::to_string)
        .collect()
}
