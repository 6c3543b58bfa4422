use crate::args::ToolArgs;
use crate::config::Config;
use crate::error::Result;
use crate::format::MediaFormat;
use crate::parser::parse_format_listing;
use crate::process::{run_captured, ToolCommand};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Result of a discovery call that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    /// The probe ran to completion. May be empty when the tool printed no table.
    Formats(Vec<MediaFormat>),
    /// A newer request (or an explicit [`FormatDiscovery::cancel`]) superseded this one.
    Cancelled,
}

impl DiscoveryOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DiscoveryOutcome::Cancelled)
    }

    pub fn formats(&self) -> Option<&[MediaFormat]> {
        match self {
            DiscoveryOutcome::Formats(formats) => Some(formats),
            DiscoveryOutcome::Cancelled => None,
        }
    }
}

/// Single-flight format discovery.
///
/// At most one probe runs at a time. Starting a new discovery cancels the
/// one in flight (last request wins) instead of queueing behind it.
///
/// # Fields
/// * `current` - Slot holding the in-flight request, if any
/// * `generation` - Monotonic request counter used to match slot owners
#[derive(Debug, Default)]
pub struct FormatDiscovery {
    current: Mutex<Option<InFlight>>,
    generation: AtomicU64,
}

#[derive(Debug)]
struct InFlight {
    generation: u64,
    token: CancellationToken,
}

impl FormatDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lists the formats available for `url`.
    ///
    /// # Returns
    /// * `Ok(Formats(..))` - probe finished; the list may be empty
    /// * `Ok(Cancelled)` - superseded before it finished
    ///
    /// # Errors
    /// * `AppError::ProbeLaunch` if the probe tool cannot be started
    #[instrument(skip(self, config))]
    pub async fn discover(&self, config: &Config, url: &str) -> Result<DiscoveryOutcome> {
        let request = self.begin();
        let cmd = ToolCommand::new(&config.ytdlp_path, ToolArgs::list_formats(config, url));

        let output = run_captured(&cmd, &request.token).await?;

        let Some(output) = output else {
            debug!(generation = request.generation, "Discovery cancelled");
            return Ok(DiscoveryOutcome::Cancelled);
        };
        // finished, but a newer request already took over
        if request.token.is_cancelled() {
            return Ok(DiscoveryOutcome::Cancelled);
        }

        if !output.success() {
            warn!(status = %output.status, stderr = %output.stderr.trim(), "Probe exited with failure");
        }

        let formats = parse_format_listing(&output.stdout);
        info!(count = formats.len(), "Discovered formats");
        Ok(DiscoveryOutcome::Formats(formats))
    }

    /// Cancels the in-flight discovery, if any.
    pub fn cancel(&self) {
        if let Some(previous) = self.slot().take() {
            previous.token.cancel();
        }
    }

    /// True while a discovery is running.
    pub fn is_busy(&self) -> bool {
        self.slot().is_some()
    }

    /// Cancels whatever is in flight and installs a fresh request, under
    /// one lock so two callers can never both believe they own the slot.
    fn begin(&self) -> RequestGuard<'_> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();

        let mut slot = self.slot();
        if let Some(previous) = slot.replace(InFlight {
            generation,
            token: token.clone(),
        }) {
            debug!(superseded = previous.generation, generation, "Cancelling previous discovery");
            previous.token.cancel();
        }

        RequestGuard {
            owner: self,
            generation,
            token,
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<InFlight>> {
        // the slot stays consistent even if a holder panicked
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// RAII registration of one discovery request.
///
/// Releases the slot on drop, unless a newer request already replaced it.
struct RequestGuard<'a> {
    owner: &'a FormatDiscovery,
    generation: u64,
    token: CancellationToken,
}

impl Drop for RequestGuard<'_> {
    fn drop(&mut self) {
        let mut slot = self.owner.slot();
        if slot.as_ref().map(|f| f.generation) == Some(self.generation) {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_request_cancels_previous() {
        let discovery = FormatDiscovery::new();
        let first = discovery.begin();
        let second = discovery.begin();

        assert!(first.token.is_cancelled());
        assert!(!second.token.is_cancelled());
        assert!(second.generation > first.generation);
    }

    #[test]
    fn stale_guard_does_not_release_newer_request() {
        let discovery = FormatDiscovery::new();
        let first = discovery.begin();
        let second = discovery.begin();

        drop(first);
        assert!(discovery.is_busy());

        drop(second);
        assert!(!discovery.is_busy());
    }

    #[test]
    fn explicit_cancel_clears_slot() {
        let discovery = FormatDiscovery::new();
        let request = discovery.begin();
        discovery.cancel();
        assert!(request.token.is_cancelled());
        assert!(!discovery.is_busy());
    }

    #[test]
    fn outcome_accessors() {
        assert!(DiscoveryOutcome::Cancelled.is_cancelled());
        assert!(DiscoveryOutcome::Cancelled.formats().is_none());
        assert_eq!(DiscoveryOutcome::Formats(vec![]).formats(), Some(&[][..]));
    }
}
