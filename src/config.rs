use crate::error::{AppError, Result};
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};

/// Configuration management for the application.
///
/// The settings are owned by whoever embeds the library (a settings
/// screen, a JSON file, CLI flags). Every discovery, playlist and batch
/// call receives a `Config` snapshot explicitly; nothing in the crate
/// holds on to a live, mutable settings object.

/// Read-only settings snapshot consumed by the probe/download pipeline.
///
/// # Examples
///
/// ```
/// use ytbatch::Config;
///
/// let config = Config::default();
/// assert!(config.add_metadata);
/// assert!(config.sanitize_filenames);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Probe/downloader executable (yt-dlp).
    pub ytdlp_path: PathBuf,
    /// Converter executable (ffmpeg), passed as `--ffmpeg-location` when set.
    pub ffmpeg_path: Option<PathBuf>,
    /// Script runtime required by the probe tool (deno).
    pub deno_path: PathBuf,
    pub output_dir: PathBuf,
    pub add_metadata: bool,
    pub sanitize_filenames: bool,
    pub last_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ytdlp_path: PathBuf::from("yt-dlp"),
            ffmpeg_path: None,
            deno_path: PathBuf::from("deno"),
            output_dir: PathBuf::from("output"),
            add_metadata: true,
            sanitize_filenames: true,
            last_url: None,
        }
    }
}

impl Config {
    /// Loads a configuration snapshot from a JSON file.
    ///
    /// Keys missing from the document keep their default values.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Checks that the configured executables and output directory are usable.
    ///
    /// Executables may be absolute paths or bare names found on `PATH`. The
    /// output directory may not exist yet, since batch runs create it, but
    /// it must not name a regular file.
    ///
    /// # Errors
    /// Returns `AppError::Config` naming the first setting that is
    /// missing or points nowhere.
    pub fn validate(&self) -> Result<()> {
        require_tool("ytdlp_path", &self.ytdlp_path)?;
        require_tool("deno_path", &self.deno_path)?;
        if let Some(ffmpeg) = &self.ffmpeg_path {
            require_tool("ffmpeg_path", ffmpeg)?;
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(AppError::Config("output_dir is not set".into()));
        }
        if self.output_dir.exists() && !self.output_dir.is_dir() {
            return Err(AppError::Config(format!(
                "output_dir {} is not a directory",
                self.output_dir.display()
            )));
        }
        Ok(())
    }

    /// Replaces bare executable names with the full path found on `PATH`.
    ///
    /// Names that cannot be found are left as they are, so `validate`
    /// still reports them.
    pub fn with_resolved_tools(mut self) -> Self {
        self.ytdlp_path = resolve_tool(self.ytdlp_path);
        self.deno_path = resolve_tool(self.deno_path);
        self.ffmpeg_path = self.ffmpeg_path.map(resolve_tool);
        self
    }

    /// Script-runtime argument value expected by `--js-runtimes`.
    pub fn js_runtime(&self) -> String {
        format!("deno:{}", self.deno_path.display())
    }
}

fn is_bare_name(path: &Path) -> bool {
    let mut components = path.components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn resolve_tool(path: PathBuf) -> PathBuf {
    if !is_bare_name(&path) || path.is_file() {
        return path;
    }
    which::which(&path).unwrap_or(path)
}

fn require_tool(name: &str, path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(AppError::Config(format!("{} is not set", name)));
    }
    if path.is_file() || (is_bare_name(path) && which::which(path).is_ok()) {
        return Ok(());
    }
    Err(AppError::Config(format!(
        "{} {} does not exist",
        name,
        path.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn partial_json_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config.json");
        fs::write(&file, r#"{ "ytdlp_path": "/usr/bin/yt-dlp", "add_metadata": false }"#).unwrap();

        let config = Config::from_file(&file).unwrap();
        assert_eq!(config.ytdlp_path, PathBuf::from("/usr/bin/yt-dlp"));
        assert!(!config.add_metadata);
        assert!(config.sanitize_filenames);
        assert_eq!(config.deno_path, PathBuf::from("deno"));
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = Config::from_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn validate_reports_first_missing_tool() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            ytdlp_path: dir.path().join("yt-dlp"),
            output_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ytdlp_path"));
    }

    #[test]
    fn validate_accepts_existing_paths() {
        let dir = tempfile::tempdir().unwrap();
        let ytdlp = dir.path().join("yt-dlp");
        let deno = dir.path().join("deno");
        fs::write(&ytdlp, "").unwrap();
        fs::write(&deno, "").unwrap();

        let config = Config {
            ytdlp_path: ytdlp,
            deno_path: deno,
            output_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_accepts_output_dir_created_later() {
        let dir = tempfile::tempdir().unwrap();
        let ytdlp = dir.path().join("yt-dlp");
        let deno = dir.path().join("deno");
        fs::write(&ytdlp, "").unwrap();
        fs::write(&deno, "").unwrap();

        let config = Config {
            ytdlp_path: ytdlp,
            deno_path: deno.clone(),
            output_dir: dir.path().join("not_yet_created"),
            ..Config::default()
        };
        assert!(config.validate().is_ok());

        let config = Config {
            output_dir: deno,
            ..config
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }

    #[cfg(unix)]
    #[test]
    fn bare_tool_names_resolve_through_path() {
        let config = Config {
            ytdlp_path: PathBuf::from("sh"),
            deno_path: PathBuf::from("sh"),
            ..Config::default()
        };
        assert!(config.validate().is_ok());

        let resolved = config.with_resolved_tools();
        assert!(resolved.ytdlp_path.is_absolute());
        assert!(resolved.deno_path.is_file());
    }

    #[test]
    fn unknown_bare_names_stay_and_fail_validation() {
        let config = Config {
            ytdlp_path: PathBuf::from("definitely-not-a-real-tool-name"),
            ..Config::default()
        }
        .with_resolved_tools();
        assert_eq!(config.ytdlp_path, PathBuf::from("definitely-not-a-real-tool-name"));
        assert!(config.validate().unwrap_err().to_string().contains("ytdlp_path"));
    }

    #[test]
    fn js_runtime_argument() {
        let config = Config {
            deno_path: PathBuf::from("/opt/deno"),
            ..Config::default()
        };
        assert_eq!(config.js_runtime(), "deno:/opt/deno");
    }
}
