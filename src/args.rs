//! Typed argument lists for the probe/downloader tool.
//!
//! Every invocation is assembled as an ordered list of argv tokens. Values
//! are separate entries, so paths and URLs never need shell quoting.

use crate::config::Config;
use crate::format::MediaFormat;
use std::ffi::OsString;
use std::fmt;
use std::path::Path;

/// Retry count handed to the tool for connections and fragments.
pub const PROBE_RETRIES: u32 = 10;

/// Extension placeholder the tool substitutes with the real container.
pub const NATIVE_EXT_TEMPLATE: &str = "%(ext)s";

/// Ordered argv for one tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolArgs {
    tokens: Vec<OsString>,
}

impl ToolArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flag(mut self, name: &str) -> Self {
        self.tokens.push(name.into());
        self
    }

    pub fn flag_if(self, enabled: bool, name: &str) -> Self {
        if enabled {
            self.flag(name)
        } else {
            self
        }
    }

    pub fn option(mut self, name: &str, value: impl Into<OsString>) -> Self {
        self.tokens.push(name.into());
        self.tokens.push(value.into());
        self
    }

    pub fn option_if<V: Into<OsString>>(self, name: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.option(name, v),
            None => self,
        }
    }

    /// The positional URL. Always the last token.
    pub fn url(mut self, url: &str) -> Self {
        self.tokens.push(url.into());
        self
    }

    pub fn tokens(&self) -> &[OsString] {
        &self.tokens
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    /// Value following `name`, if present.
    pub fn value_of(&self, name: &str) -> Option<&OsString> {
        self.tokens
            .iter()
            .position(|t| t == name)
            .and_then(|i| self.tokens.get(i + 1))
    }

    /// `-F`: list every format of a single item.
    pub fn list_formats(config: &Config, url: &str) -> Self {
        Self::new()
            .option("--retries", PROBE_RETRIES.to_string())
            .option("--fragment-retries", PROBE_RETRIES.to_string())
            .option("--js-runtimes", config.js_runtime())
            .flag("--no-playlist")
            .flag("-F")
            .url(url)
    }

    /// `--get-title`: print only the item title.
    pub fn get_title(config: &Config, url: &str) -> Self {
        Self::new()
            .option("--js-runtimes", config.js_runtime())
            .flag("--no-playlist")
            .flag("--get-title")
            .url(url)
    }

    /// Flat playlist listing, one item URL per line.
    pub fn expand_playlist(config: &Config, url: &str) -> Self {
        Self::new()
            .flag("--flat-playlist")
            .flag("--get-url")
            .flag("--yes-playlist")
            .option("--js-runtimes", config.js_runtime())
            .url(url)
    }

    /// Full download of one job.
    ///
    /// The format selector and conversion flags depend on the kind of offer,
    /// see [`FormatPolicy`].
    pub fn download(config: &Config, format: &MediaFormat, output_template: &Path, url: &str) -> Self {
        let mut args = Self::new();
        for token in FormatPolicy::for_format(format).selector_tokens(format) {
            args.tokens.push(token.into());
        }
        args.option("-o", output_template.as_os_str())
            .flag_if(config.add_metadata, "--add-metadata")
            .flag("--no-playlist")
            .option("--js-runtimes", config.js_runtime())
            .option_if("--ffmpeg-location", config.ffmpeg_path.as_deref().map(Path::as_os_str))
            .url(url)
    }
}

impl fmt::Display for ToolArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            let token = token.to_string_lossy();
            if token.is_empty() || token.contains(char::is_whitespace) {
                write!(f, "\"{}\"", token)?;
            } else {
                f.write_str(&token)?;
            }
        }
        Ok(())
    }
}

/// How a selected offer maps onto tool arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatPolicy {
    /// Best audio, extracted and converted to mp3.
    BestAudio,
    /// Best video plus best audio, merged into mp4.
    BestVideo,
    /// A specific format id, converted to mp3 afterwards.
    ConvertToMp3,
    /// A specific format id, kept as-is.
    Verbatim,
}

impl FormatPolicy {
    pub fn for_format(format: &MediaFormat) -> Self {
        if format.is_best_audio() {
            Self::BestAudio
        } else if format.is_best_video() {
            Self::BestVideo
        } else if format.is_mp3_variant() {
            Self::ConvertToMp3
        } else {
            Self::Verbatim
        }
    }

    fn selector_tokens(self, format: &MediaFormat) -> Vec<String> {
        let owned = |s: &[&str]| s.iter().map(|t| t.to_string()).collect::<Vec<_>>();
        match self {
            Self::BestAudio => owned(&["-f", "bestaudio/best", "-x", "--audio-format", "mp3"]),
            Self::BestVideo => owned(&[
                "-f",
                "bestvideo+bestaudio/best",
                "--merge-output-format",
                "mp4",
            ]),
            Self::ConvertToMp3 => vec![
                "-f".to_string(),
                format.id.clone(),
                "-x".to_string(),
                "--audio-format".to_string(),
                "mp3".to_string(),
            ],
            Self::Verbatim => vec!["-f".to_string(), format.id.clone()],
        }
    }
}
