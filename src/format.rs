use serde::{Deserialize, Serialize};
use std::fmt;

/// Format id of the synthetic "best audio" offer.
pub const BEST_AUDIO_ID: &str = "bestaudio";
/// Format id of the synthetic "best video" offer.
pub const BEST_VIDEO_ID: &str = "bestvideo";
/// Resolution literal the probe tool prints for audio-only streams.
pub const AUDIO_ONLY: &str = "audio only";
/// Container of the derived convert-to-mp3 offers.
pub const MP3_EXT: &str = "mp3";

/// One selectable media offer: a container/resolution/role combination
/// the user can queue for download.
///
/// Parsed offers carry the probe tool's opaque format id. Two of them are
/// the same offer when both `id` and `ext` match, which keeps a native
/// audio container and its derived mp3 variant apart. The two sentinel
/// offers ([`MediaFormat::best_audio`], [`MediaFormat::best_video`]) never
/// compare equal to parsed ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFormat {
    pub id: String,
    pub ext: String,
    /// `WIDTHxHEIGHT`, `"audio only"`, or `None` for sentinels.
    pub resolution: Option<String>,
    pub note: String,
    pub is_audio: bool,
}

impl MediaFormat {
    /// Synthetic "best audio" offer: extract the best audio stream as mp3.
    pub fn best_audio() -> Self {
        Self {
            id: BEST_AUDIO_ID.to_string(),
            ext: "Best Audio".to_string(),
            resolution: None,
            note: "Best Audio".to_string(),
            is_audio: true,
        }
    }

    /// Synthetic "best video" offer: best video plus best audio, merged to mp4.
    pub fn best_video() -> Self {
        Self {
            id: BEST_VIDEO_ID.to_string(),
            ext: "Best Video".to_string(),
            resolution: None,
            note: "Best Video".to_string(),
            is_audio: false,
        }
    }

    pub fn is_best_audio(&self) -> bool {
        self.id == BEST_AUDIO_ID && self.resolution.is_none()
    }

    pub fn is_best_video(&self) -> bool {
        self.id == BEST_VIDEO_ID && self.resolution.is_none()
    }

    pub fn is_sentinel(&self) -> bool {
        self.is_best_audio() || self.is_best_video()
    }

    /// True for a derived "convert to mp3" offer built from a parsed audio format.
    pub fn is_mp3_variant(&self) -> bool {
        !self.is_sentinel() && self.ext.eq_ignore_ascii_case(MP3_EXT)
    }

    /// Identity used for deduplication and cross-item intersection.
    pub fn same_offer(&self, other: &MediaFormat) -> bool {
        if self.is_sentinel() || other.is_sentinel() {
            return false;
        }
        self.id == other.id && self.ext == other.ext
    }

    /// Group label used to split the list into audio and video sections.
    pub fn group_label(&self) -> &'static str {
        if self.is_audio {
            "AUDIO"
        } else {
            "VIDEO"
        }
    }

    /// Short container/resolution label, e.g. `Video - 1920x1080 mp4`.
    pub fn format_label(&self) -> String {
        if self.is_audio {
            format!("Audio - {}", self.ext)
        } else {
            format!(
                "Video - {} {}",
                self.resolution.as_deref().unwrap_or_default(),
                self.ext
            )
        }
    }

    /// The note with every whitespace run collapsed to a single space.
    pub fn description(&self) -> String {
        self.note.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Human readable summary shown in format pickers.
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.format_label(), self.description())
    }

    /// Pixel count parsed from a `WIDTHxHEIGHT` resolution, 0 otherwise.
    pub(crate) fn pixel_area(&self) -> u64 {
        self.resolution
            .as_deref()
            .and_then(|r| r.split_once('x'))
            .and_then(|(w, h)| w.parse::<u64>().ok()?.checked_mul(h.parse::<u64>().ok()?))
            .unwrap_or(0)
    }
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(id: &str, ext: &str, resolution: &str, is_audio: bool) -> MediaFormat {
        MediaFormat {
            id: id.into(),
            ext: ext.into(),
            resolution: Some(resolution.into()),
            note: "  avc1   30fps ".into(),
            is_audio,
        }
    }

    #[test]
    fn sentinels_are_recognized() {
        assert!(MediaFormat::best_audio().is_best_audio());
        assert!(MediaFormat::best_video().is_best_video());
        assert!(MediaFormat::best_audio().is_sentinel());
        assert!(!MediaFormat::best_audio().is_mp3_variant());
    }

    #[test]
    fn sentinels_never_match_parsed_offers() {
        let fake = MediaFormat {
            id: BEST_AUDIO_ID.into(),
            ext: "Best Audio".into(),
            resolution: None,
            note: String::new(),
            is_audio: true,
        };
        assert!(!fake.same_offer(&MediaFormat::best_audio()));
    }

    #[test]
    fn offer_identity_uses_id_and_ext() {
        let native = parsed("140", "m4a", AUDIO_ONLY, true);
        let mp3 = parsed("140", "mp3", AUDIO_ONLY, true);
        let other_note = MediaFormat {
            note: "different".into(),
            ..native.clone()
        };
        assert!(!native.same_offer(&mp3));
        assert!(native.same_offer(&other_note));
        assert!(mp3.is_mp3_variant());
    }

    #[test]
    fn labels() {
        let video = parsed("137", "mp4", "1920x1080", false);
        assert_eq!(video.group_label(), "VIDEO");
        assert_eq!(video.format_label(), "Video - 1920x1080 mp4");
        assert_eq!(video.description(), "avc1 30fps");
        assert_eq!(video.display_name(), "Video - 1920x1080 mp4 (avc1 30fps)");

        let audio = parsed("140", "m4a", AUDIO_ONLY, true);
        assert_eq!(audio.group_label(), "AUDIO");
        assert_eq!(audio.format_label(), "Audio - m4a");
    }

    #[test]
    fn pixel_area_handles_non_numeric() {
        assert_eq!(parsed("1", "mp4", "640x360", false).pixel_area(), 230_400);
        assert_eq!(parsed("1", "m4a", AUDIO_ONLY, true).pixel_area(), 0);
        assert_eq!(MediaFormat::best_video().pixel_area(), 0);
    }

    #[test]
    fn pixel_area_of_huge_resolution_is_zero() {
        assert_eq!(parsed("1", "mp4", "99999999999x99999999999", false).pixel_area(), 0);
        assert_eq!(parsed("1", "mp4", "999999999999999999999x2", false).pixel_area(), 0);
    }
}
