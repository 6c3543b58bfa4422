//! Format table parsing.
//!
//! The probe tool prints one table per item when asked to list formats:
//!
//! ```text
//! [info] Available formats for dQw4w9WgXcQ:
//! ID  EXT   RESOLUTION FPS │   FILESIZE   TBR PROTO │ VCODEC  ACODEC
//! ───────────────────────────────────────────────────────────────────
//! 140 m4a   audio only     │    3.27MiB  129k https │ audio only mp4a.40.2
//! 137 mp4   1920x1080   25 │   77.12MiB 3055k https │ avc1.640028 video only
//! ```
//!
//! A playlist produces several such blocks. Only offers present in every
//! block survive, so whatever the user picks can be applied to each item.

use crate::format::{MediaFormat, AUDIO_ONLY, MP3_EXT};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;

/// Phrase that introduces each per-item table.
pub const BLOCK_MARKER: &str = "Available formats for";

/// `<id> <ext> <WIDTHxHEIGHT | audio only> <note...>`
static FORMAT_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\S+)\s+(\w+)\s+(\d+x\d+|audio only)(?:\s+(.*))?$")
        .expect("format line pattern is valid")
});

/// Parses raw probe-tool output into the ordered offer list shown to users.
///
/// Returns an empty list when the output holds no table at all. Otherwise
/// the list is: best-audio sentinel, shared audio offers, best-video
/// sentinel, shared video offers.
pub fn parse_format_listing(raw: &str) -> Vec<MediaFormat> {
    let blocks: Vec<&str> = raw.split(BLOCK_MARKER).skip(1).collect();
    if blocks.is_empty() {
        return Vec::new();
    }

    let mut common: Option<Vec<MediaFormat>> = None;
    for block in blocks {
        let formats = parse_block(block);
        // An item without a table (unavailable, geo-blocked) must not
        // empty the whole playlist.
        if formats.is_empty() {
            continue;
        }
        common = Some(match common {
            None => formats,
            Some(acc) => intersect(acc, &formats),
        });
    }

    let Some(common) = common else {
        return Vec::new();
    };

    let (mut audio, mut video): (Vec<_>, Vec<_>) = common.into_iter().partition(|f| f.is_audio);
    audio.sort_by(by_resolution_then_container);
    video.sort_by(by_resolution_then_container);

    let mut result = Vec::with_capacity(audio.len() + video.len() + 2);
    result.push(MediaFormat::best_audio());
    result.extend(audio);
    result.push(MediaFormat::best_video());
    result.extend(video);
    result
}

/// Parses one item's table, including the derived mp3 offers.
pub fn parse_block(block: &str) -> Vec<MediaFormat> {
    let mut formats: Vec<MediaFormat> = Vec::new();

    for line in block.lines() {
        let trimmed = line.trim();
        if !formats.is_empty() && (trimmed.is_empty() || line.starts_with('[')) {
            break;
        }
        if is_header_or_rule(line) || trimmed.starts_with("sb") {
            continue;
        }
        let Some(format) = parse_line(line) else {
            continue;
        };

        let derived = format.is_audio.then(|| mp3_variant(&format));
        push_unique(&mut formats, format);
        if let Some(derived) = derived {
            push_unique(&mut formats, derived);
        }
    }

    formats
}

/// Keeps the offers of `acc` that also appear in `other`.
pub fn intersect(acc: Vec<MediaFormat>, other: &[MediaFormat]) -> Vec<MediaFormat> {
    acc.into_iter()
        .filter(|f| other.iter().any(|o| o.same_offer(f)))
        .collect()
}

fn parse_line(line: &str) -> Option<MediaFormat> {
    let caps = FORMAT_LINE_RE.captures(line)?;
    let id = caps.get(1)?.as_str();
    let ext = caps.get(2)?.as_str();
    let resolution = caps.get(3)?.as_str();
    let note = caps.get(4).map(|m| m.as_str().trim()).unwrap_or_default();

    let mut format = MediaFormat {
        id: id.to_string(),
        ext: ext.to_string(),
        resolution: Some(resolution.to_string()),
        note: note.to_string(),
        is_audio: resolution == AUDIO_ONLY
            || ext == "m4a"
            || (ext == "webm" && line.contains(AUDIO_ONLY)),
    };

    if line.contains("video only") {
        format.note = format!("Video Only - {}", format.note);
        format.is_audio = false;
    }

    Some(format)
}

fn mp3_variant(format: &MediaFormat) -> MediaFormat {
    MediaFormat {
        id: format.id.clone(),
        ext: MP3_EXT.to_string(),
        resolution: format.resolution.clone(),
        note: format!("Convert to MP3 - {}", format.note),
        is_audio: true,
    }
}

fn push_unique(formats: &mut Vec<MediaFormat>, format: MediaFormat) {
    if !formats.iter().any(|f| f.same_offer(&format)) {
        formats.push(format);
    }
}

fn is_header_or_rule(line: &str) -> bool {
    if line.contains("ID") && line.contains("EXT") {
        return true;
    }
    let trimmed = line.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| c == '-' || c == '─')
}

fn by_resolution_then_container(a: &MediaFormat, b: &MediaFormat) -> Ordering {
    b.pixel_area()
        .cmp(&a.pixel_area())
        .then_with(|| b.resolution.cmp(&a.resolution))
        .then_with(|| a.ext.cmp(&b.ext))
}
