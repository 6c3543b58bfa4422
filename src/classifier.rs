//! URL classification.
//!
//! Pure functions that decide whether a URL is worth a format probe and
//! whether it denotes a multi-item collection. Nothing here touches the
//! network or the probe tool.

use url::Url;

/// Canonical YouTube web host. Only this host qualifies a bare `list=`
/// URL as a playlist.
const YOUTUBE_WEB_HOST: &str = "www.youtube.com";

/// Path segments that mark a collection page regardless of host.
const PLAYLIST_PATH_SEGMENTS: &[&str] = &["playlist", "sets"];

/// Returns true when `url` points at a single media item the probe tool
/// can list formats for.
///
/// Unparseable or blank input and unrecognized hosts return false.
///
/// # Examples
///
/// ```
/// use ytbatch::classifier::must_refresh_formats;
///
/// assert!(must_refresh_formats("https://www.youtube.com/watch?v=abc"));
/// assert!(!must_refresh_formats("https://example.com/"));
/// ```
pub fn must_refresh_formats(url: &str) -> bool {
    let Some(parsed) = parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    let host = host.as_str();
    let path = parsed.path();

    match host {
        "youtube.com" | "www.youtube.com" | "m.youtube.com" | "music.youtube.com" => {
            has_query_key(&parsed, "v")
                || has_query_key(&parsed, "list")
                || path.starts_with("/shorts/")
                || path.starts_with("/live/")
        }
        "youtu.be" => !is_root(path),
        "tiktok.com" | "www.tiktok.com" | "m.tiktok.com" => {
            path.contains("/video/") || path.contains("/photo/")
        }
        "vm.tiktok.com" | "vt.tiktok.com" => !is_root(path),
        "facebook.com" | "www.facebook.com" | "m.facebook.com" | "web.facebook.com" => {
            path.contains("/videos/")
                || path.starts_with("/reel/")
                || path.starts_with("/share/v/")
                || path.starts_with("/share/r/")
                || (path.starts_with("/watch") && has_query_key(&parsed, "v"))
        }
        "fb.watch" => !is_root(path),
        "instagram.com" | "www.instagram.com" => {
            path.starts_with("/p/")
                || path.starts_with("/reel/")
                || path.starts_with("/reels/")
                || path.starts_with("/tv/")
        }
        "x.com" | "www.x.com" | "twitter.com" | "www.twitter.com" | "mobile.twitter.com" => {
            path.contains("/status/")
        }
        "twitch.tv" | "www.twitch.tv" | "m.twitch.tv" => {
            path.starts_with("/videos/") || path.contains("/clip/")
        }
        "clips.twitch.tv" => !is_root(path),
        "vimeo.com" | "www.vimeo.com" => first_segment(&parsed)
            .map(|s| s.chars().all(|c| c.is_ascii_digit()))
            .unwrap_or(false),
        "player.vimeo.com" => path.starts_with("/video/"),
        "soundcloud.com" | "www.soundcloud.com" | "m.soundcloud.com" => segment_count(&parsed) >= 2,
        "on.soundcloud.com" => !is_root(path),
        _ => false,
    }
}

/// Returns true when `url` denotes a collection that should be expanded
/// into individual items.
///
/// A single video that merely belongs to a playlist (`watch?v=..&list=..`)
/// is not a playlist.
///
/// # Examples
///
/// ```
/// use ytbatch::classifier::is_playlist;
///
/// assert!(is_playlist("https://www.youtube.com/playlist?list=XYZ"));
/// assert!(!is_playlist("https://www.youtube.com/watch?v=abc&list=XYZ"));
/// ```
pub fn is_playlist(url: &str) -> bool {
    let Some(parsed) = parse(url) else {
        return false;
    };

    let has_marker = parsed
        .path_segments()
        .map(|mut segments| {
            segments.any(|s| {
                PLAYLIST_PATH_SEGMENTS
                    .iter()
                    .any(|m| s.eq_ignore_ascii_case(m))
            })
        })
        .unwrap_or(false);
    if has_marker {
        return true;
    }

    let host = parsed.host_str().map(str::to_ascii_lowercase);
    has_query_key(&parsed, "list")
        && !has_query_key(&parsed, "v")
        && host.as_deref() == Some(YOUTUBE_WEB_HOST)
}

fn parse(url: &str) -> Option<Url> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return None;
    }
    Url::parse(trimmed).ok()
}

fn has_query_key(url: &Url, key: &str) -> bool {
    url.query_pairs()
        .any(|(k, v)| k.eq_ignore_ascii_case(key) && !v.is_empty())
}

fn is_root(path: &str) -> bool {
    path.trim_matches('/').is_empty()
}

fn first_segment(url: &Url) -> Option<&str> {
    url.path_segments()?.find(|s| !s.is_empty())
}

fn segment_count(url: &Url) -> usize {
    url.path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).count())
        .unwrap_or(0)
}
