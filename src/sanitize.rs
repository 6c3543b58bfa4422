//! Filename cleanup for resolved media titles.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Punctuation kept in sanitized names besides letters, digits and spaces.
const ALLOWED_PUNCTUATION: &str = "-_()[].,'";

/// Turns an arbitrary title into a portable file name stem.
///
/// Decomposes the title (NFKD) so accents fall away from their base
/// letters, keeps letters, digits, whitespace and `-_()[].,'`, collapses
/// whitespace runs to single spaces and trims. Applying it twice gives the
/// same result as applying it once.
///
/// # Examples
///
/// ```
/// use ytbatch::sanitize::sanitize_for_filename;
///
/// assert_eq!(sanitize_for_filename("  Café: Épisode #1? (Live)  "), "Cafe Episode 1 (Live)");
/// ```
pub fn sanitize_for_filename(input: &str) -> String {
    if input.trim().is_empty() {
        return "untitled_media".to_string();
    }

    let kept: String = input
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || ALLOWED_PUNCTUATION.contains(*c))
        .collect();
    let collapsed = kept.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.is_empty() {
        "media_extracted".to_string()
    } else {
        collapsed
    }
}
