//! Slug derivation for the archived file set.

use crate::metadata::UNTITLED_PLACEHOLDER;

/// Longest slug (in characters), date suffix included.
pub const MAX_TITLE_CHARS: usize = 60;

const ELLIPSIS_MARKERS: [&str; 2] = ["...", "\u{2026}"];
const DATE_SUFFIX_CHARS: usize = 4;

/// Builds the base name shared by the video, sidecar, thumbnail and page.
///
/// The title is truncated, normalized to a lowercase ASCII hyphenated slug,
/// and suffixed with the last four characters of the upload date (`MMDD` for
/// yt-dlp's `YYYYMMDD`). The suffix narrows collisions between uploads with
/// the same title but does not rule them out.
///
/// The result never exceeds `MAX_TITLE_CHARS`, so feeding it back in without
/// a date returns it unchanged.
pub fn derive_slug(title: Option<&str>, upload_date: Option<&str>) -> String {
    let title = title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(UNTITLED_PLACEHOLDER);
    let suffix = upload_date.and_then(date_suffix);
    let body_limit = match suffix {
        Some(_) => MAX_TITLE_CHARS - 1 - DATE_SUFFIX_CHARS,
        None => MAX_TITLE_CHARS,
    };

    let mut slug = slug_body(&truncate_title(title), body_limit);
    if slug.is_empty() {
        slug = slug_body(UNTITLED_PLACEHOLDER, body_limit);
    }

    if let Some(suffix) = suffix {
        slug.push('-');
        slug.push_str(&suffix);
    }

    slug
}

/// Slugifies `text` and cuts the result to `limit` characters. Transliteration
/// can lengthen the text (`ß` becomes `ss`), so the cut happens afterwards.
fn slug_body(text: &str, limit: usize) -> String {
    let slug = slug::slugify(text);
    let cut: String = slug.chars().take(limit).collect();
    cut.trim_end_matches('-').to_owned()
}

/// Cuts the title to `MAX_TITLE_CHARS` and drops trailing ellipses, which
/// yt-dlp and most sites use to mark titles they already shortened.
fn truncate_title(title: &str) -> String {
    let mut truncated: String = title.chars().take(MAX_TITLE_CHARS).collect();
    loop {
        let trimmed_len = truncated.trim_end().len();
        truncated.truncate(trimmed_len);
        match ELLIPSIS_MARKERS
            .iter()
            .find(|marker| truncated.ends_with(*marker))
        {
            Some(marker) => {
                let len = truncated.len() - marker.len();
                truncated.truncate(len);
            }
            None => break,
        }
    }
    truncated
}

fn date_suffix(upload_date: &str) -> Option<String> {
    let chars: Vec<char> = upload_date.trim().chars().collect();
    if chars.len() < DATE_SUFFIX_CHARS {
        return None;
    }
    let tail = &chars[chars.len() - DATE_SUFFIX_CHARS..];
    if !tail.iter().all(char::is_ascii_alphanumeric) {
        return None;
    }
    Some(tail.iter().map(char::to_ascii_lowercase).collect())
}
