use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use regex::{Captures, Regex};

use crate::date::CaptureTime;
use crate::media::MediaType;

/// Replaced by the contributor name
pub const USER_TOKEN: &str = "%u";
/// Replaced by the media type name
pub const TYPE_TOKEN: &str = "%Q";
/// Older spelling of the type token
pub const LEGACY_TYPE_TOKEN: &str = "%t";

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"%[-_0]?[A-Za-z%+]").unwrap());

/// Expand `template` for one file and join it under `archive_root`.
///
/// `%u` becomes the contributor, `%Q` (or `%t`) the media type name, and every
/// other token is handed to strftime. Tokens strftime does not know are kept
/// as written.
pub fn resolve(
    archive_root: &Path,
    template: &str,
    captured: &CaptureTime,
    media_type: MediaType,
    contributor: &str,
) -> PathBuf {
    let expanded = expand(template, captured.to_datetime().as_ref(), media_type, contributor);
    archive_root.join(expanded.trim_start_matches(['/', '\\']))
}

/// Template substitution without the archive root.
pub fn expand(
    template: &str,
    time: Option<&DateTime<Utc>>,
    media_type: MediaType,
    contributor: &str,
) -> String {
    TOKEN_RE
        .replace_all(template, |caps: &Captures| {
            let token = &caps[0];
            match token {
                USER_TOKEN => contributor.to_string(),
                TYPE_TOKEN | LEGACY_TYPE_TOKEN => media_type.name().to_string(),
                "%%" => "%".to_string(),
                _ => time
                    .and_then(|t| format_time_token(t, token))
                    .unwrap_or_else(|| token.to_string()),
            }
        })
        .into_owned()
}

fn format_time_token(time: &DateTime<Utc>, token: &str) -> Option<String> {
    let items: Vec<Item> = StrftimeItems::new(token).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return None;
    }
    let mut out = String::new();
    write!(out, "{}", time.format_with_items(items.iter())).ok()?;
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture() -> CaptureTime {
        CaptureTime {
            year: 2024,
            month: 3,
            day: 7,
            hour: 9,
            minute: 5,
            second: 0,
        }
    }

    #[test]
    fn test_time_tokens() {
        let path = resolve(Path::new("/archive"), "%Y/%m/%d", &capture(), MediaType::Image, "Alice");
        assert_eq!(path, PathBuf::from("/archive/2024/03/07"));
    }

    #[test]
    fn test_user_and_type_tokens() {
        let path = resolve(
            Path::new("/archive"),
            "%Y/%u/%Q",
            &capture(),
            MediaType::Raw,
            "Alice",
        );
        assert_eq!(path, PathBuf::from("/archive/2024/Alice/raw"));
    }

    #[test]
    fn test_default_contributor_uses_same_rule() {
        let path = resolve(
            Path::new("/archive"),
            "%Y/%Q/%u",
            &capture(),
            MediaType::Video,
            "default",
        );
        assert_eq!(path, PathBuf::from("/archive/2024/video/default"));
    }

    #[test]
    fn test_legacy_type_token() {
        let expanded = expand("%t-%Y", capture().to_datetime().as_ref(), MediaType::Image, "x");
        assert_eq!(expanded, "image-2024");
    }

    #[test]
    fn test_unknown_tokens_pass_through() {
        let expanded = expand("%Y/%J", capture().to_datetime().as_ref(), MediaType::Image, "x");
        assert_eq!(expanded, "2024/%J");
    }

    #[test]
    fn test_padding_modifier_and_percent() {
        let expanded = expand("%-m_%-d 100%%", capture().to_datetime().as_ref(), MediaType::Image, "x");
        assert_eq!(expanded, "3_7 100%");
    }

    #[test]
    fn test_contributor_with_percent_is_not_reexpanded() {
        let expanded = expand("%u/%Y", capture().to_datetime().as_ref(), MediaType::Image, "100%Y");
        assert_eq!(expanded, "100%Y/2024");
    }

    #[test]
    fn test_stays_under_archive_root() {
        let path = resolve(Path::new("/archive"), "/%Y", &capture(), MediaType::Image, "x");
        assert_eq!(path, PathBuf::from("/archive/2024"));
    }
}
