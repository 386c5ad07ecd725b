use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use super::digest::summarize_digest;

// ============================================================================
// Date Parsing
// ============================================================================

/// Parse a publish date, trying each known format until one succeeds.
///
/// The chain covers RFC-1123 with numeric or named zones (both handled by
/// chrono's RFC 2822 parser), RFC 3339 as used by Atom `published`/`updated`
/// values, and a fixed `YYYY-MM-DDTHH:MM:SSZ` pattern. No match yields
/// `None`: an unparseable date is not an error and the item is still stored.
pub fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    const ATTEMPTS: [fn(&str) -> Option<DateTime<Utc>>; 3] =
        [parse_rfc2822, parse_rfc3339, parse_fixed_iso];
    ATTEMPTS.iter().find_map(|parse| parse(raw))
}

fn parse_rfc2822(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_fixed_iso(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%SZ")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

// ============================================================================
// Description Cleanup
// ============================================================================

static RE_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static RE_SUBMITTED_BY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*submitted by\s+/u/\w+\s*").unwrap());
static RE_LINK_COMMENTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\[link\]\s*\[comments\]\s*$").unwrap());

/// Reduce a raw feed description to display-ready plain text.
///
/// This is a best-effort readability pass, not a safety-grade sanitizer.
/// Digest-style descriptions (the "Article URL:"/"Comments URL:" pairs
/// emitted by discussion aggregators) are routed to the digest extractor
/// instead of generic cleanup.
pub fn clean_description(description: &str) -> String {
    if description.contains("Article URL:") && description.contains("Comments URL:") {
        return summarize_digest(description);
    }

    // Unescape again so tags hidden behind entity encoding get stripped too
    let unescaped = html_escape::decode_html_entities(description).into_owned();

    let no_comments = RE_COMMENT.replace_all(&unescaped, "");
    // Reddit wraps description markup in these marker comments
    let no_comments = no_comments
        .replace("<!-- SC_OFF -->", "")
        .replace("<!-- SC_ON -->", "");

    let mut cleaned = RE_TAG.replace_all(&no_comments, "").into_owned();

    // Decode entities that survived tag stripping
    for (entity, plain) in [
        ("&amp;", "&"),
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&quot;", "\""),
        ("&#39;", "'"),
        ("&nbsp;", " "),
    ] {
        cleaned = cleaned.replace(entity, plain);
    }

    let collapsed = RE_WHITESPACE.replace_all(cleaned.trim(), " ").into_owned();

    // Reddit artifacts: attribution line, then the trailing [link] [comments]
    let collapsed = RE_SUBMITTED_BY.replace_all(&collapsed, "");
    let collapsed = RE_LINK_COMMENTS.replace_all(&collapsed, "");

    RE_WHITESPACE
        .replace_all(&collapsed, " ")
        .trim()
        .to_string()
}
