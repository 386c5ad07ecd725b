use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static RE_ARTICLE_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"Article URL:\s*(\S+)").unwrap());
static RE_GITHUB_REPO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"github\.com/([^/]+)/([^/?]+)").unwrap());
static RE_POINTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"Points:\s*(\d+)").unwrap());
static RE_COMMENTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"#\s*Comments:\s*(\d+)").unwrap());

/// Build a short synthetic summary for a digest-style description.
///
/// Discussion aggregators (Hacker News being the canonical case) ship
/// descriptions that are just an "Article URL:"/"Comments URL:" dump. Rather
/// than running those through generic cleanup, classify the linked article
/// by host and emit a one-line label, with the score and comment count
/// appended when both are present.
pub fn summarize_digest(description: &str) -> String {
    let plain = RE_TAG.replace_all(description, "");

    let mut summary = match RE_ARTICLE_URL.captures(&plain) {
        Some(caps) => classify_article_url(&caps[1]),
        None => "Hacker News discussion".to_string(),
    };

    if let (Some(points), Some(comments)) = (RE_POINTS.captures(&plain), RE_COMMENTS.captures(&plain))
    {
        summary.push_str(&format!(
            " • {} points, {} comments",
            &points[1], &comments[1]
        ));
    }

    summary
}

/// Classify an article URL by host substring.
fn classify_article_url(article_url: &str) -> String {
    if article_url.contains("github.com") {
        format!("GitHub repository: {}", github_repo_slug(article_url))
    } else if article_url.contains("arxiv.org") {
        "Research paper from arXiv".to_string()
    } else if article_url.contains("youtube.com") || article_url.contains("youtu.be") {
        "YouTube video".to_string()
    } else {
        match Url::parse(article_url).ok().and_then(|u| u.host_str().map(str::to_owned)) {
            Some(host) => format!("Article from {}", host),
            None => "External article".to_string(),
        }
    }
}

/// Extract "owner/repo" from a GitHub URL path; falls back to the URL itself
/// when the path has no owner/repo segments.
fn github_repo_slug(url: &str) -> String {
    RE_GITHUB_REPO
        .captures(url)
        .map(|caps| format!("{}/{}", &caps[1], &caps[2]))
        .unwrap_or_else(|| url.to_string())
}
