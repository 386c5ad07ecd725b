use futures::StreamExt;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use thiserror::Error;

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Default User-Agent. Many feed hosts reject clients that do not present a
/// browser-like identity.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; creel feed reader/0.1; +https://github.com/dhofheinz/creel)";

/// Errors that can occur while retrieving a feed document.
///
/// All of these abort the current cycle for the affected feed only; the
/// scheduler logs them and moves on.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the 30-second timeout
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
}

/// Build the HTTP client used for all feed fetches.
///
/// Headers mimic a standard feed-reader client. Accept-Encoding is not set
/// by hand: reqwest advertises gzip/deflate itself and transparently
/// decompresses the response body.
pub fn build_client(user_agent: &str) -> Result<reqwest::Client, reqwest::Error> {
    use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL};

    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "application/rss+xml, application/atom+xml, application/xml, text/xml, */*",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    reqwest::Client::builder()
        .user_agent(user_agent)
        .default_headers(headers)
        .timeout(FETCH_TIMEOUT)
        .build()
}

/// Fetch a feed URL and return its decoded, pre-repaired text payload.
///
/// The returned string has had its character encoding normalized to UTF-8
/// (see [`decode_payload`]) and common markup damage repaired (see
/// [`repair_xml`]), so it is ready for the format parser.
pub async fn fetch_payload(client: &reqwest::Client, url: &str) -> Result<String, FetchError> {
    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network(e)
        }
    })?;

    if !response.status().is_success() {
        return Err(FetchError::HttpStatus(response.status().as_u16()));
    }

    let bytes = read_limited_bytes(response, MAX_FEED_SIZE).await?;
    let text = decode_payload(&bytes, url);
    Ok(repair_xml(&text))
}

/// Read a response body with a hard size cap.
async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Network(e)
            }
        })?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

/// Decode raw response bytes to a UTF-8 string.
///
/// Feeds that declare `encoding="ISO-8859-1"` in the XML prolog are
/// transcoded and the declaration rewritten to UTF-8 so the XML parser does
/// not trip over the mismatch. Everything else goes through lossy UTF-8, so
/// decoding itself never fails a cycle.
fn decode_payload(bytes: &[u8], url: &str) -> String {
    let lossy = String::from_utf8_lossy(bytes);

    if lossy.contains(r#"encoding="ISO-8859-1""#) {
        // Single-byte encoding: every input byte maps to a character, the
        // decode cannot fail
        let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
        tracing::debug!(feed = %url, "Transcoded ISO-8859-1 payload");
        return decoded.replacen(r#"encoding="ISO-8859-1""#, r#"encoding="UTF-8""#, 1);
    }

    lossy.into_owned()
}

static RE_BARE_HR: Lazy<Regex> = Lazy::new(|| Regex::new(r"<hr[^>]*>").unwrap());
static RE_BARE_BR: Lazy<Regex> = Lazy::new(|| Regex::new(r"<br[^>]*>").unwrap());
static RE_BARE_IMG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<img([^>]*[^/>])?>").unwrap());
static RE_BARE_INPUT: Lazy<Regex> = Lazy::new(|| Regex::new(r"<input([^>]*[^/>])?>").unwrap());

/// Light pre-parse repair for markup damage commonly found in feed
/// descriptions: void HTML tags left unclosed, and bare `&` characters that
/// would make the document ill-formed XML.
///
/// Ampersands are escaped wholesale and then the recognized entities
/// (`&amp;`, `&lt;`, `&gt;`, `&quot;`) are un-double-escaped, which leaves
/// every other `&` safely escaped. Unrecognized entities like `&mdash;`
/// deliberately stay escaped here; the normalizer decodes them later.
fn repair_xml(payload: &str) -> String {
    let repaired = RE_BARE_HR.replace_all(payload, "<hr/>");
    let repaired = RE_BARE_BR.replace_all(&repaired, "<br/>");
    let repaired = RE_BARE_IMG.replace_all(&repaired, "<img$1/>");
    let repaired = RE_BARE_INPUT.replace_all(&repaired, "<input$1/>");

    let mut escaped = repaired.replace('&', "&amp;");
    for entity in ["&amp;", "&lt;", "&gt;", "&quot;"] {
        escaped = escaped.replace(&format!("&amp;{}", &entity[1..]), entity);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // ========================================================================
    // repair_xml tests
    // ========================================================================

    #[test]
    fn test_repair_self_closes_void_tags() {
        let input = "<description>a<br>b<hr class=\"x\">c<img src=\"i.png\"><input type=\"text\"></description>";
        let out = repair_xml(input);
        assert!(out.contains("<br/>"));
        assert!(out.contains("<hr/>"));
        assert!(out.contains("<img src=\"i.png\"/>"));
        assert!(out.contains("<input type=\"text\"/>"));
    }

    #[test]
    fn test_repair_leaves_self_closed_tags_alone() {
        let input = "<p>x<br/><img src=\"i.png\"/></p>";
        assert_eq!(repair_xml(input), input);
    }

    #[test]
    fn test_repair_escapes_bare_ampersands() {
        let out = repair_xml("<title>Fish & Chips</title>");
        assert_eq!(out, "<title>Fish &amp; Chips</title>");
    }

    #[test]
    fn test_repair_preserves_recognized_entities() {
        let input = "<title>a &amp; b &lt;c&gt; &quot;d&quot;</title>";
        assert_eq!(repair_xml(input), input);
    }

    #[test]
    fn test_repair_keeps_unrecognized_entities_escaped() {
        // &mdash; becomes &amp;mdash; so the XML parser reads a literal
        // "&mdash;" that the normalizer decodes later
        let out = repair_xml("<t>a &mdash; b</t>");
        assert_eq!(out, "<t>a &amp;mdash; b</t>");
    }

    // ========================================================================
    // decode_payload tests
    // ========================================================================

    #[test]
    fn test_decode_latin1_payload() {
        let mut bytes =
            br#"<?xml version="1.0" encoding="ISO-8859-1"?><rss><channel><title>caf"#.to_vec();
        bytes.push(0xE9); // é in ISO-8859-1
        bytes.extend_from_slice(b"</title></channel></rss>");

        let decoded = decode_payload(&bytes, "http://example.com/rss");
        assert!(decoded.contains("café"));
        assert!(decoded.contains(r#"encoding="UTF-8""#));
        assert!(!decoded.contains("ISO-8859-1"));
    }

    #[test]
    fn test_decode_plain_utf8_untouched() {
        let bytes = "<?xml version=\"1.0\" encoding=\"UTF-8\"?><rss>héllo</rss>".as_bytes();
        let decoded = decode_payload(bytes, "http://example.com/rss");
        assert_eq!(decoded, String::from_utf8_lossy(bytes));
    }

    // ========================================================================
    // fetch_payload tests
    // ========================================================================

    #[tokio::test]
    async fn test_fetch_success_returns_repaired_payload() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<rss><channel><title>A & B</title></channel></rss>")
                    .insert_header("Content-Type", "application/xml"),
            )
            .mount(&mock_server)
            .await;

        let client = build_client(DEFAULT_USER_AGENT).unwrap();
        let payload = fetch_payload(&client, &format!("{}/feed", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(
            payload,
            "<rss><channel><title>A &amp; B</title></channel></rss>"
        );
    }

    #[tokio::test]
    async fn test_fetch_404_is_http_status_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let client = build_client(DEFAULT_USER_AGENT).unwrap();
        let err = fetch_payload(&client, &format!("{}/feed", mock_server.uri()))
            .await
            .unwrap_err();
        match err {
            FetchError::HttpStatus(404) => {}
            e => panic!("Expected HttpStatus(404), got {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_body_over_limit_is_too_large() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(64)))
            .mount(&mock_server)
            .await;

        let client = build_client(DEFAULT_USER_AGENT).unwrap();
        let response = client
            .get(format!("{}/feed", mock_server.uri()))
            .send()
            .await
            .unwrap();
        let err = read_limited_bytes(response, 16).await.unwrap_err();
        assert!(matches!(err, FetchError::ResponseTooLarge));
    }
}
