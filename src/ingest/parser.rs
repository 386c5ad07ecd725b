use serde::Deserialize;
use thiserror::Error;

/// Errors from the format parser.
///
/// Raised only when the payload parses as neither RSS nor Atom. `Syntax`
/// carries the Atom attempt's error, since that is the last resort;
/// `Unrecognized` covers well-formed XML that deserializes to a document
/// with no channel title and no entries at all.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("document is neither RSS nor Atom: {0}")]
    Syntax(#[from] quick_xml::DeError),
    #[error("document is neither RSS nor Atom: no channel title or entries found")]
    Unrecognized,
}

// ============================================================================
// Canonical Shape
// ============================================================================

/// A parsed feed document, normalized to the RSS channel shape regardless of
/// the source format.
#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    pub title: String,
    pub link: String,
    pub description: String,
    pub items: Vec<RawItem>,
}

/// One entry as extracted from the document, before field normalization.
/// `description` and `pub_date` are raw strings; the normalizer owns their
/// cleanup and date parsing.
#[derive(Debug, Clone, Default)]
pub struct RawItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub pub_date: String,
}

// ============================================================================
// RSS Document Shape
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct RssDocument {
    #[serde(default)]
    channel: RssChannel,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RssChannel {
    title: String,
    #[serde(deserialize_with = "first_text_link")]
    link: String,
    description: String,
    #[serde(rename = "item")]
    items: Vec<RssItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RssItem {
    title: String,
    #[serde(deserialize_with = "first_text_link")]
    link: String,
    description: String,
    #[serde(rename = "pubDate")]
    pub_date: String,
}

/// RSS channels routinely carry `<atom:link rel="self"/>` next to `<link>`.
/// quick-xml matches elements by local name with the prefix stripped, so both
/// land on the `link` field and a plain `String` would reject the repeat as a
/// duplicate. Collect every occurrence and keep the first with text content;
/// the self link is an empty element and contributes none.
fn first_text_link<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let links = Vec::<String>::deserialize(deserializer)?;
    Ok(links.into_iter().find(|link| !link.is_empty()).unwrap_or_default())
}

// ============================================================================
// Atom Document Shape
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AtomDocument {
    title: String,
    subtitle: String,
    #[serde(rename = "link")]
    links: Vec<AtomLink>,
    #[serde(rename = "entry")]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: String,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AtomEntry {
    title: String,
    #[serde(rename = "link")]
    links: Vec<AtomLink>,
    content: Option<String>,
    summary: Option<String>,
    published: Option<String>,
    updated: Option<String>,
    // The `<media:description>` element from the Media RSS namespace, used
    // by YouTube's Atom feeds. quick-xml strips the prefix before matching,
    // and Atom entries have no plain description element to collide with.
    #[serde(rename = "description")]
    media_description: Option<String>,
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse a (repaired) feed payload into the canonical shape.
///
/// RSS is attempted first. A deserialization error *or* an empty channel
/// title triggers the Atom fallback; if Atom also fails to deserialize, or
/// deserializes to a document with neither a title nor entries, the whole
/// parse fails and the cycle ends without creating posts.
///
/// Channel fields and item titles come back HTML-entity-unescaped once, and
/// item descriptions are unescaped once before they reach the normalizer.
pub fn parse_feed(payload: &str) -> Result<ParsedFeed, ParseError> {
    let mut parsed = match quick_xml::de::from_str::<RssDocument>(payload) {
        Ok(doc) if !doc.channel.title.is_empty() => from_rss(doc.channel),
        // RSS failed or found no channel: retry as Atom
        _ => {
            let fallback = from_atom(quick_xml::de::from_str::<AtomDocument>(payload)?);
            // Deserializing ignores unknown elements, so a non-feed document
            // "succeeds" as an all-default Atom feed. Refuse it here rather
            // than reporting an empty feed as parsed.
            if fallback.title.is_empty() && fallback.items.is_empty() {
                return Err(ParseError::Unrecognized);
            }
            fallback
        }
    };

    parsed.title = unescape(&parsed.title);
    parsed.description = unescape(&parsed.description);
    for item in &mut parsed.items {
        item.title = unescape(&item.title);
        item.description = unescape(&item.description);
    }

    Ok(parsed)
}

fn unescape(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

fn from_rss(channel: RssChannel) -> ParsedFeed {
    ParsedFeed {
        title: channel.title,
        link: channel.link,
        description: channel.description,
        items: channel
            .items
            .into_iter()
            .map(|item| RawItem {
                title: item.title,
                link: item.link,
                description: item.description,
                pub_date: item.pub_date,
            })
            .collect(),
    }
}

/// Map an Atom document onto the RSS channel shape.
fn from_atom(doc: AtomDocument) -> ParsedFeed {
    ParsedFeed {
        title: doc.title,
        link: alternate_href(&doc.links).unwrap_or_default(),
        description: doc.subtitle,
        items: doc.entries.into_iter().map(entry_to_item).collect(),
    }
}

fn entry_to_item(entry: AtomEntry) -> RawItem {
    let non_empty = |field: Option<String>| field.filter(|s| !s.is_empty());

    let description = non_empty(entry.content)
        .or_else(|| non_empty(entry.summary))
        .or_else(|| non_empty(entry.media_description))
        .unwrap_or_default();
    let pub_date = non_empty(entry.published)
        .or_else(|| non_empty(entry.updated))
        .unwrap_or_default();

    RawItem {
        title: entry.title,
        link: alternate_href(&entry.links).unwrap_or_default(),
        description,
        pub_date,
    }
}

/// The first link whose `rel` is "alternate" or unset. Atom feeds carry
/// `self`, `hub`, etc. links that must not win over the article link.
fn alternate_href(links: &[AtomLink]) -> Option<String> {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate") | Some("")))
        .map(|l| l.href.clone())
}
