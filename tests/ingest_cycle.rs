//! End-to-end tests for the ingestion pipeline: wiremock feed hosts on one
//! side, an in-memory SQLite database on the other.
//!
//! Each test creates its own database and mock server for isolation.

use creel::ingest::{self, IngestError};
use creel::storage::{Database, Feed};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RSS_THREE_ITEMS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <title>Example</title>
    <link>https://example.com</link>
    <description>Example feed</description>
    <item>
        <title>Alpha</title>
        <link>https://example.com/alpha</link>
        <description>&lt;p&gt;First &lt;b&gt;post&lt;/b&gt;&lt;/p&gt;</description>
        <pubDate>Mon, 02 Jan 2006 15:04:05 -0700</pubDate>
    </item>
    <item>
        <title>Beta</title>
        <link>https://example.com/beta</link>
        <description>Second post</description>
        <pubDate>2006-01-03T10:00:00Z</pubDate>
    </item>
    <item>
        <title>Gamma</title>
        <link>https://example.com/gamma</link>
        <description>Third post</description>
        <pubDate>not-a-date</pubDate>
    </item>
</channel></rss>"#;

const ATOM_FEED: &str = r#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom">
    <title>Atom Example</title>
    <link rel="self" href="https://atom.example/feed.xml"/>
    <link rel="alternate" href="https://atom.example"/>
    <entry>
        <title>Atom Entry</title>
        <link rel="alternate" href="https://atom.example/entry/1"/>
        <summary>An atom entry</summary>
        <published>2006-01-02T15:04:05Z</published>
    </entry>
</feed>"#;

async fn test_db() -> Database {
    Database::open(":memory:").await.unwrap()
}

fn test_client() -> reqwest::Client {
    ingest::build_client(ingest::DEFAULT_USER_AGENT).unwrap()
}

async fn mount_feed(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("Content-Type", "application/rss+xml"),
        )
        .mount(server)
        .await;
}

async fn subscribe(db: &Database, name: &str, url: &str) -> Feed {
    db.insert_feed(name, url, None).await.unwrap();
    db.feed_by_url(url).await.unwrap().unwrap()
}

#[tokio::test]
async fn test_cycle_creates_posts_in_document_order() {
    let server = MockServer::start().await;
    mount_feed(&server, "/rss", RSS_THREE_ITEMS).await;

    let db = test_db().await;
    let feed = subscribe(&db, "Example", &format!("{}/rss", server.uri())).await;

    let created = ingest::run_ingestion_cycle(&db, &test_client(), &feed)
        .await
        .unwrap();
    assert_eq!(created, 3);

    let posts = db.posts_for_feed(feed.id).await.unwrap();
    let titles: Vec<_> = posts.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, ["Alpha", "Beta", "Gamma"]);

    // Descriptions arrive cleaned to plain text
    assert_eq!(posts[0].description.as_deref(), Some("First post"));

    // RFC-1123 with numeric zone and the fixed ISO pattern both parse
    assert_eq!(posts[0].published_at, Some(1136239445));
    assert!(posts[1].published_at.is_some());
    // An unparseable date is recorded as absent; the item is still stored
    assert_eq!(posts[2].published_at, None);
}

#[tokio::test]
async fn test_second_cycle_is_idempotent() {
    let server = MockServer::start().await;
    mount_feed(&server, "/rss", RSS_THREE_ITEMS).await;

    let db = test_db().await;
    let feed = subscribe(&db, "Example", &format!("{}/rss", server.uri())).await;
    let client = test_client();

    let first = ingest::run_ingestion_cycle(&db, &client, &feed).await.unwrap();
    let second = ingest::run_ingestion_cycle(&db, &client, &feed).await.unwrap();

    assert_eq!(first, 3);
    assert_eq!(second, 0, "duplicate URLs must be skipped, not re-created");
    assert_eq!(db.posts_for_feed(feed.id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_atom_fallback_end_to_end() {
    let server = MockServer::start().await;
    mount_feed(&server, "/atom", ATOM_FEED).await;

    let db = test_db().await;
    let feed = subscribe(&db, "Atom", &format!("{}/atom", server.uri())).await;

    let created = ingest::run_ingestion_cycle(&db, &test_client(), &feed)
        .await
        .unwrap();
    assert_eq!(created, 1);

    let posts = db.posts_for_feed(feed.id).await.unwrap();
    assert_eq!(posts[0].title, "Atom Entry");
    // The alternate link wins over rel="self"
    assert_eq!(posts[0].url, "https://atom.example/entry/1");
    assert_eq!(posts[0].description.as_deref(), Some("An atom entry"));
    assert_eq!(posts[0].published_at, Some(1136214245));
}

#[tokio::test]
async fn test_unparseable_document_is_parse_error() {
    let server = MockServer::start().await;
    mount_feed(&server, "/rss", "plain text, no feed here").await;

    let db = test_db().await;
    let feed = subscribe(&db, "Broken", &format!("{}/rss", server.uri())).await;

    let err = ingest::run_ingestion_cycle(&db, &test_client(), &feed)
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::Parse(_)));
    assert!(db.posts_for_feed(feed.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_scheduled_cycles_rotate_feeds_and_isolate_failures() {
    let server = MockServer::start().await;
    mount_feed(&server, "/good", RSS_THREE_ITEMS).await;
    Mock::given(method("GET"))
        .and(path("/bad"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let db = test_db().await;
    let bad = subscribe(&db, "Bad", &format!("{}/bad", server.uri())).await;
    let client = test_client();

    // Tick 1: the broken feed fails, but its last_fetched_at is already
    // stamped so it rotates to the back of the queue
    let err = ingest::run_scheduled_cycle(&db, &client).await.unwrap_err();
    assert!(matches!(err, IngestError::Fetch(_)));
    let bad_after = db.feed_by_url(&bad.url).await.unwrap().unwrap();
    assert!(bad_after.last_fetched_at.is_some());

    // A never-fetched feed outranks the freshly stamped broken one
    let good = subscribe(&db, "Good", &format!("{}/good", server.uri())).await;

    // Tick 2: the healthy feed is processed normally despite tick 1's failure
    let created = ingest::run_scheduled_cycle(&db, &client).await.unwrap();
    assert_eq!(created, 3);
    assert_eq!(db.posts_for_feed(good.id).await.unwrap().len(), 3);
    assert!(db.posts_for_feed(bad.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_scheduled_cycle_with_no_feeds_is_noop() {
    let db = test_db().await;
    let created = ingest::run_scheduled_cycle(&db, &test_client()).await.unwrap();
    assert_eq!(created, 0);
}

#[tokio::test]
async fn test_digest_feed_gets_synthetic_summaries() {
    let digest_rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <title>Hacker News</title>
    <link>https://news.ycombinator.com</link>
    <description>Links</description>
    <item>
        <title>Show HN: Widget</title>
        <link>https://news.ycombinator.com/item?id=1</link>
        <description>
            Article URL: https://github.com/acme/widget
            Comments URL: https://news.ycombinator.com/item?id=1
            Points: 128
            # Comments: 42
        </description>
        <pubDate>Mon, 02 Jan 2006 15:04:05 -0700</pubDate>
    </item>
</channel></rss>"#;

    let server = MockServer::start().await;
    mount_feed(&server, "/hn", digest_rss).await;

    let db = test_db().await;
    let feed = subscribe(&db, "HN", &format!("{}/hn", server.uri())).await;

    ingest::run_ingestion_cycle(&db, &test_client(), &feed)
        .await
        .unwrap();

    let posts = db.posts_for_feed(feed.id).await.unwrap();
    assert_eq!(
        posts[0].description.as_deref(),
        Some("GitHub repository: acme/widget • 128 points, 42 comments")
    );
}
