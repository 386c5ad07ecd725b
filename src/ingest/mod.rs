//! The feed ingestion pipeline.
//!
//! Data flows one way through the submodules, leaf-first:
//!
//! - [`fetcher`] - HTTP retrieval, charset decode, pre-parse markup repair
//! - [`parser`] - RSS deserialization with Atom fallback onto one canonical shape
//! - [`normalize`] - publish-date fallback chain and description cleanup
//! - [`digest`] - synthetic summaries for aggregator-digest descriptions
//! - [`scheduler`] - the fixed-interval, least-recently-fetched drive loop
//!
//! The pipeline is strictly sequential: one feed is fetched and fully
//! processed before the next tick is awaited, so outbound request
//! concurrency is bounded to one. Duplicate suppression happens at insert
//! time via the store's UNIQUE(feed_id, url) constraint.

pub mod digest;
pub mod fetcher;
pub mod normalize;
pub mod parser;
pub mod scheduler;

pub use fetcher::{build_client, fetch_payload, FetchError, DEFAULT_USER_AGENT};
pub use parser::{parse_feed, ParseError, ParsedFeed, RawItem};
pub use scheduler::{run_ingestion_cycle, run_scheduled_cycle, run_scheduler, IngestError};
