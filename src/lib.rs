//! creel: an RSS/Atom feed aggregation daemon.
//!
//! The crate is split into the ingestion pipeline ([`ingest`]), the SQLite
//! persistence layer ([`storage`]), and startup configuration ([`config`]).
//! The binary in `main.rs` is thin glue: it wires a [`storage::Database`]
//! and an HTTP client into the pipeline and exposes a small CLI.

pub mod config;
pub mod ingest;
pub mod storage;
