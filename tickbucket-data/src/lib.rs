#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cast_possible_truncation,
    clippy::unused_self,
    clippy::cast_lossless,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! # Tickbucket-Data
//! Backfills public trade history from exchange REST APIs and groups it into time-bucketed
//! clusters.
//!
//! Trades are fetched page by page through a [`TradeFetcher`](rest::TradeFetcher) (currently
//! [`KrakenRestClient`](exchange::kraken::rest::KrakenRestClient)), driven by a
//! [`TradePoller`](streams::poller::TradePoller) that paces requests and feeds each page into a
//! [`ClusterAggregator`](transformer::cluster::ClusterAggregator). A cluster is emitted once the
//! first trade of a later bucket is observed, and polling stops once the most recent trade falls
//! in the current wall-clock bucket.
//!
//! ## Example
//! ```rust,no_run
//! use tickbucket_data::{
//!     exchange::kraken::rest::KrakenRestClient,
//!     streams::poller::TradePoller,
//!     subscription::{cluster::BucketWidth, trade::Cursor},
//! };
//! use tickbucket_instrument::pair::Pair;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut poller = TradePoller::new(
//!     KrakenRestClient::new()?,
//!     Pair::new("XBTUSD"),
//!     Cursor::from_nanos(1_700_000_000_000_000_000),
//!     BucketWidth::MINUTE,
//! );
//!
//! let outcome = poller
//!     .run(|cluster, cursor| println!("{} trades @ {} ({cursor})", cluster.len(), cluster.bucket))
//!     .await?;
//!
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

/// Helpers for writing custom `Deserialize` implementations of positional exchange payloads.
pub mod de;

/// All [`Error`](std::error::Error)s generated in Tickbucket-Data.
pub mod error;

/// Exchange specific [`TradeFetcher`](rest::TradeFetcher) implementations.
pub mod exchange;

/// Exchange agnostic REST trade fetching interface.
pub mod rest;

/// Polling sessions and spawned cluster streams.
pub mod streams;

/// Normalised data models produced by Tickbucket-Data.
pub mod subscription;

/// Stateful transformers that turn trade pages into clusters, and the [`Clock`](transformer::Clock)
/// they consult.
pub mod transformer;
