/// `Kraken` public trade history over REST.
pub mod kraken;

/// In-memory [`TradeFetcher`](crate::rest::TradeFetcher) serving scripted pages.
pub mod mock;
