use crate::{
    error::DataError,
    subscription::trade::{Cursor, Trade},
};
use derive_more::Constructor;
use std::future::Future;
use tickbucket_instrument::{exchange::ExchangeId, pair::Pair};

/// One page of trade history returned by a [`TradeFetcher`].
#[derive(Clone, Eq, PartialEq, Debug, Constructor)]
pub struct TradePage {
    /// Decoded trades in the order the exchange returned them (not necessarily sorted).
    pub trades: Vec<Trade>,
    /// Cursor to continue fetching after this page.
    pub last: Cursor,
}

/// Trait for fetching one bounded page of public trade history from an exchange.
pub trait TradeFetcher {
    /// Exchange the trades are fetched from.
    const EXCHANGE: ExchangeId;

    /// Fetch the page of trades for `pair` that follows `since`.
    ///
    /// Any status, transport, or decode failure aborts the whole page; no partial pages are
    /// returned.
    fn fetch_trades(
        &self,
        pair: &Pair,
        since: Cursor,
    ) -> impl Future<Output = Result<TradePage, DataError>> + Send;
}
