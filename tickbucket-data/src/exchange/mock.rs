use crate::{
    error::DataError,
    rest::{TradeFetcher, TradePage},
    subscription::trade::Cursor,
};
use std::{
    collections::VecDeque,
    future::Future,
    sync::{Arc, Mutex, PoisonError},
};
use tickbucket_instrument::{exchange::ExchangeId, pair::Pair};

/// [`TradeFetcher`] that replays a scripted sequence of page results and records every
/// request it receives.
///
/// Once the script is exhausted every further request yields an empty page that leaves the
/// cursor where it was.
#[derive(Debug, Clone, Default)]
pub struct MockTradeFetcher {
    pages: Arc<Mutex<VecDeque<Result<TradePage, DataError>>>>,
    requests: Arc<Mutex<Vec<(Pair, Cursor)>>>,
}

impl MockTradeFetcher {
    pub fn new<Pages>(pages: Pages) -> Self
    where
        Pages: IntoIterator<Item = Result<TradePage, DataError>>,
    {
        Self {
            pages: Arc::new(Mutex::new(pages.into_iter().collect())),
            requests: Arc::default(),
        }
    }

    /// Every `(pair, since)` requested so far, in order.
    pub fn requests(&self) -> Vec<(Pair, Cursor)> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of scripted page results not yet served.
    pub fn remaining(&self) -> usize {
        self.pages.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl TradeFetcher for MockTradeFetcher {
    const EXCHANGE: ExchangeId = ExchangeId::Mock;

    fn fetch_trades(
        &self,
        pair: &Pair,
        since: Cursor,
    ) -> impl Future<Output = Result<TradePage, DataError>> + Send {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((pair.clone(), since));

        let next = self
            .pages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Ok(TradePage::new(Vec::new(), since)));

        std::future::ready(next)
    }
}
