use crate::{
    error::PollError,
    rest::TradeFetcher,
    subscription::{
        cluster::{BucketWidth, Cluster},
        trade::Cursor,
    },
    transformer::{
        Clock, SystemClock,
        cluster::{AggregatorState, ClusterAggregator},
    },
};
use serde::Deserialize;
use std::time::Duration;
use tickbucket_instrument::pair::Pair;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default delay inserted between consecutive requests of a polling session.
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_secs(1);

/// Configuration for a [`TradePoller`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Delay before every request of a session except the first.
    pub request_delay: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            request_delay: DEFAULT_REQUEST_DELAY,
        }
    }
}

/// How a polling session ended without error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PollOutcome {
    /// The most recently processed trade falls in the current wall-clock bucket.
    CaughtUp { cursor: Cursor },
    /// The caller cancelled the session before the next request or delay.
    Cancelled { cursor: Cursor },
}

impl PollOutcome {
    /// `last` cursor of the catch-up page, or the cursor the cancelled request would have used.
    pub fn cursor(&self) -> Cursor {
        match self {
            Self::CaughtUp { cursor } | Self::Cancelled { cursor } => *cursor,
        }
    }
}

/// Drives a [`TradeFetcher`] page by page for a single [`Pair`], feeding every page into a
/// [`ClusterAggregator`] until the stream catches up to the present.
///
/// The poller owns the pagination cursor and the aggregator, so calling
/// [`run`](Self::run) again after a session ends resumes where it left off and extends the
/// cluster that was still open.
#[derive(Debug)]
pub struct TradePoller<Fetcher, C = SystemClock> {
    fetcher: Fetcher,
    clock: C,
    config: PollConfig,
    pair: Pair,
    since: Cursor,
    aggregator: ClusterAggregator,
}

impl<Fetcher> TradePoller<Fetcher, SystemClock>
where
    Fetcher: TradeFetcher,
{
    /// Construct a [`TradePoller`] that starts fetching `pair` trades from `from`.
    pub fn new(fetcher: Fetcher, pair: Pair, from: Cursor, width: BucketWidth) -> Self {
        Self {
            fetcher,
            clock: SystemClock,
            config: PollConfig::default(),
            pair,
            since: from,
            aggregator: ClusterAggregator::new(width),
        }
    }
}

impl<Fetcher, C> TradePoller<Fetcher, C>
where
    Fetcher: TradeFetcher,
    C: Clock,
{
    pub fn with_config(self, config: PollConfig) -> Self {
        Self { config, ..self }
    }

    /// Replace the wall [`Clock`] used for catch-up detection.
    pub fn with_clock<NewClock>(self, clock: NewClock) -> TradePoller<Fetcher, NewClock>
    where
        NewClock: Clock,
    {
        TradePoller {
            fetcher: self.fetcher,
            clock,
            config: self.config,
            pair: self.pair,
            since: self.since,
            aggregator: self.aggregator,
        }
    }

    pub fn pair(&self) -> &Pair {
        &self.pair
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Cursor the next request will be issued with.
    pub fn cursor(&self) -> Cursor {
        self.since
    }

    pub fn aggregator(&self) -> &ClusterAggregator {
        &self.aggregator
    }

    /// Emit the open cluster immediately. See [`ClusterAggregator::flush`].
    pub fn flush(&mut self) -> Option<(Cluster, Cursor)> {
        self.aggregator.flush()
    }

    /// Run a polling session until the stream catches up, invoking `emit` synchronously with
    /// every closed [`Cluster`].
    ///
    /// The first request is issued immediately, every following one after
    /// [`PollConfig::request_delay`]. Empty pages do not end the session. Any fetch error ends
    /// it immediately, without retry, carrying the cursor that was in flight.
    pub async fn run<Emit>(&mut self, emit: Emit) -> Result<PollOutcome, PollError>
    where
        Emit: FnMut(Cluster, Cursor),
    {
        self.run_with_cancel(&CancellationToken::new(), emit).await
    }

    /// [`run`](Self::run) a polling session, checking `cancel` before each request and before
    /// each delay.
    pub async fn run_with_cancel<Emit>(
        &mut self,
        cancel: &CancellationToken,
        mut emit: Emit,
    ) -> Result<PollOutcome, PollError>
    where
        Emit: FnMut(Cluster, Cursor),
    {
        info!(
            exchange = %Fetcher::EXCHANGE,
            pair = %self.pair,
            since = %self.since,
            width = %self.aggregator.width(),
            "starting trade polling session"
        );

        let mut first_request = true;

        loop {
            if !first_request {
                if cancel.is_cancelled() {
                    return Ok(self.cancelled());
                }
                tokio::time::sleep(self.config.request_delay).await;
            }
            first_request = false;

            if cancel.is_cancelled() {
                return Ok(self.cancelled());
            }

            let since = self.since;
            let page = self
                .fetcher
                .fetch_trades(&self.pair, since)
                .await
                .map_err(|error| {
                    warn!(pair = %self.pair, %since, %error, "trade polling aborted");
                    PollError {
                        cursor: since,
                        error,
                    }
                })?;

            let last = page.last;
            let trades = page.trades.len();

            if last < since {
                warn!(pair = %self.pair, %since, %last, "trade cursor moved backwards");
            }

            let state = self
                .aggregator
                .process_page(page, &self.clock, &mut emit);

            self.since = last.successor();

            debug!(
                pair = %self.pair,
                trades,
                %last,
                %state,
                "processed trade page"
            );

            if state == AggregatorState::CaughtUp {
                info!(pair = %self.pair, cursor = %last, "trade polling caught up");
                return Ok(PollOutcome::CaughtUp { cursor: last });
            }
        }
    }

    fn cancelled(&self) -> PollOutcome {
        info!(pair = %self.pair, since = %self.since, "trade polling cancelled");
        PollOutcome::Cancelled { cursor: self.since }
    }
}
