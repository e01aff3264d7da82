/// [`TradePoller`](poller::TradePoller) that paginates a
/// [`TradeFetcher`](crate::rest::TradeFetcher) until the trade stream catches up.
pub mod poller;

/// Spawns a [`TradePoller`](poller::TradePoller) on a tokio task, delivering
/// [`ClusterEvent`](consumer::ClusterEvent)s over a channel.
pub mod consumer;
