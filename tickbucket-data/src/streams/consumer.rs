use super::poller::{PollOutcome, TradePoller};
use crate::{
    error::PollError,
    rest::TradeFetcher,
    subscription::{cluster::Cluster, trade::Cursor},
    transformer::Clock,
};
use serde::{Deserialize, Serialize};
use tickbucket_instrument::{exchange::ExchangeId, pair::Pair};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Closed [`Cluster`] delivered by a spawned cluster stream, along with the cursor valid after
/// the page that closed it.
#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub struct ClusterEvent {
    pub exchange: ExchangeId,
    pub pair: Pair,
    pub cluster: Cluster,
    pub cursor: Cursor,
}

/// Final state of a spawned cluster stream task.
///
/// The [`TradePoller`] is handed back so the caller can flush its open cluster or resume
/// polling from where the stream stopped.
#[derive(Debug)]
pub struct ClusterStreamExit<Fetcher, C> {
    pub poller: TradePoller<Fetcher, C>,
    pub outcome: Result<PollOutcome, PollError>,
}

/// Spawns `poller` on a tokio task and delivers every closed cluster as a [`ClusterEvent`]
/// over an unbounded channel, so slow consumers never block the poll loop.
///
/// The task runs one polling session: it ends when the stream catches up, when `cancel` is
/// triggered, when the receiver is dropped, or on the first error. A dropped receiver is
/// noticed before the next request even if no cluster has been emitted since.
pub fn init_cluster_stream<Fetcher, C>(
    mut poller: TradePoller<Fetcher, C>,
    cancel: CancellationToken,
) -> (
    mpsc::UnboundedReceiver<ClusterEvent>,
    JoinHandle<ClusterStreamExit<Fetcher, C>>,
)
where
    Fetcher: TradeFetcher + Send + Sync + 'static,
    C: Clock + Send + Sync + 'static,
{
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let exchange = Fetcher::EXCHANGE;
    let pair = poller.pair().clone();

    info!(%exchange, %pair, since = %poller.cursor(), "ClusterStream initialising");

    let handle = tokio::spawn(async move {
        let session = cancel.child_token();

        // Stop requesting pages once nobody is listening
        let watcher = event_tx.clone();
        let watched = session.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = watcher.closed() => {
                    warn!(%exchange, "ClusterStream receiver dropped, stopping");
                    watched.cancel();
                }
                _ = watched.cancelled() => {}
            }
        });

        let outcome = poller
            .run_with_cancel(&session, |cluster, cursor| {
                let event = ClusterEvent {
                    exchange,
                    pair: pair.clone(),
                    cluster,
                    cursor,
                };

                if event_tx.send(event).is_err() {
                    warn!(%exchange, %pair, "ClusterStream receiver dropped, stopping");
                    session.cancel();
                }
            })
            .await;

        session.cancel();

        if let Err(error) = &outcome {
            warn!(%exchange, %error, "ClusterStream terminated with error");
        }

        ClusterStreamExit { poller, outcome }
    });

    (event_rx, handle)
}

/// Adapt the [`ClusterEvent`] receiver returned by [`init_cluster_stream`] into a
/// [`Stream`](tokio_stream::Stream) that ends once the spawned task exits.
pub fn cluster_event_stream(
    events: mpsc::UnboundedReceiver<ClusterEvent>,
) -> UnboundedReceiverStream<ClusterEvent> {
    UnboundedReceiverStream::new(events)
}
