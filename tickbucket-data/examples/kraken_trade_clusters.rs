use chrono::{TimeDelta, Utc};
use futures::StreamExt;
use tickbucket_data::{
    exchange::kraken::rest::{KrakenRestClient, KrakenRestConfig},
    streams::{
        consumer::{cluster_event_stream, init_cluster_stream},
        poller::{PollConfig, TradePoller},
    },
    subscription::{cluster::BucketWidth, trade::Cursor},
};
use tickbucket_instrument::pair::Pair;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise INFO Tracing log subscriber
    init_logging();

    // Backfill the last hour of XBTUSD trades, one page every second
    let client = KrakenRestClient::from_config(KrakenRestConfig::default())?;
    let poller = TradePoller::new(
        client,
        Pair::new("XBTUSD"),
        Cursor::from(Utc::now() - TimeDelta::hours(1)),
        BucketWidth::MINUTE,
    )
    .with_config(PollConfig::default());

    let (events, handle) = init_cluster_stream(poller, CancellationToken::new());

    let mut events = cluster_event_stream(events);
    while let Some(event) = events.next().await {
        info!(
            pair = %event.pair,
            bucket = %event.cluster.bucket,
            trades = event.cluster.len(),
            first_id = ?event.cluster.first_id(),
            last_id = ?event.cluster.last_id(),
            cursor = %event.cursor,
            "trade cluster"
        );
    }

    let mut exit = handle.await?;
    match exit.outcome {
        Ok(outcome) => info!(?outcome, "trade backfill finished"),
        Err(error) => warn!(%error, "trade backfill aborted"),
    }

    // Current bucket is still open, flush it to see the partial cluster
    if let Some((cluster, cursor)) = exit.poller.flush() {
        info!(
            bucket = %cluster.bucket,
            trades = cluster.len(),
            %cursor,
            "open trade cluster"
        );
    }

    Ok(())
}

// Initialise an INFO `Subscriber` for `Tracing` Json logs and install it as the global default.
fn init_logging() {
    tracing_subscriber::fmt()
        // Filter messages based on the INFO
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        // Disable colours on release builds
        .with_ansi(cfg!(debug_assertions))
        // Enable Json formatting
        .json()
        // Install this Tracing subscriber as global default
        .init()
}
