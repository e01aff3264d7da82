use super::Clock;
use crate::{
    rest::TradePage,
    subscription::{
        cluster::{BucketWidth, Cluster},
        trade::{Cursor, Trade},
    },
};
use chrono::{DateTime, Utc};
use derive_more::Display;
use tracing::{debug, warn};

/// Lifecycle of a [`ClusterAggregator`].
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Display)]
pub enum AggregatorState {
    /// No trade observed yet, no bucket established.
    #[default]
    #[display("idle")]
    Idle,
    /// Trades are being grouped and the stream is still behind the present.
    #[display("accumulating")]
    Accumulating,
    /// The most recently processed trade falls in the current wall-clock bucket.
    #[display("caught_up")]
    CaughtUp,
}

/// Groups pages of [`Trade`]s into time-bucketed [`Cluster`]s.
///
/// Each page is sorted by trade id before processing. A cluster is emitted only when the first
/// trade of a later bucket arrives; the open cluster is never closed by a timeout, and stays
/// buffered when the stream catches up so the next page can extend it. Use
/// [`ClusterAggregator::flush`] to force it out.
#[derive(Debug, Clone)]
pub struct ClusterAggregator {
    width: BucketWidth,
    state: AggregatorState,
    bucket: Option<DateTime<Utc>>,
    open: Vec<Trade>,
    cursor: Option<Cursor>,
    last_id: Option<u64>,
}

impl ClusterAggregator {
    pub fn new(width: BucketWidth) -> Self {
        Self {
            width,
            state: AggregatorState::Idle,
            bucket: None,
            open: Vec::new(),
            cursor: None,
            last_id: None,
        }
    }

    pub fn width(&self) -> BucketWidth {
        self.width
    }

    pub fn state(&self) -> AggregatorState {
        self.state
    }

    pub fn is_caught_up(&self) -> bool {
        self.state == AggregatorState::CaughtUp
    }

    /// Bucket key of the open cluster, if any.
    pub fn open_bucket(&self) -> Option<DateTime<Utc>> {
        self.bucket
    }

    /// Trades buffered in the open cluster.
    pub fn open_trades(&self) -> &[Trade] {
        &self.open
    }

    /// Process one fetched [`TradePage`], invoking `emit` with every cluster it closes along
    /// with the page's cursor.
    ///
    /// Returns the [`AggregatorState`] after the last trade. An empty page emits nothing and
    /// leaves the state untouched.
    pub fn process_page<C, Emit>(
        &mut self,
        page: TradePage,
        clock: &C,
        mut emit: Emit,
    ) -> AggregatorState
    where
        C: Clock + ?Sized,
        Emit: FnMut(Cluster, Cursor),
    {
        let TradePage { mut trades, last } = page;

        if trades.is_empty() {
            return self.state;
        }

        trades.sort_unstable_by_key(|trade| trade.id);

        if let (Some(previous), Some(first)) = (self.last_id, trades.first()) {
            if first.id <= previous {
                warn!(
                    previous_id = previous,
                    first_id = first.id,
                    "trade page overlaps previously processed trades"
                );
            }
        }

        for trade in trades {
            let bucket = self.width.truncate(trade.time);

            if let Some(current) = self.bucket.filter(|current| *current != bucket) {
                let cluster = Cluster {
                    bucket: current,
                    trades: std::mem::take(&mut self.open),
                };

                debug!(
                    bucket = %cluster.bucket,
                    trades = cluster.len(),
                    cursor = %last,
                    "closed trade cluster"
                );

                emit(cluster, last);
            }

            self.bucket = Some(bucket);
            self.last_id = Some(trade.id);
            self.open.push(trade);

            self.state = if self.width.truncate(clock.now()) == bucket {
                AggregatorState::CaughtUp
            } else {
                AggregatorState::Accumulating
            };
        }

        self.cursor = Some(last);
        self.state
    }

    /// Emit the open cluster regardless of whether a later bucket has been observed, returning
    /// it with the cursor of the last processed page.
    ///
    /// Resets the aggregator to [`AggregatorState::Idle`]. Trades arriving afterwards for the
    /// same bucket start a new cluster with the same `bucket` key, so a flushed bucket may be
    /// emitted more than once; consumers keyed by bucket must merge them.
    pub fn flush(&mut self) -> Option<(Cluster, Cursor)> {
        let bucket = self.bucket.take()?;
        self.state = AggregatorState::Idle;

        let trades = std::mem::take(&mut self.open);
        let cursor = self.cursor?;

        Some((Cluster { bucket, trades }, cursor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transformer::FixedClock;
    use chrono::{TimeDelta, TimeZone};
    use rust_decimal::Decimal;
    use std::cell::Cell;
    use tickbucket_instrument::{Liquidity, Side};

    fn time(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, s).unwrap()
    }

    fn trade(id: u64, time: DateTime<Utc>) -> Trade {
        Trade {
            id,
            price: Decimal::new(3024340, 2),
            volume: Decimal::new(1, 3),
            side: Side::Buy,
            liquidity: Liquidity::Limit,
            time,
        }
    }

    fn page(trades: Vec<Trade>, last: DateTime<Utc>) -> TradePage {
        TradePage {
            trades,
            last: Cursor::from(last),
        }
    }

    fn ids(cluster: &Cluster) -> Vec<u64> {
        cluster.trades.iter().map(|trade| trade.id).collect()
    }

    /// Clock that advances by a fixed step every time it is read.
    struct SteppingClock {
        now: Cell<DateTime<Utc>>,
        step: TimeDelta,
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let now = self.now.get();
            self.now.set(now + self.step);
            now
        }
    }

    #[test]
    fn test_unsorted_page_emits_closed_bucket_and_catches_up() {
        let mut aggregator = ClusterAggregator::new(BucketWidth::MINUTE);
        let clock = FixedClock(time(0, 1, 30));
        let mut emitted = Vec::new();

        let state = aggregator.process_page(
            page(
                vec![
                    trade(2, time(0, 0, 15)),
                    trade(1, time(0, 0, 10)),
                    trade(3, time(0, 1, 2)),
                ],
                time(0, 1, 2),
            ),
            &clock,
            |cluster, cursor| emitted.push((cluster, cursor)),
        );

        assert_eq!(emitted.len(), 1);
        let (cluster, cursor) = &emitted[0];
        assert_eq!(cluster.bucket, time(0, 0, 0));
        assert_eq!(ids(cluster), vec![1, 2]);
        assert_eq!(*cursor, Cursor::from(time(0, 1, 2)));

        assert_eq!(state, AggregatorState::CaughtUp);
        assert_eq!(aggregator.open_bucket(), Some(time(0, 1, 0)));
        assert_eq!(
            aggregator.open_trades().iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![3]
        );
    }

    #[test]
    fn test_trades_processed_in_increasing_id_order() {
        let mut aggregator = ClusterAggregator::new(BucketWidth::MINUTE);
        let clock = FixedClock(time(12, 0, 0));
        let mut emitted = Vec::new();

        // Each trade in its own bucket so every id surfaces as a single-trade cluster
        let trades = [5, 3, 9, 1, 7]
            .into_iter()
            .map(|id| trade(id, time(0, id as u32, 0)))
            .collect();

        aggregator.process_page(page(trades, time(0, 9, 0)), &clock, |cluster, _| {
            emitted.push(cluster)
        });

        let emitted_ids = emitted.iter().flat_map(ids).collect::<Vec<_>>();
        assert_eq!(emitted_ids, vec![1, 3, 5, 7]);
        assert!(emitted_ids.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(aggregator.open_trades()[0].id, 9);
    }

    #[test]
    fn test_n_buckets_emit_n_minus_one_clusters() {
        for buckets in 2..6u32 {
            let mut aggregator = ClusterAggregator::new(BucketWidth::MINUTE);
            let clock = FixedClock(time(6, 0, 0));
            let mut emitted = Vec::new();

            // Three trades per bucket, spread over pages of two trades
            let trades = (0..buckets * 3)
                .map(|index| trade(u64::from(index) + 1, time(0, index / 3, (index % 3) * 10)))
                .collect::<Vec<_>>();

            for chunk in trades.chunks(2) {
                let last = chunk.last().unwrap().time;
                let state = aggregator.process_page(page(chunk.to_vec(), last), &clock, |c, _| {
                    emitted.push(c)
                });
                assert_eq!(state, AggregatorState::Accumulating);
            }

            assert_eq!(emitted.len(), buckets as usize - 1, "buckets={buckets}");
            assert!(emitted.iter().all(|cluster| cluster.len() == 3));
            assert_eq!(aggregator.open_trades().len(), 3);
            assert_eq!(aggregator.open_bucket(), Some(time(0, buckets - 1, 0)));
        }
    }

    #[test]
    fn test_open_cluster_closed_by_later_page() {
        let mut aggregator = ClusterAggregator::new(BucketWidth::MINUTE);
        let mut emitted = Vec::new();

        // Page 1: caught up inside the 00:01 bucket
        let state = aggregator.process_page(
            page(vec![trade(1, time(0, 1, 5))], time(0, 1, 5)),
            &FixedClock(time(0, 1, 20)),
            |c, cursor| emitted.push((c, cursor)),
        );
        assert_eq!(state, AggregatorState::CaughtUp);
        assert!(emitted.is_empty());

        // Page 2: extends the open bucket
        aggregator.process_page(
            page(vec![trade(2, time(0, 1, 40))], time(0, 1, 40)),
            &FixedClock(time(0, 1, 50)),
            |c, cursor| emitted.push((c, cursor)),
        );
        assert!(emitted.is_empty());

        // Page 3: first trade of 00:02 closes 00:01
        let state = aggregator.process_page(
            page(vec![trade(3, time(0, 2, 1))], time(0, 2, 1)),
            &FixedClock(time(0, 2, 3)),
            |c, cursor| emitted.push((c, cursor)),
        );

        assert_eq!(state, AggregatorState::CaughtUp);
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].0.bucket, time(0, 1, 0));
        assert_eq!(ids(&emitted[0].0), vec![1, 2]);
        assert_eq!(emitted[0].1, Cursor::from(time(0, 2, 1)));
    }

    #[test]
    fn test_empty_page_changes_nothing() {
        let mut aggregator = ClusterAggregator::new(BucketWidth::MINUTE);
        let clock = FixedClock(time(1, 0, 0));
        let mut emitted = 0;

        let state = aggregator.process_page(page(vec![], time(0, 0, 0)), &clock, |_, _| {
            emitted += 1
        });
        assert_eq!(state, AggregatorState::Idle);
        assert_eq!(aggregator.open_bucket(), None);

        aggregator.process_page(page(vec![trade(1, time(0, 0, 1))], time(0, 0, 1)), &clock, |_, _| {
            emitted += 1
        });
        let state = aggregator.process_page(page(vec![], time(0, 0, 5)), &clock, |_, _| {
            emitted += 1
        });

        assert_eq!(emitted, 0);
        assert_eq!(state, AggregatorState::Accumulating);
        assert_eq!(aggregator.open_trades().len(), 1);
    }

    #[test]
    fn test_catch_up_re_evaluated_per_trade() {
        let mut aggregator = ClusterAggregator::new(BucketWidth::MINUTE);

        // Wall clock starts inside 00:01 and moves into 00:02 after the first read
        let clock = SteppingClock {
            now: Cell::new(time(0, 1, 59)),
            step: TimeDelta::seconds(2),
        };

        let state = aggregator.process_page(
            page(
                vec![trade(1, time(0, 1, 10)), trade(2, time(0, 1, 20))],
                time(0, 1, 20),
            ),
            &clock,
            |_, _| {},
        );

        assert_eq!(state, AggregatorState::Accumulating);
    }

    #[test]
    fn test_flush() {
        let mut aggregator = ClusterAggregator::new(BucketWidth::MINUTE);
        assert!(aggregator.flush().is_none());

        aggregator.process_page(
            page(
                vec![trade(2, time(0, 3, 2)), trade(1, time(0, 3, 1))],
                time(0, 3, 2),
            ),
            &FixedClock(time(0, 3, 30)),
            |_, _| {},
        );

        let (cluster, cursor) = aggregator.flush().unwrap();
        assert_eq!(cluster.bucket, time(0, 3, 0));
        assert_eq!(ids(&cluster), vec![1, 2]);
        assert_eq!(cursor, Cursor::from(time(0, 3, 2)));

        assert_eq!(aggregator.state(), AggregatorState::Idle);
        assert!(aggregator.open_trades().is_empty());
        assert!(aggregator.flush().is_none());
    }

    #[test]
    fn test_flush_then_same_bucket_emits_second_cluster_for_bucket() {
        let mut aggregator = ClusterAggregator::new(BucketWidth::MINUTE);
        let clock = FixedClock(time(1, 0, 0));

        aggregator.process_page(
            page(vec![trade(1, time(0, 0, 5))], time(0, 0, 5)),
            &clock,
            |_, _| {},
        );
        let (flushed, _) = aggregator.flush().unwrap();
        assert_eq!(flushed.bucket, time(0, 0, 0));
        assert_eq!(ids(&flushed), vec![1]);

        let mut emitted = Vec::new();
        aggregator.process_page(
            page(vec![trade(2, time(0, 0, 30)), trade(3, time(0, 1, 0))], time(0, 1, 0)),
            &clock,
            |cluster, _| emitted.push(cluster),
        );

        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].bucket, flushed.bucket);
        assert_eq!(ids(&emitted[0]), vec![2]);
    }

    #[test]
    fn test_identical_input_is_idempotent() {
        let run = || {
            let mut aggregator = ClusterAggregator::new(BucketWidth::MINUTE);
            let clock = FixedClock(time(23, 0, 0));
            let mut emitted = Vec::new();

            let pages = vec![
                page(
                    vec![trade(3, time(0, 1, 5)), trade(1, time(0, 0, 5)), trade(2, time(0, 0, 50))],
                    time(0, 1, 5),
                ),
                page(vec![], time(0, 1, 5)),
                page(vec![trade(5, time(0, 3, 0)), trade(4, time(0, 2, 59))], time(0, 3, 0)),
            ];

            for page in pages {
                aggregator.process_page(page, &clock, |cluster, cursor| {
                    emitted.push((cluster, cursor))
                });
            }

            emitted
        };

        let first = run();
        assert_eq!(first.len(), 3);
        assert_eq!(first, run());
    }

    #[test]
    fn test_aggregator_state_display() {
        assert_eq!(AggregatorState::Idle.to_string(), "idle");
        assert_eq!(AggregatorState::Accumulating.to_string(), "accumulating");
        assert_eq!(AggregatorState::CaughtUp.to_string(), "caught_up");
    }
}
