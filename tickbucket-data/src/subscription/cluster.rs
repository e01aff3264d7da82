use super::trade::Trade;
use crate::error::DataError;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// Ordered group of [`Trade`]s sharing the same time bucket.
///
/// Trades are held in ascending id order. A [`Cluster`] is only handed out once it is closed,
/// ie/ once the first trade of a later bucket has been observed (or on an explicit flush).
///
/// Buckets are normally unique across emitted clusters. After a flush, later trades of the
/// flushed bucket arrive in a second [`Cluster`] with the same `bucket`.
#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub struct Cluster {
    pub bucket: DateTime<Utc>,
    pub trades: Vec<Trade>,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn first_id(&self) -> Option<u64> {
        self.trades.first().map(|trade| trade.id)
    }

    pub fn last_id(&self) -> Option<u64> {
        self.trades.last().map(|trade| trade.id)
    }
}

/// Width of the time buckets [`Trade`]s are grouped into (eg/ 1 minute).
///
/// Buckets are aligned to the Unix epoch, so `truncate` of an instant is the greatest multiple
/// of the width that is not after it.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
#[serde(try_from = "Duration", into = "Duration")]
pub struct BucketWidth(Duration);

impl BucketWidth {
    pub const MINUTE: Self = Self(Duration::from_secs(60));
    pub const HOUR: Self = Self(Duration::from_secs(3_600));

    /// Construct a [`BucketWidth`], rejecting zero durations.
    pub fn new(width: Duration) -> Result<Self, DataError> {
        if width.is_zero() {
            return Err(DataError::Config(
                "bucket width must be greater than zero".to_string(),
            ));
        }

        Ok(Self(width))
    }

    pub fn from_secs(secs: u64) -> Result<Self, DataError> {
        Self::new(Duration::from_secs(secs))
    }

    pub fn from_mins(mins: u64) -> Result<Self, DataError> {
        Self::new(Duration::from_secs(mins.saturating_mul(60)))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    /// Truncate `time` down to the start of the bucket it falls in.
    pub fn truncate(&self, time: DateTime<Utc>) -> DateTime<Utc> {
        let nanos = i128::from(time.timestamp()) * NANOS_PER_SECOND
            + i128::from(time.timestamp_subsec_nanos());
        let width = i128::try_from(self.0.as_nanos()).unwrap_or(i128::MAX);
        let remainder = nanos.rem_euclid(width);

        i64::try_from(remainder)
            .ok()
            .and_then(|remainder| time.checked_sub_signed(TimeDelta::nanoseconds(remainder)))
            .unwrap_or(time)
    }
}

impl TryFrom<Duration> for BucketWidth {
    type Error = DataError;

    fn try_from(width: Duration) -> Result<Self, Self::Error> {
        Self::new(width)
    }
}

impl From<BucketWidth> for Duration {
    fn from(width: BucketWidth) -> Self {
        width.0
    }
}

impl std::fmt::Display for BucketWidth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let secs = self.0.as_secs();
        match (secs, self.0.subsec_nanos()) {
            (0, nanos) => write!(f, "{nanos}ns"),
            (secs, 0) if secs % 3_600 == 0 => write!(f, "{}h", secs / 3_600),
            (secs, 0) if secs % 60 == 0 => write!(f, "{}m", secs / 60),
            (secs, 0) => write!(f, "{secs}s"),
            _ => write!(f, "{:?}", self.0),
        }
    }
}
