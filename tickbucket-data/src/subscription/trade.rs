use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tickbucket_instrument::{Liquidity, Side};

use crate::error::DataError;

const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// Normalised public [`Trade`] decoded from an exchange trade history page.
///
/// `id` is exchange assigned and increases with `time` for a given pair, which makes it the
/// authoritative ordering key when pages arrive unsorted.
#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub struct Trade {
    pub id: u64,
    pub price: Decimal,
    pub volume: Decimal,
    pub side: Side,
    pub liquidity: Liquidity,
    pub time: DateTime<Utc>,
}

/// Opaque pagination token returned by a trade history endpoint as its `last` marker.
///
/// A [`Cursor`] is an instant with nanosecond precision. On the wire it is encoded as the
/// number of nanoseconds since the Unix epoch in decimal.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
pub struct Cursor(pub DateTime<Utc>);

impl Cursor {
    /// Construct a [`Cursor`] from a count of nanoseconds since the Unix epoch.
    pub fn from_nanos(nanos: i64) -> Self {
        Self(DateTime::from_timestamp_nanos(nanos))
    }

    /// Parse a decimal nanoseconds-since-epoch string (eg/ a Kraken `last` value).
    pub fn from_nanos_str(value: &str) -> Result<Self, DataError> {
        value
            .trim()
            .parse::<i64>()
            .map(Self::from_nanos)
            .map_err(|error| DataError::Decode(format!("invalid cursor '{value}': {error}")))
    }

    /// Nanoseconds since the Unix epoch.
    pub fn as_nanos(&self) -> i128 {
        i128::from(self.0.timestamp()) * NANOS_PER_SECOND
            + i128::from(self.0.timestamp_subsec_nanos())
    }

    /// Encode the [`Cursor`] as a `since` query parameter value.
    pub fn to_query_value(&self) -> String {
        self.as_nanos().to_string()
    }

    /// The [`Cursor`] one nanosecond later, used as `since` of the following request so the
    /// boundary trade is not fetched twice.
    pub fn successor(&self) -> Self {
        Self(
            self.0
                .checked_add_signed(TimeDelta::nanoseconds(1))
                .unwrap_or(self.0),
        )
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.0
    }
}

impl From<DateTime<Utc>> for Cursor {
    fn from(time: DateTime<Utc>) -> Self {
        Self(time)
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_nanos())
    }
}
