use crate::{de::extract_next, error::DataError, subscription::trade::Trade};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use smol_str::SmolStr;
use tickbucket_instrument::{Liquidity, Side, pair::Pair};

/// Number of fractional digits in a nanosecond precision timestamp.
const NANOS_DIGITS: usize = 9;

/// Top-level Kraken `Trades` response.
///
/// Kraken returns:
/// ```json
/// {
///   "error": [],
///   "result": {
///     "XXBTZUSD": [
///       ["30243.40000", "0.34507674", 1688669448.6855, "b", "m", "", 61031431],
///       ...
///     ],
///     "last": "1688671969993150842"
///   }
/// }
/// ```
///
/// Failed requests may omit `result` entirely and only populate `error`.
#[derive(Debug, Deserialize)]
pub struct KrakenTradesResponse {
    #[serde(default)]
    pub error: Vec<String>,
    #[serde(default)]
    pub result: Option<KrakenTradesResult>,
}

impl KrakenTradesResponse {
    /// Validate the response envelope and return the raw trades with the `last` cursor value.
    pub fn into_result(self) -> Result<KrakenTradesResult, DataError> {
        if !self.error.is_empty() {
            return Err(DataError::Api(self.error.join("; ")));
        }

        self.result
            .ok_or_else(|| DataError::Decode("Kraken Trades response has no result".to_string()))
    }
}

/// Kraken `Trades` result object: one pair-keyed trade array plus the `last` cursor.
///
/// The pair key in the response may differ from the requested pair (eg/ "XXBTZUSD" vs
/// "XBTUSD"), so the single key that is not `last` is taken as the trade array.
#[derive(Debug)]
pub struct KrakenTradesResult {
    pub pair: Option<SmolStr>,
    pub trades: Vec<KrakenTradeRaw>,
    /// Nanoseconds since epoch in decimal, exactly as returned.
    pub last: String,
}

impl<'de> Deserialize<'de> for KrakenTradesResult {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        struct ResultVisitor;

        impl<'de> serde::de::Visitor<'de> for ResultVisitor {
            type Value = KrakenTradesResult;

            fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                formatter.write_str("a Kraken Trades result object with a pair key and `last`")
            }

            fn visit_map<MapAccessor>(
                self,
                mut map: MapAccessor,
            ) -> Result<Self::Value, MapAccessor::Error>
            where
                MapAccessor: serde::de::MapAccess<'de>,
            {
                let mut pair: Option<SmolStr> = None;
                let mut trades = Vec::new();
                let mut last: Option<String> = None;

                while let Some(key) = map.next_key::<SmolStr>()? {
                    if key.as_str() == "last" {
                        last = Some(map.next_value::<KrakenLast>()?.0);
                    } else if let Some(existing) = &pair {
                        return Err(serde::de::Error::custom(format!(
                            "unexpected second pair key '{key}' alongside '{existing}'"
                        )));
                    } else {
                        trades = map.next_value::<Vec<KrakenTradeRaw>>()?;
                        pair = Some(key);
                    }
                }

                let last = last.ok_or_else(|| serde::de::Error::missing_field("last"))?;

                Ok(KrakenTradesResult {
                    pair,
                    trades,
                    last,
                })
            }
        }

        deserializer.deserialize_map(ResultVisitor)
    }
}

/// Kraken `last` cursor, sent as a decimal string but tolerated as a JSON integer.
struct KrakenLast(String);

impl<'de> Deserialize<'de> for KrakenLast {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        struct LastVisitor;

        impl serde::de::Visitor<'_> for LastVisitor {
            type Value = KrakenLast;

            fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                formatter.write_str("a nanosecond timestamp as a decimal string or integer")
            }

            fn visit_str<E: serde::de::Error>(self, value: &str) -> Result<Self::Value, E> {
                Ok(KrakenLast(value.to_owned()))
            }

            fn visit_u64<E: serde::de::Error>(self, value: u64) -> Result<Self::Value, E> {
                Ok(KrakenLast(value.to_string()))
            }

            fn visit_i64<E: serde::de::Error>(self, value: i64) -> Result<Self::Value, E> {
                Ok(KrakenLast(value.to_string()))
            }
        }

        deserializer.deserialize_any(LastVisitor)
    }
}

/// Raw trade record returned by the Kraken `Trades` endpoint.
///
/// Kraken returns each trade as a positional array:
/// `[price, volume, time, buy/sell, market/limit, miscellaneous, trade_id]`
///
/// - `price` & `volume` are decimal strings
/// - `time` is a fixed-point decimal of epoch seconds, kept as its exact JSON text
/// - `trade_id` is an integer
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct KrakenTradeRaw {
    pub price: String,
    pub volume: String,
    pub time: String,
    pub side: String,
    pub order_type: String,
    pub trade_id: u64,
}

impl<'de> Deserialize<'de> for KrakenTradeRaw {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        struct KrakenTradeVisitor;

        impl<'de> serde::de::Visitor<'de> for KrakenTradeVisitor {
            type Value = KrakenTradeRaw;

            fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                formatter.write_str("a Kraken trade array with at least 7 elements")
            }

            fn visit_seq<SeqAccessor>(
                self,
                mut seq: SeqAccessor,
            ) -> Result<Self::Value, SeqAccessor::Error>
            where
                SeqAccessor: serde::de::SeqAccess<'de>,
            {
                // Kraken trade array layout:
                // [0] price         (String)
                // [1] volume        (String)
                // [2] time          (fixed-point epoch seconds)
                // [3] buy/sell      ("b" | "s")
                // [4] market/limit  ("m" | "l")
                // [5] miscellaneous (ignored)
                // [6] trade_id      (u64)
                let price = extract_next(&mut seq, "price")?;
                let volume = extract_next(&mut seq, "volume")?;
                let time = extract_next::<SeqAccessor, Box<RawValue>>(&mut seq, "time")?
                    .get()
                    .to_owned();
                let side = extract_next(&mut seq, "side")?;
                let order_type = extract_next(&mut seq, "order_type")?;
                let _: serde::de::IgnoredAny = extract_next(&mut seq, "miscellaneous")?;
                let trade_id = extract_next(&mut seq, "trade_id")?;

                // Ignore any additional elements or SerDe will fail
                //  '--> Exchange may add fields without warning
                while seq.next_element::<serde::de::IgnoredAny>()?.is_some() {}

                Ok(KrakenTradeRaw {
                    price,
                    volume,
                    time,
                    side,
                    order_type,
                    trade_id,
                })
            }
        }

        deserializer.deserialize_seq(KrakenTradeVisitor)
    }
}

impl TryFrom<KrakenTradeRaw> for Trade {
    type Error = DataError;

    fn try_from(raw: KrakenTradeRaw) -> Result<Self, Self::Error> {
        Ok(Trade {
            id: raw.trade_id,
            price: parse_decimal(&raw.price, "price")?,
            volume: parse_decimal(&raw.volume, "volume")?,
            side: if raw.side == "b" { Side::Buy } else { Side::Sell },
            liquidity: if raw.order_type == "m" {
                Liquidity::Market
            } else {
                Liquidity::Limit
            },
            time: parse_trade_time(&raw.time)?,
        })
    }
}

/// Parse a decimal string without any rounding.
fn parse_decimal(value: &str, field: &str) -> Result<Decimal, DataError> {
    Decimal::from_str_exact(value)
        .map_err(|error| DataError::Decode(format!("failed to parse {field} '{value}': {error}")))
}

/// Parse a Kraken fixed-point epoch seconds timestamp (eg/ `1688669448.6855`) to a
/// [`DateTime<Utc>`] by slicing its text, never via a float.
///
/// The integer part gives whole seconds; fractional digits are right-padded (or truncated) to
/// nanoseconds. Accepts the value as a bare JSON number or a JSON string.
pub fn parse_trade_time(text: &str) -> Result<DateTime<Utc>, DataError> {
    let invalid = || DataError::Decode(format!("invalid trade time '{text}'"));

    let value = text.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|value| value.strip_suffix('"'))
        .unwrap_or(value);

    let (seconds, fraction) = value.split_once('.').unwrap_or((value, ""));

    if seconds.is_empty()
        || !seconds.bytes().all(|byte| byte.is_ascii_digit())
        || !fraction.bytes().all(|byte| byte.is_ascii_digit())
    {
        return Err(invalid());
    }

    let seconds = seconds.parse::<i64>().map_err(|_| invalid())?;

    let fraction = &fraction[..fraction.len().min(NANOS_DIGITS)];
    let nanos = format!("{fraction:0<width$}", width = NANOS_DIGITS)
        .parse::<u32>()
        .map_err(|_| invalid())?;

    DateTime::from_timestamp(seconds, nanos).ok_or_else(invalid)
}

/// REST request to fetch public trade history from the Kraken API.
///
/// Endpoint: `GET /0/public/Trades`
#[derive(Debug, Clone)]
pub struct GetKrakenTrades {
    /// Query parameters for the Trades request.
    pub params: GetKrakenTradesParams,
}

impl GetKrakenTrades {
    pub const PATH: &'static str = "/0/public/Trades";

    pub fn path(&self) -> &'static str {
        Self::PATH
    }

    pub fn method() -> reqwest::Method {
        reqwest::Method::GET
    }

    pub fn query_params(&self) -> &GetKrakenTradesParams {
        &self.params
    }
}

/// Query parameters for a Kraken Trades REST request.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct GetKrakenTradesParams {
    /// Upper-case trading pair (eg/ "XBTUSD").
    pub pair: Pair,
    /// Cursor in nanoseconds since epoch. Kraken returns trades after this instant.
    pub since: String,
    /// Maximum number of trades in the page.
    pub count: u32,
}
