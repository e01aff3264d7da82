use crate::{
    error::DataError,
    rest::{TradeFetcher, TradePage},
    subscription::trade::{Cursor, Trade},
};
use serde::Deserialize;
use std::{future::Future, time::Duration};
use tickbucket_instrument::{exchange::ExchangeId, pair::Pair};
use tracing::{Instrument, debug, warn};
use url::Url;

/// Kraken `Trades` request, raw DTOs, and conversion to [`Trade`].
pub mod trades;

/// Kraken REST API base URL.
pub const KRAKEN_REST_BASE_URL: &str = "https://api.kraken.com";

/// Maximum `count` accepted by the Kraken `Trades` endpoint.
pub const KRAKEN_MAX_PAGE_SIZE: u32 = 1000;

/// Configuration for a [`KrakenRestClient`].
#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct KrakenRestConfig {
    /// Base URL requests are issued against.
    pub base_url: String,
    /// Number of trades requested per page (`count`).
    pub page_size: u32,
    /// Timeout applied to every request.
    pub timeout: Duration,
}

impl Default for KrakenRestConfig {
    fn default() -> Self {
        Self {
            base_url: KRAKEN_REST_BASE_URL.to_owned(),
            page_size: KRAKEN_MAX_PAGE_SIZE,
            timeout: Duration::from_secs(30),
        }
    }
}

impl KrakenRestConfig {
    fn validate(&self) -> Result<Url, DataError> {
        if !(1..=KRAKEN_MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(DataError::Config(format!(
                "page_size must be within 1..={KRAKEN_MAX_PAGE_SIZE}, got {}",
                self.page_size
            )));
        }

        if self.timeout.is_zero() {
            return Err(DataError::Config("timeout must be greater than zero".to_string()));
        }

        Url::parse(&self.base_url).map_err(|error| {
            DataError::Config(format!("invalid base_url '{}': {error}", self.base_url))
        })
    }
}

/// REST client for the Kraken public `Trades` endpoint.
///
/// Every call to [`TradeFetcher::fetch_trades`] issues exactly one request. Rate limiting is
/// left to the caller (see [`TradePoller`](crate::streams::poller::TradePoller)), as is retrying.
#[derive(Debug, Clone)]
pub struct KrakenRestClient {
    http: reqwest::Client,
    base_url: Url,
    page_size: u32,
}

impl KrakenRestClient {
    /// Construct a new [`KrakenRestClient`] using the default Kraken base URL.
    pub fn new() -> Result<Self, DataError> {
        Self::from_config(KrakenRestConfig::default())
    }

    /// Construct a [`KrakenRestClient`] with a custom base URL.
    ///
    /// Useful for testing with a mock server where the URL is not known at compile time.
    pub fn with_base_url(base_url: String) -> Result<Self, DataError> {
        Self::from_config(KrakenRestConfig {
            base_url,
            ..KrakenRestConfig::default()
        })
    }

    /// Construct a [`KrakenRestClient`] from a validated [`KrakenRestConfig`].
    pub fn from_config(config: KrakenRestConfig) -> Result<Self, DataError> {
        let base_url = config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|error| DataError::Config(format!("failed to build HTTP client: {error}")))?;

        Ok(Self {
            http,
            base_url,
            page_size: config.page_size,
        })
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Fetch a single page of trades and the `last` cursor from the Kraken response.
    async fn fetch_page(&self, pair: &Pair, since: Cursor) -> Result<TradePage, DataError> {
        let request = trades::GetKrakenTrades {
            params: trades::GetKrakenTradesParams {
                pair: pair.clone(),
                since: since.to_query_value(),
                count: self.page_size,
            },
        };

        let url = self
            .base_url
            .join(request.path())
            .map_err(|error| DataError::Config(format!("invalid request url: {error}")))?;

        let response = self
            .http
            .request(trades::GetKrakenTrades::method(), url)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(request.query_params())
            .send()
            .await
            .inspect_err(|error| warn!(?error, "Kraken Trades request failed"))?;

        let status = response.status();
        if let Some(error) = DataError::from_status(status) {
            warn!(%status, ?error, "Kraken Trades request rejected");
            return Err(error);
        }

        let body = response.bytes().await?;

        let result = serde_json::from_slice::<trades::KrakenTradesResponse>(&body)?
            .into_result()
            .inspect_err(|error| warn!(?error, "Kraken Trades response invalid"))?;

        let trades = result
            .trades
            .into_iter()
            .map(Trade::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let last = Cursor::from_nanos_str(&result.last)?;

        debug!(
            count = trades.len(),
            response_pair = ?result.pair,
            %last,
            "fetched Kraken Trades page"
        );

        Ok(TradePage { trades, last })
    }
}

impl TradeFetcher for KrakenRestClient {
    const EXCHANGE: ExchangeId = ExchangeId::Kraken;

    /// Fetch one page of public trades from the Kraken REST API.
    ///
    /// Builds a [`GetKrakenTrades`](trades::GetKrakenTrades) request, maps non-success
    /// statuses to [`DataError`] before reading the body, and decodes every raw trade,
    /// failing the whole page on the first malformed record.
    fn fetch_trades(
        &self,
        pair: &Pair,
        since: Cursor,
    ) -> impl Future<Output = Result<TradePage, DataError>> + Send {
        let this = self.clone();
        let pair = pair.clone();
        let span = tracing::debug_span!(
            "fetch_trades",
            exchange = %Self::EXCHANGE,
            %pair,
            %since,
        );

        async move { this.fetch_page(&pair, since).await }.instrument(span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kraken_rest_config_default() {
        let config = KrakenRestConfig::default();
        assert_eq!(config.base_url, "https://api.kraken.com");
        assert_eq!(config.page_size, 1000);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_de_kraken_rest_config_partial() {
        let config: KrakenRestConfig = serde_json::from_str(r#"{"page_size": 10}"#).unwrap();
        assert_eq!(config.page_size, 10);
        assert_eq!(config.base_url, KRAKEN_REST_BASE_URL);

        let client = KrakenRestClient::from_config(config).unwrap();
        assert_eq!(client.page_size(), 10);
    }

    #[test]
    fn test_kraken_rest_config_invalid() {
        struct TestCase {
            input: KrakenRestConfig,
        }

        let tests = vec![
            // TC0: zero page size
            TestCase {
                input: KrakenRestConfig {
                    page_size: 0,
                    ..KrakenRestConfig::default()
                },
            },
            // TC1: page size above the endpoint maximum
            TestCase {
                input: KrakenRestConfig {
                    page_size: 1001,
                    ..KrakenRestConfig::default()
                },
            },
            // TC2: unparsable base url
            TestCase {
                input: KrakenRestConfig {
                    base_url: "not a url".to_string(),
                    ..KrakenRestConfig::default()
                },
            },
            // TC3: zero timeout
            TestCase {
                input: KrakenRestConfig {
                    timeout: Duration::ZERO,
                    ..KrakenRestConfig::default()
                },
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            assert!(
                matches!(
                    KrakenRestClient::from_config(test.input),
                    Err(DataError::Config(_))
                ),
                "TC{index} failed"
            );
        }
    }
}
