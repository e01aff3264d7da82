/// REST client, request and raw trade types for the Kraken public `Trades` endpoint.
///
/// See docs: <https://docs.kraken.com/api/docs/rest-api/get-recent-trades>
pub mod rest;
