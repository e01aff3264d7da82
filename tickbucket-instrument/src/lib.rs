#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cast_possible_truncation,
    clippy::unused_self,
    clippy::cast_lossless,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! # Tickbucket-Instrument
//! Core vocabulary shared by the tickbucket crates: [`ExchangeId`](exchange::ExchangeId),
//! trading [`Pair`](pair::Pair) symbols, and the [`Side`] / [`Liquidity`] of a public trade.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Exchange identifiers.
pub mod exchange;

/// Trading pair symbols.
pub mod pair;

/// Aggressor side of a public trade.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    #[display("buy")]
    Buy,
    #[display("sell")]
    Sell,
}

/// Order type that produced a public trade.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
#[serde(rename_all = "snake_case")]
pub enum Liquidity {
    #[display("market")]
    Market,
    #[display("limit")]
    Limit,
}
