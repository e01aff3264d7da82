use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Unique identifier for an exchange whose public trade history can be backfilled.
///
/// ### Notes
/// [`ExchangeId::Mock`] is used by in-memory trade fetchers in tests and demos.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
#[serde(rename = "exchange", rename_all = "snake_case")]
pub enum ExchangeId {
    Mock,
    Kraken,
}

impl ExchangeId {
    /// Return the &str representation of this [`ExchangeId`]
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeId::Mock => "mock",
            ExchangeId::Kraken => "kraken",
        }
    }
}

impl std::str::FromStr for ExchangeId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mock" => Ok(ExchangeId::Mock),
            "kraken" => Ok(ExchangeId::Kraken),
            _ => Err(format!("unrecognised ExchangeId: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_de_exchange_id() {
        assert_eq!(
            serde_json::from_str::<ExchangeId>(r#""kraken""#).unwrap(),
            ExchangeId::Kraken
        );
        assert_eq!(
            serde_json::to_string(&ExchangeId::Mock).unwrap(),
            r#""mock""#
        );
    }

    #[test]
    fn test_from_str_roundtrip() {
        for variant in [ExchangeId::Mock, ExchangeId::Kraken] {
            let parsed: ExchangeId = variant.as_str().parse().unwrap_or_else(|e: String| {
                panic!("failed to parse {:?} from {:?}: {e}", variant, variant.as_str())
            });
            assert_eq!(parsed, variant, "roundtrip failed for {:?}", variant);
        }
    }

    #[test]
    fn test_from_str_case_insensitive() {
        assert_eq!("KRAKEN".parse::<ExchangeId>().unwrap(), ExchangeId::Kraken);
    }

    #[test]
    fn test_from_str_invalid() {
        let result = "not_a_real_exchange".parse::<ExchangeId>();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("not_a_real_exchange"));
    }
}
