use serde::{Deserialize, Serialize};
use smol_str::{SmolStr, StrExt};

/// Exchange trading pair symbol (eg/ "XBTUSD").
///
/// Symbols are normalised to upper-case on construction since Kraken's `Trades` endpoint
/// expects upper-case `pair` query parameters.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
#[serde(from = "SmolStr", into = "SmolStr")]
pub struct Pair(SmolStr);

impl Pair {
    pub fn new<S: AsRef<str>>(symbol: S) -> Self {
        Self(symbol.as_ref().trim().to_uppercase_smolstr())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<str> for Pair {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Pair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Pair {
    fn from(symbol: &str) -> Self {
        Self::new(symbol)
    }
}

impl From<String> for Pair {
    fn from(symbol: String) -> Self {
        Self::new(symbol)
    }
}

impl From<SmolStr> for Pair {
    fn from(symbol: SmolStr) -> Self {
        Self::new(symbol)
    }
}

impl From<Pair> for SmolStr {
    fn from(pair: Pair) -> Self {
        pair.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_is_upper_cased() {
        assert_eq!(Pair::new("xbtusd").as_str(), "XBTUSD");
        assert_eq!(Pair::from(" ethEur ").as_str(), "ETHEUR");
    }

    #[test]
    fn test_de_pair_normalises_case() {
        let pair: Pair = serde_json::from_str(r#""solusd""#).unwrap();
        assert_eq!(pair, Pair::new("SOLUSD"));
        assert_eq!(serde_json::to_string(&pair).unwrap(), r#""SOLUSD""#);
    }
}
