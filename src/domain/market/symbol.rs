use serde::{Deserialize, Serialize};
use std::fmt;

/// Quote currencies recognised at the end of a user-supplied symbol (longest first)
pub const KNOWN_QUOTES: &[&str] = &["FDUSD", "USDT", "USDC", "BUSD"];

/// Exchange pair such as `BTCUSDT`, split into base and quote.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TradingPair {
    pub base: String,
    pub quote: String,
}

impl TradingPair {
    /// Normalizes user input into a pair.
    ///
    /// Separators (`/`, `-`, `_`) are stripped and the default quote is appended
    /// when the input does not already end with a known quote.
    ///
    /// ```
    /// use coinsight::domain::market::symbol::TradingPair;
    ///
    /// assert_eq!(TradingPair::parse("btc", "USDT").unwrap().to_string(), "BTCUSDT");
    /// assert_eq!(TradingPair::parse("eth/usdt", "USDT").unwrap().to_string(), "ETHUSDT");
    /// assert_eq!(TradingPair::parse("SOL-USDC", "USDT").unwrap().to_string(), "SOLUSDC");
    /// assert!(TradingPair::parse("  ", "USDT").is_err());
    /// ```
    pub fn parse(symbol: &str, default_quote: &str) -> Result<Self, String> {
        let cleaned: String = symbol
            .trim()
            .chars()
            .filter(|c| !matches!(c, '/' | '-' | '_'))
            .collect::<String>()
            .to_uppercase();

        if cleaned.is_empty() {
            return Err("Cannot normalize empty symbol".to_string());
        }
        if !cleaned.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(format!("Symbol '{}' contains unsupported characters", symbol.trim()));
        }

        for quote in KNOWN_QUOTES {
            if cleaned.len() > quote.len() && cleaned.ends_with(quote) {
                let base = &cleaned[..cleaned.len() - quote.len()];
                return Ok(Self {
                    base: base.to_string(),
                    quote: quote.to_string(),
                });
            }
        }

        Ok(Self {
            base: cleaned,
            quote: default_quote.to_uppercase(),
        })
    }

    /// Exchange form without separator, e.g. `BTCUSDT`
    pub fn symbol(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }
}

impl fmt::Display for TradingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.base, self.quote)
    }
}
