use crate::config::ProviderEnvConfig;
use crate::domain::errors::DataUnavailable;
use crate::domain::market::candle::Candle;
use crate::domain::market::symbol::TradingPair;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::ports::CandleSeriesProvider;
use crate::infrastructure::core::http_client_factory::{
    HttpClientFactory, build_url_with_query, get_json,
};
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use tracing::{debug, info, warn};

/// Binance caps a single klines request at this many rows
const MAX_KLINES_LIMIT: usize = 1000;

pub struct BinanceCandleProvider {
    client: ClientWithMiddleware,
    base_url: String,
}

impl BinanceCandleProvider {
    pub fn new(config: &ProviderEnvConfig) -> Self {
        Self {
            client: HttpClientFactory::create_client(config),
            base_url: config.binance_spot_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl CandleSeriesProvider for BinanceCandleProvider {
    async fn fetch_series(
        &self,
        pair: &TradingPair,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Candle>, DataUnavailable> {
        let what = format!("{} {} candles", pair, timeframe);
        let symbol = pair.symbol();
        let limit = count.clamp(1, MAX_KLINES_LIMIT).to_string();

        let url = build_url_with_query(
            &format!("{}/api/v3/klines", self.base_url),
            &[
                ("symbol", symbol.as_str()),
                ("interval", timeframe.to_binance_string()),
                ("limit", limit.as_str()),
            ],
        );
        debug!("BinanceCandleProvider: GET {}", url);

        let klines: Vec<serde_json::Value> = get_json(&self.client, &url, &what).await?;
        let raw_len = klines.len();
        let candles = parse_klines(&klines);

        if candles.len() < raw_len {
            warn!(
                "BinanceCandleProvider [{}]: Dropped {} malformed {} rows",
                symbol,
                raw_len - candles.len(),
                timeframe
            );
        }
        if candles.is_empty() {
            return Err(DataUnavailable::new(what, "exchange returned no candles"));
        }

        info!(
            "BinanceCandleProvider [{}]: Fetched {} {} bars",
            symbol,
            candles.len(),
            timeframe
        );
        Ok(candles)
    }
}

/// Klines rows are `[open_time, open, high, low, close, volume, ...]` with
/// prices as strings. Rows that don't fit are skipped.
pub fn parse_klines(rows: &[serde_json::Value]) -> Vec<Candle> {
    let mut candles: Vec<Candle> = rows
        .iter()
        .filter_map(|k| {
            let arr = k.as_array()?;
            if arr.len() < 6 {
                return None;
            }

            let timestamp = arr[0].as_i64()?;
            let open = arr[1].as_str()?.parse::<f64>().ok()?;
            let high = arr[2].as_str()?.parse::<f64>().ok()?;
            let low = arr[3].as_str()?.parse::<f64>().ok()?;
            let close = arr[4].as_str()?.parse::<f64>().ok()?;
            let volume = arr[5].as_str()?.parse::<f64>().ok()?;

            Some(Candle::new(timestamp, open, high, low, close, volume))
        })
        .collect();

    candles.sort_by_key(|c| c.timestamp);
    candles
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_klines() {
        let rows = vec![
            json!([1700000900000i64, "101.0", "103.0", "100.5", "102.0", "12.5", 1700001799999i64]),
            json!([1700000000000i64, "100.0", "102.0", "99.0", "101.0", "10.0", 1700000899999i64]),
        ];

        let candles = parse_klines(&rows);
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].timestamp, 1700000000000);
        assert_eq!(candles[0].close, 101.0);
        assert_eq!(candles[1].volume, 12.5);
        assert!(candles[1].indicators.rsi.is_none());
    }

    #[test]
    fn test_parse_klines_skips_malformed_rows() {
        let rows = vec![
            json!([1700000000000i64, "100.0", "102.0"]),
            json!([1700000000000i64, "abc", "102.0", "99.0", "101.0", "10.0"]),
            json!({"open": "1.0"}),
            json!([1700000900000i64, "1.0", "1.0", "1.0", "1.0", "1.0"]),
        ];

        let candles = parse_klines(&rows);
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].timestamp, 1700000900000);
    }
}
