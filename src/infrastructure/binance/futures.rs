use crate::config::ProviderEnvConfig;
use crate::domain::errors::DataUnavailable;
use crate::domain::market::metrics::{FuturesMetrics, OnChainMetrics};
use crate::domain::market::symbol::TradingPair;
use crate::domain::ports::AuxiliaryMetricsProvider;
use crate::infrastructure::core::http_client_factory::{
    HttpClientFactory, build_url_with_query, get_json,
};
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PremiumIndex {
    last_funding_rate: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenInterest {
    open_interest: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LongShortRatio {
    long_short_ratio: String,
}

/// Funding, open interest and account long/short ratio from the futures API.
/// Binance has no on-chain valuation feed, so `onchain_metrics` always reports
/// the data as unavailable.
pub struct BinanceMetricsProvider {
    client: ClientWithMiddleware,
    base_url: String,
}

impl BinanceMetricsProvider {
    pub fn new(config: &ProviderEnvConfig) -> Self {
        Self {
            client: HttpClientFactory::create_client(config),
            base_url: config.binance_futures_url.trim_end_matches('/').to_string(),
        }
    }

    async fn funding_rate(&self, symbol: &str) -> Result<f64, DataUnavailable> {
        let url = build_url_with_query(
            &format!("{}/fapi/v1/premiumIndex", self.base_url),
            &[("symbol", symbol)],
        );
        let index: PremiumIndex = get_json(&self.client, &url, "funding rate").await?;
        parse_number(&index.last_funding_rate, "funding rate")
    }

    async fn open_interest(&self, symbol: &str) -> Result<f64, DataUnavailable> {
        let url = build_url_with_query(
            &format!("{}/fapi/v1/openInterest", self.base_url),
            &[("symbol", symbol)],
        );
        let oi: OpenInterest = get_json(&self.client, &url, "open interest").await?;
        parse_number(&oi.open_interest, "open interest")
    }

    async fn long_short_ratio(&self, symbol: &str) -> Result<f64, DataUnavailable> {
        let url = build_url_with_query(
            &format!("{}/futures/data/globalLongShortAccountRatio", self.base_url),
            &[("symbol", symbol), ("period", "1h"), ("limit", "1")],
        );
        let rows: Vec<LongShortRatio> = get_json(&self.client, &url, "long/short ratio").await?;
        let latest = rows
            .last()
            .ok_or_else(|| DataUnavailable::new("long/short ratio", "empty response"))?;
        parse_number(&latest.long_short_ratio, "long/short ratio")
    }
}

fn parse_number(raw: &str, what: &str) -> Result<f64, DataUnavailable> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| DataUnavailable::new(what, format!("not a number: '{}'", raw)))
}

/// Keeps the successful reads; a field that failed is logged and left absent.
fn assemble(
    symbol: &str,
    funding: Result<f64, DataUnavailable>,
    open_interest: Result<f64, DataUnavailable>,
    long_short: Result<f64, DataUnavailable>,
) -> Result<FuturesMetrics, DataUnavailable> {
    let keep = |r: Result<f64, DataUnavailable>| match r {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("BinanceMetricsProvider [{}]: {}", symbol, e);
            None
        }
    };

    let metrics = FuturesMetrics {
        funding_rate: keep(funding),
        open_interest: keep(open_interest),
        long_short_ratio: keep(long_short),
    };

    if metrics.is_empty() {
        return Err(DataUnavailable::new(
            format!("{} futures metrics", symbol),
            "every futures endpoint failed",
        ));
    }
    Ok(metrics)
}

#[async_trait]
impl AuxiliaryMetricsProvider for BinanceMetricsProvider {
    async fn futures_metrics(&self, pair: &TradingPair) -> Result<FuturesMetrics, DataUnavailable> {
        let symbol = pair.symbol();
        debug!("BinanceMetricsProvider [{}]: Fetching futures metrics", symbol);

        let (funding, oi, ls) = tokio::join!(
            self.funding_rate(&symbol),
            self.open_interest(&symbol),
            self.long_short_ratio(&symbol)
        );

        assemble(&symbol, funding, oi, ls)
    }

    async fn onchain_metrics(&self, pair: &TradingPair) -> Result<OnChainMetrics, DataUnavailable> {
        Err(DataUnavailable::new(
            format!("{} on-chain metrics", pair),
            "no on-chain source configured for Binance",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gone(what: &str) -> Result<f64, DataUnavailable> {
        Err(DataUnavailable::new(what, "HTTP 400"))
    }

    #[test]
    fn test_assemble_keeps_partial_reads() {
        let metrics = assemble("BTCUSDT", Ok(0.0001), gone("open interest"), Ok(1.2)).unwrap();
        assert_eq!(metrics.funding_rate, Some(0.0001));
        assert_eq!(metrics.open_interest, None);
        assert_eq!(metrics.long_short_ratio, Some(1.2));
    }

    #[test]
    fn test_assemble_fails_when_everything_failed() {
        let err = assemble("BTCUSDT", gone("a"), gone("b"), gone("c")).unwrap_err();
        assert!(err.reason.contains("every futures endpoint failed"));
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("0.00010000", "x").unwrap(), 0.0001);
        assert!(parse_number("NaN", "x").is_err());
        assert!(parse_number("", "x").is_err());
    }

    #[test]
    fn test_response_shapes_deserialize() {
        let p: PremiumIndex =
            serde_json::from_str(r#"{"symbol":"BTCUSDT","lastFundingRate":"0.00010000"}"#).unwrap();
        assert_eq!(p.last_funding_rate, "0.00010000");
        let r: Vec<LongShortRatio> = serde_json::from_str(
            r#"[{"symbol":"BTCUSDT","longShortRatio":"1.8105","longAccount":"0.6442"}]"#,
        )
        .unwrap();
        assert_eq!(r[0].long_short_ratio, "1.8105");
    }

    #[tokio::test]
    async fn test_onchain_is_always_unavailable() {
        let provider = BinanceMetricsProvider::new(&ProviderEnvConfig::default());
        let pair = TradingPair::parse("BTC", "USDT").unwrap();
        assert!(provider.onchain_metrics(&pair).await.is_err());
    }
}
