//! Exchange rate sources for displaying balances in other currencies.
//!
//! Rates are only ever used to render a balance. They never reach the write path.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use url::Url;

use crate::error::AppError;

/// Source of exchange rates.
///
/// `rate(from, to)` is the number of `to` units one `from` unit buys.
#[async_trait]
pub trait RateSource: Send + Sync + 'static {
    async fn rate(&self, from: &str, to: &str) -> Result<Decimal, AppError>;
}

/// Rates kept in process. Used by tests and offline runs.
///
/// A pair registered as `from -> to` also answers `to -> from` with the inverse.
#[derive(Debug, Clone, Default)]
pub struct FixedRates {
    rates: HashMap<(String, String), Decimal>,
}

impl FixedRates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(mut self, from: &str, to: &str, rate: Decimal) -> Self {
        self.rates.insert((from.to_string(), to.to_string()), rate);
        self
    }
}

#[async_trait]
impl RateSource for FixedRates {
    async fn rate(&self, from: &str, to: &str) -> Result<Decimal, AppError> {
        if from == to {
            return Ok(Decimal::ONE);
        }
        if let Some(rate) = self.rates.get(&(from.to_string(), to.to_string())) {
            return Ok(*rate);
        }
        self.rates
            .get(&(to.to_string(), from.to_string()))
            .and_then(|inverse| Decimal::ONE.checked_div(*inverse))
            .ok_or_else(|| AppError::RateUnavailable(format!("no rate for {from}/{to}")))
    }
}

/// Body of an exchangeratesapi.io style `latest` response.
///
/// Rates are relative to `base`. With serde_json's `arbitrary_precision`
/// the numbers keep their textual form and are parsed straight into decimals.
#[derive(Debug, Deserialize)]
struct LatestRates {
    base: String,
    rates: HashMap<String, serde_json::Number>,
}

impl LatestRates {
    /// Units of `code` per one unit of the base currency.
    fn per_base(&self, code: &str) -> Result<Decimal, AppError> {
        if code == self.base {
            return Ok(Decimal::ONE);
        }
        let number = self
            .rates
            .get(code)
            .ok_or_else(|| AppError::RateUnavailable(format!("feed has no rate for {code}")))?;
        let text = number.to_string();
        Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .map_err(|_| AppError::RateUnavailable(format!("unparseable rate {text} for {code}")))
    }

    fn cross_rate(&self, from: &str, to: &str) -> Result<Decimal, AppError> {
        let from_rate = self.per_base(from)?;
        let to_rate = self.per_base(to)?;
        to_rate
            .checked_div(from_rate)
            .ok_or_else(|| AppError::RateUnavailable(format!("zero rate for {from}")))
    }
}

/// Client for an exchangeratesapi.io compatible feed.
#[derive(Debug, Clone)]
pub struct ExchangeRatesApi {
    client: reqwest::Client,
    url: Url,
}

impl ExchangeRatesApi {
    /// # Arguments
    ///
    /// * `endpoint` - URL of the `latest` rates resource
    /// * `access_key` - Appended as the `access_key` query parameter when present
    /// * `timeout` - Per-request HTTP timeout
    pub fn new(endpoint: &str, access_key: Option<&str>, timeout: Duration) -> Result<Self, AppError> {
        let mut url = Url::parse(endpoint)
            .map_err(|e| AppError::Internal(format!("invalid rates URL {endpoint:?}: {e}")))?;
        if let Some(key) = access_key {
            url.query_pairs_mut().append_pair("access_key", key);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("HTTP client error: {e}")))?;

        Ok(Self { client, url })
    }

    async fn latest(&self) -> Result<LatestRates, AppError> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| AppError::RateUnavailable(format!("rate feed request failed: {e}")))?;

        response
            .json::<LatestRates>()
            .await
            .map_err(|e| AppError::RateUnavailable(format!("failed to decode rate feed: {e}")))
    }
}

#[async_trait]
impl RateSource for ExchangeRatesApi {
    async fn rate(&self, from: &str, to: &str) -> Result<Decimal, AppError> {
        if from == to {
            return Ok(Decimal::ONE);
        }
        let latest = self.latest().await?;
        let rate = latest.cross_rate(from, to)?;
        tracing::debug!(%from, %to, %rate, "fetched exchange rate");
        Ok(rate)
    }
}
