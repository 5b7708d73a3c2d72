// Currency conversion for displayed prices
// Every price in the pipeline is USD. Conversion happens at display time against an immutable
// rate snapshot; refreshing produces a new snapshot instead of mutating the old one.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum CurrencyError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Rate source returned status {0}")]
    BadStatus(u16),

    #[error("Malformed rate payload: {0}")]
    MalformedPayload(String),
}

pub const BASE_CURRENCY: &str = "USD";

pub const FALLBACK_ADVISORY: &str = "Could not load real-time rates. Using fallback values.";

// Approximate rates used when the live source cannot be reached
const FALLBACK_RATES: [(&str, f64); 5] = [
    ("USD", 1.0),
    ("EUR", 0.93),
    ("GBP", 0.79),
    ("JPY", 157.5),
    ("INR", 83.5),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrencyInfo {
    pub code: &'static str,
    pub symbol: &'static str,
    pub name: &'static str,
    // Shown rounded with thousands separators instead of truncated
    pub zero_decimal: bool,
}

// Display currencies offered by the result page selector
pub static CURRENCIES: [CurrencyInfo; 5] = [
    CurrencyInfo { code: "USD", symbol: "$", name: "US Dollar", zero_decimal: false },
    CurrencyInfo { code: "EUR", symbol: "€", name: "Euro", zero_decimal: false },
    CurrencyInfo { code: "GBP", symbol: "£", name: "British Pound", zero_decimal: false },
    CurrencyInfo { code: "JPY", symbol: "¥", name: "Japanese Yen", zero_decimal: true },
    CurrencyInfo { code: "INR", symbol: "₹", name: "Indian Rupee", zero_decimal: true },
];

pub fn currency_info(code: &str) -> Option<&'static CurrencyInfo> {
    CURRENCIES.iter().find(|c| c.code == code)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateOrigin {
    Live,
    Fallback,
}

// Snapshot of currency code -> units per 1 USD. Always contains USD -> 1.
#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    rates: HashMap<String, f64>,
    origin: RateOrigin,
}

impl RateTable {
    pub fn live(mut rates: HashMap<String, f64>) -> Self {
        rates.retain(|_, rate| rate.is_finite() && *rate > 0.0);
        rates.insert(BASE_CURRENCY.to_string(), 1.0);
        Self {
            rates,
            origin: RateOrigin::Live,
        }
    }

    pub fn fallback() -> Self {
        Self {
            rates: FALLBACK_RATES
                .iter()
                .map(|(code, rate)| (code.to_string(), *rate))
                .collect(),
            origin: RateOrigin::Fallback,
        }
    }

    // Only USD is known until a refresh completes
    pub fn base_only() -> Self {
        Self::live(HashMap::new())
    }

    pub fn rate(&self, code: &str) -> Option<f64> {
        self.rates.get(code).copied()
    }

    pub fn origin(&self) -> RateOrigin {
        self.origin
    }

    // "1 USD = 0.93 EUR", None for USD itself or unknown codes
    pub fn rate_label(&self, code: &str) -> Option<String> {
        if code == BASE_CURRENCY {
            return None;
        }
        self.rate(code)
            .map(|rate| format!("1 {} = {} {}", BASE_CURRENCY, rate, code))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceDisplay {
    Amount(String),
    // No rate known for the requested currency yet
    Pending,
}

impl fmt::Display for PriceDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceDisplay::Amount(text) => f.write_str(text),
            PriceDisplay::Pending => f.write_str("..."),
        }
    }
}

// Convert a USD amount for display. Whole currency units only: zero-decimal currencies are
// rounded and grouped ("¥39,375"), the rest are truncated ("€232").
pub fn convert_price(amount_usd: f64, currency_code: &str, rates: &RateTable) -> PriceDisplay {
    let Some(rate) = rates.rate(currency_code) else {
        return PriceDisplay::Pending;
    };

    let amount_usd = if amount_usd.is_finite() { amount_usd } else { 0.0 };
    let converted = amount_usd * rate;
    let info = currency_info(currency_code);
    let prefix = match info {
        Some(info) => info.symbol.to_string(),
        None => format!("{} ", currency_code),
    };

    let digits = if info.map_or(false, |i| i.zero_decimal) {
        group_thousands(converted.round() as i64)
    } else {
        (converted.trunc() as i64).to_string()
    };

    PriceDisplay::Amount(format!("{}{}", prefix, digits))
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

// Source of live exchange rates relative to USD
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch_rates(&self) -> Result<HashMap<String, f64>, CurrencyError>;
}

#[derive(Debug, Clone)]
pub struct RatesConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.frankfurter.app".to_string(),
            timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LatestRates {
    rates: HashMap<String, f64>,
}

// Frankfurter-style rate endpoint: GET {base_url}/latest?from=USD
pub struct FrankfurterRates {
    client: reqwest::Client,
    config: RatesConfig,
}

impl FrankfurterRates {
    pub fn new(config: RatesConfig) -> Result<Self, CurrencyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| CurrencyError::NetworkError(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn latest_url(&self) -> String {
        format!(
            "{}/latest?from={}",
            self.config.base_url.trim_end_matches('/'),
            BASE_CURRENCY
        )
    }
}

#[async_trait]
impl RateSource for FrankfurterRates {
    async fn fetch_rates(&self) -> Result<HashMap<String, f64>, CurrencyError> {
        let response = self
            .client
            .get(self.latest_url())
            .send()
            .await
            .map_err(|e| CurrencyError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CurrencyError::BadStatus(status.as_u16()));
        }

        let body: LatestRates = response
            .json()
            .await
            .map_err(|e| CurrencyError::MalformedPayload(e.to_string()))?;
        Ok(body.rates)
    }
}

#[derive(Debug, Clone)]
pub struct RateRefresh {
    pub table: RateTable,
    // Set when the fallback table is in use; display still works, values may be stale
    pub advisory: Option<String>,
}

impl RateRefresh {
    pub fn is_fallback(&self) -> bool {
        self.advisory.is_some()
    }
}

// One-shot refresh at session start. Never fails: any error falls back to the fixed table.
pub async fn refresh_rates(source: &dyn RateSource) -> RateRefresh {
    match source.fetch_rates().await {
        Ok(rates) => {
            info!(currencies = rates.len(), "loaded live exchange rates");
            RateRefresh {
                table: RateTable::live(rates),
                advisory: None,
            }
        }
        Err(e) => {
            warn!(error = %e, "failed to fetch live exchange rates, using fallback table");
            RateRefresh {
                table: RateTable::fallback(),
                advisory: Some(FALLBACK_ADVISORY.to_string()),
            }
        }
    }
}
