//! Exchange-rate lookup and quote selection.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

use crate::config::{Credential, CurrencyConfig};
use crate::errors::{ResolveError, ValidationError, GENERIC_FETCH_MESSAGE};
use crate::stages::{StageResolver, Validate};
use crate::transport::HttpTransport;

static CURRENCY_CODE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{3}$").ok());

fn is_currency_code(code: &str) -> bool {
    CURRENCY_CODE.as_ref().is_some_and(|re| re.is_match(code))
}

/// A (base, quote) currency selection.
///
/// Either side may be empty: before the user picks a base currency the
/// rate table is still fetched, and an empty quote simply yields no rate.
/// Codes are upper-case; deserialization normalizes them, and validation
/// rejects anything else.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "RawCurrencyPair")]
pub struct CurrencyPair {
    /// Currency the rates are expressed against.
    pub base: String,
    /// Currency to convert into.
    pub quote: String,
}

impl CurrencyPair {
    /// Creates a pair; codes are upper-cased.
    #[must_use]
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into().trim().to_ascii_uppercase(),
            quote: quote.into().trim().to_ascii_uppercase(),
        }
    }
}

#[derive(Deserialize)]
struct RawCurrencyPair {
    #[serde(default)]
    base: String,
    #[serde(default)]
    quote: String,
}

impl From<RawCurrencyPair> for CurrencyPair {
    fn from(raw: RawCurrencyPair) -> Self {
        Self::new(raw.base, raw.quote)
    }
}

impl Validate for CurrencyPair {
    fn validate(&self) -> Result<(), ValidationError> {
        for (field, code) in [("base", &self.base), ("quote", &self.quote)] {
            let code = code.trim();
            if !code.is_empty() && !is_currency_code(code) {
                return Err(ValidationError::new(
                    field,
                    format!("{field} must be a three-letter upper-case currency code"),
                ));
            }
        }
        Ok(())
    }
}

/// Rates returned by the exchange-rate provider for one base currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateTable {
    /// Base currency as requested (may be empty).
    pub base: String,
    /// Quote currency carried through to the selector.
    pub quote: String,
    /// Rate per currency code.
    pub rates: BTreeMap<String, f64>,
}

impl RateTable {
    /// Returns every available currency code, sorted.
    #[must_use]
    pub fn currencies(&self) -> Vec<String> {
        self.rates.keys().cloned().collect()
    }

    /// Returns the rate for `code`, if listed.
    #[must_use]
    pub fn rate(&self, code: &str) -> Option<f64> {
        self.rates.get(code).copied()
    }
}

#[derive(Deserialize)]
struct RatesPayload {
    rates: BTreeMap<String, f64>,
}

/// A successful response that lacked the requested quote currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamDataGap {
    /// Key that was expected in the rate mapping.
    pub missing_key: String,
}

/// The selected rate plus the codes the user can choose from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRate {
    /// Base currency.
    pub base: String,
    /// Quote currency.
    pub quote: String,
    /// Units of `quote` per unit of `base`; NaN when the provider did not
    /// list `quote`.
    pub rate: f64,
    /// Every currency code listed by the provider, sorted.
    pub currencies: Vec<String>,
    /// Set when `rate` is not backed by upstream data.
    pub data_gap: Option<UpstreamDataGap>,
}

impl QuoteRate {
    /// Returns the rate if it came from the provider.
    #[must_use]
    pub fn known_rate(&self) -> Option<f64> {
        if self.data_gap.is_some() {
            None
        } else {
            Some(self.rate)
        }
    }
}

impl std::fmt::Display for QuoteRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.data_gap {
            None => write!(f, "1 {} = {} {}", self.base, self.rate, self.quote),
            Some(gap) => write!(f, "1 {} = NaN {} (no rate listed)", self.base, gap.missing_key),
        }
    }
}

/// Fetches the rate table for the pair's base currency.
pub struct ExchangeRateResolver {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    api_key: Option<Credential>,
}

impl ExchangeRateResolver {
    /// Creates a resolver. The access key is optional.
    #[must_use]
    pub fn new(config: &CurrencyConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

impl std::fmt::Debug for ExchangeRateResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeRateResolver")
            .field("base_url", &self.base_url)
            .field("has_api_key", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl StageResolver for ExchangeRateResolver {
    type Input = CurrencyPair;
    type Output = RateTable;

    fn name(&self) -> &str {
        "exchange_rates"
    }

    async fn resolve(&self, pair: &CurrencyPair) -> Result<RateTable, ResolveError> {
        let mut params = vec![("base", pair.base.clone())];
        if let Some(key) = &self.api_key {
            params.push(("access_key", key.expose().to_string()));
        }

        let payload: RatesPayload = self
            .transport
            .get_json(&self.base_url, &params)
            .await?
            .decode()?;
        debug!(base = %pair.base, rates = payload.rates.len(), "Rate table fetched");

        Ok(RateTable {
            base: pair.base.clone(),
            quote: pair.quote.clone(),
            rates: payload.rates,
        })
    }

    fn failure_message(&self, _error: &ResolveError) -> String {
        GENERIC_FETCH_MESSAGE.to_string()
    }
}

/// Picks the quote currency's rate out of a [`RateTable`]. No I/O.
///
/// A quote missing from the table is passed through as NaN with an
/// [`UpstreamDataGap`] attached; it does not fail the run.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuoteSelector;

impl QuoteSelector {
    /// Selects the quote rate.
    #[must_use]
    pub fn select(table: &RateTable) -> QuoteRate {
        let (rate, data_gap) = match table.rate(&table.quote) {
            Some(rate) => (rate, None),
            None if table.quote.is_empty() => {
                debug!(base = %table.base, "No quote currency selected yet");
                (
                    f64::NAN,
                    Some(UpstreamDataGap {
                        missing_key: String::new(),
                    }),
                )
            }
            None => {
                warn!(
                    base = %table.base,
                    quote = %table.quote,
                    "Quote currency missing from rate table"
                );
                (
                    f64::NAN,
                    Some(UpstreamDataGap {
                        missing_key: table.quote.clone(),
                    }),
                )
            }
        };
        QuoteRate {
            base: table.base.clone(),
            quote: table.quote.clone(),
            rate,
            currencies: table.currencies(),
            data_gap,
        }
    }
}

#[async_trait]
impl StageResolver for QuoteSelector {
    type Input = RateTable;
    type Output = QuoteRate;

    fn name(&self) -> &str {
        "quote_selector"
    }

    async fn resolve(&self, table: &RateTable) -> Result<QuoteRate, ResolveError> {
        Ok(Self::select(table))
    }
}
