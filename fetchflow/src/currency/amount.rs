//! Derived amount computation.

use serde::{Deserialize, Serialize};

use super::rates::QuoteRate;

/// Converts `amount` at `rate`.
///
/// Returns `None` when no rate is available, meaning the displayed value
/// should not change. A NaN rate is a rate: it propagates.
#[must_use]
pub fn derive_amount(amount: f64, rate: Option<f64>) -> Option<f64> {
    rate.map(|rate| amount * rate)
}

/// Holds the amount being converted and the last displayed result.
///
/// Recomputes whenever the amount or the rate changes, regardless of
/// whether a rate lookup is in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyConverter {
    base: String,
    quote: String,
    amount: f64,
    rate: Option<f64>,
    converted: Option<f64>,
}

impl Default for CurrencyConverter {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl CurrencyConverter {
    /// Creates a converter with no rate yet.
    #[must_use]
    pub fn new(amount: f64) -> Self {
        Self {
            base: String::new(),
            quote: String::new(),
            amount,
            rate: None,
            converted: None,
        }
    }

    /// Amount being converted.
    #[must_use]
    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// Current rate, if one has been applied.
    #[must_use]
    pub fn rate(&self) -> Option<f64> {
        self.rate
    }

    /// Last computed result.
    #[must_use]
    pub fn converted(&self) -> Option<f64> {
        self.converted
    }

    /// Updates the amount and recomputes.
    pub fn set_amount(&mut self, amount: f64) -> Option<f64> {
        self.amount = amount;
        self.recompute()
    }

    /// Updates the rate and recomputes.
    pub fn set_rate(&mut self, rate: Option<f64>) -> Option<f64> {
        self.rate = rate;
        self.recompute()
    }

    /// Applies the outcome of a currency pipeline run.
    pub fn apply_quote(&mut self, quote: &QuoteRate) -> Option<f64> {
        self.base.clone_from(&quote.base);
        self.quote.clone_from(&quote.quote);
        self.set_rate(Some(quote.rate))
    }

    /// Renders "`amount` `base` is equal to `converted` `quote`".
    #[must_use]
    pub fn summary(&self) -> String {
        let converted = self
            .converted
            .map_or_else(|| "n/a".to_string(), |value| value.to_string());
        format!(
            "{} {} is equal to {} {}",
            self.amount, self.base, converted, self.quote
        )
    }

    fn recompute(&mut self) -> Option<f64> {
        if let Some(value) = derive_amount(self.amount, self.rate) {
            self.converted = Some(value);
        }
        self.converted
    }
}
