//! Currency rate resolution pipeline.
//!
//! (base, quote) pair → exchange-rate table for the base → quote rate. The
//! converted amount is derived outside the pipeline by
//! [`CurrencyConverter`].

mod amount;
mod rates;

pub use amount::{derive_amount, CurrencyConverter};
pub use rates::{
    CurrencyPair, ExchangeRateResolver, QuoteRate, QuoteSelector, RateTable, UpstreamDataGap,
};

use std::sync::Arc;

use crate::config::CurrencyConfig;
use crate::pipeline::PipelineController;
use crate::transport::HttpTransport;

/// Controller type for the currency pipeline.
pub type CurrencyPipeline = PipelineController<ExchangeRateResolver, QuoteSelector>;

/// Builds a currency pipeline over `transport`.
#[must_use]
pub fn currency_pipeline(config: &CurrencyConfig, transport: Arc<dyn HttpTransport>) -> CurrencyPipeline {
    PipelineController::new(
        "currency",
        ExchangeRateResolver::new(config, transport),
        QuoteSelector,
    )
}
