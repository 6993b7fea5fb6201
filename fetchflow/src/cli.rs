//! CLI argument parsing for fetchflow

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "fetchflow")]
#[command(author, version, about = "Weather, currency and link lookups over dependent fetch pipelines", long_about = None)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn", env = "FETCHFLOW_LOG_LEVEL")]
    pub log_level: String,

    /// Give up on a run after this many seconds
    #[arg(long, global = true)]
    pub timeout: Option<f64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Look up current weather by city or postal code
    Weather {
        /// City name
        #[arg(long, conflicts_with_all = ["zip", "country"], required_unless_present = "zip")]
        city: Option<String>,

        /// Postal code
        #[arg(long, requires = "country")]
        zip: Option<String>,

        /// Country code for the postal code, e.g. US
        #[arg(long, requires = "zip")]
        country: Option<String>,
    },

    /// Convert an amount between currencies
    Convert {
        /// Base currency code
        #[arg(long, default_value = "")]
        from: String,

        /// Quote currency code
        #[arg(long)]
        to: String,

        /// Amount in the base currency
        #[arg(long, default_value_t = 1.0)]
        amount: f64,
    },

    /// Shorten a URL
    Shorten {
        /// Absolute http(s) URL
        url: String,
    },
}
