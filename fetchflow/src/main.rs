use anyhow::{Context, Result};
use clap::Parser;
use std::fmt::Display;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use fetchflow::config::Config;
use fetchflow::core::PipelineState;
use fetchflow::currency::{currency_pipeline, CurrencyConverter, CurrencyPair};
use fetchflow::events::{EventSink, LoggingEventSink};
use fetchflow::pipeline::{PipelineController, RunOutcome};
use fetchflow::presenter::render_state;
use fetchflow::shortener::{shortener_pipeline, LongUrl};
use fetchflow::stages::{StageResolver, Validate};
use fetchflow::transport::{HttpTransport, ReqwestTransport};
use fetchflow::weather::{weather_pipeline, LocationQuery};

mod cli;

use cli::{Cli, Command};

fn setup_logging(level_str: &str) {
    let level = match level_str.to_uppercase().as_str() {
        "TRACE" => tracing::Level::TRACE,
        "DEBUG" => tracing::Level::DEBUG,
        "INFO" => tracing::Level::INFO,
        "WARN" => tracing::Level::WARN,
        "ERROR" => tracing::Level::ERROR,
        other => {
            eprintln!("Warning: Unknown log-level '{other}', defaulting to WARN");
            tracing::Level::WARN
        }
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    debug!("Logging initialized (level: {:?})", level);
}

/// Prints every state transition until the run settles.
fn spawn_presenter<T>(mut rx: watch::Receiver<PipelineState<T>>) -> JoinHandle<()>
where
    T: Display + Send + Sync + 'static,
{
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let (line, done) = {
                let state = rx.borrow_and_update();
                (render_state(&*state), state.is_terminal())
            };
            if !line.is_empty() {
                println!("{line}");
            }
            if done {
                break;
            }
        }
    })
}

/// Runs `input` through `pipeline` and returns the final result, if any.
async fn execute<S1, S2>(
    pipeline: &PipelineController<S1, S2>,
    input: S1::Input,
    timeout: Option<Duration>,
) -> Option<S2::Output>
where
    S1: StageResolver,
    S1::Input: Validate,
    S1::Output: Clone + Send + Sync,
    S2: StageResolver<Input = S1::Output>,
    S2::Output: Clone + Send + Sync + Display + 'static,
{
    let presenter = spawn_presenter(pipeline.subscribe());
    let outcome = match timeout {
        Some(limit) => pipeline.run_with_timeout(input, limit).await,
        None => pipeline.run(input).await,
    };

    if let RunOutcome::Rejected(err) = &outcome {
        presenter.abort();
        eprintln!("{err}");
        return None;
    }
    if let Err(e) = presenter.await {
        debug!(error = %e, "Presenter task ended early");
    }
    pipeline.current_state().success().cloned()
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    let config = Config::from_env().context("Failed to load configuration")?;
    let transport: Arc<dyn HttpTransport> = Arc::new(
        ReqwestTransport::from_config(&config.http).context("Failed to build HTTP transport")?,
    );
    let timeout = cli.timeout.and_then(|secs| Duration::try_from_secs_f64(secs).ok());
    let events: Arc<dyn EventSink> = Arc::new(LoggingEventSink::debug());

    info!("fetchflow starting");

    let succeeded = match cli.command {
        Command::Weather { city, zip, country } => {
            let query = match city {
                Some(name) => LocationQuery::city(name),
                None => LocationQuery::postal_code(zip.unwrap_or_default(), country.unwrap_or_default()),
            };
            let pipeline = weather_pipeline(&config.weather, transport)
                .context("Weather lookups need an API key")?
                .with_event_sink(events);
            let snapshot = execute(&pipeline, query, timeout).await;
            if let Some(url) = snapshot.as_ref().and_then(|s| s.icon_url()) {
                println!("Icon: {url}");
            }
            snapshot.is_some()
        }
        Command::Convert { from, to, amount } => {
            let pipeline = currency_pipeline(&config.currency, transport).with_event_sink(events);
            let mut converter = CurrencyConverter::new(amount);
            match execute(&pipeline, CurrencyPair::new(from, to), timeout).await {
                Some(quote) => {
                    converter.apply_quote(&quote);
                    println!("{}", converter.summary());
                    true
                }
                None => false,
            }
        }
        Command::Shorten { url } => {
            let pipeline = shortener_pipeline(&config.shortener, transport)
                .context("Shortening needs an access token")?
                .with_event_sink(events);
            execute(&pipeline, LongUrl::new(url), timeout).await.is_some()
        }
    };

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
