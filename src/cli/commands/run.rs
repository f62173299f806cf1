//! Daily run command implementation.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use trading_broker::{AlpacaBroker, AlpacaConfig, DryRunOrders, PaperBroker};
use trading_config::{AppConfig, BrokerKind, DataProvider, NotifierKind, UniverseKind};
use trading_core::traits::{AccountGateway, DataSource, Notifier, OrderGateway, UniverseSource};
use trading_data::{
    CacheFile, CsvDataSource, FileUniverse, HttpCsvUniverse, StaticUniverse, SymbolFilter,
    YahooDataSource,
};
use trading_monitor::{LogNotifier, TwilioConfig, TwilioNotifier};
use trading_runner::{DailyRunner, RunClock, RunConfig};
use trading_strategies::SignalEvaluator;

use crate::cli::{OutputFormat, RunArgs};

pub async fn run(args: RunArgs, config: AppConfig) -> Result<()> {
    config.validate()?;
    let timeout = Duration::from_secs(config.data.request_timeout_secs);

    let data = build_data_source(&config, timeout)?;
    let (account, orders) = build_broker(&config, timeout)?;
    let orders: Arc<dyn OrderGateway> = if args.dry_run {
        info!("Dry run: orders are logged, not sent, and the cache is not written");
        Arc::new(DryRunOrders::new())
    } else {
        orders
    };
    let notifier = build_notifier(&config, timeout)?;
    let universe = build_universe(&config, &args.symbols, timeout)?;

    let evaluator =
        SignalEvaluator::new(config.strategy.clone()).context("Invalid strategy configuration")?;

    let runner = DailyRunner::new(
        data,
        account,
        orders,
        evaluator,
        CacheFile::new(config.cache.path.clone()),
    )
    .with_notifier(notifier)
    .with_filter(SymbolFilter::new(config.universe.excluded_prefixes.clone()))
    .with_config(RunConfig {
        lookback: config.data.lookback_bars,
        call_timeout: timeout,
        persist_after_fetch: config.cache.persist_after_fetch,
        persist: !args.dry_run,
        max_symbols: args.limit,
    });

    info!(
        broker = ?config.execution.broker,
        provider = ?config.data.provider,
        position_source = %config.strategy.position_source,
        "Starting run"
    );
    let report = runner
        .run(universe.as_ref(), RunClock::system())
        .await
        .context("Daily run aborted")?;

    // Output results
    match args.output {
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Text => println!("{}", report.summary()),
    }

    // Save if requested
    if let Some(save_path) = &args.save {
        std::fs::write(save_path, report.to_json()?)
            .with_context(|| format!("Failed to write report to {}", save_path.display()))?;
        info!("Report saved to {:?}", save_path);
    }

    Ok(())
}

fn build_data_source(config: &AppConfig, timeout: Duration) -> Result<Arc<dyn DataSource>> {
    match config.data.provider {
        DataProvider::Yahoo => Ok(Arc::new(YahooDataSource::new(
            timeout,
            config.data.max_retries,
        )?)),
        DataProvider::Csv => {
            let dir = config
                .data
                .csv_dir
                .clone()
                .context("data.csv_dir is required for the csv provider")?;
            Ok(Arc::new(CsvDataSource::new(dir)?))
        }
    }
}

fn build_broker(
    config: &AppConfig,
    timeout: Duration,
) -> Result<(Arc<dyn AccountGateway>, Arc<dyn OrderGateway>)> {
    match config.execution.broker {
        BrokerKind::Alpaca => {
            let alpaca = AlpacaConfig::from_env(
                &config.alpaca.api_key_env,
                &config.alpaca.api_secret_env,
                config.alpaca.paper,
            )?
            .with_base_url(config.alpaca.base_url.clone())
            .with_timeout(timeout);
            let broker = Arc::new(AlpacaBroker::new(alpaca)?);
            Ok((
                broker.clone() as Arc<dyn AccountGateway>,
                broker as Arc<dyn OrderGateway>,
            ))
        }
        BrokerKind::Paper => {
            let broker = PaperBroker::new(config.execution.paper_capital);
            Ok((
                Arc::new(broker.clone()) as Arc<dyn AccountGateway>,
                Arc::new(broker) as Arc<dyn OrderGateway>,
            ))
        }
    }
}

fn build_notifier(config: &AppConfig, timeout: Duration) -> Result<Arc<dyn Notifier>> {
    let settings = &config.notifications;
    match settings.sink {
        NotifierKind::Log => Ok(Arc::new(LogNotifier)),
        NotifierKind::Twilio => {
            let twilio = TwilioConfig::from_env(
                &settings.twilio_sid_env,
                &settings.twilio_token_env,
                &settings.twilio_from_env,
                &settings.twilio_to_env,
            )?;
            Ok(Arc::new(TwilioNotifier::new(twilio, timeout)?))
        }
    }
}

fn build_universe(
    config: &AppConfig,
    symbols: &[String],
    timeout: Duration,
) -> Result<Box<dyn UniverseSource>> {
    if !symbols.is_empty() {
        return Ok(Box::new(StaticUniverse::new(symbols.iter().cloned())));
    }

    let settings = &config.universe;
    match settings.source {
        UniverseKind::Static => Ok(Box::new(StaticUniverse::new(settings.symbols.clone()))),
        UniverseKind::File => {
            let path = settings
                .path
                .clone()
                .context("universe.path is required for the file source")?;
            Ok(Box::new(FileUniverse::new(path)))
        }
        UniverseKind::Url => Ok(Box::new(HttpCsvUniverse::new(settings.url.clone(), timeout)?)),
    }
}
