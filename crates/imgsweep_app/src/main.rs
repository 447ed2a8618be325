use std::sync::Arc;

use anyhow::Context;
use imgsweep_app::config;
use imgsweep_app::logging::{self, LogDestination};
use imgsweep_engine::{DedupStore, DirectorySink, Dispatcher, ReqwestFetcher};
use imgsweep_logging::{sweep_info, sweep_warn};
use log::LevelFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let destination = std::env::var("IMGSWEEP_LOG")
        .ok()
        .and_then(|value| LogDestination::parse(&value))
        .unwrap_or_default();
    logging::initialize(destination, LevelFilter::Info);

    let config = config::load().context("failed to load configuration")?;

    let sink = DirectorySink::open(&config.output_dir)
        .with_context(|| format!("output directory {:?} is unusable", config.output_dir))?;
    let fetcher = ReqwestFetcher::new(config.fetch.clone()).context("failed to build HTTP client")?;
    let store = Arc::new(DedupStore::new(
        config.sweep.repeat_limit,
        config.sweep.unique_cap,
        Box::new(sink),
    ));

    let dispatcher = Dispatcher::new(config.sweep.clone(), store, Arc::new(fetcher));
    let cancel = dispatcher.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            sweep_warn!("Interrupted; finishing in-flight downloads");
            cancel.cancel();
        }
    });

    sweep_info!("Saving images to {:?}", config.output_dir);
    let summary = dispatcher.run(&config.endpoint).await;
    if let Some(reason) = summary.stop_reason {
        sweep_info!("Stopped because of {}", reason);
    }
    Ok(())
}
