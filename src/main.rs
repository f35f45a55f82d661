use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;

mod cli;
mod config;
mod monitor;
mod pipeline;

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = match config::FleetConfig::try_init() {
        Ok(config) => config,
        Err(e) => {
            log::error!("failed to load config: {e}");
            std::process::exit(1);
        }
    };

    let feed = match pipeline::ingest::FeedClient::new(&config) {
        Ok(feed) => feed,
        Err(e) => {
            log::error!("failed to build feed client: {e}");
            std::process::exit(1);
        }
    };

    let (monitor, mut updates) = monitor::Monitor::new(config, feed);
    let (refresh_tx, refresh_rx) = mpsc::channel(1);

    // On-demand refresh for operators: SIGHUP triggers a cycle outside
    // the timer cadence.
    tokio::spawn(async move {
        let mut hangup = signal(SignalKind::hangup()).expect("unable to register SIGHUP handler");
        while hangup.recv().await.is_some() {
            let _ = refresh_tx.try_send(());
        }
    });

    // Stand-in for the presentation layer: log a summary of every
    // published update.
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let output = updates.borrow_and_update().clone();
            if let Some(error) = &output.last_error {
                log::warn!("cycle produced no new data, showing stale results: {error}");
            }
            let Some(update) = &output.latest else { continue };

            let stats = &update.stats;
            log::info!(
                "fleet update: {} alerts, {} vessels alerting, {} critical, {} without vessel",
                stats.total_alerts,
                stats.vessels_alerting,
                stats.vessels_critical,
                stats.unresolved
            );
            if !update.signal.is_active(pipeline::timeparse::now_reference()) {
                continue;
            }
            for changed in &update.signal.changed {
                let severity = update.snapshot.severity(&changed.vessel);
                log::info!(
                    "new alerts on {} [{}] (latest equipment: {})",
                    changed.vessel,
                    severity.map(|s| s.as_ref().to_string()).unwrap_or_default(),
                    changed.equipment.as_deref().unwrap_or("-")
                );
                for row in update.vessel_detail(&changed.vessel).into_iter().take(3) {
                    log::info!("  {} / {}: {}", row.equipment, row.alert_type, row.count);
                }
            }
        }
    });

    monitor.run(refresh_rx).await;
}
