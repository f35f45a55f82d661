use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use tokio::sync::{mpsc, watch};

use crate::config::FleetConfig;
use crate::pipeline::{aggregate, change, fleet, ingest, timeparse};

/// Everything a refresh cycle publishes to the presentation layer.
/// The per-vessel detail table and most-recent equipment lookups run
/// against the cycle's own event set, so consumers never race a later
/// cycle.
#[derive(Debug)]
pub struct FleetUpdate {
    pub snapshot: aggregate::AggregationSnapshot,
    pub signal: change::ChangeSignal,
    pub stats: aggregate::FleetStats,
    events: Vec<fleet::FleetEvent>,
}

impl FleetUpdate {
    pub fn vessel_detail(&self, vessel: &str) -> Vec<aggregate::DetailRow> {
        aggregate::vessel_detail(&self.events, vessel)
    }

    pub fn most_recent_equipment(&self, vessel: &str) -> Option<String> {
        aggregate::most_recent_equipment(&self.events, vessel)
    }
}

/// What the watch channel carries. On a failed cycle `latest` keeps
/// the previous cycle's data (stale beats empty) and `last_error`
/// says why nothing fresh arrived.
#[derive(Debug, Clone, Default)]
pub struct MonitorOutput {
    pub latest: Option<Arc<FleetUpdate>>,
    pub last_error: Option<String>,
}

pub struct Monitor {
    config: FleetConfig,
    feed: ingest::FeedClient,
    prev_counts: HashMap<String, u32>,
    out_tx: watch::Sender<MonitorOutput>,
}

impl Monitor {
    pub fn new(config: FleetConfig, feed: ingest::FeedClient) -> (Self, watch::Receiver<MonitorOutput>) {
        let (out_tx, out_rx) = watch::channel(MonitorOutput::default());
        let monitor = Self {
            config,
            feed,
            prev_counts: HashMap::new(),
            out_tx,
        };
        (monitor, out_rx)
    }

    /// Runs refresh cycles until the refresh channel closes. The first
    /// cycle fires immediately, later ones on the timer or whenever an
    /// on-demand trigger arrives.
    pub async fn run(mut self, mut refresh_rx: mpsc::Receiver<()>) {
        log::info!(
            "fleet monitor started, refreshing every {}s",
            self.config.refresh_secs
        );
        let mut ticker = tokio::time::interval(self.config.refresh_interval());

        loop {
            tokio::select! {
                _ = ticker.tick() => self.run_cycle().await,
                triggered = refresh_rx.recv() => match triggered {
                    Some(()) => {
                        log::info!("on-demand refresh");
                        self.run_cycle().await;
                    }
                    None => {
                        log::info!("refresh channel closed, stopping monitor");
                        break;
                    }
                }
            }
        }
    }

    pub async fn run_cycle(&mut self) {
        let now = timeparse::now_reference();
        let fetched = self.feed.fetch_records().await;
        self.apply_cycle(now, fetched);
    }

    /// Publishes one cycle's outcome. A fetch or schema error leaves
    /// the previous update in place so consumers show stale-but-valid
    /// data instead of an empty fleet, with `last_error` saying why
    /// nothing fresh arrived.
    fn apply_cycle(
        &mut self,
        now: DateTime<FixedOffset>,
        fetched: ingest::Result<Vec<ingest::RawEventRecord>>,
    ) {
        match fetched {
            Ok(records) => {
                let update = process_records(records, &self.config, &self.prev_counts, now);
                self.prev_counts = update.snapshot.counts.clone();
                self.out_tx.send_replace(MonitorOutput {
                    latest: Some(Arc::new(update)),
                    last_error: None,
                });
            }
            Err(e) => {
                log::error!("refresh cycle failed: {e}");
                let latest = self.out_tx.borrow().latest.clone();
                self.out_tx.send_replace(MonitorOutput {
                    latest,
                    last_error: Some(e.to_string()),
                });
            }
        }
    }
}

/// The synchronous part of a cycle: window filter, fleet filter,
/// aggregation and change detection over an already-fetched record
/// set.
pub fn process_records(
    records: Vec<ingest::RawEventRecord>,
    config: &FleetConfig,
    prev_counts: &HashMap<String, u32>,
    now: DateTime<FixedOffset>,
) -> FleetUpdate {
    let mut diagnostics = vec![format!("records fetched: {}", records.len())];

    let timed = timeparse::parse_and_filter(records, config.window_hours, now, &mut diagnostics);
    let events = fleet::filter_fleet(timed, config, &mut diagnostics);
    let snapshot = aggregate::build_snapshot(&events, &config.roster, now, diagnostics);
    let signal = change::detect_changes(&snapshot, prev_counts, &events, &config.roster, now);
    let stats = snapshot.stats();

    FleetUpdate {
        snapshot,
        signal,
        stats,
        events,
    }
}
