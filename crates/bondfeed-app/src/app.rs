//! Application wiring.

use crate::api::ApiClient;
use crate::config::AppConfig;
use crate::error::AppResult;
use bondfeed_core::BondFilter;
use bondfeed_feed::{FeedReducer, LiveFeed, LiveSnapshot};
use bondfeed_ws::FeedConnector;
use serde::Serialize;
use tracing::{info, warn};

/// Printed by `--snapshot-only`.
#[derive(Debug, Serialize)]
struct RestSnapshot {
    stats: bondfeed_core::MarketStats,
    transactions: Vec<bondfeed_core::Transaction>,
}

/// Connection status and data of the live view as last logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ViewStatus {
    loading: bool,
    connected: bool,
    errored: bool,
}

impl From<&LiveSnapshot> for ViewStatus {
    fn from(s: &LiveSnapshot) -> Self {
        Self {
            loading: s.loading,
            connected: s.connected,
            errored: s.error.is_some(),
        }
    }
}

/// Main application.
pub struct Application {
    config: AppConfig,
    connector: FeedConnector,
    reducer: FeedReducer,
    api: ApiClient,
}

impl Application {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let reducer = FeedReducer::with_capacity(config.feed.max_transactions)?;
        let api = ApiClient::with_timeout(&config.api.base_url, config.api.timeout())?;
        let connector = FeedConnector::new(config.connector_config());

        Ok(Self {
            config,
            connector,
            reducer,
            api,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn connector(&self) -> &FeedConnector {
        &self.connector
    }

    /// Fetch market stats and latest transactions over REST and print them
    /// as JSON.
    pub async fn print_snapshot(&self) -> AppResult<()> {
        let stats = self.api.get_market_stats().await?;
        let transactions = self.api.get_transactions(&BondFilter::default()).await?;
        info!(
            transactions = transactions.len(),
            total_bonds = ?stats.total_bonds,
            "REST snapshot fetched"
        );

        let snapshot = RestSnapshot {
            stats,
            transactions,
        };
        let rendered = render_snapshot(&snapshot)?;
        println!("{rendered}");
        Ok(())
    }

    /// Follow the live feed until Ctrl-C.
    pub async fn run(self) -> AppResult<()> {
        info!(url = %self.config.feed.url, "Starting live feed");

        let live = LiveFeed::attach(&self.connector, self.reducer);
        let mut revisions = live.subscribe();
        let mut last_status = ViewStatus::default();
        let mut updates: u64 = 0;

        loop {
            tokio::select! {
                changed = revisions.changed() => {
                    if changed.is_err() {
                        warn!("Live feed closed");
                        break;
                    }
                    updates += 1;
                    let snapshot = live.snapshot();
                    log_update(&snapshot, &mut last_status);
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        info!(updates, "Shutting down");
        drop(live);
        self.connector.disconnect();
        Ok(())
    }
}

fn render_snapshot(snapshot: &RestSnapshot) -> AppResult<String> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

fn log_update(snapshot: &LiveSnapshot, last: &mut ViewStatus) {
    let status = ViewStatus::from(snapshot);
    if status != *last {
        match &snapshot.error {
            Some(message) => warn!(%message, "Live feed unavailable"),
            None => info!(
                connected = status.connected,
                loading = status.loading,
                "Live feed status changed"
            ),
        }
        *last = status;
    }

    if let Some(latest) = snapshot.transactions.first() {
        info!(
            count = snapshot.transactions.len(),
            latest_id = ?latest.id.as_ref().map(|id| id.as_str()),
            isin = ?latest.isin,
            price = ?latest.price,
            "Live feed updated"
        );
    }
}
