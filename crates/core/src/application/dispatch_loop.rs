// Dispatch Loop
// Runs one dispatch cycle per tick in the background

use crate::application::dispatcher::ScheduleDispatcher;
use crate::application::worker::ShutdownToken;
use crate::domain::DispatchSummary;
use crate::error::Result;
use crate::port::StoreMaintenance;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

/// Periodic driver for [`ScheduleDispatcher`]
///
/// A failed cycle is logged and the loop carries on with the next tick.
pub struct DispatchLoop {
    dispatcher: Arc<ScheduleDispatcher>,
    maintenance: Option<Arc<dyn StoreMaintenance>>,
    tick: Duration,
}

impl DispatchLoop {
    pub fn new(dispatcher: Arc<ScheduleDispatcher>, tick: Duration) -> Self {
        Self {
            dispatcher,
            maintenance: None,
            tick,
        }
    }

    /// Purge expired store entries after every cycle
    pub fn with_maintenance(mut self, maintenance: Arc<dyn StoreMaintenance>) -> Self {
        self.maintenance = Some(maintenance);
        self
    }

    /// Run until shutdown (first cycle fires immediately)
    pub async fn run(self, mut shutdown: ShutdownToken) {
        info!(tick_seconds = self.tick.as_secs(), "Dispatch loop started");

        let mut tick = interval(self.tick);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tick.tick() => {},
                _ = shutdown.wait() => break,
            }

            if let Err(e) = self.run_once().await {
                error!(error = %e, "Scrape dispatch cycle failed");
            }
        }

        info!("Dispatch loop stopped");
    }

    /// One dispatch cycle followed by store housekeeping
    pub async fn run_once(&self) -> Result<DispatchSummary> {
        let outcome = self.dispatcher.dispatch().await;

        if let Some(maintenance) = &self.maintenance {
            match maintenance.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => info!(purged, "Purged expired store entries"),
                Err(e) => warn!(error = %e, "Store purge failed"),
            }
        }

        outcome
    }
}
