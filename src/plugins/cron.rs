use std::sync::Arc;

use async_trait::async_trait;

use crate::{plugins::Plugin, prelude::*, state::AppState};

/// Drains the commission outbox on a fixed interval.
pub struct CommissionJobs;

#[async_trait]
impl Plugin for CommissionJobs {
  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    let period = app.config.commission_poll_interval;
    if period.is_zero() {
      info!("Commission worker disabled via config (0 interval)");
      return Ok(());
    }

    info!(
      "Commission worker started (interval: {}, batch: {})",
      humantime::format_duration(period),
      app.config.commission_batch
    );

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
      interval.tick().await;

      match app.sv().jobs.drain_once().await {
        Ok(report) if report.dead > 0 => {
          warn!("{} commission job(s) moved to dead letters", report.dead)
        }
        Ok(_) => {}
        Err(err) => error!("Commission worker failed: {}", err),
      }
    }
  }
}
