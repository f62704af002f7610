use tokio::time::MissedTickBehavior;

use crate::{prelude::*, state::AppState};

/// Drives the expiration and reminder sweep.
pub struct Plugin;

#[async_trait]
impl super::Plugin for Plugin {
  fn name(&self) -> &'static str {
    "scheduler"
  }

  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    let period = app.config.sweep_interval;
    info!("Sweeping every {}", humantime::format_duration(period));

    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
      interval.tick().await;

      if let Some(report) = app.sv().sweep.tick().await
        && (report.expired > 0 || report.reminded > 0 || report.failures > 0)
      {
        info!(
          "Sweep: {} expired, {} reminded, {} pruned, {} failures",
          report.expired, report.reminded, report.pruned, report.failures
        );
      }
    }
  }
}
