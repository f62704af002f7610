pub mod scheduler;
pub mod server;

use tokio::task::{JoinHandle, JoinSet};

use crate::{prelude::*, state::AppState};

/// First restart delay of a crashed plugin, doubled on every further crash.
const RESTART_DELAY: Duration = Duration::from_secs(5);
const MAX_RESTART_DELAY: Duration = Duration::from_secs(60);
/// A plugin that ran this long before stopping restarts without backoff.
const HEALTHY_RUN: Duration = Duration::from_secs(60);

#[async_trait]
pub trait Plugin: Send + Sync {
  fn name(&self) -> &'static str;

  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()>;
}

/// Supervisor that keeps every registered plugin running.
#[derive(Default)]
pub struct App {
  plugins: Vec<Arc<dyn Plugin>>,
}

impl App {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register<P: Plugin + 'static>(mut self, plugin: P) -> Self {
    self.plugins.push(Arc::new(plugin));
    self
  }

  pub fn run(self, app: Arc<AppState>) -> Running {
    let tasks = self
      .plugins
      .into_iter()
      .map(|plugin| {
        let name = plugin.name();
        (name, tokio::spawn(supervise(plugin, app.clone())))
      })
      .collect();
    Running { tasks }
  }
}

async fn supervise(plugin: Arc<dyn Plugin>, app: Arc<AppState>) {
  let name = plugin.name();
  info!("Plugin `{name}` started");

  let mut delay = RESTART_DELAY;
  loop {
    let started = time::Instant::now();
    // aborted together with the supervisor
    let mut task = JoinSet::new();
    let (instance, state) = (plugin.clone(), app.clone());
    task.spawn(async move { instance.start(state).await });

    match task.join_next().await {
      Some(Ok(Ok(()))) => warn!("Plugin `{name}` stopped unexpectedly"),
      Some(Ok(Err(err))) => error!("Plugin `{name}` crashed: {err:#}"),
      Some(Err(err)) if err.is_panic() => error!("Plugin `{name}` panicked"),
      Some(Err(_)) | None => break,
    }

    if started.elapsed() >= HEALTHY_RUN {
      delay = RESTART_DELAY;
    }
    time::sleep(delay).await;
    delay = (delay * 2).min(MAX_RESTART_DELAY);
    info!("Restarting plugin `{name}`");
  }
}

/// Handles of the supervised plugins.
pub struct Running {
  tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl Running {
  pub fn names(&self) -> Vec<&'static str> {
    self.tasks.iter().map(|(name, _)| *name).collect()
  }

  /// Stops every plugin and waits until they are gone.
  pub async fn shutdown(self) {
    for (_, task) in &self.tasks {
      task.abort();
    }
    for (name, task) in self.tasks {
      // cancellation is the expected outcome here
      if let Err(err) = task.await
        && err.is_panic()
      {
        error!("Plugin `{name}` panicked during shutdown");
      }
      info!("Plugin `{name}` stopped");
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use super::*;
  use crate::state::testing;

  struct Flaky {
    starts: Arc<AtomicUsize>,
  }

  #[async_trait]
  impl Plugin for Flaky {
    fn name(&self) -> &'static str {
      "flaky"
    }

    async fn start(&self, _: Arc<AppState>) -> anyhow::Result<()> {
      if self.starts.fetch_add(1, Ordering::SeqCst) < 2 {
        anyhow::bail!("not yet");
      }
      std::future::pending().await
    }
  }

  #[tokio::test]
  async fn test_crashed_plugin_restarts_with_backoff() {
    let (app, _) = testing::app().await;
    time::pause();
    let starts = Arc::new(AtomicUsize::new(0));

    let running =
      App::new().register(Flaky { starts: starts.clone() }).run(Arc::new(app));
    assert_eq!(running.names(), vec!["flaky"]);

    time::sleep(Duration::from_secs(1)).await;
    assert_eq!(starts.load(Ordering::SeqCst), 1);
    // 5s after the first crash
    time::sleep(Duration::from_secs(5)).await;
    assert_eq!(starts.load(Ordering::SeqCst), 2);
    // then 10s after the second
    time::sleep(Duration::from_secs(5)).await;
    assert_eq!(starts.load(Ordering::SeqCst), 2);
    time::sleep(Duration::from_secs(6)).await;
    assert_eq!(starts.load(Ordering::SeqCst), 3);

    running.shutdown().await;
    time::sleep(Duration::from_secs(120)).await;
    assert_eq!(starts.load(Ordering::SeqCst), 3);
  }
}
