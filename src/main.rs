use licensy::{
  config::Config,
  plugins::{self, App},
  prelude::*,
  state::AppState,
};
use tracing_subscriber::{
  EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
      "licensy=debug,tower_http=debug,sea_orm=warn".into()
    }))
    .with(tracing_subscriber::fmt::layer())
    .init();

  let config = Config::from_env()?;
  info!("Starting Licensy v{}", env!("CARGO_PKG_VERSION"));

  let app = Arc::new(AppState::new(config).await?);

  let running = App::new()
    .register(plugins::scheduler::Plugin)
    .register(plugins::server::Plugin)
    .run(app);
  info!("Running plugins: {}", running.names().join(", "));

  tokio::signal::ctrl_c().await.context("Failed to listen for shutdown")?;
  info!("Shutting down");
  running.shutdown().await;

  Ok(())
}
