use std::sync::atomic::AtomicBool;

use migration::Migrator;

use crate::{
  cache::GuildCache,
  config::Config,
  lock::Locks,
  port::{Notifier, RoleAssignment, discord::Discord},
  prelude::*,
  sv,
};

pub struct Services<'a> {
  pub guild: sv::Guild<'a>,
  pub role: sv::Role<'a>,
  pub packet: sv::Packet<'a>,
  pub license: sv::License<'a>,
  pub schedule: sv::Schedule<'a>,
  pub redeem: sv::Redeem<'a>,
  pub grant: sv::Grant<'a>,
  pub events: sv::Events<'a>,
  pub sweep: sv::Sweep<'a>,
}

pub struct AppState {
  pub db: DatabaseConnection,
  pub config: Config,
  pub roles: Arc<dyn RoleAssignment>,
  pub notifier: Arc<dyn Notifier>,
  pub locks: Locks,
  pub cache: GuildCache,
  // single-flight guard of the expiration sweep
  sweeping: AtomicBool,
}

impl AppState {
  pub async fn new(config: Config) -> anyhow::Result<Self> {
    info!("Connecting to database...");
    let db = Database::connect(&config.database_url)
      .await
      .context("Failed to connect to database")?;

    info!("Running migrations...");
    Migrator::up(&db, None).await.context("Failed to run migrations")?;

    let discord = Arc::new(Discord::new(
      config.discord_api.clone(),
      config.discord_token.clone(),
    ));

    let app = Self::with_ports(db, config, discord.clone(), discord);
    app.cache.populate(&app.db).await?;

    Ok(app)
  }

  pub fn with_ports(
    db: DatabaseConnection,
    config: Config,
    roles: Arc<dyn RoleAssignment>,
    notifier: Arc<dyn Notifier>,
  ) -> Self {
    Self {
      db,
      cache: GuildCache::new(config.default_prefix.clone()),
      config,
      roles,
      notifier,
      locks: Locks::new(),
      sweeping: AtomicBool::new(false),
    }
  }

  pub fn sv(&self) -> Services<'_> {
    Services {
      guild: sv::Guild::new(&self.db, &self.cache),
      role: sv::Role::new(&self.db),
      packet: sv::Packet::new(&self.db),
      license: sv::License::new(self),
      schedule: sv::Schedule::new(&self.db),
      redeem: sv::Redeem::new(self),
      grant: sv::Grant::new(self),
      events: sv::Events::new(self),
      sweep: sv::Sweep::new(self, &self.sweeping),
    }
  }
}
