use sea_orm::Condition;
use serde::Serialize;

use super::schedule;
use crate::{
  cache::GuildCache,
  config::SUPPORTED_LANGUAGES,
  entity::{Activations, guild, license, licensed_role, role},
  keygen,
  prelude::*,
};

pub const MAX_PREFIX_LENGTH: usize = 10;
pub const MAX_BRANDING_LENGTH: usize = 50;
pub const TIMEZONES: std::ops::RangeInclusive<i16> = -12..=14;

/// Partial settings change, `None` fields are left as they are.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct GuildUpdate {
  pub custom_prefix: Option<String>,
  pub license_format: Option<String>,
  pub branding: Option<String>,
  pub timezone: Option<i16>,
  pub language: Option<String>,
  pub enable_dm_redeem: Option<bool>,
  pub preserve_previous_duration: Option<bool>,
  pub reminders_enabled: Option<bool>,
  pub reminders_channel_id: Option<i64>,
  pub reminders_ping: Option<bool>,
  pub reminders_send_to_dm: Option<bool>,
  pub license_log_enabled: Option<bool>,
  pub license_log_channel_id: Option<i64>,
  pub diagnostics_enabled: Option<bool>,
  pub diagnostics_channel_id: Option<i64>,
}

impl GuildUpdate {
  fn validate(&self) -> Result<()> {
    if let Some(prefix) = &self.custom_prefix
      && prefix.chars().count() > MAX_PREFIX_LENGTH
    {
      return Err(Validation::PrefixTooLong { max: MAX_PREFIX_LENGTH }.into());
    }

    if let Some(format) = &self.license_format
      && !format.is_empty()
    {
      keygen::ensure_secure(format)?;
    }

    if let Some(branding) = &self.branding
      && branding.chars().count() > MAX_BRANDING_LENGTH
    {
      return Err(
        Validation::BrandingTooLong { max: MAX_BRANDING_LENGTH }.into(),
      );
    }

    if let Some(timezone) = self.timezone
      && !TIMEZONES.contains(&timezone)
    {
      return Err(Validation::Timezone(timezone).into());
    }

    if let Some(language) = &self.language
      && !SUPPORTED_LANGUAGES.contains(&language.as_str())
    {
      return Err(Validation::Language(language.clone()).into());
    }

    Ok(())
  }

  fn apply(self, guild: guild::Model) -> guild::ActiveModel {
    let mut model: guild::ActiveModel = guild.into();

    macro_rules! set {
      ($model:ident, $update:ident; $($field:ident),* $(,)?) => {
        $(if let Some(value) = $update.$field {
          $model.$field = Set(value);
        })*
      };
    }

    let update = self;
    set!(
      model,
      update;
      custom_prefix,
      license_format,
      branding,
      timezone,
      language,
      enable_dm_redeem,
      preserve_previous_duration,
      reminders_enabled,
      reminders_channel_id,
      reminders_ping,
      reminders_send_to_dm,
      license_log_enabled,
      license_log_channel_id,
      diagnostics_enabled,
      diagnostics_channel_id,
    );

    model
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuildInfo {
  pub id: i64,
  pub prefix: String,
  pub language: String,
  pub stored_licenses: u64,
  pub active_grants: u64,
  pub activations: Vec<u32>,
}

pub struct Guild<'a> {
  db: &'a DatabaseConnection,
  cache: &'a GuildCache,
}

impl<'a> Guild<'a> {
  pub fn new(db: &'a DatabaseConnection, cache: &'a GuildCache) -> Self {
    Self { db, cache }
  }

  /// Creates a guild with default settings and its own reminder schedule.
  pub async fn create(&self, id: i64) -> Result<guild::Model> {
    let txn = self.db.begin().await?;

    let schedule = schedule::insert(&txn, &Activations::default()).await?;
    let guild = guild::ActiveModel {
      id: Set(id),
      custom_prefix: Set(String::new()),
      license_format: Set(String::new()),
      branding: Set(String::new()),
      timezone: Set(0),
      language: Set("en".into()),
      schedule_id: Set(schedule.id),
      enable_dm_redeem: Set(true),
      preserve_previous_duration: Set(true),
      reminders_enabled: Set(true),
      reminders_channel_id: Set(0),
      reminders_ping: Set(true),
      reminders_send_to_dm: Set(true),
      license_log_enabled: Set(false),
      license_log_channel_id: Set(0),
      diagnostics_enabled: Set(false),
      diagnostics_channel_id: Set(0),
    }
    .insert(&txn)
    .await
    .map_err(|err| {
      Error::unique_or(err, Validation::Duplicate(format!("Guild {id}")).into())
    })?;

    txn.commit().await?;
    info!("Created guild {id}");

    Ok(guild)
  }

  pub async fn by_id(&self, id: i64) -> Result<Option<guild::Model>> {
    Ok(guild::Entity::find_by_id(id).one(self.db).await?)
  }

  pub async fn get(&self, id: i64) -> Result<guild::Model> {
    self.by_id(id).await?.ok_or(Missing::Guild(id).into())
  }

  pub async fn get_or_create(&self, id: i64) -> Result<guild::Model> {
    match self.by_id(id).await? {
      Some(guild) => Ok(guild),
      None => self.create(id).await,
    }
  }

  /// Makes sure every guild in `ids` exists. Never deletes anything.
  pub async fn sync(&self, ids: &[i64]) -> Result<usize> {
    let known: Vec<i64> = guild::Entity::find()
      .select_only()
      .column(guild::Column::Id)
      .into_tuple()
      .all(self.db)
      .await?;

    let mut created = 0;
    for &id in ids.iter().filter(|id| !known.contains(id)) {
      self.create(id).await?;
      created += 1;
    }

    if created > 0 {
      info!("Synchronized {created} new guilds");
    }
    Ok(created)
  }

  pub async fn update(
    &self,
    id: i64,
    update: GuildUpdate,
  ) -> Result<guild::Model> {
    update.validate()?;

    let guild = self.get(id).await?;
    let guild = update.apply(guild).update(self.db).await?;
    self.cache.invalidate(id);

    debug!("Updated settings of guild {id}");
    Ok(guild)
  }

  /// Replaces the guild reminder schedule used as a template for new
  /// licenses. Existing licenses keep their own copy.
  pub async fn set_reminders(
    &self,
    id: i64,
    slots: &[u32],
  ) -> Result<Activations> {
    let activations = Activations::new(slots)?;
    let guild = self.get(id).await?;
    schedule::replace(self.db, guild.schedule_id, &activations).await?;
    Ok(activations)
  }

  /// Deletes the guild with everything it owns.
  pub async fn delete(&self, id: i64) -> Result<bool> {
    let txn = self.db.begin().await?;

    let Some(guild) = guild::Entity::find_by_id(id).one(&txn).await? else {
      return Ok(false);
    };

    let mut schedules: Vec<i32> = license::Entity::find()
      .select_only()
      .column(license::Column::ScheduleId)
      .filter(license::Column::GuildId.eq(id))
      .into_tuple()
      .all(&txn)
      .await?;
    schedules.push(guild.schedule_id);

    guild.delete(&txn).await?;
    schedule::delete_many(&txn, schedules).await?;
    txn.commit().await?;

    self.cache.invalidate(id);
    info!("Deleted guild {id}");

    Ok(true)
  }

  pub async fn info(&self, id: i64) -> Result<GuildInfo> {
    let guild = self.get(id).await?;

    let stored_licenses = license::Entity::find()
      .filter(license::Column::GuildId.eq(id))
      .filter(license::Column::UsesLeft.gt(0))
      .count(self.db)
      .await?;

    let active_grants = licensed_role::Entity::find()
      .inner_join(role::Entity)
      .filter(role::Column::GuildId.eq(id))
      .filter(
        Condition::any()
          .add(licensed_role::Column::Expiration.is_null())
          .add(licensed_role::Column::Expiration.gt(now())),
      )
      .count(self.db)
      .await?;

    let activations =
      schedule::Schedule::new(self.db).activations(guild.schedule_id).await?;
    let preferences = self.cache.get(self.db, id).await;

    Ok(GuildInfo {
      id,
      prefix: preferences.prefix,
      language: preferences.language,
      stored_licenses,
      active_grants,
      activations: activations.as_slice().to_vec(),
    })
  }
}
