use crate::{
  entity::{guild, role},
  prelude::*,
};

pub const MAX_TIER_LEVEL: i16 = 100;
pub const MAX_TIER_POWER: i16 = 9;

fn ensure_tier(level: i16, power: i16) -> Result<()> {
  if !(0..=MAX_TIER_LEVEL).contains(&level) {
    return Err(Validation::TierLevel(level).into());
  }
  if !(0..=MAX_TIER_POWER).contains(&power) {
    return Err(Validation::TierPower(power).into());
  }
  Ok(())
}

/// A tiered slot belongs to at most one role of the guild.
async fn ensure_slot_free<C: ConnectionTrait>(
  conn: &C,
  guild_id: i64,
  level: i16,
  power: i16,
  except: Option<i64>,
) -> Result<()> {
  if level == 0 {
    return Ok(());
  }

  let mut query = role::Entity::find()
    .filter(role::Column::GuildId.eq(guild_id))
    .filter(role::Column::TierLevel.eq(level))
    .filter(role::Column::TierPower.eq(power));
  if let Some(id) = except {
    query = query.filter(role::Column::Id.ne(id));
  }

  match query.one(conn).await? {
    Some(_) => Err(Integrity::TierTaken { level, power }.into()),
    None => Ok(()),
  }
}

pub struct Role<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Role<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn register(
    &self,
    guild_id: i64,
    role_id: i64,
    tier_level: i16,
    tier_power: i16,
  ) -> Result<role::Model> {
    ensure_tier(tier_level, tier_power)?;

    let txn = self.db.begin().await?;

    if guild::Entity::find_by_id(guild_id).one(&txn).await?.is_none() {
      return Err(Missing::Guild(guild_id).into());
    }
    if role::Entity::find_by_id(role_id).one(&txn).await?.is_some() {
      return Err(Validation::Duplicate(format!("Role {role_id}")).into());
    }
    ensure_slot_free(&txn, guild_id, tier_level, tier_power, None).await?;

    let role = role::ActiveModel {
      id: Set(role_id),
      guild_id: Set(guild_id),
      tier_level: Set(tier_level),
      tier_power: Set(tier_power),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    debug!("Registered role {role_id} in guild {guild_id}");

    Ok(role)
  }

  pub async fn by_id(&self, role_id: i64) -> Result<Option<role::Model>> {
    Ok(role::Entity::find_by_id(role_id).one(self.db).await?)
  }

  pub async fn get(&self, role_id: i64) -> Result<role::Model> {
    self.by_id(role_id).await?.ok_or(Missing::Role(role_id).into())
  }

  /// Untiered registration on first use. A role id is never moved between
  /// guilds.
  pub async fn get_or_create(
    &self,
    guild_id: i64,
    role_id: i64,
  ) -> Result<role::Model> {
    match self.by_id(role_id).await? {
      Some(role) if role.guild_id != guild_id => {
        Err(Integrity::GuildMismatch.into())
      }
      Some(role) => Ok(role),
      None => self.register(guild_id, role_id, 0, 0).await,
    }
  }

  pub async fn set_tier(
    &self,
    role_id: i64,
    tier_level: i16,
    tier_power: i16,
  ) -> Result<role::Model> {
    ensure_tier(tier_level, tier_power)?;

    let txn = self.db.begin().await?;
    let role = role::Entity::find_by_id(role_id)
      .one(&txn)
      .await?
      .ok_or(Missing::Role(role_id))?;
    ensure_slot_free(&txn, role.guild_id, tier_level, tier_power, Some(role_id))
      .await?;

    let role = role::ActiveModel {
      tier_level: Set(tier_level),
      tier_power: Set(tier_power),
      ..role.into()
    }
    .update(&txn)
    .await?;

    txn.commit().await?;
    Ok(role)
  }

  /// Stops tracking the role, its packet entries and grants go with it.
  pub async fn delete(&self, role_id: i64) -> Result<bool> {
    let result = role::Entity::delete_by_id(role_id).exec(self.db).await?;
    Ok(result.rows_affected > 0)
  }

  pub async fn all(&self, guild_id: i64) -> Result<Vec<role::Model>> {
    Ok(
      role::Entity::find()
        .filter(role::Column::GuildId.eq(guild_id))
        .order_by_asc(role::Column::Id)
        .all(self.db)
        .await?,
    )
  }

  /// Tiered roles of the guild ordered by level, then power.
  pub async fn hierarchy(&self, guild_id: i64) -> Result<Vec<role::Model>> {
    Ok(
      role::Entity::find()
        .filter(role::Column::GuildId.eq(guild_id))
        .filter(role::Column::TierLevel.gt(0))
        .order_by_asc(role::Column::TierLevel)
        .order_by_asc(role::Column::TierPower)
        .all(self.db)
        .await?,
    )
  }
}
