use super::{
  announce,
  effects::{Action, Effects},
  schedule,
};
use crate::{
  entity::{
    Activations, guild, license,
    license::MAX_USES,
    licensed_member, licensed_role, packet,
  },
  keygen,
  lock::Lock,
  prelude::*,
  state::AppState,
};

/// Upper bound of redeemable licenses a guild may keep in storage.
pub const MAX_STORED_LICENSES: u64 = 100;

/// What a new license grants and how often it can be redeemed.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct LicenseSpec {
  pub packet_id: Option<i32>,
  pub regenerating: bool,
  pub uses: u32,
  /// Own reminder schedule instead of a copy of the guild one
  pub activations: Option<Vec<u32>>,
}

impl Default for LicenseSpec {
  fn default() -> Self {
    Self { packet_id: None, regenerating: false, uses: 1, activations: None }
  }
}

fn ensure_uses(uses: u32, regenerating: bool) -> Result<()> {
  if uses > MAX_USES {
    return Err(Validation::UsesLeft(uses).into());
  }
  if regenerating && uses > 1 {
    return Err(Validation::RegeneratingMultiUse.into());
  }
  Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LicenseUpdate {
  pub uses_left: Option<u32>,
  pub regenerating: Option<bool>,
  /// `Some(None)` detaches the packet
  pub packet_id: Option<Option<i32>>,
  pub activations: Option<Vec<u32>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct LicenseCounts {
  pub stored: u64,
  pub inert: u64,
}

async fn insert<C: ConnectionTrait>(
  conn: &C,
  key: String,
  guild_id: i64,
  spec: &LicenseSpec,
  schedule_id: i32,
) -> Result<license::Model> {
  license::ActiveModel {
    key: Set(key.clone()),
    guild_id: Set(guild_id),
    packet_id: Set(spec.packet_id),
    schedule_id: Set(schedule_id),
    regenerating: Set(spec.regenerating),
    // bounded by `MAX_USES`
    uses_left: Set(spec.uses as i32),
    created_at: Set(now()),
  }
  .insert(conn)
  .await
  .map_err(|err| Error::unique_or(err, Integrity::KeyCollision(key).into()))
}

async fn own_schedule<C: ConnectionTrait>(
  conn: &C,
  guild: &guild::Model,
  activations: Option<&Activations>,
) -> Result<i32> {
  let schedule = match activations {
    Some(activations) => schedule::insert(conn, activations).await?,
    None => schedule::duplicate(conn, guild.schedule_id).await?,
  };
  Ok(schedule.id)
}

/// Issues the single-use replacement of a spent regenerating license.
pub(crate) async fn regenerate<C: ConnectionTrait>(
  conn: &C,
  guild: &guild::Model,
  spent: &license::Model,
) -> Result<license::Model> {
  if !guild.license_format.is_empty() {
    keygen::ensure_secure(&guild.license_format)?;
  }

  let key = keygen::generate(&guild.license_format, &guild.branding);
  let schedule = schedule::duplicate(conn, spent.schedule_id).await?;
  let spec = LicenseSpec {
    packet_id: spent.packet_id,
    regenerating: true,
    uses: 1,
    activations: None,
  };

  insert(conn, key, guild.id, &spec, schedule.id).await
}

pub struct License<'a> {
  db: &'a DatabaseConnection,
  app: &'a AppState,
}

impl<'a> License<'a> {
  pub fn new(app: &'a AppState) -> Self {
    Self { db: &app.db, app }
  }

  async fn prepare(
    &self,
    guild_id: i64,
    spec: &LicenseSpec,
    amount: u64,
  ) -> Result<(guild::Model, Option<Activations>)> {
    ensure_uses(spec.uses, spec.regenerating)?;
    if spec.uses == 0 {
      return Err(Validation::UsesLeft(0).into());
    }
    let activations =
      spec.activations.as_deref().map(Activations::new).transpose()?;

    let guild = guild::Entity::find_by_id(guild_id)
      .one(self.db)
      .await?
      .ok_or(Missing::Guild(guild_id))?;

    if let Some(packet_id) = spec.packet_id {
      let packet = packet::Entity::find_by_id(packet_id)
        .one(self.db)
        .await?
        .ok_or(Missing::Packet(packet_id.to_string()))?;
      if packet.guild_id != guild_id {
        return Err(Integrity::GuildMismatch.into());
      }
    }

    let stored = self.count_stored(guild_id).await?;
    if stored + amount > MAX_STORED_LICENSES {
      return Err(
        Integrity::TooManyLicenses { max: MAX_STORED_LICENSES }.into(),
      );
    }

    Ok((guild, activations))
  }

  /// Mints `amount` keys from the guild format and branding.
  pub async fn generate(
    &self,
    guild_id: i64,
    spec: LicenseSpec,
    amount: usize,
  ) -> Result<Vec<license::Model>> {
    let max = MAX_STORED_LICENSES as usize;
    if !(1..=max).contains(&amount) {
      return Err(Validation::Amount { max }.into());
    }

    let (guild, activations) =
      self.prepare(guild_id, &spec, amount as u64).await?;
    if !guild.license_format.is_empty() {
      keygen::ensure_secure(&guild.license_format)?;
    }

    let keys =
      keygen::generate_multiple(&guild.license_format, &guild.branding, amount);

    let txn = self.db.begin().await?;
    let mut licenses = Vec::with_capacity(amount);
    for key in keys {
      let schedule = own_schedule(&txn, &guild, activations.as_ref()).await?;
      licenses.push(insert(&txn, key, guild_id, &spec, schedule).await?);
    }
    txn.commit().await?;

    info!("Generated {amount} licenses in guild {guild_id}");
    Ok(licenses)
  }

  /// Stores a license under an operator chosen key.
  pub async fn create(
    &self,
    guild_id: i64,
    key: &str,
    spec: LicenseSpec,
  ) -> Result<license::Model> {
    keygen::ensure_key(key)?;
    let (guild, activations) = self.prepare(guild_id, &spec, 1).await?;

    let txn = self.db.begin().await?;
    let schedule = own_schedule(&txn, &guild, activations.as_ref()).await?;
    let license = insert(&txn, key.to_string(), guild_id, &spec, schedule).await?;
    txn.commit().await?;

    Ok(license)
  }

  pub async fn by_key(&self, key: &str) -> Result<Option<license::Model>> {
    Ok(license::Entity::find_by_id(key).one(self.db).await?)
  }

  pub async fn get(&self, key: &str) -> Result<license::Model> {
    self.by_key(key).await?.ok_or(Missing::License.into())
  }

  pub async fn update(
    &self,
    key: &str,
    update: LicenseUpdate,
  ) -> Result<license::Model> {
    let activations =
      update.activations.as_deref().map(Activations::new).transpose()?;

    let txn = self.db.begin().await?;
    let license = license::Entity::find_by_id(key)
      .one(&txn)
      .await?
      .ok_or(Missing::License)?;

    let regenerating = update.regenerating.unwrap_or(license.regenerating);
    let uses_left =
      update.uses_left.unwrap_or(license.uses_left.max(0) as u32);
    ensure_uses(uses_left, regenerating)?;

    if let Some(Some(packet_id)) = update.packet_id {
      let packet = packet::Entity::find_by_id(packet_id)
        .one(&txn)
        .await?
        .ok_or(Missing::Packet(packet_id.to_string()))?;
      if packet.guild_id != license.guild_id {
        return Err(Integrity::GuildMismatch.into());
      }
    }

    if let Some(activations) = &activations {
      schedule::replace(&txn, license.schedule_id, activations).await?;
    }

    let mut model: license::ActiveModel = license.into();
    model.regenerating = Set(regenerating);
    model.uses_left = Set(uses_left as i32);
    if let Some(packet_id) = update.packet_id {
      model.packet_id = Set(packet_id);
    }
    let license = model.update(&txn).await?;

    txn.commit().await?;
    Ok(license)
  }

  /// Deletes the license and takes its roles away from the holders.
  pub async fn delete(&self, key: &str) -> Result<bool> {
    let Some(license) = self.by_key(key).await? else {
      return Ok(false);
    };
    let deleted = self.purge(license.guild_id, vec![license.key]).await?;
    Ok(deleted > 0)
  }

  /// Deletes every redeemable license of the guild.
  pub async fn delete_all(&self, guild_id: i64) -> Result<u64> {
    let keys: Vec<String> = license::Entity::find()
      .select_only()
      .column(license::Column::Key)
      .filter(license::Column::GuildId.eq(guild_id))
      .filter(license::Column::UsesLeft.gt(0))
      .into_tuple()
      .all(self.db)
      .await?;

    let deleted = self.purge(guild_id, keys).await?;
    info!("Deleted {deleted} licenses in guild {guild_id}");
    Ok(deleted)
  }

  async fn purge(&self, guild_id: i64, mut keys: Vec<String>) -> Result<u64> {
    if keys.is_empty() {
      return Ok(0);
    }
    let guild = guild::Entity::find_by_id(guild_id)
      .one(self.db)
      .await?
      .ok_or(Missing::Guild(guild_id))?;

    // license keys first, then members, both in a stable order
    keys.sort();
    let mut guards = Vec::with_capacity(keys.len());
    for key in &keys {
      guards.push(self.app.locks.acquire(Lock::License(key.clone())).await);
    }

    let mut members: Vec<i64> = licensed_member::Entity::find()
      .select_only()
      .column(licensed_member::Column::MemberId)
      .filter(licensed_member::Column::LicenseKey.is_in(keys.clone()))
      .into_tuple()
      .all(self.db)
      .await?;
    members.sort_unstable();
    members.dedup();
    for &member in &members {
      guards.push(self.app.locks.acquire(Lock::Member(member)).await);
    }

    let txn = self.db.begin().await?;

    let licenses = license::Entity::find()
      .filter(license::Column::Key.is_in(keys.clone()))
      .filter(license::Column::GuildId.eq(guild_id))
      .all(&txn)
      .await?;
    if licenses.is_empty() {
      return Ok(0);
    }
    let schedules: Vec<i32> =
      licenses.iter().map(|license| license.schedule_id).collect();

    let holdings = licensed_member::Entity::find()
      .filter(licensed_member::Column::LicenseKey.is_in(keys.clone()))
      .find_with_related(licensed_role::Entity)
      .all(&txn)
      .await?;

    let result = license::Entity::delete_many()
      .filter(license::Column::Key.is_in(keys))
      .filter(license::Column::GuildId.eq(guild_id))
      .exec(&txn)
      .await?;
    schedule::delete_many(&txn, schedules).await?;

    let mut applied: Vec<Effects> = Vec::new();
    for (member, grants) in holdings {
      if grants.is_empty() {
        continue;
      }
      let mut effects =
        Effects::new(self.app.roles.as_ref(), guild_id, member.member_id);
      let roles = grants.iter().map(|grant| Action::Revoke(grant.role_id));
      if let Err(err) = effects.apply_all(roles).await {
        for effects in applied.iter_mut().rev() {
          effects.undo().await;
        }
        return Err(err.into());
      }
      applied.push(effects);
    }

    if let Err(err) = txn.commit().await {
      for effects in applied.iter_mut().rev() {
        effects.undo().await;
      }
      return Err(err.into());
    }

    for effects in &applied {
      announce::diagnostics(
        self.app.notifier.as_ref(),
        &guild,
        &format!(
          "Revoked the roles of {} from a deleted license",
          utils::mention(effects.member_id())
        ),
      )
      .await;
    }

    Ok(result.rows_affected)
  }

  /// Redeemable licenses, oldest first, optionally of one packet.
  pub async fn stored(
    &self,
    guild_id: i64,
    packet_id: Option<i32>,
  ) -> Result<Vec<license::Model>> {
    let mut query = license::Entity::find()
      .filter(license::Column::GuildId.eq(guild_id))
      .filter(license::Column::UsesLeft.gt(0));
    if let Some(packet_id) = packet_id {
      query = query.filter(license::Column::PacketId.eq(packet_id));
    }

    Ok(
      query
        .order_by_asc(license::Column::CreatedAt)
        .order_by_asc(license::Column::Key)
        .all(self.db)
        .await?,
    )
  }

  pub async fn count_stored(&self, guild_id: i64) -> Result<u64> {
    Ok(
      license::Entity::find()
        .filter(license::Column::GuildId.eq(guild_id))
        .filter(license::Column::UsesLeft.gt(0))
        .count(self.db)
        .await?,
    )
  }

  pub async fn counts(&self, guild_id: i64) -> Result<LicenseCounts> {
    let total = license::Entity::find()
      .filter(license::Column::GuildId.eq(guild_id))
      .count(self.db)
      .await?;
    let stored = self.count_stored(guild_id).await?;
    Ok(LicenseCounts { stored, inert: total.saturating_sub(stored) })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    entity::schedule as schedule_entity,
    port::testing::{Call, Recorder},
    state::testing,
    sv::redeem::Origin,
  };

  async fn setup() -> (AppState, i32) {
    let (app, _) = testing::app().await;
    let sv = app.sv();
    sv.guild.create(1).await.unwrap();
    sv.role.register(1, 10, 0, 0).await.unwrap();
    let packet = sv.packet.create(1, "vip", 60).await.unwrap();
    sv.packet.add_role(packet.id, 10, None).await.unwrap();
    (app, packet.id)
  }

  fn spec(packet_id: i32) -> LicenseSpec {
    LicenseSpec { packet_id: Some(packet_id), ..Default::default() }
  }

  #[tokio::test]
  async fn test_generate_clones_guild_schedule() {
    let (app, packet) = setup().await;
    let sv = app.sv();
    sv.guild.set_reminders(1, &[120, 30]).await.unwrap();

    let licenses = sv.license.generate(1, spec(packet), 3).await.unwrap();
    assert_eq!(licenses.len(), 3);

    let guild = sv.guild.get(1).await.unwrap();
    for license in &licenses {
      assert_ne!(license.schedule_id, guild.schedule_id);
      assert_eq!(license.uses_left, 1);
      assert_eq!(license.key.len(), 29);
      assert_eq!(
        sv.schedule.activations(license.schedule_id).await.unwrap().as_slice(),
        &[120, 30]
      );
    }

    // later guild changes don't leak into existing licenses
    sv.guild.set_reminders(1, &[10]).await.unwrap();
    assert_eq!(
      sv.schedule
        .activations(licenses[0].schedule_id)
        .await
        .unwrap()
        .as_slice(),
      &[120, 30]
    );
  }

  #[tokio::test]
  async fn test_generate_uses_branding_and_own_activations() {
    let (app, packet) = setup().await;
    let sv = app.sv();
    sv.guild
      .update(1, crate::sv::guild::GuildUpdate {
        branding: Some("ACME-".into()),
        license_format: Some("{branding}DDDDD-DDDDD-DDDDD-DDDDD-DDDDD".into()),
        ..Default::default()
      })
      .await
      .unwrap();

    let spec = LicenseSpec { activations: Some(vec![15]), ..spec(packet) };
    let license = sv.license.generate(1, spec, 1).await.unwrap().remove(0);

    assert!(license.key.starts_with("ACME-"));
    assert_eq!(
      sv.schedule.activations(license.schedule_id).await.unwrap().as_slice(),
      &[15]
    );
  }

  #[tokio::test]
  async fn test_generate_rejects_bad_input() {
    let (app, packet) = setup().await;
    let sv = app.sv();

    assert!(matches!(
      sv.license.generate(1, spec(packet), 0).await,
      Err(Error::Validation(Validation::Amount { .. }))
    ));
    assert!(matches!(
      sv.license
        .generate(1, LicenseSpec { regenerating: true, uses: 2, ..spec(packet) }, 1)
        .await,
      Err(Error::Validation(Validation::RegeneratingMultiUse))
    ));
    assert!(matches!(
      sv.license
        .generate(1, LicenseSpec { uses: MAX_USES + 1, ..spec(packet) }, 1)
        .await,
      Err(Error::Validation(Validation::UsesLeft(_)))
    ));
    assert!(matches!(
      sv.license
        .generate(1, LicenseSpec { activations: Some(vec![1, 2]), ..spec(packet) }, 1)
        .await,
      Err(Error::Validation(Validation::ActivationOrder))
    ));
    assert!(matches!(
      sv.license.generate(2, spec(packet), 1).await,
      Err(Error::NotFound(Missing::Guild(2)))
    ));

    assert_eq!(sv.license.count_stored(1).await.unwrap(), 0);
  }

  #[tokio::test]
  async fn test_stored_cap() {
    let (app, packet) = setup().await;
    let sv = app.sv();

    sv.license.generate(1, spec(packet), 60).await.unwrap();
    assert!(matches!(
      sv.license.generate(1, spec(packet), 41).await,
      Err(Error::Integrity(Integrity::TooManyLicenses { max: 100 }))
    ));
    sv.license.generate(1, spec(packet), 40).await.unwrap();
    assert!(sv.license.create(1, "one_more_license", spec(packet)).await.is_err());

    assert_eq!(sv.license.delete_all(1).await.unwrap(), 100);
    // only the guild template schedule is left
    assert_eq!(schedule_entity::Entity::find().count(&app.db).await.unwrap(), 1);
  }

  #[tokio::test]
  async fn test_create_explicit_key() {
    let (app, packet) = setup().await;
    let sv = app.sv();

    assert!(matches!(
      sv.license.create(1, "short", spec(packet)).await,
      Err(Error::Validation(Validation::KeyLength { len: 5, .. }))
    ));

    let license =
      sv.license.create(1, "hand_made_license", spec(packet)).await.unwrap();
    assert_eq!(sv.license.get("hand_made_license").await.unwrap(), license);

    assert!(matches!(
      sv.license.create(1, "hand_made_license", spec(packet)).await,
      Err(Error::Integrity(Integrity::KeyCollision(_)))
    ));
  }

  #[tokio::test]
  async fn test_update_keeps_regeneration_single_use() {
    let (app, packet) = setup().await;
    let sv = app.sv();
    let key = "updatable_license";
    sv.license
      .create(1, key, LicenseSpec { uses: 5, ..spec(packet) })
      .await
      .unwrap();

    assert!(matches!(
      sv.license
        .update(key, LicenseUpdate { regenerating: Some(true), ..Default::default() })
        .await,
      Err(Error::Validation(Validation::RegeneratingMultiUse))
    ));

    let license = sv
      .license
      .update(key, LicenseUpdate {
        regenerating: Some(true),
        uses_left: Some(1),
        packet_id: Some(None),
        activations: Some(vec![30]),
      })
      .await
      .unwrap();
    assert!(license.regenerating);
    assert_eq!(license.uses_left, 1);
    assert_eq!(license.packet_id, None);
    assert_eq!(
      sv.schedule.activations(license.schedule_id).await.unwrap().as_slice(),
      &[30]
    );
  }

  #[tokio::test]
  async fn test_delete_and_counts() {
    let (app, packet) = setup().await;
    let sv = app.sv();

    let licenses = sv.license.generate(1, spec(packet), 2).await.unwrap();
    sv.license
      .update(&licenses[0].key, LicenseUpdate {
        uses_left: Some(0),
        ..Default::default()
      })
      .await
      .unwrap();

    assert_eq!(
      sv.license.counts(1).await.unwrap(),
      LicenseCounts { stored: 1, inert: 1 }
    );
    assert_eq!(sv.license.stored(1, Some(packet)).await.unwrap().len(), 1);
    assert!(sv.license.stored(1, Some(packet + 1)).await.unwrap().is_empty());

    assert!(sv.license.delete(&licenses[0].key).await.unwrap());
    assert!(!sv.license.delete(&licenses[0].key).await.unwrap());
    assert!(sv.license.by_key(&licenses[0].key).await.unwrap().is_none());
  }

  async fn held_by(
    members: &[i64],
    roles: &[i64],
  ) -> (AppState, Arc<Recorder>, String) {
    let (app, recorder) = testing::app().await;
    let sv = app.sv();
    sv.guild.create(1).await.unwrap();
    let packet = sv.packet.create(1, "vip", 60).await.unwrap();
    for &role in roles {
      sv.role.register(1, role, 0, 0).await.unwrap();
      sv.packet.add_role(packet.id, role, None).await.unwrap();
    }
    let spec = LicenseSpec { uses: 3, ..spec(packet.id) };
    let key = sv.license.generate(1, spec, 1).await.unwrap().remove(0).key;
    for &member in members {
      sv.redeem.redeem(&key, member, Origin::Guild(1)).await.unwrap();
    }
    recorder.clear();
    (app, recorder, key)
  }

  #[tokio::test]
  async fn test_delete_all_takes_roles_from_holders() {
    let (app, recorder, _) = held_by(&[7], &[10]).await;
    let sv = app.sv();

    assert_eq!(sv.license.delete_all(1).await.unwrap(), 1);
    assert_eq!(recorder.revokes(), vec![10]);
    assert!(sv.grant.held(1, 7).await.unwrap().is_empty());

    // nothing left behind for the sweep to miss
    let report =
      sv.sweep.tick_at(now() + TimeDelta::minutes(120)).await.unwrap();
    assert_eq!(report.expired, 0);
    assert_eq!(recorder.revokes(), vec![10]);
  }

  #[tokio::test]
  async fn test_delete_takes_roles_from_every_holder() {
    let (app, recorder, key) = held_by(&[7, 8], &[10]).await;
    let sv = app.sv();

    assert!(sv.license.delete(&key).await.unwrap());
    assert_eq!(recorder.calls(), vec![
      Call::Revoke { guild: 1, member: 7, role: 10 },
      Call::Revoke { guild: 1, member: 8, role: 10 },
    ]);
    assert!(sv.grant.held(1, 7).await.unwrap().is_empty());
    assert!(sv.grant.held(1, 8).await.unwrap().is_empty());
    assert_eq!(licensed_member::Entity::find().count(&app.db).await.unwrap(), 0);
  }

  #[tokio::test]
  async fn test_failed_revoke_keeps_license() {
    let (app, recorder, key) = held_by(&[7], &[10, 11]).await;
    let sv = app.sv();
    recorder.fail_role(11);

    assert!(matches!(sv.license.delete(&key).await, Err(Error::Port(_))));
    // the applied revoke of 10 is undone
    assert_eq!(recorder.revokes(), vec![10]);
    assert_eq!(recorder.grants(), vec![10]);
    assert!(sv.license.by_key(&key).await.unwrap().is_some());
    assert_eq!(sv.grant.active(1, 7).await.unwrap().len(), 2);
  }

  #[tokio::test]
  async fn test_packet_delete_detaches() {
    let (app, packet) = setup().await;
    let sv = app.sv();

    let license = sv.license.generate(1, spec(packet), 1).await.unwrap().remove(0);
    sv.packet.delete(packet).await.unwrap();

    assert_eq!(sv.license.get(&license.key).await.unwrap().packet_id, None);
  }
}
