//! Periodic maintenance: expiring grants, delivering reminders and
//! pruning spent license holders.

use std::{
  collections::HashSet,
  sync::atomic::{AtomicBool, Ordering},
};

use sea_orm::sea_query::OnConflict;
use serde::Serialize;

use super::{
  announce,
  effects::{Action, Effects},
};
use crate::{
  entity::{
    Activations, guild, license, licensed_member, licensed_role, reminder,
    role, schedule,
  },
  lock::Lock,
  prelude::*,
  state::AppState,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
  pub expired: usize,
  pub reminded: usize,
  pub pruned: u64,
  pub failures: usize,
}

struct Flight<'a>(&'a AtomicBool);

impl Drop for Flight<'_> {
  fn drop(&mut self) {
    self.0.store(false, Ordering::Release);
  }
}

pub struct Sweep<'a> {
  app: &'a AppState,
  running: &'a AtomicBool,
}

impl<'a> Sweep<'a> {
  pub fn new(app: &'a AppState, running: &'a AtomicBool) -> Self {
    Self { app, running }
  }

  pub async fn tick(&self) -> Option<SweepReport> {
    self.tick_at(now()).await
  }

  /// Runs one sweep as of `now`, or `None` if another one is in flight.
  pub async fn tick_at(&self, now: DateTime) -> Option<SweepReport> {
    if self
      .running
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .is_err()
    {
      debug!("Sweep is still running, skipping tick");
      return None;
    }
    let _flight = Flight(self.running);

    let mut report = SweepReport::default();

    if let Err(err) = self.expire(now, &mut report).await {
      error!("Expiration sweep failed: {err}");
      report.failures += 1;
    }
    if let Err(err) = self.remind(now, &mut report).await {
      error!("Reminder sweep failed: {err}");
      report.failures += 1;
    }
    match self.prune().await {
      Ok(pruned) => report.pruned = pruned,
      Err(err) => {
        error!("Pruning failed: {err}");
        report.failures += 1;
      }
    }

    self.app.locks.gc();
    Some(report)
  }

  async fn expire(&self, now: DateTime, report: &mut SweepReport) -> Result<()> {
    let expired = licensed_role::Entity::find()
      .filter(licensed_role::Column::Expiration.lte(now))
      .find_also_related(role::Entity)
      .all(&self.app.db)
      .await?;
    if expired.is_empty() {
      return Ok(());
    }

    let members: HashMap<i32, i64> = licensed_member::Entity::find()
      .filter(
        licensed_member::Column::Id
          .is_in(expired.iter().map(|(grant, _)| grant.licensed_member_id)),
      )
      .all(&self.app.db)
      .await?
      .into_iter()
      .map(|member| (member.id, member.member_id))
      .collect();

    for (grant, role) in expired {
      let (Some(role), Some(&member_id)) =
        (role, members.get(&grant.licensed_member_id))
      else {
        continue;
      };

      match self.expire_one(&grant, &role, member_id, now).await {
        Ok(true) => {
          report.expired += 1;
          self.log_expiration(&role, member_id).await;
        }
        Ok(false) => {}
        Err(err) => {
          warn!(
            "Failed to expire role {} of member {member_id}, retrying later: \
             {err}",
            role.id
          );
          report.failures += 1;
        }
      }
    }

    Ok(())
  }

  /// `false` when the grant was renewed or removed in the meantime.
  async fn expire_one(
    &self,
    grant: &licensed_role::Model,
    role: &role::Model,
    member_id: i64,
    now: DateTime,
  ) -> Result<bool> {
    let _member = self.app.locks.acquire(Lock::Member(member_id)).await;

    let txn = self.app.db.begin().await?;
    let deleted = licensed_role::Entity::delete_many()
      .filter(licensed_role::Column::Id.eq(grant.id))
      .filter(licensed_role::Column::Expiration.lte(now))
      .exec(&txn)
      .await?;
    if deleted.rows_affected == 0 {
      return Ok(false);
    }

    Effects::new(self.app.roles.as_ref(), role.guild_id, member_id)
      .apply(Action::Revoke(role.id))
      .await?;
    txn.commit().await?;

    debug!("Role {} of member {member_id} expired", role.id);
    Ok(true)
  }

  async fn log_expiration(&self, role: &role::Model, member_id: i64) {
    match guild::Entity::find_by_id(role.guild_id).one(&self.app.db).await {
      Ok(Some(guild)) => {
        let message = format!(
          "<@&{}> of {} expired",
          role.id,
          utils::mention(member_id)
        );
        announce::license_log(self.app.notifier.as_ref(), &guild, &message)
          .await;
      }
      Ok(None) => {}
      Err(err) => warn!("Can't load guild {}: {err}", role.guild_id),
    }
  }

  async fn remind(&self, now: DateTime, report: &mut SweepReport) -> Result<()> {
    let guilds = guild::Entity::find()
      .filter(guild::Column::RemindersEnabled.eq(true))
      .all(&self.app.db)
      .await?;

    for guild in guilds {
      if let Err(err) = self.remind_guild(&guild, now, report).await {
        warn!("Reminders of guild {} failed: {err}", guild.id);
        report.failures += 1;
      }
    }

    Ok(())
  }

  async fn remind_guild(
    &self,
    guild: &guild::Model,
    now: DateTime,
    report: &mut SweepReport,
  ) -> Result<()> {
    let db = &self.app.db;

    let licenses: HashMap<String, i32> = license::Entity::find()
      .filter(license::Column::GuildId.eq(guild.id))
      .all(db)
      .await?
      .into_iter()
      .map(|license| (license.key, license.schedule_id))
      .collect();
    if licenses.is_empty() {
      return Ok(());
    }

    let members = licensed_member::Entity::find()
      .filter(licensed_member::Column::LicenseKey.is_in(licenses.keys().cloned()))
      .all(db)
      .await?;
    if members.is_empty() {
      return Ok(());
    }
    let ids = members.iter().map(|member| member.id).collect::<Vec<_>>();

    let schedules: HashMap<i32, Activations> = schedule::Entity::find()
      .filter(schedule::Column::Id.is_in(licenses.values().copied()))
      .all(db)
      .await?
      .into_iter()
      .filter_map(|schedule| match schedule.activations() {
        Ok(activations) => Some((schedule.id, activations)),
        Err(err) => {
          warn!("Skipping reminders of guild {}: {err}", guild.id);
          None
        }
      })
      .collect();

    let mut nearest: HashMap<i32, DateTime> = HashMap::new();
    let upcoming = licensed_role::Entity::find()
      .filter(licensed_role::Column::LicensedMemberId.is_in(ids.clone()))
      .filter(licensed_role::Column::Expiration.gt(now))
      .all(db)
      .await?;
    for grant in upcoming {
      if let Some(expiration) = grant.expiration {
        nearest
          .entry(grant.licensed_member_id)
          .and_modify(|nearest| *nearest = (*nearest).min(expiration))
          .or_insert(expiration);
      }
    }

    let sent: HashSet<(i32, i64)> = reminder::Entity::find()
      .filter(reminder::Column::LicensedMemberId.is_in(ids))
      .all(db)
      .await?
      .into_iter()
      .map(|sent| (sent.licensed_member_id, sent.activation))
      .collect();

    for member in &members {
      let Some(&expiration) = nearest.get(&member.id) else { continue };
      let Some(activations) =
        licenses.get(&member.license_key).and_then(|id| schedules.get(id))
      else {
        continue;
      };

      let remaining = expiration - now;
      let due: Vec<i64> = activations
        .iter()
        .map(i64::from)
        .filter(|&activation| {
          remaining <= utils::minutes(activation)
            && !sent.contains(&(member.id, activation))
        })
        .collect();
      if due.is_empty() {
        continue;
      }

      match self.send_reminder(guild, member, expiration, now, &due).await {
        Ok(()) => report.reminded += 1,
        Err(err) => {
          warn!("Reminder for member {} failed: {err}", member.member_id);
          report.failures += 1;
        }
      }
    }

    Ok(())
  }

  /// One message for every activation in `due`, marked sent on success.
  async fn send_reminder(
    &self,
    guild: &guild::Model,
    member: &licensed_member::Model,
    expiration: DateTime,
    now: DateTime,
    due: &[i64],
  ) -> Result<()> {
    let message = format!(
      "Your licensed role expires in {} ({})",
      utils::format_duration(expiration - now),
      utils::format_date(expiration, guild.timezone)
    );

    // marked once any destination got it
    let mut failed = None;
    let mut delivered = 0;
    let targets = announce::reminder_targets(guild, member.member_id, &message);
    for (destination, text) in targets {
      match self.app.notifier.send(destination, &text).await {
        Ok(()) => delivered += 1,
        Err(err) => {
          let member = member.member_id;
          warn!("Failed to remind member {member} via {destination:?}: {err}");
          failed = Some(err);
        }
      }
    }
    if let Some(err) = failed
      && delivered == 0
    {
      return Err(err.into());
    }

    reminder::Entity::insert_many(due.iter().map(|&activation| {
      reminder::ActiveModel {
        licensed_member_id: Set(member.id),
        activation: Set(activation),
        sent_at: Set(now),
      }
    }))
    .on_conflict(
      OnConflict::columns([
        reminder::Column::LicensedMemberId,
        reminder::Column::Activation,
      ])
      .do_nothing()
      .to_owned(),
    )
    .exec_without_returning(&self.app.db)
    .await?;

    Ok(())
  }

  /// Removes holders of spent licenses that have no roles left.
  async fn prune(&self) -> Result<u64> {
    let orphans: Vec<i32> = licensed_member::Entity::find()
      .select_only()
      .column(licensed_member::Column::Id)
      .left_join(licensed_role::Entity)
      .inner_join(license::Entity)
      .filter(licensed_role::Column::Id.is_null())
      .filter(license::Column::UsesLeft.lte(0))
      .into_tuple()
      .all(&self.app.db)
      .await?;
    if orphans.is_empty() {
      return Ok(0);
    }

    let result = licensed_member::Entity::delete_many()
      .filter(licensed_member::Column::Id.is_in(orphans))
      .exec(&self.app.db)
      .await?;
    Ok(result.rows_affected)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    port::{Destination, PortError, testing::Recorder},
    state::testing,
    sv::{guild::GuildUpdate, license::LicenseSpec, redeem::Origin},
  };

  const MEMBER: i64 = 7;

  /// Guild 1 with `member` holding role 10 for `minutes`.
  async fn holding(minutes: u32, uses: u32) -> (AppState, Arc<Recorder>, String) {
    let (app, recorder) = testing::app().await;
    let sv = app.sv();
    sv.guild.create(1).await.unwrap();
    sv.role.register(1, 10, 0, 0).await.unwrap();
    let packet = sv.packet.create(1, "vip", minutes).await.unwrap();
    sv.packet.add_role(packet.id, 10, None).await.unwrap();

    let spec =
      LicenseSpec { packet_id: Some(packet.id), uses, ..Default::default() };
    let key = sv.license.generate(1, spec, 1).await.unwrap().remove(0).key;
    sv.redeem.redeem(&key, MEMBER, Origin::Guild(1)).await.unwrap();
    recorder.clear();

    (app, recorder, key)
  }

  fn later(minutes: i64) -> DateTime {
    now() + utils::minutes(minutes)
  }

  async fn enable_reminders(app: &AppState, activations: &[u32]) {
    let sv = app.sv();
    sv.guild
      .update(1, GuildUpdate {
        reminders_enabled: Some(true),
        reminders_channel_id: Some(5),
        reminders_ping: Some(true),
        reminders_send_to_dm: Some(true),
        ..Default::default()
      })
      .await
      .unwrap();

    // licenses keep their own copy of the guild schedule
    for license in license::Entity::find().all(&app.db).await.unwrap() {
      sv.schedule.update(license.schedule_id, activations).await.unwrap();
    }
  }

  async fn sent_flags(app: &AppState) -> Vec<i64> {
    reminder::Entity::find()
      .order_by_asc(reminder::Column::Activation)
      .all(&app.db)
      .await
      .unwrap()
      .into_iter()
      .map(|sent| sent.activation)
      .collect()
  }

  #[tokio::test]
  async fn test_expired_roles_are_revoked() {
    let (app, recorder, _) = holding(60, 2).await;
    let sv = app.sv();

    let report = sv.sweep.tick_at(later(30)).await.unwrap();
    assert_eq!(report.expired, 0);
    assert!(recorder.revokes().is_empty());

    let report = sv.sweep.tick_at(later(61)).await.unwrap();
    assert_eq!(report.expired, 1);
    assert_eq!(recorder.revokes(), vec![10]);
    assert!(sv.grant.held(1, MEMBER).await.unwrap().is_empty());

    let report = sv.sweep.tick_at(later(62)).await.unwrap();
    assert_eq!(report, SweepReport::default());
  }

  #[tokio::test]
  async fn test_permanent_roles_stay() {
    let (app, recorder, _) = holding(0, 1).await;
    let sv = app.sv();

    let report = sv.sweep.tick_at(later(60 * 24 * 400)).await.unwrap();
    assert_eq!(report.expired, 0);
    assert!(recorder.revokes().is_empty());
    assert_eq!(sv.grant.held(1, MEMBER).await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn test_transient_failure_is_retried() {
    let (app, recorder, _) = holding(60, 2).await;
    let sv = app.sv();
    recorder.fail_role(10);

    let report = sv.sweep.tick_at(later(61)).await.unwrap();
    assert_eq!((report.expired, report.failures), (0, 1));
    assert_eq!(sv.grant.held(1, MEMBER).await.unwrap().len(), 1);

    recorder.heal_role(10);
    let report = sv.sweep.tick_at(later(62)).await.unwrap();
    assert_eq!(report.expired, 1);
    assert!(sv.grant.held(1, MEMBER).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_member_gone_from_platform() {
    let (app, recorder, _) = holding(60, 2).await;
    let sv = app.sv();
    recorder.fail_role_with(10, PortError::NotFound("member".into()));

    let report = sv.sweep.tick_at(later(61)).await.unwrap();
    assert_eq!((report.expired, report.failures), (1, 0));
    assert!(sv.grant.held(1, MEMBER).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_spent_holders_are_pruned() {
    let (app, _, key) = holding(60, 1).await;
    let sv = app.sv();

    let report = sv.sweep.tick_at(later(61)).await.unwrap();
    assert_eq!(report.pruned, 1);
    assert_eq!(licensed_member::Entity::find().count(&app.db).await.unwrap(), 0);
    // the spent license itself stays
    assert!(sv.license.by_key(&key).await.unwrap().is_some());
  }

  #[tokio::test]
  async fn test_holders_of_redeemable_licenses_stay() {
    let (app, _, _) = holding(60, 2).await;
    let report = app.sv().sweep.tick_at(later(61)).await.unwrap();
    assert_eq!(report.pruned, 0);
  }

  #[tokio::test]
  async fn test_reminders_fire_once_per_activation() {
    let (app, recorder, _) = holding(90, 1).await;
    enable_reminders(&app, &[120, 60]).await;
    let sv = app.sv();

    let report = sv.sweep.tick_at(now()).await.unwrap();
    assert_eq!(report.reminded, 1);
    let messages = recorder.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].0, Destination::Channel(5));
    assert!(messages[0].1.starts_with("<@7> "));
    assert_eq!(messages[1].0, Destination::Direct(MEMBER));
    assert_eq!(sent_flags(&app).await, vec![120]);

    recorder.clear();
    assert_eq!(sv.sweep.tick_at(now()).await.unwrap().reminded, 0);
    assert!(recorder.messages().is_empty());

    assert_eq!(sv.sweep.tick_at(later(31)).await.unwrap().reminded, 1);
    assert_eq!(sent_flags(&app).await, vec![60, 120]);
  }

  #[tokio::test]
  async fn test_crossed_activations_share_one_reminder() {
    let (app, recorder, _) = holding(30, 1).await;
    enable_reminders(&app, &[120, 60]).await;
    let sv = app.sv();
    sv.guild
      .update(1, GuildUpdate {
        reminders_send_to_dm: Some(false),
        ..Default::default()
      })
      .await
      .unwrap();

    assert_eq!(sv.sweep.tick_at(now()).await.unwrap().reminded, 1);
    assert_eq!(recorder.messages().len(), 1);
    assert_eq!(sent_flags(&app).await, vec![60, 120]);
  }

  #[tokio::test]
  async fn test_failed_reminder_is_not_marked() {
    let (app, recorder, _) = holding(90, 1).await;
    enable_reminders(&app, &[120]).await;
    let sv = app.sv();

    recorder.fail_sends(true);
    let report = sv.sweep.tick_at(now()).await.unwrap();
    assert_eq!((report.reminded, report.failures), (0, 1));
    assert!(sent_flags(&app).await.is_empty());

    recorder.fail_sends(false);
    assert_eq!(sv.sweep.tick_at(now()).await.unwrap().reminded, 1);
    assert_eq!(sent_flags(&app).await, vec![120]);
  }

  #[tokio::test]
  async fn test_partly_delivered_reminder_is_marked() {
    let (app, recorder, _) = holding(90, 1).await;
    enable_reminders(&app, &[120]).await;
    let sv = app.sv();

    recorder.fail_dms(true);
    let report = sv.sweep.tick_at(now()).await.unwrap();
    assert_eq!((report.reminded, report.failures), (1, 0));
    assert_eq!(recorder.messages().len(), 1);
    assert_eq!(sent_flags(&app).await, vec![120]);

    // the channel is not posted to again
    recorder.clear();
    assert_eq!(sv.sweep.tick_at(later(1)).await.unwrap().reminded, 0);
    assert!(recorder.messages().is_empty());
  }

  #[tokio::test]
  async fn test_disabled_reminders_stay_silent() {
    let (app, recorder, _) = holding(30, 1).await;
    app
      .sv()
      .guild
      .update(1, GuildUpdate {
        reminders_enabled: Some(false),
        ..Default::default()
      })
      .await
      .unwrap();
    let report = app.sv().sweep.tick_at(now()).await.unwrap();

    assert_eq!(report.reminded, 0);
    assert!(recorder.messages().is_empty());
  }

  #[tokio::test]
  async fn test_overlapping_tick_is_skipped() {
    let (app, _) = testing::app().await;
    let running = AtomicBool::new(true);

    assert!(Sweep::new(&app, &running).tick().await.is_none());

    running.store(false, Ordering::Release);
    assert!(Sweep::new(&app, &running).tick().await.is_some());
    assert!(!running.load(Ordering::Acquire));
  }
}
