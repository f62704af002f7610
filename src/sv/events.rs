//! Reactions to what happens on the platform side.

use super::{announce, grant};
use crate::{
  entity::{guild, licensed_role},
  lock::Lock,
  prelude::*,
  state::AppState,
};

pub struct Events<'a> {
  app: &'a AppState,
}

impl<'a> Events<'a> {
  pub fn new(app: &'a AppState) -> Self {
    Self { app }
  }

  pub async fn guild_join(&self, guild_id: i64) -> Result<guild::Model> {
    self.app.sv().guild.get_or_create(guild_id).await
  }

  pub async fn guild_remove(&self, guild_id: i64) -> Result<bool> {
    self.app.sv().guild.delete(guild_id).await
  }

  /// Guilds the bot is in at startup.
  pub async fn ready(&self, guild_ids: &[i64]) -> Result<usize> {
    self.app.sv().guild.sync(guild_ids).await
  }

  pub async fn role_delete(&self, role_id: i64) -> Result<bool> {
    let Some(role) = self.app.sv().role.by_id(role_id).await? else {
      return Ok(false);
    };
    self.app.sv().role.delete(role_id).await?;

    if let Some(guild) =
      guild::Entity::find_by_id(role.guild_id).one(&self.app.db).await?
    {
      announce::diagnostics(
        self.app.notifier.as_ref(),
        &guild,
        &format!("Tracked role {role_id} was deleted"),
      )
      .await;
    }
    Ok(true)
  }

  /// Drops tracking of roles a member lost on the platform. `roles` is the
  /// member's current role set.
  pub async fn member_update(
    &self,
    guild_id: i64,
    member_id: i64,
    roles: &[i64],
  ) -> Result<Vec<i64>> {
    let _member = self.app.locks.acquire(Lock::Member(member_id)).await;

    let Some(guild) =
      guild::Entity::find_by_id(guild_id).one(&self.app.db).await?
    else {
      return Ok(Vec::new());
    };

    let lost: Vec<_> = grant::held(&self.app.db, guild_id, member_id)
      .await?
      .into_iter()
      .filter(|held| !roles.contains(&held.role.id))
      .collect();
    if lost.is_empty() {
      return Ok(Vec::new());
    }

    licensed_role::Entity::delete_many()
      .filter(
        licensed_role::Column::Id.is_in(lost.iter().map(|held| held.grant.id)),
      )
      .exec(&self.app.db)
      .await?;

    let removed: Vec<i64> = lost.iter().map(|held| held.role.id).collect();
    info!(
      "Member {member_id} lost tracked roles {removed:?} in guild {guild_id}"
    );
    for role_id in &removed {
      announce::diagnostics(
        self.app.notifier.as_ref(),
        &guild,
        &format!(
          "<@&{role_id}> was removed from {} manually, it won't be restored",
          utils::mention(member_id)
        ),
      )
      .await;
    }

    Ok(removed)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    entity::{
      license, licensed_member, licensed_role, packet, packet_role, schedule,
    },
    state::testing,
    sv::{license::LicenseSpec, redeem::Origin},
  };

  async fn redeemed(app: &AppState, roles: &[i64]) -> String {
    let sv = app.sv();
    sv.guild.get_or_create(1).await.unwrap();
    let packet = sv.packet.create(1, "vip", 60).await.unwrap();
    for &role in roles {
      sv.role.register(1, role, 0, 0).await.unwrap();
      sv.packet.add_role(packet.id, role, None).await.unwrap();
    }
    let spec = LicenseSpec {
      packet_id: Some(packet.id),
      uses: 2,
      ..Default::default()
    };
    let key = sv.license.generate(1, spec, 1).await.unwrap().remove(0).key;
    sv.redeem.redeem(&key, 7, Origin::Guild(1)).await.unwrap();
    key
  }

  #[tokio::test]
  async fn test_manual_removal_is_not_restored() {
    let (app, recorder) = testing::app().await;
    redeemed(&app, &[10, 11]).await;
    recorder.clear();
    let sv = app.sv();

    assert_eq!(sv.events.member_update(1, 7, &[11, 99]).await.unwrap(), vec![10]);
    assert!(sv.events.member_update(1, 7, &[11]).await.unwrap().is_empty());

    let roles: Vec<i64> =
      sv.grant.held(1, 7).await.unwrap().iter().map(|h| h.role.id).collect();
    assert_eq!(roles, vec![11]);
    assert!(recorder.calls().is_empty());
  }

  #[tokio::test]
  async fn test_guild_lifecycle() {
    let (app, _) = testing::app().await;
    let sv = app.sv();

    assert_eq!(sv.events.ready(&[1, 2]).await.unwrap(), 2);
    let guild = sv.events.guild_join(3).await.unwrap();
    assert_eq!(sv.events.guild_join(3).await.unwrap(), guild);

    let key = redeemed(&app, &[10]).await;
    assert!(sv.events.guild_remove(1).await.unwrap());

    assert!(license::Entity::find_by_id(key).one(&app.db).await.unwrap().is_none());
    assert!(sv.grant.held(1, 7).await.unwrap().is_empty());
    assert!(sv.role.by_id(10).await.unwrap().is_none());
    assert_eq!(packet::Entity::find().count(&app.db).await.unwrap(), 0);
    assert_eq!(packet_role::Entity::find().count(&app.db).await.unwrap(), 0);
    assert_eq!(licensed_member::Entity::find().count(&app.db).await.unwrap(), 0);
    assert_eq!(licensed_role::Entity::find().count(&app.db).await.unwrap(), 0);
    // guilds 2 and 3 keep their template schedules
    assert_eq!(schedule::Entity::find().count(&app.db).await.unwrap(), 2);
  }

  #[tokio::test]
  async fn test_role_delete_drops_grants() {
    let (app, _) = testing::app().await;
    redeemed(&app, &[10, 11]).await;
    let sv = app.sv();

    assert!(sv.events.role_delete(10).await.unwrap());
    assert!(!sv.events.role_delete(10).await.unwrap());

    let roles: Vec<i64> =
      sv.grant.held(1, 7).await.unwrap().iter().map(|h| h.role.id).collect();
    assert_eq!(roles, vec![11]);
  }
}
