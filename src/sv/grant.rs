use super::{
  announce,
  effects::{Action, Effects},
};
use crate::{
  entity::{guild, licensed_member, licensed_role, role},
  lock::Lock,
  prelude::*,
  state::AppState,
};

/// A tracked role of a member together with what it hangs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Held {
  pub grant: licensed_role::Model,
  pub role: role::Model,
  pub member: licensed_member::Model,
}

/// Every tracked role of `member_id` in the guild, expired ones included.
pub(crate) async fn held<C: ConnectionTrait>(
  conn: &C,
  guild_id: i64,
  member_id: i64,
) -> Result<Vec<Held>> {
  let members: HashMap<i32, licensed_member::Model> =
    licensed_member::Entity::find()
      .filter(licensed_member::Column::MemberId.eq(member_id))
      .all(conn)
      .await?
      .into_iter()
      .map(|member| (member.id, member))
      .collect();

  if members.is_empty() {
    return Ok(Vec::new());
  }

  let rows = licensed_role::Entity::find()
    .filter(
      licensed_role::Column::LicensedMemberId.is_in(members.keys().copied()),
    )
    .find_also_related(role::Entity)
    .filter(role::Column::GuildId.eq(guild_id))
    .order_by_asc(licensed_role::Column::Id)
    .all(conn)
    .await?;

  Ok(
    rows
      .into_iter()
      .filter_map(|(grant, role)| {
        let member = members.get(&grant.licensed_member_id)?.clone();
        Some(Held { grant, role: role?, member })
      })
      .collect(),
  )
}

pub struct Grant<'a> {
  app: &'a AppState,
}

impl<'a> Grant<'a> {
  pub fn new(app: &'a AppState) -> Self {
    Self { app }
  }

  pub async fn held(&self, guild_id: i64, member_id: i64) -> Result<Vec<Held>> {
    held(&self.app.db, guild_id, member_id).await
  }

  pub async fn active(
    &self,
    guild_id: i64,
    member_id: i64,
  ) -> Result<Vec<Held>> {
    let now = now();
    let mut held = self.held(guild_id, member_id).await?;
    held.retain(|held| held.grant.is_active(now));
    Ok(held)
  }

  /// Takes a tracked role away. Nothing to revoke is not an error.
  pub async fn revoke(
    &self,
    guild_id: i64,
    member_id: i64,
    role_id: i64,
  ) -> Result<bool> {
    let revoked = self.remove(guild_id, member_id, Some(role_id)).await?;
    Ok(!revoked.is_empty())
  }

  pub async fn revoke_all(
    &self,
    guild_id: i64,
    member_id: i64,
  ) -> Result<Vec<i64>> {
    self.remove(guild_id, member_id, None).await
  }

  async fn remove(
    &self,
    guild_id: i64,
    member_id: i64,
    only: Option<i64>,
  ) -> Result<Vec<i64>> {
    let _member = self.app.locks.acquire(Lock::Member(member_id)).await;

    let guild = guild::Entity::find_by_id(guild_id)
      .one(&self.app.db)
      .await?
      .ok_or(Missing::Guild(guild_id))?;

    let txn = self.app.db.begin().await?;

    let mut targets = held(&txn, guild_id, member_id).await?;
    targets.retain(|held| only.is_none_or(|role| held.role.id == role));
    if targets.is_empty() {
      return Ok(Vec::new());
    }

    licensed_role::Entity::delete_many()
      .filter(
        licensed_role::Column::Id
          .is_in(targets.iter().map(|held| held.grant.id)),
      )
      .exec(&txn)
      .await?;

    let mut roles: Vec<i64> = targets.iter().map(|held| held.role.id).collect();
    roles.dedup();

    let mut effects =
      Effects::new(self.app.roles.as_ref(), guild_id, member_id);
    effects.apply_all(roles.iter().copied().map(Action::Revoke)).await?;
    if let Err(err) = txn.commit().await {
      effects.undo().await;
      return Err(err.into());
    }

    info!("Revoked roles {roles:?} of member {member_id} in guild {guild_id}");
    let listed =
      roles.iter().map(|role| format!("<@&{role}>")).collect::<Vec<_>>();
    announce::diagnostics(
      self.app.notifier.as_ref(),
      &guild,
      &format!(
        "Revoked {} from {}",
        listed.join(", "),
        utils::mention(member_id)
      ),
    )
    .await;

    Ok(roles)
  }
}
