use std::collections::HashSet;

use sea_orm::sea_query::Expr;
use serde::{Deserialize, Serialize};

use super::{
  announce,
  effects::{Action, Effects},
  grant::{self, Held},
  license as licenses,
};
use crate::{
  entity::{
    guild, license, licensed_member, licensed_role, packet_role, reminder,
  },
  lock::Lock,
  prelude::*,
  state::AppState,
};

/// Where a redemption was issued from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Origin {
  Guild(i64),
  Direct,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
  Granted { role_id: i64, expiration: Option<DateTime> },
  /// Not granted, the member holds a stronger role of the same tier
  Outranked { role_id: i64, by: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redemption {
  pub guild_id: i64,
  pub member_id: i64,
  pub outcomes: Vec<Outcome>,
  /// Previously held roles taken away by a stronger grant
  pub revoked: Vec<i64>,
  pub uses_left: i32,
  /// Key of the license that replaced a spent regenerating one
  pub regenerated: Option<String>,
}

impl Redemption {
  pub fn granted(&self) -> impl Iterator<Item = i64> + '_ {
    self.outcomes.iter().filter_map(|outcome| match outcome {
      Outcome::Granted { role_id, .. } => Some(*role_id),
      Outcome::Outranked { .. } => None,
    })
  }
}

/// Remaining time carried over from grants being replaced.
#[derive(Default)]
struct Carry {
  permanent: bool,
  remaining: TimeDelta,
}

impl Carry {
  fn add(&mut self, expiration: Option<DateTime>, now: DateTime) {
    match expiration {
      None => self.permanent = true,
      Some(expiration) => self.remaining += expiration - now,
    }
  }
}

#[derive(Default)]
struct Plan {
  actions: Vec<Action>,
  outcomes: Vec<Outcome>,
  revoked: Vec<i64>,
}

impl Plan {
  fn grant(&mut self, role_id: i64, expiration: Option<DateTime>) {
    self.actions.push(Action::Grant(role_id));
    self.outcomes.push(Outcome::Granted { role_id, expiration });
  }

  /// `role_id` loses its tier slot to `by`.
  fn displace(&mut self, role_id: i64, by: i64, on_platform: bool) {
    if let Some(pos) =
      self.actions.iter().position(|&action| action == Action::Grant(role_id))
    {
      self.actions.remove(pos);
      for outcome in &mut self.outcomes {
        if matches!(outcome, Outcome::Granted { role_id: id, .. } if *id == role_id)
        {
          *outcome = Outcome::Outranked { role_id, by };
        }
      }
    }

    if on_platform {
      self.actions.push(Action::Revoke(role_id));
      self.revoked.push(role_id);
    }
  }
}

async fn licensed_member<C: ConnectionTrait>(
  conn: &C,
  member_id: i64,
  key: &str,
) -> Result<licensed_member::Model> {
  let found = licensed_member::Entity::find()
    .filter(licensed_member::Column::MemberId.eq(member_id))
    .filter(licensed_member::Column::LicenseKey.eq(key))
    .one(conn)
    .await?;

  match found {
    Some(member) => Ok(member),
    None => Ok(
      licensed_member::ActiveModel {
        id: NotSet,
        member_id: Set(member_id),
        license_key: Set(key.to_string()),
      }
      .insert(conn)
      .await?,
    ),
  }
}

pub struct Redeem<'a> {
  app: &'a AppState,
}

impl<'a> Redeem<'a> {
  pub fn new(app: &'a AppState) -> Self {
    Self { app }
  }

  pub async fn redeem(
    &self,
    key: &str,
    member_id: i64,
    origin: Origin,
  ) -> Result<Redemption> {
    let _license = self.app.locks.acquire(Lock::License(key.to_string())).await;
    let _member = self.app.locks.acquire(Lock::Member(member_id)).await;

    let txn = self.app.db.begin().await?;

    let license = license::Entity::find_by_id(key)
      .one(&txn)
      .await?
      .ok_or(Missing::License)?;
    if license.is_inert() {
      return Err(Error::Inert);
    }

    let guild = guild::Entity::find_by_id(license.guild_id)
      .one(&txn)
      .await?
      .ok_or(Missing::Guild(license.guild_id))?;

    match origin {
      Origin::Guild(id) if id != guild.id => {
        return Err(Missing::License.into());
      }
      Origin::Direct if !guild.enable_dm_redeem => {
        return Err(Validation::DmRedeemDisabled.into());
      }
      _ => {}
    }

    let packet_id = license.packet_id.ok_or(Integrity::EmptyLicense)?;
    let entries = packet_role::Entity::find()
      .filter(packet_role::Column::PacketId.eq(packet_id))
      .order_by_asc(packet_role::Column::Id)
      .find_also_related(crate::entity::role::Entity)
      .all(&txn)
      .await?;
    if entries.is_empty() {
      return Err(Integrity::EmptyLicense.into());
    }

    let consumed = license::Entity::update_many()
      .col_expr(
        license::Column::UsesLeft,
        Expr::col(license::Column::UsesLeft).sub(1),
      )
      .filter(license::Column::Key.eq(key))
      .filter(license::Column::UsesLeft.gt(0))
      .exec(&txn)
      .await?;
    if consumed.rows_affected != 1 {
      return Err(Error::Inert);
    }
    let uses_left = license.uses_left - 1;

    let now = now();
    let member = licensed_member(&txn, member_id, key).await?;
    let mut held = grant::held(&txn, guild.id, member_id).await?;
    let on_platform: HashSet<i64> = held.iter().map(|h| h.role.id).collect();

    // grants written by this redemption carry no previous time
    let mut fresh = HashSet::new();
    let mut plan = Plan::default();
    for (entry, role) in entries {
      let Some(role) = role else { continue };

      if role.is_tiered()
        && let Some(winner) = held.iter().find(|held| {
          held.role.id != role.id
            && held.role.tier_level == role.tier_level
            && held.role.tier_power > role.tier_power
            && held.grant.is_active(now)
        })
      {
        plan.outcomes.push(Outcome::Outranked {
          role_id: role.id,
          by: winner.role.id,
        });
        continue;
      }

      let (leaving, kept): (Vec<Held>, Vec<Held>) =
        held.into_iter().partition(|held| {
          held.role.id == role.id
            || (role.is_tiered() && held.role.tier_level == role.tier_level)
        });
      held = kept;

      let mut carry = Carry::default();
      for old in leaving {
        if guild.preserve_previous_duration
          && old.grant.is_active(now)
          && !fresh.contains(&old.grant.id)
        {
          carry.add(old.grant.expiration, now);
        }
        licensed_role::Entity::delete_by_id(old.grant.id).exec(&txn).await?;

        if old.role.id != role.id {
          let shown = on_platform.contains(&old.role.id);
          plan.displace(old.role.id, role.id, shown);
        }
      }

      let expiration = if entry.duration == 0 || carry.permanent {
        None
      } else {
        Some(now + utils::minutes(entry.duration) + carry.remaining)
      };

      let grant = licensed_role::ActiveModel {
        id: NotSet,
        role_id: Set(role.id),
        licensed_member_id: Set(member.id),
        expiration: Set(expiration),
      }
      .insert(&txn)
      .await?;

      fresh.insert(grant.id);
      plan.grant(role.id, expiration);
      held.push(Held { grant, role, member: member.clone() });
    }

    // a fresh grant starts its reminders over
    reminder::Entity::delete_many()
      .filter(reminder::Column::LicensedMemberId.eq(member.id))
      .exec(&txn)
      .await?;

    let regenerated = if license.regenerating && uses_left == 0 {
      Some(licenses::regenerate(&txn, &guild, &license).await?)
    } else {
      None
    };

    let mut effects =
      Effects::new(self.app.roles.as_ref(), guild.id, member_id);
    effects.apply_all(plan.actions).await?;
    if let Err(err) = txn.commit().await {
      effects.undo().await;
      return Err(err.into());
    }

    let redemption = Redemption {
      guild_id: guild.id,
      member_id,
      outcomes: plan.outcomes,
      revoked: plan.revoked,
      uses_left,
      regenerated: regenerated.map(|license| license.key),
    };

    info!(
      "Member {member_id} redeemed a license in guild {}, {} uses left",
      guild.id, uses_left
    );
    announce::license_log(
      self.app.notifier.as_ref(),
      &guild,
      &log_message(&guild, key, &redemption),
    )
    .await;

    Ok(redemption)
  }
}

fn log_message(guild: &guild::Model, key: &str, redemption: &Redemption) -> String {
  let mut lines =
    vec![format!("{} redeemed `{key}`", utils::mention(redemption.member_id))];

  for outcome in &redemption.outcomes {
    lines.push(match outcome {
      Outcome::Granted { role_id, expiration: Some(expiration) } => format!(
        "+ <@&{role_id}> until {}",
        utils::format_date(*expiration, guild.timezone)
      ),
      Outcome::Granted { role_id, expiration: None } => {
        format!("+ <@&{role_id}> permanently")
      }
      Outcome::Outranked { role_id, by } => {
        format!("  <@&{role_id}> skipped, <@&{by}> is stronger")
      }
    });
  }
  for role_id in &redemption.revoked {
    lines.push(format!("- <@&{role_id}>"));
  }
  if let Some(key) = &redemption.regenerated {
    lines.push(format!("Regenerated as `{key}`"));
  }

  lines.join("\n")
}
