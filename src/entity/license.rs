use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const MAX_USES: u32 = 1_000_000;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "licenses")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub key: String,
  pub guild_id: i64,
  pub packet_id: Option<i32>,
  pub schedule_id: i32,
  /// Reissues itself under a fresh key once the last use is redeemed
  pub regenerating: bool,
  pub uses_left: i32,
  pub created_at: DateTime,
}

impl Model {
  pub fn is_inert(&self) -> bool {
    self.uses_left <= 0
  }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::guild::Entity",
    from = "Column::GuildId",
    to = "super::guild::Column::Id",
    on_delete = "Cascade"
  )]
  Guild,
  #[sea_orm(
    belongs_to = "super::packet::Entity",
    from = "Column::PacketId",
    to = "super::packet::Column::Id",
    on_delete = "SetNull"
  )]
  Packet,
  #[sea_orm(
    belongs_to = "super::schedule::Entity",
    from = "Column::ScheduleId",
    to = "super::schedule::Column::Id",
    on_delete = "Restrict"
  )]
  Schedule,
  #[sea_orm(has_many = "super::licensed_member::Entity")]
  LicensedMembers,
}

impl Related<super::guild::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Guild.def()
  }
}

impl Related<super::packet::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Packet.def()
  }
}

impl Related<super::schedule::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Schedule.def()
  }
}

impl Related<super::licensed_member::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::LicensedMembers.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
