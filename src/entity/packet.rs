use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const MAX_PACKET_ROLES: usize = 20;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "role_packets")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub guild_id: i64,
  pub name: String,
  /// Minutes, used by packet roles added without their own duration
  pub default_duration: i64,
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
  #[sea_orm(has_many = "super::packet_role::Entity")]
  PacketRoles,
}

impl Related<super::guild::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Guild.def()
  }
}

impl Related<super::packet_role::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::PacketRoles.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
