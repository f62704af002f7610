use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "roles")]
pub struct Model {
  /// Platform role id, unique across all guilds
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: i64,
  pub guild_id: i64,
  /// 0 disables tiering for this role
  pub tier_level: i16,
  pub tier_power: i16,
}

impl Model {
  pub fn is_tiered(&self) -> bool {
    self.tier_level > 0
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
  #[sea_orm(has_many = "super::packet_role::Entity")]
  PacketRoles,
  #[sea_orm(has_many = "super::licensed_role::Entity")]
  LicensedRoles,
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

impl Related<super::licensed_role::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::LicensedRoles.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
