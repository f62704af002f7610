use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "packet_roles")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub packet_id: i32,
  pub role_id: i64,
  /// Minutes, 0 grants the role permanently
  pub duration: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::packet::Entity",
    from = "Column::PacketId",
    to = "super::packet::Column::Id",
    on_delete = "Cascade"
  )]
  Packet,
  #[sea_orm(
    belongs_to = "super::role::Entity",
    from = "Column::RoleId",
    to = "super::role::Column::Id",
    on_delete = "Cascade"
  )]
  Role,
}

impl Related<super::packet::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Packet.def()
  }
}

impl Related<super::role::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Role.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
