use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Presence of a row means the activation already fired for the member.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reminders")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub licensed_member_id: i32,
  #[sea_orm(primary_key, auto_increment = false)]
  pub activation: i64,
  pub sent_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::licensed_member::Entity",
    from = "Column::LicensedMemberId",
    to = "super::licensed_member::Column::Id",
    on_delete = "Cascade"
  )]
  LicensedMember,
}

impl Related<super::licensed_member::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::LicensedMember.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
