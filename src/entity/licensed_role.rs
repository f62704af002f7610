use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "licensed_roles")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub role_id: i64,
  pub licensed_member_id: i32,
  /// `None` is a permanent grant
  pub expiration: Option<DateTime>,
}

impl Model {
  pub fn is_active(&self, now: DateTime) -> bool {
    self.expiration.is_none_or(|exp| exp > now)
  }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::role::Entity",
    from = "Column::RoleId",
    to = "super::role::Column::Id",
    on_delete = "Cascade"
  )]
  Role,
  #[sea_orm(
    belongs_to = "super::licensed_member::Entity",
    from = "Column::LicensedMemberId",
    to = "super::licensed_member::Column::Id",
    on_delete = "Cascade"
  )]
  LicensedMember,
}

impl Related<super::role::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Role.def()
  }
}

impl Related<super::licensed_member::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::LicensedMember.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
