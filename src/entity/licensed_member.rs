use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "licensed_members")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub member_id: i64,
  pub license_key: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::license::Entity",
    from = "Column::LicenseKey",
    to = "super::license::Column::Key",
    on_delete = "Cascade"
  )]
  License,
  #[sea_orm(has_many = "super::licensed_role::Entity")]
  LicensedRoles,
  #[sea_orm(has_many = "super::reminder::Entity")]
  Reminders,
}

impl Related<super::license::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::License.def()
  }
}

impl Related<super::licensed_role::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::LicensedRoles.def()
  }
}

impl Related<super::reminder::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Reminders.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
