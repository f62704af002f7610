use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "guilds")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: i64,
  /// Empty means the default prefix from configuration
  pub custom_prefix: String,
  /// Empty means [`crate::keygen::DEFAULT_FORMAT`]
  pub license_format: String,
  pub branding: String,
  /// Display-only offset from UTC in hours
  pub timezone: i16,
  pub language: String,
  pub schedule_id: i32,
  pub enable_dm_redeem: bool,
  pub preserve_previous_duration: bool,
  pub reminders_enabled: bool,
  pub reminders_channel_id: i64,
  pub reminders_ping: bool,
  pub reminders_send_to_dm: bool,
  pub license_log_enabled: bool,
  pub license_log_channel_id: i64,
  pub diagnostics_enabled: bool,
  pub diagnostics_channel_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::schedule::Entity",
    from = "Column::ScheduleId",
    to = "super::schedule::Column::Id",
    on_delete = "Restrict"
  )]
  Schedule,
  #[sea_orm(has_many = "super::role::Entity")]
  Roles,
  #[sea_orm(has_many = "super::packet::Entity")]
  Packets,
  #[sea_orm(has_many = "super::license::Entity")]
  Licenses,
}

impl Related<super::schedule::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Schedule.def()
  }
}

impl Related<super::role::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Roles.def()
  }
}

impl Related<super::packet::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Packets.def()
  }
}

impl Related<super::license::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Licenses.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
