use sea_orm_migration::prelude::*;

use super::{
  m20260301_000001_create_reminder_schedules::ReminderSchedules,
  m20260301_000002_create_guilds::Guilds,
  m20260301_000004_create_role_packets::RolePackets,
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Licenses::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Licenses::Key).string().not_null().primary_key(),
          )
          .col(ColumnDef::new(Licenses::GuildId).big_integer().not_null())
          .col(ColumnDef::new(Licenses::PacketId).integer().null())
          .col(ColumnDef::new(Licenses::ScheduleId).integer().not_null())
          .col(
            ColumnDef::new(Licenses::Regenerating)
              .boolean()
              .not_null()
              .default(false),
          )
          .col(ColumnDef::new(Licenses::UsesLeft).integer().not_null().default(1))
          .col(ColumnDef::new(Licenses::CreatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_licenses_guild")
              .from(Licenses::Table, Licenses::GuildId)
              .to(Guilds::Table, Guilds::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_licenses_packet")
              .from(Licenses::Table, Licenses::PacketId)
              .to(RolePackets::Table, RolePackets::Id)
              .on_delete(ForeignKeyAction::SetNull),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_licenses_schedule")
              .from(Licenses::Table, Licenses::ScheduleId)
              .to(ReminderSchedules::Table, ReminderSchedules::Id)
              .on_delete(ForeignKeyAction::Restrict),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_licenses_guild")
          .table(Licenses::Table)
          .col(Licenses::GuildId)
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_licenses_schedule")
          .table(Licenses::Table)
          .col(Licenses::ScheduleId)
          .unique()
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Licenses::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Licenses {
  Table,
  Key,
  GuildId,
  PacketId,
  ScheduleId,
  Regenerating,
  UsesLeft,
  CreatedAt,
}
