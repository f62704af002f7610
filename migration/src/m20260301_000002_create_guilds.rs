use sea_orm_migration::prelude::*;

use super::m20260301_000001_create_reminder_schedules::ReminderSchedules;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Guilds::Table)
          .if_not_exists()
          .col(ColumnDef::new(Guilds::Id).big_integer().not_null().primary_key())
          .col(
            ColumnDef::new(Guilds::CustomPrefix)
              .string_len(10)
              .not_null()
              .default(""),
          )
          .col(
            ColumnDef::new(Guilds::LicenseFormat)
              .string_len(100)
              .not_null()
              .default(""),
          )
          .col(ColumnDef::new(Guilds::Branding).string_len(50).not_null().default(""))
          .col(ColumnDef::new(Guilds::Timezone).small_integer().not_null().default(0))
          .col(ColumnDef::new(Guilds::Language).string_len(2).not_null().default("en"))
          .col(ColumnDef::new(Guilds::ScheduleId).integer().not_null())
          .col(
            ColumnDef::new(Guilds::EnableDmRedeem)
              .boolean()
              .not_null()
              .default(true),
          )
          .col(
            ColumnDef::new(Guilds::PreservePreviousDuration)
              .boolean()
              .not_null()
              .default(true),
          )
          .col(
            ColumnDef::new(Guilds::RemindersEnabled)
              .boolean()
              .not_null()
              .default(true),
          )
          .col(
            ColumnDef::new(Guilds::RemindersChannelId)
              .big_integer()
              .not_null()
              .default(0),
          )
          .col(ColumnDef::new(Guilds::RemindersPing).boolean().not_null().default(true))
          .col(
            ColumnDef::new(Guilds::RemindersSendToDm)
              .boolean()
              .not_null()
              .default(true),
          )
          .col(
            ColumnDef::new(Guilds::LicenseLogEnabled)
              .boolean()
              .not_null()
              .default(false),
          )
          .col(
            ColumnDef::new(Guilds::LicenseLogChannelId)
              .big_integer()
              .not_null()
              .default(0),
          )
          .col(
            ColumnDef::new(Guilds::DiagnosticsEnabled)
              .boolean()
              .not_null()
              .default(false),
          )
          .col(
            ColumnDef::new(Guilds::DiagnosticsChannelId)
              .big_integer()
              .not_null()
              .default(0),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_guilds_schedule")
              .from(Guilds::Table, Guilds::ScheduleId)
              .to(ReminderSchedules::Table, ReminderSchedules::Id)
              .on_delete(ForeignKeyAction::Restrict),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_guilds_schedule")
          .table(Guilds::Table)
          .col(Guilds::ScheduleId)
          .unique()
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Guilds::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Guilds {
  Table,
  Id,
  CustomPrefix,
  LicenseFormat,
  Branding,
  Timezone,
  Language,
  ScheduleId,
  EnableDmRedeem,
  PreservePreviousDuration,
  RemindersEnabled,
  RemindersChannelId,
  RemindersPing,
  RemindersSendToDm,
  LicenseLogEnabled,
  LicenseLogChannelId,
  DiagnosticsEnabled,
  DiagnosticsChannelId,
}
