use sea_orm_migration::prelude::*;

use super::m20260301_000007_create_licensed_members::LicensedMembers;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Reminders::Table)
          .if_not_exists()
          .col(ColumnDef::new(Reminders::LicensedMemberId).integer().not_null())
          .col(ColumnDef::new(Reminders::Activation).big_integer().not_null())
          .col(ColumnDef::new(Reminders::SentAt).date_time().not_null())
          .primary_key(
            Index::create()
              .col(Reminders::LicensedMemberId)
              .col(Reminders::Activation),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_reminders_licensed_member")
              .from(Reminders::Table, Reminders::LicensedMemberId)
              .to(LicensedMembers::Table, LicensedMembers::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Reminders::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Reminders {
  Table,
  LicensedMemberId,
  Activation,
  SentAt,
}
