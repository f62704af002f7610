use sea_orm_migration::prelude::*;

use super::m20260301_000006_create_licenses::Licenses;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(LicensedMembers::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(LicensedMembers::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(LicensedMembers::MemberId).big_integer().not_null())
          .col(ColumnDef::new(LicensedMembers::LicenseKey).string().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_licensed_members_license")
              .from(LicensedMembers::Table, LicensedMembers::LicenseKey)
              .to(Licenses::Table, Licenses::Key)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_licensed_members_member_license")
          .table(LicensedMembers::Table)
          .col(LicensedMembers::MemberId)
          .col(LicensedMembers::LicenseKey)
          .unique()
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(LicensedMembers::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
pub enum LicensedMembers {
  Table,
  Id,
  MemberId,
  LicenseKey,
}
