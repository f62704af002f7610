use sea_orm_migration::prelude::*;

use super::{
  m20260301_000003_create_roles::Roles,
  m20260301_000007_create_licensed_members::LicensedMembers,
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(LicensedRoles::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(LicensedRoles::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(LicensedRoles::RoleId).big_integer().not_null())
          .col(ColumnDef::new(LicensedRoles::LicensedMemberId).integer().not_null())
          .col(ColumnDef::new(LicensedRoles::Expiration).date_time().null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_licensed_roles_role")
              .from(LicensedRoles::Table, LicensedRoles::RoleId)
              .to(Roles::Table, Roles::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_licensed_roles_member")
              .from(LicensedRoles::Table, LicensedRoles::LicensedMemberId)
              .to(LicensedMembers::Table, LicensedMembers::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_licensed_roles_role_member")
          .table(LicensedRoles::Table)
          .col(LicensedRoles::RoleId)
          .col(LicensedRoles::LicensedMemberId)
          .unique()
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_licensed_roles_expiration")
          .table(LicensedRoles::Table)
          .col(LicensedRoles::Expiration)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(LicensedRoles::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
pub enum LicensedRoles {
  Table,
  Id,
  RoleId,
  LicensedMemberId,
  Expiration,
}
