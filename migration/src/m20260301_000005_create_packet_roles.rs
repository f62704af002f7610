use sea_orm_migration::prelude::*;

use super::{
  m20260301_000003_create_roles::Roles,
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
          .table(PacketRoles::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(PacketRoles::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(PacketRoles::PacketId).integer().not_null())
          .col(ColumnDef::new(PacketRoles::RoleId).big_integer().not_null())
          .col(ColumnDef::new(PacketRoles::Duration).big_integer().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_packet_roles_packet")
              .from(PacketRoles::Table, PacketRoles::PacketId)
              .to(RolePackets::Table, RolePackets::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_packet_roles_role")
              .from(PacketRoles::Table, PacketRoles::RoleId)
              .to(Roles::Table, Roles::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_packet_roles_packet_role")
          .table(PacketRoles::Table)
          .col(PacketRoles::PacketId)
          .col(PacketRoles::RoleId)
          .unique()
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(PacketRoles::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum PacketRoles {
  Table,
  Id,
  PacketId,
  RoleId,
  Duration,
}
