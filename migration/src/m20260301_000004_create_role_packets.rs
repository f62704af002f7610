use sea_orm_migration::prelude::*;

use super::m20260301_000002_create_guilds::Guilds;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(RolePackets::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(RolePackets::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(RolePackets::GuildId).big_integer().not_null())
          .col(ColumnDef::new(RolePackets::Name).string_len(50).not_null())
          .col(
            ColumnDef::new(RolePackets::DefaultDuration)
              .big_integer()
              .not_null()
              .default(0),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_role_packets_guild")
              .from(RolePackets::Table, RolePackets::GuildId)
              .to(Guilds::Table, Guilds::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_role_packets_guild_name")
          .table(RolePackets::Table)
          .col(RolePackets::GuildId)
          .col(RolePackets::Name)
          .unique()
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(RolePackets::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum RolePackets {
  Table,
  Id,
  GuildId,
  Name,
  DefaultDuration,
}
