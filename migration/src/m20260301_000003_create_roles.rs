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
          .table(Roles::Table)
          .if_not_exists()
          .col(ColumnDef::new(Roles::Id).big_integer().not_null().primary_key())
          .col(ColumnDef::new(Roles::GuildId).big_integer().not_null())
          .col(ColumnDef::new(Roles::TierLevel).small_integer().not_null().default(0))
          .col(ColumnDef::new(Roles::TierPower).small_integer().not_null().default(0))
          .foreign_key(
            ForeignKey::create()
              .name("fk_roles_guild")
              .from(Roles::Table, Roles::GuildId)
              .to(Guilds::Table, Guilds::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    // (tier_level, tier_power) uniqueness only applies to tiered roles and is
    // checked by the role service
    manager
      .create_index(
        Index::create()
          .name("idx_roles_guild_tier")
          .table(Roles::Table)
          .col(Roles::GuildId)
          .col(Roles::TierLevel)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Roles::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Roles {
  Table,
  Id,
  GuildId,
  TierLevel,
  TierPower,
}
