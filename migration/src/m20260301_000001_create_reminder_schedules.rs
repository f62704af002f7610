use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(ReminderSchedules::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(ReminderSchedules::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          // ordered minutes-before-expiration, zeros already dropped
          .col(ColumnDef::new(ReminderSchedules::Activations).json().not_null())
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(ReminderSchedules::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
pub enum ReminderSchedules {
  Table,
  Id,
  Activations,
}
