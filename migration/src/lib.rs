pub use sea_orm_migration::prelude::*;

mod m20260301_000001_create_reminder_schedules;
mod m20260301_000002_create_guilds;
mod m20260301_000003_create_roles;
mod m20260301_000004_create_role_packets;
mod m20260301_000005_create_packet_roles;
mod m20260301_000006_create_licenses;
mod m20260301_000007_create_licensed_members;
mod m20260301_000008_create_licensed_roles;
mod m20260301_000009_create_reminders;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
  fn migrations() -> Vec<Box<dyn MigrationTrait>> {
    vec![
      Box::new(m20260301_000001_create_reminder_schedules::Migration),
      Box::new(m20260301_000002_create_guilds::Migration),
      Box::new(m20260301_000003_create_roles::Migration),
      Box::new(m20260301_000004_create_role_packets::Migration),
      Box::new(m20260301_000005_create_packet_roles::Migration),
      Box::new(m20260301_000006_create_licenses::Migration),
      Box::new(m20260301_000007_create_licensed_members::Migration),
      Box::new(m20260301_000008_create_licensed_roles::Migration),
      Box::new(m20260301_000009_create_reminders::Migration),
    ]
  }
}
