use crate::{
  entity::{
    guild, packet,
    packet::MAX_PACKET_ROLES,
    packet_role, role,
  },
  prelude::*,
};

pub const MAX_NAME_LENGTH: usize = 50;

fn ensure_name(name: &str) -> Result<&str> {
  let name = name.trim();
  match name.chars().count() {
    1..=MAX_NAME_LENGTH => Ok(name),
    _ => Err(Validation::PacketName.into()),
  }
}

pub struct Packet<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Packet<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn create(
    &self,
    guild_id: i64,
    name: &str,
    default_duration: u32,
  ) -> Result<packet::Model> {
    let name = ensure_name(name)?;
    let default_duration = utils::ensure_duration(default_duration)?;

    if guild::Entity::find_by_id(guild_id).one(self.db).await?.is_none() {
      return Err(Missing::Guild(guild_id).into());
    }

    packet::ActiveModel {
      id: NotSet,
      guild_id: Set(guild_id),
      name: Set(name.to_string()),
      default_duration: Set(default_duration),
    }
    .insert(self.db)
    .await
    .map_err(|err| {
      Error::unique_or(err, Validation::Duplicate(format!("Packet `{name}`")).into())
    })
  }

  pub async fn get(&self, id: i32) -> Result<packet::Model> {
    packet::Entity::find_by_id(id)
      .one(self.db)
      .await?
      .ok_or(Missing::Packet(id.to_string()).into())
  }

  pub async fn by_name(&self, guild_id: i64, name: &str) -> Result<packet::Model> {
    packet::Entity::find()
      .filter(packet::Column::GuildId.eq(guild_id))
      .filter(packet::Column::Name.eq(name.trim()))
      .one(self.db)
      .await?
      .ok_or(Missing::Packet(name.to_string()).into())
  }

  pub async fn all(&self, guild_id: i64) -> Result<Vec<packet::Model>> {
    Ok(
      packet::Entity::find()
        .filter(packet::Column::GuildId.eq(guild_id))
        .order_by_asc(packet::Column::Name)
        .all(self.db)
        .await?,
    )
  }

  pub async fn rename(&self, id: i32, name: &str) -> Result<packet::Model> {
    let name = ensure_name(name)?;
    let packet = self.get(id).await?;

    packet::ActiveModel { name: Set(name.to_string()), ..packet.into() }
      .update(self.db)
      .await
      .map_err(|err| {
        Error::unique_or(
          err,
          Validation::Duplicate(format!("Packet `{name}`")).into(),
        )
      })
  }

  pub async fn set_default_duration(
    &self,
    id: i32,
    minutes: u32,
  ) -> Result<packet::Model> {
    let minutes = utils::ensure_duration(minutes)?;
    let packet = self.get(id).await?;

    Ok(
      packet::ActiveModel { default_duration: Set(minutes), ..packet.into() }
        .update(self.db)
        .await?,
    )
  }

  /// Licenses of a deleted packet stay but grant nothing.
  pub async fn delete(&self, id: i32) -> Result<bool> {
    let result = packet::Entity::delete_by_id(id).exec(self.db).await?;
    Ok(result.rows_affected > 0)
  }

  /// Adds a role with its own duration, or the packet default when `None`.
  pub async fn add_role(
    &self,
    packet_id: i32,
    role_id: i64,
    duration: Option<u32>,
  ) -> Result<packet_role::Model> {
    let duration = duration.map(utils::ensure_duration).transpose()?;

    let txn = self.db.begin().await?;

    let packet = packet::Entity::find_by_id(packet_id)
      .one(&txn)
      .await?
      .ok_or(Missing::Packet(packet_id.to_string()))?;
    let role = role::Entity::find_by_id(role_id)
      .one(&txn)
      .await?
      .ok_or(Missing::Role(role_id))?;

    if role.guild_id != packet.guild_id {
      return Err(Integrity::GuildMismatch.into());
    }

    let entries = packet_role::Entity::find()
      .filter(packet_role::Column::PacketId.eq(packet_id))
      .all(&txn)
      .await?;

    if entries.iter().any(|entry| entry.role_id == role_id) {
      return Err(Integrity::RoleInPacket(packet.name).into());
    }
    if entries.len() >= MAX_PACKET_ROLES {
      return Err(
        Integrity::PacketFull { name: packet.name, max: MAX_PACKET_ROLES }
          .into(),
      );
    }

    let entry = packet_role::ActiveModel {
      id: NotSet,
      packet_id: Set(packet_id),
      role_id: Set(role_id),
      duration: Set(duration.unwrap_or(packet.default_duration)),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    Ok(entry)
  }

  async fn entry(
    &self,
    packet_id: i32,
    role_id: i64,
  ) -> Result<packet_role::Model> {
    packet_role::Entity::find()
      .filter(packet_role::Column::PacketId.eq(packet_id))
      .filter(packet_role::Column::RoleId.eq(role_id))
      .one(self.db)
      .await?
      .ok_or(Missing::PacketRole(role_id).into())
  }

  pub async fn set_role_duration(
    &self,
    packet_id: i32,
    role_id: i64,
    minutes: u32,
  ) -> Result<packet_role::Model> {
    let minutes = utils::ensure_duration(minutes)?;
    let entry = self.entry(packet_id, role_id).await?;

    Ok(
      packet_role::ActiveModel { duration: Set(minutes), ..entry.into() }
        .update(self.db)
        .await?,
    )
  }

  pub async fn remove_role(&self, packet_id: i32, role_id: i64) -> Result<bool> {
    let result = packet_role::Entity::delete_many()
      .filter(packet_role::Column::PacketId.eq(packet_id))
      .filter(packet_role::Column::RoleId.eq(role_id))
      .exec(self.db)
      .await?;
    Ok(result.rows_affected > 0)
  }

  /// Entries in packet order.
  pub async fn roles(&self, packet_id: i32) -> Result<Vec<packet_role::Model>> {
    Ok(
      packet_role::Entity::find()
        .filter(packet_role::Column::PacketId.eq(packet_id))
        .order_by_asc(packet_role::Column::Id)
        .all(self.db)
        .await?,
    )
  }
}
