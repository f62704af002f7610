//! Per-guild preference cache (prefix and language).

use crate::{entity::guild, prelude::*};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preferences {
  pub prefix: String,
  pub language: String,
}

pub struct GuildCache {
  default_prefix: String,
  entries: DashMap<i64, Preferences>,
}

impl GuildCache {
  pub fn new(default_prefix: impl Into<String>) -> Self {
    Self { default_prefix: default_prefix.into(), entries: DashMap::new() }
  }

  fn defaults(&self) -> Preferences {
    Preferences { prefix: self.default_prefix.clone(), language: "en".into() }
  }

  fn resolve(&self, guild: &guild::Model) -> Preferences {
    let prefix = if guild.custom_prefix.is_empty() {
      self.default_prefix.clone()
    } else {
      guild.custom_prefix.clone()
    };
    Preferences { prefix, language: guild.language.clone() }
  }

  /// Cached preferences, loaded on a miss. Unknown guilds and storage
  /// failures resolve to the defaults without being cached.
  pub async fn get(
    &self,
    db: &DatabaseConnection,
    guild_id: i64,
  ) -> Preferences {
    if let Some(entry) = self.entries.get(&guild_id) {
      return entry.clone();
    }

    match guild::Entity::find_by_id(guild_id).one(db).await {
      Ok(Some(guild)) => {
        let preferences = self.resolve(&guild);
        self.entries.insert(guild_id, preferences.clone());
        preferences
      }
      Ok(None) => self.defaults(),
      Err(err) => {
        error!("Can't load preferences of guild {guild_id}: {err}");
        self.defaults()
      }
    }
  }

  pub fn invalidate(&self, guild_id: i64) {
    self.entries.remove(&guild_id);
  }

  /// Replaces the whole cache with the stored state.
  pub async fn populate(&self, db: &DatabaseConnection) -> Result<()> {
    let guilds = guild::Entity::find().all(db).await?;

    self.entries.clear();
    for guild in &guilds {
      self.entries.insert(guild.id, self.resolve(guild));
    }

    info!("Guild preference cache loaded with {} entries", guilds.len());
    Ok(())
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }
}
