use sea_orm::prelude::Json;

use crate::{
  entity::{Activations, schedule},
  prelude::*,
};

pub struct Schedule<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Schedule<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn get(&self, id: i32) -> Result<schedule::Model> {
    schedule::Entity::find_by_id(id)
      .one(self.db)
      .await?
      .ok_or(Missing::Schedule(id).into())
  }

  pub async fn activations(&self, id: i32) -> Result<Activations> {
    self.get(id).await?.activations()
  }

  pub async fn update(&self, id: i32, slots: &[u32]) -> Result<Activations> {
    let activations = Activations::new(slots)?;
    replace(self.db, id, &activations).await?;
    Ok(activations)
  }

  pub async fn count(&self) -> Result<u64> {
    Ok(schedule::Entity::find().count(self.db).await?)
  }
}

fn encode(activations: &Activations) -> Result<Json> {
  json::to_value(activations).map_err(|err| Error::Internal(err.to_string()))
}

pub(crate) async fn insert<C: ConnectionTrait>(
  conn: &C,
  activations: &Activations,
) -> Result<schedule::Model> {
  let schedule = schedule::ActiveModel {
    id: NotSet,
    activations: Set(encode(activations)?),
  };
  Ok(schedule.insert(conn).await?)
}

/// Copies a schedule into a new row, schedules are never shared.
pub(crate) async fn duplicate<C: ConnectionTrait>(
  conn: &C,
  id: i32,
) -> Result<schedule::Model> {
  let source = schedule::Entity::find_by_id(id)
    .one(conn)
    .await?
    .ok_or(Missing::Schedule(id))?;
  insert(conn, &source.activations()?).await
}

pub(crate) async fn replace<C: ConnectionTrait>(
  conn: &C,
  id: i32,
  activations: &Activations,
) -> Result<()> {
  let schedule = schedule::Entity::find_by_id(id)
    .one(conn)
    .await?
    .ok_or(Missing::Schedule(id))?;

  schedule::ActiveModel {
    activations: Set(encode(activations)?),
    ..schedule.into()
  }
  .update(conn)
  .await?;

  Ok(())
}

pub(crate) async fn delete_many<C: ConnectionTrait>(
  conn: &C,
  ids: Vec<i32>,
) -> Result<u64> {
  if ids.is_empty() {
    return Ok(0);
  }
  let result = schedule::Entity::delete_many()
    .filter(schedule::Column::Id.is_in(ids))
    .exec(conn)
    .await?;
  Ok(result.rows_affected)
}
