use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Validation};

pub const MAX_ACTIVATIONS: usize = 5;
pub const DEFAULT_ACTIVATION: u32 = 720;

/// Minutes before expiration at which reminders fire, highest first.
///
/// Built from up to five values where `0` marks a disabled slot. The first
/// slot must be enabled and enabled values must be strictly decreasing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Activations(Vec<u32>);

impl Activations {
  pub fn new(slots: &[u32]) -> Result<Self, Error> {
    if slots.len() > MAX_ACTIVATIONS {
      return Err(
        Validation::TooManyActivations { max: MAX_ACTIVATIONS }.into(),
      );
    }

    match slots.first() {
      Some(&first) if first > 0 => {}
      _ => return Err(Validation::FirstActivationDisabled.into()),
    }

    let enabled: Vec<u32> = slots.iter().copied().filter(|&m| m > 0).collect();
    if enabled.windows(2).any(|pair| pair[0] <= pair[1]) {
      return Err(Validation::ActivationOrder.into());
    }

    Ok(Self(enabled))
  }

  pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
    self.0.iter().copied()
  }

  pub fn as_slice(&self) -> &[u32] {
    &self.0
  }
}

impl Default for Activations {
  fn default() -> Self {
    Self(vec![DEFAULT_ACTIVATION])
  }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reminder_schedules")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub activations: Json,
}

impl Model {
  /// Decodes the stored slots, a row that doesn't hold a valid schedule is
  /// an error rather than a silent default.
  pub fn activations(&self) -> Result<Activations, Error> {
    let slots: Vec<u32> = json::from_value(self.activations.clone())
      .map_err(|err| Error::Internal(format!("schedule {}: {err}", self.id)))?;
    Activations::new(&slots)
      .map_err(|err| Error::Internal(format!("schedule {}: {err}", self.id)))
  }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
