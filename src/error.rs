//! Error types for the entitlement engine

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
};

use crate::port::PortError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("Database error: {0}")]
  Database(#[from] sea_orm::DbErr),

  #[error("{0}")]
  Validation(#[from] Validation),

  #[error("{0}")]
  Integrity(#[from] Integrity),

  #[error("{0} not found")]
  NotFound(#[from] Missing),

  #[error("License has no uses left")]
  Inert,

  #[error("Platform call failed: {0}")]
  Port(#[from] PortError),

  #[error("Internal error: {0}")]
  Internal(String),
}

/// Rejected input, raised before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Validation {
  #[error("Prefix is too long, maximum is {max} characters")]
  PrefixTooLong { max: usize },
  #[error("Branding is too long, maximum is {max} characters")]
  BrandingTooLong { max: usize },
  #[error("License format is too long, maximum is {max} characters")]
  FormatTooLong { max: usize },
  #[error(
    "License format is not secure enough: {permutations} permutations, \
     {required} required, minimum length {min_len}"
  )]
  InsecureFormat { permutations: u128, required: u128, min_len: usize },
  #[error("Timezone {0} is outside of -12..=14")]
  Timezone(i16),
  #[error("Language `{0}` is not supported")]
  Language(String),
  #[error("Tier level {0} is outside of 0..=100")]
  TierLevel(i16),
  #[error("Tier power {0} is outside of 0..=9")]
  TierPower(i16),
  #[error("Packet name must be 1..=50 characters")]
  PacketName,
  #[error("Duration of {0} minutes exceeds the maximum")]
  Duration(u32),
  #[error("License key must be {min}..={max} characters, got {len}")]
  KeyLength { len: usize, min: usize, max: usize },
  #[error("Uses left {0} is outside of 0..=1000000")]
  UsesLeft(u32),
  #[error("Regenerating license cannot have more than one use")]
  RegeneratingMultiUse,
  #[error("Amount of licenses must be 1..={max}")]
  Amount { max: usize },
  #[error("First reminder activation must be enabled")]
  FirstActivationDisabled,
  #[error("At most {max} reminder activations are allowed")]
  TooManyActivations { max: usize },
  #[error("Reminder activations have to be ordered from highest to lowest")]
  ActivationOrder,
  #[error("Redeeming in direct messages is disabled for this guild")]
  DmRedeemDisabled,
  #[error("{0} already exists")]
  Duplicate(String),
}

/// Relational rules of the data model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Integrity {
  #[error("License key `{0}` already exists")]
  KeyCollision(String),
  #[error("Packet `{name}` would exceed the limit of {max} roles")]
  PacketFull { name: String, max: usize },
  #[error("Role and packet belong to different guilds")]
  GuildMismatch,
  #[error("Role is already part of packet `{0}`")]
  RoleInPacket(String),
  #[error("Tier level {level} with power {power} is already taken")]
  TierTaken { level: i16, power: i16 },
  #[error("License grants no roles")]
  EmptyLicense,
  #[error("Guild would exceed {max} stored unused licenses")]
  TooManyLicenses { max: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Missing {
  #[error("Guild {0}")]
  Guild(i64),
  #[error("Role {0}")]
  Role(i64),
  #[error("Role packet `{0}`")]
  Packet(String),
  #[error("Role {0} in packet")]
  PacketRole(i64),
  #[error("License")]
  License,
  #[error("Reminder schedule {0}")]
  Schedule(i32),
}

impl Error {
  /// Maps a unique-constraint failure of an insert to `on_conflict`.
  pub(crate) fn unique_or(err: sea_orm::DbErr, on_conflict: Error) -> Self {
    match err.sql_err() {
      Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => on_conflict,
      _ => Error::Database(err),
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = match &self {
      Error::Validation(_) => StatusCode::BAD_REQUEST,
      Error::Integrity(_) => StatusCode::CONFLICT,
      Error::NotFound(_) => StatusCode::NOT_FOUND,
      Error::Inert => StatusCode::GONE,
      Error::Port(_) => StatusCode::BAD_GATEWAY,
      Error::Database(_) | Error::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    };

    let message = match &self {
      Error::Database(_) => "Database error".to_string(),
      Error::Internal(_) => "Internal error".to_string(),
      other => other.to_string(),
    };

    let body = json::json!({
      "success": false,
      "error": message
    });

    (status, axum::Json(body)).into_response()
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
