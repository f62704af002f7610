//! Seams towards the chat platform.
//!
//! The engine never talks to the platform directly: role changes go through
//! [`RoleAssignment`] and messages through [`Notifier`].

pub mod discord;
#[cfg(test)]
pub mod testing;

use crate::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
  #[error("permission denied: {0}")]
  PermissionDenied(String),
  #[error("target not found: {0}")]
  NotFound(String),
  #[error("transient failure: {0}")]
  Transient(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
  Channel(i64),
  /// Direct message to a member
  Direct(i64),
}

#[async_trait]
pub trait RoleAssignment: Send + Sync {
  async fn grant(
    &self,
    guild_id: i64,
    member_id: i64,
    role_id: i64,
  ) -> Result<(), PortError>;

  async fn revoke(
    &self,
    guild_id: i64,
    member_id: i64,
    role_id: i64,
  ) -> Result<(), PortError>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
  /// Unreachable direct messages resolve to `Ok(())`.
  async fn send(
    &self,
    destination: Destination,
    message: &str,
  ) -> Result<(), PortError>;
}
