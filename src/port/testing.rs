//! Recording port used by the service tests.

use std::sync::Mutex;

use super::{Destination, Notifier, PortError, RoleAssignment};
use crate::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
  Grant { guild: i64, member: i64, role: i64 },
  Revoke { guild: i64, member: i64, role: i64 },
  Send { destination: Destination, message: String },
}

#[derive(Default)]
pub struct Recorder {
  calls: Mutex<Vec<Call>>,
  failing_roles: Mutex<HashMap<i64, PortError>>,
  failing_sends: Mutex<bool>,
  failing_dms: Mutex<bool>,
}

impl Recorder {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  /// Every grant or revoke of `role` fails with a transient error.
  pub fn fail_role(&self, role: i64) {
    self.fail_role_with(role, PortError::Transient(format!("role {role}")));
  }

  pub fn fail_role_with(&self, role: i64, err: PortError) {
    self.failing_roles.lock().unwrap().insert(role, err);
  }

  pub fn heal_role(&self, role: i64) {
    self.failing_roles.lock().unwrap().remove(&role);
  }

  pub fn fail_sends(&self, fail: bool) {
    *self.failing_sends.lock().unwrap() = fail;
  }

  /// Only direct messages fail, channel posts go through.
  pub fn fail_dms(&self, fail: bool) {
    *self.failing_dms.lock().unwrap() = fail;
  }

  pub fn calls(&self) -> Vec<Call> {
    self.calls.lock().unwrap().clone()
  }

  pub fn clear(&self) {
    self.calls.lock().unwrap().clear();
  }

  pub fn grants(&self) -> Vec<i64> {
    self
      .calls()
      .into_iter()
      .filter_map(|call| match call {
        Call::Grant { role, .. } => Some(role),
        _ => None,
      })
      .collect()
  }

  pub fn revokes(&self) -> Vec<i64> {
    self
      .calls()
      .into_iter()
      .filter_map(|call| match call {
        Call::Revoke { role, .. } => Some(role),
        _ => None,
      })
      .collect()
  }

  pub fn messages(&self) -> Vec<(Destination, String)> {
    self
      .calls()
      .into_iter()
      .filter_map(|call| match call {
        Call::Send { destination, message } => Some((destination, message)),
        _ => None,
      })
      .collect()
  }

  fn role_call(&self, call: Call, role: i64) -> Result<(), PortError> {
    if let Some(err) = self.failing_roles.lock().unwrap().get(&role) {
      return Err(err.clone());
    }
    self.calls.lock().unwrap().push(call);
    Ok(())
  }
}

#[async_trait]
impl RoleAssignment for Recorder {
  async fn grant(
    &self,
    guild: i64,
    member: i64,
    role: i64,
  ) -> Result<(), PortError> {
    self.role_call(Call::Grant { guild, member, role }, role)
  }

  async fn revoke(
    &self,
    guild: i64,
    member: i64,
    role: i64,
  ) -> Result<(), PortError> {
    self.role_call(Call::Revoke { guild, member, role }, role)
  }
}

#[async_trait]
impl Notifier for Recorder {
  async fn send(
    &self,
    destination: Destination,
    message: &str,
  ) -> Result<(), PortError> {
    if *self.failing_sends.lock().unwrap() {
      return Err(PortError::Transient("send unavailable".into()));
    }
    if matches!(destination, Destination::Direct(_))
      && *self.failing_dms.lock().unwrap()
    {
      return Err(PortError::Transient("DM unavailable".into()));
    }
    self
      .calls
      .lock()
      .unwrap()
      .push(Call::Send { destination, message: message.to_string() });
    Ok(())
  }
}
