use crate::{
  port::{PortError, RoleAssignment},
  prelude::*,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
  Grant(i64),
  Revoke(i64),
}

impl Action {
  fn inverse(self) -> Self {
    match self {
      Action::Grant(role) => Action::Revoke(role),
      Action::Revoke(role) => Action::Grant(role),
    }
  }
}

/// Platform role changes applied for one member, undone in reverse order
/// when the surrounding transaction can't commit.
pub(crate) struct Effects<'a> {
  port: &'a dyn RoleAssignment,
  guild_id: i64,
  member_id: i64,
  applied: Vec<Action>,
}

impl<'a> Effects<'a> {
  pub fn new(port: &'a dyn RoleAssignment, guild_id: i64, member_id: i64) -> Self {
    Self { port, guild_id, member_id, applied: Vec::new() }
  }

  pub fn member_id(&self) -> i64 {
    self.member_id
  }

  async fn call(&self, action: Action) -> Result<(), PortError> {
    let (guild, member) = (self.guild_id, self.member_id);
    match action {
      Action::Grant(role) => self.port.grant(guild, member, role).await,
      // the role is already gone from the member
      Action::Revoke(role) => match self.port.revoke(guild, member, role).await
      {
        Err(PortError::NotFound(_)) => Ok(()),
        other => other,
      },
    }
  }

  pub async fn apply(&mut self, action: Action) -> Result<(), PortError> {
    self.call(action).await?;
    self.applied.push(action);
    Ok(())
  }

  /// Applies all `actions`, undoing the applied ones on the first failure.
  pub async fn apply_all(
    &mut self,
    actions: impl IntoIterator<Item = Action>,
  ) -> Result<(), PortError> {
    for action in actions {
      if let Err(err) = self.apply(action).await {
        self.undo().await;
        return Err(err);
      }
    }
    Ok(())
  }

  pub async fn undo(&mut self) {
    while let Some(action) = self.applied.pop() {
      if let Err(err) = self.call(action.inverse()).await {
        error!(
          "Failed to undo {action:?} for member {} in guild {}: {err}",
          self.member_id, self.guild_id
        );
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::port::testing::{Call, Recorder};

  #[tokio::test]
  async fn test_failure_undoes_applied() {
    let recorder = Recorder::new();
    recorder.fail_role(3);

    let mut effects = Effects::new(recorder.as_ref(), 1, 2);
    let result = effects
      .apply_all([Action::Grant(10), Action::Revoke(11), Action::Grant(3)])
      .await;

    assert!(matches!(result, Err(PortError::Transient(_))));
    assert_eq!(
      recorder.calls(),
      vec![
        Call::Grant { guild: 1, member: 2, role: 10 },
        Call::Revoke { guild: 1, member: 2, role: 11 },
        Call::Grant { guild: 1, member: 2, role: 11 },
        Call::Revoke { guild: 1, member: 2, role: 10 },
      ]
    );
  }
}
