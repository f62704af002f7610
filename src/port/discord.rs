//! Discord REST implementation of both ports.

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use super::{Destination, Notifier, PortError, RoleAssignment};
use crate::prelude::*;

const AUDIT_REASON: &str = "License entitlement";

#[derive(Debug, Deserialize)]
struct DmChannel {
  id: String,
}

#[derive(Clone)]
pub struct Discord {
  client: Client,
  base: String,
  token: String,
}

impl Discord {
  pub fn new(base: impl Into<String>, token: impl Into<String>) -> Self {
    Self {
      client: Client::new(),
      base: base.into().trim_end_matches('/').to_string(),
      token: token.into(),
    }
  }

  fn request(&self, method: Method, path: &str) -> RequestBuilder {
    self
      .client
      .request(method, format!("{}{}", self.base, path))
      .header("Authorization", format!("Bot {}", self.token))
  }

  async fn execute(&self, request: RequestBuilder) -> Result<Response, PortError> {
    let response = request
      .send()
      .await
      .map_err(|err| PortError::Transient(err.to_string()))?;

    let status = response.status();
    if status.is_success() {
      return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(classify(status, body))
  }

  async fn role_change(
    &self,
    method: Method,
    guild_id: i64,
    member_id: i64,
    role_id: i64,
  ) -> Result<(), PortError> {
    let path = format!("/guilds/{guild_id}/members/{member_id}/roles/{role_id}");
    let request =
      self.request(method, &path).header("X-Audit-Log-Reason", AUDIT_REASON);
    self.execute(request).await.map(drop)
  }

  async fn post_message(
    &self,
    channel_id: &str,
    message: &str,
  ) -> Result<(), PortError> {
    let path = format!("/channels/{channel_id}/messages");
    for chunk in utils::chunk_message(message, 0) {
      let request = self
        .request(Method::POST, &path)
        .json(&json::json!({ "content": chunk }));
      self.execute(request).await?;
    }
    Ok(())
  }

  async fn open_dm(&self, member_id: i64) -> Result<DmChannel, PortError> {
    let request = self
      .request(Method::POST, "/users/@me/channels")
      .json(&json::json!({ "recipient_id": member_id.to_string() }));

    self
      .execute(request)
      .await?
      .json()
      .await
      .map_err(|err| PortError::Transient(err.to_string()))
  }
}

fn classify(status: StatusCode, body: String) -> PortError {
  match status {
    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
      PortError::PermissionDenied(body)
    }
    StatusCode::NOT_FOUND => PortError::NotFound(body),
    _ => PortError::Transient(format!("{status}: {body}")),
  }
}

#[async_trait]
impl RoleAssignment for Discord {
  async fn grant(
    &self,
    guild_id: i64,
    member_id: i64,
    role_id: i64,
  ) -> Result<(), PortError> {
    self.role_change(Method::PUT, guild_id, member_id, role_id).await
  }

  async fn revoke(
    &self,
    guild_id: i64,
    member_id: i64,
    role_id: i64,
  ) -> Result<(), PortError> {
    self.role_change(Method::DELETE, guild_id, member_id, role_id).await
  }
}

#[async_trait]
impl Notifier for Discord {
  async fn send(
    &self,
    destination: Destination,
    message: &str,
  ) -> Result<(), PortError> {
    match destination {
      Destination::Channel(channel_id) => {
        self.post_message(&channel_id.to_string(), message).await
      }
      Destination::Direct(member_id) => {
        let sent = match self.open_dm(member_id).await {
          Ok(channel) => self.post_message(&channel.id, message).await,
          Err(err) => Err(err),
        };

        match sent {
          // members with closed DMs are a normal outcome
          Err(PortError::PermissionDenied(_) | PortError::NotFound(_)) => {
            debug!("DM to member {member_id} is unreachable");
            Ok(())
          }
          other => other,
        }
      }
    }
  }
}
