use axum::{
  Json,
  extract::{Path, State},
};
use serde::{Deserialize, Serialize};

use crate::{
  entity::guild,
  prelude::*,
  state::AppState,
  sv::{guild::GuildInfo, redeem::{Origin, Redemption}},
};

#[derive(Debug, Deserialize)]
pub struct RedeemReq {
  pub key: String,
  pub member_id: i64,
  pub origin: Origin,
}

#[derive(Debug, Deserialize)]
pub struct GuildReq {
  pub guild_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct RoleReq {
  pub role_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct MemberUpdateReq {
  pub guild_id: i64,
  pub member_id: i64,
  pub roles: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct Removed<T> {
  pub success: bool,
  pub removed: T,
}

impl<T> Removed<T> {
  fn new(removed: T) -> Json<Self> {
    Json(Self { success: true, removed })
  }
}

pub async fn health() -> Json<json::Value> {
  Json(json::json!({
    "status": "ok",
    "version": env!("CARGO_PKG_VERSION"),
  }))
}

pub async fn redeem(
  State(app): State<Arc<AppState>>,
  Json(req): Json<RedeemReq>,
) -> Result<Json<Redemption>> {
  let redemption =
    app.sv().redeem.redeem(&req.key, req.member_id, req.origin).await?;
  Ok(Json(redemption))
}

pub async fn guild_info(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i64>,
) -> Result<Json<GuildInfo>> {
  Ok(Json(app.sv().guild.info(id).await?))
}

pub async fn guild_join(
  State(app): State<Arc<AppState>>,
  Json(req): Json<GuildReq>,
) -> Result<Json<guild::Model>> {
  Ok(Json(app.sv().events.guild_join(req.guild_id).await?))
}

pub async fn guild_remove(
  State(app): State<Arc<AppState>>,
  Json(req): Json<GuildReq>,
) -> Result<Json<Removed<bool>>> {
  Ok(Removed::new(app.sv().events.guild_remove(req.guild_id).await?))
}

pub async fn role_delete(
  State(app): State<Arc<AppState>>,
  Json(req): Json<RoleReq>,
) -> Result<Json<Removed<bool>>> {
  Ok(Removed::new(app.sv().events.role_delete(req.role_id).await?))
}

pub async fn member_update(
  State(app): State<Arc<AppState>>,
  Json(req): Json<MemberUpdateReq>,
) -> Result<Json<Removed<Vec<i64>>>> {
  let removed = app
    .sv()
    .events
    .member_update(req.guild_id, req.member_id, &req.roles)
    .await?;
  Ok(Removed::new(removed))
}
