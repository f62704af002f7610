//! Best-effort messages to the configured guild channels.

use crate::{
  entity::guild,
  port::{Destination, Notifier},
  prelude::*,
};

async fn post(notifier: &dyn Notifier, channel_id: i64, message: &str) {
  if channel_id == 0 {
    return;
  }
  if let Err(err) = notifier.send(Destination::Channel(channel_id), message).await
  {
    warn!("Failed to post to channel {channel_id}: {err}");
  }
}

pub(crate) async fn license_log(
  notifier: &dyn Notifier,
  guild: &guild::Model,
  message: &str,
) {
  if guild.license_log_enabled {
    post(notifier, guild.license_log_channel_id, message).await;
  }
}

pub(crate) async fn diagnostics(
  notifier: &dyn Notifier,
  guild: &guild::Model,
  message: &str,
) {
  if guild.diagnostics_enabled {
    post(notifier, guild.diagnostics_channel_id, message).await;
  }
}

/// Where a reminder for `member_id` goes, each with its own rendering.
pub(crate) fn reminder_targets(
  guild: &guild::Model,
  member_id: i64,
  message: &str,
) -> Vec<(Destination, String)> {
  let mut targets = Vec::new();

  if guild.reminders_channel_id != 0 {
    let text = if guild.reminders_ping {
      format!("{} {message}", utils::mention(member_id))
    } else {
      message.to_string()
    };
    targets.push((Destination::Channel(guild.reminders_channel_id), text));
  }

  if guild.reminders_send_to_dm {
    targets.push((Destination::Direct(member_id), message.to_string()));
  }

  targets
}
