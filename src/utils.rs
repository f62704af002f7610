use chrono::{FixedOffset, Offset};

use crate::prelude::*;

/// Longest role duration accepted anywhere, one leap year.
pub const MAX_DURATION_MINUTES: u32 = 8784 * 60;

/// Discord rejects message content above 2000 characters.
pub const DISCORD_MAX_MESSAGE_LENGTH: usize = 2000;

pub fn minutes(minutes: i64) -> TimeDelta {
  TimeDelta::minutes(minutes)
}

pub fn ensure_duration(minutes: u32) -> Result<i64> {
  if minutes > MAX_DURATION_MINUTES {
    return Err(Validation::Duration(minutes).into());
  }
  Ok(i64::from(minutes))
}

/// Formats a UTC timestamp in the guild display timezone.
pub fn format_date(date: DateTime, timezone: i16) -> String {
  let offset = FixedOffset::east_opt(i32::from(timezone) * 3600)
    .unwrap_or_else(|| Utc.fix());
  let local = date.and_utc().with_timezone(&offset);
  format!("{} UTC{:+}", local.format("%d.%m.%Y %H:%M"), timezone)
}

pub fn format_duration(duration: TimeDelta) -> String {
  format!(
    "{}d {}h {}m",
    duration.num_days(),
    duration.num_hours() % 24,
    duration.num_minutes() % 60
  )
}

pub fn mention(member_id: i64) -> String {
  format!("<@{member_id}>")
}

/// Splits a long message into chunks of at most `max_len` characters,
/// preferring newline boundaries.
pub fn chunk_message(text: &str, max_len: usize) -> Vec<String> {
  let max_len = if max_len == 0 { DISCORD_MAX_MESSAGE_LENGTH } else { max_len };

  if text.chars().count() <= max_len {
    return vec![text.to_string()];
  }

  let mut chunks = Vec::new();
  let mut current = String::new();

  for line in text.lines() {
    let line_len = line.chars().count();

    if !current.is_empty() && current.chars().count() + line_len + 1 > max_len
    {
      chunks.push(std::mem::take(&mut current));
    }

    if line_len > max_len {
      if !current.is_empty() {
        chunks.push(std::mem::take(&mut current));
      }
      let chars: Vec<char> = line.chars().collect();
      let mut pieces = chars.chunks(max_len).peekable();
      while let Some(piece) = pieces.next() {
        if pieces.peek().is_some() {
          chunks.push(piece.iter().collect());
        } else {
          current = piece.iter().collect();
        }
      }
    } else {
      if !current.is_empty() {
        current.push('\n');
      }
      current.push_str(line);
    }
  }

  if !current.is_empty() {
    chunks.push(current);
  }

  chunks
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;

  #[test]
  fn test_format_date_applies_offset() {
    let date = NaiveDate::from_ymd_opt(2026, 3, 1)
      .unwrap()
      .and_hms_opt(23, 30, 0)
      .unwrap();

    assert_eq!(format_date(date, 0), "01.03.2026 23:30 UTC+0");
    assert_eq!(format_date(date, 2), "02.03.2026 01:30 UTC+2");
    assert_eq!(format_date(date, -12), "01.03.2026 11:30 UTC-12");
  }

  #[test]
  fn test_format_duration() {
    assert_eq!(format_duration(minutes(60 * 24 * 2 + 61)), "2d 1h 1m");
  }

  #[test]
  fn test_duration_limit() {
    assert_eq!(ensure_duration(0).unwrap(), 0);
    assert_eq!(ensure_duration(MAX_DURATION_MINUTES).unwrap(), 527_040);
    assert!(ensure_duration(MAX_DURATION_MINUTES + 1).is_err());
  }

  #[test]
  fn test_chunk_message() {
    assert_eq!(chunk_message("short", 10), vec!["short"]);
    assert_eq!(chunk_message("aaaa\nbbbb\ncccc", 9), vec!["aaaa\nbbbb", "cccc"]);
    assert_eq!(chunk_message("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
  }
}
