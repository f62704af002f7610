//! License key formatter.
//!
//! A format is a template where every placeholder character is replaced by a
//! random character from its charset:
//!
//! - `D` digit
//! - `U` uppercase english letter
//! - `L` lowercase english letter
//! - `A` letters of both cases and digits (no symbols)
//! - `S` ASCII punctuation symbol
//!
//! Everything else is copied as is. The `{branding}` token is substituted with
//! the guild branding and never expanded, so `DDDD-{branding}-UUUU` with
//! branding `ACME` yields something like `4739-ACME-EHZB`.

use rand::{Rng, rngs::OsRng};

use crate::prelude::*;

pub const BRANDING: &str = "{branding}";
pub const DEFAULT_FORMAT: &str = "{branding}AAAAA-AAAAA-AAAAA-AAAAA-AAAAA";

pub const MIN_LICENSE_LENGTH: usize = 14;
pub const MAX_LICENSE_LENGTH: usize = 50;
pub const MAX_FORMAT_LENGTH: usize = 100;
pub const MIN_PERMUTATION_COUNT: u128 = 10u128.pow(24);

const DIGITS: &[u8] = b"0123456789";
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const ALPHANUMERIC: &[u8] =
  b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const SYMBOLS: &[u8] = b"!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

fn charset(placeholder: char) -> Option<&'static [u8]> {
  match placeholder {
    'D' => Some(DIGITS),
    'U' => Some(UPPERCASE),
    'L' => Some(LOWERCASE),
    'A' => Some(ALPHANUMERIC),
    'S' => Some(SYMBOLS),
    _ => None,
  }
}

fn expand(part: &str, rng: &mut impl Rng) -> String {
  part
    .chars()
    .map(|char| match charset(char) {
      Some(set) => set[rng.gen_range(0..set.len())] as char,
      None => char,
    })
    .collect()
}

/// Generates a key from `format`, falling back to [`DEFAULT_FORMAT`] when
/// the format is empty. Randomness comes from the operating system CSPRNG.
pub fn generate(format: &str, branding: &str) -> String {
  let format = if format.is_empty() { DEFAULT_FORMAT } else { format };
  let mut rng = OsRng;

  format
    .split(BRANDING)
    .map(|part| expand(part, &mut rng))
    .collect::<Vec<_>>()
    .join(branding)
}

pub fn generate_multiple(
  format: &str,
  branding: &str,
  amount: usize,
) -> Vec<String> {
  (0..amount).map(|_| generate(format, branding)).collect()
}

/// Number of distinct keys `format` can produce, saturating at `u128::MAX`.
pub fn permutation_count(format: &str) -> u128 {
  format
    .replace(BRANDING, "")
    .chars()
    .filter_map(charset)
    .fold(1u128, |acc, set| acc.saturating_mul(set.len() as u128))
}

pub fn is_secure(format: &str) -> bool {
  format.chars().count() >= MIN_LICENSE_LENGTH
    && permutation_count(format) >= MIN_PERMUTATION_COUNT
}

/// Gate used before a format is stored or used to mint keys.
pub fn ensure_secure(format: &str) -> Result<()> {
  if format.chars().count() > MAX_FORMAT_LENGTH {
    return Err(Validation::FormatTooLong { max: MAX_FORMAT_LENGTH }.into());
  }

  if is_secure(format) {
    Ok(())
  } else {
    Err(
      Validation::InsecureFormat {
        permutations: permutation_count(format),
        required: MIN_PERMUTATION_COUNT,
        min_len: MIN_LICENSE_LENGTH,
      }
      .into(),
    )
  }
}

pub fn ensure_key(key: &str) -> Result<()> {
  let len = key.chars().count();
  if (MIN_LICENSE_LENGTH..=MAX_LICENSE_LENGTH).contains(&len) {
    Ok(())
  } else {
    Err(
      Validation::KeyLength {
        len,
        min: MIN_LICENSE_LENGTH,
        max: MAX_LICENSE_LENGTH,
      }
      .into(),
    )
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashSet;

  use super::*;

  #[test]
  fn test_permutation_count() {
    assert_eq!(permutation_count("DDDD-LLLL"), 10u128.pow(4) * 26u128.pow(4));
    assert_eq!(permutation_count("{branding}UU"), 26 * 26);
    assert_eq!(permutation_count("----"), 1);
    assert_eq!(permutation_count(DEFAULT_FORMAT), u128::MAX);
  }

  #[test]
  fn test_secure_formats() {
    let secure = [
      "DDDDD-DDDDD-DDDDD-DDDDD-DDDDD",
      "AAAA(LLL)-SAS+DAAD/SOS",
      "AAAAAAAAAAAAAA",
      "AA!A?A{A}A*A-A+A1A2A3A4AA",
      DEFAULT_FORMAT,
    ];
    for format in secure {
      assert!(is_secure(format), "{format} should be secure");
    }

    let insecure = ["", "test", "AA", "AAAAAAAAAA", "1234567890"];
    for format in insecure {
      assert!(!is_secure(format), "{format} should not be secure");
    }
  }

  #[test]
  fn test_length_alone_is_not_enough() {
    // 24 digits is exactly the floor, 23 digits falls short
    assert!(is_secure(&"D".repeat(24)));
    assert!(!is_secure(&"D".repeat(23)));
    // plenty of entropy but too short
    assert!(!is_secure("AAAAAAAAAAAAA"));
  }

  #[test]
  fn test_generate_follows_format() {
    let key = generate("DDDD-UUUU-LLLL-ULDS", "");
    let chars: Vec<char> = key.chars().collect();

    assert_eq!(chars.len(), 19);
    assert!(chars[..4].iter().all(char::is_ascii_digit));
    assert_eq!(chars[4], '-');
    assert!(chars[5..9].iter().all(char::is_ascii_uppercase));
    assert!(chars[10..14].iter().all(char::is_ascii_lowercase));
    assert!(chars[15].is_ascii_uppercase());
    assert!(chars[16].is_ascii_lowercase());
    assert!(chars[17].is_ascii_digit());
    assert!(chars[18].is_ascii_punctuation());
  }

  #[test]
  fn test_branding_is_verbatim() {
    let key = generate("{branding}-DDDD-{branding}", "DUALS");
    assert!(key.starts_with("DUALS-"));
    assert!(key.ends_with("-DUALS"));
    assert!(key[6..10].chars().all(|c| c.is_ascii_digit()));
  }

  #[test]
  fn test_empty_format_uses_default() {
    let key = generate("", "XY");
    assert!(key.starts_with("XY"));
    assert_eq!(key.len(), 2 + 29);
    assert!(key[2..].chars().all(|c| c == '-' || c.is_ascii_alphanumeric()));
  }

  #[test]
  fn test_generate_multiple() {
    let keys = generate_multiple("", "", 50);
    assert_eq!(keys.len(), 50);
    assert_eq!(keys.iter().collect::<HashSet<_>>().len(), 50);
  }

  #[test]
  fn test_key_length_bounds() {
    assert!(ensure_key("quite_long_key").is_ok());
    assert!(ensure_key(&"very__long".repeat(5)).is_ok());
    assert!(ensure_key("quite___short").is_err());
    assert!(ensure_key(&format!("{}!", "too___long".repeat(5))).is_err());
  }

  #[test]
  fn test_ensure_secure_reports_counts() {
    let err = ensure_secure("DDDD").unwrap_err();
    assert!(matches!(
      err,
      Error::Validation(Validation::InsecureFormat { permutations: 10000, .. })
    ));
    assert!(matches!(
      ensure_secure(&"A".repeat(101)),
      Err(Error::Validation(Validation::FormatTooLong { .. }))
    ));
  }
}
