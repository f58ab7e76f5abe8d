//! Small utility helpers used across modules.

use base64::Engine;
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Random alphanumeric suffix of `len` chars drawn from the given source.
pub fn random_suffix<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
  (0..len).map(|_| rng.sample(Alphanumeric) as char).collect()
}

/// Byte length of a media payload. Accepts data URLs and bare base64;
/// anything that doesn't decode counts as opaque text.
pub fn payload_len(payload: &str) -> usize {
  let trimmed = payload.trim();
  let body = match trimmed.split_once(";base64,") {
    Some((_, b64)) => b64,
    None => trimmed,
  };
  match base64::engine::general_purpose::STANDARD.decode(body) {
    Ok(bytes) => bytes.len(),
    Err(_) => trimmed.len(),
  }
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) {
    cut -= 1;
  }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}
