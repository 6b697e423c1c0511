//! Shared-secret signature helpers used by the provider adapters.
//!
//! Both supported providers sign the raw request body with a shared secret
//! and SHA-256; they differ only in how the digest is encoded on the wire
//! (base64 for the commerce provider, hex for the CMS provider).

use sha2::{Digest, Sha256};

/// SHA-256 over `secret ‖ body`.
pub fn digest(secret: &[u8], body: &[u8]) -> [u8; 32] {
  let mut hasher = Sha256::new();
  hasher.update(secret);
  hasher.update(body);
  hasher.finalize().into()
}

/// Constant-time byte comparison. Timing must not reveal how much of a
/// presented signature matched.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
  if a.len() != b.len() {
    return false;
  }
  let mut diff = 0u8;
  for (x, y) in a.iter().zip(b.iter()) {
    diff |= x ^ y;
  }
  diff == 0
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn digest_is_deterministic_and_secret_dependent() {
    let a = digest(b"secret", b"body");
    assert_eq!(a, digest(b"secret", b"body"));
    assert_ne!(a, digest(b"other", b"body"));
    assert_ne!(a, digest(b"secret", b"tampered"));
  }

  #[test]
  fn constant_time_eq_handles_length_and_content() {
    assert!(constant_time_eq(b"abc", b"abc"));
    assert!(!constant_time_eq(b"abc", b"abd"));
    assert!(!constant_time_eq(b"abc", b"abcd"));
    assert!(constant_time_eq(b"", b""));
  }
}
