use lazy_static::lazy_static;
use pbkdf2::pbkdf2_hmac;
use rand::{rngs::OsRng, RngCore};
use regex::Regex;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::error;

pub const ALGORITHM: &str = "pbkdf2_sha256";
pub const DEFAULT_ITERATIONS: u32 = 600_000;
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// At least 8 UTF-16 code units with no line terminator, one ASCII letter and one digit.
pub fn is_strong_password(plain: &str) -> bool {
    lazy_static! {
        static ref LINE_TERMINATOR_RE: Regex = Regex::new(r"[\n\r\x{2028}\x{2029}]").unwrap();
        static ref LETTER_RE: Regex = Regex::new(r"[a-zA-Z]").unwrap();
        static ref DIGIT_RE: Regex = Regex::new(r"[0-9]").unwrap();
    }
    plain.encode_utf16().count() >= 8
        && !LINE_TERMINATOR_RE.is_match(plain)
        && LETTER_RE.is_match(plain)
        && DIGIT_RE.is_match(plain)
}

/// Returns `pbkdf2_sha256$<iterations>$<salt hex>$<key hex>`.
pub fn hash_password_with(plain: &str, iterations: u32) -> String {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    encode(iterations, &salt, &derive(plain, &salt, iterations))
}

/// Recomputes the key with the stored salt and iteration count; constant-time compare.
pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = StoredHash::parse(hash).map_err(|e| {
        error!(error = %e, "parse password hash error");
        e
    })?;
    let candidate = derive(plain, &parsed.salt, parsed.iterations);
    Ok(candidate.ct_eq(&parsed.key).into())
}

fn derive(plain: &str, salt: &[u8], iterations: u32) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(plain.as_bytes(), salt, iterations, &mut key);
    key
}

fn encode(iterations: u32, salt: &[u8], key: &[u8]) -> String {
    format!(
        "{ALGORITHM}${iterations}${}${}",
        hex::encode(salt),
        hex::encode(key)
    )
}

struct StoredHash {
    iterations: u32,
    salt: Vec<u8>,
    key: Vec<u8>,
}

impl StoredHash {
    fn parse(hash: &str) -> anyhow::Result<Self> {
        let mut parts = hash.split('$');
        let (Some(algorithm), Some(iterations), Some(salt), Some(key), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            anyhow::bail!("password hash must have four '$'-separated fields");
        };
        anyhow::ensure!(algorithm == ALGORITHM, "unsupported algorithm {algorithm:?}");
        let iterations: u32 = iterations.parse()?;
        anyhow::ensure!(iterations > 0, "iteration count must be positive");
        let salt = hex::decode(salt)?;
        let key = hex::decode(key)?;
        anyhow::ensure!(key.len() == KEY_LEN, "derived key must be {KEY_LEN} bytes");
        Ok(Self { iterations, salt, key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST: u32 = 1_000;

    #[test]
    fn default_hash_has_expected_shape() {
        let hash = hash_password_with("abcdefg1", DEFAULT_ITERATIONS);
        assert_ne!(hash, "abcdefg1");
        let fields: Vec<&str> = hash.split('$').collect();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0], "pbkdf2_sha256");
        assert_eq!(fields[1], "600000");
        assert_eq!(fields[2].len(), 32);
        assert_eq!(fields[3].len(), 64);
        assert!(fields[2..]
            .iter()
            .all(|f| f.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())));
    }

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password_with(password, FAST);
        assert!(verify_password(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hash = hash_password_with("correct-horse-battery-9", FAST);
        assert!(!verify_password("wrong-password-1", &hash).expect("verify should not error"));
    }

    #[test]
    fn salts_differ_between_calls() {
        assert_ne!(hash_password_with("same1234", FAST), hash_password_with("same1234", FAST));
    }

    #[test]
    fn matches_known_pbkdf2_vector() {
        // RFC 7914 section 11, truncated to 32 bytes.
        let key = derive("passwd", b"salt", 1);
        assert_eq!(
            hex::encode(key),
            "55ac046e56e3089fec1691c22544b605f94185216dde0465e68b9d57c20dacbc"
        );
        let stored = encode(1, b"salt", &key);
        assert!(verify_password("passwd", &stored).unwrap());
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        for bad in [
            "not-a-valid-hash",
            "argon2$1000$00$00",
            "pbkdf2_sha256$many$00$00",
            "pbkdf2_sha256$1000$zz$00",
            "pbkdf2_sha256$1000$00$00",
            "pbkdf2_sha256$1000$00$00$extra",
        ] {
            assert!(verify_password("anything", bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn password_strength_rules() {
        assert!(is_strong_password("abcdefg1"));
        assert!(is_strong_password("12345678a"));
        assert!(is_strong_password("contraseña9"));
        assert!(!is_strong_password("abc"));
        assert!(!is_strong_password("abcdefgh"));
        assert!(!is_strong_password("12345678"));
        assert!(!is_strong_password("abc1"));
        assert!(!is_strong_password("abcd\nefg1"));
        assert!(!is_strong_password("abcd\refg1"));
        assert!(!is_strong_password("abcd\u{2028}efg1"));
        assert!(!is_strong_password("abcd\u{2029}efg1"));
        // Astral characters count as two units each.
        assert!(is_strong_password("a1\u{1F600}\u{1F600}\u{1F600}"));
        assert!(!is_strong_password("a1\u{1F600}\u{1F600}"));
    }
}
