use rand::Rng;
use subtle::ConstantTimeEq;
use time::{Duration, OffsetDateTime};

use crate::auth::password::hash_password_with;

/// Six decimal digits, uniform over 100000..=999999.
pub fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999u32).to_string()
}

pub fn codes_match(given: &str, stored: &str) -> bool {
    given.as_bytes().ct_eq(stored.as_bytes()).into()
}

pub fn code_expiry(now: OffsetDateTime, ttl_minutes: i64) -> OffsetDateTime {
    now + Duration::minutes(ttl_minutes)
}

/// PBKDF2 is CPU-bound; keep it off the async workers.
pub async fn hash_password_blocking(plain: String, iterations: u32) -> anyhow::Result<String> {
    let hash = tokio::task::spawn_blocking(move || hash_password_with(&plain, iterations)).await?;
    Ok(hash)
}
