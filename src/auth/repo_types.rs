use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String, // pbkdf2_sha256$..., never exposed
    pub verification_code: Option<String>,
    pub verified: bool,
    pub code_expires_at: Option<OffsetDateTime>,
    pub code_attempts: i32,
    pub created_at: OffsetDateTime,
}

/// Columns supplied on registration; the rest take their defaults.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub verification_code: Option<String>,
    pub code_expires_at: Option<OffsetDateTime>,
}
