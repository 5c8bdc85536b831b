use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User};

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// A unique constraint on username or email rejected the row.
    #[error("user or email already exists")]
    Duplicate,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: NewUser) -> Result<User, RepoError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;
    /// Spends one guess on the pending code and returns it. `None` once the code
    /// is expired, exhausted (`max_attempts` spent), consumed or absent.
    async fn claim_attempt(&self, id: Uuid, max_attempts: i32) -> Result<Option<String>, RepoError>;
    /// Flips the account to verified if it still holds `code`. Returns whether a row changed.
    async fn mark_verified(&self, id: Uuid, code: &str) -> Result<bool, RepoError>;
    /// Issues a fresh code to an unverified account and resets its attempt counter.
    async fn replace_code(
        &self,
        id: Uuid,
        code: &str,
        expires_at: OffsetDateTime,
    ) -> Result<bool, RepoError>;
}

const USER_COLUMNS: &str = "id, username, email, password_hash, verification_code, verified, \
                            code_expires_at, code_attempts, created_at";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, user: NewUser) -> Result<User, RepoError> {
        let sql = format!(
            r#"
            INSERT INTO users (username, email, password_hash, verification_code, code_expires_at, verified)
            VALUES ($1, $2, $3, $4, $5, FALSE)
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.verification_code)
            .bind(user.code_expires_at)
            .fetch_one(&self.db)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => RepoError::Duplicate,
                other => RepoError::Database(other),
            })
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn claim_attempt(&self, id: Uuid, max_attempts: i32) -> Result<Option<String>, RepoError> {
        let code = sqlx::query_scalar::<_, String>(
            r#"
            UPDATE users
            SET code_attempts = code_attempts + 1
            WHERE id = $1
              AND verified = FALSE
              AND verification_code IS NOT NULL
              AND code_attempts < $2
              AND (code_expires_at IS NULL OR code_expires_at > now())
            RETURNING verification_code
            "#,
        )
        .bind(id)
        .bind(max_attempts)
        .fetch_optional(&self.db)
        .await?;
        Ok(code)
    }

    async fn mark_verified(&self, id: Uuid, code: &str) -> Result<bool, RepoError> {
        let done = sqlx::query(
            r#"
            UPDATE users
            SET verified = TRUE, verification_code = NULL, code_expires_at = NULL, code_attempts = 0
            WHERE id = $1 AND verification_code = $2 AND verified = FALSE
            "#,
        )
        .bind(id)
        .bind(code)
        .execute(&self.db)
        .await?;
        Ok(done.rows_affected() == 1)
    }

    async fn replace_code(
        &self,
        id: Uuid,
        code: &str,
        expires_at: OffsetDateTime,
    ) -> Result<bool, RepoError> {
        let done = sqlx::query(
            r#"
            UPDATE users
            SET verification_code = $2, code_expires_at = $3, code_attempts = 0
            WHERE id = $1 AND verified = FALSE
            "#,
        )
        .bind(id)
        .bind(code)
        .bind(expires_at)
        .execute(&self.db)
        .await?;
        Ok(done.rows_affected() == 1)
    }
}
