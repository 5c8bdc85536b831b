use crate::auth::repo::{PgUserStore, UserStore};
use crate::config::AppConfig;
use crate::mail::{self, MailSender};
use crate::db;
use std::sync::Arc;

/// Everything a request needs, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub mailer: Arc<dyn MailSender>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let pool = db::connect(&config.database).await?;
        db::migrate(&pool).await?;

        let mailer = mail::from_config(&config.mail)?;
        let users = Arc::new(PgUserStore::new(pool)) as Arc<dyn UserStore>;

        Ok(Self::from_parts(Arc::new(config), users, mailer))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        mailer: Arc<dyn MailSender>,
    ) -> Self {
        Self {
            config,
            users,
            mailer,
        }
    }
}

#[cfg(test)]
pub(crate) struct Fakes {
    pub users: Arc<crate::auth::repo::memory::MemoryUserStore>,
    pub mailer: Arc<crate::mail::recording::RecordingMailer>,
}

#[cfg(test)]
impl AppState {
    /// State over an in-memory user table and a recording mailer.
    pub(crate) fn fake(config: AppConfig) -> (Self, Fakes) {
        let users = Arc::new(crate::auth::repo::memory::MemoryUserStore::default());
        let mailer = Arc::new(crate::mail::recording::RecordingMailer::default());
        let state = Self::from_parts(
            Arc::new(config),
            users.clone() as Arc<dyn UserStore>,
            mailer.clone() as Arc<dyn MailSender>,
        );
        (state, Fakes { users, mailer })
    }
}
