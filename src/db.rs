use std::str::FromStr;

use anyhow::Context;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
    PgPool,
};

use crate::config::{DatabaseConfig, DbConfig};

pub fn connect_options(cfg: &DatabaseConfig) -> anyhow::Result<PgConnectOptions> {
    let ssl_mode = PgSslMode::from_str(&cfg.ssl_mode)
        .with_context(|| format!("invalid DB_SSL_MODE {:?}", cfg.ssl_mode))?;
    let options = match &cfg.connection {
        DbConfig::Url(url) => PgConnectOptions::from_str(url).context("parse DATABASE_URL")?,
        // `require` encrypts without validating the server certificate.
        DbConfig::Parts {
            host,
            port,
            database,
            user,
            password,
        } => PgConnectOptions::new()
            .host(host)
            .port(*port)
            .database(database)
            .username(user)
            .password(password)
            .ssl_mode(ssl_mode),
    };
    Ok(options)
}

pub async fn connect(cfg: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let db = PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .connect_with(connect_options(cfg)?)
        .await
        .context("connect to database")?;
    Ok(db)
}

pub async fn migrate(db: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run migrations")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(ssl_mode: &str) -> DatabaseConfig {
        DatabaseConfig {
            connection: DbConfig::Parts {
                host: "db.internal".into(),
                port: 6543,
                database: "listi".into(),
                user: "app".into(),
                password: "pw".into(),
            },
            ssl_mode: ssl_mode.into(),
            max_connections: 5,
        }
    }

    #[test]
    fn discrete_parts_map_onto_options() {
        let opts = connect_options(&parts("require")).unwrap();
        assert_eq!(opts.get_host(), "db.internal");
        assert_eq!(opts.get_port(), 6543);
        assert_eq!(opts.get_database(), Some("listi"));
        assert_eq!(opts.get_username(), "app");
        assert!(matches!(opts.get_ssl_mode(), PgSslMode::Require));
    }

    #[test]
    fn rejects_unknown_ssl_mode() {
        assert!(connect_options(&parts("sometimes")).is_err());
    }

    #[test]
    fn url_is_parsed() {
        let cfg = DatabaseConfig {
            connection: DbConfig::Url("postgres://u:p@host:5433/app".into()),
            ssl_mode: "require".into(),
            max_connections: 1,
        };
        let opts = connect_options(&cfg).unwrap();
        assert_eq!(opts.get_host(), "host");
        assert_eq!(opts.get_port(), 5433);
    }
}
