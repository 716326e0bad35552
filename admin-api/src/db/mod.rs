use access_control::{DirectoryError, UserDirectory, UserId, UserRecord};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::Config;
use crate::models::UserRow;

#[derive(Clone)]
pub struct Database {
    pub pg: PgPool,
}

impl Database {
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        let pg = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .connect(&config.database.url)
            .await?;

        tracing::info!("PostgreSQL connection pool established");

        Ok(Self { pg })
    }
}

/// User directory backed by the `users` table
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(db: &Database) -> Self {
        Self { pool: db.pg.clone() }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_user(&self, id: UserId) -> Result<Option<UserRecord>, DirectoryError> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, role, status FROM users WHERE id = $1")
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    tracing::error!(user_id = %id, "User lookup failed: {}", e);
                    match e {
                        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                            DirectoryError::Malformed(e.to_string())
                        }
                        _ => DirectoryError::Unavailable(e.to_string()),
                    }
                })?;

        Ok(row.map(UserRecord::from))
    }
}
