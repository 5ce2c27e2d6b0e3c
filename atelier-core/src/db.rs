use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, info};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Pool settings for the inbox database.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
        }
    }
}

impl DatabaseConfig {
    /// `DATABASE_URL` is required; pool sizes come from `ATELIER_DB_*` when set.
    pub fn from_env() -> Result<Self, DatabaseError> {
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| DatabaseError::MissingEnvVar("DATABASE_URL".to_string()))?;

        let defaults = Self::default();

        Ok(Self {
            url,
            max_connections: env_or("ATELIER_DB_MAX_CONNECTIONS", defaults.max_connections),
            min_connections: env_or("ATELIER_DB_MIN_CONNECTIONS", defaults.min_connections),
            connect_timeout_secs: env_or(
                "ATELIER_DB_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout_secs,
            ),
            idle_timeout_secs: env_or("ATELIER_DB_IDLE_TIMEOUT_SECS", defaults.idle_timeout_secs),
        })
    }

    pub fn validate(&self) -> Result<(), DatabaseError> {
        if self.url.is_empty() {
            return Err(DatabaseError::InvalidConfig("url is empty".to_string()));
        }
        if self.min_connections > self.max_connections {
            return Err(DatabaseError::InvalidConfig(
                "min_connections exceeds max_connections".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    MigrationFailed(#[source] sqlx::migrate::MigrateError),

    #[error("Invalid database configuration: {0}")]
    InvalidConfig(String),
}

/// Snapshot of the connection pool, reported by `atelier init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    pub size: u32,
    pub idle: usize,
    pub migrations_applied: usize,
    pub migrations_known: usize,
}

impl PoolStatus {
    pub fn is_schema_current(&self) -> bool {
        self.migrations_applied >= self.migrations_known
    }
}

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        config.validate()?;
        debug!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Opening inbox database pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .connect(&config.url)
            .await?;

        info!("Inbox database pool ready");
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), DatabaseError> {
        info!(known = MIGRATOR.iter().count(), "Applying inbox schema migrations");

        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(DatabaseError::MigrationFailed)?;

        info!("Inbox schema is up to date");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Pool occupancy plus how many embedded migrations the database has recorded.
    pub async fn status(&self) -> Result<PoolStatus, DatabaseError> {
        let applied: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = TRUE")
                .fetch_one(&self.pool)
                .await?;

        Ok(PoolStatus {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
            migrations_applied: usize::try_from(applied).unwrap_or_default(),
            migrations_known: MIGRATOR.iter().count(),
        })
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Inbox database pool closed");
    }
}

/// Connects with `DATABASE_URL` and brings the schema up to date.
pub async fn init_database() -> Result<Database, DatabaseError> {
    dotenvy::dotenv().ok();

    let config = DatabaseConfig::from_env()?;
    let db = Database::connect(&config).await?;
    db.run_migrations().await?;

    Ok(db)
}
