use crate::core::config::DatabaseConfig;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
}

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    pool_options(config).connect(&config.url).await
}

/// Pool that opens connections on first use. Services can be built
/// against it without a reachable database.
#[cfg(test)]
pub fn lazy_pool(url: &str) -> PgPool {
    let config = DatabaseConfig {
        url: url.to_string(),
        max_connections: 1,
        min_connections: 0,
        acquire_timeout_secs: 1,
        idle_timeout_secs: 60,
        max_lifetime_secs: 60,
    };
    pool_options(&config)
        .connect_lazy(&config.url)
        .expect("lazy pool from a well-formed url")
}

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// `ILIKE` pattern matching `term` anywhere, with wildcards in the term escaped
pub fn contains_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern(" flood "), "%flood%");
        assert_eq!(contains_pattern("100%_done"), "%100\\%\\_done%");
    }
}
