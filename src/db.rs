use std::path::Path;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::config::AppConfig;

const CREATE_USERS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER NOT NULL PRIMARY KEY,
        email TEXT NULL,
        first_name TEXT NULL,
        last_name TEXT NULL,
        updated TIMESTAMP DEFAULT CURRENT_TIMESTAMP NULL
    )
"#;

/// (id, email, first_name, last_name) written on first start.
pub const SEED_USERS: [(i64, &str, &str, &str); 10] = [
    (1, "foobar@gmail.com", "foo", "bar"),
    (2, "baz@gmail.com", "baz", "baz"),
    (3, "alice@gmail.com", "alice", "alice"),
    (4, "bob@gmail.com", "bob", "bob"),
    (5, "john@gmail.com", "john", "john"),
    (6, "conner@gmail.com", "conner", "conner"),
    (7, "smith@gmail.com", "smith", "smith"),
    (8, "bazzzz@gmail.com", "bazzzz", "bazzzz"),
    (9, "outofnames@gmail.com", "outofnames", "outofnames"),
    (10, "google@gmail.com", "google", "google"),
];

/// Opens the pool, creating and seeding the database if its file is missing.
pub async fn connect(config: &AppConfig) -> anyhow::Result<SqlitePool> {
    let path = Path::new(&config.database_path);
    let fresh = !path.exists();

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let db = SqlitePoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect_with(options)
        .await
        .with_context(|| format!("open database {}", path.display()))?;

    if fresh {
        bootstrap(&db).await?;
        info!(path = %path.display(), users = SEED_USERS.len(), "created and seeded database");
    } else {
        info!(path = %path.display(), "using existing database");
    }

    Ok(db)
}

/// Creates the users table and inserts the seed rows in one transaction.
pub async fn bootstrap(db: &SqlitePool) -> anyhow::Result<()> {
    let mut tx = db.begin().await.context("begin bootstrap tx")?;
    sqlx::query(CREATE_USERS_TABLE)
        .execute(&mut *tx)
        .await
        .context("create users table")?;
    for (id, email, first_name, last_name) in SEED_USERS {
        sqlx::query("INSERT INTO users (id, email, first_name, last_name) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(email)
            .bind(first_name)
            .bind(last_name)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("seed user {id}"))?;
    }
    tx.commit().await.context("commit bootstrap tx")?;
    Ok(())
}
