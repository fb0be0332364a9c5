use sqlx::SqlitePool;

use super::pagination::{build_list_query, PageWindow, SortSpec};
use super::repo_types::{decode_users, User};

/// Every user, in id order.
pub async fn list_all(db: &SqlitePool) -> Result<Vec<User>, sqlx::Error> {
    list(db, None, None).await
}

/// One bounded page, optionally reordered within the page.
pub async fn list_page(
    db: &SqlitePool,
    window: PageWindow,
    sort: Option<SortSpec>,
) -> Result<Vec<User>, sqlx::Error> {
    list(db, Some(window), sort).await
}

async fn list(
    db: &SqlitePool,
    window: Option<PageWindow>,
    sort: Option<SortSpec>,
) -> Result<Vec<User>, sqlx::Error> {
    let mut qb = build_list_query(window, sort);
    let rows = qb.build().fetch_all(db).await?;
    decode_users(&rows)
}

pub async fn find_by_id(db: &SqlitePool, id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, first_name, last_name, updated
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

/// Inserts a client-identified user; a taken id violates the primary key.
pub async fn insert(
    db: &SqlitePool,
    id: i64,
    email: Option<&str>,
    first_name: Option<&str>,
    last_name: Option<&str>,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, email, first_name, last_name)
        VALUES (?, ?, ?, ?)
        RETURNING id, email, first_name, last_name, updated
        "#,
    )
    .bind(id)
    .bind(email)
    .bind(first_name)
    .bind(last_name)
    .fetch_one(db)
    .await
}

/// Replaces the mutable fields; `None` when the id does not exist.
pub async fn update(
    db: &SqlitePool,
    id: i64,
    email: Option<&str>,
    first_name: Option<&str>,
    last_name: Option<&str>,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users
           SET email = ?, first_name = ?, last_name = ?, updated = CURRENT_TIMESTAMP
         WHERE id = ?
        RETURNING id, email, first_name, last_name, updated
        "#,
    )
    .bind(email)
    .bind(first_name)
    .bind(last_name)
    .bind(id)
    .fetch_optional(db)
    .await
}

/// Returns the number of rows removed (0 or 1).
pub async fn delete(db: &SqlitePool, id: i64) -> Result<u64, sqlx::Error> {
    let res = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(res.rows_affected())
}
