use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, FromRow};
use time::OffsetDateTime;

/// Table holding every user record.
pub const USERS_TABLE: &str = "users";

/// Column list shared by every SELECT, in decode order.
pub const USER_COLUMNS: &str = "id, email, first_name, last_name, updated";

/// User record in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated: Option<OffsetDateTime>, // set by the store on write
}

/// Decodes fetched rows in order; one bad row fails the whole batch.
pub fn decode_users(rows: &[SqliteRow]) -> Result<Vec<User>, sqlx::Error> {
    rows.iter().map(|row| User::from_row(row)).collect()
}
