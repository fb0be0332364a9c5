use serde::{Deserialize, Serialize};

use super::repo_types::User;

/// Raw `GET /users` query; numbers are parsed later so bad input gets a
/// proper error body.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ListParams {
    pub page: Option<String>,
    pub per: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

impl ListParams {
    /// A repeated key keeps its first value; unknown keys are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "page" => &mut params.page,
                "per" => &mut params.per,
                "sort" => &mut params.sort,
                "order" => &mut params.order,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        params
    }
}

/// Pagination envelope.
#[derive(Debug, Serialize)]
pub struct PaginationResponse {
    pub base: String,
    pub next: String,
    pub results: Vec<User>,
}

/// `GET /users` answers with a bare array unless pagination was requested.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum UserListing {
    All(Vec<User>),
    Page(PaginationResponse),
}

/// Request body for `POST /users`.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub id: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Request body for `POST /users/:id`. Any `id` in the body is dropped; the
/// path decides which row is replaced.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
