use tracing::debug;

use super::dto::{ListParams, PaginationResponse, UserListing};
use super::pagination::PageRequest;
use super::repo;
use super::repo_types::User;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Parses a path id before anything touches the store.
pub fn parse_id(raw: &str) -> ApiResult<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ApiError::BadRequest(format!("user id must be an integer, got {raw:?}")))
}

/// Full listing, or one page wrapped in the pagination envelope.
pub async fn list_users(state: &AppState, params: &ListParams) -> ApiResult<UserListing> {
    let request = PageRequest::from_params(
        params.page.as_deref(),
        params.per.as_deref(),
        params.sort.as_deref(),
        params.order.as_deref(),
        state.config.max_page_size,
    )?;

    let Some(request) = request else {
        let users = repo::list_all(&state.db).await?;
        debug!(count = users.len(), "listed all users");
        return Ok(UserListing::All(users));
    };

    let window = request.window();
    let users = repo::list_page(&state.db, window, request.sort).await?;
    debug!(
        page = request.page,
        per = request.per,
        min_id = window.min_id,
        count = users.len(),
        "listed user page"
    );
    Ok(UserListing::Page(assemble_page(
        &state.config.api_base_url,
        &request,
        users,
    )))
}

pub fn assemble_page(base: &str, request: &PageRequest, results: Vec<User>) -> PaginationResponse {
    PaginationResponse {
        base: base.to_string(),
        next: request.next_link(base),
        results,
    }
}
