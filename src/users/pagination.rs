//! Pagination for `GET /users`.
//!
//! A page is an id window: rows with `id >= page * per + adjustment`, capped
//! at `per` rows, where the adjustment is `1` for every page after the first.
//! Sorting only reorders rows inside that window. Windows key off id values,
//! so gaps in the id space shorten or shift pages.

use sqlx::{QueryBuilder, Sqlite};

use super::repo_types::{USERS_TABLE, USER_COLUMNS};
use crate::error::ApiError;

/// Columns a client may sort a page by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    Email,
    FirstName,
    LastName,
    Updated,
}

impl SortField {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "id" => Some(Self::Id),
            "email" => Some(Self::Email),
            "first_name" => Some(Self::FirstName),
            "last_name" => Some(Self::LastName),
            "updated" => Some(Self::Updated),
            _ => None,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Email => "email",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Updated => "updated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Anything other than `desc` sorts ascending.
    pub fn normalize(raw: &str) -> Self {
        match raw {
            "desc" => Self::Desc,
            _ => Self::Asc,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub order: SortOrder,
}

/// Id threshold plus row cap for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub min_id: i64,
    pub limit: i64,
}

/// Parsed, validated pagination parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per: u32,
    pub sort: Option<SortSpec>,
}

impl PageRequest {
    /// Returns `Ok(None)` unless both `page` and `per` are present; empty
    /// strings count as absent. Sorting needs both `sort` and `order`.
    pub fn from_params(
        page: Option<&str>,
        per: Option<&str>,
        sort: Option<&str>,
        order: Option<&str>,
        max_per: u32,
    ) -> Result<Option<Self>, ApiError> {
        let (Some(page_raw), Some(per_raw)) = (present(page), present(per)) else {
            return Ok(None);
        };

        let page = page_raw.parse::<u32>().map_err(|_| {
            ApiError::InvalidPagination(format!(
                "page must be a non-negative integer, got {page_raw:?}"
            ))
        })?;
        let per = per_raw.parse::<u32>().map_err(|_| {
            ApiError::InvalidPagination(format!(
                "per must be a positive integer, got {per_raw:?}"
            ))
        })?;
        if per == 0 || per > max_per {
            return Err(ApiError::InvalidPagination(format!(
                "per must be between 1 and {max_per}, got {per}"
            )));
        }
        i64::from(page)
            .checked_mul(i64::from(per))
            .and_then(|v| v.checked_add(1))
            .ok_or_else(|| ApiError::InvalidPagination("page is out of range".into()))?;

        let sort = match (present(sort), present(order)) {
            (Some(field_raw), Some(order_raw)) => {
                let field = SortField::parse(field_raw).ok_or_else(|| {
                    ApiError::InvalidPagination(format!("cannot sort by {field_raw:?}"))
                })?;
                Some(SortSpec {
                    field,
                    order: SortOrder::normalize(order_raw),
                })
            }
            _ => None,
        };

        Ok(Some(Self { page, per, sort }))
    }

    /// First id of the page: `page * per`, plus one past page zero so the
    /// previous page's last row is not repeated.
    pub fn min_id(&self) -> i64 {
        let adjustment = if self.page != 0 { 1 } else { 0 };
        i64::from(self.page)
            .saturating_mul(i64::from(self.per))
            .saturating_add(adjustment)
    }

    pub fn window(&self) -> PageWindow {
        PageWindow {
            min_id: self.min_id(),
            limit: i64::from(self.per),
        }
    }

    /// Link to the following page. Always emitted, even past the last row.
    pub fn next_link(&self, base: &str) -> String {
        let mut link = format!(
            "{}/users?page={}&per={}",
            base.trim_end_matches('/'),
            u64::from(self.page) + 1,
            self.per
        );
        if let Some(sort) = self.sort {
            link.push_str(&format!(
                "&sort={}&order={}",
                sort.field.column(),
                sort.order.as_str()
            ));
        }
        link
    }
}

/// Builds the list query. Without a window every row is selected. With a
/// window the page is bounded by id first; a sort then reorders only the
/// rows of that bounded sub-select.
pub fn build_list_query(
    window: Option<PageWindow>,
    sort: Option<SortSpec>,
) -> QueryBuilder<'static, Sqlite> {
    let mut qb = QueryBuilder::new("");

    let Some(window) = window else {
        qb.push(format!("SELECT {USER_COLUMNS} FROM {USERS_TABLE} ORDER BY id"));
        return qb;
    };

    match sort {
        Some(sort) => {
            qb.push(format!("SELECT {USER_COLUMNS} FROM ("));
            push_window(&mut qb, window);
            qb.push(") ORDER BY ")
                .push(sort.field.column())
                .push(" ")
                .push(sort.order.keyword())
                .push(", id LIMIT ")
                .push_bind(window.limit);
        }
        None => push_window(&mut qb, window),
    }
    qb
}

fn present(v: Option<&str>) -> Option<&str> {
    v.filter(|s| !s.is_empty())
}

fn push_window(qb: &mut QueryBuilder<'static, Sqlite>, window: PageWindow) {
    qb.push(format!("SELECT {USER_COLUMNS} FROM {USERS_TABLE} WHERE id >= "))
        .push_bind(window.min_id)
        .push(" ORDER BY id LIMIT ")
        .push_bind(window.limit);
}
