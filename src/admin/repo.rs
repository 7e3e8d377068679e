use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppResult;
use super::dto::UserFilter;
use crate::query::{fetch_page, Filter, ListParams, ListSpec, Page, SortDirection};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: String,
    pub banned: bool,
    pub ban_reason: Option<String>,
    pub created_at: OffsetDateTime,
}

static USERS: ListSpec = ListSpec {
    columns: "u.id, u.email, u.name, u.role, u.banned, u.ban_reason, u.created_at",
    from: "users u",
    search_columns: &["u.name", "u.email"],
    sort_columns: &[
        ("name", "u.name"),
        ("email", "u.email"),
        ("role", "u.role"),
        ("createdAt", "u.created_at"),
    ],
    default_sort: ("u.created_at", SortDirection::Desc),
    tie_breaker: "u.id",
};

pub fn filters(f: &UserFilter) -> Vec<Filter> {
    let mut out = Vec::new();
    if let Some(role) = f.role {
        out.push(Filter::Text("u.role", role.as_str().to_string()));
    }
    match f.banned {
        Some(true) => out.push(Filter::Raw("u.banned")),
        Some(false) => out.push(Filter::Raw("NOT u.banned")),
        None => {}
    }
    out
}

pub async fn list_users(db: &PgPool, filter: &UserFilter, params: &ListParams) -> AppResult<Page<UserRow>> {
    fetch_page(db, &USERS, &filters(filter), params).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::GlobalRole;
    use crate::query::count_query;

    #[test]
    fn role_and_ban_filters_reach_the_where_clause() {
        let f = UserFilter {
            role: Some(GlobalRole::SuperAdmin),
            banned: Some(false),
        };
        let qb = count_query(&USERS, &filters(&f), &ListParams::default());
        let sql = qb.sql().to_string();
        assert!(sql.contains("u.role = $1"), "{}", sql);
        assert!(sql.contains("(NOT u.banned)"), "{}", sql);
    }

    #[test]
    fn no_filter_means_every_user() {
        assert!(filters(&UserFilter::default()).is_empty());
    }
}
