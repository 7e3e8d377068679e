//! Search / sort / paginate helper shared by every list endpoint.
//!
//! Each entity describes itself with a static [`ListSpec`]: the select list,
//! the FROM clause (joins included), the text columns searched with `ILIKE`
//! and an allow-list mapping public sort keys to SQL expressions. Unknown
//! sort keys fall back to the list's default ordering. Items and the total
//! count run concurrently under the same filter.

use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::AppResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    fn sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default, alias = "sortColumn")]
    pub sort_column: Option<String>,
    #[serde(default, alias = "sortDirection")]
    pub sort_direction: Option<SortDirection>,
    #[serde(default)]
    pub page: i64,
    #[serde(default = "default_items_per_page", alias = "itemsPerPage")]
    pub items_per_page: i64,
}

fn default_items_per_page() -> i64 {
    10
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            search: None,
            sort_column: None,
            sort_direction: None,
            page: 0,
            items_per_page: default_items_per_page(),
        }
    }
}

impl ListParams {
    /// Forces `page >= 0` and `1 <= items_per_page <= max`.
    pub fn clamped(mut self, max: i64) -> Self {
        self.page = self.page.max(0);
        self.items_per_page = self.items_per_page.clamp(1, max.max(1));
        self
    }

    pub fn offset(&self) -> i64 {
        self.page.saturating_mul(self.items_per_page)
    }

    fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub total_pages: i64,
    pub page: i64,
    pub items_per_page: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_count: i64, page: i64, items_per_page: i64) -> Self {
        Self {
            items,
            total_count,
            total_pages: total_pages(total_count, items_per_page),
            page,
            items_per_page,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            total_pages: self.total_pages,
            page: self.page,
            items_per_page: self.items_per_page,
        }
    }
}

pub fn total_pages(total_count: i64, items_per_page: i64) -> i64 {
    if items_per_page <= 0 || total_count <= 0 {
        return 0;
    }
    (total_count + items_per_page - 1) / items_per_page
}

pub struct ListSpec {
    pub columns: &'static str,
    pub from: &'static str,
    pub search_columns: &'static [&'static str],
    /// Public sort key -> SQL expression.
    pub sort_columns: &'static [(&'static str, &'static str)],
    pub default_sort: (&'static str, SortDirection),
    /// Appended to every ORDER BY so pages never overlap.
    pub tie_breaker: &'static str,
}

impl ListSpec {
    pub fn resolve_sort(&self, params: &ListParams) -> (&'static str, SortDirection) {
        let requested = params.sort_column.as_deref().and_then(|key| {
            self.sort_columns
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, expr)| *expr)
        });
        match requested {
            Some(expr) => (expr, params.sort_direction.unwrap_or_default()),
            None => self.default_sort,
        }
    }
}

/// Equality filter that scopes a listing (tenant, parent record, ...).
#[derive(Debug, Clone)]
pub enum Filter {
    Id(&'static str, Uuid),
    Text(&'static str, String),
    Raw(&'static str),
}

fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn push_where(qb: &mut QueryBuilder<'static, Postgres>, spec: &ListSpec, filters: &[Filter], params: &ListParams) {
    qb.push(" WHERE TRUE");
    for f in filters {
        match f {
            Filter::Id(column, value) => {
                qb.push(" AND ").push(*column).push(" = ").push_bind(*value);
            }
            Filter::Text(column, value) => {
                qb.push(" AND ").push(*column).push(" = ").push_bind(value.clone());
            }
            Filter::Raw(condition) => {
                qb.push(" AND (").push(*condition).push(")");
            }
        }
    }
    if let Some(term) = params.search_term() {
        if !spec.search_columns.is_empty() {
            let pattern = format!("%{}%", escape_like(term));
            qb.push(" AND (");
            for (i, column) in spec.search_columns.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                qb.push(*column).push(" ILIKE ").push_bind(pattern.clone());
            }
            qb.push(")");
        }
    }
}

pub fn items_query(spec: &ListSpec, filters: &[Filter], params: &ListParams) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT ");
    qb.push(spec.columns).push(" FROM ").push(spec.from);
    push_where(&mut qb, spec, filters, params);

    let (expr, dir) = spec.resolve_sort(params);
    qb.push(" ORDER BY ")
        .push(expr)
        .push(" ")
        .push(dir.sql())
        .push(", ")
        .push(spec.tie_breaker)
        .push(" ASC");
    qb.push(" LIMIT ").push_bind(params.items_per_page);
    qb.push(" OFFSET ").push_bind(params.offset());
    qb
}

pub fn count_query(spec: &ListSpec, filters: &[Filter], params: &ListParams) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM ");
    qb.push(spec.from);
    push_where(&mut qb, spec, filters, params);
    qb
}

pub async fn fetch_page<T>(
    db: &PgPool,
    spec: &ListSpec,
    filters: &[Filter],
    params: &ListParams,
) -> AppResult<Page<T>>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let mut items_qb = items_query(spec, filters, params);
    let mut count_qb = count_query(spec, filters, params);

    let (items, (total,)) = tokio::try_join!(
        items_qb.build_query_as::<T>().fetch_all(db),
        count_qb.build_query_as::<(i64,)>().fetch_one(db),
    )?;

    Ok(Page::new(items, total, params.page, params.items_per_page))
}

#[cfg(test)]
mod tests {
    use super::*;

    static SPEC: ListSpec = ListSpec {
        columns: "q.id, q.title",
        from: "quizzes q",
        search_columns: &["q.title", "q.description"],
        sort_columns: &[("title", "q.title"), ("createdAt", "q.created_at")],
        default_sort: ("q.created_at", SortDirection::Desc),
        tie_breaker: "q.id",
    };

    fn params() -> ListParams {
        ListParams::default()
    }

    fn sql_of(qb: QueryBuilder<'static, Postgres>) -> String {
        qb.sql().to_string()
    }

    #[test]
    fn total_pages_is_ceiling() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(10_001, 10_000), 2);
    }

    #[test]
    fn pages_partition_the_result_set() {
        for total in [0_i64, 1, 7, 30, 31] {
            for per in [1_i64, 3, 10] {
                let mut seen = Vec::new();
                for page in 0..total_pages(total, per) {
                    let p = ListParams { page, items_per_page: per, ..params() };
                    let start = p.offset();
                    let end = (start + per).min(total);
                    assert!(end - start <= per);
                    seen.extend(start..end);
                }
                assert_eq!(seen, (0..total).collect::<Vec<_>>());
            }
        }
    }

    #[test]
    fn clamp_keeps_values_in_range() {
        let p = ListParams { page: -3, items_per_page: 50_000, ..params() }.clamped(10_000);
        assert_eq!(p.page, 0);
        assert_eq!(p.items_per_page, 10_000);
        let p = ListParams { items_per_page: 0, ..params() }.clamped(100);
        assert_eq!(p.items_per_page, 1);
    }

    #[test]
    fn unknown_sort_column_falls_back_to_created_at_desc() {
        let p = ListParams {
            sort_column: Some("password_hash; DROP TABLE".into()),
            sort_direction: Some(SortDirection::Asc),
            ..params()
        };
        let sql = sql_of(items_query(&SPEC, &[], &p));
        assert!(sql.contains("ORDER BY q.created_at DESC, q.id ASC"), "{}", sql);
        assert!(!sql.contains("DROP"));
    }

    #[test]
    fn allow_listed_sort_is_case_insensitive() {
        let p = ListParams {
            sort_column: Some("TITLE".into()),
            sort_direction: Some(SortDirection::Asc),
            ..params()
        };
        let sql = sql_of(items_query(&SPEC, &[], &p));
        assert!(sql.contains("ORDER BY q.title ASC"));
    }

    #[test]
    fn search_spans_all_text_columns_and_count_shares_filter() {
        let p = ListParams { search: Some("  alg  ".into()), ..params() };
        let filters = [Filter::Id("q.organization_id", Uuid::nil())];
        let items = sql_of(items_query(&SPEC, &filters, &p));
        let count = sql_of(count_query(&SPEC, &filters, &p));
        for sql in [&items, &count] {
            assert!(sql.contains("q.organization_id = $1"));
            assert!(sql.contains("(q.title ILIKE $2 OR q.description ILIKE $3)"));
        }
        assert!(items.contains("LIMIT $4 OFFSET $5"));
        assert!(!count.contains("LIMIT"));
    }

    #[test]
    fn blank_search_adds_no_filter() {
        let p = ListParams { search: Some("   ".into()), ..params() };
        let sql = sql_of(count_query(&SPEC, &[], &p));
        assert!(!sql.contains("ILIKE"));
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn params_accept_camel_case_keys() {
        let p: ListParams = serde_json::from_str(
            r#"{"sortColumn":"title","sortDirection":"asc","itemsPerPage":25,"page":2}"#,
        )
        .unwrap();
        assert_eq!(p.sort_column.as_deref(), Some("title"));
        assert_eq!(p.sort_direction, Some(SortDirection::Asc));
        assert_eq!(p.items_per_page, 25);
        assert_eq!(p.offset(), 50);
    }
}
