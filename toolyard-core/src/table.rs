//! Parameters shared by every admin data table.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::{Result, ToolyardError};
use crate::pricing::parse_date;

const DEFAULT_PER_PAGE: i64 = 25;
const MAX_PER_PAGE: i64 = 100;

/// Raw query string accepted by admin list endpoints.
#[derive(Debug, Clone, Default, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RawTableQuery {
    /// 1-based page number.
    pub page: Option<i64>,
    /// Rows per page (1-100).
    pub per_page: Option<i64>,
    /// Sort key such as `name.asc` or `created_at.desc`.
    pub sort: Option<String>,
    /// Free-text filter.
    pub q: Option<String>,
    /// Comma-separated status (or spot) filter.
    pub status: Option<String>,
    /// Lower bound on creation date (YYYY-MM-DD).
    pub from: Option<String>,
    /// Upper bound on creation date, inclusive (YYYY-MM-DD).
    pub to: Option<String>,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

/// Validated sort column and direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    /// Whitelisted column name.
    pub field: String,
    /// Direction.
    pub direction: SortDirection,
}

impl SortSpec {
    /// Parse `field`, `field.asc` or `field.desc` against a whitelist.
    pub fn parse(raw: &str, allowed: &[&str]) -> Result<Self> {
        let raw = raw.trim();
        let (field, direction) = match raw.rsplit_once('.') {
            Some((field, "asc")) => (field, SortDirection::Asc),
            Some((field, "desc")) => (field, SortDirection::Desc),
            Some((_, other)) => {
                return Err(ToolyardError::validation(format!(
                    "unknown sort direction: {other}"
                )));
            }
            None => (raw, SortDirection::Asc),
        };
        if !allowed.contains(&field) {
            return Err(ToolyardError::validation(format!(
                "cannot sort by {field}; expected one of {}",
                allowed.join(", ")
            )));
        }
        Ok(Self {
            field: field.to_string(),
            direction,
        })
    }

    /// True for descending order.
    pub fn is_desc(&self) -> bool {
        self.direction == SortDirection::Desc
    }
}

/// Validated data table parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableParams {
    /// 1-based page.
    pub page: i64,
    /// Rows per page.
    pub per_page: i64,
    /// Optional sort.
    pub sort: Option<SortSpec>,
    /// Trimmed free-text filter.
    pub query: Option<String>,
}

impl TableParams {
    /// Validate raw query parameters, clamping paging to sane bounds.
    pub fn parse(raw: &RawTableQuery, allowed_sorts: &[&str]) -> Result<Self> {
        let page = raw.page.unwrap_or(1).max(1);
        let per_page = raw
            .per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE);
        let sort = raw
            .sort
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .map(|value| SortSpec::parse(value, allowed_sorts))
            .transpose()?;
        Ok(Self {
            page,
            per_page,
            sort,
            query: normalize_query(raw.q.as_deref()),
        })
    }

    /// Rows to skip.
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    /// Number of pages needed for `total` rows.
    pub fn page_count(&self, total: i64) -> i64 {
        page_count(total, self.per_page)
    }
}

/// `ceil(total / per_page)`, zero for an empty table.
pub fn page_count(total: i64, per_page: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    let per_page = per_page.max(1);
    (total + per_page - 1) / per_page
}

/// Trim a free-text filter, dropping it when empty.
pub fn normalize_query(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(String::from)
}

/// One page of rows plus paging metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Rows on this page.
    pub rows: Vec<T>,
    /// Total rows across all pages.
    pub total: i64,
    /// Current page.
    pub page: i64,
    /// Rows per page.
    pub per_page: i64,
    /// Number of pages.
    pub page_count: i64,
}

impl<T> Page<T> {
    /// Assemble a page.
    pub fn new(rows: Vec<T>, total: i64, page: i64, per_page: i64) -> Self {
        Self {
            rows,
            total,
            page,
            per_page,
            page_count: page_count(total, per_page),
        }
    }

    /// Convert every row, keeping paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            rows: self.rows.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            page_count: self.page_count,
        }
    }
}

/// Parse a comma-separated list of values (ids, statuses).
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(String::from)
        .collect()
}

/// Parse a non-empty id list for bulk actions.
pub fn parse_id_list(raw: &str) -> Result<Vec<String>> {
    let ids = parse_list(raw);
    if ids.is_empty() {
        return Err(ToolyardError::validation("at least one id is required"));
    }
    Ok(ids)
}

/// Creation-date window; `to` is inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreatedRange {
    /// Inclusive lower bound.
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound.
    pub to: Option<NaiveDate>,
}

impl CreatedRange {
    /// Parse optional ISO dates; `from` after `to` is rejected.
    pub fn parse(from: Option<&str>, to: Option<&str>) -> Result<Self> {
        let parse = |raw: Option<&str>| -> Result<Option<NaiveDate>> {
            match normalize_query(raw) {
                Some(value) => parse_date(&value).map(Some),
                None => Ok(None),
            }
        };
        let range = Self {
            from: parse(from)?,
            to: parse(to)?,
        };
        if let (Some(from), Some(to)) = (range.from, range.to) {
            if from > to {
                return Err(ToolyardError::validation("date range starts after it ends"));
            }
        }
        Ok(range)
    }

    /// Lower bound as a timestamp (start of day).
    pub fn lower(&self) -> Option<NaiveDateTime> {
        self.from.map(|day| day.and_time(NaiveTime::MIN))
    }

    /// Exclusive upper bound as a timestamp (start of the following day).
    pub fn upper_exclusive(&self) -> Option<NaiveDateTime> {
        self.to
            .and_then(|day| day.succ_opt())
            .map(|day| day.and_time(NaiveTime::MIN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SORTS: &[&str] = &["name", "created_at"];

    #[test]
    fn parse_applies_defaults() {
        let params = TableParams::parse(&RawTableQuery::default(), SORTS).expect("params");
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, 25);
        assert_eq!(params.sort, None);
        assert_eq!(params.query, None);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn parse_clamps_paging() {
        let raw = RawTableQuery {
            page: Some(-3),
            per_page: Some(1000),
            q: Some("   ".to_string()),
            ..RawTableQuery::default()
        };
        let params = TableParams::parse(&raw, SORTS).expect("params");
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, 100);
        assert_eq!(params.query, None);

        let raw = RawTableQuery {
            page: Some(3),
            per_page: Some(0),
            ..RawTableQuery::default()
        };
        let params = TableParams::parse(&raw, SORTS).expect("params");
        assert_eq!(params.per_page, 1);
        assert_eq!(params.offset(), 2);
    }

    #[test]
    fn sort_accepts_whitelisted_fields() {
        let spec = SortSpec::parse("created_at.desc", SORTS).expect("sort");
        assert_eq!(spec.field, "created_at");
        assert!(spec.is_desc());
        let spec = SortSpec::parse("name", SORTS).expect("sort");
        assert_eq!(spec.direction, SortDirection::Asc);
    }

    #[test]
    fn sort_rejects_unknown_fields_and_directions() {
        let err = SortSpec::parse("password.asc", SORTS).unwrap_err();
        assert!(err.to_string().contains("cannot sort by password"));
        assert!(SortSpec::parse("name.sideways", SORTS).is_err());
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(page_count(0, 25), 0);
        assert_eq!(page_count(1, 25), 1);
        assert_eq!(page_count(25, 25), 1);
        assert_eq!(page_count(26, 25), 2);
        let page = Page::new(vec![1, 2], 51, 2, 25).map(|value| value * 10);
        assert_eq!(page.rows, vec![10, 20]);
        assert_eq!(page.page_count, 3);
    }

    #[test]
    fn id_lists_ignore_blank_entries() {
        assert_eq!(
            parse_id_list(" a, ,b,c ").expect("ids"),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert!(parse_id_list(" , ").is_err());
    }

    #[test]
    fn created_range_bounds_are_inclusive() {
        let range = CreatedRange::parse(Some("2026-02-01"), Some("2026-02-28")).expect("range");
        assert_eq!(
            range.lower().map(|at| at.to_string()),
            Some("2026-02-01 00:00:00".to_string())
        );
        assert_eq!(
            range.upper_exclusive().map(|at| at.to_string()),
            Some("2026-03-01 00:00:00".to_string())
        );
        assert!(CreatedRange::parse(Some("2026-03-01"), Some("2026-02-01")).is_err());
        assert_eq!(CreatedRange::parse(None, Some("")).expect("empty"), CreatedRange::default());
    }
}
