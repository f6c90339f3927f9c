//! Public directory search and filter parameters.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::{Result, ToolyardError};
use crate::table::normalize_query;

const DEFAULT_PER_PAGE: i64 = 24;
const MAX_PER_PAGE: i64 = 60;

/// Ordering options for public tool lists. Featured tools always come first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ToolSort {
    /// Most recently published first.
    #[default]
    Newest,
    /// Oldest publications first.
    Oldest,
    /// Alphabetical by name.
    Name,
    /// Most viewed first.
    Popular,
}

impl ToolSort {
    /// Stable query-string label.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolSort::Newest => "newest",
            ToolSort::Oldest => "oldest",
            ToolSort::Name => "name",
            ToolSort::Popular => "popular",
        }
    }
}

impl std::str::FromStr for ToolSort {
    type Err = ToolyardError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim() {
            "" | "newest" => Ok(ToolSort::Newest),
            "oldest" => Ok(ToolSort::Oldest),
            "name" => Ok(ToolSort::Name),
            "popular" => Ok(ToolSort::Popular),
            other => Err(ToolyardError::validation(format!("unknown sort: {other}"))),
        }
    }
}

/// Raw query string of public list endpoints.
#[derive(Debug, Clone, Default, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RawCatalogQuery {
    /// Free-text search over name, tagline and description.
    pub q: Option<String>,
    /// Category slug.
    pub category: Option<String>,
    /// Tag slug.
    pub tag: Option<String>,
    /// Location slug.
    pub location: Option<String>,
    /// Shop slug.
    pub shop: Option<String>,
    /// `newest`, `oldest`, `name` or `popular`.
    pub sort: Option<String>,
    /// 1-based page.
    pub page: Option<i64>,
    /// Rows per page (1-60).
    pub per_page: Option<i64>,
}

/// Validated public tool query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogQuery {
    /// Search text.
    pub q: Option<String>,
    /// Category slug filter.
    pub category: Option<String>,
    /// Tag slug filter.
    pub tag: Option<String>,
    /// Location slug filter.
    pub location: Option<String>,
    /// Shop slug filter.
    pub shop: Option<String>,
    /// Ordering.
    pub sort: ToolSort,
    /// 1-based page.
    pub page: i64,
    /// Rows per page.
    pub per_page: i64,
}

impl CatalogQuery {
    /// Validate a raw query.
    pub fn parse(raw: &RawCatalogQuery) -> Result<Self> {
        let slug = |value: &Option<String>| {
            normalize_query(value.as_deref()).map(|value| value.to_ascii_lowercase())
        };
        Ok(Self {
            q: normalize_query(raw.q.as_deref()),
            category: slug(&raw.category),
            tag: slug(&raw.tag),
            location: slug(&raw.location),
            shop: slug(&raw.shop),
            sort: raw.sort.as_deref().unwrap_or_default().parse()?,
            page: raw.page.unwrap_or(1).max(1),
            per_page: raw
                .per_page
                .unwrap_or(DEFAULT_PER_PAGE)
                .clamp(1, MAX_PER_PAGE),
        })
    }

    /// Rows to skip.
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    /// `ILIKE` pattern for the search text.
    pub fn like_pattern(&self) -> Option<String> {
        self.q.as_deref().map(|q| format!("%{}%", escape_like(q)))
    }
}

/// Escape `%`, `_` and `\` so user input matches literally inside `LIKE`.
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_defaults_to_newest_first_page() {
        let query = CatalogQuery::parse(&RawCatalogQuery::default()).expect("query");
        assert_eq!(query.sort, ToolSort::Newest);
        assert_eq!(query.page, 1);
        assert_eq!(query.per_page, 24);
        assert_eq!(query.like_pattern(), None);
    }

    #[test]
    fn parse_normalizes_filters() {
        let raw = RawCatalogQuery {
            q: Some("  crm ".to_string()),
            category: Some(" Sales ".to_string()),
            tag: Some(String::new()),
            sort: Some("popular".to_string()),
            page: Some(0),
            per_page: Some(500),
            ..RawCatalogQuery::default()
        };
        let query = CatalogQuery::parse(&raw).expect("query");
        assert_eq!(query.q.as_deref(), Some("crm"));
        assert_eq!(query.category.as_deref(), Some("sales"));
        assert_eq!(query.tag, None);
        assert_eq!(query.sort, ToolSort::Popular);
        assert_eq!(query.page, 1);
        assert_eq!(query.per_page, 60);
        assert_eq!(query.like_pattern().as_deref(), Some("%crm%"));
    }

    #[test]
    fn parse_rejects_unknown_sort() {
        let raw = RawCatalogQuery {
            sort: Some("random".to_string()),
            ..RawCatalogQuery::default()
        };
        assert!(CatalogQuery::parse(&raw).is_err());
    }

    #[test]
    fn escape_like_neutralizes_wildcards() {
        assert_eq!(escape_like("100%_off\\"), "100\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn offset_uses_page_size() {
        let raw = RawCatalogQuery {
            page: Some(3),
            per_page: Some(10),
            ..RawCatalogQuery::default()
        };
        assert_eq!(CatalogQuery::parse(&raw).expect("query").offset(), 20);
    }
}
