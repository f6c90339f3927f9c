//! Query helpers shared by public and admin handlers.

use std::cell::RefCell;
use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use diesel::pg::{Pg, PgConnection};
use diesel::helper_types::{Asc, Desc};
use diesel::prelude::*;
use diesel::query_dsl::methods;
use serde::{Deserialize, Serialize};
use toolyard_core::{
    AdSpot, Booking, PostStatus, SlugStore, TermKind, ToolStatus, ToolyardError, slugify,
    unique_slug,
};
use utoipa::ToSchema;

use crate::errors::ApiResult;
use crate::models::{Ad, Term, Tool};
use crate::schema::{ads, posts, terms, tool_terms, tools};

/// Listable tool status labels.
pub(crate) fn listable_statuses() -> Vec<&'static str> {
    ToolStatus::ALL
        .into_iter()
        .filter(ToolStatus::is_listable)
        .map(|status| status.as_str())
        .collect()
}

/// Tools visible to the public at `now`.
pub(crate) fn visible_tools(now: NaiveDateTime) -> tools::BoxedQuery<'static, Pg> {
    tools::table
        .filter(tools::status.eq_any(listable_statuses()))
        .filter(tools::published_at.le(now))
        .into_boxed()
}

/// Posts visible to the public at `now`.
pub(crate) fn visible_posts(now: NaiveDateTime) -> posts::BoxedQuery<'static, Pg> {
    posts::table
        .filter(posts::status.eq(PostStatus::Published.as_str()))
        .filter(posts::published_at.le(now))
        .into_boxed()
}

/// Ids of tools linked to the term with `slug` of `kind`.
pub(crate) fn tool_ids_for_term(
    conn: &mut PgConnection,
    kind: TermKind,
    slug: &str,
) -> ApiResult<Vec<String>> {
    Ok(tool_terms::table
        .inner_join(terms::table)
        .filter(terms::kind.eq(kind.as_str()))
        .filter(terms::slug.eq(slug))
        .select(tool_terms::tool_id)
        .load(conn)?)
}

/// Term with `slug` of `kind`, if any.
pub(crate) fn find_term(
    conn: &mut PgConnection,
    kind: TermKind,
    slug: &str,
) -> ApiResult<Option<Term>> {
    Ok(terms::table
        .filter(terms::kind.eq(kind.as_str()))
        .filter(terms::slug.eq(slug))
        .select(Term::as_select())
        .first(conn)
        .optional()?)
}

/// Order a query by one column in either direction.
pub(crate) fn sort_by<Q, C>(query: Q, column: C, desc: bool) -> Q
where
    C: ExpressionMethods,
    Q: methods::OrderDsl<Asc<C>, Output = Q> + methods::OrderDsl<Desc<C>, Output = Q>,
{
    if desc {
        methods::OrderDsl::order(query, column.desc())
    } else {
        methods::OrderDsl::order(query, column.asc())
    }
}

/// Minimal term reference embedded in tool payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TermRef {
    /// Term identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// URL slug.
    pub slug: String,
}

impl From<&Term> for TermRef {
    fn from(term: &Term) -> Self {
        Self {
            id: term.id.clone(),
            name: term.name.clone(),
            slug: term.slug.clone(),
        }
    }
}

/// Linked terms of `kind` for each tool id, ordered by name.
pub(crate) fn linked_terms(
    conn: &mut PgConnection,
    tool_ids: &[String],
    kind: TermKind,
) -> ApiResult<HashMap<String, Vec<TermRef>>> {
    if tool_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(String, Term)> = tool_terms::table
        .inner_join(terms::table)
        .filter(tool_terms::tool_id.eq_any(tool_ids))
        .filter(terms::kind.eq(kind.as_str()))
        .order(terms::name.asc())
        .select((tool_terms::tool_id, Term::as_select()))
        .load(conn)?;
    let mut grouped: HashMap<String, Vec<TermRef>> = HashMap::new();
    for (tool_id, term) in rows {
        grouped.entry(tool_id).or_default().push(TermRef::from(&term));
    }
    Ok(grouped)
}

/// Terms by id.
pub(crate) fn terms_by_id(
    conn: &mut PgConnection,
    ids: &[String],
) -> ApiResult<HashMap<String, TermRef>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<Term> = terms::table
        .filter(terms::id.eq_any(ids))
        .select(Term::as_select())
        .load(conn)?;
    Ok(rows
        .iter()
        .map(|term| (term.id.clone(), TermRef::from(term)))
        .collect())
}

/// Tool summary used in public lists.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ToolCard {
    /// Tool identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// URL slug.
    pub slug: String,
    /// Homepage URL.
    pub website_url: String,
    /// Short pitch.
    pub tagline: Option<String>,
    /// Logo URL.
    pub logo_url: Option<String>,
    /// Pinned above regular listings.
    pub is_featured: bool,
    /// Detail page views.
    pub pageviews: i64,
    /// Publication time.
    pub published_at: Option<NaiveDateTime>,
    /// Categories, ordered by name.
    pub categories: Vec<TermRef>,
}

/// Build cards for `tools`, preserving their order.
pub(crate) fn tool_cards(conn: &mut PgConnection, tools: Vec<Tool>) -> ApiResult<Vec<ToolCard>> {
    let ids: Vec<String> = tools.iter().map(|tool| tool.id.clone()).collect();
    let mut categories = linked_terms(conn, &ids, TermKind::Category)?;
    Ok(tools
        .into_iter()
        .map(|tool| ToolCard {
            categories: categories.remove(&tool.id).unwrap_or_default(),
            id: tool.id,
            name: tool.name,
            slug: tool.slug,
            website_url: tool.website_url,
            tagline: tool.tagline,
            logo_url: tool.logo_url,
            is_featured: tool.is_featured,
            pageviews: tool.pageviews,
            published_at: tool.published_at,
        })
        .collect())
}

/// Convert stored ads to bookings, skipping rows with unknown spots.
pub(crate) fn bookings_from_ads(rows: &[Ad]) -> Vec<Booking> {
    rows.iter()
        .filter_map(|ad| match ad.spot.parse::<AdSpot>() {
            Ok(spot) => Some(Booking {
                spot,
                start_date: ad.starts_on,
                end_date: ad.ends_on,
            }),
            Err(err) => {
                log::warn!("ignoring ad {} with invalid spot: {err}", ad.id);
                None
            }
        })
        .collect()
}

/// Bookings still running on or after `from`, optionally excluding one ad.
pub(crate) fn load_bookings(
    conn: &mut PgConnection,
    from: NaiveDate,
    exclude_id: Option<&str>,
) -> ApiResult<Vec<Booking>> {
    let mut query = ads::table.filter(ads::ends_on.ge(from)).into_boxed();
    if let Some(exclude_id) = exclude_id {
        query = query.filter(ads::id.ne(exclude_id.to_string()));
    }
    let rows: Vec<Ad> = query.order(ads::starts_on.asc()).load(conn)?;
    Ok(bookings_from_ads(&rows))
}

/// Table whose slugs must stay unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlugScope {
    Tools,
    Posts,
    Terms(TermKind),
}

/// [`SlugStore`] backed by a database table.
pub(crate) struct DbSlugStore<'a> {
    conn: RefCell<&'a mut PgConnection>,
    scope: SlugScope,
    exclude_id: Option<String>,
}

impl<'a> DbSlugStore<'a> {
    pub(crate) fn new(
        conn: &'a mut PgConnection,
        scope: SlugScope,
        exclude_id: Option<&str>,
    ) -> Self {
        Self {
            conn: RefCell::new(conn),
            scope,
            exclude_id: exclude_id.map(String::from),
        }
    }
}

impl SlugStore for DbSlugStore<'_> {
    fn slug_exists(&self, slug: &str) -> toolyard_core::Result<bool> {
        let mut guard = self.conn.borrow_mut();
        let conn: &mut PgConnection = &mut guard;
        let exclude = self.exclude_id.clone().unwrap_or_default();
        let count: Result<i64, diesel::result::Error> = match self.scope {
            SlugScope::Tools => tools::table
                .filter(tools::slug.eq(slug))
                .filter(tools::id.ne(exclude))
                .count()
                .get_result(conn),
            SlugScope::Posts => posts::table
                .filter(posts::slug.eq(slug))
                .filter(posts::id.ne(exclude))
                .count()
                .get_result(conn),
            SlugScope::Terms(kind) => terms::table
                .filter(terms::kind.eq(kind.as_str()))
                .filter(terms::slug.eq(slug))
                .filter(terms::id.ne(exclude))
                .count()
                .get_result(conn),
        };
        count
            .map(|count| count > 0)
            .map_err(|err| ToolyardError::Other(format!("slug lookup failed: {err}")))
    }
}

/// Pick the slug for a record.
///
/// The explicit slug, or `name` when there is none, is slugified and given a
/// numeric suffix when taken. `exclude_id` keeps a record's own slug free.
pub(crate) fn resolve_slug(
    conn: &mut PgConnection,
    scope: SlugScope,
    explicit: Option<&str>,
    name: &str,
    exclude_id: Option<&str>,
) -> ApiResult<String> {
    let store = DbSlugStore::new(conn, scope, exclude_id);
    let source = explicit
        .map(str::trim)
        .filter(|slug| !slug.is_empty())
        .unwrap_or(name);
    Ok(unique_slug(&slugify(source), &store)?)
}
