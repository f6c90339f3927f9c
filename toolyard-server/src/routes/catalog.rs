//! Public directory: site metadata, tools and taxonomies.

use std::collections::HashMap;

use actix_web::{HttpResponse, get, web};
use chrono::NaiveDateTime;
use diesel::dsl::count;
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use toolyard_core::{CatalogQuery, Page, RawCatalogQuery, TermKind, ToolSort};
use utoipa::ToSchema;

use super::{AppState, now, with_conn};
use crate::config::SiteConfig;
use crate::errors::{ApiError, ApiResult, ErrorResponse};
use crate::models::{Term, Tool};
use crate::schema::{terms, tool_terms, tools};
use crate::store::{
    TermRef, ToolCard, find_term, linked_terms, listable_statuses, terms_by_id, tool_cards,
    tool_ids_for_term, visible_tools,
};

const RELATED_LIMIT: i64 = 3;

/// Taxonomy entry with its visible tool count.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TermSummary {
    /// Term identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// URL slug.
    pub slug: String,
    /// Optional description.
    pub description: Option<String>,
    /// Visible tools linked to the term.
    pub tool_count: i64,
}

/// Taxonomy entry plus one page of its tools.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermPage {
    /// The entry.
    pub term: TermSummary,
    /// Visible tools filtered by the entry.
    pub tools: Page<ToolCard>,
}

/// Public tool detail.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ToolDetail {
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
    /// Longer description.
    pub description: Option<String>,
    /// Logo URL.
    pub logo_url: Option<String>,
    /// Pinned above regular listings.
    pub is_featured: bool,
    /// Detail page views, including this one.
    pub pageviews: i64,
    /// Publication time.
    pub published_at: Option<NaiveDateTime>,
    /// Categories, ordered by name.
    pub categories: Vec<TermRef>,
    /// Tags, ordered by name.
    pub tags: Vec<TermRef>,
    /// Location.
    pub location: Option<TermRef>,
    /// Shop.
    pub shop: Option<TermRef>,
    /// Visible tools sharing a category.
    pub related: Vec<ToolCard>,
}

/// Term filters resolved to ids.
struct ResolvedFilters {
    tool_ids: Option<Vec<String>>,
    location_id: Option<String>,
    shop_id: Option<String>,
}

/// Resolve slug filters; `None` when a location or shop slug matches nothing.
fn resolve_filters(
    conn: &mut PgConnection,
    query: &CatalogQuery,
) -> ApiResult<Option<ResolvedFilters>> {
    let mut tool_ids: Option<Vec<String>> = None;
    for (kind, slug) in [
        (TermKind::Category, query.category.as_deref()),
        (TermKind::Tag, query.tag.as_deref()),
    ] {
        let Some(slug) = slug else {
            continue;
        };
        let linked = tool_ids_for_term(conn, kind, slug)?;
        tool_ids = Some(match tool_ids {
            Some(mut current) => {
                current.retain(|id| linked.contains(id));
                current
            }
            None => linked,
        });
    }
    let mut single = |kind: TermKind, slug: Option<&str>| -> ApiResult<Option<Option<String>>> {
        match slug {
            Some(slug) => Ok(find_term(conn, kind, slug)?.map(|term| Some(term.id))),
            None => Ok(Some(None)),
        }
    };
    let Some(location_id) = single(TermKind::Location, query.location.as_deref())? else {
        return Ok(None);
    };
    let Some(shop_id) = single(TermKind::Shop, query.shop.as_deref())? else {
        return Ok(None);
    };
    Ok(Some(ResolvedFilters {
        tool_ids,
        location_id,
        shop_id,
    }))
}

fn filtered_tools(
    query: &CatalogQuery,
    filters: &ResolvedFilters,
    now: NaiveDateTime,
) -> tools::BoxedQuery<'static, Pg> {
    let mut filtered = visible_tools(now);
    if let Some(pattern) = query.like_pattern() {
        filtered = filtered.filter(
            tools::name
                .ilike(pattern.clone())
                .or(tools::tagline.assume_not_null().ilike(pattern.clone()))
                .or(tools::description.assume_not_null().ilike(pattern)),
        );
    }
    if let Some(ids) = &filters.tool_ids {
        filtered = filtered.filter(tools::id.eq_any(ids.clone()));
    }
    if let Some(location_id) = &filters.location_id {
        filtered = filtered.filter(tools::location_id.eq(location_id.clone()));
    }
    if let Some(shop_id) = &filters.shop_id {
        filtered = filtered.filter(tools::shop_id.eq(shop_id.clone()));
    }
    filtered
}

fn sorted(
    query: tools::BoxedQuery<'static, Pg>,
    sort: ToolSort,
) -> tools::BoxedQuery<'static, Pg> {
    let query = query.order(tools::is_featured.desc());
    let query = match sort {
        ToolSort::Newest => query.then_order_by(tools::published_at.desc()),
        ToolSort::Oldest => query.then_order_by(tools::published_at.asc()),
        ToolSort::Name => query.then_order_by(tools::name.asc()),
        ToolSort::Popular => query.then_order_by(tools::pageviews.desc()),
    };
    query.then_order_by(tools::id.asc())
}

/// One page of visible tools matching `query`, featured first.
pub(crate) fn search_tools(
    conn: &mut PgConnection,
    query: &CatalogQuery,
    now: NaiveDateTime,
) -> ApiResult<Page<ToolCard>> {
    let Some(filters) = resolve_filters(conn, query)? else {
        return Ok(Page::new(Vec::new(), 0, query.page, query.per_page));
    };
    let total: i64 = filtered_tools(query, &filters, now)
        .count()
        .get_result(conn)?;
    let rows: Vec<Tool> = sorted(filtered_tools(query, &filters, now), query.sort)
        .limit(query.per_page)
        .offset(query.offset())
        .load(conn)?;
    let cards = tool_cards(conn, rows)?;
    Ok(Page::new(cards, total, query.page, query.per_page))
}

fn parse_kind(raw: &str) -> ApiResult<TermKind> {
    Ok(raw.parse::<TermKind>()?)
}

/// Visible tool counts per term id.
fn term_counts(
    conn: &mut PgConnection,
    kind: TermKind,
    now: NaiveDateTime,
) -> ApiResult<HashMap<String, i64>> {
    let rows: Vec<(Option<String>, i64)> = match kind {
        TermKind::Category | TermKind::Tag => tool_terms::table
            .inner_join(tools::table)
            .inner_join(terms::table)
            .filter(terms::kind.eq(kind.as_str()))
            .filter(tools::status.eq_any(listable_statuses()))
            .filter(tools::published_at.le(now))
            .group_by(tool_terms::term_id)
            .select((tool_terms::term_id.nullable(), count(tool_terms::tool_id)))
            .load(conn)?,
        TermKind::Location => tools::table
            .filter(tools::status.eq_any(listable_statuses()))
            .filter(tools::published_at.le(now))
            .filter(tools::location_id.is_not_null())
            .group_by(tools::location_id)
            .select((tools::location_id, count(tools::id)))
            .load(conn)?,
        TermKind::Shop => tools::table
            .filter(tools::status.eq_any(listable_statuses()))
            .filter(tools::published_at.le(now))
            .filter(tools::shop_id.is_not_null())
            .group_by(tools::shop_id)
            .select((tools::shop_id, count(tools::id)))
            .load(conn)?,
    };
    Ok(rows
        .into_iter()
        .filter_map(|(id, total)| id.map(|id| (id, total)))
        .collect())
}

fn summarize(term: Term, counts: &HashMap<String, i64>) -> TermSummary {
    TermSummary {
        tool_count: counts.get(&term.id).copied().unwrap_or(0),
        id: term.id,
        name: term.name,
        slug: term.slug,
        description: term.description,
    }
}

fn related_tools(
    conn: &mut PgConnection,
    tool: &Tool,
    category_ids: &[String],
    now: NaiveDateTime,
) -> ApiResult<Vec<ToolCard>> {
    if category_ids.is_empty() {
        return Ok(Vec::new());
    }
    let candidate_ids: Vec<String> = tool_terms::table
        .filter(tool_terms::term_id.eq_any(category_ids))
        .filter(tool_terms::tool_id.ne(&tool.id))
        .select(tool_terms::tool_id)
        .distinct()
        .load(conn)?;
    if candidate_ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows: Vec<Tool> = visible_tools(now)
        .filter(tools::id.eq_any(candidate_ids))
        .order((tools::is_featured.desc(), tools::pageviews.desc(), tools::id.asc()))
        .limit(RELATED_LIMIT)
        .load(conn)?;
    tool_cards(conn, rows)
}

#[utoipa::path(
    get,
    path = "/site",
    responses(
        (status = 200, description = "Site metadata", body = SiteConfig)
    ),
    tag = "catalog"
)]
#[get("/api/site")]
/// Site name, tagline and about text.
pub async fn site(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(&state.site)
}

#[utoipa::path(
    get,
    path = "/tools",
    params(RawCatalogQuery),
    responses(
        (status = 200, description = "Page of visible tools", body = serde_json::Value),
        (status = 400, description = "Invalid query", body = ErrorResponse)
    ),
    tag = "catalog"
)]
#[get("/api/tools")]
/// Search and filter visible tools.
pub async fn list_tools(
    state: web::Data<AppState>,
    raw: web::Query<RawCatalogQuery>,
) -> ApiResult<HttpResponse> {
    let query = CatalogQuery::parse(&raw)?;
    let page = with_conn(&state, move |conn| search_tools(conn, &query, now())).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    get,
    path = "/tools/{slug}",
    params(("slug" = String, Path, description = "Tool slug")),
    responses(
        (status = 200, description = "Tool detail", body = ToolDetail),
        (status = 404, description = "Unknown or hidden tool", body = ErrorResponse)
    ),
    tag = "catalog"
)]
#[get("/api/tools/{slug}")]
/// Visible tool detail; counts a page view.
pub async fn tool_detail(
    state: web::Data<AppState>,
    slug: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let slug = slug.into_inner();
    let detail = with_conn(&state, move |conn| {
        let now = now();
        let tool: Tool = visible_tools(now)
            .filter(tools::slug.eq(slug.clone()))
            .first(conn)
            .optional()?
            .ok_or_else(|| ApiError::not_found("tool", &slug))?;
        let tool: Tool = diesel::update(tools::table.find(&tool.id))
            .set(tools::pageviews.eq(tools::pageviews + 1))
            .get_result(conn)?;
        let ids = [tool.id.clone()];
        let categories = linked_terms(conn, &ids, TermKind::Category)?
            .remove(&tool.id)
            .unwrap_or_default();
        let tags = linked_terms(conn, &ids, TermKind::Tag)?
            .remove(&tool.id)
            .unwrap_or_default();
        let single_ids: Vec<String> = [tool.location_id.clone(), tool.shop_id.clone()]
            .into_iter()
            .flatten()
            .collect();
        let singles = terms_by_id(conn, &single_ids)?;
        let category_ids: Vec<String> = categories.iter().map(|term| term.id.clone()).collect();
        let related = related_tools(conn, &tool, &category_ids, now)?;
        Ok(ToolDetail {
            location: tool.location_id.as_ref().and_then(|id| singles.get(id).cloned()),
            shop: tool.shop_id.as_ref().and_then(|id| singles.get(id).cloned()),
            id: tool.id,
            name: tool.name,
            slug: tool.slug,
            website_url: tool.website_url,
            tagline: tool.tagline,
            description: tool.description,
            logo_url: tool.logo_url,
            is_featured: tool.is_featured,
            pageviews: tool.pageviews,
            published_at: tool.published_at,
            categories,
            tags,
            related,
        })
    })
    .await?;
    Ok(HttpResponse::Ok().json(detail))
}

#[utoipa::path(
    get,
    path = "/{kind}",
    params(("kind" = String, Path, description = "categories, tags, locations or shops")),
    responses(
        (status = 200, description = "Entries with visible tool counts", body = [TermSummary])
    ),
    tag = "catalog"
)]
#[get("/api/{kind:categories|tags|locations|shops}")]
/// Every entry of a taxonomy, ordered by name.
pub async fn list_terms(
    state: web::Data<AppState>,
    kind: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let kind = parse_kind(&kind)?;
    let summaries = with_conn(&state, move |conn| {
        let counts = term_counts(conn, kind, now())?;
        let rows: Vec<Term> = terms::table
            .filter(terms::kind.eq(kind.as_str()))
            .order((terms::name.asc(), terms::id.asc()))
            .select(Term::as_select())
            .load(conn)?;
        Ok(rows
            .into_iter()
            .map(|term| summarize(term, &counts))
            .collect::<Vec<_>>())
    })
    .await?;
    Ok(HttpResponse::Ok().json(summaries))
}

#[utoipa::path(
    get,
    path = "/{kind}/{slug}",
    params(
        ("kind" = String, Path, description = "categories, tags, locations or shops"),
        ("slug" = String, Path, description = "Entry slug"),
        RawCatalogQuery
    ),
    responses(
        (status = 200, description = "Entry and a page of its tools", body = serde_json::Value),
        (status = 404, description = "Unknown entry", body = ErrorResponse)
    ),
    tag = "catalog"
)]
#[get("/api/{kind:categories|tags|locations|shops}/{slug}")]
/// One taxonomy entry and the visible tools filed under it.
pub async fn term_detail(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    raw: web::Query<RawCatalogQuery>,
) -> ApiResult<HttpResponse> {
    let (kind, slug) = path.into_inner();
    let kind = parse_kind(&kind)?;
    let mut query = CatalogQuery::parse(&raw)?;
    let slug = slug.to_ascii_lowercase();
    match kind {
        TermKind::Category => query.category = Some(slug.clone()),
        TermKind::Tag => query.tag = Some(slug.clone()),
        TermKind::Location => query.location = Some(slug.clone()),
        TermKind::Shop => query.shop = Some(slug.clone()),
    }
    let page = with_conn(&state, move |conn| {
        let now = now();
        let term = find_term(conn, kind, &slug)?
            .ok_or_else(|| ApiError::not_found(kind.as_str(), &slug))?;
        let counts = term_counts(conn, kind, now)?;
        let tools = search_tools(conn, &query, now)?;
        Ok(TermPage {
            term: summarize(term, &counts),
            tools,
        })
    })
    .await?;
    Ok(HttpResponse::Ok().json(page))
}
