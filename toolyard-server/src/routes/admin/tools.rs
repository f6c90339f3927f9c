//! Tool management, manual publishing and free queue scheduling.

use std::collections::BTreeSet;

use actix_web::{HttpRequest, HttpResponse, get, post, put, web};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use toolyard_core::listing::schedule_slots;
use toolyard_core::table::{CreatedRange, parse_list};
use toolyard_core::validate::normalize_website;
use toolyard_core::{
    ListingTier, Page, QueuePolicy, RawTableQuery, TableParams, TermKind, ToolStatus,
};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{BulkDeleteRequest, DeleteResponse, optional_text, required_text};
use crate::errors::{ApiError, ApiResult, ErrorResponse};
use crate::models::{Tool, ToolChanges, ToolTerm};
use crate::routes::{AppState, now, require_admin, with_conn};
use crate::schema::{terms, tool_terms, tools};
use crate::store::{SlugScope, TermRef, linked_terms, resolve_slug, sort_by};

const TOOL_SORTS: &[&str] = &["name", "created_at", "published_at", "pageviews"];
const DEFAULT_QUEUE_LIMIT: i64 = 50;

/// Tool fields editable from the back-office.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminToolInput {
    /// Display name.
    pub name: String,
    /// Explicit slug; derived from the name when omitted.
    #[serde(default)]
    pub slug: Option<String>,
    /// Homepage URL.
    pub website_url: String,
    /// Short pitch.
    #[serde(default)]
    pub tagline: Option<String>,
    /// Longer description.
    #[serde(default)]
    pub description: Option<String>,
    /// Logo URL.
    #[serde(default)]
    pub logo_url: Option<String>,
    /// Publication status.
    pub status: ToolStatus,
    /// Listing tier.
    pub tier: ListingTier,
    /// Pinned above regular listings.
    #[serde(default)]
    pub is_featured: bool,
    /// Publication time; defaults to now for listable statuses.
    #[serde(default)]
    pub published_at: Option<NaiveDateTime>,
    /// Linked categories.
    #[serde(default)]
    pub category_ids: Vec<String>,
    /// Linked tags.
    #[serde(default)]
    pub tag_ids: Vec<String>,
    /// Location term.
    #[serde(default)]
    pub location_id: Option<String>,
    /// Shop term.
    #[serde(default)]
    pub shop_id: Option<String>,
}

/// Tool plus its linked categories and tags.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminTool {
    /// Stored tool.
    pub tool: Tool,
    /// Linked categories.
    pub categories: Vec<TermRef>,
    /// Linked tags.
    pub tags: Vec<TermRef>,
}

/// Manual publication request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    /// Publication time; now when omitted. A future time schedules the tool.
    #[serde(default)]
    pub published_at: Option<NaiveDateTime>,
}

/// Free queue scheduling request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ScheduleQueueRequest {
    /// Maximum tools to schedule.
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Tool placed on the publication calendar.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTool {
    /// Tool identifier.
    pub id: String,
    /// URL slug.
    pub slug: String,
    /// Assigned publication time.
    pub published_at: NaiveDateTime,
}

/// Result of a scheduling run.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScheduleQueueResponse {
    /// Newly scheduled tools in queue order.
    pub scheduled: Vec<ScheduledTool>,
}

/// Validated admin input.
struct ToolForm {
    name: String,
    slug: Option<String>,
    website_url: String,
    tagline: Option<String>,
    description: Option<String>,
    logo_url: Option<String>,
    status: ToolStatus,
    tier: ListingTier,
    is_featured: bool,
    published_at: Option<NaiveDateTime>,
    category_ids: Vec<String>,
    tag_ids: Vec<String>,
    location_id: Option<String>,
    shop_id: Option<String>,
}

fn unique_ids(ids: &[String]) -> Vec<String> {
    ids.iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .map(String::from)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

impl ToolForm {
    fn parse(input: &AdminToolInput, now: NaiveDateTime) -> ApiResult<Self> {
        let logo_url = optional_text(input.logo_url.as_deref())
            .map(|url| normalize_website(&url))
            .transpose()?;
        let published_at = input
            .published_at
            .or_else(|| input.status.is_listable().then_some(now));
        Ok(Self {
            name: required_text("name", &input.name)?,
            slug: optional_text(input.slug.as_deref()),
            website_url: normalize_website(&input.website_url)?,
            tagline: optional_text(input.tagline.as_deref()),
            description: optional_text(input.description.as_deref()),
            logo_url,
            status: input.status,
            tier: input.tier,
            is_featured: input.is_featured,
            published_at,
            category_ids: unique_ids(&input.category_ids),
            tag_ids: unique_ids(&input.tag_ids),
            location_id: optional_text(input.location_id.as_deref()),
            shop_id: optional_text(input.shop_id.as_deref()),
        })
    }

    /// Every referenced term must exist and belong to the expected taxonomy.
    fn check_terms(&self, conn: &mut PgConnection) -> ApiResult<()> {
        let single = |id: &Option<String>| id.iter().cloned().collect::<Vec<_>>();
        for (kind, ids) in [
            (TermKind::Category, self.category_ids.clone()),
            (TermKind::Tag, self.tag_ids.clone()),
            (TermKind::Location, single(&self.location_id)),
            (TermKind::Shop, single(&self.shop_id)),
        ] {
            if ids.is_empty() {
                continue;
            }
            let found: i64 = terms::table
                .filter(terms::id.eq_any(&ids))
                .filter(terms::kind.eq(kind.as_str()))
                .count()
                .get_result(conn)?;
            if found != ids.len() as i64 {
                return Err(ApiError::BadRequest(format!(
                    "unknown {} id in {}",
                    kind.as_str(),
                    ids.join(", ")
                )));
            }
        }
        Ok(())
    }

    fn changes(&self, slug: String, now: NaiveDateTime) -> ToolChanges {
        ToolChanges {
            name: self.name.clone(),
            slug,
            website_url: self.website_url.clone(),
            tagline: self.tagline.clone(),
            description: self.description.clone(),
            logo_url: self.logo_url.clone(),
            status: self.status.as_str().to_string(),
            tier: self.tier.as_str().to_string(),
            is_featured: self.is_featured,
            published_at: self.published_at,
            location_id: self.location_id.clone(),
            shop_id: self.shop_id.clone(),
            updated_at: now,
        }
    }

    /// Replace the category and tag links of `tool_id`.
    fn replace_links(&self, conn: &mut PgConnection, tool_id: &str) -> ApiResult<()> {
        diesel::delete(tool_terms::table.filter(tool_terms::tool_id.eq(tool_id))).execute(conn)?;
        let links: Vec<ToolTerm> = self
            .category_ids
            .iter()
            .chain(&self.tag_ids)
            .map(|term_id| ToolTerm {
                tool_id: tool_id.to_string(),
                term_id: term_id.clone(),
            })
            .collect();
        if !links.is_empty() {
            diesel::insert_into(tool_terms::table)
                .values(&links)
                .execute(conn)?;
        }
        Ok(())
    }
}

fn load_admin_tool(conn: &mut PgConnection, tool: Tool) -> ApiResult<AdminTool> {
    let ids = vec![tool.id.clone()];
    let categories = linked_terms(conn, &ids, TermKind::Category)?
        .remove(&tool.id)
        .unwrap_or_default();
    let tags = linked_terms(conn, &ids, TermKind::Tag)?
        .remove(&tool.id)
        .unwrap_or_default();
    Ok(AdminTool {
        tool,
        categories,
        tags,
    })
}

fn find_tool(conn: &mut PgConnection, id: &str) -> ApiResult<Tool> {
    tools::table
        .find(id)
        .first(conn)
        .optional()?
        .ok_or_else(|| ApiError::not_found("tool", id))
}

/// Entity filters of the tools table.
struct ToolFilters {
    statuses: Vec<String>,
    created: CreatedRange,
    query: Option<String>,
}

impl ToolFilters {
    fn parse(raw: &RawTableQuery, params: &TableParams) -> ApiResult<Self> {
        let statuses = raw
            .status
            .as_deref()
            .map(parse_list)
            .unwrap_or_default()
            .iter()
            .map(|value| value.parse::<ToolStatus>().map(|status| status.as_str().to_string()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            statuses,
            created: CreatedRange::parse(raw.from.as_deref(), raw.to.as_deref())?,
            query: params.query.clone(),
        })
    }

    fn apply(&self) -> tools::BoxedQuery<'static, Pg> {
        let mut query = tools::table.into_boxed();
        if !self.statuses.is_empty() {
            query = query.filter(tools::status.eq_any(self.statuses.clone()));
        }
        if let Some(lower) = self.created.lower() {
            query = query.filter(tools::created_at.ge(lower));
        }
        if let Some(upper) = self.created.upper_exclusive() {
            query = query.filter(tools::created_at.lt(upper));
        }
        if let Some(text) = &self.query {
            let pattern = format!("%{}%", toolyard_core::catalog::escape_like(text));
            query = query.filter(
                tools::name
                    .ilike(pattern.clone())
                    .or(tools::website_url.ilike(pattern)),
            );
        }
        query
    }
}

fn sorted(
    query: tools::BoxedQuery<'static, Pg>,
    params: &TableParams,
) -> tools::BoxedQuery<'static, Pg> {
    let query = match &params.sort {
        Some(sort) => match sort.field.as_str() {
            "name" => sort_by(query, tools::name, sort.is_desc()),
            "published_at" => sort_by(query, tools::published_at, sort.is_desc()),
            "pageviews" => sort_by(query, tools::pageviews, sort.is_desc()),
            _ => sort_by(query, tools::created_at, sort.is_desc()),
        },
        None => query.order(tools::created_at.desc()),
    };
    query.then_order_by(tools::id.asc())
}

/// First queue day and the slots already taken on it.
///
/// Scheduling continues on the day of the latest future free slot; with none
/// it starts today, or tomorrow once today's publish hour has passed.
fn queue_start(
    now: NaiveDateTime,
    latest: Option<(NaiveDate, u32)>,
    policy: QueuePolicy,
) -> (NaiveDate, u32) {
    if let Some((day, taken)) = latest {
        return (day, taken);
    }
    let publish_time = NaiveTime::from_hms_opt(policy.publish_hour.min(23), 0, 0)
        .unwrap_or(NaiveTime::MIN);
    let today = now.date();
    if now.time() < publish_time {
        (today, 0)
    } else {
        (today.succ_opt().unwrap_or(today), 0)
    }
}

fn latest_free_slot(conn: &mut PgConnection, now: NaiveDateTime) -> ApiResult<Option<(NaiveDate, u32)>> {
    let latest: Option<NaiveDateTime> = tools::table
        .filter(tools::status.eq(ToolStatus::Scheduled.as_str()))
        .filter(tools::tier.eq(ListingTier::Free.as_str()))
        .filter(tools::published_at.gt(now))
        .select(diesel::dsl::max(tools::published_at))
        .first(conn)?;
    let Some(latest) = latest else {
        return Ok(None);
    };
    let day = latest.date();
    let start = day.and_time(NaiveTime::MIN);
    let end = day.succ_opt().unwrap_or(day).and_time(NaiveTime::MIN);
    let taken: i64 = tools::table
        .filter(tools::tier.eq(ListingTier::Free.as_str()))
        .filter(tools::status.eq(ToolStatus::Scheduled.as_str()))
        .filter(tools::published_at.ge(start))
        .filter(tools::published_at.lt(end))
        .count()
        .get_result(conn)?;
    Ok(Some((day, u32::try_from(taken).unwrap_or(u32::MAX))))
}

#[utoipa::path(
    get,
    operation_id = "admin_list_tools",
    path = "/admin/tools",
    params(RawTableQuery),
    responses(
        (status = 200, description = "Page of tools", body = serde_json::Value),
        (status = 400, description = "Invalid table parameters", body = ErrorResponse),
        (status = 403, description = "Not an admin", body = ErrorResponse)
    ),
    tag = "admin"
)]
#[get("/api/admin/tools")]
/// Tools data table.
pub async fn list_tools(
    state: web::Data<AppState>,
    req: HttpRequest,
    raw: web::Query<RawTableQuery>,
) -> ApiResult<HttpResponse> {
    require_admin(&state, &req).await?;
    let params = TableParams::parse(&raw, TOOL_SORTS)?;
    let filters = ToolFilters::parse(&raw, &params)?;
    let page = with_conn(&state, move |conn| {
        let total: i64 = filters.apply().count().get_result(conn)?;
        let rows: Vec<Tool> = sorted(filters.apply(), &params)
            .limit(params.per_page)
            .offset(params.offset())
            .load(conn)?;
        Ok(Page::new(rows, total, params.page, params.per_page))
    })
    .await?;
    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    post,
    path = "/admin/tools",
    request_body = AdminToolInput,
    responses(
        (status = 201, description = "Tool created", body = AdminTool),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Slug or website taken", body = ErrorResponse)
    ),
    tag = "admin"
)]
#[post("/api/admin/tools")]
/// Create a tool with its term links.
pub async fn create_tool(
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: web::Json<AdminToolInput>,
) -> ApiResult<HttpResponse> {
    let admin = require_admin(&state, &req).await?;
    let created_at = now();
    let form = ToolForm::parse(&payload, created_at)?;
    let created = with_conn(&state, move |conn| {
        conn.transaction(|conn| {
            form.check_terms(conn)?;
            let slug = resolve_slug(conn, SlugScope::Tools, form.slug.as_deref(), &form.name, None)?;
            let changes = form.changes(slug, created_at);
            let tool = Tool {
                id: Uuid::new_v4().to_string(),
                name: changes.name,
                slug: changes.slug,
                website_url: changes.website_url,
                tagline: changes.tagline,
                description: changes.description,
                logo_url: changes.logo_url,
                status: changes.status,
                tier: changes.tier,
                is_featured: changes.is_featured,
                pageviews: 0,
                published_at: changes.published_at,
                submitter_name: None,
                submitter_email: None,
                submitter_note: None,
                location_id: changes.location_id,
                shop_id: changes.shop_id,
                stripe_subscription_id: None,
                created_at,
                updated_at: created_at,
            };
            diesel::insert_into(tools::table)
                .values(&tool)
                .execute(conn)?;
            form.replace_links(conn, &tool.id)?;
            load_admin_tool(conn, tool)
        })
    })
    .await?;
    log::info!(
        "admin {} created tool {}",
        admin.user.github_login,
        created.tool.slug
    );
    Ok(HttpResponse::Created().json(created))
}

#[utoipa::path(
    get,
    path = "/admin/tools/{id}",
    params(("id" = String, Path, description = "Tool id")),
    responses(
        (status = 200, description = "Tool", body = AdminTool),
        (status = 404, description = "Unknown tool", body = ErrorResponse)
    ),
    tag = "admin"
)]
#[get("/api/admin/tools/{id}")]
/// One tool with its links.
pub async fn get_tool(
    state: web::Data<AppState>,
    req: HttpRequest,
    id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    require_admin(&state, &req).await?;
    let id = id.into_inner();
    let tool = with_conn(&state, move |conn| {
        let tool = find_tool(conn, &id)?;
        load_admin_tool(conn, tool)
    })
    .await?;
    Ok(HttpResponse::Ok().json(tool))
}

#[utoipa::path(
    put,
    path = "/admin/tools/{id}",
    params(("id" = String, Path, description = "Tool id")),
    request_body = AdminToolInput,
    responses(
        (status = 200, description = "Tool updated", body = AdminTool),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Unknown tool", body = ErrorResponse),
        (status = 409, description = "Slug or website taken", body = ErrorResponse)
    ),
    tag = "admin"
)]
#[put("/api/admin/tools/{id}")]
/// Replace a tool's fields and term links.
pub async fn update_tool(
    state: web::Data<AppState>,
    req: HttpRequest,
    id: web::Path<String>,
    payload: web::Json<AdminToolInput>,
) -> ApiResult<HttpResponse> {
    let admin = require_admin(&state, &req).await?;
    let id = id.into_inner();
    let updated_at = now();
    let form = ToolForm::parse(&payload, updated_at)?;
    let updated = with_conn(&state, move |conn| {
        conn.transaction(|conn| {
            find_tool(conn, &id)?;
            form.check_terms(conn)?;
            let slug = resolve_slug(conn, SlugScope::Tools, form.slug.as_deref(), &form.name, Some(&id))?;
            let tool: Tool = diesel::update(tools::table.find(&id))
                .set(&form.changes(slug, updated_at))
                .get_result(conn)?;
            form.replace_links(conn, &id)?;
            load_admin_tool(conn, tool)
        })
    })
    .await?;
    log::info!(
        "admin {} updated tool {}",
        admin.user.github_login,
        updated.tool.slug
    );
    Ok(HttpResponse::Ok().json(updated))
}

#[utoipa::path(
    post,
    path = "/admin/tools/delete",
    request_body = BulkDeleteRequest,
    responses(
        (status = 200, description = "Tools deleted", body = DeleteResponse),
        (status = 400, description = "No ids", body = ErrorResponse)
    ),
    tag = "admin"
)]
#[post("/api/admin/tools/delete")]
/// Bulk delete tools.
pub async fn delete_tools(
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: web::Json<BulkDeleteRequest>,
) -> ApiResult<HttpResponse> {
    let admin = require_admin(&state, &req).await?;
    let ids = payload.ids()?;
    let deleted = with_conn(&state, move |conn| {
        Ok(diesel::delete(tools::table.filter(tools::id.eq_any(&ids))).execute(conn)?)
    })
    .await?;
    log::info!("admin {} deleted {deleted} tools", admin.user.github_login);
    Ok(HttpResponse::Ok().json(DeleteResponse { deleted }))
}

#[utoipa::path(
    post,
    path = "/admin/tools/{id}/publish",
    params(("id" = String, Path, description = "Tool id")),
    request_body = PublishRequest,
    responses(
        (status = 200, description = "Tool published or scheduled", body = Tool),
        (status = 404, description = "Unknown tool", body = ErrorResponse)
    ),
    tag = "admin"
)]
#[post("/api/admin/tools/{id}/publish")]
/// Publish a tool now, or schedule it for a future time.
pub async fn publish_tool(
    state: web::Data<AppState>,
    req: HttpRequest,
    id: web::Path<String>,
    payload: web::Json<PublishRequest>,
) -> ApiResult<HttpResponse> {
    let admin = require_admin(&state, &req).await?;
    let id = id.into_inner();
    let current = now();
    let published_at = payload.published_at.unwrap_or(current);
    let status = if published_at <= current {
        ToolStatus::Published
    } else {
        ToolStatus::Scheduled
    };
    let tool = with_conn(&state, move |conn| {
        find_tool(conn, &id)?;
        Ok(diesel::update(tools::table.find(&id))
            .set((
                tools::status.eq(status.as_str()),
                tools::published_at.eq(Some(published_at)),
                tools::updated_at.eq(current),
            ))
            .get_result::<Tool>(conn)?)
    })
    .await?;
    log::info!(
        "admin {} set {} to {} at {}",
        admin.user.github_login,
        tool.slug,
        status.as_str(),
        published_at
    );
    Ok(HttpResponse::Ok().json(tool))
}

#[utoipa::path(
    post,
    path = "/admin/tools/schedule-queue",
    request_body = ScheduleQueueRequest,
    responses(
        (status = 200, description = "Queued tools scheduled", body = ScheduleQueueResponse)
    ),
    tag = "admin"
)]
#[post("/api/admin/tools/schedule-queue")]
/// Put pending free tools on the publication calendar in submission order.
pub async fn schedule_queue(
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: web::Json<ScheduleQueueRequest>,
) -> ApiResult<HttpResponse> {
    let admin = require_admin(&state, &req).await?;
    let limit = payload.limit.unwrap_or(DEFAULT_QUEUE_LIMIT).clamp(1, 500);
    let policy = state.site.queue_policy();
    let current = now();
    let scheduled = with_conn(&state, move |conn| {
        conn.transaction(|conn| {
            let pending: Vec<Tool> = tools::table
                .filter(tools::status.eq(ToolStatus::Pending.as_str()))
                .filter(tools::tier.eq(ListingTier::Free.as_str()))
                .order((tools::created_at.asc(), tools::id.asc()))
                .limit(limit)
                .load(conn)?;
            if pending.is_empty() {
                return Ok(Vec::new());
            }
            let (first_day, taken) = queue_start(current, latest_free_slot(conn, current)?, policy);
            let slots = schedule_slots(pending.len(), first_day, taken, policy);
            let mut scheduled = Vec::with_capacity(pending.len());
            for (tool, published_at) in pending.into_iter().zip(slots) {
                diesel::update(tools::table.find(&tool.id))
                    .set((
                        tools::status.eq(ToolStatus::Scheduled.as_str()),
                        tools::published_at.eq(Some(published_at)),
                        tools::updated_at.eq(current),
                    ))
                    .execute(conn)?;
                scheduled.push(ScheduledTool {
                    id: tool.id,
                    slug: tool.slug,
                    published_at,
                });
            }
            Ok(scheduled)
        })
    })
    .await?;
    log::info!(
        "admin {} scheduled {} queued tools",
        admin.user.github_login,
        scheduled.len()
    );
    Ok(HttpResponse::Ok().json(ScheduleQueueResponse { scheduled }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::catalog::fixtures::{insert_term, insert_tool};
    use crate::routes::configure;
    use crate::routes::test_support::*;
    use actix_web::{App, test};
    use toolyard_core::UserRole;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, day)
            .and_then(|date| date.and_hms_opt(hour, 30, 0))
            .expect("datetime")
    }

    fn input(name: &str, website: &str) -> AdminToolInput {
        AdminToolInput {
            name: name.to_string(),
            slug: None,
            website_url: website.to_string(),
            tagline: Some(" Fast ".to_string()),
            description: None,
            logo_url: None,
            status: ToolStatus::Published,
            tier: ListingTier::Free,
            is_featured: false,
            published_at: None,
            category_ids: Vec::new(),
            tag_ids: Vec::new(),
            location_id: None,
            shop_id: None,
        }
    }

    #[actix_web::test]
    async fn queue_start_respects_publish_hour_and_existing_slots() {
        let policy = QueuePolicy::default();
        assert_eq!(queue_start(at(10, 8), None, policy), (at(10, 0).date(), 0));
        assert_eq!(queue_start(at(10, 9), None, policy), (at(11, 0).date(), 0));
        let latest = Some((at(14, 0).date(), 1));
        assert_eq!(queue_start(at(10, 8), latest, policy), (at(14, 0).date(), 1));
    }

    #[actix_web::test]
    async fn form_defaults_publication_time_for_listable_status() {
        let now = at(10, 8);
        let form = ToolForm::parse(&input("Rocket", "https://Rocket.example/"), now).expect("form");
        assert_eq!(form.published_at, Some(now));
        assert_eq!(form.website_url, "https://rocket.example");
        assert_eq!(form.tagline.as_deref(), Some("Fast"));

        let mut draft = input("Rocket", "https://rocket.example");
        draft.status = ToolStatus::Draft;
        draft.category_ids = vec!["b".to_string(), "a".to_string(), "b".to_string()];
        let form = ToolForm::parse(&draft, now).expect("form");
        assert_eq!(form.published_at, None);
        assert_eq!(form.category_ids, vec!["a".to_string(), "b".to_string()]);

        assert!(ToolForm::parse(&input(" ", "https://rocket.example"), now).is_err());
    }

    #[actix_web::test]
    async fn create_update_and_filter_tools() {
        let Some(test_app) = db_app() else {
            return;
        };
        let admin = seed_session(&test_app.state, "root", UserRole::Admin);
        let (category, tag, location) = {
            let mut conn = test_app.state.pool.get().expect("conn");
            (
                insert_term(&mut conn, TermKind::Category, "editors"),
                insert_term(&mut conn, TermKind::Tag, "rust"),
                insert_term(&mut conn, TermKind::Location, "berlin"),
            )
        };
        let app = test::init_service(
            App::new()
                .app_data(test_app.state.clone())
                .configure(configure),
        )
        .await;

        let mut payload = input("Rocket Docs", "https://rocket.example");
        payload.category_ids = vec![category.id.clone()];
        payload.tag_ids = vec![tag.id.clone()];
        payload.location_id = Some(location.id.clone());
        let req = test::TestRequest::post()
            .uri("/api/admin/tools")
            .insert_header(admin.clone())
            .set_json(&payload)
            .to_request();
        let created: AdminTool = test::call_and_read_body_json(&app, req).await;
        assert_eq!(created.tool.slug, "rocket-docs");
        assert_eq!(created.categories[0].slug, "editors");
        assert_eq!(created.tags[0].slug, "rust");
        assert_eq!(created.tool.location_id.as_deref(), Some(location.id.as_str()));

        let mut wrong_kind = input("Other", "https://other.example");
        wrong_kind.category_ids = vec![tag.id.clone()];
        let req = test::TestRequest::post()
            .uri("/api/admin/tools")
            .insert_header(admin.clone())
            .set_json(&wrong_kind)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);

        let mut update = input("Rocket Docs Pro", "https://rocket.example");
        update.status = ToolStatus::Draft;
        update.tag_ids = vec![tag.id.clone()];
        let req = test::TestRequest::put()
            .uri(&format!("/api/admin/tools/{}", created.tool.id))
            .insert_header(admin.clone())
            .set_json(&update)
            .to_request();
        let updated: AdminTool = test::call_and_read_body_json(&app, req).await;
        assert_eq!(updated.tool.slug, "rocket-docs-pro");
        assert_eq!(updated.tool.name, "Rocket Docs Pro");
        assert!(updated.categories.is_empty());
        assert_eq!(updated.tags.len(), 1);
        assert_eq!(updated.tool.location_id, None);

        {
            let mut conn = test_app.state.pool.get().expect("conn");
            insert_tool(&mut conn, "live", ToolStatus::Published, Some(2));
        }
        let req = test::TestRequest::get()
            .uri("/api/admin/tools?status=draft&sort=name.desc&q=rocket")
            .insert_header(admin.clone())
            .to_request();
        let page: Page<Tool> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(page.total, 1);
        assert_eq!(page.rows[0].id, created.tool.id);

        let req = test::TestRequest::get()
            .uri("/api/admin/tools?sort=color")
            .insert_header(admin.clone())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);

        let req = test::TestRequest::post()
            .uri("/api/admin/tools/delete")
            .insert_header(admin)
            .set_json(BulkDeleteRequest {
                ids: vec![created.tool.id.clone(), "tool-live".to_string()],
            })
            .to_request();
        let deleted: DeleteResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(deleted.deleted, 2);
    }

    #[actix_web::test]
    async fn publish_and_schedule_queue() {
        let Some(test_app) = db_app() else {
            return;
        };
        let admin = seed_session(&test_app.state, "root", UserRole::Admin);
        {
            let mut conn = test_app.state.pool.get().expect("conn");
            insert_tool(&mut conn, "draft", ToolStatus::Draft, None);
            insert_tool(&mut conn, "first", ToolStatus::Pending, None);
            insert_tool(&mut conn, "second", ToolStatus::Pending, None);
        }
        let app = test::init_service(
            App::new()
                .app_data(test_app.state.clone())
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/admin/tools/tool-draft/publish")
            .insert_header(admin.clone())
            .set_json(PublishRequest::default())
            .to_request();
        let published: Tool = test::call_and_read_body_json(&app, req).await;
        assert_eq!(published.status, "published");

        let req = test::TestRequest::post()
            .uri("/api/admin/tools/schedule-queue")
            .insert_header(admin)
            .set_json(ScheduleQueueRequest { limit: Some(10) })
            .to_request();
        let response: ScheduleQueueResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(response.scheduled.len(), 2);
        assert_eq!(response.scheduled[0].slug, "first");
        assert_eq!(response.scheduled[1].slug, "second");
        let first = response.scheduled[0].published_at;
        let second = response.scheduled[1].published_at;
        assert!(first > now());
        assert_eq!(second.date(), first.date().succ_opt().expect("next day"));
        assert_eq!(first.time(), NaiveTime::from_hms_opt(9, 0, 0).expect("time"));
    }
}
