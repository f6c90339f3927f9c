//! Blog post management.

use actix_web::{HttpRequest, HttpResponse, get, post, put, web};
use chrono::NaiveDateTime;
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use toolyard_core::table::{CreatedRange, parse_list};
use toolyard_core::{Page, PostStatus, RawTableQuery, TableParams};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{BulkDeleteRequest, DeleteResponse, optional_text, required_text};
use crate::errors::{ApiError, ApiResult, ErrorResponse};
use crate::models::{Post, PostChanges};
use crate::routes::{AppState, now, require_admin, with_conn};
use crate::schema::posts;
use crate::store::{SlugScope, resolve_slug, sort_by};

const POST_SORTS: &[&str] = &["title", "created_at", "published_at"];

/// Editable post fields.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostInput {
    /// Title.
    pub title: String,
    /// Explicit slug; derived from the title when omitted.
    #[serde(default)]
    pub slug: Option<String>,
    /// Teaser.
    #[serde(default)]
    pub excerpt: Option<String>,
    /// Markdown body.
    pub body: String,
    /// Cover image URL.
    #[serde(default)]
    pub cover_image_url: Option<String>,
    /// Status.
    pub status: PostStatus,
    /// Publication time; defaults to now when published.
    #[serde(default)]
    pub published_at: Option<NaiveDateTime>,
}

struct PostForm {
    title: String,
    slug: Option<String>,
    excerpt: Option<String>,
    body: String,
    cover_image_url: Option<String>,
    status: PostStatus,
    published_at: Option<NaiveDateTime>,
}

impl PostForm {
    fn parse(input: &PostInput, now: NaiveDateTime) -> ApiResult<Self> {
        let published_at = match input.status {
            PostStatus::Published => Some(input.published_at.unwrap_or(now)),
            PostStatus::Draft => input.published_at,
        };
        Ok(Self {
            title: required_text("title", &input.title)?,
            slug: optional_text(input.slug.as_deref()),
            excerpt: optional_text(input.excerpt.as_deref()),
            body: required_text("body", &input.body)?,
            cover_image_url: optional_text(input.cover_image_url.as_deref()),
            status: input.status,
            published_at,
        })
    }

    fn changes(self, slug: String, now: NaiveDateTime) -> PostChanges {
        PostChanges {
            title: self.title,
            slug,
            excerpt: self.excerpt,
            body: self.body,
            cover_image_url: self.cover_image_url,
            status: self.status.as_str().to_string(),
            published_at: self.published_at,
            updated_at: now,
        }
    }
}

struct PostFilters {
    statuses: Vec<String>,
    created: CreatedRange,
    query: Option<String>,
}

impl PostFilters {
    fn parse(raw: &RawTableQuery, params: &TableParams) -> ApiResult<Self> {
        let mut statuses = Vec::new();
        for value in raw.status.as_deref().map(parse_list).unwrap_or_default() {
            statuses.push(value.parse::<PostStatus>()?.as_str().to_string());
        }
        Ok(Self {
            statuses,
            created: CreatedRange::parse(raw.from.as_deref(), raw.to.as_deref())?,
            query: params.query.clone(),
        })
    }

    fn apply(&self) -> posts::BoxedQuery<'static, Pg> {
        let mut query = posts::table.into_boxed();
        if !self.statuses.is_empty() {
            query = query.filter(posts::status.eq_any(self.statuses.clone()));
        }
        if let Some(lower) = self.created.lower() {
            query = query.filter(posts::created_at.ge(lower));
        }
        if let Some(upper) = self.created.upper_exclusive() {
            query = query.filter(posts::created_at.lt(upper));
        }
        if let Some(text) = &self.query {
            let pattern = format!("%{}%", toolyard_core::catalog::escape_like(text));
            query = query.filter(posts::title.ilike(pattern));
        }
        query
    }
}

fn find_post(conn: &mut PgConnection, id: &str) -> ApiResult<Post> {
    posts::table
        .find(id)
        .first(conn)
        .optional()?
        .ok_or_else(|| ApiError::not_found("post", id))
}

#[utoipa::path(
    get,
    operation_id = "admin_list_posts",
    path = "/admin/posts",
    params(RawTableQuery),
    responses(
        (status = 200, description = "Page of posts", body = serde_json::Value),
        (status = 400, description = "Invalid table parameters", body = ErrorResponse)
    ),
    tag = "admin"
)]
#[get("/api/admin/posts")]
/// Posts data table.
pub async fn list_posts(
    state: web::Data<AppState>,
    req: HttpRequest,
    raw: web::Query<RawTableQuery>,
) -> ApiResult<HttpResponse> {
    require_admin(&state, &req).await?;
    let params = TableParams::parse(&raw, POST_SORTS)?;
    let filters = PostFilters::parse(&raw, &params)?;
    let page = with_conn(&state, move |conn| {
        let total: i64 = filters.apply().count().get_result(conn)?;
        let ordered = match &params.sort {
            Some(sort) => match sort.field.as_str() {
                "title" => sort_by(filters.apply(), posts::title, sort.is_desc()),
                "published_at" => sort_by(filters.apply(), posts::published_at, sort.is_desc()),
                _ => sort_by(filters.apply(), posts::created_at, sort.is_desc()),
            },
            None => filters.apply().order(posts::created_at.desc()),
        };
        let rows: Vec<Post> = ordered
            .then_order_by(posts::id.asc())
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
    path = "/admin/posts",
    request_body = PostInput,
    responses(
        (status = 201, description = "Post created", body = Post),
        (status = 409, description = "Slug taken", body = ErrorResponse)
    ),
    tag = "admin"
)]
#[post("/api/admin/posts")]
/// Create a post.
pub async fn create_post(
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: web::Json<PostInput>,
) -> ApiResult<HttpResponse> {
    require_admin(&state, &req).await?;
    let created_at = now();
    let form = PostForm::parse(&payload, created_at)?;
    let post = with_conn(&state, move |conn| {
        conn.transaction(|conn| {
            let slug = resolve_slug(conn, SlugScope::Posts, form.slug.as_deref(), &form.title, None)?;
            let changes = form.changes(slug, created_at);
            let post = Post {
                id: Uuid::new_v4().to_string(),
                title: changes.title,
                slug: changes.slug,
                excerpt: changes.excerpt,
                body: changes.body,
                cover_image_url: changes.cover_image_url,
                status: changes.status,
                published_at: changes.published_at,
                created_at,
                updated_at: created_at,
            };
            diesel::insert_into(posts::table)
                .values(&post)
                .execute(conn)?;
            Ok(post)
        })
    })
    .await?;
    log::info!("post {} created", post.slug);
    Ok(HttpResponse::Created().json(post))
}

#[utoipa::path(
    get,
    path = "/admin/posts/{id}",
    params(("id" = String, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post", body = Post),
        (status = 404, description = "Unknown post", body = ErrorResponse)
    ),
    tag = "admin"
)]
#[get("/api/admin/posts/{id}")]
/// One post, in any status.
pub async fn get_post(
    state: web::Data<AppState>,
    req: HttpRequest,
    id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    require_admin(&state, &req).await?;
    let id = id.into_inner();
    let post = with_conn(&state, move |conn| find_post(conn, &id)).await?;
    Ok(HttpResponse::Ok().json(post))
}

#[utoipa::path(
    put,
    path = "/admin/posts/{id}",
    params(("id" = String, Path, description = "Post id")),
    request_body = PostInput,
    responses(
        (status = 200, description = "Post updated", body = Post),
        (status = 404, description = "Unknown post", body = ErrorResponse),
        (status = 409, description = "Slug taken", body = ErrorResponse)
    ),
    tag = "admin"
)]
#[put("/api/admin/posts/{id}")]
/// Replace a post's fields.
pub async fn update_post(
    state: web::Data<AppState>,
    req: HttpRequest,
    id: web::Path<String>,
    payload: web::Json<PostInput>,
) -> ApiResult<HttpResponse> {
    require_admin(&state, &req).await?;
    let id = id.into_inner();
    let updated_at = now();
    let form = PostForm::parse(&payload, updated_at)?;
    let post = with_conn(&state, move |conn| {
        conn.transaction(|conn| {
            find_post(conn, &id)?;
            let slug = resolve_slug(
                conn,
                SlugScope::Posts,
                form.slug.as_deref(),
                &form.title,
                Some(&id),
            )?;
            Ok(diesel::update(posts::table.find(&id))
                .set(&form.changes(slug, updated_at))
                .get_result::<Post>(conn)?)
        })
    })
    .await?;
    log::info!("post {} updated", post.slug);
    Ok(HttpResponse::Ok().json(post))
}

#[utoipa::path(
    post,
    path = "/admin/posts/delete",
    request_body = BulkDeleteRequest,
    responses(
        (status = 200, description = "Posts deleted", body = DeleteResponse)
    ),
    tag = "admin"
)]
#[post("/api/admin/posts/delete")]
/// Bulk delete posts.
pub async fn delete_posts(
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: web::Json<BulkDeleteRequest>,
) -> ApiResult<HttpResponse> {
    require_admin(&state, &req).await?;
    let ids = payload.ids()?;
    let deleted = with_conn(&state, move |conn| {
        Ok(diesel::delete(posts::table.filter(posts::id.eq_any(&ids))).execute(conn)?)
    })
    .await?;
    log::info!("deleted {deleted} posts");
    Ok(HttpResponse::Ok().json(DeleteResponse { deleted }))
}
