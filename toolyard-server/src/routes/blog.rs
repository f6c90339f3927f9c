//! Public blog.

use actix_web::{HttpResponse, get, web};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use toolyard_core::Page;
use utoipa::{IntoParams, ToSchema};

use super::{AppState, now, with_conn};
use crate::errors::{ApiError, ApiResult, ErrorResponse};
use crate::models::Post;
use crate::schema::posts;
use crate::store::visible_posts;

const DEFAULT_PER_PAGE: i64 = 10;
const MAX_PER_PAGE: i64 = 50;

/// Paging for the post list.
#[derive(Debug, Clone, Default, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PostListQuery {
    /// 1-based page.
    pub page: Option<i64>,
    /// Posts per page (1-50).
    pub per_page: Option<i64>,
}

/// Post summary without the body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    /// Title.
    pub title: String,
    /// URL slug.
    pub slug: String,
    /// Teaser.
    pub excerpt: Option<String>,
    /// Cover image URL.
    pub cover_image_url: Option<String>,
    /// Publication time.
    pub published_at: Option<NaiveDateTime>,
}

impl From<Post> for PostSummary {
    fn from(post: Post) -> Self {
        Self {
            title: post.title,
            slug: post.slug,
            excerpt: post.excerpt,
            cover_image_url: post.cover_image_url,
            published_at: post.published_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/posts",
    params(PostListQuery),
    responses(
        (status = 200, description = "Page of published posts", body = serde_json::Value)
    ),
    tag = "blog"
)]
#[get("/api/posts")]
/// Published posts, newest first.
pub async fn list_posts(
    state: web::Data<AppState>,
    query: web::Query<PostListQuery>,
) -> ApiResult<HttpResponse> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query
        .per_page
        .unwrap_or(DEFAULT_PER_PAGE)
        .clamp(1, MAX_PER_PAGE);
    let result = with_conn(&state, move |conn| {
        let now = now();
        let total: i64 = visible_posts(now).count().get_result(conn)?;
        let rows: Vec<Post> = visible_posts(now)
            .order((posts::published_at.desc(), posts::id.asc()))
            .limit(per_page)
            .offset((page - 1) * per_page)
            .load(conn)?;
        Ok(Page::new(rows, total, page, per_page).map(PostSummary::from))
    })
    .await?;
    Ok(HttpResponse::Ok().json(result))
}

#[utoipa::path(
    get,
    path = "/posts/{slug}",
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = 200, description = "Published post", body = Post),
        (status = 404, description = "Unknown or unpublished post", body = ErrorResponse)
    ),
    tag = "blog"
)]
#[get("/api/posts/{slug}")]
/// One published post.
pub async fn post_detail(
    state: web::Data<AppState>,
    slug: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let slug = slug.into_inner();
    let post = with_conn(&state, move |conn| {
        visible_posts(now())
            .filter(posts::slug.eq(slug.clone()))
            .first::<Post>(conn)
            .optional()?
            .ok_or_else(|| ApiError::not_found("post", &slug))
    })
    .await?;
    Ok(HttpResponse::Ok().json(post))
}
