//! HTTP handlers for Toolyard server.

use actix_web::{HttpRequest, web};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use toolyard_core::{AdPricing, ListingPlan, UserRole};

use crate::billing::Payments;
use crate::config::{AuthConfig, SiteConfig};
use crate::crypto::TokenCipher;
use crate::db::DbPool;
use crate::errors::{ApiError, ApiResult};
use crate::models::{AuthSession, User};
use crate::schema::{auth_sessions, users};

pub mod admin;
pub mod ads;
pub mod auth;
pub mod blog;
pub mod catalog;
pub mod submit;
pub mod webhook;

#[derive(Clone)]
/// Shared application state for handlers.
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// Public site metadata.
    pub site: SiteConfig,
    /// Authentication configuration.
    pub auth: AuthConfig,
    /// Token encryption helper for storing OAuth secrets.
    pub token_cipher: TokenCipher,
    /// Payment gateway.
    pub payments: Payments,
    /// Ad price list.
    pub pricing: AdPricing,
    /// Listing tier catalog.
    pub plans: Vec<ListingPlan>,
}

/// Register every handler on an actix service config.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(auth::auth_config)
        .service(auth::auth_github)
        .service(auth::auth_github_token)
        .service(auth::auth_me)
        .service(auth::auth_refresh)
        .service(catalog::site)
        .service(catalog::list_tools)
        .service(catalog::tool_detail)
        .service(catalog::list_terms)
        .service(catalog::term_detail)
        .service(blog::list_posts)
        .service(blog::post_detail)
        .service(submit::plans)
        .service(submit::submit_tool)
        .service(submit::listing_checkout)
        .service(ads::advertise)
        .service(ads::availability)
        .service(ads::quote)
        .service(ads::ads_checkout)
        .service(ads::active_ad)
        .service(webhook::stripe_webhook)
        .configure(admin::configure)
        .service(openapi_json);
}

/// Current UTC time without offset, as stored in the database.
pub(crate) fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Current UTC date.
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Run blocking database work on the actix thread pool.
pub(crate) async fn with_conn<T, F>(state: &web::Data<AppState>, work: F) -> ApiResult<T>
where
    F: FnOnce(&mut PgConnection) -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    let pool = state.pool.clone();
    web::block(move || {
        let mut conn = pool.get()?;
        work(&mut conn)
    })
    .await?
}

/// Signed-in user and session.
#[derive(Clone)]
pub(crate) struct AuthContext {
    pub(crate) user: User,
    pub(crate) session: AuthSession,
}

impl AuthContext {
    pub(crate) fn is_admin(&self) -> bool {
        self.user.role == UserRole::Admin.as_str()
    }
}

fn extract_bearer_token(req: &HttpRequest) -> ApiResult<String> {
    let header = req
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("missing authorization header".to_string()))?;
    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;
    Ok(token.to_string())
}

/// Resolve the bearer session, touching `last_used_at`.
pub(crate) async fn require_auth(
    state: &web::Data<AppState>,
    req: &HttpRequest,
) -> ApiResult<AuthContext> {
    let token = extract_bearer_token(req)?;
    let context = with_conn(state, move |conn| {
        let found = auth_sessions::table
            .inner_join(users::table)
            .filter(auth_sessions::toolyard_token.eq(&token))
            .select((AuthSession::as_select(), User::as_select()))
            .first::<(AuthSession, User)>(conn)
            .optional()?;
        let Some((session, user)) = found else {
            return Ok(None);
        };
        diesel::update(auth_sessions::table.find(&session.id))
            .set(auth_sessions::last_used_at.eq(now()))
            .execute(conn)?;
        Ok(Some(AuthContext { user, session }))
    })
    .await?;
    context.ok_or_else(|| ApiError::Unauthorized("invalid session".to_string()))
}

/// Like [`require_auth`] but rejects non-admins with 403.
pub(crate) async fn require_admin(
    state: &web::Data<AppState>,
    req: &HttpRequest,
) -> ApiResult<AuthContext> {
    let context = require_auth(state, req).await?;
    if !context.is_admin() {
        return Err(ApiError::Forbidden("admin access required".to_string()));
    }
    Ok(context)
}

#[utoipa::path(
    get,
    path = "/openapi.json",
    responses(
        (status = 200, description = "OpenAPI document", body = serde_json::Value)
    ),
    tag = "system"
)]
#[actix_web::get("/api/openapi.json")]
/// Serve the OpenAPI document.
pub async fn openapi_json() -> impl actix_web::Responder {
    use utoipa::OpenApi;
    actix_web::HttpResponse::Ok().json(crate::openapi::ApiDoc::openapi())
}
