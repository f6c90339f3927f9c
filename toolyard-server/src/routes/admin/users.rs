//! Read-only user directory.

use actix_web::{HttpRequest, HttpResponse, get, web};
use chrono::NaiveDateTime;
use diesel::pg::Pg;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use toolyard_core::table::CreatedRange;
use toolyard_core::{Page, RawTableQuery, TableParams};
use utoipa::ToSchema;

use crate::errors::{ApiResult, ErrorResponse};
use crate::models::User;
use crate::routes::{AppState, require_admin, with_conn};
use crate::schema::users;
use crate::store::sort_by;

const USER_SORTS: &[&str] = &["github_login", "created_at"];

/// User row shown in the back-office.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    /// User identifier.
    pub id: String,
    /// GitHub login.
    pub github_login: String,
    /// GitHub user id.
    pub github_id: String,
    /// `user` or `admin`.
    pub role: String,
    /// Creation timestamp.
    pub created_at: NaiveDateTime,
}

impl From<User> for AdminUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            github_login: user.github_login,
            github_id: user.github_id,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

fn filtered(created: CreatedRange, query: Option<&str>) -> users::BoxedQuery<'static, Pg> {
    let mut filtered = users::table.into_boxed();
    if let Some(lower) = created.lower() {
        filtered = filtered.filter(users::created_at.ge(lower));
    }
    if let Some(upper) = created.upper_exclusive() {
        filtered = filtered.filter(users::created_at.lt(upper));
    }
    if let Some(text) = query {
        let pattern = format!("%{}%", toolyard_core::catalog::escape_like(text));
        filtered = filtered.filter(users::github_login.ilike(pattern));
    }
    filtered
}

#[utoipa::path(
    get,
    path = "/admin/users",
    params(RawTableQuery),
    responses(
        (status = 200, description = "Page of users", body = serde_json::Value),
        (status = 400, description = "Invalid table parameters", body = ErrorResponse)
    ),
    tag = "admin"
)]
#[get("/api/admin/users")]
/// Users data table.
pub async fn list_users(
    state: web::Data<AppState>,
    req: HttpRequest,
    raw: web::Query<RawTableQuery>,
) -> ApiResult<HttpResponse> {
    require_admin(&state, &req).await?;
    let params = TableParams::parse(&raw, USER_SORTS)?;
    let created = CreatedRange::parse(raw.from.as_deref(), raw.to.as_deref())?;
    let page = with_conn(&state, move |conn| {
        let query = params.query.as_deref();
        let total: i64 = filtered(created, query).count().get_result(conn)?;
        let ordered = match &params.sort {
            Some(sort) if sort.field == "github_login" => {
                sort_by(filtered(created, query), users::github_login, sort.is_desc())
            }
            Some(sort) => sort_by(filtered(created, query), users::created_at, sort.is_desc()),
            None => filtered(created, query).order(users::created_at.desc()),
        };
        let rows: Vec<User> = ordered
            .then_order_by(users::id.asc())
            .limit(params.per_page)
            .offset(params.offset())
            .load(conn)?;
        Ok(Page::new(rows, total, params.page, params.per_page).map(AdminUser::from))
    })
    .await?;
    Ok(HttpResponse::Ok().json(page))
}
