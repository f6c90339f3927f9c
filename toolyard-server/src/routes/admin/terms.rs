//! Category, tag, location and shop management.

use actix_web::{HttpRequest, HttpResponse, get, post, put, web};
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use toolyard_core::{Page, RawTableQuery, TableParams, TermKind};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{BulkDeleteRequest, DeleteResponse, optional_text, required_text};
use crate::errors::{ApiError, ApiResult, ErrorResponse};
use crate::models::{Term, TermChanges};
use crate::routes::{AppState, now, require_admin, with_conn};
use crate::schema::terms;
use crate::store::{SlugScope, resolve_slug, sort_by};

const TERM_SORTS: &[&str] = &["name", "created_at"];

/// Editable term fields.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TermInput {
    /// Display name.
    pub name: String,
    /// Explicit slug; derived from the name when omitted.
    #[serde(default)]
    pub slug: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
}

fn parse_kind(raw: &str) -> ApiResult<TermKind> {
    Ok(raw.parse::<TermKind>()?)
}

fn filtered(kind: TermKind, query: Option<&str>) -> terms::BoxedQuery<'static, Pg> {
    let mut filtered = terms::table
        .filter(terms::kind.eq(kind.as_str()))
        .into_boxed();
    if let Some(text) = query {
        let pattern = format!("%{}%", toolyard_core::catalog::escape_like(text));
        filtered = filtered.filter(
            terms::name
                .ilike(pattern.clone())
                .or(terms::slug.ilike(pattern)),
        );
    }
    filtered
}

fn find_term(conn: &mut PgConnection, kind: TermKind, id: &str) -> ApiResult<Term> {
    terms::table
        .find(id)
        .filter(terms::kind.eq(kind.as_str()))
        .first(conn)
        .optional()?
        .ok_or_else(|| ApiError::not_found(kind.as_str(), id))
}

#[utoipa::path(
    get,
    operation_id = "admin_list_terms",
    path = "/admin/terms/{kind}",
    params(
        ("kind" = String, Path, description = "categories, tags, locations or shops"),
        RawTableQuery
    ),
    responses(
        (status = 200, description = "Page of terms", body = serde_json::Value),
        (status = 400, description = "Invalid taxonomy or table parameters", body = ErrorResponse)
    ),
    tag = "admin"
)]
#[get("/api/admin/terms/{kind}")]
/// Terms data table for one taxonomy.
pub async fn list_terms(
    state: web::Data<AppState>,
    req: HttpRequest,
    kind: web::Path<String>,
    raw: web::Query<RawTableQuery>,
) -> ApiResult<HttpResponse> {
    require_admin(&state, &req).await?;
    let kind = parse_kind(&kind)?;
    let params = TableParams::parse(&raw, TERM_SORTS)?;
    let page = with_conn(&state, move |conn| {
        let query = params.query.as_deref();
        let total: i64 = filtered(kind, query).count().get_result(conn)?;
        let ordered = match &params.sort {
            Some(sort) if sort.field == "created_at" => {
                sort_by(filtered(kind, query), terms::created_at, sort.is_desc())
            }
            Some(sort) => sort_by(filtered(kind, query), terms::name, sort.is_desc()),
            None => filtered(kind, query).order(terms::name.asc()),
        };
        let rows: Vec<Term> = ordered
            .then_order_by(terms::id.asc())
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
    path = "/admin/terms/{kind}",
    params(("kind" = String, Path, description = "categories, tags, locations or shops")),
    request_body = TermInput,
    responses(
        (status = 201, description = "Term created", body = Term),
        (status = 409, description = "Slug taken", body = ErrorResponse)
    ),
    tag = "admin"
)]
#[post("/api/admin/terms/{kind}")]
/// Create a term.
pub async fn create_term(
    state: web::Data<AppState>,
    req: HttpRequest,
    kind: web::Path<String>,
    payload: web::Json<TermInput>,
) -> ApiResult<HttpResponse> {
    require_admin(&state, &req).await?;
    let kind = parse_kind(&kind)?;
    let name = required_text("name", &payload.name)?;
    let explicit = optional_text(payload.slug.as_deref());
    let description = optional_text(payload.description.as_deref());
    let term = with_conn(&state, move |conn| {
        conn.transaction(|conn| {
            let slug = resolve_slug(conn, SlugScope::Terms(kind), explicit.as_deref(), &name, None)?;
            let created_at = now();
            let term = Term {
                id: Uuid::new_v4().to_string(),
                kind: kind.as_str().to_string(),
                name,
                slug,
                description,
                created_at,
                updated_at: created_at,
            };
            diesel::insert_into(terms::table)
                .values(&term)
                .execute(conn)?;
            Ok(term)
        })
    })
    .await?;
    log::info!("{} {} created", term.kind, term.slug);
    Ok(HttpResponse::Created().json(term))
}

#[utoipa::path(
    get,
    path = "/admin/terms/{kind}/{id}",
    params(
        ("kind" = String, Path, description = "categories, tags, locations or shops"),
        ("id" = String, Path, description = "Term id")
    ),
    responses(
        (status = 200, description = "Term", body = Term),
        (status = 404, description = "Unknown term", body = ErrorResponse)
    ),
    tag = "admin"
)]
#[get("/api/admin/terms/{kind}/{id}")]
/// One term.
pub async fn get_term(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(String, String)>,
) -> ApiResult<HttpResponse> {
    require_admin(&state, &req).await?;
    let (kind, id) = path.into_inner();
    let kind = parse_kind(&kind)?;
    let term = with_conn(&state, move |conn| find_term(conn, kind, &id)).await?;
    Ok(HttpResponse::Ok().json(term))
}

#[utoipa::path(
    put,
    path = "/admin/terms/{kind}/{id}",
    params(
        ("kind" = String, Path, description = "categories, tags, locations or shops"),
        ("id" = String, Path, description = "Term id")
    ),
    request_body = TermInput,
    responses(
        (status = 200, description = "Term updated", body = Term),
        (status = 404, description = "Unknown term", body = ErrorResponse),
        (status = 409, description = "Slug taken", body = ErrorResponse)
    ),
    tag = "admin"
)]
#[put("/api/admin/terms/{kind}/{id}")]
/// Replace a term's fields.
pub async fn update_term(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(String, String)>,
    payload: web::Json<TermInput>,
) -> ApiResult<HttpResponse> {
    require_admin(&state, &req).await?;
    let (kind, id) = path.into_inner();
    let kind = parse_kind(&kind)?;
    let name = required_text("name", &payload.name)?;
    let explicit = optional_text(payload.slug.as_deref());
    let description = optional_text(payload.description.as_deref());
    let term = with_conn(&state, move |conn| {
        conn.transaction(|conn| {
            find_term(conn, kind, &id)?;
            let slug = resolve_slug(
                conn,
                SlugScope::Terms(kind),
                explicit.as_deref(),
                &name,
                Some(&id),
            )?;
            Ok(diesel::update(terms::table.find(&id))
                .set(&TermChanges {
                    name,
                    slug,
                    description,
                    updated_at: now(),
                })
                .get_result::<Term>(conn)?)
        })
    })
    .await?;
    log::info!("{} {} updated", term.kind, term.slug);
    Ok(HttpResponse::Ok().json(term))
}

#[utoipa::path(
    post,
    path = "/admin/terms/{kind}/delete",
    params(("kind" = String, Path, description = "categories, tags, locations or shops")),
    request_body = BulkDeleteRequest,
    responses(
        (status = 200, description = "Terms deleted", body = DeleteResponse)
    ),
    tag = "admin"
)]
#[post("/api/admin/terms/{kind}/delete")]
/// Bulk delete terms; tool links are removed with them.
pub async fn delete_terms(
    state: web::Data<AppState>,
    req: HttpRequest,
    kind: web::Path<String>,
    payload: web::Json<BulkDeleteRequest>,
) -> ApiResult<HttpResponse> {
    require_admin(&state, &req).await?;
    let kind = parse_kind(&kind)?;
    let ids = payload.ids()?;
    let deleted = with_conn(&state, move |conn| {
        Ok(diesel::delete(
            terms::table
                .filter(terms::kind.eq(kind.as_str()))
                .filter(terms::id.eq_any(&ids)),
        )
        .execute(conn)?)
    })
    .await?;
    log::info!("deleted {deleted} {}", kind.plural());
    Ok(HttpResponse::Ok().json(DeleteResponse { deleted }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::catalog::fixtures::{insert_term, insert_tool, link};
    use crate::routes::configure;
    use crate::routes::test_support::*;
    use crate::models::Tool;
    use crate::schema::{tool_terms, tools};
    use actix_web::{App, test};
    use toolyard_core::{ToolStatus, UserRole};

    fn term_input(name: &str, slug: Option<&str>) -> TermInput {
        TermInput {
            name: name.to_string(),
            slug: slug.map(String::from),
            description: Some("  ".to_string()),
        }
    }

    #[actix_web::test]
    async fn unknown_taxonomy_is_rejected() {
        let Some(test_app) = db_app() else {
            return;
        };
        let admin = seed_session(&test_app.state, "root", UserRole::Admin);
        let status = call_status(
            &test_app.state,
            test::TestRequest::get()
                .uri("/api/admin/terms/colors")
                .insert_header(admin),
        )
        .await;
        assert_eq!(status, 400);
    }

    #[actix_web::test]
    async fn terms_crud_is_scoped_per_taxonomy() {
        let Some(test_app) = db_app() else {
            return;
        };
        let admin = seed_session(&test_app.state, "root", UserRole::Admin);
        let app = test::init_service(
            App::new()
                .app_data(test_app.state.clone())
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/admin/terms/categories")
            .insert_header(admin.clone())
            .set_json(term_input("Code Editors", None))
            .to_request();
        let category: Term = test::call_and_read_body_json(&app, req).await;
        assert_eq!(category.kind, "category");
        assert_eq!(category.slug, "code-editors");
        assert_eq!(category.description, None);

        let req = test::TestRequest::post()
            .uri("/api/admin/terms/tags")
            .insert_header(admin.clone())
            .set_json(term_input("Code Editors", None))
            .to_request();
        let tag: Term = test::call_and_read_body_json(&app, req).await;
        assert_eq!(tag.slug, "code-editors");

        let req = test::TestRequest::post()
            .uri("/api/admin/terms/categories")
            .insert_header(admin.clone())
            .set_json(term_input("Sales", Some("Sales Tools")))
            .to_request();
        let sales: Term = test::call_and_read_body_json(&app, req).await;
        assert_eq!(sales.slug, "sales-tools");

        let req = test::TestRequest::post()
            .uri("/api/admin/terms/categories")
            .insert_header(admin.clone())
            .set_json(term_input("Sales Desk", Some("Sales Tools")))
            .to_request();
        let desk: Term = test::call_and_read_body_json(&app, req).await;
        assert_eq!(desk.slug, "sales-tools-2");

        let req = test::TestRequest::put()
            .uri(&format!("/api/admin/terms/categories/{}", desk.id))
            .insert_header(admin.clone())
            .set_json(term_input("Sales Desk", Some("sales-tools-2")))
            .to_request();
        let kept: Term = test::call_and_read_body_json(&app, req).await;
        assert_eq!(kept.slug, "sales-tools-2");

        let req = test::TestRequest::get()
            .uri(&format!("/api/admin/terms/tags/{}", category.id))
            .insert_header(admin.clone())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 404);

        let req = test::TestRequest::put()
            .uri(&format!("/api/admin/terms/categories/{}", category.id))
            .insert_header(admin.clone())
            .set_json(term_input("Editors", None))
            .to_request();
        let renamed: Term = test::call_and_read_body_json(&app, req).await;
        assert_eq!(renamed.name, "Editors");
        assert_eq!(renamed.slug, "editors");

        let req = test::TestRequest::get()
            .uri("/api/admin/terms/categories?q=edit&sort=created_at.desc")
            .insert_header(admin.clone())
            .to_request();
        let page: Page<Term> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(page.total, 1);
        assert_eq!(page.rows[0].id, category.id);
    }

    #[actix_web::test]
    async fn deleting_terms_unlinks_tools() {
        let Some(test_app) = db_app() else {
            return;
        };
        let admin = seed_session(&test_app.state, "root", UserRole::Admin);
        let tool = {
            let mut conn = test_app.state.pool.get().expect("conn");
            let tool = insert_tool(&mut conn, "rocket", ToolStatus::Published, Some(1));
            let category = insert_term(&mut conn, TermKind::Category, "editors");
            let location = insert_term(&mut conn, TermKind::Location, "berlin");
            link(&mut conn, &tool, &category);
            diesel::update(tools::table.find(&tool.id))
                .set(tools::location_id.eq(Some(location.id.clone())))
                .execute(&mut conn)
                .expect("set location");
            tool
        };
        let app = test::init_service(
            App::new()
                .app_data(test_app.state.clone())
                .configure(configure),
        )
        .await;
        for (kind, id) in [("categories", "category-editors"), ("locations", "location-berlin")] {
            let req = test::TestRequest::post()
                .uri(&format!("/api/admin/terms/{kind}/delete"))
                .insert_header(admin.clone())
                .set_json(BulkDeleteRequest {
                    ids: vec![id.to_string()],
                })
                .to_request();
            let deleted: DeleteResponse = test::call_and_read_body_json(&app, req).await;
            assert_eq!(deleted.deleted, 1);
        }

        let mut conn = test_app.state.pool.get().expect("conn");
        let links: i64 = tool_terms::table
            .filter(tool_terms::tool_id.eq(&tool.id))
            .count()
            .get_result(&mut conn)
            .expect("count");
        assert_eq!(links, 0);
        let stored: Tool = tools::table.find(&tool.id).first(&mut conn).expect("tool");
        assert_eq!(stored.location_id, None);
    }
}
