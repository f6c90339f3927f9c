//! Ad bookings: data table, manual bookings and edits.

use actix_web::{HttpRequest, HttpResponse, get, post, put, web};
use chrono::NaiveDate;
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use toolyard_core::table::{CreatedRange, parse_list};
use toolyard_core::{AdSelection, AdSpot, Page, RawTableQuery, TableParams};
use utoipa::ToSchema;

use super::{BulkDeleteRequest, DeleteResponse};
use crate::errors::{ApiError, ApiResult, ErrorResponse};
use crate::models::{Ad, AdChanges};
use crate::routes::ads::{AdvertiserDetails, insert_ads, reserve_available};
use crate::routes::{AppState, require_admin, today, with_conn};
use crate::schema::ads;
use crate::store::sort_by;

const AD_SORTS: &[&str] = &["starts_on", "created_at", "price_cents"];

/// Booking entered from the back-office.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminAdInput {
    /// Spot to book.
    pub spot: AdSpot,
    /// First day.
    pub start_date: NaiveDate,
    /// Last day, inclusive.
    pub end_date: NaiveDate,
    /// Advertiser name.
    pub name: String,
    /// Advertiser email.
    pub email: String,
    /// Click-through URL.
    pub website_url: String,
    /// Ad copy.
    #[serde(default)]
    pub description: Option<String>,
    /// Creative image URL.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Price override in cents; the quoted price when omitted.
    #[serde(default)]
    pub price_cents: Option<i64>,
}

impl AdminAdInput {
    fn selection(&self) -> AdSelection {
        AdSelection {
            spot: self.spot,
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }

    fn details(&self) -> ApiResult<AdvertiserDetails> {
        Ok(AdvertiserDetails::parse(
            &self.name,
            &self.email,
            &self.website_url,
            self.description.as_deref(),
            self.image_url.as_deref(),
        )?)
    }

    fn price_override(&self) -> ApiResult<Option<i64>> {
        match self.price_cents {
            Some(cents) if cents < 0 => Err(ApiError::BadRequest(
                "price cannot be negative".to_string(),
            )),
            other => Ok(other),
        }
    }
}

struct AdFilters {
    spots: Vec<String>,
    created: CreatedRange,
    query: Option<String>,
}

impl AdFilters {
    /// The generic `status` parameter carries the spot filter.
    fn parse(raw: &RawTableQuery, params: &TableParams) -> ApiResult<Self> {
        let mut spots = Vec::new();
        for value in raw.status.as_deref().map(parse_list).unwrap_or_default() {
            spots.push(value.parse::<AdSpot>()?.as_str().to_string());
        }
        Ok(Self {
            spots,
            created: CreatedRange::parse(raw.from.as_deref(), raw.to.as_deref())?,
            query: params.query.clone(),
        })
    }

    fn apply(&self) -> ads::BoxedQuery<'static, Pg> {
        let mut query = ads::table.into_boxed();
        if !self.spots.is_empty() {
            query = query.filter(ads::spot.eq_any(self.spots.clone()));
        }
        if let Some(lower) = self.created.lower() {
            query = query.filter(ads::created_at.ge(lower));
        }
        if let Some(upper) = self.created.upper_exclusive() {
            query = query.filter(ads::created_at.lt(upper));
        }
        if let Some(text) = &self.query {
            let pattern = format!("%{}%", toolyard_core::catalog::escape_like(text));
            query = query.filter(
                ads::name
                    .ilike(pattern.clone())
                    .or(ads::email.ilike(pattern.clone()))
                    .or(ads::website_url.ilike(pattern)),
            );
        }
        query
    }
}

fn find_ad(conn: &mut PgConnection, id: &str) -> ApiResult<Ad> {
    ads::table
        .find(id)
        .first(conn)
        .optional()?
        .ok_or_else(|| ApiError::not_found("ad", id))
}

#[utoipa::path(
    get,
    path = "/admin/ads",
    params(RawTableQuery),
    responses(
        (status = 200, description = "Page of ads", body = serde_json::Value),
        (status = 400, description = "Invalid table parameters", body = ErrorResponse)
    ),
    tag = "admin"
)]
#[get("/api/admin/ads")]
/// Ads data table; `status` filters by spot.
pub async fn list_ads(
    state: web::Data<AppState>,
    req: HttpRequest,
    raw: web::Query<RawTableQuery>,
) -> ApiResult<HttpResponse> {
    require_admin(&state, &req).await?;
    let params = TableParams::parse(&raw, AD_SORTS)?;
    let filters = AdFilters::parse(&raw, &params)?;
    let page = with_conn(&state, move |conn| {
        let total: i64 = filters.apply().count().get_result(conn)?;
        let ordered = match &params.sort {
            Some(sort) => match sort.field.as_str() {
                "created_at" => sort_by(filters.apply(), ads::created_at, sort.is_desc()),
                "price_cents" => sort_by(filters.apply(), ads::price_cents, sort.is_desc()),
                _ => sort_by(filters.apply(), ads::starts_on, sort.is_desc()),
            },
            None => filters.apply().order(ads::starts_on.desc()),
        };
        let rows: Vec<Ad> = ordered
            .then_order_by(ads::id.asc())
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
    path = "/admin/ads",
    request_body = AdminAdInput,
    responses(
        (status = 201, description = "Ad booked", body = Ad),
        (status = 400, description = "Invalid booking", body = ErrorResponse),
        (status = 409, description = "Spot already booked", body = ErrorResponse)
    ),
    tag = "admin"
)]
#[post("/api/admin/ads")]
/// Book an ad manually, bypassing checkout.
pub async fn create_ad(
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: web::Json<AdminAdInput>,
) -> ApiResult<HttpResponse> {
    let admin = require_admin(&state, &req).await?;
    let details = payload.details()?;
    let price_override = payload.price_override()?;
    let selection = payload.selection();
    let pricing = state.pricing.clone();
    let ad = with_conn(&state, move |conn| {
        conn.transaction(|conn| {
            let quote = reserve_available(conn, &pricing, &[selection], today(), None)?;
            let price = price_override.unwrap_or(quote.total_cents);
            let booked = insert_ads(conn, &[(selection, price)], &details, None)?;
            booked
                .into_iter()
                .next()
                .ok_or_else(|| ApiError::Internal("booking was not stored".to_string()))
        })
    })
    .await?;
    log::info!(
        "admin {} booked {} from {} to {} for {}",
        admin.user.github_login,
        ad.spot,
        ad.starts_on,
        ad.ends_on,
        ad.name
    );
    Ok(HttpResponse::Created().json(ad))
}

#[utoipa::path(
    get,
    path = "/admin/ads/{id}",
    params(("id" = String, Path, description = "Ad id")),
    responses(
        (status = 200, description = "Ad", body = Ad),
        (status = 404, description = "Unknown ad", body = ErrorResponse)
    ),
    tag = "admin"
)]
#[get("/api/admin/ads/{id}")]
/// One booking.
pub async fn get_ad(
    state: web::Data<AppState>,
    req: HttpRequest,
    id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    require_admin(&state, &req).await?;
    let id = id.into_inner();
    let ad = with_conn(&state, move |conn| find_ad(conn, &id)).await?;
    Ok(HttpResponse::Ok().json(ad))
}

#[utoipa::path(
    put,
    path = "/admin/ads/{id}",
    params(("id" = String, Path, description = "Ad id")),
    request_body = AdminAdInput,
    responses(
        (status = 200, description = "Ad updated", body = Ad),
        (status = 404, description = "Unknown ad", body = ErrorResponse),
        (status = 409, description = "Spot already booked", body = ErrorResponse)
    ),
    tag = "admin"
)]
#[put("/api/admin/ads/{id}")]
/// Edit a booking; availability is rechecked against every other ad.
pub async fn update_ad(
    state: web::Data<AppState>,
    req: HttpRequest,
    id: web::Path<String>,
    payload: web::Json<AdminAdInput>,
) -> ApiResult<HttpResponse> {
    let admin = require_admin(&state, &req).await?;
    let id = id.into_inner();
    let details = payload.details()?;
    let price_override = payload.price_override()?;
    let selection = payload.selection();
    let pricing = state.pricing.clone();
    let ad = with_conn(&state, move |conn| {
        conn.transaction(|conn| {
            let existing = find_ad(conn, &id)?;
            // A running booking keeps its original start date.
            let reference = today().min(existing.starts_on);
            let quote = reserve_available(conn, &pricing, &[selection], reference, Some(&id))?;
            let changes = AdChanges {
                spot: selection.spot.as_str().to_string(),
                starts_on: selection.start_date,
                ends_on: selection.end_date,
                name: details.name,
                email: details.email,
                website_url: details.website_url,
                description: details.description,
                image_url: details.image_url,
                price_cents: price_override.unwrap_or(quote.total_cents),
            };
            Ok(diesel::update(ads::table.find(&id))
                .set(&changes)
                .get_result::<Ad>(conn)?)
        })
    })
    .await?;
    log::info!("admin {} updated ad {}", admin.user.github_login, ad.id);
    Ok(HttpResponse::Ok().json(ad))
}

#[utoipa::path(
    post,
    path = "/admin/ads/delete",
    request_body = BulkDeleteRequest,
    responses(
        (status = 200, description = "Ads deleted", body = DeleteResponse)
    ),
    tag = "admin"
)]
#[post("/api/admin/ads/delete")]
/// Bulk delete bookings, freeing their dates.
pub async fn delete_ads(
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: web::Json<BulkDeleteRequest>,
) -> ApiResult<HttpResponse> {
    let admin = require_admin(&state, &req).await?;
    let ids = payload.ids()?;
    let deleted = with_conn(&state, move |conn| {
        Ok(diesel::delete(ads::table.filter(ads::id.eq_any(&ids))).execute(conn)?)
    })
    .await?;
    log::info!("admin {} deleted {deleted} ads", admin.user.github_login);
    Ok(HttpResponse::Ok().json(DeleteResponse { deleted }))
}
