//! Dashboard counters.

use std::collections::BTreeMap;

use actix_web::{HttpRequest, HttpResponse, get, web};
use chrono::{Datelike, Months, NaiveDate};
use diesel::dsl::count_star;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use toolyard_core::ToolStatus;
use utoipa::ToSchema;

use crate::errors::{ApiResult, ErrorResponse};
use crate::routes::{AppState, require_admin, today, with_conn};
use crate::schema::{ads, posts, tools};

/// Back-office overview.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    /// Tool counts keyed by status, zero-filled.
    pub tools_by_status: BTreeMap<String, i64>,
    /// Blog posts in any status.
    pub post_count: i64,
    /// Ads running today or later.
    pub upcoming_ads: i64,
    /// Revenue of bookings starting this calendar month, in cents.
    pub month_ad_revenue_cents: i64,
}

/// First day of the month holding `day` and of the following month.
fn month_bounds(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = day.with_day(1).unwrap_or(day);
    let next = first.checked_add_months(Months::new(1)).unwrap_or(first);
    (first, next)
}

#[utoipa::path(
    get,
    path = "/admin/stats",
    responses(
        (status = 200, description = "Overview counters", body = AdminStats),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Not an admin", body = ErrorResponse)
    ),
    tag = "admin"
)]
#[get("/api/admin/stats")]
/// Tool, post and ad counters for the dashboard.
pub async fn stats(state: web::Data<AppState>, req: HttpRequest) -> ApiResult<HttpResponse> {
    require_admin(&state, &req).await?;
    let today = today();
    let (month_start, next_month) = month_bounds(today);
    let summary = with_conn(&state, move |conn| {
        let counted: Vec<(String, i64)> = tools::table
            .group_by(tools::status)
            .select((tools::status, count_star()))
            .load(conn)?;
        let mut tools_by_status: BTreeMap<String, i64> = ToolStatus::ALL
            .into_iter()
            .map(|status| (status.as_str().to_string(), 0))
            .collect();
        for (status, total) in counted {
            tools_by_status.insert(status, total);
        }
        let post_count: i64 = posts::table.count().get_result(conn)?;
        let upcoming_ads: i64 = ads::table
            .filter(ads::ends_on.ge(today))
            .count()
            .get_result(conn)?;
        let prices: Vec<i64> = ads::table
            .filter(ads::starts_on.ge(month_start))
            .filter(ads::starts_on.lt(next_month))
            .select(ads::price_cents)
            .load(conn)?;
        Ok(AdminStats {
            tools_by_status,
            post_count,
            upcoming_ads,
            month_ad_revenue_cents: prices.iter().sum(),
        })
    })
    .await?;
    Ok(HttpResponse::Ok().json(summary))
}
