//! Advertise page: pricing, availability, quotes and ad checkout.

use std::collections::BTreeMap;

use actix_web::{HttpResponse, get, post, web};
use chrono::{Days, NaiveDate};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use toolyard_core::pricing::{encode_selections, parse_date};
use toolyard_core::validate::{is_plausible_email, normalize_website};
use toolyard_core::{
    AdPricing, AdQuote, AdSelection, AdSpot, Booking, DateRange, ToolyardError, booked_ranges,
    check_selections, next_available,
};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::{AppState, now, today, with_conn};
use crate::billing::{CheckoutMode, CheckoutRequest, CheckoutSession, LineItem};
use crate::errors::{ApiError, ApiResult, ErrorResponse};
use crate::models::Ad;
use crate::schema::ads;
use crate::store::load_bookings;

/// Days of inventory shown on the advertise page.
pub const CALENDAR_DAYS: u64 = 180;
const DEFAULT_AVAILABILITY_DAYS: i64 = 7;
const METADATA_VALUE_MAX: usize = 500;
/// Keeps the encoded `selections` metadata within `METADATA_VALUE_MAX`.
const MAX_SELECTIONS: usize = 15;

/// Booked days and next opening for one spot.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpotCalendar {
    /// Spot.
    pub spot: AdSpot,
    /// Merged blocked ranges inside the calendar window.
    pub booked: Vec<DateRange>,
    /// First free day from today.
    pub next_available: NaiveDate,
}

/// Advertise page payload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdvertiseResponse {
    /// Price list.
    pub pricing: AdPricing,
    /// First day of the calendar window.
    pub from: NaiveDate,
    /// Last day of the calendar window.
    pub until: NaiveDate,
    /// Inventory per spot.
    pub spots: Vec<SpotCalendar>,
}

/// Availability lookup parameters.
#[derive(Debug, Clone, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AvailabilityQuery {
    /// Spot label.
    pub spot: String,
    /// Earliest start (YYYY-MM-DD), defaults to today.
    pub from: Option<String>,
    /// Consecutive days wanted.
    pub days: Option<i64>,
}

/// Availability of one spot.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    /// Spot.
    pub spot: AdSpot,
    /// Requested run length.
    pub days: i64,
    /// Blocked ranges from `from` onwards.
    pub booked: Vec<DateRange>,
    /// Earliest start giving `days` free days.
    pub next_available: NaiveDate,
}

/// Selections to price.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuoteRequest {
    /// Spots and date ranges.
    pub selections: Vec<AdSelection>,
}

/// Ad purchase.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdsCheckoutRequest {
    /// Spots and date ranges.
    pub selections: Vec<AdSelection>,
    /// Advertiser email.
    pub email: String,
    /// Advertiser or product name.
    pub name: String,
    /// Click-through URL.
    pub website_url: String,
    /// Ad copy.
    #[serde(default)]
    pub description: Option<String>,
    /// Creative image URL.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Where the provider sends the buyer after paying.
    #[serde(default)]
    pub success_url: Option<String>,
    /// Where the provider sends the buyer after cancelling.
    #[serde(default)]
    pub cancel_url: Option<String>,
}

/// Active ad query.
#[derive(Debug, Clone, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ActiveAdQuery {
    /// Placement being rendered.
    pub spot: String,
}

/// Public view of a running ad.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActiveAd {
    /// Booked spot.
    pub spot: String,
    /// Advertiser or product name.
    pub name: String,
    /// Click-through URL.
    pub website_url: String,
    /// Ad copy.
    pub description: Option<String>,
    /// Creative image URL.
    pub image_url: Option<String>,
    /// Last day the ad runs.
    pub ends_on: NaiveDate,
}

/// Validated advertiser fields stored on every booked ad.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AdvertiserDetails {
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) website_url: String,
    pub(crate) description: Option<String>,
    pub(crate) image_url: Option<String>,
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(String::from)
}

impl AdvertiserDetails {
    pub(crate) fn parse(
        name: &str,
        email: &str,
        website_url: &str,
        description: Option<&str>,
        image_url: Option<&str>,
    ) -> Result<Self, ToolyardError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ToolyardError::validation("advertiser name is required"));
        }
        let email = email.trim().to_ascii_lowercase();
        if !is_plausible_email(&email) {
            return Err(ToolyardError::validation(format!(
                "invalid email address: {email}"
            )));
        }
        let image_url = trimmed(image_url).map(|url| normalize_website(&url)).transpose()?;
        Ok(Self {
            name: name.to_string(),
            email,
            website_url: normalize_website(website_url)?,
            description: trimmed(description),
            image_url,
        })
    }

    /// Checkout metadata; values are capped at the provider's length limit.
    fn metadata(&self) -> BTreeMap<String, String> {
        let mut metadata = BTreeMap::new();
        let mut put = |key: &str, value: &str| {
            metadata.insert(
                key.to_string(),
                value.chars().take(METADATA_VALUE_MAX).collect(),
            );
        };
        put("name", &self.name);
        put("email", &self.email);
        put("website_url", &self.website_url);
        if let Some(description) = &self.description {
            put("description", description);
        }
        if let Some(image_url) = &self.image_url {
            put("image_url", image_url);
        }
        metadata
    }
}

fn earliest_start(selections: &[AdSelection], fallback: NaiveDate) -> NaiveDate {
    selections
        .iter()
        .map(|selection| selection.start_date)
        .min()
        .unwrap_or(fallback)
        .min(fallback)
}

fn check_selection_count(selections: &[AdSelection]) -> ApiResult<()> {
    if selections.len() > MAX_SELECTIONS {
        return Err(ApiError::BadRequest(format!(
            "select at most {MAX_SELECTIONS} ad spots"
        )));
    }
    Ok(())
}

/// Validate `selections` against stored bookings and price them.
pub(crate) fn quote_available(
    conn: &mut PgConnection,
    pricing: &AdPricing,
    selections: &[AdSelection],
    today: NaiveDate,
    exclude_id: Option<&str>,
) -> ApiResult<AdQuote> {
    let bookings = load_bookings(conn, earliest_start(selections, today), exclude_id)?;
    check_selections(selections, &bookings, today, pricing.max_days)?;
    Ok(pricing.quote(selections)?)
}

/// Lock the ads table, then validate and price `selections`.
///
/// Must run inside a transaction that also inserts the booking. The lock
/// conflicts with itself, so concurrent bookings are checked one at a time
/// while plain reads go on.
pub(crate) fn reserve_available(
    conn: &mut PgConnection,
    pricing: &AdPricing,
    selections: &[AdSelection],
    today: NaiveDate,
    exclude_id: Option<&str>,
) -> ApiResult<AdQuote> {
    diesel::sql_query("LOCK TABLE ads IN SHARE ROW EXCLUSIVE MODE").execute(conn)?;
    quote_available(conn, pricing, selections, today, exclude_id)
}

/// Insert one ad per `(selection, price)` pair.
pub(crate) fn insert_ads(
    conn: &mut PgConnection,
    lines: &[(AdSelection, i64)],
    details: &AdvertiserDetails,
    stripe_session_id: Option<&str>,
) -> ApiResult<Vec<Ad>> {
    let created_at = now();
    let rows: Vec<Ad> = lines
        .iter()
        .map(|(selection, price_cents)| Ad {
            id: Uuid::new_v4().to_string(),
            spot: selection.spot.as_str().to_string(),
            starts_on: selection.start_date,
            ends_on: selection.end_date,
            name: details.name.clone(),
            email: details.email.clone(),
            website_url: details.website_url.clone(),
            description: details.description.clone(),
            image_url: details.image_url.clone(),
            price_cents: *price_cents,
            stripe_session_id: stripe_session_id.map(String::from),
            created_at,
        })
        .collect();
    diesel::insert_into(ads::table)
        .values(&rows)
        .execute(conn)?;
    Ok(rows)
}

fn spot_calendar(spot: AdSpot, bookings: &[Booking], from: NaiveDate, until: NaiveDate) -> SpotCalendar {
    let booked = booked_ranges(spot, bookings)
        .into_iter()
        .filter(|range| range.end >= from && range.start <= until)
        .collect();
    SpotCalendar {
        spot,
        booked,
        next_available: next_available(spot, from, 1, bookings),
    }
}

#[utoipa::path(
    get,
    path = "/advertise",
    responses(
        (status = 200, description = "Pricing and inventory", body = AdvertiseResponse)
    ),
    tag = "ads"
)]
#[get("/api/advertise")]
/// Price list and booked ranges for the next 180 days.
pub async fn advertise(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let from = today();
    let until = from
        .checked_add_days(Days::new(CALENDAR_DAYS - 1))
        .unwrap_or(from);
    let bookings = with_conn(&state, move |conn| load_bookings(conn, from, None)).await?;
    let spots = AdSpot::ALL
        .into_iter()
        .filter(|spot| state.pricing.spot_price(*spot).is_ok())
        .map(|spot| spot_calendar(spot, &bookings, from, until))
        .collect();
    Ok(HttpResponse::Ok().json(AdvertiseResponse {
        pricing: state.pricing.clone(),
        from,
        until,
        spots,
    }))
}

#[utoipa::path(
    get,
    path = "/ads/availability",
    params(AvailabilityQuery),
    responses(
        (status = 200, description = "Availability", body = AvailabilityResponse),
        (status = 400, description = "Invalid query", body = ErrorResponse)
    ),
    tag = "ads"
)]
#[get("/api/ads/availability")]
/// Booked ranges of a spot and the next opening for a run of `days`.
pub async fn availability(
    state: web::Data<AppState>,
    query: web::Query<AvailabilityQuery>,
) -> ApiResult<HttpResponse> {
    let spot = query.spot.parse::<AdSpot>()?;
    let today = today();
    let from = match query.from.as_deref().filter(|raw| !raw.trim().is_empty()) {
        Some(raw) => parse_date(raw)?.max(today),
        None => today,
    };
    let days = query
        .days
        .unwrap_or(DEFAULT_AVAILABILITY_DAYS)
        .clamp(1, state.pricing.max_days);
    let bookings = with_conn(&state, move |conn| load_bookings(conn, from, None)).await?;
    Ok(HttpResponse::Ok().json(AvailabilityResponse {
        spot,
        days,
        booked: booked_ranges(spot, &bookings),
        next_available: next_available(spot, from, days, &bookings),
    }))
}

#[utoipa::path(
    post,
    path = "/ads/quote",
    request_body = QuoteRequest,
    responses(
        (status = 200, description = "Price breakdown", body = AdQuote),
        (status = 400, description = "Invalid selection", body = ErrorResponse),
        (status = 409, description = "Spot already booked", body = ErrorResponse)
    ),
    tag = "ads"
)]
#[post("/api/ads/quote")]
/// Check availability and price a set of selections.
pub async fn quote(
    state: web::Data<AppState>,
    payload: web::Json<QuoteRequest>,
) -> ApiResult<HttpResponse> {
    let selections = payload.into_inner().selections;
    check_selection_count(&selections)?;
    let pricing = state.pricing.clone();
    let priced = with_conn(&state, move |conn| {
        quote_available(conn, &pricing, &selections, today(), None)
    })
    .await?;
    Ok(HttpResponse::Ok().json(priced))
}

#[utoipa::path(
    post,
    path = "/ads/checkout",
    request_body = AdsCheckoutRequest,
    responses(
        (status = 200, description = "Checkout created", body = CheckoutSession),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Spot already booked", body = ErrorResponse),
        (status = 502, description = "Payment provider failed", body = ErrorResponse)
    ),
    tag = "ads"
)]
#[post("/api/ads/checkout")]
/// Start paying for ad selections; bookings are stored once payment completes.
pub async fn ads_checkout(
    state: web::Data<AppState>,
    payload: web::Json<AdsCheckoutRequest>,
) -> ApiResult<HttpResponse> {
    let payload = payload.into_inner();
    let details = AdvertiserDetails::parse(
        &payload.name,
        &payload.email,
        &payload.website_url,
        payload.description.as_deref(),
        payload.image_url.as_deref(),
    )?;
    check_selection_count(&payload.selections)?;
    let selections = payload.selections.clone();
    let pricing = state.pricing.clone();
    let priced = with_conn(&state, move |conn| {
        quote_available(conn, &pricing, &selections, today(), None)
    })
    .await?;

    let mut metadata = details.metadata();
    metadata.insert("kind".to_string(), "ads".to_string());
    metadata.insert(
        "selections".to_string(),
        encode_selections(&payload.selections),
    );
    let request = CheckoutRequest {
        mode: CheckoutMode::Payment,
        currency: priced.currency.clone(),
        line_items: priced
            .lines
            .iter()
            .map(|line| LineItem {
                name: line.name.clone(),
                amount_cents: line.total_cents,
                quantity: 1,
                recurring_interval: None,
            })
            .collect(),
        success_url: trimmed(payload.success_url.as_deref())
            .unwrap_or_else(|| state.site.absolute("advertise/success")),
        cancel_url: trimmed(payload.cancel_url.as_deref())
            .unwrap_or_else(|| state.site.absolute("advertise")),
        customer_email: Some(details.email.clone()),
        metadata,
    };
    let payments = state.payments.clone();
    let session = web::block(move || payments.create_checkout(&request)).await??;
    log::info!(
        "ads checkout {} created for {} ({} cents)",
        session.session_id,
        details.email,
        priced.total_cents
    );
    Ok(HttpResponse::Ok().json(session))
}

#[utoipa::path(
    get,
    path = "/ads/active",
    params(ActiveAdQuery),
    responses(
        (status = 200, description = "Running ad or null", body = Option<ActiveAd>),
        (status = 400, description = "Unknown spot", body = ErrorResponse)
    ),
    tag = "ads"
)]
#[get("/api/ads/active")]
/// The ad running today on a placement, if any.
pub async fn active_ad(
    state: web::Data<AppState>,
    query: web::Query<ActiveAdQuery>,
) -> ApiResult<HttpResponse> {
    let spot = query.spot.parse::<AdSpot>()?;
    let covering: Vec<&'static str> = AdSpot::ALL
        .into_iter()
        .filter(|candidate| candidate.overlaps(&spot))
        .map(|candidate| candidate.as_str())
        .collect();
    let ad = with_conn(&state, move |conn| {
        let today = today();
        Ok(ads::table
            .filter(ads::spot.eq_any(covering))
            .filter(ads::starts_on.le(today))
            .filter(ads::ends_on.ge(today))
            .order((ads::starts_on.asc(), ads::created_at.asc()))
            .first::<Ad>(conn)
            .optional()?)
    })
    .await?;
    Ok(HttpResponse::Ok().json(ad.map(|ad| ActiveAd {
        spot: ad.spot,
        name: ad.name,
        website_url: ad.website_url,
        description: ad.description,
        image_url: ad.image_url,
        ends_on: ad.ends_on,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::configure;
    use crate::routes::test_support::*;
    use actix_web::{App, test};

    fn days_from_today(days: u64) -> NaiveDate {
        today().checked_add_days(Days::new(days)).expect("date")
    }

    fn selection(spot: AdSpot, start: u64, end: u64) -> AdSelection {
        AdSelection {
            spot,
            start_date: days_from_today(start),
            end_date: days_from_today(end),
        }
    }

    fn details() -> AdvertiserDetails {
        AdvertiserDetails::parse(
            "Acme",
            " Ads@Acme.Example ",
            "https://acme.example/",
            Some("  Rockets  "),
            None,
        )
        .expect("details")
    }

    fn checkout_payload(selections: Vec<AdSelection>) -> AdsCheckoutRequest {
        AdsCheckoutRequest {
            selections,
            email: "ads@acme.example".to_string(),
            name: "Acme".to_string(),
            website_url: "https://acme.example".to_string(),
            description: Some("x".repeat(600)),
            image_url: None,
            success_url: None,
            cancel_url: None,
        }
    }

    #[actix_web::test]
    async fn advertiser_details_normalize_and_cap_metadata() {
        let details = details();
        assert_eq!(details.email, "ads@acme.example");
        assert_eq!(details.website_url, "https://acme.example");
        assert_eq!(details.description.as_deref(), Some("Rockets"));
        assert!(AdvertiserDetails::parse(" ", "a@b.co", "https://a.co", None, None).is_err());
        assert!(AdvertiserDetails::parse("A", "nope", "https://a.co", None, None).is_err());

        let long = AdvertiserDetails {
            description: Some("x".repeat(600)),
            ..details
        };
        assert_eq!(long.metadata()["description"].len(), METADATA_VALUE_MAX);
    }

    #[actix_web::test]
    async fn earliest_start_never_exceeds_fallback() {
        let today = today();
        let selections = [selection(AdSpot::Banner, 5, 6), selection(AdSpot::Homepage, 2, 3)];
        assert_eq!(earliest_start(&selections, today), today);
        let past = [AdSelection {
            spot: AdSpot::Banner,
            start_date: today.pred_opt().expect("date"),
            end_date: today,
        }];
        assert_eq!(earliest_start(&past, today), today.pred_opt().expect("date"));
    }

    #[actix_web::test]
    async fn availability_rejects_unknown_spot() {
        let test_app = offline_app();
        let status = call_status(
            &test_app.state,
            test::TestRequest::get().uri("/api/ads/availability?spot=billboard"),
        )
        .await;
        assert_eq!(status, 400);
    }

    #[actix_web::test]
    async fn quote_and_checkout_respect_existing_bookings() {
        let Some(test_app) = db_app() else {
            return;
        };
        {
            let mut conn = test_app.state.pool.get().expect("conn");
            insert_ads(
                &mut conn,
                &[(selection(AdSpot::All, 10, 12), 5000)],
                &details(),
                None,
            )
            .expect("seed ad");
        }
        let app = test::init_service(
            App::new()
                .app_data(test_app.state.clone())
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/ads/quote")
            .set_json(QuoteRequest {
                selections: vec![selection(AdSpot::Banner, 11, 20)],
            })
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 409);

        let wanted = vec![
            selection(AdSpot::Banner, 1, 7),
            selection(AdSpot::Homepage, 1, 1),
        ];
        let req = test::TestRequest::post()
            .uri("/api/ads/quote")
            .set_json(QuoteRequest {
                selections: wanted.clone(),
            })
            .to_request();
        let priced: AdQuote = test::call_and_read_body_json(&app, req).await;
        assert_eq!(priced.lines.len(), 2);
        assert_eq!(priced.lines[0].discount_percent, 5);

        let req = test::TestRequest::post()
            .uri("/api/ads/checkout")
            .set_json(checkout_payload(wanted.clone()))
            .to_request();
        let session: CheckoutSession = test::call_and_read_body_json(&app, req).await;
        assert_eq!(session.session_id, "cs_mock_1");
        let requests = test_app.gateway.requests();
        assert_eq!(requests[0].metadata["kind"], "ads");
        assert_eq!(requests[0].metadata["selections"], encode_selections(&wanted));
        assert_eq!(requests[0].metadata["description"].len(), METADATA_VALUE_MAX);
        let totals: Vec<i64> = requests[0]
            .line_items
            .iter()
            .map(|item| item.amount_cents)
            .collect();
        assert_eq!(
            totals,
            priced.lines.iter().map(|line| line.total_cents).collect::<Vec<_>>()
        );

        let req = test::TestRequest::get()
            .uri("/api/ads/availability?spot=tool_page&days=3")
            .to_request();
        let calendar: AvailabilityResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(calendar.booked.len(), 1);
        assert_eq!(calendar.next_available, today());

        let req = test::TestRequest::get()
            .uri(&format!(
                "/api/ads/availability?spot=banner&days=5&from={}",
                days_from_today(8)
            ))
            .to_request();
        let calendar: AvailabilityResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(calendar.next_available, days_from_today(13));
    }

    #[actix_web::test]
    async fn checkout_caps_selection_count() {
        let test_app = offline_app();
        let app = test::init_service(
            App::new()
                .app_data(test_app.state.clone())
                .configure(configure),
        )
        .await;
        let many: Vec<AdSelection> = (1..=MAX_SELECTIONS as u64 + 1)
            .map(|day| selection(AdSpot::Banner, day, day))
            .collect();
        let req = test::TestRequest::post()
            .uri("/api/ads/checkout")
            .set_json(checkout_payload(many))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);
        assert!(test_app.gateway.requests().is_empty());

        let most: Vec<AdSelection> = (1..=MAX_SELECTIONS as u64)
            .map(|day| selection(AdSpot::Banner, day * 2, day * 2))
            .collect();
        assert!(check_selection_count(&most).is_ok());
        assert!(encode_selections(&most).len() <= METADATA_VALUE_MAX);
    }

    #[actix_web::test]
    async fn concurrent_reservations_wait_for_the_table_lock() {
        let Some(test_app) = db_app() else {
            return;
        };
        let pricing = AdPricing::default();
        let wanted = [selection(AdSpot::Banner, 1, 3)];
        let mut first = test_app.state.pool.get().expect("first conn");
        let mut second = test_app.state.pool.get().expect("second conn");

        first
            .transaction::<_, ApiError, _>(|first| {
                let priced = reserve_available(first, &pricing, &wanted, today(), None)?;
                insert_ads(first, &[(wanted[0], priced.total_cents)], &details(), None)?;
                let blocked = second.transaction::<AdQuote, ApiError, _>(|second| {
                    diesel::sql_query("SET LOCAL lock_timeout = '200ms'").execute(second)?;
                    reserve_available(second, &pricing, &wanted, today(), None)
                });
                match blocked {
                    Err(ApiError::Internal(message)) => assert!(message.contains("lock timeout")),
                    other => panic!("expected lock timeout, got {other:?}"),
                }
                Ok(())
            })
            .expect("first booking");

        let err = second
            .transaction::<AdQuote, ApiError, _>(|second| {
                reserve_available(second, &pricing, &wanted, today(), None)
            })
            .expect_err("already booked");
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[actix_web::test]
    async fn active_ad_serves_bundle_on_every_spot() {
        let Some(test_app) = db_app() else {
            return;
        };
        {
            let mut conn = test_app.state.pool.get().expect("conn");
            insert_ads(
                &mut conn,
                &[(selection(AdSpot::All, 0, 2), 5000)],
                &details(),
                Some("cs_seed"),
            )
            .expect("seed ad");
        }
        let app = test::init_service(
            App::new()
                .app_data(test_app.state.clone())
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::get()
            .uri("/api/ads/active?spot=blog_post")
            .to_request();
        let ad: Option<ActiveAd> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(ad.map(|ad| ad.name).as_deref(), Some("Acme"));

        let req = test::TestRequest::get().uri("/api/advertise").to_request();
        let page: AdvertiseResponse = test::call_and_read_body_json(&app, req).await;
        let banner = page
            .spots
            .iter()
            .find(|entry| entry.spot == AdSpot::Banner)
            .expect("banner");
        assert_eq!(banner.next_available, days_from_today(3));
    }
}
