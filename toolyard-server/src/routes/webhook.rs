//! Payment provider webhook.

use actix_web::{HttpRequest, HttpResponse, post, web};
use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use toolyard_core::pricing::decode_selections;
use toolyard_core::{AdPricing, ListingTier, settle_tier};
use utoipa::ToSchema;

use super::ads::{AdvertiserDetails, insert_ads, reserve_available};
use super::{AppState, now, today, with_conn};
use crate::billing::WebhookEvent;
use crate::errors::{ApiError, ApiResult, ErrorResponse};
use crate::models::{StripeEvent, Tool};
use crate::schema::{stripe_events, tools};

const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Webhook acknowledgement.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WebhookAck {
    /// Always true once the event is accepted.
    pub received: bool,
    /// True when the event id was already processed.
    pub duplicate: bool,
}

/// Record the event id; false when it was already there.
fn claim_event(conn: &mut PgConnection, event: &WebhookEvent) -> ApiResult<bool> {
    let inserted = diesel::insert_into(stripe_events::table)
        .values(&StripeEvent {
            id: event.id.clone(),
            kind: event.kind.clone(),
            created_at: now(),
        })
        .on_conflict_do_nothing()
        .execute(conn)?;
    Ok(inserted > 0)
}

fn apply_listing(conn: &mut PgConnection, event: &WebhookEvent) -> ApiResult<()> {
    let (Some(tool_id), Some(tier)) = (event.metadata("tool_id"), event.metadata("tier")) else {
        log::warn!("listing checkout {} without tool metadata", event.id);
        return Ok(());
    };
    let tier = tier.parse::<ListingTier>()?;
    let Some(tool) = tools::table.find(tool_id).first::<Tool>(conn).optional()? else {
        log::warn!("listing checkout {} for unknown tool {tool_id}", event.id);
        return Ok(());
    };
    let outcome = settle_tier(tier, now(), tool.published_at);
    let subscription_id = match tier {
        ListingTier::Featured => event.object_str("subscription").map(String::from),
        _ => tool.stripe_subscription_id.clone(),
    };
    diesel::update(tools::table.find(&tool.id))
        .set((
            tools::status.eq(outcome.status.as_str()),
            tools::tier.eq(tier.as_str()),
            tools::published_at.eq(outcome.published_at),
            tools::is_featured.eq(outcome.is_featured),
            tools::stripe_subscription_id.eq(subscription_id),
            tools::updated_at.eq(now()),
        ))
        .execute(conn)?;
    log::info!(
        "{} paid for {} listing, status {}",
        tool.slug,
        tier.as_str(),
        outcome.status.as_str()
    );
    Ok(())
}

fn apply_ads(conn: &mut PgConnection, pricing: &AdPricing, event: &WebhookEvent) -> ApiResult<()> {
    let selections = decode_selections(event.metadata("selections").unwrap_or_default())?;
    let details = AdvertiserDetails::parse(
        event.metadata("name").unwrap_or_default(),
        event.metadata("email").unwrap_or_default(),
        event.metadata("website_url").unwrap_or_default(),
        event.metadata("description"),
        event.metadata("image_url"),
    )?;
    let booking_day = selections
        .iter()
        .map(|selection| selection.start_date)
        .min()
        .unwrap_or_else(today)
        .min(today());
    let quote = match reserve_available(conn, pricing, &selections, booking_day, None) {
        Ok(quote) => quote,
        Err(ApiError::Conflict(message)) => {
            log::warn!(
                "paid ads checkout {} collides with a booking: {message}",
                event.id
            );
            return Ok(());
        }
        Err(err) => return Err(err),
    };
    let lines: Vec<_> = quote
        .lines
        .iter()
        .map(|line| (line.selection, line.total_cents))
        .collect();
    let booked = insert_ads(conn, &lines, &details, event.object_id())?;
    log::info!(
        "booked {} ads for {} from checkout {}",
        booked.len(),
        details.email,
        event.id
    );
    Ok(())
}

fn cancel_subscription(conn: &mut PgConnection, event: &WebhookEvent) -> ApiResult<()> {
    let target = match (event.metadata("tool_id"), event.object_id()) {
        (Some(tool_id), _) => tools::table
            .filter(tools::id.eq(tool_id.to_string()))
            .select(tools::id)
            .first::<String>(conn)
            .optional()?,
        (None, Some(subscription_id)) => tools::table
            .filter(tools::stripe_subscription_id.eq(subscription_id.to_string()))
            .select(tools::id)
            .first::<String>(conn)
            .optional()?,
        (None, None) => None,
    };
    let Some(tool_id) = target else {
        log::warn!("subscription cancellation {} matches no tool", event.id);
        return Ok(());
    };
    diesel::update(tools::table.find(&tool_id))
        .set((
            tools::is_featured.eq(false),
            tools::stripe_subscription_id.eq(None::<String>),
            tools::updated_at.eq(now()),
        ))
        .execute(conn)?;
    log::info!("unfeatured tool {tool_id} after subscription ended");
    Ok(())
}

/// Apply an event inside the transaction that claimed it.
fn dispatch(conn: &mut PgConnection, pricing: &AdPricing, event: &WebhookEvent) -> ApiResult<()> {
    match (event.kind.as_str(), event.metadata("kind")) {
        ("checkout.session.completed", Some("listing")) => apply_listing(conn, event),
        ("checkout.session.completed", Some("ads")) => apply_ads(conn, pricing, event),
        ("customer.subscription.deleted", _) => cancel_subscription(conn, event),
        (kind, _) => {
            log::info!("ignoring webhook {} of type {kind}", event.id);
            Ok(())
        }
    }
}

#[utoipa::path(
    post,
    path = "/stripe/webhook",
    request_body(content = String, description = "Raw event JSON signed by the provider"),
    responses(
        (status = 200, description = "Event accepted", body = WebhookAck),
        (status = 400, description = "Bad signature or payload", body = ErrorResponse)
    ),
    tag = "billing"
)]
#[post("/api/stripe/webhook")]
/// Receive payment events; each event id is applied at most once.
pub async fn stripe_webhook(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
) -> ApiResult<HttpResponse> {
    let header = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("missing signature header".to_string()))?;
    if let Err(err) = state
        .payments
        .verify_webhook(header, &body, Utc::now().timestamp())
    {
        log::warn!("rejected webhook: {err}");
        return Err(ApiError::BadRequest(format!("invalid signature: {err}")));
    }
    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|err| ApiError::BadRequest(format!("invalid event payload: {err}")))?;
    let pricing = state.pricing.clone();
    let event_id = event.id.clone();
    let fresh = with_conn(&state, move |conn| {
        conn.transaction(|conn| {
            if !claim_event(conn, &event)? {
                return Ok(false);
            }
            match dispatch(conn, &pricing, &event) {
                Err(ApiError::BadRequest(message)) => {
                    log::warn!("webhook {} carries unusable data: {message}", event.id);
                    Ok(true)
                }
                other => other.map(|()| true),
            }
        })
    })
    .await?;
    if !fresh {
        log::info!("webhook {event_id} already processed");
    }
    Ok(HttpResponse::Ok().json(WebhookAck {
        received: true,
        duplicate: !fresh,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::sign_payload;
    use crate::models::Ad;
    use crate::routes::catalog::fixtures::insert_tool;
    use crate::routes::configure;
    use crate::routes::test_support::*;
    use crate::schema::ads;
    use actix_web::{App, test};
    use chrono::Days;
    use serde_json::json;
    use toolyard_core::pricing::encode_selections;
    use toolyard_core::{AdSelection, AdSpot, ToolStatus};

    fn signed(payload: &serde_json::Value) -> test::TestRequest {
        let body = serde_json::to_vec(payload).expect("json");
        let header = sign_payload(WEBHOOK_SECRET, &body, Utc::now().timestamp());
        test::TestRequest::post()
            .uri("/api/stripe/webhook")
            .insert_header((SIGNATURE_HEADER, header))
            .set_payload(body)
    }

    fn checkout_event(id: &str, metadata: serde_json::Value) -> serde_json::Value {
        json!({
            "id": id,
            "type": "checkout.session.completed",
            "data": {"object": {"id": format!("cs_{id}"), "subscription": "sub_1", "metadata": metadata}}
        })
    }

    #[actix_web::test]
    async fn rejects_bad_signatures() {
        let test_app = offline_app();
        let status = call_status(
            &test_app.state,
            test::TestRequest::post()
                .uri("/api/stripe/webhook")
                .insert_header((SIGNATURE_HEADER, "t=1,v1=00"))
                .set_payload("{}"),
        )
        .await;
        assert_eq!(status, 400);

        let status = call_status(
            &test_app.state,
            test::TestRequest::post()
                .uri("/api/stripe/webhook")
                .set_payload("{}"),
        )
        .await;
        assert_eq!(status, 400);
    }

    #[actix_web::test]
    async fn listing_checkout_features_tool_once() {
        let Some(test_app) = db_app() else {
            return;
        };
        {
            let mut conn = test_app.state.pool.get().expect("conn");
            insert_tool(&mut conn, "rocket", ToolStatus::Draft, None);
        }
        let app = test::init_service(
            App::new()
                .app_data(test_app.state.clone())
                .configure(configure),
        )
        .await;
        let event = checkout_event(
            "evt_1",
            json!({"kind": "listing", "tool_id": "tool-rocket", "tier": "featured"}),
        );
        let ack: WebhookAck =
            test::call_and_read_body_json(&app, signed(&event).to_request()).await;
        assert!(!ack.duplicate);

        let mut conn = test_app.state.pool.get().expect("conn");
        let tool: Tool = tools::table
            .find("tool-rocket")
            .first(&mut conn)
            .expect("tool");
        assert_eq!(tool.status, "scheduled");
        assert_eq!(tool.tier, "featured");
        assert!(tool.is_featured);
        assert!(tool.published_at.is_some());
        assert_eq!(tool.stripe_subscription_id.as_deref(), Some("sub_1"));

        let ack: WebhookAck =
            test::call_and_read_body_json(&app, signed(&event).to_request()).await;
        assert!(ack.duplicate);

        let cancel = json!({
            "id": "evt_2",
            "type": "customer.subscription.deleted",
            "data": {"object": {"id": "sub_1", "metadata": {}}}
        });
        let ack: WebhookAck =
            test::call_and_read_body_json(&app, signed(&cancel).to_request()).await;
        assert!(!ack.duplicate);
        let tool: Tool = tools::table
            .find("tool-rocket")
            .first(&mut conn)
            .expect("tool");
        assert!(!tool.is_featured);
        assert_eq!(tool.stripe_subscription_id, None);
    }

    #[actix_web::test]
    async fn ads_checkout_books_each_selection_unless_taken() {
        let Some(test_app) = db_app() else {
            return;
        };
        let start = today().checked_add_days(Days::new(3)).expect("date");
        let end = today().checked_add_days(Days::new(9)).expect("date");
        let selections = [
            AdSelection {
                spot: AdSpot::Banner,
                start_date: start,
                end_date: end,
            },
            AdSelection {
                spot: AdSpot::BlogPost,
                start_date: start,
                end_date: start,
            },
        ];
        let metadata = json!({
            "kind": "ads",
            "selections": encode_selections(&selections),
            "name": "Acme",
            "email": "ads@acme.example",
            "website_url": "https://acme.example",
        });
        let app = test::init_service(
            App::new()
                .app_data(test_app.state.clone())
                .configure(configure),
        )
        .await;
        let ack: WebhookAck = test::call_and_read_body_json(
            &app,
            signed(&checkout_event("evt_ads", metadata.clone())).to_request(),
        )
        .await;
        assert!(!ack.duplicate);

        let mut conn = test_app.state.pool.get().expect("conn");
        let booked: Vec<Ad> = ads::table
            .order(ads::spot.asc())
            .load(&mut conn)
            .expect("ads");
        assert_eq!(booked.len(), 2);
        assert_eq!(booked[0].spot, "banner");
        assert_eq!(booked[0].stripe_session_id.as_deref(), Some("cs_evt_ads"));
        let quote = test_app.state.pricing.quote(&selections).expect("quote");
        assert_eq!(booked[0].price_cents, quote.lines[0].total_cents);

        let ack: WebhookAck = test::call_and_read_body_json(
            &app,
            signed(&checkout_event("evt_ads_again", metadata)).to_request(),
        )
        .await;
        assert!(!ack.duplicate);
        let count: i64 = ads::table.count().get_result(&mut conn).expect("count");
        assert_eq!(count, 2);
    }
}
