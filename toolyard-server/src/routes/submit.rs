//! Submission funnel: form, plan choice and listing checkout.

use std::collections::BTreeMap;

use actix_web::{HttpResponse, get, post, web};
use chrono::NaiveDate;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use toolyard_core::listing::{estimate_publish_date, plan_for};
use toolyard_core::{ListingPlan, ListingTier, SubmissionInput, ToolStatus, validate_submission};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{AppState, now, today, with_conn};
use crate::billing::{CheckoutMode, CheckoutRequest, LineItem};
use crate::errors::{ApiError, ApiResult, ErrorResponse};
use crate::models::Tool;
use crate::schema::tools;
use crate::store::{SlugScope, resolve_slug};

/// Created submission.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    /// Tool identifier.
    pub id: String,
    /// Assigned slug, used for the checkout step.
    pub slug: String,
}

/// Tier chosen for a submitted tool.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListingCheckoutRequest {
    /// Chosen tier.
    pub tier: ListingTier,
    /// Where the provider sends the buyer after paying.
    pub success_url: Option<String>,
    /// Where the provider sends the buyer after cancelling.
    pub cancel_url: Option<String>,
}

/// Result of a tier choice: a queue slot or a payment page.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListingCheckoutResponse {
    /// True when the tool joined the free queue.
    pub queued: bool,
    /// 1-based position in the free queue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
    /// Estimated publication date for queued tools.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_publish_date: Option<NaiveDate>,
    /// Hosted payment page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
    /// Checkout session id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// 1-based position of a pending free tool, ordered by submission time.
fn queue_position(conn: &mut PgConnection, tool: &Tool) -> ApiResult<u32> {
    let ahead: i64 = tools::table
        .filter(tools::status.eq(ToolStatus::Pending.as_str()))
        .filter(tools::tier.eq(ListingTier::Free.as_str()))
        .filter(
            tools::created_at
                .lt(tool.created_at)
                .or(tools::created_at.eq(tool.created_at).and(tools::id.le(&tool.id))),
        )
        .count()
        .get_result(conn)?;
    Ok(u32::try_from(ahead.max(1)).unwrap_or(u32::MAX))
}

fn checkout_request(
    state: &AppState,
    plan: &ListingPlan,
    tool: &Tool,
    payload: ListingCheckoutRequest,
) -> CheckoutRequest {
    let mode = match plan.recurring_interval {
        Some(_) => CheckoutMode::Subscription,
        None => CheckoutMode::Payment,
    };
    let mut metadata = BTreeMap::new();
    metadata.insert("kind".to_string(), "listing".to_string());
    metadata.insert("tool_id".to_string(), tool.id.clone());
    metadata.insert("tier".to_string(), plan.tier.as_str().to_string());
    CheckoutRequest {
        mode,
        currency: state.pricing.currency.clone(),
        line_items: vec![LineItem {
            name: format!("{} listing: {}", plan.label, tool.name),
            amount_cents: plan.price_cents,
            quantity: 1,
            recurring_interval: plan.recurring_interval.clone(),
        }],
        success_url: non_empty(payload.success_url).unwrap_or_else(|| {
            state
                .site
                .absolute(&format!("submit/{}/success", tool.slug))
        }),
        cancel_url: non_empty(payload.cancel_url)
            .unwrap_or_else(|| state.site.absolute(&format!("submit/{}", tool.slug))),
        customer_email: tool.submitter_email.clone(),
        metadata,
    }
}

#[utoipa::path(
    get,
    path = "/submit/plans",
    responses(
        (status = 200, description = "Listing plans", body = [ListingPlan])
    ),
    tag = "submit"
)]
#[get("/api/submit/plans")]
/// Listing tiers with prices and benefits.
pub async fn plans(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(&state.plans)
}

#[utoipa::path(
    post,
    path = "/submit",
    request_body = SubmissionInput,
    responses(
        (status = 201, description = "Draft tool created", body = SubmitResponse),
        (status = 400, description = "Invalid submission", body = ErrorResponse),
        (status = 409, description = "Website already listed", body = ErrorResponse)
    ),
    tag = "submit"
)]
#[post("/api/submit")]
/// Submit a tool; it stays a draft until a tier is chosen.
pub async fn submit_tool(
    state: web::Data<AppState>,
    payload: web::Json<SubmissionInput>,
) -> ApiResult<HttpResponse> {
    let input = validate_submission(&payload)?;
    let response = with_conn(&state, move |conn| {
        conn.transaction(|conn| {
            let duplicate: i64 = tools::table
                .filter(tools::website_url.eq(&input.website_url))
                .count()
                .get_result(conn)?;
            if duplicate > 0 {
                return Err(ApiError::Conflict(format!(
                    "{} is already listed",
                    input.website_url
                )));
            }
            let slug = resolve_slug(conn, SlugScope::Tools, None, &input.name, None)?;
            let created_at = now();
            let tool = Tool {
                id: Uuid::new_v4().to_string(),
                name: input.name.clone(),
                slug,
                website_url: input.website_url.clone(),
                tagline: input.tagline.clone(),
                description: input.description.clone(),
                logo_url: None,
                status: ToolStatus::Draft.as_str().to_string(),
                tier: ListingTier::Free.as_str().to_string(),
                is_featured: false,
                pageviews: 0,
                published_at: None,
                submitter_name: Some(input.submitter_name.clone()),
                submitter_email: Some(input.submitter_email.clone()),
                submitter_note: input.submitter_note.clone(),
                location_id: None,
                shop_id: None,
                stripe_subscription_id: None,
                created_at,
                updated_at: created_at,
            };
            diesel::insert_into(tools::table)
                .values(&tool)
                .execute(conn)?;
            log::info!("submission {} received for {}", tool.slug, tool.website_url);
            Ok(SubmitResponse {
                id: tool.id,
                slug: tool.slug,
            })
        })
    })
    .await?;
    Ok(HttpResponse::Created().json(response))
}

#[utoipa::path(
    post,
    path = "/submit/{slug}/checkout",
    params(("slug" = String, Path, description = "Slug returned by the submission")),
    request_body = ListingCheckoutRequest,
    responses(
        (status = 200, description = "Queued or checkout created", body = ListingCheckoutResponse),
        (status = 404, description = "Unknown tool", body = ErrorResponse),
        (status = 409, description = "Tool already listed", body = ErrorResponse),
        (status = 502, description = "Payment provider failed", body = ErrorResponse)
    ),
    tag = "submit"
)]
#[post("/api/submit/{slug}/checkout")]
/// Choose a listing tier: free tools join the queue, paid tiers get a checkout session.
pub async fn listing_checkout(
    state: web::Data<AppState>,
    slug: web::Path<String>,
    payload: web::Json<ListingCheckoutRequest>,
) -> ApiResult<HttpResponse> {
    let slug = slug.into_inner();
    let payload = payload.into_inner();
    let plan = plan_for(&state.plans, payload.tier)
        .cloned()
        .ok_or_else(|| ApiError::BadRequest(format!("{} is not offered", payload.tier.as_str())))?;
    let policy = state.site.queue_policy();
    let tool = with_conn(&state, move |conn| {
        let tool: Tool = tools::table
            .filter(tools::slug.eq(&slug))
            .first(conn)
            .optional()?
            .ok_or_else(|| ApiError::not_found("tool", &slug))?;
        let status = tool.status.parse::<ToolStatus>()?;
        if !matches!(status, ToolStatus::Draft | ToolStatus::Pending) {
            return Err(ApiError::Conflict(format!(
                "{} is already {}",
                tool.slug,
                status.as_str()
            )));
        }
        Ok(tool)
    })
    .await?;

    if !plan.tier.is_paid() {
        let tool_id = tool.id.clone();
        let position = with_conn(&state, move |conn| {
            let tool: Tool = diesel::update(tools::table.find(&tool_id))
                .set((
                    tools::status.eq(ToolStatus::Pending.as_str()),
                    tools::tier.eq(ListingTier::Free.as_str()),
                    tools::updated_at.eq(now()),
                ))
                .get_result(conn)?;
            queue_position(conn, &tool)
        })
        .await?;
        log::info!("{} joined the free queue at position {position}", tool.slug);
        return Ok(HttpResponse::Ok().json(ListingCheckoutResponse {
            queued: true,
            position: Some(position),
            estimated_publish_date: Some(estimate_publish_date(position, today(), policy)),
            ..ListingCheckoutResponse::default()
        }));
    }

    let request = checkout_request(&state, &plan, &tool, payload);
    let payments = state.payments.clone();
    let session = web::block(move || payments.create_checkout(&request)).await??;
    log::info!(
        "listing checkout {} created for {} ({})",
        session.session_id,
        tool.slug,
        plan.tier.as_str()
    );
    Ok(HttpResponse::Ok().json(ListingCheckoutResponse {
        queued: false,
        checkout_url: Some(session.checkout_url),
        session_id: Some(session.session_id),
        ..ListingCheckoutResponse::default()
    }))
}
