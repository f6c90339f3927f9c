//! OpenAPI specification for Toolyard server.

use utoipa::OpenApi;

use toolyard_core::{
    AdPricing, AdQuote, AdSelection, AdSpot, DateRange, ListingPlan, ListingTier, PostStatus,
    QuoteLine, SubmissionInput, TermKind, ToolSort, ToolStatus, UserRole,
    pricing::{DiscountTier, SpotPrice},
};

use crate::billing::CheckoutSession;
use crate::config::SiteConfig;
use crate::errors::ErrorResponse;
use crate::models::{Ad, Post, Term, Tool};
use crate::routes::admin::ads::AdminAdInput;
use crate::routes::admin::posts::PostInput;
use crate::routes::admin::stats::AdminStats;
use crate::routes::admin::terms::TermInput;
use crate::routes::admin::tools::{
    AdminTool, AdminToolInput, PublishRequest, ScheduleQueueRequest, ScheduleQueueResponse,
    ScheduledTool,
};
use crate::routes::admin::users::AdminUser;
use crate::routes::admin::{BulkDeleteRequest, DeleteResponse};
use crate::routes::ads::{
    ActiveAd, AdsCheckoutRequest, AdvertiseResponse, AvailabilityResponse, QuoteRequest,
    SpotCalendar,
};
use crate::routes::auth::{
    AuthConfigResponse, AuthGithubRequest, AuthGithubResponse, AuthGithubTokenRequest, AuthUser,
};
use crate::routes::blog::PostSummary;
use crate::routes::catalog::{TermSummary, ToolDetail};
use crate::routes::submit::{ListingCheckoutRequest, ListingCheckoutResponse, SubmitResponse};
use crate::routes::webhook::WebhookAck;
use crate::store::{TermRef, ToolCard};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::auth::auth_config,
        crate::routes::auth::auth_github,
        crate::routes::auth::auth_github_token,
        crate::routes::auth::auth_me,
        crate::routes::auth::auth_refresh,
        crate::routes::catalog::site,
        crate::routes::catalog::list_tools,
        crate::routes::catalog::tool_detail,
        crate::routes::catalog::list_terms,
        crate::routes::catalog::term_detail,
        crate::routes::blog::list_posts,
        crate::routes::blog::post_detail,
        crate::routes::submit::plans,
        crate::routes::submit::submit_tool,
        crate::routes::submit::listing_checkout,
        crate::routes::ads::advertise,
        crate::routes::ads::availability,
        crate::routes::ads::quote,
        crate::routes::ads::ads_checkout,
        crate::routes::ads::active_ad,
        crate::routes::webhook::stripe_webhook,
        crate::routes::admin::stats::stats,
        crate::routes::admin::tools::list_tools,
        crate::routes::admin::tools::create_tool,
        crate::routes::admin::tools::get_tool,
        crate::routes::admin::tools::update_tool,
        crate::routes::admin::tools::delete_tools,
        crate::routes::admin::tools::publish_tool,
        crate::routes::admin::tools::schedule_queue,
        crate::routes::admin::terms::list_terms,
        crate::routes::admin::terms::create_term,
        crate::routes::admin::terms::get_term,
        crate::routes::admin::terms::update_term,
        crate::routes::admin::terms::delete_terms,
        crate::routes::admin::posts::list_posts,
        crate::routes::admin::posts::create_post,
        crate::routes::admin::posts::get_post,
        crate::routes::admin::posts::update_post,
        crate::routes::admin::posts::delete_posts,
        crate::routes::admin::ads::list_ads,
        crate::routes::admin::ads::create_ad,
        crate::routes::admin::ads::get_ad,
        crate::routes::admin::ads::update_ad,
        crate::routes::admin::ads::delete_ads,
        crate::routes::admin::users::list_users,
        crate::routes::openapi_json
    ),
    components(
        schemas(
            AuthConfigResponse,
            AuthGithubRequest,
            AuthGithubResponse,
            AuthGithubTokenRequest,
            AuthUser,
            UserRole,
            SiteConfig,
            ToolStatus,
            ToolSort,
            ListingTier,
            PostStatus,
            TermKind,
            AdSpot,
            Tool,
            Term,
            Post,
            Ad,
            TermRef,
            ToolCard,
            ToolDetail,
            TermSummary,
            PostSummary,
            SubmissionInput,
            SubmitResponse,
            ListingPlan,
            ListingCheckoutRequest,
            ListingCheckoutResponse,
            CheckoutSession,
            AdPricing,
            SpotPrice,
            DiscountTier,
            AdSelection,
            AdQuote,
            QuoteLine,
            DateRange,
            SpotCalendar,
            AdvertiseResponse,
            AvailabilityResponse,
            QuoteRequest,
            AdsCheckoutRequest,
            ActiveAd,
            WebhookAck,
            AdminStats,
            AdminTool,
            AdminToolInput,
            PublishRequest,
            ScheduleQueueRequest,
            ScheduleQueueResponse,
            ScheduledTool,
            TermInput,
            PostInput,
            AdminAdInput,
            AdminUser,
            BulkDeleteRequest,
            DeleteResponse,
            ErrorResponse
        )
    ),
    tags(
        (name = "auth", description = "GitHub sign-in and sessions"),
        (name = "catalog", description = "Public tool directory"),
        (name = "blog", description = "Public blog"),
        (name = "submit", description = "Tool submissions and listing tiers"),
        (name = "ads", description = "Ad pricing, availability and checkout"),
        (name = "billing", description = "Payment webhooks"),
        (name = "admin", description = "Back-office"),
        (name = "system", description = "System endpoints")
    )
)]
/// OpenAPI specification for the Toolyard server.
pub struct ApiDoc;
