//! Database models for Toolyard server.

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::schema::{ads, auth_sessions, posts, stripe_events, terms, tool_terms, tools, users};

#[derive(Debug, Clone, Queryable, Insertable, Identifiable, Selectable)]
#[diesel(table_name = users)]
/// User account linked to GitHub authentication.
pub struct User {
    /// User identifier.
    pub id: String,
    /// GitHub user id.
    pub github_id: String,
    /// GitHub login handle.
    pub github_login: String,
    /// `user` or `admin`.
    pub role: String,
    /// Creation timestamp.
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Insertable, Identifiable, Associations, Selectable)]
#[diesel(table_name = auth_sessions)]
#[diesel(belongs_to(User, foreign_key = user_id))]
/// Authentication session for a user.
pub struct AuthSession {
    /// Session identifier.
    pub id: String,
    /// Associated user id.
    pub user_id: String,
    /// Toolyard bearer token.
    pub toolyard_token: String,
    /// Encrypted GitHub OAuth token.
    pub github_token: String,
    /// Creation timestamp.
    pub created_at: NaiveDateTime,
    /// Last usage timestamp.
    pub last_used_at: NaiveDateTime,
}

#[derive(
    Debug, Clone, Queryable, Insertable, Identifiable, Selectable, Serialize, Deserialize, ToSchema,
)]
#[diesel(table_name = terms)]
#[serde(rename_all = "camelCase")]
/// Category, tag, location or shop.
pub struct Term {
    /// Term identifier.
    pub id: String,
    /// Taxonomy label (`category`, `tag`, `location`, `shop`).
    pub kind: String,
    /// Display name.
    pub name: String,
    /// URL slug, unique per kind.
    pub slug: String,
    /// Optional description.
    pub description: Option<String>,
    /// Creation timestamp.
    pub created_at: NaiveDateTime,
    /// Last update timestamp.
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = terms)]
#[diesel(treat_none_as_null = true)]
/// Full replacement of a term's editable fields.
pub struct TermChanges {
    /// Display name.
    pub name: String,
    /// URL slug.
    pub slug: String,
    /// Description.
    pub description: Option<String>,
    /// Update timestamp.
    pub updated_at: NaiveDateTime,
}

#[derive(
    Debug, Clone, Queryable, Insertable, Identifiable, Selectable, Serialize, Deserialize, ToSchema,
)]
#[diesel(table_name = tools)]
#[serde(rename_all = "camelCase")]
/// Listed tool.
pub struct Tool {
    /// Tool identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// URL slug.
    pub slug: String,
    /// Normalized homepage URL.
    pub website_url: String,
    /// Short pitch.
    pub tagline: Option<String>,
    /// Longer description.
    pub description: Option<String>,
    /// Logo image URL.
    pub logo_url: Option<String>,
    /// Publication status label.
    pub status: String,
    /// Listing tier label.
    pub tier: String,
    /// Pinned above regular listings.
    pub is_featured: bool,
    /// Detail page views.
    pub pageviews: i64,
    /// Publication time.
    pub published_at: Option<NaiveDateTime>,
    /// Name of the submitter.
    pub submitter_name: Option<String>,
    /// Email of the submitter.
    pub submitter_email: Option<String>,
    /// Note left by the submitter.
    pub submitter_note: Option<String>,
    /// Location term id.
    pub location_id: Option<String>,
    /// Shop term id.
    pub shop_id: Option<String>,
    /// Subscription backing a featured listing.
    pub stripe_subscription_id: Option<String>,
    /// Creation timestamp.
    pub created_at: NaiveDateTime,
    /// Last update timestamp.
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = tools)]
#[diesel(treat_none_as_null = true)]
/// Full replacement of a tool's editable fields.
pub struct ToolChanges {
    /// Display name.
    pub name: String,
    /// URL slug.
    pub slug: String,
    /// Homepage URL.
    pub website_url: String,
    /// Short pitch.
    pub tagline: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Logo URL.
    pub logo_url: Option<String>,
    /// Status label.
    pub status: String,
    /// Tier label.
    pub tier: String,
    /// Featured flag.
    pub is_featured: bool,
    /// Publication time.
    pub published_at: Option<NaiveDateTime>,
    /// Location term id.
    pub location_id: Option<String>,
    /// Shop term id.
    pub shop_id: Option<String>,
    /// Update timestamp.
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Insertable, Selectable)]
#[diesel(table_name = tool_terms)]
/// Link between a tool and a category or tag.
pub struct ToolTerm {
    /// Tool identifier.
    pub tool_id: String,
    /// Term identifier.
    pub term_id: String,
}

#[derive(
    Debug, Clone, Queryable, Insertable, Identifiable, Selectable, Serialize, Deserialize, ToSchema,
)]
#[diesel(table_name = posts)]
#[serde(rename_all = "camelCase")]
/// Blog post.
pub struct Post {
    /// Post identifier.
    pub id: String,
    /// Title.
    pub title: String,
    /// URL slug.
    pub slug: String,
    /// Teaser shown in lists.
    pub excerpt: Option<String>,
    /// Markdown body.
    pub body: String,
    /// Cover image URL.
    pub cover_image_url: Option<String>,
    /// Status label.
    pub status: String,
    /// Publication time.
    pub published_at: Option<NaiveDateTime>,
    /// Creation timestamp.
    pub created_at: NaiveDateTime,
    /// Last update timestamp.
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = posts)]
#[diesel(treat_none_as_null = true)]
/// Full replacement of a post's editable fields.
pub struct PostChanges {
    /// Title.
    pub title: String,
    /// URL slug.
    pub slug: String,
    /// Teaser.
    pub excerpt: Option<String>,
    /// Body.
    pub body: String,
    /// Cover image URL.
    pub cover_image_url: Option<String>,
    /// Status label.
    pub status: String,
    /// Publication time.
    pub published_at: Option<NaiveDateTime>,
    /// Update timestamp.
    pub updated_at: NaiveDateTime,
}

#[derive(
    Debug, Clone, Queryable, Insertable, Identifiable, Selectable, Serialize, Deserialize, ToSchema,
)]
#[diesel(table_name = ads)]
#[serde(rename_all = "camelCase")]
/// Booked ad.
pub struct Ad {
    /// Ad identifier.
    pub id: String,
    /// Spot label.
    pub spot: String,
    /// First day the ad runs.
    pub starts_on: NaiveDate,
    /// Last day the ad runs (inclusive).
    pub ends_on: NaiveDate,
    /// Advertiser name.
    pub name: String,
    /// Advertiser email.
    pub email: String,
    /// Click-through URL.
    pub website_url: String,
    /// Ad copy.
    pub description: Option<String>,
    /// Creative image URL.
    pub image_url: Option<String>,
    /// Amount paid in cents.
    pub price_cents: i64,
    /// Checkout session that paid for the booking.
    pub stripe_session_id: Option<String>,
    /// Creation timestamp.
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = ads)]
#[diesel(treat_none_as_null = true)]
/// Full replacement of an ad's editable fields.
pub struct AdChanges {
    /// Spot label.
    pub spot: String,
    /// First day.
    pub starts_on: NaiveDate,
    /// Last day.
    pub ends_on: NaiveDate,
    /// Advertiser name.
    pub name: String,
    /// Advertiser email.
    pub email: String,
    /// Click-through URL.
    pub website_url: String,
    /// Ad copy.
    pub description: Option<String>,
    /// Creative image URL.
    pub image_url: Option<String>,
    /// Amount in cents.
    pub price_cents: i64,
}

#[derive(Debug, Clone, Queryable, Insertable, Selectable)]
#[diesel(table_name = stripe_events)]
/// Processed payment webhook event.
pub struct StripeEvent {
    /// Provider event id.
    pub id: String,
    /// Event type.
    pub kind: String,
    /// Processing timestamp.
    pub created_at: NaiveDateTime,
}
