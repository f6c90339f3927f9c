//! Domain enums shared by the server and the CLI.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{Result, ToolyardError};

/// Publication state of a listed tool.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    /// Submitted but not yet queued or paid for.
    Draft,
    /// Waiting in the free listing queue.
    Pending,
    /// Has a publication date, possibly in the future.
    Scheduled,
    /// Live in the directory.
    Published,
}

impl ToolStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [ToolStatus; 4] = [
        ToolStatus::Draft,
        ToolStatus::Pending,
        ToolStatus::Scheduled,
        ToolStatus::Published,
    ];

    /// Stable storage label.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolStatus::Draft => "draft",
            ToolStatus::Pending => "pending",
            ToolStatus::Scheduled => "scheduled",
            ToolStatus::Published => "published",
        }
    }

    /// Statuses that can show up in the public directory once `published_at` passes.
    pub fn is_listable(&self) -> bool {
        matches!(self, ToolStatus::Scheduled | ToolStatus::Published)
    }
}

impl FromStr for ToolStatus {
    type Err = ToolyardError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim() {
            "draft" => Ok(ToolStatus::Draft),
            "pending" => Ok(ToolStatus::Pending),
            "scheduled" => Ok(ToolStatus::Scheduled),
            "published" => Ok(ToolStatus::Published),
            other => Err(ToolyardError::validation(format!(
                "unknown tool status: {other}"
            ))),
        }
    }
}

/// Returns true when a tool with this status and date is publicly visible at `now`.
pub fn is_tool_visible(
    status: ToolStatus,
    published_at: Option<NaiveDateTime>,
    now: NaiveDateTime,
) -> bool {
    status.is_listable() && published_at.is_some_and(|at| at <= now)
}

/// Paid product controlling how fast and how prominently a tool is listed.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ListingTier {
    /// Free listing, published in queue order.
    Free,
    /// One-time payment to skip the queue.
    Expedited,
    /// Recurring payment to skip the queue and pin the tool to the top.
    Featured,
}

impl ListingTier {
    /// Stable storage label.
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingTier::Free => "free",
            ListingTier::Expedited => "expedited",
            ListingTier::Featured => "featured",
        }
    }

    /// Whether checkout goes through the payment provider.
    pub fn is_paid(&self) -> bool {
        !matches!(self, ListingTier::Free)
    }
}

impl FromStr for ListingTier {
    type Err = ToolyardError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim() {
            "free" => Ok(ListingTier::Free),
            "expedited" => Ok(ListingTier::Expedited),
            "featured" => Ok(ListingTier::Featured),
            other => Err(ToolyardError::validation(format!(
                "unknown listing tier: {other}"
            ))),
        }
    }
}

/// Publication state of a blog post.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    /// Work in progress.
    Draft,
    /// Visible once `published_at` passes.
    Published,
}

impl PostStatus {
    /// Stable storage label.
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }
}

impl FromStr for PostStatus {
    type Err = ToolyardError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim() {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            other => Err(ToolyardError::validation(format!(
                "unknown post status: {other}"
            ))),
        }
    }
}

/// Purchasable ad placement.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AdSpot {
    /// Site-wide banner above the header.
    Banner,
    /// Card on the homepage tool grid.
    Homepage,
    /// Sidebar on individual tool pages.
    ToolPage,
    /// Sidebar on blog posts.
    BlogPost,
    /// Bundle occupying every placement.
    All,
}

impl AdSpot {
    /// Every spot, bundle last.
    pub const ALL: [AdSpot; 5] = [
        AdSpot::Banner,
        AdSpot::Homepage,
        AdSpot::ToolPage,
        AdSpot::BlogPost,
        AdSpot::All,
    ];

    /// Stable storage label.
    pub fn as_str(&self) -> &'static str {
        match self {
            AdSpot::Banner => "banner",
            AdSpot::Homepage => "homepage",
            AdSpot::ToolPage => "tool_page",
            AdSpot::BlogPost => "blog_post",
            AdSpot::All => "all",
        }
    }

    /// Concrete placements occupied by this spot.
    pub fn placements(&self) -> &'static [AdSpot] {
        match self {
            AdSpot::Banner => &[AdSpot::Banner],
            AdSpot::Homepage => &[AdSpot::Homepage],
            AdSpot::ToolPage => &[AdSpot::ToolPage],
            AdSpot::BlogPost => &[AdSpot::BlogPost],
            AdSpot::All => &[
                AdSpot::Banner,
                AdSpot::Homepage,
                AdSpot::ToolPage,
                AdSpot::BlogPost,
            ],
        }
    }

    /// Two spots overlap when they share at least one placement.
    pub fn overlaps(&self, other: &AdSpot) -> bool {
        self.placements()
            .iter()
            .any(|placement| other.placements().contains(placement))
    }
}

impl fmt::Display for AdSpot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdSpot {
    type Err = ToolyardError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim() {
            "banner" => Ok(AdSpot::Banner),
            "homepage" => Ok(AdSpot::Homepage),
            "tool_page" => Ok(AdSpot::ToolPage),
            "blog_post" => Ok(AdSpot::BlogPost),
            "all" => Ok(AdSpot::All),
            other => Err(ToolyardError::validation(format!(
                "unknown ad spot: {other}"
            ))),
        }
    }
}

/// Taxonomy a term belongs to.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TermKind {
    /// Tool category; a tool may have many.
    Category,
    /// Free-form tag; a tool may have many.
    Tag,
    /// Geographic location; at most one per tool.
    Location,
    /// Shop or vendor; at most one per tool.
    Shop,
}

impl TermKind {
    /// Every taxonomy.
    pub const ALL: [TermKind; 4] = [
        TermKind::Category,
        TermKind::Tag,
        TermKind::Location,
        TermKind::Shop,
    ];

    /// Stable storage label.
    pub fn as_str(&self) -> &'static str {
        match self {
            TermKind::Category => "category",
            TermKind::Tag => "tag",
            TermKind::Location => "location",
            TermKind::Shop => "shop",
        }
    }

    /// Plural form used in URLs.
    pub fn plural(&self) -> &'static str {
        match self {
            TermKind::Category => "categories",
            TermKind::Tag => "tags",
            TermKind::Location => "locations",
            TermKind::Shop => "shops",
        }
    }

    /// Whether a tool links to at most one term of this kind.
    pub fn is_single(&self) -> bool {
        matches!(self, TermKind::Location | TermKind::Shop)
    }
}

impl fmt::Display for TermKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TermKind {
    type Err = ToolyardError;

    /// Accepts singular or plural labels.
    fn from_str(value: &str) -> Result<Self> {
        let value = value.trim();
        TermKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value || kind.plural() == value)
            .ok_or_else(|| ToolyardError::validation(format!("unknown taxonomy: {value}")))
    }
}

/// Account role.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Regular signed-in user.
    User,
    /// Back-office administrator.
    Admin,
}

impl UserRole {
    /// Stable storage label.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }
}

impl FromStr for UserRole {
    type Err = ToolyardError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim() {
            "user" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            other => Err(ToolyardError::validation(format!("unknown role: {other}"))),
        }
    }
}
