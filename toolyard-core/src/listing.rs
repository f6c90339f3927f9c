//! Listing tiers and the free publication queue.

use chrono::{Days, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{ListingTier, ToolStatus};

/// Hours between an expedited payment and publication.
pub const EXPEDITED_DELAY_HOURS: i64 = 24;

/// A purchasable listing tier with its copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ListingPlan {
    /// Tier identifier.
    pub tier: ListingTier,
    /// Display label.
    pub label: String,
    /// Marketing description.
    pub description: String,
    /// Price in cents (0 for free).
    pub price_cents: i64,
    /// Billing interval for subscriptions (`month`), none for one-time payments.
    pub recurring_interval: Option<String>,
    /// Bullet list of benefits.
    pub benefits: Vec<String>,
}

/// Default tier catalog shown on the submit page.
pub fn default_plans() -> Vec<ListingPlan> {
    vec![
        ListingPlan {
            tier: ListingTier::Free,
            label: "Free".to_string(),
            description: "Get listed when your turn in the queue comes up.".to_string(),
            price_cents: 0,
            recurring_interval: None,
            benefits: vec![
                "Published in queue order".to_string(),
                "Do-follow link".to_string(),
            ],
        },
        ListingPlan {
            tier: ListingTier::Expedited,
            label: "Expedited".to_string(),
            description: "Skip the queue and go live within 24 hours.".to_string(),
            price_cents: 9700,
            recurring_interval: None,
            benefits: vec![
                "Published within 24 hours".to_string(),
                "Do-follow link".to_string(),
            ],
        },
        ListingPlan {
            tier: ListingTier::Featured,
            label: "Featured".to_string(),
            description: "Skip the queue and stay pinned above regular listings.".to_string(),
            price_cents: 19700,
            recurring_interval: Some("month".to_string()),
            benefits: vec![
                "Published within 24 hours".to_string(),
                "Pinned to the top of listings".to_string(),
                "Featured badge".to_string(),
            ],
        },
    ]
}

/// Plan entry for a tier from a catalog.
pub fn plan_for(plans: &[ListingPlan], tier: ListingTier) -> Option<&ListingPlan> {
    plans.iter().find(|plan| plan.tier == tier)
}

/// How fast the free queue drains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuePolicy {
    /// Free tools published per day.
    pub per_day: u32,
    /// UTC hour at which queued tools go live.
    pub publish_hour: u32,
}

impl Default for QueuePolicy {
    fn default() -> Self {
        Self {
            per_day: 1,
            publish_hour: 9,
        }
    }
}

impl QueuePolicy {
    fn per_day(&self) -> u32 {
        self.per_day.max(1)
    }

    fn publish_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.publish_hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN)
    }
}

/// Estimated publication date for the tool at 1-based queue `position`.
pub fn estimate_publish_date(position: u32, today: NaiveDate, policy: QueuePolicy) -> NaiveDate {
    let position = position.max(1);
    let days = position.div_ceil(policy.per_day());
    today
        .checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(today)
}

/// Publication datetimes for `count` queued tools.
///
/// Filling starts on `first_day`, which already holds `taken_on_first_day`
/// tools, and moves on to the following days once `per_day` is reached.
pub fn schedule_slots(
    count: usize,
    first_day: NaiveDate,
    taken_on_first_day: u32,
    policy: QueuePolicy,
) -> Vec<NaiveDateTime> {
    let per_day = policy.per_day();
    let time = policy.publish_time();
    let mut day = first_day;
    let mut used = taken_on_first_day;
    let mut slots = Vec::with_capacity(count);
    while slots.len() < count {
        if used >= per_day {
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
            used = 0;
            continue;
        }
        slots.push(day.and_time(time));
        used += 1;
    }
    slots
}

/// Publication time granted to an expedited or featured purchase.
pub fn expedited_publish_at(now: NaiveDateTime) -> NaiveDateTime {
    now + Duration::hours(EXPEDITED_DELAY_HOURS)
}

/// Changes applied to a tool after its tier was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierOutcome {
    /// New status.
    pub status: ToolStatus,
    /// New publication time; `None` leaves it unset.
    pub published_at: Option<NaiveDateTime>,
    /// Whether the tool is pinned above regular listings.
    pub is_featured: bool,
}

/// Outcome of settling `tier` at `now`.
///
/// Free submissions enter the queue; paid ones are scheduled for
/// publication 24 hours later, keeping an earlier date if one was already
/// set.
pub fn settle_tier(
    tier: ListingTier,
    now: NaiveDateTime,
    current_published_at: Option<NaiveDateTime>,
) -> TierOutcome {
    match tier {
        ListingTier::Free => TierOutcome {
            status: ToolStatus::Pending,
            published_at: None,
            is_featured: false,
        },
        ListingTier::Expedited | ListingTier::Featured => {
            let target = expedited_publish_at(now);
            let published_at = match current_published_at {
                Some(existing) if existing < target => existing,
                _ => target,
            };
            TierOutcome {
                status: ToolStatus::Scheduled,
                published_at: Some(published_at),
                is_featured: tier == ListingTier::Featured,
            }
        }
    }
}
