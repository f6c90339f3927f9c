//! Ad slot pricing: per-day rates, duration discounts and quotes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::AdSpot;
use crate::error::{Result, ToolyardError};

/// Daily rate and copy for one ad spot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SpotPrice {
    /// Spot being priced.
    pub spot: AdSpot,
    /// Display label.
    pub label: String,
    /// Short description of where the ad shows.
    pub description: String,
    /// Price per booked day in cents.
    pub price_per_day_cents: i64,
}

/// Percentage discount unlocked by booking at least `min_days`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DiscountTier {
    /// Minimum number of booked days.
    pub min_days: i64,
    /// Discount percentage (0-100).
    pub percent: i64,
}

/// Complete ad price list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AdPricing {
    /// ISO currency code used for checkout.
    pub currency: String,
    /// Rates per spot.
    pub spots: Vec<SpotPrice>,
    /// Duration discounts.
    pub discount_tiers: Vec<DiscountTier>,
    /// Longest bookable range in days.
    pub max_days: i64,
}

impl Default for AdPricing {
    fn default() -> Self {
        let single = [
            (
                AdSpot::Banner,
                "Banner",
                "Site-wide banner shown above the navigation.",
                1500,
            ),
            (
                AdSpot::Homepage,
                "Homepage",
                "Sponsored card in the homepage tool grid.",
                2500,
            ),
            (
                AdSpot::ToolPage,
                "Tool page",
                "Sidebar placement on every tool page.",
                1000,
            ),
            (
                AdSpot::BlogPost,
                "Blog post",
                "Sidebar placement on every blog post.",
                800,
            ),
        ];
        let mut spots: Vec<SpotPrice> = single
            .iter()
            .map(|(spot, label, description, price)| SpotPrice {
                spot: *spot,
                label: label.to_string(),
                description: description.to_string(),
                price_per_day_cents: *price,
            })
            .collect();
        let bundle = spots.iter().map(|spot| spot.price_per_day_cents).sum();
        spots.push(SpotPrice {
            spot: AdSpot::All,
            label: "All spots".to_string(),
            description: "Every placement at once.".to_string(),
            price_per_day_cents: bundle,
        });
        Self {
            currency: "usd".to_string(),
            spots,
            discount_tiers: vec![
                DiscountTier {
                    min_days: 7,
                    percent: 5,
                },
                DiscountTier {
                    min_days: 14,
                    percent: 10,
                },
                DiscountTier {
                    min_days: 30,
                    percent: 20,
                },
            ],
            max_days: 90,
        }
    }
}

/// One spot booked for an inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AdSelection {
    /// Spot to book.
    pub spot: AdSpot,
    /// First day the ad runs.
    pub start_date: NaiveDate,
    /// Last day the ad runs (inclusive).
    pub end_date: NaiveDate,
}

impl AdSelection {
    /// Number of booked days, counting both ends.
    pub fn days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    /// Whether the two inclusive date ranges share at least one day.
    pub fn dates_intersect(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= end && start <= self.end_date
    }
}

/// Priced line for one selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct QuoteLine {
    /// The priced selection.
    pub selection: AdSelection,
    /// Line label used on receipts and checkout.
    pub name: String,
    /// Booked days.
    pub days: i64,
    /// Daily rate in cents.
    pub price_per_day_cents: i64,
    /// Undiscounted amount in cents.
    pub subtotal_cents: i64,
    /// Applied discount percentage.
    pub discount_percent: i64,
    /// Discount amount in cents.
    pub discount_cents: i64,
    /// Amount due in cents.
    pub total_cents: i64,
}

/// Price breakdown for a set of selections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AdQuote {
    /// ISO currency code.
    pub currency: String,
    /// One line per selection, in request order.
    pub lines: Vec<QuoteLine>,
    /// Sum of line subtotals.
    pub subtotal_cents: i64,
    /// Sum of line discounts.
    pub discount_cents: i64,
    /// Amount due.
    pub total_cents: i64,
}

impl AdPricing {
    /// Rate entry for a spot.
    pub fn spot_price(&self, spot: AdSpot) -> Result<&SpotPrice> {
        self.spots
            .iter()
            .find(|entry| entry.spot == spot)
            .ok_or_else(|| ToolyardError::validation(format!("spot {spot} is not for sale")))
    }

    /// Best discount percentage for a booking of `days`.
    pub fn discount_percent(&self, days: i64) -> i64 {
        self.discount_tiers
            .iter()
            .filter(|tier| tier.min_days <= days)
            .map(|tier| tier.percent)
            .max()
            .unwrap_or(0)
            .clamp(0, 100)
    }

    /// Checkout label for a selection.
    pub fn line_item_name(&self, selection: &AdSelection) -> Result<String> {
        let label = &self.spot_price(selection.spot)?.label;
        Ok(format!(
            "{label} ad ({} – {})",
            selection.start_date.format("%Y-%m-%d"),
            selection.end_date.format("%Y-%m-%d")
        ))
    }

    /// Price every selection and total them.
    pub fn quote(&self, selections: &[AdSelection]) -> Result<AdQuote> {
        if selections.is_empty() {
            return Err(ToolyardError::validation("select at least one ad spot"));
        }
        let mut lines = Vec::with_capacity(selections.len());
        for selection in selections {
            let days = selection.days();
            if days < 1 {
                return Err(ToolyardError::validation(format!(
                    "{} booking ends before it starts",
                    selection.spot
                )));
            }
            let price = self.spot_price(selection.spot)?;
            let subtotal_cents = days * price.price_per_day_cents;
            let discount_percent = self.discount_percent(days);
            let discount_cents = subtotal_cents * discount_percent / 100;
            lines.push(QuoteLine {
                selection: *selection,
                name: self.line_item_name(selection)?,
                days,
                price_per_day_cents: price.price_per_day_cents,
                subtotal_cents,
                discount_percent,
                discount_cents,
                total_cents: subtotal_cents - discount_cents,
            });
        }
        let subtotal_cents = lines.iter().map(|line| line.subtotal_cents).sum();
        let discount_cents = lines.iter().map(|line| line.discount_cents).sum();
        let total_cents = lines.iter().map(|line| line.total_cents).sum();
        Ok(AdQuote {
            currency: self.currency.clone(),
            lines,
            subtotal_cents,
            discount_cents,
            total_cents,
        })
    }
}

/// Encode selections as `spot:start:end;…` for payment metadata.
pub fn encode_selections(selections: &[AdSelection]) -> String {
    selections
        .iter()
        .map(|selection| {
            format!(
                "{}:{}:{}",
                selection.spot.as_str(),
                selection.start_date.format("%Y-%m-%d"),
                selection.end_date.format("%Y-%m-%d")
            )
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Decode the metadata form produced by [`encode_selections`].
pub fn decode_selections(raw: &str) -> Result<Vec<AdSelection>> {
    raw.split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(parse_selection)
        .collect()
}

/// Parse one `spot:start:end` triple.
pub fn parse_selection(raw: &str) -> Result<AdSelection> {
    let mut parts = raw.trim().splitn(3, ':');
    let (Some(spot), Some(start), Some(end)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ToolyardError::validation(format!(
            "selection must look like spot:YYYY-MM-DD:YYYY-MM-DD, got {raw}"
        )));
    };
    Ok(AdSelection {
        spot: spot.parse()?,
        start_date: parse_date(start)?,
        end_date: parse_date(end)?,
    })
}

/// Parse an ISO `YYYY-MM-DD` date.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ToolyardError::validation(format!("invalid date: {raw}")))
}
