//! Date-range inventory for ad spots.
//!
//! A booking blocks every placement its spot occupies for each day between
//! `start_date` and `end_date`, both inclusive. The `all` bundle therefore
//! blocks, and is blocked by, every single-placement spot.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::AdSpot;
use crate::error::{Result, ToolyardError};
use crate::pricing::AdSelection;

/// An existing reservation of a spot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Booking {
    /// Booked spot.
    pub spot: AdSpot,
    /// First booked day.
    pub start_date: NaiveDate,
    /// Last booked day (inclusive).
    pub end_date: NaiveDate,
}

/// Inclusive range of blocked days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DateRange {
    /// First day.
    pub start: NaiveDate,
    /// Last day (inclusive).
    pub end: NaiveDate,
}

impl Booking {
    /// Whether this booking blocks `selection`.
    pub fn blocks(&self, selection: &AdSelection) -> bool {
        self.spot.overlaps(&selection.spot)
            && selection.dates_intersect(self.start_date, self.end_date)
    }
}

impl From<AdSelection> for Booking {
    fn from(selection: AdSelection) -> Self {
        Self {
            spot: selection.spot,
            start_date: selection.start_date,
            end_date: selection.end_date,
        }
    }
}

/// Check date sanity for a single selection.
pub fn validate_selection(
    selection: &AdSelection,
    today: NaiveDate,
    max_days: i64,
) -> Result<()> {
    if selection.start_date < today {
        return Err(ToolyardError::validation(format!(
            "{} booking cannot start in the past ({})",
            selection.spot, selection.start_date
        )));
    }
    if selection.end_date < selection.start_date {
        return Err(ToolyardError::validation(format!(
            "{} booking ends before it starts",
            selection.spot
        )));
    }
    if selection.days() > max_days {
        return Err(ToolyardError::validation(format!(
            "{} booking is {} days long, the maximum is {max_days}",
            selection.spot,
            selection.days()
        )));
    }
    Ok(())
}

/// Bookings that collide with `selection`.
pub fn conflicts<'a>(selection: &AdSelection, bookings: &'a [Booking]) -> Vec<&'a Booking> {
    bookings
        .iter()
        .filter(|booking| booking.blocks(selection))
        .collect()
}

/// Validate a whole checkout request against existing bookings.
///
/// Selections inside the same request must not collide with each other
/// either.
pub fn check_selections(
    selections: &[AdSelection],
    bookings: &[Booking],
    today: NaiveDate,
    max_days: i64,
) -> Result<()> {
    if selections.is_empty() {
        return Err(ToolyardError::validation("select at least one ad spot"));
    }
    for (index, selection) in selections.iter().enumerate() {
        validate_selection(selection, today, max_days)?;
        if let Some(booking) = conflicts(selection, bookings).first() {
            return Err(ToolyardError::conflict(format!(
                "{} is already booked from {} to {}",
                selection.spot, booking.start_date, booking.end_date
            )));
        }
        let earlier: Vec<Booking> = selections[..index]
            .iter()
            .copied()
            .map(Booking::from)
            .collect();
        if !conflicts(selection, &earlier).is_empty() {
            return Err(ToolyardError::conflict(format!(
                "{} selection from {} to {} overlaps another selection",
                selection.spot, selection.start_date, selection.end_date
            )));
        }
    }
    Ok(())
}

/// Earliest start on or after `from` giving `days` free consecutive days.
pub fn next_available(
    spot: AdSpot,
    from: NaiveDate,
    days: i64,
    bookings: &[Booking],
) -> NaiveDate {
    let span = days.max(1) as u64 - 1;
    let mut start = from;
    loop {
        let Some(end) = start.checked_add_days(Days::new(span)) else {
            return start;
        };
        let candidate = AdSelection {
            spot,
            start_date: start,
            end_date: end,
        };
        let latest_blocker = conflicts(&candidate, bookings)
            .into_iter()
            .map(|booking| booking.end_date)
            .max();
        match latest_blocker.and_then(|end| end.succ_opt()) {
            Some(next) => start = next,
            None => return start,
        }
    }
}

/// Merged, sorted ranges during which `spot` cannot be booked.
pub fn booked_ranges(spot: AdSpot, bookings: &[Booking]) -> Vec<DateRange> {
    let mut ranges: Vec<DateRange> = bookings
        .iter()
        .filter(|booking| booking.spot.overlaps(&spot))
        .map(|booking| DateRange {
            start: booking.start_date,
            end: booking.end_date,
        })
        .collect();
    ranges.sort_by_key(|range| (range.start, range.end));

    let mut merged: Vec<DateRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        if let Some(last) = merged.last_mut() {
            let touches = last.end.succ_opt().is_some_and(|next| range.start <= next);
            if touches {
                last.end = last.end.max(range.end);
                continue;
            }
        }
        merged.push(range);
    }
    merged
}
