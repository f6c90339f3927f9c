#![deny(missing_docs)]
//! Toolyard core library.
//!
//! Domain types and pure business rules of the Toolyard directory: ad
//! pricing and availability, listing tiers and the publication queue, slugs,
//! submission validation and the paging rules shared by every list endpoint.

pub mod availability;
pub mod catalog;
pub mod domain;
pub mod error;
pub mod listing;
pub mod pricing;
pub mod slug;
pub mod table;
pub mod validate;

pub use availability::{Booking, DateRange, booked_ranges, check_selections, next_available};
pub use catalog::{CatalogQuery, RawCatalogQuery, ToolSort};
pub use domain::{
    AdSpot, ListingTier, PostStatus, TermKind, ToolStatus, UserRole, is_tool_visible,
};
pub use error::{Result, ToolyardError};
pub use listing::{ListingPlan, QueuePolicy, TierOutcome, default_plans, settle_tier};
pub use pricing::{AdPricing, AdQuote, AdSelection, QuoteLine};
pub use slug::{SlugStore, slugify, unique_slug};
pub use table::{Page, RawTableQuery, SortSpec, TableParams};
pub use validate::{SubmissionInput, validate_submission};
