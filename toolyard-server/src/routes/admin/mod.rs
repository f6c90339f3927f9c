//! Back-office endpoints; every handler requires an admin session.

use actix_web::web;
use serde::{Deserialize, Serialize};
use toolyard_core::ToolyardError;
use utoipa::ToSchema;

pub mod ads;
pub mod posts;
pub mod stats;
pub mod terms;
pub mod tools;
pub mod users;

/// Register admin handlers.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(stats::stats)
        .service(tools::list_tools)
        .service(tools::create_tool)
        .service(tools::schedule_queue)
        .service(tools::delete_tools)
        .service(tools::get_tool)
        .service(tools::update_tool)
        .service(tools::publish_tool)
        .service(terms::list_terms)
        .service(terms::create_term)
        .service(terms::delete_terms)
        .service(terms::get_term)
        .service(terms::update_term)
        .service(posts::list_posts)
        .service(posts::create_post)
        .service(posts::delete_posts)
        .service(posts::get_post)
        .service(posts::update_post)
        .service(ads::list_ads)
        .service(ads::create_ad)
        .service(ads::delete_ads)
        .service(ads::get_ad)
        .service(ads::update_ad)
        .service(users::list_users);
}

/// Ids selected for a bulk delete.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BulkDeleteRequest {
    /// Record ids.
    pub ids: Vec<String>,
}

impl BulkDeleteRequest {
    /// Trimmed, non-empty ids.
    pub(crate) fn ids(&self) -> Result<Vec<String>, ToolyardError> {
        let ids: Vec<String> = self
            .ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .map(String::from)
            .collect();
        if ids.is_empty() {
            return Err(ToolyardError::validation("at least one id is required"));
        }
        Ok(ids)
    }
}

/// Number of removed rows.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteResponse {
    /// Rows deleted.
    pub deleted: usize,
}

/// Trim an optional text field, mapping blanks to `None`.
pub(crate) fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(String::from)
}

/// Require a non-blank text field.
pub(crate) fn required_text(field: &str, value: &str) -> Result<String, ToolyardError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ToolyardError::validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulk_delete_requires_ids() {
        let request = BulkDeleteRequest {
            ids: vec![" a ".to_string(), "".to_string()],
        };
        assert_eq!(request.ids().expect("ids"), vec!["a".to_string()]);
        let empty = BulkDeleteRequest { ids: vec![" ".to_string()] };
        assert!(empty.ids().is_err());
    }

    #[test]
    fn text_helpers_trim() {
        assert_eq!(optional_text(Some("  ")), None);
        assert_eq!(optional_text(Some(" x ")).as_deref(), Some("x"));
        assert!(required_text("title", " ").is_err());
        assert_eq!(required_text("title", " Hello ").expect("title"), "Hello");
    }
}
