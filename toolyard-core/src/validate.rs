//! Submission form validation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{Result, ToolyardError};

const NAME_MIN: usize = 2;
const NAME_MAX: usize = 100;
const TAGLINE_MAX: usize = 160;
const DESCRIPTION_MAX: usize = 2000;

/// Public submission form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionInput {
    /// Tool name.
    pub name: String,
    /// Tool homepage.
    pub website_url: String,
    /// Short pitch.
    #[serde(default)]
    pub tagline: Option<String>,
    /// Longer description.
    #[serde(default)]
    pub description: Option<String>,
    /// Name of the person submitting.
    pub submitter_name: String,
    /// Contact email of the person submitting.
    pub submitter_email: String,
    /// Optional note for the reviewers.
    #[serde(default)]
    pub submitter_note: Option<String>,
}

/// Validate and normalize a submission.
pub fn validate_submission(input: &SubmissionInput) -> Result<SubmissionInput> {
    let name = input.name.trim();
    let name_len = name.chars().count();
    if !(NAME_MIN..=NAME_MAX).contains(&name_len) {
        return Err(ToolyardError::validation(format!(
            "name must be between {NAME_MIN} and {NAME_MAX} characters"
        )));
    }
    let website_url = normalize_website(&input.website_url)?;
    let submitter_name = input.submitter_name.trim();
    if submitter_name.is_empty() {
        return Err(ToolyardError::validation("your name is required"));
    }
    let submitter_email = input.submitter_email.trim().to_ascii_lowercase();
    if !is_plausible_email(&submitter_email) {
        return Err(ToolyardError::validation(format!(
            "invalid email address: {submitter_email}"
        )));
    }
    let tagline = trimmed(input.tagline.as_deref());
    if tagline.as_ref().is_some_and(|value| value.chars().count() > TAGLINE_MAX) {
        return Err(ToolyardError::validation(format!(
            "tagline must be at most {TAGLINE_MAX} characters"
        )));
    }
    let description = trimmed(input.description.as_deref());
    if description
        .as_ref()
        .is_some_and(|value| value.chars().count() > DESCRIPTION_MAX)
    {
        return Err(ToolyardError::validation(format!(
            "description must be at most {DESCRIPTION_MAX} characters"
        )));
    }
    Ok(SubmissionInput {
        name: name.to_string(),
        website_url,
        tagline,
        description,
        submitter_name: submitter_name.to_string(),
        submitter_email,
        submitter_note: trimmed(input.submitter_note.as_deref()),
    })
}

/// Canonical website form used for storage and duplicate detection.
///
/// Lowercases scheme and host, keeps the path, drops the path's trailing slash.
pub fn normalize_website(raw: &str) -> Result<String> {
    let raw = raw.trim();
    let invalid = || ToolyardError::validation(format!("invalid website url: {raw}"));
    let (scheme, rest) = raw.split_once("://").ok_or_else(invalid)?;
    let scheme = scheme.to_ascii_lowercase();
    if scheme != "http" && scheme != "https" {
        return Err(invalid());
    }
    let (host, path) = match rest.find(['/', '?', '#']) {
        Some(index) => rest.split_at(index),
        None => (rest, ""),
    };
    let host = host.to_ascii_lowercase();
    let hostname = host.rsplit_once('@').map_or(host.as_str(), |(_, h)| h);
    let hostname = hostname.split(':').next().unwrap_or_default();
    let valid_host = hostname.contains('.')
        && !hostname.starts_with('.')
        && !hostname.ends_with('.')
        && hostname
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');
    if !valid_host || host.contains(char::is_whitespace) {
        return Err(invalid());
    }
    let (path, tail) = path.split_at(path.find(['?', '#']).unwrap_or(path.len()));
    let path = path.trim_end_matches('/');
    Ok(format!("{scheme}://{host}{path}{tail}"))
}

/// Loose `local@domain.tld` check.
pub fn is_plausible_email(value: &str) -> bool {
    let Some((local, domain)) = value.rsplit_once('@') else {
        return false;
    };
    !local.is_empty()
        && !local.contains(char::is_whitespace)
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains(char::is_whitespace)
        && !domain.contains('@')
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> SubmissionInput {
        SubmissionInput {
            name: "  Acme CRM ".to_string(),
            website_url: "HTTPS://Acme.example.com/".to_string(),
            tagline: Some("  CRM for builders ".to_string()),
            description: Some(String::new()),
            submitter_name: " Ada ".to_string(),
            submitter_email: " Ada@Example.COM ".to_string(),
            submitter_note: None,
        }
    }

    #[test]
    fn validate_submission_trims_and_normalizes() {
        let clean = validate_submission(&input()).expect("valid");
        assert_eq!(clean.name, "Acme CRM");
        assert_eq!(clean.website_url, "https://acme.example.com");
        assert_eq!(clean.tagline.as_deref(), Some("CRM for builders"));
        assert_eq!(clean.description, None);
        assert_eq!(clean.submitter_name, "Ada");
        assert_eq!(clean.submitter_email, "ada@example.com");
    }

    #[test]
    fn validate_submission_rejects_bad_fields() {
        let mut short = input();
        short.name = "A".to_string();
        assert!(validate_submission(&short).is_err());

        let mut email = input();
        email.submitter_email = "nobody".to_string();
        assert!(validate_submission(&email).unwrap_err().to_string().contains("email"));

        let mut long = input();
        long.description = Some("x".repeat(2001));
        assert!(validate_submission(&long).is_err());

        let mut anonymous = input();
        anonymous.submitter_name = "  ".to_string();
        assert!(validate_submission(&anonymous).is_err());
    }

    #[test]
    fn normalize_website_accepts_common_forms() {
        assert_eq!(
            normalize_website("http://Example.com").expect("url"),
            "http://example.com"
        );
        assert_eq!(
            normalize_website("https://example.com/Pricing/").expect("url"),
            "https://example.com/Pricing"
        );
        assert_eq!(
            normalize_website("https://app.example.io:8443/?ref=x").expect("url"),
            "https://app.example.io:8443?ref=x"
        );
    }

    #[test]
    fn normalize_website_ignores_slash_before_query_or_fragment() {
        assert_eq!(
            normalize_website("https://a.com/?x").expect("url"),
            normalize_website("https://a.com?x").expect("url")
        );
        assert_eq!(
            normalize_website("https://a.com/docs/#intro").expect("url"),
            "https://a.com/docs#intro"
        );
        assert_eq!(
            normalize_website("https://a.com/docs?next=/home/").expect("url"),
            "https://a.com/docs?next=/home/"
        );
    }

    #[test]
    fn normalize_website_rejects_non_http_and_bare_hosts() {
        for raw in [
            "ftp://example.com",
            "example.com",
            "https://localhost",
            "https://exa mple.com",
            "https://.example.com",
        ] {
            assert!(normalize_website(raw).is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn email_check_is_loose_but_structured() {
        assert!(is_plausible_email("a@b.co"));
        assert!(!is_plausible_email("a@b"));
        assert!(!is_plausible_email("@b.co"));
        assert!(!is_plausible_email("a b@c.co"));
    }
}
