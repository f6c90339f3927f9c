//! Environment-driven configuration.

use serde::{Deserialize, Serialize};
use toolyard_core::QueuePolicy;
use utoipa::ToSchema;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(String::from)
        .collect()
}

/// Listener and CORS settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Origins allowed by CORS.
    pub allowed_origins: Vec<String>,
}

impl ServerConfig {
    /// Build server config from `TOOLYARD_HOST`, `TOOLYARD_PORT` and `TOOLYARD_UI_ORIGINS`.
    pub fn from_env() -> Result<Self, String> {
        let port_raw = env_or("TOOLYARD_PORT", "8080");
        let port = port_raw
            .parse::<u16>()
            .map_err(|_| format!("TOOLYARD_PORT must be a u16 number, got {port_raw}"))?;
        Ok(Self {
            host: env_or("TOOLYARD_HOST", "127.0.0.1"),
            port,
            allowed_origins: split_list(&env_or(
                "TOOLYARD_UI_ORIGINS",
                "http://127.0.0.1:3000,http://localhost:3000",
            )),
        })
    }
}

/// Public site metadata and queue pacing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    /// Site name.
    pub name: String,
    /// Canonical site URL.
    pub url: String,
    /// One-line pitch.
    pub tagline: String,
    /// Contact email.
    pub email: String,
    /// About page body.
    pub about: String,
    /// Free tools published per day.
    pub free_per_day: u32,
}

impl SiteConfig {
    /// Build site config from `TOOLYARD_SITE_*`, `TOOLYARD_ABOUT` and `TOOLYARD_FREE_PER_DAY`.
    pub fn from_env() -> Self {
        let free_per_day = env_or("TOOLYARD_FREE_PER_DAY", "1")
            .parse::<u32>()
            .unwrap_or(1)
            .max(1);
        Self {
            name: env_or("TOOLYARD_SITE_NAME", "Toolyard"),
            url: env_or("TOOLYARD_SITE_URL", "http://localhost:3000"),
            tagline: env_or("TOOLYARD_SITE_TAGLINE", "A curated directory of tools"),
            email: env_or("TOOLYARD_SITE_EMAIL", "hello@example.com"),
            about: env_or(
                "TOOLYARD_ABOUT",
                "Toolyard lists hand-picked tools for builders.",
            ),
            free_per_day,
        }
    }

    /// Free queue pacing.
    pub fn queue_policy(&self) -> QueuePolicy {
        QueuePolicy {
            per_day: self.free_per_day,
            ..QueuePolicy::default()
        }
    }

    /// Absolute URL on the public site.
    pub fn absolute(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Authentication configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// GitHub OAuth client id.
    pub github_client_id: String,
    /// GitHub OAuth client secret.
    pub github_client_secret: String,
    /// GitHub OAuth base URL.
    pub github_oauth_url: String,
    /// GitHub API base URL.
    pub github_api_url: String,
    /// GitHub API user agent.
    pub github_user_agent: String,
    /// UI base URL for OAuth redirect.
    pub ui_base_url: String,
    /// GitHub OAuth scopes.
    pub github_scopes: Vec<String>,
    /// GitHub logins granted the admin role.
    pub admin_logins: Vec<String>,
}

impl AuthConfig {
    /// Build auth config from environment variables.
    pub fn from_env() -> Self {
        Self {
            github_client_id: std::env::var("GITHUB_CLIENT_ID").unwrap_or_default(),
            github_client_secret: std::env::var("GITHUB_CLIENT_SECRET").unwrap_or_default(),
            github_oauth_url: env_or("GITHUB_OAUTH_URL", "https://github.com/login/oauth"),
            github_api_url: env_or("GITHUB_API_URL", "https://api.github.com"),
            github_user_agent: env_or("GITHUB_USER_AGENT", "toolyard-server"),
            ui_base_url: env_or("TOOLYARD_UI_URL", "http://127.0.0.1:3000"),
            github_scopes: split_list(&env_or("GITHUB_SCOPES", "read:user")),
            admin_logins: split_list(&std::env::var("TOOLYARD_ADMIN_LOGINS").unwrap_or_default()),
        }
    }

    /// GitHub authorize endpoint.
    pub fn authorize_url(&self) -> String {
        format!("{}/authorize", self.github_oauth_url.trim_end_matches('/'))
    }

    /// GitHub token exchange endpoint.
    pub fn token_url(&self) -> String {
        format!(
            "{}/access_token",
            self.github_oauth_url.trim_end_matches('/')
        )
    }

    /// UI callback receiving the OAuth code.
    pub fn redirect_uri(&self) -> String {
        format!("{}/auth/callback", self.ui_base_url.trim_end_matches('/'))
    }

    /// Whether `login` is configured as an administrator (case-insensitive).
    pub fn is_admin_login(&self, login: &str) -> bool {
        self.admin_logins
            .iter()
            .any(|admin| admin.eq_ignore_ascii_case(login))
    }
}
