//! Session login and on-disk session storage for the Toolyard CLI.

use crate::CliResult;
use clap::Args;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

pub(crate) const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8080";

/// CLI arguments for the login command.
#[derive(Args, Clone, Debug)]
pub struct LoginArgs {
    /// Base URL of the Toolyard server.
    #[arg(long, env = "TOOLYARD_API_URL", default_value = DEFAULT_SERVER_URL)]
    pub server_url: String,
    /// GitHub access token to exchange for a Toolyard session.
    #[arg(long, env = "TOOLYARD_GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: String,
    /// Override the auth session file path.
    #[arg(long)]
    pub auth_path: Option<PathBuf>,
}

/// Exchange the GitHub token and store the resulting Toolyard session.
#[cfg(not(test))]
pub async fn run_login(args: LoginArgs) -> CliResult<()> {
    let client = ReqwestLoginClient::new()?;
    run_login_with(args, &client).await
}

/// Exchange the GitHub token with an injected client.
async fn run_login_with<C: LoginClient>(args: LoginArgs, client: &C) -> CliResult<()> {
    let server_url = normalize_server_url(&args.server_url)?;
    let github_token = args.github_token.trim();
    if github_token.is_empty() {
        return Err("github token is required".into());
    }
    let session = client
        .exchange_token_for_session(&server_url, github_token)
        .await?;
    let auth_path = auth_store_path(args.auth_path)?;
    let stored = StoredAuthSession::new(&server_url, &session);
    write_auth_session(&auth_path, &stored).await?;

    println!(
        "Authenticated as {} ({}). Token stored at {}.",
        session.user.login,
        session.user.role,
        auth_path.display()
    );
    Ok(())
}

/// Toolyard session response returned after authentication.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
struct AuthGithubResponse {
    token: String,
    user: AuthUser,
}

/// Authenticated user details.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AuthUser {
    pub(crate) id: String,
    pub(crate) login: String,
    pub(crate) github_id: String,
    pub(crate) role: String,
}

/// Request payload for exchanging a GitHub access token.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthGithubTokenRequest {
    access_token: String,
}

/// Stored CLI auth session on disk.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoredAuthSession {
    pub(crate) server_url: String,
    pub(crate) token: String,
    pub(crate) user: AuthUser,
}

impl StoredAuthSession {
    /// Build a new stored session record.
    fn new(server_url: &str, session: &AuthGithubResponse) -> Self {
        Self {
            server_url: server_url.to_string(),
            token: session.token.clone(),
            user: session.user.clone(),
        }
    }
}

/// Normalize the server URL for consistent API requests.
pub(crate) fn normalize_server_url(server_url: &str) -> CliResult<String> {
    let trimmed = server_url.trim();
    if trimmed.is_empty() {
        return Err("server url is required".into());
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

/// Exchange a GitHub access token for a Toolyard session token.
async fn exchange_token_for_session(
    client: &Client,
    server_url: &str,
    github_token: &str,
) -> CliResult<AuthGithubResponse> {
    let payload = AuthGithubTokenRequest {
        access_token: github_token.to_string(),
    };
    let response = client
        .post(format!("{server_url}/api/auth/github/token"))
        .json(&payload)
        .send()
        .await?;
    let response = crate::api::check_status(response).await?;
    Ok(response.json::<AuthGithubResponse>().await?)
}

/// HTTP client abstraction for the login exchange.
trait LoginClient {
    fn exchange_token_for_session<'a>(
        &'a self,
        server_url: &'a str,
        github_token: &'a str,
    ) -> Pin<Box<dyn Future<Output = CliResult<AuthGithubResponse>> + Send + 'a>>;
}

/// Reqwest-backed login client.
#[cfg_attr(test, allow(dead_code))]
struct ReqwestLoginClient {
    client: Client,
}

impl ReqwestLoginClient {
    /// Build a new reqwest login client.
    #[cfg_attr(test, allow(dead_code))]
    fn new() -> CliResult<Self> {
        let client = Client::builder().user_agent("toolyard-cli").build()?;
        Ok(Self { client })
    }
}

impl LoginClient for ReqwestLoginClient {
    fn exchange_token_for_session<'a>(
        &'a self,
        server_url: &'a str,
        github_token: &'a str,
    ) -> Pin<Box<dyn Future<Output = CliResult<AuthGithubResponse>> + Send + 'a>> {
        Box::pin(exchange_token_for_session(
            &self.client,
            server_url,
            github_token,
        ))
    }
}

/// Resolve the local path where auth sessions are stored.
pub(crate) fn auth_store_path(auth_path: Option<PathBuf>) -> CliResult<PathBuf> {
    if let Some(path) = auth_path {
        return Ok(path);
    }
    if let Ok(path) = std::env::var("TOOLYARD_AUTH_PATH") {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    if let Ok(base) = std::env::var("XDG_CONFIG_HOME") {
        if !base.trim().is_empty() {
            return Ok(PathBuf::from(base).join("toolyard").join("auth.json"));
        }
    }
    if let Ok(home) = std::env::var("HOME") {
        if !home.trim().is_empty() {
            return Ok(PathBuf::from(home).join(".config/toolyard/auth.json"));
        }
    }
    Err("unable to resolve auth storage path".into())
}

/// Persist the auth session JSON to disk.
async fn write_auth_session(path: &Path, session: &StoredAuthSession) -> CliResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let payload = serde_json::to_vec_pretty(session)?;
    tokio::fs::write(path, payload).await?;
    Ok(())
}

/// Load a previously stored session.
pub(crate) async fn read_auth_session(path: &Path) -> CliResult<StoredAuthSession> {
    let payload = match tokio::fs::read(path).await {
        Ok(payload) => payload,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(format!(
                "no session at {}; run `toolyard login` first",
                path.display()
            )
            .into());
        }
        Err(err) => return Err(err.into()),
    };
    Ok(serde_json::from_slice(&payload)?)
}
