//! GitHub sign-in and session endpoints.

use actix_web::{HttpRequest, HttpResponse, get, post, web};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use toolyard_core::UserRole;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{AppState, now, require_auth};
use crate::config::AuthConfig;
use crate::crypto::TokenCipher;
use crate::errors::{ApiError, ApiResult, ErrorResponse};
use crate::models::{AuthSession, User};
use crate::schema::{auth_sessions, users};

/// OAuth configuration shared with the UI.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfigResponse {
    /// GitHub OAuth client id.
    pub client_id: String,
    /// GitHub authorize URL.
    pub authorize_url: String,
    /// OAuth scopes requested.
    pub scopes: Vec<String>,
    /// Redirect URI for the UI callback.
    pub redirect_uri: String,
}

/// Authenticated user profile.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    /// Toolyard user identifier.
    pub id: String,
    /// GitHub login handle.
    pub login: String,
    /// GitHub user id.
    pub github_id: String,
    /// `user` or `admin`.
    pub role: String,
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            login: user.github_login,
            github_id: user.github_id,
            role: user.role,
        }
    }
}

/// Request payload for GitHub OAuth exchange.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthGithubRequest {
    /// GitHub OAuth code.
    pub code: String,
    /// Optional redirect URI override.
    pub redirect_uri: Option<String>,
}

/// Request payload for exchanging a GitHub token.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthGithubTokenRequest {
    /// GitHub OAuth access token.
    pub access_token: String,
}

/// Response payload for GitHub OAuth exchange.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthGithubResponse {
    /// Toolyard access token.
    pub token: String,
    /// Authenticated user profile.
    pub user: AuthUser,
}

#[derive(Serialize)]
struct GithubTokenRequest {
    client_id: String,
    client_secret: String,
    code: String,
    redirect_uri: Option<String>,
}

#[derive(Deserialize)]
struct GithubTokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct GithubUserResponse {
    id: u64,
    login: String,
}

fn exchange_github_code(
    client: &Client,
    auth: &AuthConfig,
    payload: &AuthGithubRequest,
) -> ApiResult<String> {
    let redirect_uri = payload
        .redirect_uri
        .clone()
        .or_else(|| Some(auth.redirect_uri()));
    let request = GithubTokenRequest {
        client_id: auth.github_client_id.clone(),
        client_secret: auth.github_client_secret.clone(),
        code: payload.code.clone(),
        redirect_uri,
    };
    let response = client
        .post(auth.token_url())
        .header("Accept", "application/json")
        .json(&request)
        .send()
        .map_err(|err| ApiError::Internal(format!("GitHub token exchange failed: {err}")))?;
    if !response.status().is_success() {
        return Err(ApiError::Internal(format!(
            "GitHub token exchange failed: {}",
            response.status()
        )));
    }
    let body: GithubTokenResponse = response
        .json()
        .map_err(|err| ApiError::Internal(format!("GitHub token response invalid: {err}")))?;
    Ok(body.access_token)
}

fn fetch_github_user(
    client: &Client,
    auth: &AuthConfig,
    token: &str,
) -> ApiResult<GithubUserResponse> {
    let response = client
        .get(format!(
            "{}/user",
            auth.github_api_url.trim_end_matches('/')
        ))
        .header("User-Agent", auth.github_user_agent.clone())
        .bearer_auth(token)
        .send()
        .map_err(|err| ApiError::Internal(format!("GitHub user lookup failed: {err}")))?;
    if !response.status().is_success() {
        return Err(ApiError::Internal(format!(
            "GitHub user lookup failed: {}",
            response.status()
        )));
    }
    response
        .json()
        .map_err(|err| ApiError::Internal(format!("GitHub user response invalid: {err}")))
}

/// Role for a signing-in user: configured admins are promoted, everyone else keeps
/// their stored role.
fn resolve_role(auth: &AuthConfig, login: &str, existing: Option<&str>) -> String {
    if auth.is_admin_login(login) {
        return UserRole::Admin.as_str().to_string();
    }
    existing.unwrap_or(UserRole::User.as_str()).to_string()
}

/// Insert or refresh the user behind a GitHub profile.
fn upsert_user(
    conn: &mut PgConnection,
    auth: &AuthConfig,
    github_user: &GithubUserResponse,
) -> ApiResult<User> {
    let github_id = github_user.id.to_string();
    let existing = users::table
        .filter(users::github_id.eq(&github_id))
        .first::<User>(conn)
        .optional()?;
    match existing {
        Some(user) => {
            let role = resolve_role(auth, &github_user.login, Some(&user.role));
            Ok(diesel::update(users::table.find(&user.id))
                .set((
                    users::github_login.eq(&github_user.login),
                    users::role.eq(&role),
                ))
                .get_result::<User>(conn)?)
        }
        None => {
            let user = User {
                id: Uuid::new_v4().to_string(),
                github_id,
                github_login: github_user.login.clone(),
                role: resolve_role(auth, &github_user.login, None),
                created_at: now(),
            };
            diesel::insert_into(users::table)
                .values(&user)
                .execute(conn)?;
            log::info!("created user {} ({})", user.github_login, user.role);
            Ok(user)
        }
    }
}

/// Persist a Toolyard auth session from a GitHub profile and token.
fn persist_auth_session(
    conn: &mut PgConnection,
    auth: &AuthConfig,
    token_cipher: &TokenCipher,
    github_user: GithubUserResponse,
    github_token: String,
) -> ApiResult<AuthGithubResponse> {
    let encrypted_github_token = token_cipher
        .encrypt(&github_token)
        .map_err(ApiError::Internal)?;
    conn.transaction(|conn| {
        let user = upsert_user(conn, auth, &github_user)?;
        let created_at = now();
        let session = AuthSession {
            id: Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            toolyard_token: Uuid::new_v4().to_string(),
            github_token: encrypted_github_token,
            created_at,
            last_used_at: created_at,
        };
        diesel::insert_into(auth_sessions::table)
            .values(&session)
            .execute(conn)?;
        log::info!("signed in {}", user.github_login);
        Ok(AuthGithubResponse {
            token: session.toolyard_token,
            user: AuthUser::from(user),
        })
    })
}

#[utoipa::path(
    get,
    path = "/auth/config",
    responses(
        (status = 200, description = "OAuth config", body = AuthConfigResponse)
    ),
    tag = "auth"
)]
#[get("/api/auth/config")]
/// Fetch OAuth configuration for the UI.
pub async fn auth_config(state: web::Data<AppState>) -> HttpResponse {
    let config = &state.auth;
    HttpResponse::Ok().json(AuthConfigResponse {
        client_id: config.github_client_id.clone(),
        authorize_url: config.authorize_url(),
        scopes: config.github_scopes.clone(),
        redirect_uri: config.redirect_uri(),
    })
}

#[utoipa::path(
    post,
    path = "/auth/github",
    request_body = AuthGithubRequest,
    responses(
        (status = 200, description = "Authenticated", body = AuthGithubResponse),
        (status = 500, description = "OAuth exchange failed", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[post("/api/auth/github")]
/// Exchange a GitHub OAuth code for a Toolyard session.
pub async fn auth_github(
    state: web::Data<AppState>,
    payload: web::Json<AuthGithubRequest>,
) -> ApiResult<HttpResponse> {
    let pool = state.pool.clone();
    let auth = state.auth.clone();
    let token_cipher = state.token_cipher.clone();
    let payload = payload.into_inner();
    let response = web::block(move || {
        let client = Client::new();
        let github_token = exchange_github_code(&client, &auth, &payload)?;
        let github_user = fetch_github_user(&client, &auth, &github_token)?;
        let mut conn = pool.get()?;
        persist_auth_session(&mut conn, &auth, &token_cipher, github_user, github_token)
    })
    .await??;
    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    post,
    path = "/auth/github/token",
    request_body = AuthGithubTokenRequest,
    responses(
        (status = 200, description = "Authenticated", body = AuthGithubResponse),
        (status = 500, description = "Token exchange failed", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[post("/api/auth/github/token")]
/// Exchange a GitHub access token for a Toolyard session.
pub async fn auth_github_token(
    state: web::Data<AppState>,
    payload: web::Json<AuthGithubTokenRequest>,
) -> ApiResult<HttpResponse> {
    let pool = state.pool.clone();
    let auth = state.auth.clone();
    let token_cipher = state.token_cipher.clone();
    let payload = payload.into_inner();
    let response = web::block(move || {
        let client = Client::new();
        let github_user = fetch_github_user(&client, &auth, &payload.access_token)?;
        let mut conn = pool.get()?;
        persist_auth_session(
            &mut conn,
            &auth,
            &token_cipher,
            github_user,
            payload.access_token,
        )
    })
    .await??;
    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Authenticated user", body = AuthUser),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[get("/api/auth/me")]
/// Fetch the current authenticated user.
pub async fn auth_me(state: web::Data<AppState>, req: HttpRequest) -> ApiResult<HttpResponse> {
    let context = require_auth(&state, &req).await?;
    Ok(HttpResponse::Ok().json(AuthUser::from(context.user)))
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "Refreshed profile", body = AuthUser),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 500, description = "GitHub lookup failed", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[post("/api/auth/refresh")]
/// Re-read the GitHub profile behind the session and refresh login and role.
pub async fn auth_refresh(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> ApiResult<HttpResponse> {
    let context = require_auth(&state, &req).await?;
    let pool = state.pool.clone();
    let auth = state.auth.clone();
    let token_cipher = state.token_cipher.clone();
    let user = web::block(move || {
        let github_token = token_cipher
            .decrypt(&context.session.github_token)
            .map_err(|err| ApiError::Unauthorized(format!("stored token unusable: {err}")))?;
        let github_user = fetch_github_user(&Client::new(), &auth, &github_token)?;
        if github_user.id.to_string() != context.user.github_id {
            return Err(ApiError::Unauthorized(
                "GitHub token belongs to another account".to_string(),
            ));
        }
        let mut conn = pool.get()?;
        upsert_user(&mut conn, &auth, &github_user)
    })
    .await??;
    Ok(HttpResponse::Ok().json(AuthUser::from(user)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::configure;
    use crate::routes::test_support::*;
    use actix_web::{App, test};
    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;

    fn user_body(id: u64, login: &str) -> String {
        format!(r#"{{"id":{id},"login":"{login}"}}"#)
    }

    #[actix_web::test]
    async fn auth_config_returns_payload() {
        let test_app = offline_app();
        let app = test::init_service(
            App::new()
                .app_data(test_app.state.clone())
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::get()
            .uri("/api/auth/config")
            .to_request();
        let resp: AuthConfigResponse = test::call_and_read_body_json(&app, req).await;

        assert_eq!(resp.client_id, "client-id");
        assert!(resp.authorize_url.contains("authorize"));
        assert_eq!(resp.scopes, vec!["read:user".to_string()]);
        assert!(resp.redirect_uri.contains("/auth/callback"));
    }

    #[actix_web::test]
    async fn resolve_role_promotes_listed_logins_only() {
        let auth = test_auth_config("https://github.com/login/oauth", "https://api.github.com");
        assert_eq!(resolve_role(&auth, "Root", None), "admin");
        assert_eq!(resolve_role(&auth, "octo", None), "user");
        assert_eq!(resolve_role(&auth, "octo", Some("admin")), "admin");
    }

    #[actix_web::test]
    async fn auth_github_creates_session_with_encrypted_token() {
        let server = MockServer::start();
        let token_mock = server.mock(|when, then| {
            when.method(POST).path("/oauth/access_token");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"access_token":"gh-token"}"#);
        });
        let user_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/user")
                .header("authorization", "Bearer gh-token");
            then.status(200)
                .header("content-type", "application/json")
                .body(user_body(123, "octo"));
        });

        let Some(test_app) =
            db_app_with_auth(test_auth_config(&server.url("/oauth"), &server.url("/api")))
        else {
            return;
        };
        let state = test_app.state.clone();
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;
        let payload = AuthGithubRequest {
            code: "code-123".to_string(),
            redirect_uri: None,
        };
        let req = test::TestRequest::post()
            .uri("/api/auth/github")
            .set_json(&payload)
            .to_request();
        let resp: AuthGithubResponse = test::call_and_read_body_json(&app, req).await;

        token_mock.assert();
        user_mock.assert();
        assert_eq!(resp.user.login, "octo");
        assert_eq!(resp.user.role, "user");
        assert!(!resp.token.is_empty());

        let mut conn = state.pool.get().expect("conn");
        let stored: AuthSession = auth_sessions::table.first(&mut conn).expect("session");
        assert_ne!(stored.github_token, "gh-token");
        let decrypted = state
            .token_cipher
            .decrypt(&stored.github_token)
            .expect("decrypt");
        assert_eq!(decrypted, "gh-token");
    }

    #[actix_web::test]
    async fn auth_github_token_promotes_admin_and_reuses_user() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/user")
                .header("authorization", "Bearer gh-token");
            then.status(200)
                .header("content-type", "application/json")
                .body(user_body(777, "root"));
        });

        let Some(test_app) =
            db_app_with_auth(test_auth_config(&server.url("/oauth"), &server.url("/api")))
        else {
            return;
        };
        let state = test_app.state.clone();
        {
            let mut conn = state.pool.get().expect("conn");
            diesel::insert_into(users::table)
                .values(&User {
                    id: "usr-existing".to_string(),
                    github_id: "777".to_string(),
                    github_login: "old-name".to_string(),
                    role: "user".to_string(),
                    created_at: now(),
                })
                .execute(&mut conn)
                .expect("seed user");
        }
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/api/auth/github/token")
            .set_json(&AuthGithubTokenRequest {
                access_token: "gh-token".to_string(),
            })
            .to_request();
        let resp: AuthGithubResponse = test::call_and_read_body_json(&app, req).await;

        assert_eq!(resp.user.id, "usr-existing");
        assert_eq!(resp.user.login, "root");
        assert_eq!(resp.user.role, "admin");
    }

    #[actix_web::test]
    async fn auth_github_reports_upstream_errors() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/oauth/access_token");
            then.status(500).body("boom");
        });
        let test_app = offline_app();
        let mut state = (*test_app.state.get_ref()).clone();
        state.auth = test_auth_config(&server.url("/oauth"), &server.url("/api"));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/api/auth/github")
            .set_json(&AuthGithubRequest {
                code: "code-err".to_string(),
                redirect_uri: None,
            })
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 500);
    }

    #[actix_web::test]
    async fn auth_me_rejects_unknown_session_and_returns_user() {
        let Some(test_app) = db_app() else {
            return;
        };
        let status = call_status(
            &test_app.state,
            test::TestRequest::get()
                .uri("/api/auth/me")
                .insert_header(("Authorization", "Bearer nope")),
        )
        .await;
        assert_eq!(status, 401);

        let header = seed_session(&test_app.state, "pilot", UserRole::User);
        let app = test::init_service(
            App::new()
                .app_data(test_app.state.clone())
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::get()
            .uri("/api/auth/me")
            .insert_header(header)
            .to_request();
        let resp: AuthUser = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp.login, "pilot");
        assert_eq!(resp.role, "user");
    }

    #[actix_web::test]
    async fn auth_refresh_updates_login_from_stored_token() {
        let server = MockServer::start();
        let user_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/user")
                .header("authorization", "Bearer gh-token");
            then.status(200)
                .header("content-type", "application/json")
                .body(user_body(0, "renamed"));
        });
        let Some(test_app) =
            db_app_with_auth(test_auth_config(&server.url("/oauth"), &server.url("/api")))
        else {
            return;
        };
        let header = seed_session(&test_app.state, "pilot", UserRole::User);
        {
            let mut conn = test_app.state.pool.get().expect("conn");
            diesel::update(users::table.find("usr-pilot"))
                .set(users::github_id.eq("0"))
                .execute(&mut conn)
                .expect("align github id");
        }
        let app = test::init_service(
            App::new()
                .app_data(test_app.state.clone())
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/api/auth/refresh")
            .insert_header(header)
            .to_request();
        let resp: AuthUser = test::call_and_read_body_json(&app, req).await;

        user_mock.assert();
        assert_eq!(resp.id, "usr-pilot");
        assert_eq!(resp.login, "renamed");
    }
}
