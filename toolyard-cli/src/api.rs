//! Thin HTTP client for the Toolyard API.

use crate::CliResult;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use toolyard_core::{ListingTier, Page, ToolStatus};

/// Tool row as listed by the public catalog.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ToolCard {
    pub(crate) name: String,
    pub(crate) slug: String,
    pub(crate) website_url: String,
    pub(crate) tagline: Option<String>,
    pub(crate) is_featured: bool,
    #[serde(default)]
    pub(crate) categories: Vec<TermRef>,
}

/// Linked taxonomy entry.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TermRef {
    pub(crate) name: String,
}

/// One tool to create through the admin API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ToolImportRow {
    pub(crate) name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) slug: Option<String>,
    pub(crate) website_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) tagline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) logo_url: Option<String>,
    #[serde(default = "default_status")]
    pub(crate) status: ToolStatus,
    #[serde(default = "default_tier")]
    pub(crate) tier: ListingTier,
    #[serde(default)]
    pub(crate) is_featured: bool,
    #[serde(default)]
    pub(crate) category_ids: Vec<String>,
    #[serde(default)]
    pub(crate) tag_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) location_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) shop_id: Option<String>,
}

fn default_status() -> ToolStatus {
    ToolStatus::Pending
}

fn default_tier() -> ListingTier {
    ListingTier::Free
}

#[derive(Debug, Deserialize)]
struct CreatedTool {
    tool: CreatedToolRow,
}

#[derive(Debug, Deserialize)]
struct CreatedToolRow {
    slug: String,
}

#[derive(Debug, Serialize)]
struct ScheduleQueueRequest {
    limit: Option<i64>,
}

/// Tool placed on the publication calendar.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ScheduledTool {
    pub(crate) slug: String,
    pub(crate) published_at: String,
}

#[derive(Debug, Deserialize)]
struct ScheduleQueueResponse {
    scheduled: Vec<ScheduledTool>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Catalog filters accepted by `GET /api/tools`.
#[derive(Debug, Clone, Default)]
pub(crate) struct ToolQuery {
    pub(crate) q: Option<String>,
    pub(crate) category: Option<String>,
    pub(crate) page: Option<i64>,
}

impl ToolQuery {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(q) = self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            pairs.push(("q", q.to_string()));
        }
        if let Some(category) = self.category.as_deref().map(str::trim) {
            if !category.is_empty() {
                pairs.push(("category", category.to_string()));
            }
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        pairs
    }
}

/// Turn non-success responses into errors carrying the server message.
pub(crate) async fn check_status(response: Response) -> CliResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|error| error.message)
        .unwrap_or_else(|_| body.trim().to_string());
    let code = status.as_u16();
    if message.is_empty() {
        Err(format!("server returned {code}").into())
    } else {
        Err(format!("server returned {code}: {message}").into())
    }
}

/// API client bound to one server and, optionally, one session token.
pub(crate) struct ApiClient {
    client: Client,
    server_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Build a client for `server_url`.
    pub(crate) fn new(server_url: &str, token: Option<String>) -> CliResult<Self> {
        let client = Client::builder().user_agent("toolyard-cli").build()?;
        Ok(Self {
            client,
            server_url: crate::auth::normalize_server_url(server_url)?,
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.server_url)
    }

    fn bearer(&self) -> CliResult<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| "this command needs a session; run `toolyard login` first".into())
    }

    /// Fetch one page of the public catalog.
    pub(crate) async fn list_tools(&self, query: &ToolQuery) -> CliResult<Page<ToolCard>> {
        let response = self
            .client
            .get(self.url("/api/tools"))
            .query(&query.pairs())
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }

    /// Create one tool; returns its slug.
    pub(crate) async fn create_tool(&self, row: &ToolImportRow) -> CliResult<String> {
        let response = self
            .client
            .post(self.url("/api/admin/tools"))
            .bearer_auth(self.bearer()?)
            .json(row)
            .send()
            .await?;
        let created: CreatedTool = check_status(response).await?.json().await?;
        Ok(created.tool.slug)
    }

    /// Schedule pending free tools; returns what was placed.
    pub(crate) async fn schedule_queue(&self, limit: Option<i64>) -> CliResult<Vec<ScheduledTool>> {
        let response = self
            .client
            .post(self.url("/api/admin/tools/schedule-queue"))
            .bearer_auth(self.bearer()?)
            .json(&ScheduleQueueRequest { limit })
            .send()
            .await?;
        let body: ScheduleQueueResponse = check_status(response).await?.json().await?;
        Ok(body.scheduled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;
    use serde_json::json;

    #[test]
    fn import_rows_default_to_pending_free() {
        let row: ToolImportRow = serde_json::from_value(json!({
            "name": "Linear",
            "websiteUrl": "linear.app"
        }))
        .expect("row");
        assert_eq!(row.status, ToolStatus::Pending);
        assert_eq!(row.tier, ListingTier::Free);
        assert!(row.category_ids.is_empty());

        let body = serde_json::to_value(&row).expect("json");
        assert_eq!(body["status"], "pending");
        assert_eq!(body["tier"], "free");
        assert!(body.get("slug").is_none());
    }

    #[test]
    fn tool_query_skips_blank_filters() {
        let query = ToolQuery {
            q: Some("  ".to_string()),
            category: Some("design".to_string()),
            page: Some(2),
        };
        assert_eq!(
            query.pairs(),
            vec![("category", "design".to_string()), ("page", "2".to_string())]
        );
    }

    #[tokio::test]
    async fn list_tools_sends_filters() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/tools")
                    .query_param("q", "notes")
                    .query_param("category", "productivity");
                then.status(200).json_body(json!({
                    "rows": [{
                        "id": "tool-1",
                        "name": "Notely",
                        "slug": "notely",
                        "websiteUrl": "https://notely.app",
                        "tagline": "Notes",
                        "logoUrl": null,
                        "isFeatured": true,
                        "pageviews": 3,
                        "publishedAt": "2026-01-01T09:00:00",
                        "categories": [{ "id": "category-productivity", "name": "Productivity", "slug": "productivity" }]
                    }],
                    "total": 1,
                    "page": 1,
                    "perPage": 24,
                    "pageCount": 1
                }));
            })
            .await;

        let client = ApiClient::new(&server.base_url(), None).expect("client");
        let page = client
            .list_tools(&ToolQuery {
                q: Some("notes".to_string()),
                category: Some("productivity".to_string()),
                page: None,
            })
            .await
            .expect("page");
        mock.assert_async().await;
        assert_eq!(page.total, 1);
        assert_eq!(page.rows[0].slug, "notely");
        assert_eq!(page.rows[0].categories[0].name, "Productivity");
    }

    #[tokio::test]
    async fn admin_calls_require_a_session() {
        let client = ApiClient::new("http://127.0.0.1:9", None).expect("client");
        let err = client.schedule_queue(None).await.expect_err("no session");
        assert!(err.to_string().contains("toolyard login"));
    }

    #[tokio::test]
    async fn create_tool_sends_bearer_and_reports_errors() {
        let server = MockServer::start_async().await;
        let created = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/admin/tools")
                    .header("authorization", "Bearer tok")
                    .json_body_partial(r#"{ "name": "Linear" }"#);
                then.status(201).json_body(json!({
                    "tool": { "id": "tool-linear", "slug": "linear" },
                    "categories": [],
                    "tags": []
                }));
            })
            .await;
        let conflict = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/admin/tools")
                    .json_body_partial(r#"{ "name": "Dup" }"#);
                then.status(409)
                    .json_body(json!({ "message": "website already listed" }));
            })
            .await;

        let client = ApiClient::new(&server.base_url(), Some("tok".to_string())).expect("client");
        let row = |name: &str| ToolImportRow {
            name: name.to_string(),
            slug: None,
            website_url: format!("https://{}.app", name.to_lowercase()),
            tagline: None,
            description: None,
            logo_url: None,
            status: ToolStatus::Pending,
            tier: ListingTier::Free,
            is_featured: false,
            category_ids: Vec::new(),
            tag_ids: Vec::new(),
            location_id: None,
            shop_id: None,
        };

        let slug = client.create_tool(&row("Linear")).await.expect("created");
        assert_eq!(slug, "linear");
        let err = client.create_tool(&row("Dup")).await.expect_err("conflict");
        assert_eq!(err.to_string(), "server returned 409: website already listed");
        created.assert_async().await;
        conflict.assert_async().await;
    }

    #[tokio::test]
    async fn schedule_queue_returns_scheduled_tools() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/admin/tools/schedule-queue")
                    .json_body(json!({ "limit": 2 }));
                then.status(200).json_body(json!({
                    "scheduled": [
                        { "id": "tool-a", "slug": "a", "publishedAt": "2026-03-02T09:00:00" },
                        { "id": "tool-b", "slug": "b", "publishedAt": "2026-03-03T09:00:00" }
                    ]
                }));
            })
            .await;

        let client = ApiClient::new(&server.base_url(), Some("tok".to_string())).expect("client");
        let scheduled = client.schedule_queue(Some(2)).await.expect("scheduled");
        mock.assert_async().await;
        let slugs: Vec<&str> = scheduled.iter().map(|tool| tool.slug.as_str()).collect();
        assert_eq!(slugs, vec!["a", "b"]);
        assert_eq!(scheduled[1].published_at, "2026-03-03T09:00:00");
    }
}
