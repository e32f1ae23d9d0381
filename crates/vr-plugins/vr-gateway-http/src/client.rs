//! `reqwest` implementation of the gateway ports.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use vr_core::{
    comments_from_page, CreateNewsPayload, NewComment, NewsGateway, NewsId, PageRequest, RawComment, RawNews, Result,
    TokenSource, UserAccount, UserGateway, VerityError, VoteSummary,
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Trims whitespace and trailing slashes; only `http` and `https` are accepted.
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(VerityError::Config("base URL is empty".into()));
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(VerityError::Config(format!("base URL '{trimmed}' must start with http:// or https://")));
    }
    Ok(trimmed.to_string())
}

pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenSource>,
}

impl HttpGateway {
    pub fn new(base_url: &str, timeout: Duration, tokens: Arc<dyn TokenSource>) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| VerityError::Config(format!("building HTTP client: {e}")))?;

        Ok(Self { client, base_url, tokens })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Every request goes through here so the bearer token is never forgotten.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "outbound request");
        let builder = self.client.request(method, url);
        match self.tokens.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends and returns the body of a 2xx response.
    async fn execute(&self, request: RequestBuilder) -> Result<Vec<u8>> {
        let response = request.send().await.map_err(|e| VerityError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response.bytes().await.map_err(|e| VerityError::Transport(e.to_string()))?;
        if !status.is_success() {
            let message = error_message(&body);
            warn!(status = status.as_u16(), ?message, "request rejected");
            return Err(VerityError::Status { status: status.as_u16(), message });
        }
        Ok(body.to_vec())
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let body = self.execute(request).await?;
        serde_json::from_slice(&body).map_err(|e| VerityError::Decode(e.to_string()))
    }

    /// An empty or unreadable body is "no entity", not an error.
    async fn fetch_optional<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Option<T>> {
        let body = self.execute(request).await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        Ok(serde_json::from_slice::<Option<T>>(&body).unwrap_or_else(|e| {
            warn!(error = %e, "ignoring unreadable response entity");
            None
        }))
    }

    async fn fetch_news_list(&self, path: &str) -> Result<Vec<RawNews>> {
        let body: Value = self.fetch(self.request(Method::GET, path)).await?;
        news_list(body)
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

fn error_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ErrorBody>(body).ok()?.message
}

/// Entries that are not news objects are dropped; a non-array body is malformed.
fn news_list(body: Value) -> Result<Vec<RawNews>> {
    let Value::Array(items) = body else {
        return Err(VerityError::Decode("expected an array of news".into()));
    };
    let total = items.len();
    let list: Vec<RawNews> = items.into_iter().filter_map(|v| serde_json::from_value(v).ok()).collect();
    if list.len() != total {
        warn!(dropped = total - list.len(), "skipped malformed news entries");
    }
    Ok(list)
}

#[async_trait]
impl NewsGateway for HttpGateway {
    async fn list_news(&self) -> Result<Vec<RawNews>> {
        self.fetch_news_list("/api/news").await
    }

    async fn get_news(&self, id: NewsId) -> Result<RawNews> {
        self.fetch(self.request(Method::GET, &format!("/api/news/{id}"))).await
    }

    async fn list_removed_news(&self) -> Result<Vec<RawNews>> {
        self.fetch_news_list("/api/news/removed").await
    }

    async fn create_news(&self, payload: &CreateNewsPayload) -> Result<Option<RawNews>> {
        self.fetch_optional(self.request(Method::POST, "/api/news").json(payload)).await
    }

    async fn remove_news(&self, id: NewsId) -> Result<()> {
        self.execute(self.request(Method::DELETE, &format!("/api/news/{id}"))).await?;
        Ok(())
    }

    async fn list_comments(&self, news_id: NewsId, page: PageRequest) -> Result<Vec<RawComment>> {
        let request = self
            .request(Method::GET, &format!("/api/comments/news/{news_id}"))
            .query(&[("page", page.page), ("size", page.size)]);
        let body: Value = self.fetch(request).await?;
        Ok(comments_from_page(body))
    }

    async fn create_comment(&self, comment: &NewComment) -> Result<Option<RawComment>> {
        self.fetch_optional(self.request(Method::POST, "/api/comments").json(comment)).await
    }

    async fn delete_comment(&self, news_id: NewsId, comment_id: i64) -> Result<()> {
        let path = format!("/api/news/{news_id}/comments/{comment_id}");
        self.execute(self.request(Method::DELETE, &path)).await?;
        Ok(())
    }

    async fn vote_summary(&self, news_id: NewsId) -> Result<VoteSummary> {
        self.fetch(self.request(Method::GET, &format!("/api/comments/news/{news_id}/summary"))).await
    }
}

#[async_trait]
impl UserGateway for HttpGateway {
    async fn list_users(&self) -> Result<Vec<UserAccount>> {
        self.fetch(self.request(Method::GET, "/api/v1/users")).await
    }

    async fn promote_user(&self, id: i64) -> Result<UserAccount> {
        self.fetch(self.request(Method::PUT, &format!("/api/v1/users/{id}/promote"))).await
    }

    async fn demote_user(&self, id: i64) -> Result<UserAccount> {
        self.fetch(self.request(Method::PUT, &format!("/api/v1/users/{id}/demote"))).await
    }
}
