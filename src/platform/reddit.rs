//! Reddit OAuth API client
//!
//! This module implements [`Platform`] over HTTP, including:
//! - Password-grant authentication with token caching and refresh
//! - Listing fetches with manual redirect handling
//! - Link and self-post submission
//! - Mapping of HTTP statuses and API error triples into [`PlatformError`]

use crate::config::{LoginConfig, PlatformConfig};
use crate::platform::traits::{Platform, PlatformError, PlatformResult};
use crate::platform::{PostHandle, Submission};
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::header::{HeaderMap, LOCATION, RETRY_AFTER};
use reqwest::{redirect::Policy, Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Tokens are refreshed this long before the platform would expire them
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Lifetime assumed when the token response omits `expires_in`
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

/// Upper bound on a token lifetime reported by the server
const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 3600);

/// Listings return permalinks relative to this origin
const PERMALINK_ORIGIN: &str = "https://www.reddit.com";

/// Structured code the submit endpoint uses for an already-submitted link
const DUPLICATE_CODE: &str = "ALREADY_SUB";

/// Message fallback when no structured code is present
const DUPLICATE_MESSAGE: &str = "already been submitted";

const RATE_LIMIT_CODE: &str = "RATELIMIT";

#[derive(Debug)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn new(value: String, now: Instant, expires_in: Option<u64>) -> Self {
        let lifetime = expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME)
            .min(MAX_TOKEN_LIFETIME);

        Self {
            value,
            expires_at: now + lifetime,
        }
    }

    fn is_fresh(&self, now: Instant) -> bool {
        now + TOKEN_REFRESH_MARGIN < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
struct Thing {
    kind: String,
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RawSubmission {
    id: String,
    subreddit: String,
    title: Option<String>,
    permalink: Option<String>,
    #[serde(default)]
    is_self: bool,
    selftext: Option<String>,
    url: Option<String>,
    created_utc: Option<f64>,
}

impl From<RawSubmission> for Submission {
    fn from(raw: RawSubmission) -> Self {
        let permalink = raw.permalink.map(|p| {
            if p.starts_with('/') {
                format!("{}{}", PERMALINK_ORIGIN, p)
            } else {
                p
            }
        });

        Submission {
            id: raw.id,
            subreddit: raw.subreddit,
            title: raw.title,
            permalink,
            is_self: raw.is_self,
            selftext: raw.selftext,
            url: raw.url,
            created: raw
                .created_utc
                .and_then(|secs| DateTime::from_timestamp(secs as i64, 0)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    json: SubmitJson,
}

#[derive(Debug, Deserialize)]
struct SubmitJson {
    #[serde(default)]
    errors: Vec<Vec<serde_json::Value>>,
    data: Option<SubmitData>,
}

#[derive(Debug, Deserialize)]
struct SubmitData {
    id: Option<String>,
    name: Option<String>,
    url: Option<String>,
}

/// Builds an HTTP client with proper configuration
///
/// Redirects are never followed: a subreddit that does not exist answers with
/// a redirect to the search page, which must be seen as such.
pub fn build_http_client(config: &PlatformConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Client for the Reddit OAuth API
pub struct RedditClient {
    http: Client,
    auth_url: String,
    api_url: String,
    credentials: Option<LoginConfig>,
    token: Mutex<Option<AccessToken>>,
}

impl RedditClient {
    /// Creates an unauthenticated client; call [`Platform::authenticate`] before use
    pub fn new(config: &PlatformConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: build_http_client(config)?,
            auth_url: config.auth_url.trim_end_matches('/').to_string(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            credentials: None,
            token: Mutex::new(None),
        })
    }

    /// Exchanges the account credentials for a bearer token
    async fn request_token(&self, credentials: &LoginConfig) -> PlatformResult<AccessToken> {
        let response = self
            .http
            .post(format!("{}/api/v1/access_token", self.auth_url))
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(&[
                ("grant_type", "password"),
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
            ])
            .send()
            .await
            .map_err(|e| PlatformError::from_reqwest(&e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(PlatformError::InvalidCredentials(
                "client id or secret rejected".to_string(),
            ));
        }
        let response = check_status("access_token", response).await?;

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| PlatformError::from_reqwest(&e))?;

        // Bad username/password comes back as 200 with an error field
        if let Some(error) = body.error {
            return Err(if error == "invalid_grant" {
                PlatformError::InvalidCredentials(format!(
                    "login rejected for {}",
                    credentials.username
                ))
            } else {
                PlatformError::Api {
                    status: Some(status.as_u16()),
                    code: error.clone(),
                    message: format!("token request failed: {}", error),
                }
            });
        }

        let value = body.access_token.ok_or_else(|| {
            PlatformError::Unclassified("token response had no access_token".to_string())
        })?;

        Ok(AccessToken::new(value, Instant::now(), body.expires_in))
    }

    /// Returns a usable bearer token, refreshing it if it is about to expire
    async fn bearer(&self) -> PlatformResult<String> {
        let mut token = self.token.lock().await;

        if let Some(current) = token.as_ref() {
            if current.is_fresh(Instant::now()) {
                return Ok(current.value.clone());
            }
        }

        let credentials = self.credentials.as_ref().ok_or_else(|| {
            PlatformError::InvalidCredentials("client is not authenticated".to_string())
        })?;

        tracing::debug!("Refreshing access token for {}", credentials.username);
        let fresh = self.request_token(credentials).await?;
        let value = fresh.value.clone();
        *token = Some(fresh);
        Ok(value)
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    /// Sends an authorized request, re-authenticating once on HTTP 401
    async fn execute<F>(&self, build: F) -> PlatformResult<Response>
    where
        F: Fn(&str) -> RequestBuilder + Send + Sync,
    {
        let token = self.bearer().await?;
        let response = build(&token)
            .send()
            .await
            .map_err(|e| PlatformError::from_reqwest(&e))?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::debug!("Access token rejected, re-authenticating");
        self.invalidate_token().await;
        let token = self.bearer().await?;
        build(&token)
            .send()
            .await
            .map_err(|e| PlatformError::from_reqwest(&e))
    }

    /// Fetches one listing page and converts its link children
    async fn get_listing(
        &self,
        path: &str,
        resource: &str,
        limit: u32,
    ) -> PlatformResult<Vec<Submission>> {
        let url = format!("{}{}", self.api_url, path);
        let limit = limit.to_string();

        let response = self
            .execute(|token| {
                self.http
                    .get(&url)
                    .query(&[("limit", limit.as_str()), ("raw_json", "1")])
                    .bearer_auth(token)
            })
            .await?;
        let response = check_status(resource, response).await?;

        let listing: Listing = response
            .json()
            .await
            .map_err(|e| PlatformError::from_reqwest(&e))?;

        Ok(parse_children(listing.data.children))
    }

    /// Posts to the submit endpoint; `field` is `url` for links and `text` for self-posts
    async fn submit(
        &self,
        community: &str,
        title: &str,
        kind: &str,
        field: &str,
        value: &str,
    ) -> PlatformResult<PostHandle> {
        let url = format!("{}/api/submit", self.api_url);
        let form = [
            ("sr", community),
            ("kind", kind),
            ("title", title),
            (field, value),
            ("api_type", "json"),
            ("resubmit", "false"),
        ];

        let response = self
            .execute(|token| self.http.post(&url).form(&form).bearer_auth(token))
            .await?;
        let response = check_status(&format!("r/{}", community), response).await?;
        let status = response.status().as_u16();

        let body: SubmitResponse = response
            .json()
            .await
            .map_err(|e| PlatformError::from_reqwest(&e))?;

        if let Some(error) = classify_submit_errors(status, &body.json.errors) {
            return Err(error);
        }

        let data = body.json.data.ok_or_else(|| {
            PlatformError::Unclassified("submit response had no post data".to_string())
        })?;

        match (data.id.or(data.name), data.url) {
            (Some(id), Some(url)) => Ok(PostHandle { id, url }),
            _ => Err(PlatformError::Unclassified(
                "submit response was missing the post id or url".to_string(),
            )),
        }
    }
}

#[async_trait]
impl Platform for RedditClient {
    async fn authenticate(&mut self, credentials: &LoginConfig) -> PlatformResult<()> {
        let token = self.request_token(credentials).await?;
        *self.token.get_mut() = Some(token);
        self.credentials = Some(credentials.clone());
        Ok(())
    }

    async fn fetch_recent(&self, community: &str, limit: u32) -> PlatformResult<Vec<Submission>> {
        self.get_listing(
            &format!("/r/{}/new", community),
            &format!("r/{}", community),
            limit,
        )
        .await
    }

    async fn fetch_aggregate_hot(&self, feed: &str, limit: u32) -> PlatformResult<Vec<Submission>> {
        self.get_listing(&format!("/r/{}/hot", feed), &format!("r/{}", feed), limit)
            .await
    }

    async fn submit_link(
        &self,
        community: &str,
        title: &str,
        url: &str,
    ) -> PlatformResult<PostHandle> {
        self.submit(community, title, "link", "url", url).await
    }

    async fn submit_text(
        &self,
        community: &str,
        title: &str,
        body: &str,
    ) -> PlatformResult<PostHandle> {
        self.submit(community, title, "self", "text", body).await
    }
}

/// Maps a non-success response to its error kind
///
/// # Status Mapping
///
/// | Status | Kind |
/// |--------|------|
/// | 3xx | Redirected |
/// | 401 | InvalidCredentials |
/// | 403 | Forbidden |
/// | 404 | NotFound |
/// | 429 | RateLimited |
/// | 5xx | Server |
/// | other | Api |
async fn check_status(resource: &str, response: Response) -> PlatformResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status.is_redirection() {
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        return Err(PlatformError::Redirected {
            resource: resource.to_string(),
            location,
        });
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(PlatformError::RateLimited {
            retry_after: retry_after(response.headers()),
        });
    }

    if status.is_server_error() {
        return Err(PlatformError::Server {
            status: status.as_u16(),
        });
    }

    let reason = error_reason(response).await;
    let described = match &reason {
        Some(reason) => format!("{} ({})", resource, reason),
        None => resource.to_string(),
    };

    Err(match status {
        StatusCode::UNAUTHORIZED => PlatformError::InvalidCredentials(described),
        StatusCode::FORBIDDEN => PlatformError::Forbidden(described),
        StatusCode::NOT_FOUND => PlatformError::NotFound(described),
        _ => PlatformError::Api {
            status: Some(status.as_u16()),
            code: format!("HTTP_{}", status.as_u16()),
            message: reason.unwrap_or_else(|| {
                status.canonical_reason().unwrap_or("unexpected status").to_string()
            }),
        },
    })
}

/// Pulls the `reason` (or `message`) field out of an error body, if any
async fn error_reason(response: Response) -> Option<String> {
    let body: serde_json::Value = response.json().await.ok()?;
    body.get("reason")
        .or_else(|| body.get("message"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

/// Reads the wait hint from `Retry-After` or `x-ratelimit-reset`
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .or_else(|| headers.get("x-ratelimit-reset"))
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
}

/// Converts listing children into submissions, dropping anything unusable
fn parse_children(children: Vec<Thing>) -> Vec<Submission> {
    children
        .into_iter()
        .filter(|thing| thing.kind == "t3")
        .filter_map(|thing| match serde_json::from_value::<RawSubmission>(thing.data) {
            Ok(raw) => Some(Submission::from(raw)),
            Err(e) => {
                tracing::warn!("Failed to get submission ID. Skipping... ({})", e);
                None
            }
        })
        .collect()
}

/// Maps the submit endpoint's `[code, message, field]` error triples
///
/// The structured code is authoritative. Matching the message text is a
/// fallback for responses that carry no code and will break if the platform
/// rewords it.
fn classify_submit_errors(status: u16, errors: &[Vec<serde_json::Value>]) -> Option<PlatformError> {
    let first = errors.first()?;
    let text = |i: usize| {
        first
            .get(i)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };
    let code = text(0);
    let message = text(1);

    if code == DUPLICATE_CODE || message.contains(DUPLICATE_MESSAGE) {
        return Some(PlatformError::DuplicateContent(message));
    }

    if code == RATE_LIMIT_CODE {
        return Some(PlatformError::RateLimited { retry_after: None });
    }

    Some(PlatformError::Api {
        status: Some(status),
        code,
        message,
    })
}
