//! Integration tests for the Reddit client and the mirror loop
//!
//! These tests use wiremock to stand in for both the token endpoint and the
//! OAuth API, and drive the real HTTP client end-to-end.

use mirrorbot::config::{parse_config, Config};
use mirrorbot::mirror::Coordinator;
use mirrorbot::{Platform, PlatformError, RedditClient};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing every endpoint at the mock server
fn create_test_config(server_uri: &str, subreddits: &[&str]) -> Config {
    let subreddits = subreddits
        .iter()
        .map(|s| format!("\"{}\"", s))
        .collect::<Vec<_>>()
        .join(", ");

    parse_config(&format!(
        r#"
[main]
verbose = true
subreddits = [{subreddits}]
post-to = "mirror_sub"
scrape-limit = 10

[logging]
error-logging = false

[login]
username = "bot"
password = "secret"
client-id = "id"
client-secret = "shh"

[platform]
auth-url = "{server_uri}"
api-url = "{server_uri}"
request-timeout-secs = 5

[retry]
backoff-secs = 0
skip-delay-secs = 0
"#
    ))
    .expect("test config should be valid")
}

fn token_body(token: &str) -> serde_json::Value {
    json!({
        "access_token": token,
        "token_type": "bearer",
        "expires_in": 3600,
        "scope": "*"
    })
}

fn post(id: &str, subreddit: &str) -> serde_json::Value {
    json!({
        "kind": "t3",
        "data": {
            "id": id,
            "subreddit": subreddit,
            "title": format!("Title {}", id),
            "permalink": format!("/r/{}/comments/{}/title/", subreddit, id),
            "is_self": true,
            "selftext": "see https://www.reddit.com/r/rust/wiki",
            "url": format!("https://www.reddit.com/r/{}/comments/{}/title/", subreddit, id),
            "created_utc": 1700000000.0
        }
    })
}

fn listing(children: Vec<serde_json::Value>) -> serde_json::Value {
    json!({ "kind": "Listing", "data": { "children": children } })
}

fn submit_ok(id: &str) -> serde_json::Value {
    json!({
        "json": {
            "errors": [],
            "data": {
                "id": id,
                "name": format!("t3_{}", id),
                "url": format!("https://www.reddit.com/r/mirror_sub/comments/{}/", id)
            }
        }
    })
}

fn submit_error(code: &str, message: &str) -> serde_json::Value {
    json!({ "json": { "errors": [[code, message, "url"]] } })
}

async fn mount_token(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .and(body_string_contains("grant_type=password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(token)))
        .mount(server)
        .await;
}

/// Returns a client that has already logged in against the mock server
async fn logged_in_client(server: &MockServer) -> RedditClient {
    mount_token(server, "tok1").await;
    let config = create_test_config(&server.uri(), &["rust"]);
    let mut client = RedditClient::new(&config.platform).expect("client should build");
    client
        .authenticate(&config.login)
        .await
        .expect("login should succeed");
    client
}

#[tokio::test]
async fn test_authenticate_success() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server, "tok1").await;

    Mock::given(method("GET"))
        .and(path("/r/rust/new"))
        .and(header("authorization", "Bearer tok1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(vec![])))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &["rust"]);
    let mut client = RedditClient::new(&config.platform).unwrap();

    client.authenticate(&config.login).await.unwrap();
    let posts = client.fetch_recent("rust", 1).await.unwrap();

    assert!(posts.is_empty());
}

#[tokio::test]
async fn test_authenticate_bad_password() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "invalid_grant" })))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &["rust"]);
    let mut client = RedditClient::new(&config.platform).unwrap();

    let result = client.authenticate(&config.login).await;

    assert!(matches!(result, Err(PlatformError::InvalidCredentials(_))));
}

#[tokio::test]
async fn test_authenticate_bad_client_secret() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &["rust"]);
    let mut client = RedditClient::new(&config.platform).unwrap();

    let result = client.authenticate(&config.login).await;

    assert!(matches!(result, Err(PlatformError::InvalidCredentials(_))));
}

#[tokio::test]
async fn test_probe_classification() {
    let mock_server = MockServer::start().await;
    let client = logged_in_client(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/r/banned_sub/new"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "reason": "banned" })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/r/private_sub/new"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({ "reason": "private" })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/r/typo/new"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", "/subreddits/search.json?q=typo"),
        )
        .mount(&mock_server)
        .await;

    let banned = client.fetch_recent("banned_sub", 1).await.unwrap_err();
    assert_eq!(
        banned,
        PlatformError::NotFound("r/banned_sub (banned)".to_string())
    );
    assert!(banned.is_invalid_source());

    let private = client.fetch_recent("private_sub", 1).await.unwrap_err();
    assert!(matches!(private, PlatformError::Forbidden(_)));
    assert!(private.is_invalid_source());

    let typo = client.fetch_recent("typo", 1).await.unwrap_err();
    assert_eq!(
        typo,
        PlatformError::Redirected {
            resource: "r/typo".to_string(),
            location: "/subreddits/search.json?q=typo".to_string(),
        }
    );
}

#[tokio::test]
async fn test_transient_statuses() {
    let mock_server = MockServer::start().await;
    let client = logged_in_client(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/r/busy/new"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/r/broken/new"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let busy = client.fetch_recent("busy", 1).await.unwrap_err();
    assert_eq!(
        busy,
        PlatformError::RateLimited {
            retry_after: Some(Duration::from_secs(7))
        }
    );
    assert!(busy.is_transient());

    let broken = client.fetch_recent("broken", 1).await.unwrap_err();
    assert_eq!(broken, PlatformError::Server { status: 500 });
    assert!(broken.is_transient());
}

#[tokio::test]
async fn test_hot_listing_parsing() {
    let mock_server = MockServer::start().await;
    let client = logged_in_client(&mock_server).await;

    let comment = json!({ "kind": "t1", "data": { "id": "c1", "body": "a comment" } });
    let broken = json!({ "kind": "t3", "data": { "title": "no id" } });

    Mock::given(method("GET"))
        .and(path("/r/news+rust/hot"))
        .and(query_param("limit", "10"))
        .and(query_param("raw_json", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(vec![
            post("a1", "rust"),
            comment,
            broken,
            post("b2", "news"),
        ])))
        .mount(&mock_server)
        .await;

    let posts = client.fetch_aggregate_hot("news+rust", 10).await.unwrap();

    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].id, "a1");
    assert_eq!(posts[0].subreddit, "rust");
    assert_eq!(
        posts[0].permalink.as_deref(),
        Some("https://www.reddit.com/r/rust/comments/a1/title/")
    );
    assert!(posts[0].is_self);
    assert_eq!(posts[0].created.map(|c| c.timestamp()), Some(1_700_000_000));
    assert_eq!(posts[1].id, "b2");
}

#[tokio::test]
async fn test_submit_success() {
    let mock_server = MockServer::start().await;
    let client = logged_in_client(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/api/submit"))
        .and(body_string_contains("kind=link"))
        .and(body_string_contains("sr=mirror_sub"))
        .and(body_string_contains("api_type=json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(submit_ok("xyz")))
        .mount(&mock_server)
        .await;

    let handle = client
        .submit_link("mirror_sub", "A link", "https://example.com/")
        .await
        .unwrap();

    assert_eq!(handle.id, "xyz");
    assert_eq!(
        handle.url,
        "https://www.reddit.com/r/mirror_sub/comments/xyz/"
    );
}

#[tokio::test]
async fn test_submit_error_classification() {
    let mock_server = MockServer::start().await;
    let client = logged_in_client(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/api/submit"))
        .and(body_string_contains("title=dup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(submit_error(
            "ALREADY_SUB",
            "that link has already been submitted",
        )))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/submit"))
        .and(body_string_contains("title=slow"))
        .respond_with(ResponseTemplate::new(200).set_body_json(submit_error(
            "RATELIMIT",
            "you are doing that too much. try again in 9 minutes.",
        )))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/submit"))
        .and(body_string_contains("title=other"))
        .respond_with(ResponseTemplate::new(200).set_body_json(submit_error(
            "SUBREDDIT_NOTALLOWED",
            "you aren't allowed to post there.",
        )))
        .mount(&mock_server)
        .await;

    let dup = client
        .submit_link("mirror_sub", "dup", "https://example.com/")
        .await
        .unwrap_err();
    assert_eq!(
        dup,
        PlatformError::DuplicateContent("that link has already been submitted".to_string())
    );

    let slow = client
        .submit_text("mirror_sub", "slow", "body")
        .await
        .unwrap_err();
    assert_eq!(slow, PlatformError::RateLimited { retry_after: None });

    let other = client
        .submit_text("mirror_sub", "other", "body")
        .await
        .unwrap_err();
    assert!(matches!(
        other,
        PlatformError::Api { ref code, .. } if code == "SUBREDDIT_NOTALLOWED"
    ));
    assert!(!other.is_transient());
}

#[tokio::test]
async fn test_token_refresh_on_401() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("tok1")))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    mount_token(&mock_server, "tok2").await;

    Mock::given(method("GET"))
        .and(path("/r/rust/new"))
        .and(header("authorization", "Bearer tok1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/r/rust/new"))
        .and(header("authorization", "Bearer tok2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(vec![post("a1", "rust")])))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &["rust"]);
    let mut client = RedditClient::new(&config.platform).unwrap();
    client.authenticate(&config.login).await.unwrap();

    let posts = client.fetch_recent("rust", 1).await.unwrap();

    assert_eq!(posts.len(), 1);
}

#[tokio::test]
async fn test_full_mirror_cycle() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server, "tok1").await;

    Mock::given(method("GET"))
        .and(path("/r/rust/new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(vec![post("a1", "rust")])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/r/gone/new"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "reason": "banned" })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/r/rust/hot"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(listing(vec![post("a1", "rust"), post("a2", "rust")])),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/submit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(submit_ok("m1")))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &["rust", "gone"]);
    let client = RedditClient::new(&config.platform).unwrap();
    let mut coordinator = Coordinator::new(config, client);

    coordinator.login().await.unwrap();
    coordinator.validate_sources().await.unwrap();
    assert_eq!(coordinator.sources().names(), vec!["rust".to_string()]);

    let feed = coordinator.sources().feed_expression();
    let first = coordinator.run_cycle(&feed).await;
    assert_eq!(first.fetched, 2);
    assert_eq!(first.submitted, 2);

    let second = coordinator.run_cycle(&feed).await;
    assert_eq!(second.submitted, 0);
    assert_eq!(second.skipped, 2);

    let submits: Vec<_> = mock_server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == "/api/submit")
        .collect();
    assert_eq!(submits.len(), 2);

    // Self-post bodies are rewritten to the canonical host before posting
    let body = String::from_utf8_lossy(&submits[0].body).to_string();
    assert!(body.contains("np.reddit.com"));
    assert!(!body.contains("www.reddit.com"));
}
