//! Scripted in-memory platform for unit tests

use crate::config::{parse_config, Config, LoginConfig};
use crate::platform::traits::{Platform, PlatformError, PlatformResult};
use crate::platform::{PostHandle, Submission};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// A submit call as the platform saw it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitCall {
    pub kind: &'static str,
    pub community: String,
    pub title: String,
    pub content: String,
}

/// Platform whose answers are queued up front
///
/// Each operation pops the next scripted result; once a queue runs dry the
/// operation succeeds with an empty listing or a generated post handle.
#[derive(Default)]
pub struct MockPlatform {
    auth: Mutex<VecDeque<PlatformResult<()>>>,
    probes: Mutex<HashMap<String, VecDeque<PlatformResult<Vec<Submission>>>>>,
    hot: Mutex<VecDeque<PlatformResult<Vec<Submission>>>>,
    submits: Mutex<VecDeque<PlatformResult<PostHandle>>>,
    auth_calls: Mutex<u32>,
    probe_calls: Mutex<Vec<String>>,
    hot_calls: Mutex<Vec<(String, u32)>>,
    submit_calls: Mutex<Vec<SubmitCall>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_auth(self, result: PlatformResult<()>) -> Self {
        self.auth.lock().unwrap().push_back(result);
        self
    }

    pub fn with_probe(self, community: &str, result: PlatformResult<Vec<Submission>>) -> Self {
        self.probes
            .lock()
            .unwrap()
            .entry(community.to_string())
            .or_default()
            .push_back(result);
        self
    }

    pub fn with_hot(self, result: PlatformResult<Vec<Submission>>) -> Self {
        self.hot.lock().unwrap().push_back(result);
        self
    }

    pub fn with_submit(self, result: PlatformResult<PostHandle>) -> Self {
        self.submits.lock().unwrap().push_back(result);
        self
    }

    pub fn auth_calls(&self) -> u32 {
        *self.auth_calls.lock().unwrap()
    }

    pub fn probe_calls(&self) -> Vec<String> {
        self.probe_calls.lock().unwrap().clone()
    }

    pub fn hot_calls(&self) -> Vec<(String, u32)> {
        self.hot_calls.lock().unwrap().clone()
    }

    pub fn submit_calls(&self) -> Vec<SubmitCall> {
        self.submit_calls.lock().unwrap().clone()
    }

    fn record_submit(
        &self,
        kind: &'static str,
        community: &str,
        title: &str,
        content: &str,
    ) -> PlatformResult<PostHandle> {
        let mut calls = self.submit_calls.lock().unwrap();
        calls.push(SubmitCall {
            kind,
            community: community.to_string(),
            title: title.to_string(),
            content: content.to_string(),
        });
        let n = calls.len();

        self.submits.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(PostHandle {
                id: format!("post{}", n),
                url: format!("https://www.reddit.com/r/{}/comments/post{}/", community, n),
            })
        })
    }
}

#[async_trait]
impl Platform for MockPlatform {
    async fn authenticate(&mut self, _credentials: &LoginConfig) -> PlatformResult<()> {
        *self.auth_calls.lock().unwrap() += 1;
        self.auth.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }

    async fn fetch_recent(&self, community: &str, _limit: u32) -> PlatformResult<Vec<Submission>> {
        self.probe_calls.lock().unwrap().push(community.to_string());
        self.probes
            .lock()
            .unwrap()
            .get_mut(community)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_aggregate_hot(&self, feed: &str, limit: u32) -> PlatformResult<Vec<Submission>> {
        self.hot_calls.lock().unwrap().push((feed.to_string(), limit));
        self.hot
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn submit_link(
        &self,
        community: &str,
        title: &str,
        url: &str,
    ) -> PlatformResult<PostHandle> {
        self.record_submit("link", community, title, url)
    }

    async fn submit_text(
        &self,
        community: &str,
        title: &str,
        body: &str,
    ) -> PlatformResult<PostHandle> {
        self.record_submit("self", community, title, body)
    }
}

/// A plain self-post with the given id
pub fn submission(id: &str) -> Submission {
    Submission {
        id: id.to_string(),
        subreddit: "rust".to_string(),
        title: Some(format!("Title {}", id)),
        permalink: Some(format!(
            "https://www.reddit.com/r/rust/comments/{}/title/",
            id
        )),
        is_self: true,
        selftext: Some(format!("body of {}", id)),
        url: None,
        created: None,
    }
}

pub fn transient() -> PlatformError {
    PlatformError::Network("Request timeout".to_string())
}

/// A valid configuration with two sources and default retry settings
pub fn test_config() -> Config {
    parse_config(
        r#"
[main]
verbose = true
subreddits = ["rust", "news"]
post-to = "mirror_sub"
scrape-limit = 25

[logging]
error-logging = false

[login]
username = "bot"
password = "secret"
client-id = "id"
client-secret = "shh"
"#,
    )
    .unwrap()
}
