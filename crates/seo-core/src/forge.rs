//! Version-control platform API (GitHub REST).

use crate::error::{Result, SeoError};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

// ---------------------------------------------------------------------------
// Repository references
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Owner and repository name from a GitHub remote URL.
///
/// Accepts `git@github.com:o/r.git`, `ssh://git@github.com/o/r.git` and
/// `https://github.com/o/r(.git)`.
pub fn parse_remote(url: &str) -> Result<RepoRef> {
    let trimmed = url.trim();
    let path = trimmed
        .strip_prefix("git@github.com:")
        .or_else(|| trimmed.strip_prefix("ssh://git@github.com/"))
        .or_else(|| trimmed.strip_prefix("https://github.com/"))
        .or_else(|| trimmed.strip_prefix("http://github.com/"))
        .ok_or_else(|| SeoError::UnsupportedRemote(url.to_string()))?;

    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    match path.split('/').collect::<Vec<_>>().as_slice() {
        [owner, name] if !owner.is_empty() && !name.is_empty() => Ok(RepoRef::new(*owner, *name)),
        _ => Err(SeoError::UnsupportedRemote(url.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Forge
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryInfo {
    pub full_name: String,
    pub default_branch: String,
}

#[derive(Debug, Clone)]
pub struct NewPullRequest<'a> {
    pub title: &'a str,
    pub body: &'a str,
    pub head: &'a str,
    pub base: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub html_url: String,
}

/// Operations the publishers need from the hosting platform.
pub trait Forge {
    fn get_repository(&self, repo: &RepoRef) -> Result<RepositoryInfo>;
    fn create_pull_request(&self, repo: &RepoRef, pr: &NewPullRequest<'_>) -> Result<PullRequest>;
    fn add_labels(&self, repo: &RepoRef, number: u64, labels: &[String]) -> Result<()>;
    fn send_dispatch(&self, repo: &RepoRef, event_type: &str, payload: &Value) -> Result<()>;
}

// ---------------------------------------------------------------------------
// GitHubClient
// ---------------------------------------------------------------------------

pub struct GitHubClient {
    http: Client,
    base_url: String,
    token: String,
}

impl GitHubClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .header("User-Agent", "seo-agent")
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .map_err(|e| SeoError::PlatformRequest(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SeoError::Platform {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

impl Forge for GitHubClient {
    fn get_repository(&self, repo: &RepoRef) -> Result<RepositoryInfo> {
        let response = self.send(self.request(reqwest::Method::GET, &format!("/repos/{repo}")))?;
        response
            .json()
            .map_err(|e| SeoError::PlatformRequest(e.to_string()))
    }

    fn create_pull_request(&self, repo: &RepoRef, pr: &NewPullRequest<'_>) -> Result<PullRequest> {
        let body = json!({
            "title": pr.title,
            "body": pr.body,
            "head": pr.head,
            "base": pr.base,
        });
        let response = self.send(
            self.request(reqwest::Method::POST, &format!("/repos/{repo}/pulls"))
                .json(&body),
        )?;
        let created: PullRequest = response
            .json()
            .map_err(|e| SeoError::PlatformRequest(e.to_string()))?;
        tracing::info!(repo = %repo, number = created.number, url = %created.html_url, "pull request created");
        Ok(created)
    }

    fn add_labels(&self, repo: &RepoRef, number: u64, labels: &[String]) -> Result<()> {
        self.send(
            self.request(
                reqwest::Method::POST,
                &format!("/repos/{repo}/issues/{number}/labels"),
            )
            .json(&json!({ "labels": labels })),
        )?;
        Ok(())
    }

    fn send_dispatch(&self, repo: &RepoRef, event_type: &str, payload: &Value) -> Result<()> {
        self.send(
            self.request(reqwest::Method::POST, &format!("/repos/{repo}/dispatches"))
                .json(&json!({
                    "event_type": event_type,
                    "client_payload": payload,
                })),
        )?;
        tracing::info!(repo = %repo, event_type, "repository dispatch sent");
        Ok(())
    }
}
