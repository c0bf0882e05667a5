pub mod diff;
pub mod types;

pub use types::{ChangeKind, DiffFile, PrUrl, PullRequest};

use thiserror::Error;
use tracing::{debug, instrument};

const GITHUB_API: &str = "https://api.github.com";
const USER_AGENT: &str = "pr-review";

#[derive(Debug, Error)]
pub enum PrError {
    #[error("GitHub API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    #[error("Invalid PR URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to parse diff: {0}")]
    DiffParse(String),

    #[error("GitHub token not found in config or environment")]
    MissingToken,
}

/// Parse a GitHub PR URL into its component parts.
///
/// Expected format: `https://github.com/{owner}/{repo}/pull/{number}`.
pub fn parse_pr_url(url: &str) -> Result<PrUrl, PrError> {
    let parsed = reqwest::Url::parse(url).map_err(|_| PrError::InvalidUrl(url.to_string()))?;

    if parsed.host_str() != Some("github.com") {
        return Err(PrError::InvalidUrl(url.to_string()));
    }

    let segments: Vec<_> = parsed
        .path_segments()
        .ok_or_else(|| PrError::InvalidUrl(url.to_string()))?
        .filter(|segment| !segment.is_empty())
        .collect();

    if segments.len() != 4 || segments[2] != "pull" {
        return Err(PrError::InvalidUrl(url.to_string()));
    }

    let pr_number = segments[3]
        .parse::<u64>()
        .map_err(|_| PrError::InvalidUrl(url.to_string()))?;

    Ok(PrUrl {
        owner: segments[0].to_string(),
        repo: segments[1].to_string(),
        pr_number,
    })
}

/// Fetch a complete PullRequest (metadata + per-file diffs) from the GitHub API.
///
/// The token is optional: public repositories can be read anonymously, at
/// the cost of a much lower rate limit.
#[instrument(skip(config), fields(owner = %pr_url.owner, repo = %pr_url.repo, pr = pr_url.pr_number))]
pub async fn fetch_pull_request(
    pr_url: &PrUrl,
    config: &crate::config::Config,
) -> Result<PullRequest, PrError> {
    let token = config.github_token();
    let client = reqwest::Client::new();
    let base_url = format!(
        "{GITHUB_API}/repos/{}/{}/pulls/{}",
        pr_url.owner, pr_url.repo, pr_url.pr_number
    );

    #[derive(serde::Deserialize)]
    struct User {
        login: String,
    }

    #[derive(serde::Deserialize)]
    struct PullResponse {
        number: u64,
        title: String,
        body: Option<String>,
        user: User,
    }

    let authed = |request: reqwest::RequestBuilder| match &token {
        Some(token) => request.bearer_auth(token),
        None => request,
    };

    debug!(authenticated = token.is_some(), "fetching PR metadata from GitHub API");
    let metadata = authed(client.get(&base_url).header("User-Agent", USER_AGENT))
        .send()
        .await?
        .error_for_status()?
        .json::<PullResponse>()
        .await?;
    debug!(title = %metadata.title, "received PR metadata");

    debug!("fetching PR diff from GitHub API");
    let diff_text = authed(
        client
            .get(&base_url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github.diff"),
    )
    .send()
    .await?
    .error_for_status()?
    .text()
    .await?;
    debug!(diff_bytes = diff_text.len(), "received PR diff");

    let files = diff::parse_diff(&diff_text)?;
    debug!(parsed_files = files.len(), "parsed diff");

    Ok(PullRequest {
        owner: pr_url.owner.clone(),
        repo: pr_url.repo.clone(),
        number: metadata.number,
        title: metadata.title,
        description: metadata.body.unwrap_or_default(),
        author: metadata.user.login,
        files,
    })
}

/// Post `body` as a conversation comment on the pull request.
///
/// PR conversation comments live on the issues endpoint. Posting always
/// needs a token.
#[instrument(skip(config, body), fields(owner = %pr_url.owner, repo = %pr_url.repo, pr = pr_url.pr_number))]
pub async fn post_review_comment(
    pr_url: &PrUrl,
    config: &crate::config::Config,
    body: &str,
) -> Result<(), PrError> {
    post_comment(GITHUB_API, pr_url, config.github_token(), body).await
}

async fn post_comment(
    api_base: &str,
    pr_url: &PrUrl,
    token: Option<String>,
    body: &str,
) -> Result<(), PrError> {
    let token = token.ok_or(PrError::MissingToken)?;
    let url = format!(
        "{api_base}/repos/{}/{}/issues/{}/comments",
        pr_url.owner, pr_url.repo, pr_url.pr_number
    );

    debug!(comment_bytes = body.len(), "posting review comment");
    reqwest::Client::new()
        .post(&url)
        .header("User-Agent", USER_AGENT)
        .bearer_auth(&token)
        .json(&serde_json::json!({ "body": body }))
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}
