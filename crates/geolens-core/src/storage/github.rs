use super::blob::BlobStore;
use anyhow::Context;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::StatusCode;
use serde_json::{json, Value};

const API_ROOT: &str = "https://api.github.com";

/// Blobs stored as files in a GitHub repository via the contents API.
///
/// Every write is a commit. `write` looks up the current blob sha right
/// before the PUT, so a commit made since the caller's last read is
/// overwritten: last write wins.
pub struct GithubBlobStore {
    pub repo: String,
    pub branch: Option<String>,
    token: String,
    api_root: String,
    client: reqwest::Client,
}

struct RemoteFile {
    sha: String,
    bytes: Vec<u8>,
}

impl GithubBlobStore {
    pub fn new(repo: String, branch: Option<String>, token: String) -> Self {
        Self {
            repo,
            branch,
            token,
            api_root: API_ROOT.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Point at a different API host (GitHub Enterprise, test servers).
    pub fn with_api_root(mut self, api_root: impl Into<String>) -> Self {
        self.api_root = api_root.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/contents/{}",
            self.api_root,
            self.repo,
            path.trim_start_matches('/')
        )
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "geolens")
    }

    async fn fetch(&self, path: &str) -> anyhow::Result<Option<RemoteFile>> {
        let mut req = self.request(reqwest::Method::GET, &self.url(path));
        if let Some(branch) = &self.branch {
            req = req.query(&[("ref", branch)]);
        }
        let resp = req.send().await.context("github contents request failed")?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("github read {} failed ({}): {}", path, status, body);
        }

        let json: Value = resp.json().await?;
        let sha = json
            .get("sha")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("github response missing sha for {}", path))?
            .to_string();

        let encoded = json.get("content").and_then(Value::as_str).unwrap_or_default();
        let bytes = if encoded.is_empty() {
            // Files above 1 MB come back without inline content.
            self.download(&json).await?
        } else {
            let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
            STANDARD
                .decode(compact)
                .with_context(|| format!("invalid base64 content for {}", path))?
        };

        Ok(Some(RemoteFile { sha, bytes }))
    }

    async fn download(&self, meta: &Value) -> anyhow::Result<Vec<u8>> {
        let Some(url) = meta.get("download_url").and_then(Value::as_str) else {
            return Ok(Vec::new());
        };
        let resp = self
            .request(reqwest::Method::GET, url)
            .send()
            .await
            .context("github raw download failed")?;
        if !resp.status().is_success() {
            anyhow::bail!("github raw download failed ({})", resp.status());
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

#[async_trait]
impl BlobStore for GithubBlobStore {
    async fn read(&self, path: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.fetch(path).await?.map(|f| f.bytes))
    }

    async fn write(&self, path: &str, bytes: &[u8], message: &str) -> anyhow::Result<()> {
        let existing = self.fetch(path).await?;

        let mut body = json!({
            "message": message,
            "content": STANDARD.encode(bytes),
        });
        if let Some(file) = &existing {
            body["sha"] = json!(file.sha);
        }
        if let Some(branch) = &self.branch {
            body["branch"] = json!(branch);
        }

        let resp = self
            .request(reqwest::Method::PUT, &self.url(path))
            .json(&body)
            .send()
            .await
            .context("github contents update failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("github write {} failed ({}): {}", path, status, text);
        }

        tracing::debug!(
            event = "geolens.store.github_commit",
            repo = %self.repo,
            path = %path,
            created = existing.is_none(),
        );
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "github"
    }
}
