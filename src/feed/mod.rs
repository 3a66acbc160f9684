//! Feed collaborator boundary.
//!
//! The engine depends on exactly three operations against a package feed:
//! search, download, push. Feed configuration is opaque beyond the URL in
//! the channel's `FeedSource`.

use crate::release::{scan_packages, ReleaseKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use skiff_core::{FeedSource, SkiffError, SkiffResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::warn;

/// One release known to a feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedEntry {
    pub id: String,
    pub version: String,
    pub kind: ReleaseKind,
    /// Where the artifact can be fetched from: a URL or a local path
    pub location: String,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub id: Option<String>,
    pub kind: Option<ReleaseKind>,
}

impl SearchFilters {
    fn matches(&self, entry: &FeedEntry) -> bool {
        if let Some(id) = &self.id {
            if &entry.id != id {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if entry.kind != kind {
                return false;
            }
        }
        true
    }
}

#[async_trait]
pub trait Feed: Send + Sync {
    /// Human-readable identity, used in logs and prompts
    fn describe(&self) -> String;

    async fn search(&self, term: &str, filters: &SearchFilters) -> SkiffResult<Vec<FeedEntry>>;

    /// Fetch one artifact into a destination directory, returning its path
    async fn download(&self, entry: &FeedEntry, dest_dir: &Path) -> SkiffResult<PathBuf>;

    /// Upload one package artifact
    async fn push(&self, package: &Path, api_key: Option<&str>) -> SkiffResult<()>;
}

/// Construct a feed for a channel's source. `http(s)://` URLs get an HTTP
/// feed; everything else is treated as a local directory.
pub fn feed_for(source: &FeedSource) -> SkiffResult<Arc<dyn Feed>> {
    if source.url.starts_with("http://") || source.url.starts_with("https://") {
        Ok(Arc::new(HttpFeed::new(source.url.clone())))
    } else {
        let path = source
            .url
            .strip_prefix("file://")
            .unwrap_or(source.url.as_str());
        Ok(Arc::new(DirectoryFeed::new(PathBuf::from(path))))
    }
}

/// Search several feeds in parallel and merge the results. A failing
/// source is logged and skipped; the merged list is what the healthy
/// sources returned.
pub async fn search_all(
    feeds: &[Arc<dyn Feed>],
    term: &str,
    filters: &SearchFilters,
) -> Vec<FeedEntry> {
    let mut join_set = JoinSet::new();
    for feed in feeds {
        let feed = Arc::clone(feed);
        let term = term.to_string();
        let filters = filters.clone();
        join_set.spawn(async move {
            let described = feed.describe();
            (described, feed.search(&term, &filters).await)
        });
    }

    let mut merged = Vec::new();
    while let Some(result) = join_set.join_next().await {
        match result {
            Ok((_, Ok(entries))) => merged.extend(entries),
            Ok((source, Err(e))) => warn!("Search against {} failed: {}", source, e),
            Err(e) => warn!("Search task failed: {}", e),
        }
    }
    merged
}

/// HTTP feed client.
pub struct HttpFeed {
    base_url: String,
    client: reqwest::Client,
}

impl HttpFeed {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Feed for HttpFeed {
    fn describe(&self) -> String {
        self.base_url.clone()
    }

    async fn search(&self, term: &str, filters: &SearchFilters) -> SkiffResult<Vec<FeedEntry>> {
        let mut url = format!("{}/search?q={}", self.base_url, urlencoding::encode(term));
        if let Some(id) = &filters.id {
            url.push_str(&format!("&id={}", urlencoding::encode(id)));
        }
        if let Some(kind) = filters.kind {
            url.push_str(&format!("&kind={}", kind));
        }

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(SkiffError::Feed(format!(
                "Search against {} failed: HTTP {}",
                self.base_url,
                response.status()
            )));
        }

        let entries: Vec<FeedEntry> = response.json().await?;
        Ok(entries.into_iter().filter(|e| filters.matches(e)).collect())
    }

    async fn download(&self, entry: &FeedEntry, dest_dir: &Path) -> SkiffResult<PathBuf> {
        let url = if entry.location.starts_with("http") {
            entry.location.clone()
        } else {
            format!("{}/{}", self.base_url, entry.location.trim_start_matches('/'))
        };

        let mut response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(SkiffError::Feed(format!(
                "Download of {} failed: HTTP {}",
                url,
                response.status()
            )));
        }

        std::fs::create_dir_all(dest_dir)?;
        let file_name = url.rsplit('/').next().unwrap_or("package.skiff").to_string();
        let dest = dest_dir.join(file_name);
        let mut file = tokio::fs::File::create(&dest).await?;
        use tokio::io::AsyncWriteExt;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(dest)
    }

    async fn push(&self, package: &Path, api_key: Option<&str>) -> SkiffResult<()> {
        use reqwest::multipart;

        let bytes = tokio::fs::read(package).await?;
        let file_name = package
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| SkiffError::Package("Invalid package path".to_string()))?
            .to_string();

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/octet-stream")
            .map_err(|e| SkiffError::Feed(format!("Failed to create multipart part: {}", e)))?;

        let mut form = multipart::Form::new().part("package", part);
        if let Some(key) = api_key {
            form = form.text("api_key", key.to_string());
        }

        let response = self
            .client
            .post(format!("{}/upload", self.base_url))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SkiffError::Feed(format!(
                "Push to {} failed: HTTP {} - {}",
                self.base_url, status, body
            )));
        }

        Ok(())
    }
}

/// A feed backed by a local directory. Used for `file://` channels and in
/// tests.
pub struct DirectoryFeed {
    dir: PathBuf,
}

impl DirectoryFeed {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

#[async_trait]
impl Feed for DirectoryFeed {
    fn describe(&self) -> String {
        self.dir.display().to_string()
    }

    async fn search(&self, term: &str, filters: &SearchFilters) -> SkiffResult<Vec<FeedEntry>> {
        let entries = scan_packages(&self.dir)?
            .into_iter()
            .filter(|r| r.manifest.id.contains(term))
            .map(|r| FeedEntry {
                id: r.manifest.id.clone(),
                version: r.manifest.version.clone(),
                kind: r.manifest.kind,
                location: r.path.display().to_string(),
                size: Some(r.manifest.total_size()),
            })
            .filter(|e| filters.matches(e))
            .collect();
        Ok(entries)
    }

    async fn download(&self, entry: &FeedEntry, dest_dir: &Path) -> SkiffResult<PathBuf> {
        let source = PathBuf::from(&entry.location);
        let file_name = source
            .file_name()
            .ok_or_else(|| SkiffError::Feed(format!("Invalid entry location: {}", entry.location)))?;
        std::fs::create_dir_all(dest_dir)?;
        let dest = dest_dir.join(file_name);
        std::fs::copy(&source, &dest)?;
        Ok(dest)
    }

    async fn push(&self, package: &Path, _api_key: Option<&str>) -> SkiffResult<()> {
        let file_name = package
            .file_name()
            .ok_or_else(|| SkiffError::Package("Invalid package path".to_string()))?;
        std::fs::create_dir_all(&self.dir)?;
        std::fs::copy(package, self.dir.join(file_name))?;
        Ok(())
    }
}
