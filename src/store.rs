//! Snapshot storage for the last crawl of each account.

use crate::diff::{DiffGranularity, diff_courses};
use crate::dualis::Course;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, warn};

/// Courses as seen by one crawl.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub email: String,
    pub crawled_at: DateTime<Utc>,
    pub courses: Vec<Course>,
}

#[async_trait]
pub trait CourseStore: Send + Sync {
    /// The last stored snapshot for `email`, if any.
    async fn load(&self, email: &str) -> Result<Option<Snapshot>>;

    /// Replace the stored snapshot.
    async fn save(&self, snapshot: &Snapshot) -> Result<()>;
}

/// Diff `courses` against the stored snapshot for `email`, then store them.
///
/// Returns what changed since the previous crawl; empty on the first crawl.
/// A stored snapshot belonging to a different account is not a baseline.
pub async fn record_crawl(
    store: &dyn CourseStore,
    email: &str,
    courses: &[Course],
    granularity: DiffGranularity,
) -> Result<Vec<Course>> {
    let previous = match store.load(email).await? {
        Some(snapshot) if snapshot.email == email => snapshot.courses,
        Some(snapshot) => {
            warn!(
                requested = email,
                stored = snapshot.email.as_str(),
                "stored snapshot belongs to another account, ignoring it"
            );
            Vec::new()
        }
        None => Vec::new(),
    };
    let changes = diff_courses(&previous, courses, granularity);

    store
        .save(&Snapshot {
            email: email.to_owned(),
            crawled_at: Utc::now(),
            courses: courses.to_vec(),
        })
        .await?;

    debug!(
        previous = previous.len(),
        current = courses.len(),
        changed = changes.len(),
        "recorded crawl"
    );
    Ok(changes)
}

/// One pretty-printed JSON file per account.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Percent-encoded, so every email gets its own file and none escapes `dir`.
    fn path_for(&self, email: &str) -> PathBuf {
        let name: String = url::form_urlencoded::byte_serialize(email.as_bytes()).collect();
        self.dir.join(format!("{name}.json"))
    }
}

#[async_trait]
impl CourseStore for JsonFileStore {
    async fn load(&self, email: &str) -> Result<Option<Snapshot>> {
        let path = self.path_for(email);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        };
        let snapshot = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse snapshot {}", path.display()))?;
        Ok(Some(snapshot))
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let path = self.path_for(&snapshot.email);
        let json = serde_json::to_string_pretty(snapshot)?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        debug!(path = %path.display(), "saved snapshot");
        Ok(())
    }
}

/// In-process store, mostly for tests.
#[derive(Default)]
pub struct MemoryStore {
    snapshots: Mutex<HashMap<String, Snapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CourseStore for MemoryStore {
    async fn load(&self, email: &str) -> Result<Option<Snapshot>> {
        let snapshots = self
            .snapshots
            .lock()
            .map_err(|_| anyhow::anyhow!("snapshot lock poisoned"))?;
        Ok(snapshots.get(email).cloned())
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let mut snapshots = self
            .snapshots
            .lock()
            .map_err(|_| anyhow::anyhow!("snapshot lock poisoned"))?;
        snapshots.insert(snapshot.email.clone(), snapshot.clone());
        Ok(())
    }
}
