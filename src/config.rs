use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Deserialize;

/// Everything one run needs, passed explicitly into each region task.
/// No process-wide state survives between runs.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Lower window bound. A listing older than this ends its region:
    /// results are newest-first, so everything after it is out of range too.
    pub earliest_ts: NaiveDateTime,
    /// Upper window bound. Newer listings (bumped reposts carry future
    /// stamps) are skipped but the page keeps being processed.
    pub latest_ts: NaiveDateTime,
    pub out_dir: PathBuf,
    /// Output filename prefix; the region name and run id are appended.
    pub fname_base: String,
    /// Run id appended to output filenames; empty disables the suffix.
    pub run_ts: String,
    /// Per-request timeout, for search and detail pages alike. Production
    /// runs use [`crate::fetch::REQUEST_TIMEOUT`]; tests shorten it to
    /// drive the timeout-retry path.
    pub request_timeout: Duration,
    pub proxy: Option<ProxySettings>,
}

/// Upstream proxy credential block, read from a private settings file
/// that is never checked in.
#[derive(Debug, Clone, Deserialize)]
pub struct ProxySettings {
    pub url: String,
    pub user: String,
    #[serde(default)]
    pub password: String,
}

impl ProxySettings {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        let settings = serde_json::from_str(&raw)
            .with_context(|| format!("malformed settings file {}", path.display()))?;
        Ok(settings)
    }
}
