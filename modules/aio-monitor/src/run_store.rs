//! Local run history: `{OUTPUT_DIR}/{YYYY-MM-DD}/results_{timestamp}.json`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use aio_common::{DailyResult, Device, KeywordConfig, Location, Priority, Schedule};

pub struct RunStore {
    output_dir: PathBuf,
}

impl RunStore {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn save(&self, results: &[DailyResult]) -> Result<PathBuf> {
        self.save_at(results, Utc::now())
    }

    /// Write one run as pretty JSON. Returns the file path.
    pub fn save_at(&self, results: &[DailyResult], at: DateTime<Utc>) -> Result<PathBuf> {
        let dir = self.output_dir.join(at.format("%Y-%m-%d").to_string());
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating {}", dir.display()))?;

        let path = dir.join(format!("results_{}.json", at.format("%Y-%m-%dT%H-%M-%S-%3fZ")));
        std::fs::write(&path, serde_json::to_string_pretty(results)?)
            .with_context(|| format!("writing {}", path.display()))?;

        info!(path = %path.display(), results = results.len(), "Run results saved");
        Ok(path)
    }

    /// Most recent saved run, if any.
    pub fn latest(&self) -> Result<Option<Vec<DailyResult>>> {
        let mut days = sorted_entries(&self.output_dir, |p| p.is_dir())?;

        while let Some(day) = days.pop() {
            let runs = sorted_entries(&day, |p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("results_") && n.ends_with(".json"))
            })?;
            if let Some(path) = runs.last() {
                debug!(path = %path.display(), "Loading previous run");
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                let results = serde_json::from_str(&raw)
                    .with_context(|| format!("parsing {}", path.display()))?;
                return Ok(Some(results));
            }
        }

        Ok(None)
    }
}

fn sorted_entries(dir: &Path, keep: impl Fn(&Path) -> bool) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let path = entry?.path();
        if keep(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Read a JSON array of keyword configs.
pub fn load_keywords(path: &Path) -> Result<Vec<KeywordConfig>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading keywords file {}", path.display()))?;
    let keywords: Vec<KeywordConfig> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing keywords file {}", path.display()))?;
    info!(path = %path.display(), count = keywords.len(), "Keywords loaded");
    Ok(keywords)
}

/// Built-in keywords used when no keywords file is configured.
pub fn sample_keywords() -> Vec<KeywordConfig> {
    vec![
        KeywordConfig {
            keyword: "weather today".to_string(),
            lang: "en".to_string(),
            location: Location::country("United States"),
            device: Device::Desktop,
            target_domains: vec!["weather.com".to_string(), "openweathermap.org".to_string()],
            priority: Priority::H,
            schedule: Schedule::Daily,
            owner: Some("test-user".to_string()),
            notes: None,
        },
        KeywordConfig {
            keyword: "天気 今日".to_string(),
            lang: "ja".to_string(),
            location: Location::country("Japan"),
            device: Device::Mobile,
            target_domains: vec!["weather.com".to_string(), "tenki.jp".to_string()],
            priority: Priority::M,
            schedule: Schedule::Daily,
            owner: Some("test-user".to_string()),
            notes: None,
        },
    ]
}
