use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// --- Enums ---

/// Search backend a [`SearchResult`] / [`DailyResult`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Google,
    Yahoo,
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Engine::Google => write!(f, "google"),
            Engine::Yahoo => write!(f, "yahoo"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[default]
    Desktop,
    Mobile,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Desktop => write!(f, "desktop"),
            Device::Mobile => write!(f, "mobile"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationType {
    #[default]
    Country,
    State,
    City,
    Zip,
}

impl fmt::Display for LocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LocationType::Country => "country",
            LocationType::State => "state",
            LocationType::City => "city",
            LocationType::Zip => "zip",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Priority {
    H,
    #[default]
    M,
    L,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Schedule {
    #[default]
    Daily,
    Weekly,
}

/// LLM web-search assistant queried for citations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Assistant {
    #[serde(rename = "chatgpt")]
    ChatGpt,
    Claude,
    Gemini,
}

impl fmt::Display for Assistant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Assistant::ChatGpt => write!(f, "chatgpt"),
            Assistant::Claude => write!(f, "claude"),
            Assistant::Gemini => write!(f, "gemini"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Ok,
    Partial,
    Fail,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Ok => write!(f, "ok"),
            JobStatus::Partial => write!(f, "partial"),
            JobStatus::Fail => write!(f, "fail"),
        }
    }
}

// --- Input ---

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "type")]
    pub location_type: LocationType,
    pub value: String,
}

impl Location {
    pub fn country(value: impl Into<String>) -> Self {
        Self {
            location_type: LocationType::Country,
            value: value.into(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.location_type, self.value)
    }
}

/// One monitored keyword, as handed over by the configuration collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordConfig {
    pub keyword: String,
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub device: Device,
    #[serde(default)]
    pub target_domains: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub schedule: Schedule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

fn default_lang() -> String {
    "ja".to_string()
}

impl KeywordConfig {
    pub fn new(keyword: impl Into<String>, target_domains: Vec<String>) -> Self {
        Self {
            keyword: keyword.into(),
            lang: "en".to_string(),
            location: Location::country("United States"),
            device: Device::Desktop,
            target_domains,
            priority: Priority::M,
            schedule: Schedule::Daily,
            owner: None,
            notes: None,
        }
    }
}

// --- Provider output ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AioSource {
    pub url: String,
    pub domain: String,
}

/// The AI Overview block of a results page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AiOverview {
    pub present: bool,
    pub sources: Vec<AioSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_length: Option<usize>,
    #[serde(default)]
    pub has_followup: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerpItem {
    pub rank: u32,
    pub domain: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Organic top-100 plus AIO data for one (keyword, engine) call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub engine: Engine,
    pub aio: Option<AiOverview>,
    pub organic: Vec<SerpItem>,
}

/// What one assistant answered for one keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationResult {
    pub assistant: Assistant,
    pub citations: Vec<String>,
    pub excerpt: String,
    pub answer_present: bool,
}

// --- Derived facts ---

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AioInfo {
    pub aio_present: bool,
    pub aio_sources: Vec<String>,
    pub own_cited: bool,
    pub own_cited_urls: Vec<String>,
}

/// Per-assistant contribution embedded in a [`DailyResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmCitation {
    pub llm_engine: Assistant,
    pub llm_answer_present: bool,
    pub llm_citations: Vec<String>,
    pub llm_own_cited: bool,
    pub llm_excerpt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenshotData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desktop_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aio_desktop_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aio_mobile_path: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ScreenshotData {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            desktop_path: None,
            mobile_path: None,
            aio_desktop_path: None,
            aio_mobile_path: None,
            timestamp,
        }
    }

    /// Results-page path for `device`, if captured.
    pub fn page_path(&self, device: Device) -> Option<&str> {
        match device {
            Device::Desktop => self.desktop_path.as_deref(),
            Device::Mobile => self.mobile_path.as_deref(),
        }
    }
}

/// One row of the run output: one per (keyword, engine) per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyResult {
    pub run_at: DateTime<Utc>,
    pub engine: Engine,
    pub device: Device,
    pub lang: String,
    pub location: Location,
    pub keyword: String,
    pub aio_present: bool,
    pub aio_sources: Vec<String>,
    pub own_cited: bool,
    pub own_cited_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serp_rank: Option<u32>,
    pub serp_top100: Vec<SerpItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_data: Option<ScreenshotData>,
    /// Reserved for an archived HTML copy of the SERP. Nothing sets it yet;
    /// the flat row always carries the column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_snapshot_url: Option<String>,
    pub job_status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub llm_results: Vec<LlmCitation>,
}

/// Column names of [`DailyResult::to_row`], in order.
pub const ROW_HEADERS: [&str; 20] = [
    "run_at",
    "keyword",
    "lang",
    "location",
    "device",
    "aio_present",
    "aio_sources",
    "own_cited",
    "own_cited_urls",
    "serp_top10",
    "screenshot_url",
    "html_snapshot_url",
    "job_status",
    "error_message",
    "llm_engine",
    "llm_answer_present",
    "llm_citations",
    "llm_own_cited",
    "llm_excerpt",
    "llm_results",
];

impl DailyResult {
    /// A successful result with SERP facts filled in and nothing else.
    pub fn from_serp(
        config: &KeywordConfig,
        engine: Engine,
        run_at: DateTime<Utc>,
        aio: AioInfo,
        serp_rank: Option<u32>,
        organic: Vec<SerpItem>,
    ) -> Self {
        Self {
            run_at,
            engine,
            device: config.device,
            lang: config.lang.clone(),
            location: config.location.clone(),
            keyword: config.keyword.clone(),
            aio_present: aio.aio_present,
            aio_sources: aio.aio_sources,
            own_cited: aio.own_cited,
            own_cited_urls: aio.own_cited_urls,
            serp_rank,
            serp_top100: organic.into_iter().take(100).collect(),
            screenshot_path: None,
            screenshot_data: None,
            html_snapshot_url: None,
            job_status: JobStatus::Ok,
            error_message: None,
            llm_results: Vec::new(),
        }
    }

    /// A failed result: empty collections, error recorded.
    pub fn failed(
        config: &KeywordConfig,
        engine: Engine,
        run_at: DateTime<Utc>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            job_status: JobStatus::Fail,
            error_message: Some(error.into()),
            ..Self::from_serp(config, engine, run_at, AioInfo::default(), None, Vec::new())
        }
    }

    /// Flat persisted row. The legacy single-assistant columns carry the first
    /// assistant; `llm_results` carries every assistant.
    pub fn to_row(&self) -> Vec<Value> {
        let primary = self.llm_results.first();
        let top10: Vec<&SerpItem> = self.serp_top100.iter().take(10).collect();

        vec![
            json!(self.run_at.to_rfc3339()),
            json!(self.keyword),
            json!(self.lang),
            json!(self.location.to_string()),
            json!(self.device.to_string()),
            json!(self.aio_present),
            json!(self.aio_sources),
            json!(self.own_cited),
            json!(self.own_cited_urls),
            json!(top10),
            json!(self.screenshot_path.clone().unwrap_or_default()),
            json!(self.html_snapshot_url.clone().unwrap_or_default()),
            json!(self.job_status.to_string()),
            json!(self.error_message.clone().unwrap_or_default()),
            json!(primary.map(|p| p.llm_engine.to_string()).unwrap_or_default()),
            json!(primary.is_some_and(|p| p.llm_answer_present)),
            json!(primary.map(|p| p.llm_citations.clone()).unwrap_or_default()),
            json!(primary.is_some_and(|p| p.llm_own_cited)),
            json!(primary.map(|p| p.llm_excerpt.clone()).unwrap_or_default()),
            json!(self.llm_results),
        ]
    }
}

/// Run-over-run comparison of two results for the same keyword and engine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChangeReport {
    pub aio_status_changed: bool,
    pub citation_status_changed: bool,
    pub rank_changed: bool,
    /// previous − current; positive means the page moved up.
    pub rank_change_amount: Option<i64>,
}

impl ChangeReport {
    pub fn any(&self) -> bool {
        self.aio_status_changed || self.citation_status_changed || self.rank_changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> KeywordConfig {
        KeywordConfig::new("weather today", vec!["weather.com".to_string()])
    }

    #[test]
    fn failed_result_has_empty_collections() {
        let result = DailyResult::failed(&sample_config(), Engine::Google, Utc::now(), "boom");
        assert_eq!(result.job_status, JobStatus::Fail);
        assert!(!result.aio_present);
        assert!(result.aio_sources.is_empty());
        assert!(result.own_cited_urls.is_empty());
        assert!(result.serp_top100.is_empty());
        assert!(result.llm_results.is_empty());
        assert_eq!(result.error_message.as_deref(), Some("boom"));
    }

    #[test]
    fn row_has_one_value_per_header() {
        let result = DailyResult::failed(&sample_config(), Engine::Yahoo, Utc::now(), "x");
        assert_eq!(result.to_row().len(), ROW_HEADERS.len());
    }

    #[test]
    fn row_keeps_every_assistant() {
        let mut result = DailyResult::from_serp(
            &sample_config(),
            Engine::Google,
            Utc::now(),
            AioInfo::default(),
            None,
            Vec::new(),
        );
        for assistant in [Assistant::ChatGpt, Assistant::Gemini] {
            result.llm_results.push(LlmCitation {
                llm_engine: assistant,
                llm_answer_present: true,
                llm_citations: vec!["https://weather.com/x".to_string()],
                llm_own_cited: assistant == Assistant::Gemini,
                llm_excerpt: "forecast".to_string(),
            });
        }

        let row = result.to_row();
        assert_eq!(row[3], json!("country:United States"));
        assert_eq!(row[14], json!("chatgpt"));
        assert_eq!(row[17], json!(false));
        assert_eq!(row[19].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn row_truncates_snapshot_to_top_ten() {
        let organic = (1..=30)
            .map(|rank| SerpItem {
                rank,
                domain: format!("site{rank}.com"),
                url: format!("https://site{rank}.com/"),
                title: None,
            })
            .collect();
        let result = DailyResult::from_serp(
            &sample_config(),
            Engine::Google,
            Utc::now(),
            AioInfo::default(),
            None,
            organic,
        );
        assert_eq!(result.serp_top100.len(), 30);
        assert_eq!(result.to_row()[9].as_array().map(Vec::len), Some(10));
    }

    #[test]
    fn keyword_config_deserializes_with_defaults() {
        let config: KeywordConfig = serde_json::from_str(
            r#"{"keyword":"天気 今日","location":{"type":"country","value":"Japan"},"device":"mobile","target_domains":["tenki.jp"],"priority":"H"}"#,
        )
        .unwrap();
        assert_eq!(config.lang, "ja");
        assert_eq!(config.device, Device::Mobile);
        assert_eq!(config.priority, Priority::H);
        assert_eq!(config.schedule, Schedule::Daily);
        assert_eq!(config.location.to_string(), "country:Japan");
    }
}
