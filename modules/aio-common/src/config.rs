use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::{info, warn};

use crate::error::MonitorError;

/// How much screenshot evidence a run collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureMode {
    /// No browser is started.
    Off,
    /// The keyword's configured device only, plus the AIO crop on Google.
    #[default]
    Configured,
    /// Desktop and mobile for every keyword.
    All,
}

impl FromStr for CaptureMode {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" | "false" => Ok(CaptureMode::Off),
            "configured" | "device" => Ok(CaptureMode::Configured),
            "all" | "multi" => Ok(CaptureMode::All),
            other => Err(MonitorError::Config(format!(
                "CAPTURE_MODE must be off, configured or all (got {other:?})"
            ))),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Search backends
    pub serpapi_api_key: String,
    pub yahoo_api_key: Option<String>,

    // Assistants
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub google_ai_api_key: Option<String>,

    // Input
    pub keywords_file: Option<PathBuf>,
    pub target_domains: Vec<String>,

    // Output
    pub output_dir: PathBuf,
    pub screenshot_dir: PathBuf,

    // Evidence capture
    pub capture_mode: CaptureMode,
    pub browser_ws_url: Option<String>,
    pub chrome_bin: Option<PathBuf>,

    // Retry
    pub max_retry_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Missing credentials are not an error here; [`Config::validate`] decides
    /// which ones are fatal.
    pub fn from_env() -> Result<Self, MonitorError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Config::from_env`] but reading from an arbitrary lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MonitorError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let capture_mode = match var("CAPTURE_MODE") {
            Some(raw) => raw.parse()?,
            None => CaptureMode::default(),
        };

        Ok(Self {
            serpapi_api_key: var("SERPAPI_API_KEY").unwrap_or_default(),
            yahoo_api_key: var("YAHOO_API_KEY"),
            openai_api_key: var("OPENAI_API_KEY"),
            anthropic_api_key: var("ANTHROPIC_API_KEY"),
            google_ai_api_key: var("GOOGLE_AI_API_KEY"),
            keywords_file: var("KEYWORDS_FILE").map(PathBuf::from),
            target_domains: var("TARGET_DOMAINS")
                .map(|raw| {
                    raw.split(',')
                        .map(|d| d.trim().to_string())
                        .filter(|d| !d.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            output_dir: PathBuf::from(var("OUTPUT_DIR").unwrap_or_else(|| "./runs".to_string())),
            screenshot_dir: PathBuf::from(
                var("SCREENSHOT_DIR").unwrap_or_else(|| "./screenshots".to_string()),
            ),
            capture_mode,
            browser_ws_url: var("BROWSER_WS_URL"),
            chrome_bin: var("CHROME_BIN").map(PathBuf::from),
            max_retry_attempts: parse_or("MAX_RETRY_ATTEMPTS", var("MAX_RETRY_ATTEMPTS"), 3)?,
            retry_delay_ms: parse_or("RETRY_DELAY_MS", var("RETRY_DELAY_MS"), 1000)?,
        })
    }

    /// Startup validation. A missing SerpAPI key is fatal for the whole run;
    /// everything else only disables its own provider and is logged.
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.serpapi_api_key.is_empty() {
            return Err(MonitorError::Config(
                "SERPAPI_API_KEY is required for Google search".to_string(),
            ));
        }
        if self.max_retry_attempts == 0 {
            return Err(MonitorError::Config(
                "MAX_RETRY_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        if self.openai_api_key.is_none() {
            warn!("OPENAI_API_KEY not provided - ChatGPT web search will be skipped");
        }
        if self.anthropic_api_key.is_none() {
            warn!("ANTHROPIC_API_KEY not provided - Claude web search will be skipped");
        }
        if self.google_ai_api_key.is_none() {
            warn!("GOOGLE_AI_API_KEY not provided - Gemini grounding will be skipped");
        }
        if self.target_domains.is_empty() {
            warn!("No TARGET_DOMAINS specified - keywords without their own targets skip own-domain analysis");
        }

        Ok(())
    }

    /// Log which settings are active without printing secret values.
    pub fn log_redacted(&self) {
        info!(
            serpapi = !self.serpapi_api_key.is_empty(),
            yahoo = self.yahoo_api_key.is_some(),
            openai = self.openai_api_key.is_some(),
            anthropic = self.anthropic_api_key.is_some(),
            google_ai = self.google_ai_api_key.is_some(),
            capture_mode = ?self.capture_mode,
            remote_browser = self.browser_ws_url.is_some(),
            output_dir = %self.output_dir.display(),
            screenshot_dir = %self.screenshot_dir.display(),
            max_retry_attempts = self.max_retry_attempts,
            retry_delay_ms = self.retry_delay_ms,
            "Configuration loaded"
        );
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T, MonitorError> {
    match raw {
        Some(raw) => raw
            .parse()
            .map_err(|_| MonitorError::Config(format!("{key} must be a number (got {raw:?})"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, MonitorError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("./runs"));
        assert_eq!(config.screenshot_dir, PathBuf::from("./screenshots"));
        assert_eq!(config.capture_mode, CaptureMode::Configured);
        assert_eq!(config.max_retry_attempts, 3);
        assert_eq!(config.retry_delay_ms, 1000);
        assert!(config.openai_api_key.is_none());
    }

    #[test]
    fn target_domains_are_split_and_trimmed() {
        let config = config_from(&[("TARGET_DOMAINS", " weather.com, ,tenki.jp ")]).unwrap();
        assert_eq!(config.target_domains, vec!["weather.com", "tenki.jp"]);
    }

    #[test]
    fn blank_credentials_count_as_missing() {
        let config = config_from(&[("OPENAI_API_KEY", "   ")]).unwrap();
        assert!(config.openai_api_key.is_none());
    }

    #[test]
    fn missing_serpapi_key_is_fatal() {
        let config = config_from(&[]).unwrap();
        assert!(matches!(config.validate(), Err(MonitorError::Config(_))));
    }

    #[test]
    fn missing_assistant_keys_are_not_fatal() {
        let config = config_from(&[("SERPAPI_API_KEY", "k")]).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn bad_numbers_are_rejected() {
        assert!(config_from(&[("MAX_RETRY_ATTEMPTS", "three")]).is_err());
        assert!(config_from(&[("CAPTURE_MODE", "sometimes")]).is_err());
    }

    #[test]
    fn capture_mode_parses_aliases() {
        assert_eq!("OFF".parse::<CaptureMode>().unwrap(), CaptureMode::Off);
        assert_eq!("multi".parse::<CaptureMode>().unwrap(), CaptureMode::All);
    }
}
