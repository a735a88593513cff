use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};

const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_CLAUDE_MODEL: &str = "claude-haiku-4-5-20251001";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Gemini,
    Claude,
}

impl FromStr for LlmProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(LlmProvider::Gemini),
            "claude" | "anthropic" => Ok(LlmProvider::Claude),
            other => bail!("Unknown LLM_PROVIDER '{other}' (expected gemini or claude)"),
        }
    }
}

/// Which field set the extractor asks the model for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionPreset {
    /// Summary fields plus hashtag detection.
    Hashtags,
    /// Summary fields plus a prize breakdown; tags come from the caller.
    Prizes,
}

impl FromStr for ExtractionPreset {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hashtags" => Ok(ExtractionPreset::Hashtags),
            "prizes" => Ok(ExtractionPreset::Prizes),
            other => bail!("Unknown EXTRACTION_PROFILE '{other}' (expected hashtags or prizes)"),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // AI / LLM
    pub llm_provider: LlmProvider,
    pub llm_api_key: String,
    pub llm_model: String,
    pub extraction_preset: ExtractionPreset,

    // Browser (Chrome CDP for JS rendering)
    pub chrome_url: Option<String>,
    pub chrome_bin: Option<String>,
    pub page_timeout: Duration,
    pub probe_timeout: Duration,

    // Web server
    pub web_host: String,
    pub web_port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.log_keys();
        Ok(config)
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let llm_provider: LlmProvider = parse_or(&get, "LLM_PROVIDER", LlmProvider::Gemini)?;
        let (key_var, model_var, default_model) = match llm_provider {
            LlmProvider::Gemini => ("GEMINI_API_KEY", "GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
            LlmProvider::Claude => ("ANTHROPIC_API_KEY", "CLAUDE_MODEL", DEFAULT_CLAUDE_MODEL),
        };

        Ok(Self {
            llm_provider,
            llm_api_key: get(key_var)
                .ok_or_else(|| anyhow!("{key_var} environment variable is required"))?,
            llm_model: get(model_var).unwrap_or_else(|| default_model.to_string()),
            extraction_preset: parse_or(&get, "EXTRACTION_PROFILE", ExtractionPreset::Hashtags)?,
            chrome_url: get("CHROME_URL"),
            chrome_bin: get("CHROME_BIN"),
            page_timeout: Duration::from_secs(parse_or(&get, "PAGE_TIMEOUT_SECS", 60u64)?),
            probe_timeout: Duration::from_secs(parse_or(&get, "PROBE_TIMEOUT_SECS", 30u64)?),
            web_host: get("WEB_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            web_port: parse_or(&get, "WEB_PORT", 3000u16)?,
        })
    }

    fn log_keys(&self) {
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) if !v.is_empty() => v.clone(),
                _ => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  LLM_PROVIDER: {:?} ({})", self.llm_provider, self.llm_model);
        tracing::info!("  LLM API key: {}", key_preview(&self.llm_api_key));
        tracing::info!("  EXTRACTION_PROFILE: {:?}", self.extraction_preset);
        tracing::info!("  CHROME_URL: {}", preview_opt(&self.chrome_url));
        tracing::info!("  CHROME_BIN: {}", preview_opt(&self.chrome_bin));
    }
}

/// First five characters of a secret plus its length in characters.
fn key_preview(val: &str) -> String {
    let prefix: String = val.chars().take(5).collect();
    format!("{}...({} chars)", prefix, val.chars().count())
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{key} is invalid ({raw}): {e}")),
        None => Ok(default),
    }
}
