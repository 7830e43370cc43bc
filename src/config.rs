use crate::metrics::MetricsConfig;
use crate::ExitIntelError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct ExitIntelConfig {
    /// Organization named in the chat assistant's persona.
    #[serde(default = "default_organization")]
    pub organization: String,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub insights: InsightsConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for ExitIntelConfig {
    fn default() -> Self {
        Self {
            organization: default_organization(),
            completion: CompletionConfig::default(),
            analysis: AnalysisConfig::default(),
            insights: InsightsConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    #[serde(default = "default_completion_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub fallback_endpoint: Option<String>,
    #[serde(default = "default_analysis_model")]
    pub analysis_model: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_completion_timeout")]
    pub timeout_secs: u64,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Inline key; the environment variable wins when both are set.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_completion_endpoint(),
            fallback_endpoint: None,
            analysis_model: default_analysis_model(),
            chat_model: default_chat_model(),
            timeout_secs: default_completion_timeout(),
            api_key_env: default_api_key_env(),
            api_key: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    #[serde(default = "default_input")]
    pub input: PathBuf,
    #[serde(default = "default_corpus")]
    pub output: PathBuf,
    /// Parallel completion requests during `analyze` (1 = sequential).
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            input: default_input(),
            output: default_corpus(),
            concurrency: default_concurrency(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct InsightsConfig {
    #[serde(default = "default_corpus")]
    pub corpus: PathBuf,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self { corpus: default_corpus() }
    }
}

fn default_organization() -> String {
    "the organization".into()
}

fn default_completion_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".into()
}

fn default_analysis_model() -> String {
    "gpt-4-turbo-preview".into()
}

fn default_chat_model() -> String {
    "gpt-4-turbo".into()
}

fn default_completion_timeout() -> u64 {
    120
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}

fn default_input() -> PathBuf {
    PathBuf::from("data.json")
}

fn default_corpus() -> PathBuf {
    PathBuf::from("analyzed_data.json")
}

fn default_concurrency() -> usize {
    1
}

/// Load config from EXITINTEL_CONFIG env var, ~/.exitintel/config.toml, or defaults.
pub fn load_config() -> Result<ExitIntelConfig, ExitIntelError> {
    let path = config_path();
    match path {
        Some(p) if p.exists() => {
            let content = std::fs::read_to_string(&p)?;
            let config: ExitIntelConfig = toml::from_str(&content)
                .map_err(|e| ExitIntelError::Config(format!("{}: {e}", p.display())))?;
            validate_config(&config)?;
            log::debug!("loaded config from {}", p.display());
            Ok(config)
        }
        _ => Ok(ExitIntelConfig::default()),
    }
}

fn config_path() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("EXITINTEL_CONFIG") {
        return Some(PathBuf::from(p));
    }
    let home = std::env::var("HOME").ok()?;
    Some(Path::new(&home).join(".exitintel").join("config.toml"))
}

fn validate_config(config: &ExitIntelConfig) -> Result<(), ExitIntelError> {
    if config.analysis.concurrency == 0 {
        return Err(ExitIntelError::Config("analysis.concurrency must be at least 1".into()));
    }
    if config.completion.timeout_secs == 0 {
        return Err(ExitIntelError::Config("completion.timeout_secs must be at least 1".into()));
    }
    let endpoints = std::iter::once(("completion.endpoint", &config.completion.endpoint)).chain(
        config
            .completion
            .fallback_endpoint
            .iter()
            .map(|e| ("completion.fallback_endpoint", e)),
    );
    for (key, url) in endpoints {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ExitIntelError::Config(format!("{key} is not an http(s) URL: {url}")));
        }
    }
    Ok(())
}

/// Resolve the completion API key. Absence is fatal for any command that
/// talks to the completion service, and is checked before data is loaded.
pub fn resolve_api_key(config: &CompletionConfig) -> Result<String, ExitIntelError> {
    resolve_api_key_from(config, std::env::var(&config.api_key_env).ok())
}

fn resolve_api_key_from(
    config: &CompletionConfig,
    env_value: Option<String>,
) -> Result<String, ExitIntelError> {
    env_value
        .into_iter()
        .chain(config.api_key.clone())
        .map(|k| k.trim().to_string())
        .find(|k| !k.is_empty())
        .ok_or_else(|| {
            ExitIntelError::ConfigurationMissing(format!(
                "set {} or completion.api_key in the config file",
                config.api_key_env
            ))
        })
}
