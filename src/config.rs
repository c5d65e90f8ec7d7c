//! Backend settings. Flags win over environment variables, which win over defaults.
use std::time::Duration;

use clap::Args;

use crate::error::SopsError;

pub const DEFAULT_MODEL: &str = "gpt-5.2";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Args, Debug, Clone)]
pub struct BackendArgs {
    /// model identifier sent with every request
    #[arg(long, env = "SOPS_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// API key (read at call time; only live queries need it)
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// base URL of a Responses-compatible API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// per-request timeout in seconds
    #[arg(long, env = "SOPS_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
}

impl OpenAiConfig {
    pub fn new(model: impl Into<String>) -> Result<Self, SopsError> {
        let model = model.into();
        if model.trim().is_empty() {
            return Err(SopsError::Configuration("model must be a non-empty string".into()));
        }
        Ok(Self {
            model,
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Reads `SOPS_MODEL`, `OPENAI_API_KEY`, `OPENAI_BASE_URL` and
    /// `SOPS_TIMEOUT_SECS`, falling back to the defaults for unset variables.
    pub fn from_env() -> Result<Self, SopsError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SopsError> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let mut config = OpenAiConfig::new(var("SOPS_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()))?;
        if let Some(key) = var("OPENAI_API_KEY") {
            config = config.with_api_key(key);
        }
        if let Some(base_url) = var("OPENAI_BASE_URL") {
            config = config.with_base_url(base_url);
        }
        if let Some(secs) = var("SOPS_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                SopsError::Configuration(format!("SOPS_TIMEOUT_SECS must be a whole number of seconds, got {secs:?}"))
            })?;
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl TryFrom<&BackendArgs> for OpenAiConfig {
    type Error = SopsError;

    fn try_from(args: &BackendArgs) -> Result<Self, Self::Error> {
        let mut config = OpenAiConfig::new(args.model.clone())?
            .with_base_url(args.base_url.clone())
            .with_timeout(Duration::from_secs(args.timeout_secs));
        if let Some(key) = args.api_key.as_deref().filter(|k| !k.is_empty()) {
            config = config.with_api_key(key);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_model_is_a_configuration_error() {
        assert!(matches!(OpenAiConfig::new("  "), Err(SopsError::Configuration(_))));
    }

    #[test]
    fn environment_fills_config() {
        let env = |name: &str| match name {
            "OPENAI_API_KEY" => Some("sk-test".to_string()),
            "OPENAI_BASE_URL" => Some("http://localhost:9000/v1/".to_string()),
            "SOPS_TIMEOUT_SECS" => Some("15".to_string()),
            _ => None,
        };
        let config = OpenAiConfig::from_lookup(env).unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.base_url, "http://localhost:9000/v1");
        assert_eq!(config.timeout, Duration::from_secs(15));
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = OpenAiConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.api_key, None);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        let config = OpenAiConfig::from_lookup(|_| Some(String::new())).unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn bad_timeout_in_environment_is_a_configuration_error() {
        let env = |name: &str| (name == "SOPS_TIMEOUT_SECS").then(|| "soon".to_string());
        assert!(matches!(OpenAiConfig::from_lookup(env), Err(SopsError::Configuration(_))));
    }

    #[test]
    fn args_map_onto_config() {
        let args = BackendArgs {
            model: "gpt-test".into(),
            api_key: Some(String::new()),
            base_url: "http://localhost:8080/v1/".into(),
            timeout_secs: 5,
        };
        let config = OpenAiConfig::try_from(&args).unwrap();
        assert_eq!(config.model, "gpt-test");
        assert_eq!(config.api_key, None);
        assert_eq!(config.base_url, "http://localhost:8080/v1");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }
}
