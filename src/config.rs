use crate::error::{ConfigError, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_directory")]
    pub directory: String,
    #[serde(default = "default_log_filename")]
    pub filename: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_file")]
    pub session_file: String,
    #[serde(default = "default_headless")]
    pub headless: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub executable: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeConfig {
    #[serde(default = "default_base_origin")]
    pub base_origin: String,

    #[serde(default = "default_api_fragments")]
    pub api_fragments: Vec<String>,

    #[serde(default = "default_nav_timeout")]
    pub nav_timeout: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64,

    #[serde(default = "default_settle_grace")]
    pub settle_grace: u64,

    #[serde(default = "default_lesson_delay")]
    pub lesson_delay: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_directory")]
    pub directory: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub scrape: ScrapeConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub logging: LogConfig,
}

// Default implementations
impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: default_log_directory(),
            filename: default_log_filename(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_file: default_session_file(),
            headless: default_headless(),
            user_agent: default_user_agent(),
            executable: None,
        }
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            base_origin: default_base_origin(),
            api_fragments: default_api_fragments(),
            nav_timeout: default_nav_timeout(),
            request_timeout: default_request_timeout(),
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
            settle_grace: default_settle_grace(),
            lesson_delay: default_lesson_delay(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            scrape: ScrapeConfig::default(),
            output: OutputConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: Config = if path.as_ref().exists() {
            let content = std::fs::read_to_string(path).map_err(ConfigError::FileRead)?;
            toml::from_str(&content).map_err(ConfigError::Parse)?
        } else {
            Config::default()
        };

        config.validate()?;
        info!("Configuration loaded successfully");
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        // Validate base_origin
        if self.scrape.base_origin.is_empty() {
            return Err(ConfigError::MissingField("scrape.base_origin".to_string()).into());
        }
        if !self.scrape.base_origin.starts_with("http") {
            return Err(ConfigError::InvalidValue(format!(
                "scrape.base_origin must start with http(s): {}",
                self.scrape.base_origin
            ))
            .into());
        }

        if self.scrape.api_fragments.is_empty() {
            return Err(ConfigError::InvalidValue(
                "scrape.api_fragments cannot be empty".to_string(),
            )
            .into());
        }

        if self.scrape.nav_timeout == 0 {
            return Err(ConfigError::InvalidValue(
                "scrape.nav_timeout must be greater than 0".to_string(),
            )
            .into());
        }

        if self.scrape.request_timeout == 0 {
            return Err(ConfigError::InvalidValue(
                "scrape.request_timeout must be greater than 0".to_string(),
            )
            .into());
        }

        if self.session.session_file.is_empty() {
            return Err(ConfigError::MissingField("session.session_file".to_string()).into());
        }

        // The stored session is a precondition: fail before any navigation happens
        if !Path::new(&self.session.session_file).exists() {
            return Err(ConfigError::InvalidValue(format!(
                "session_file does not exist: {} (log in and export a storage state first)",
                self.session.session_file
            ))
            .into());
        }

        if self.output.directory.is_empty() {
            return Err(ConfigError::MissingField("output.directory".to_string()).into());
        }

        Ok(())
    }
}

fn default_base_origin() -> String {
    "https://www.coursera.org".to_string()
}

fn default_api_fragments() -> Vec<String> {
    vec![
        "onDemandLectureAssets.v1".to_string(),
        "onDemandElements.v1".to_string(),
        "onDemandSupplements.v1".to_string(),
    ]
}

fn default_nav_timeout() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    15
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay() -> u64 {
    3
}

fn default_settle_grace() -> u64 {
    2
}

fn default_lesson_delay() -> u64 {
    2
}

fn default_session_file() -> String {
    "session.json".to_string()
}

fn default_headless() -> bool {
    true
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/121.0.0.0 Safari/537.36"
        .to_string()
}

fn default_output_directory() -> String {
    "output".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_directory() -> String {
    "logs".to_string()
}

fn default_log_filename() -> String {
    "scraper.log".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_the_known_api_fragments() {
        let config = ScrapeConfig::default();
        assert_eq!(config.api_fragments.len(), 3);
        assert!(config
            .api_fragments
            .iter()
            .any(|f| f == "onDemandSupplements.v1"));
    }

    #[test]
    fn rejects_non_http_origin() {
        let mut config = Config::default();
        config.scrape.base_origin = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let config: Config = toml::from_str(
            r#"
            [scrape]
            lesson_delay = 5

            [output]
            directory = "readings"
            "#,
        )
        .unwrap();

        assert_eq!(config.scrape.lesson_delay, 5);
        assert_eq!(config.scrape.request_timeout, 15);
        assert_eq!(config.output.directory, "readings");
        assert_eq!(config.session.session_file, "session.json");
    }
}
