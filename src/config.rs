use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::analysis::SectionKind;
use crate::chunk::{ContentBudget, FileOrder};

const CONFIG_FILE: &str = ".pr-review.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration loaded from .pr-review.toml.
///
/// All fields are optional; the tool works with zero config as long as an
/// LLM endpoint is reachable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub budget: BudgetConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitHubConfig {
    /// GitHub API token. If None, falls back to GITHUB_TOKEN env var.
    pub token: Option<String>,
}

/// OpenAI-compatible chat completions endpoint settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API key. If None, falls back to OPENAI_API_KEY; local servers may need none.
    pub api_key: Option<String>,
    /// Base URL without the `/v1/chat/completions` suffix
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    /// Transport-level timeout for a single HTTP request
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.3,
            request_timeout_secs: 120,
        }
    }
}

/// Context budget, in token-equivalent units.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub limit: usize,
    /// Held back for the prompt scaffolding around the diff
    pub overhead: usize,
    pub chars_per_token: usize,
    pub order: FileOrder,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            limit: 12_000,
            overhead: 2_000,
            chars_per_token: 4,
            order: FileOrder::SmallestFirst,
        }
    }
}

impl BudgetConfig {
    pub fn content_budget(&self) -> ContentBudget {
        ContentBudget::new(self.limit, self.overhead).with_chars_per_token(self.chars_per_token)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub sections: Vec<SectionKind>,
    /// Wall-clock limit for one section, independent of the other sections
    pub section_timeout_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sections: SectionKind::ALL.to_vec(),
            section_timeout_secs: 90,
        }
    }
}

impl AnalysisConfig {
    pub fn section_timeout(&self) -> Duration {
        Duration::from_secs(self.section_timeout_secs)
    }
}

impl Config {
    /// Load configuration from .pr-review.toml in the current directory.
    /// Returns default config if the file doesn't exist; tokens missing from
    /// the file are filled from GITHUB_TOKEN and OPENAI_API_KEY.
    pub fn load() -> Result<Config, ConfigError> {
        let path = Path::new(CONFIG_FILE);
        let mut config = if path.exists() {
            Self::load_from(path)?
        } else {
            Config::default()
        };

        if config.github.token.is_none() {
            config.github.token = std::env::var("GITHUB_TOKEN").ok();
        }
        if config.llm.api_key.is_none() {
            config.llm.api_key = std::env::var("OPENAI_API_KEY").ok();
        }

        Ok(config)
    }

    /// Load from a specific path without consulting the environment.
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Resolve the GitHub token: config file value takes precedence,
    /// falls back to GITHUB_TOKEN env var.
    pub fn github_token(&self) -> Option<String> {
        self.github
            .token
            .clone()
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
    }
}
