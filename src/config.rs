//! Process configuration.
//!
//! [`Config`] holds the endpoints and secrets read from the environment.
//! It is built once in `main` and passed down by reference.
//! [`ImageGenConfig`] is the optional YAML/JSON file that tunes artwork
//! generation.

use anyhow::{bail, Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const PLACEHOLDER_MARKER: &str = "your_";

#[derive(Debug, Clone)]
pub struct Config {
    /// Project base URL, e.g. `https://abcd.supabase.co`
    pub api_url: String,
    pub service_key: String,
    pub openai_api_key: Option<String>,
}

impl Config {
    /// Load from `.env.local` (overriding), `.env`, and the process
    /// environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::from_filename_override(".env.local").ok();
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_url = non_empty("VITE_SUPABASE_URL")
            .or_else(|| non_empty("SUPABASE_URL"))
            .context("missing VITE_SUPABASE_URL or SUPABASE_URL")?;
        let service_key =
            non_empty("SUPABASE_SERVICE_ROLE_KEY").context("missing SUPABASE_SERVICE_ROLE_KEY")?;
        let openai_api_key = non_empty("OPENAI_API_KEY").or_else(|| non_empty("CHATGPT_API_KEY"));

        if api_url.to_lowercase().contains(PLACEHOLDER_MARKER)
            || service_key.to_lowercase().contains(PLACEHOLDER_MARKER)
        {
            bail!("placeholder values detected in environment; update .env.local with real credentials");
        }

        let config = Self {
            api_url: api_url.trim().trim_end_matches('/').to_string(),
            service_key: service_key.trim().to_string(),
            openai_api_key,
        };

        tracing::debug!(
            api_url = %config.api_url,
            key = %preview(&config.service_key),
            openai = config.openai_api_key.is_some(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Project reference: the subdomain of the project URL.
    pub fn project_ref(&self) -> &str {
        let host = self
            .api_url
            .trim_start_matches("https://")
            .trim_start_matches("http://");
        host.strip_suffix(".supabase.co").unwrap_or(host)
    }

    /// Dashboard SQL editor for pasting migrations by hand.
    pub fn dashboard_sql_url(&self) -> String {
        format!(
            "https://app.supabase.com/project/{}/sql/new",
            self.project_ref()
        )
    }

    /// `apikey` and bearer headers for the REST and storage APIs.
    pub fn auth_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert("apikey", HeaderValue::from_str(&self.service_key)?);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.service_key))?,
        );
        Ok(headers)
    }
}

fn preview(val: &str) -> String {
    format!("{}...", val.chars().take(5).collect::<String>())
}

/// Artwork generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageGenConfig {
    /// Prepended to every prompt
    pub base_prompt: String,
    /// Per entry type (`monsters`, `equipment`, ...) prompt template
    pub prompt_templates: HashMap<String, String>,
    pub dimensions: Dimensions,
    pub retry: RetryConfig,
    pub batch: BatchConfig,
    pub storage: StorageConfig,
}

impl Default for ImageGenConfig {
    fn default() -> Self {
        let prompt_templates = [
            ("monsters", "{name}, {description}, gate rank {gate_rank}, {tags}"),
            ("equipment", "{name}, {equipment_type}, {rarity} item, {description}"),
            ("relics", "{name}, ancient relic, {rarity}, {description}"),
            ("jobs", "{name} hunter class portrait, {description}, {tags}"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            base_prompt: "Solo Leveling manhwa style, painterly dark fantasy illustration"
                .to_string(),
            prompt_templates,
            dimensions: Dimensions::default(),
            retry: RetryConfig::default(),
            batch: BatchConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl ImageGenConfig {
    /// Load from a YAML file. JSON files are accepted as well.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: ImageGenConfig = serde_yaml_ng::from_str(&content)
            .with_context(|| format!("invalid image config {}", path.display()))?;
        Ok(config)
    }

    pub fn template_for(&self, entry_type: &str) -> &str {
        self.prompt_templates
            .get(entry_type)
            .map(String::as_str)
            .unwrap_or("{name}, {description}")
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Default for Dimensions {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay_seconds: u64,
    /// Wait after the image API reports a rate limit
    pub rate_limit_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_seconds: 5,
            rate_limit_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Entries per run when `--limit` is not given
    pub size: usize,
    pub delay_seconds: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            size: 10,
            delay_seconds: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub bucket: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: "compendium-images".to_string(),
        }
    }
}
