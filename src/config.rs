use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::utils::PageDelay;

pub const DEFAULT_NEXT_LABEL: &str = "next ›";

/// Static description of a data source, emitted once per run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignHeader {
    pub goal: String,
    pub campaign: String,
    pub author: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub donate_url: Option<String>,
}

/// Form fields to override before submitting the listing search form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormOverride {
    /// Zero-based position of the form in the page
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

/// One filter of a directory, walked independently of the others
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMode {
    pub name: String,
    pub url: String,
    pub description: String,
    /// -1 (avoid), 0 (mixed) or 1 (good)
    pub judgment: i8,
    #[serde(default)]
    pub form: Option<FormOverride>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub header: CampaignHeader,
    #[serde(default)]
    pub modes: Vec<QueryMode>,
    #[serde(default = "default_page_delay")]
    pub page_delay_secs: f64,
    /// 0 means no limit
    #[serde(default)]
    pub max_pages: usize,
    #[serde(default = "default_next_label")]
    pub next_label: String,
}

fn default_page_delay() -> f64 {
    1.0
}

fn default_next_label() -> String {
    DEFAULT_NEXT_LABEL.to_string()
}

impl SourceConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).context("Failed to parse source configuration")?;
        config.page_delay().context("Invalid source configuration")?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&text)
    }

    pub fn page_delay(&self) -> Result<PageDelay> {
        PageDelay::try_from_secs_f64(self.page_delay_secs)
    }

    /// Keep only the named modes. An empty selection keeps everything.
    pub fn retain_modes(&mut self, names: &[String]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }

        for name in names {
            if !self.modes.iter().any(|m| &m.name == name) {
                anyhow::bail!(
                    "Unknown query mode '{}' (available: {})",
                    name,
                    self.modes.iter().map(|m| m.name.as_str()).collect::<Vec<_>>().join(", ")
                );
            }
        }

        self.modes.retain(|m| names.contains(&m.name));
        Ok(())
    }
}
