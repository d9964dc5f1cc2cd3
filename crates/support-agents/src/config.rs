use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use coordination::SlaTargets;
use serde::Deserialize;

use crate::agents::knowledge::{default_articles, Article};

pub const DEFAULT_ESCALATION_CHANNEL: &str = "slack:#support-escalations";

/// Which reasoning engine backs the agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Deterministic keyword/knowledge-base rules.
    Rules,
    /// OpenAI-compatible chat-completions endpoint.
    Http,
}

impl std::str::FromStr for EngineKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rules" => Ok(Self::Rules),
            "http" => Ok(Self::Http),
            other => bail!("unknown engine `{other}` (expected `rules` or `http`)"),
        }
    }
}

/// Top-level support pipeline configuration.
#[derive(Debug, Clone)]
pub struct SupportConfig {
    pub engine: EngineKind,
    /// Base URL of the chat-completions endpoint (`.../v1`).
    pub engine_url: String,
    pub engine_model: String,
    pub engine_api_key: Option<String>,
    /// Where lookup misses are escalated.
    pub escalation_channel: String,
    /// Append-only JSONL audit log (None = disabled).
    pub audit_log: Option<PathBuf>,
    /// Knowledge base articles.
    pub articles: Vec<Article>,
    /// Targets applied to every monitoring batch; request targets win on
    /// conflicts.
    pub default_sla_targets: BTreeMap<String, f64>,
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self {
            engine: std::env::var("SUPPORT_ENGINE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(EngineKind::Rules),
            engine_url: std::env::var("SUPPORT_ENGINE_URL")
                .unwrap_or_else(|_| "http://localhost:8080/v1".into()),
            engine_model: std::env::var("SUPPORT_ENGINE_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".into()),
            engine_api_key: std::env::var("SUPPORT_ENGINE_API_KEY").ok(),
            escalation_channel: std::env::var("SUPPORT_ESCALATION_CHANNEL")
                .unwrap_or_else(|_| DEFAULT_ESCALATION_CHANNEL.into()),
            audit_log: std::env::var("SUPPORT_AUDIT_LOG").ok().map(PathBuf::from),
            articles: default_articles(),
            default_sla_targets: BTreeMap::new(),
        }
    }
}

/// On-disk overlay. Every field is optional; present fields replace the
/// environment/default value, except `articles`, which are appended.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    engine: Option<EngineKind>,
    engine_url: Option<String>,
    engine_model: Option<String>,
    engine_api_key: Option<String>,
    escalation_channel: Option<String>,
    audit_log: Option<PathBuf>,
    #[serde(default)]
    articles: Vec<Article>,
    #[serde(default)]
    sla_targets: BTreeMap<String, f64>,
}

impl SupportConfig {
    /// Environment/defaults, overlaid with the TOML file at `path` if given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(path) = path {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            config.apply_toml(&text)
                .with_context(|| format!("Invalid config file {}", path.display()))?;
        }
        config.validate()?;
        Ok(config)
    }

    fn apply_toml(&mut self, text: &str) -> Result<()> {
        let file: FileConfig = toml::from_str(text)?;
        if let Some(engine) = file.engine {
            self.engine = engine;
        }
        if let Some(url) = file.engine_url {
            self.engine_url = url;
        }
        if let Some(model) = file.engine_model {
            self.engine_model = model;
        }
        if file.engine_api_key.is_some() {
            self.engine_api_key = file.engine_api_key;
        }
        if let Some(channel) = file.escalation_channel {
            self.escalation_channel = channel;
        }
        if file.audit_log.is_some() {
            self.audit_log = file.audit_log;
        }
        self.articles.extend(file.articles);
        self.default_sla_targets.extend(file.sla_targets);
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.escalation_channel.trim().is_empty() {
            bail!("escalation_channel must not be empty");
        }
        if self.engine == EngineKind::Http && self.engine_url.trim().is_empty() {
            bail!("engine_url is required for the http engine");
        }
        self.default_targets()?;
        Ok(())
    }

    /// Validated default SLA targets.
    pub fn default_targets(&self) -> Result<SlaTargets> {
        SlaTargets::new(self.default_sla_targets.clone()).context("Invalid default sla_targets")
    }
}
