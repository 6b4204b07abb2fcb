//! Connection settings for the CLI
//!
//! Read from `<config dir>/logtail/config.toml` when present, then overridden
//! by `BL_*` environment variables and finally by command line flags.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use logtail_api::{ClientConfig, Credentials};

const ENV_API_URL: &str = "BL_API_URL";
const ENV_WORKSPACE: &str = "BL_WORKSPACE";
const ENV_API_KEY: &str = "BL_API_KEY";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: Option<String>,
    pub workspace: Option<String>,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
}

impl Config {
    fn path() -> Option<PathBuf> {
        Some(dirs::config_dir()?.join("logtail").join("config.toml"))
    }

    /// Load the config file; a missing file is an empty config
    pub fn load() -> Result<Self> {
        let Some(path) = Self::path() else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn with_env(self) -> Self {
        self.with_vars(|key| std::env::var(key).ok())
    }

    /// Apply variables from `lookup`; empty values are ignored
    fn with_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = get(ENV_API_URL) {
            self.api_url = Some(url);
        }
        if let Some(workspace) = get(ENV_WORKSPACE) {
            self.workspace = Some(workspace);
        }
        if let Some(key) = get(ENV_API_KEY) {
            self.api_key = Some(key);
        }
        self
    }

    /// Apply command line overrides
    pub fn with_flags(mut self, api_url: Option<String>, workspace: Option<String>) -> Self {
        if api_url.is_some() {
            self.api_url = api_url;
        }
        if workspace.is_some() {
            self.workspace = workspace;
        }
        self
    }

    pub fn workspace(&self) -> Result<&str> {
        match self.workspace.as_deref() {
            Some(ws) if !ws.trim().is_empty() => Ok(ws),
            _ => anyhow::bail!(
                "no workspace specified. Set {} or pass --workspace",
                ENV_WORKSPACE
            ),
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        match &self.api_url {
            Some(url) => ClientConfig::default().with_base_url(url.clone()),
            None => ClientConfig::default(),
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            access_token: self.access_token.clone(),
            api_key: self.api_key.clone(),
            workspace: self.workspace.clone(),
        }
    }
}
