use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};

use crate::models::LibraryLevel;
use crate::validation::StaticResolvingContext;

const APP_NAME: &str = "artifact-manifest";
const CONFIG_FILE: &str = "config.json";

/// How the artifact document is persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    /// Single JSON file
    #[default]
    File,
    /// One JSON file per artifact in a directory
    Dir,
    /// SQLite database
    Sqlite,
}

impl StorageKind {
    pub fn default_location(&self) -> &'static str {
        match self {
            Self::File => "artifacts.json",
            Self::Dir => ".artifacts",
            Self::Sqlite => "artifacts.db",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage used when `--format` is not given.
    pub storage: StorageKind,
    /// Storage location used when `--store` is not given. Relative paths
    /// resolve against the working directory.
    pub location: Option<PathBuf>,
    /// Modules that `check` treats as existing.
    pub modules: Vec<String>,
    /// Project-level libraries that `check` treats as existing.
    pub libraries: Vec<String>,
}

impl Config {
    /// Load configuration from the user's config directory.
    /// Returns default config if file doesn't exist or fails to parse.
    pub fn load() -> Self {
        match Self::try_load() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config, using defaults: {}", e);
                Self::default()
            }
        }
    }

    fn try_load() -> Result<Self> {
        let config_path = get_config_path()?;
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config = serde_json::from_str(&content).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Resolving context built from the configured modules and libraries.
    pub fn resolving_context(&self) -> StaticResolvingContext {
        let context = self
            .modules
            .iter()
            .fold(StaticResolvingContext::new(), |ctx, m| ctx.with_module(m));
        self.libraries
            .iter()
            .fold(context, |ctx, l| ctx.with_library(LibraryLevel::Project, l))
    }
}

fn get_config_path() -> Result<PathBuf> {
    let mut path =
        config_dir().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    path.push(APP_NAME);
    path.push(CONFIG_FILE);
    Ok(path)
}
