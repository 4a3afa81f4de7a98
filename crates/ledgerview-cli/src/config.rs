// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use ledgerview_app::{ColumnSet, DEFAULT_SEARCH_DEBOUNCE, PageSize, ViewOptions};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "ledgerview";
const CONFIG_VERSION: i64 = 1;
const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
const DEFAULT_TIMEOUT: &str = "10s";
const DEFAULT_LOG_LEVEL: &str = "info";
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            server: Server::default(),
            ui: Ui::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            base_url: Some(DEFAULT_BASE_URL.to_owned()),
            timeout: Some(DEFAULT_TIMEOUT.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ui {
    pub page_size: Option<i64>,
    pub column_set: Option<String>,
    pub search_debounce: Option<String>,
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub file: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("LEDGERVIEW_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set LEDGERVIEW_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version. Add `version = 1` and put values under [server], [ui], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(base_url) = &self.server.base_url {
            let trimmed = base_url.trim();
            if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
                bail!(
                    "server.base_url in {} must be an http(s) URL, got {:?}",
                    path.display(),
                    base_url
                );
            }
        }

        if let Some(timeout) = &self.server.timeout
            && parse_duration(timeout)? == Duration::ZERO
        {
            bail!(
                "server.timeout in {} must be positive, got {}",
                path.display(),
                timeout
            );
        }

        if let Some(rows) = self.ui.page_size
            && usize::try_from(rows)
                .ok()
                .and_then(PageSize::from_rows)
                .is_none()
        {
            bail!(
                "ui.page_size in {} must be one of 10, 25, 50, 100, got {}",
                path.display(),
                rows
            );
        }

        if let Some(column_set) = &self.ui.column_set
            && ColumnSet::parse(column_set).is_none()
        {
            bail!(
                "ui.column_set in {} must be \"summary\" or \"full\", got {:?}",
                path.display(),
                column_set
            );
        }

        if let Some(debounce) = &self.ui.search_debounce {
            parse_duration(debounce)?;
        }

        if let Some(level) = &self.log.level
            && !LOG_LEVELS.contains(&level.as_str())
        {
            bail!(
                "log.level in {} must be one of {}, got {:?}",
                path.display(),
                LOG_LEVELS.join(", "),
                level
            );
        }

        Ok(())
    }

    pub fn base_url(&self) -> &str {
        self.server
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim()
    }

    pub fn timeout(&self) -> Result<Duration> {
        parse_duration(self.server.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn view_options(&self) -> Result<ViewOptions> {
        let page_size = match self.ui.page_size {
            Some(rows) => usize::try_from(rows)
                .ok()
                .and_then(PageSize::from_rows)
                .ok_or_else(|| anyhow!("ui.page_size must be one of 10, 25, 50, 100"))?,
            None => PageSize::default(),
        };
        let column_set = match &self.ui.column_set {
            Some(raw) => ColumnSet::parse(raw)
                .ok_or_else(|| anyhow!("ui.column_set must be \"summary\" or \"full\""))?,
            None => ColumnSet::default(),
        };
        let search_debounce = match &self.ui.search_debounce {
            Some(raw) => parse_duration(raw)?,
            None => DEFAULT_SEARCH_DEBOUNCE,
        };
        Ok(ViewOptions {
            page_size,
            column_set,
            search_debounce,
            client_id: self.ui.client_id.clone(),
        })
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_file(&self) -> Result<PathBuf> {
        if let Some(path) = &self.log.file {
            return Ok(PathBuf::from(path));
        }
        let state_root = dirs::state_dir()
            .or_else(dirs::cache_dir)
            .ok_or_else(|| anyhow!("cannot resolve a log directory; set [log].file"))?;
        let app_dir = state_root.join(APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create log directory {}", app_dir.display()))?;
        Ok(app_dir.join("ledgerview.log"))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# ledgerview config\n# Place this file at: {}\n\nversion = 1\n\n[server]\nbase_url = \"{}\"\ntimeout = \"{}\"\n\n[ui]\n# 10, 25, 50 or 100\npage_size = 25\n# \"summary\" or \"full\"\ncolumn_set = \"summary\"\nsearch_debounce = \"{}ms\"\n# Optional. Start filtered to one client.\n# client_id = \"ACME\"\n\n[log]\nlevel = \"{}\"\n# Optional. Default is the platform state dir (for example ~/.local/state/ledgerview/ledgerview.log)\n# file = \"/absolute/path/to/ledgerview.log\"\n",
            path.display(),
            DEFAULT_BASE_URL,
            DEFAULT_TIMEOUT,
            DEFAULT_SEARCH_DEBOUNCE.as_millis(),
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 300ms or 10s)")
}
