use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context};
use bot_core::FlowSettings;
use serde::Deserialize;
use shared::domain::UserId;
use storage::ChannelSeed;

pub const CONFIG_FILE: &str = "bot.toml";

#[derive(Debug, Clone)]
pub struct Settings {
    pub bot_token: Option<String>,
    pub database_url: String,
    pub admin_ids: Vec<i64>,
    pub mandatory_channels: Vec<ChannelSeed>,
    pub page_size: usize,
    pub api_base_url: String,
    pub poll_timeout_secs: u64,
    pub health_bind: Option<String>,
    pub backup_dir: PathBuf,
    pub backup_on_startup: bool,
    pub session_max_age_secs: u64,
    pub rate_limit_per_minute: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bot_token: None,
            database_url: "sqlite://./data/catalog.db".into(),
            admin_ids: Vec::new(),
            mandatory_channels: Vec::new(),
            page_size: 10,
            api_base_url: telegram::DEFAULT_API_URL.into(),
            poll_timeout_secs: 30,
            health_bind: None,
            backup_dir: PathBuf::from("backups"),
            backup_on_startup: true,
            session_max_age_secs: 24 * 60 * 60,
            rate_limit_per_minute: 30,
        }
    }
}

/// Shape of `bot.toml`. Every key is optional; missing keys keep defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileSettings {
    bot_token: Option<String>,
    database_url: Option<String>,
    admin_ids: Option<Vec<i64>>,
    mandatory_channels: Option<Vec<ChannelSeed>>,
    page_size: Option<usize>,
    api_base_url: Option<String>,
    poll_timeout_secs: Option<u64>,
    health_bind: Option<String>,
    backup_dir: Option<PathBuf>,
    backup_on_startup: Option<bool>,
    session_max_age_secs: Option<u64>,
    rate_limit_per_minute: Option<usize>,
}

impl Settings {
    pub fn bot_token(&self) -> anyhow::Result<&str> {
        match self.bot_token.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => Ok(token),
            _ => bail!("bot token missing: set BOT_TOKEN or bot_token in {CONFIG_FILE}"),
        }
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    pub fn session_max_age(&self) -> Duration {
        Duration::from_secs(self.session_max_age_secs)
    }

    pub fn flow_settings(&self) -> FlowSettings {
        FlowSettings {
            admin_ids: self.admin_ids.iter().copied().map(UserId).collect(),
            page_size: self.page_size.max(1),
            rate_limit_per_minute: self.rate_limit_per_minute,
            backup_dir: self.backup_dir.clone(),
            ..FlowSettings::default()
        }
    }

    fn apply_file(&mut self, file: FileSettings) {
        if let Some(v) = file.bot_token {
            self.bot_token = Some(v);
        }
        if let Some(v) = file.database_url {
            self.database_url = v;
        }
        if let Some(v) = file.admin_ids {
            self.admin_ids = v;
        }
        if let Some(v) = file.mandatory_channels {
            self.mandatory_channels = v;
        }
        if let Some(v) = file.page_size {
            self.page_size = v;
        }
        if let Some(v) = file.api_base_url {
            self.api_base_url = v;
        }
        if let Some(v) = file.poll_timeout_secs {
            self.poll_timeout_secs = v;
        }
        if let Some(v) = file.health_bind {
            self.health_bind = Some(v);
        }
        if let Some(v) = file.backup_dir {
            self.backup_dir = v;
        }
        if let Some(v) = file.backup_on_startup {
            self.backup_on_startup = v;
        }
        if let Some(v) = file.session_max_age_secs {
            self.session_max_age_secs = v;
        }
        if let Some(v) = file.rate_limit_per_minute {
            self.rate_limit_per_minute = v;
        }
    }

    /// Applies environment overrides through `var`, so tests can feed a map
    /// instead of touching the process environment.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(v) = var("BOT_TOKEN") {
            self.bot_token = Some(v);
        }
        if let Some(v) = var("APP__BOT_TOKEN") {
            self.bot_token = Some(v);
        }

        if let Some(v) = var("DATABASE_URL") {
            self.database_url = v;
        }
        if let Some(v) = var("APP__DATABASE_URL") {
            self.database_url = v;
        }

        if let Some(v) = var("ADMIN_IDS") {
            self.admin_ids = parse_admin_ids(&v)?;
        }
        if let Some(v) = var("PAGE_SIZE") {
            self.page_size = v
                .trim()
                .parse()
                .with_context(|| format!("PAGE_SIZE must be a positive number, got '{v}'"))?;
        }
        if let Some(v) = var("HEALTH_BIND") {
            self.health_bind = Some(v).filter(|bind| !bind.trim().is_empty());
        }
        if let Some(v) = var("BACKUP_DIR") {
            self.backup_dir = PathBuf::from(v);
        }

        Ok(())
    }
}

fn parse_admin_ids(raw: &str) -> anyhow::Result<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>()
                .with_context(|| format!("ADMIN_IDS entry '{part}' is not a numeric user id"))
        })
        .collect()
}

pub fn load_settings() -> anyhow::Result<Settings> {
    load_settings_from(Path::new(CONFIG_FILE), |key| std::env::var(key).ok())
}

fn load_settings_from(
    path: &Path,
    var: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if path.exists() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        let file: FileSettings = toml::from_str(&raw)
            .with_context(|| format!("failed to parse '{}'", path.display()))?;
        settings.apply_file(file);
    }

    settings.apply_env(var)?;
    Ok(settings)
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    ensure_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite://") {
        if has_drive_letter(path) {
            return format!("sqlite:{}", path.replace('\\', "/"));
        }
        return raw_database_url.to_string();
    }

    if raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        if has_drive_letter(&path) {
            return format!("sqlite:{path}");
        }
        return format!("sqlite://{path}");
    }

    let path = raw_database_url.replace('\\', "/");
    if has_drive_letter(&path) {
        return format!("sqlite:{path}");
    }
    format!("sqlite://{path}")
}

fn has_drive_letter(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn ensure_parent_dir_exists(database_url: &str) -> anyhow::Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
