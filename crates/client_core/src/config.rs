use std::{fs, path::Path};

use serde::Deserialize;

use crate::SyncPolicy;

pub const DEFAULT_SETTINGS_FILE: &str = "todo.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub auth_token: Option<String>,
    pub page_size: u32,
    pub request_timeout_secs: u64,
    pub sync_policy: SyncPolicy,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:20002/graphql".into(),
            api_key: None,
            auth_token: None,
            page_size: 100,
            request_timeout_secs: 15,
            sync_policy: SyncPolicy::default(),
            log_filter: "info".into(),
        }
    }
}

/// Every key is optional; absent keys keep the default.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    endpoint: Option<String>,
    api_key: Option<String>,
    auth_token: Option<String>,
    page_size: Option<u32>,
    request_timeout_secs: Option<u64>,
    sync_policy: Option<SyncPolicy>,
    log_filter: Option<String>,
}

/// Defaults, then the TOML file at `path`, then process environment.
///
/// Problems with either source are returned as diagnostics rather than
/// logged, so callers can report them once logging is set up.
pub fn load_settings_from(path: &Path) -> (Settings, Vec<String>) {
    let mut settings = Settings::default();
    let mut diagnostics = Vec::new();
    if let Some(file_cfg) = read_file_settings(path, &mut diagnostics) {
        apply_file_settings(&mut settings, file_cfg);
    }
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok(), &mut diagnostics);
    reject_zero_limits(&mut settings, &mut diagnostics);
    (settings, diagnostics)
}

fn read_file_settings(path: &Path, diagnostics: &mut Vec<String>) -> Option<FileSettings> {
    let raw = fs::read_to_string(path).ok()?;
    match toml::from_str::<FileSettings>(&raw) {
        Ok(file_cfg) => Some(file_cfg),
        Err(err) => {
            diagnostics.push(format!(
                "config: ignoring malformed settings file {}: {err}",
                path.display()
            ));
            None
        }
    }
}

fn apply_file_settings(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.endpoint {
        settings.endpoint = v;
    }
    if file_cfg.api_key.is_some() {
        settings.api_key = file_cfg.api_key;
    }
    if file_cfg.auth_token.is_some() {
        settings.auth_token = file_cfg.auth_token;
    }
    if let Some(v) = file_cfg.page_size {
        settings.page_size = v;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = file_cfg.sync_policy {
        settings.sync_policy = v;
    }
    if let Some(v) = file_cfg.log_filter {
        settings.log_filter = v;
    }
}

/// `APP__*` names take precedence over the short `TODO_*` aliases.
fn apply_env_overrides(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
    diagnostics: &mut Vec<String>,
) {
    if let Some(v) = lookup("TODO_ENDPOINT") {
        settings.endpoint = v;
    }
    if let Some(v) = lookup("APP__ENDPOINT") {
        settings.endpoint = v;
    }

    if let Some(v) = lookup("TODO_API_KEY") {
        settings.api_key = Some(v);
    }
    if let Some(v) = lookup("APP__API_KEY") {
        settings.api_key = Some(v);
    }

    if let Some(v) = lookup("TODO_AUTH_TOKEN") {
        settings.auth_token = Some(v);
    }
    if let Some(v) = lookup("APP__AUTH_TOKEN") {
        settings.auth_token = Some(v);
    }

    if let Some(v) = lookup("APP__PAGE_SIZE") {
        match v.parse::<u32>() {
            Ok(parsed) => settings.page_size = parsed,
            Err(err) => diagnostics.push(format!("config: ignoring APP__PAGE_SIZE={v}: {err}")),
        }
    }

    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.request_timeout_secs = parsed,
            Err(err) => diagnostics.push(format!(
                "config: ignoring APP__REQUEST_TIMEOUT_SECS={v}: {err}"
            )),
        }
    }

    if let Some(v) = lookup("APP__SYNC_POLICY") {
        match v.parse::<SyncPolicy>() {
            Ok(parsed) => settings.sync_policy = parsed,
            Err(err) => diagnostics.push(format!("config: ignoring APP__SYNC_POLICY: {err}")),
        }
    }

    if let Some(v) = lookup("APP__LOG_FILTER") {
        settings.log_filter = v;
    }
}

/// A zero timeout fails every request and a zero page size is meaningless.
fn reject_zero_limits(settings: &mut Settings, diagnostics: &mut Vec<String>) {
    let defaults = Settings::default();
    if settings.request_timeout_secs == 0 {
        diagnostics.push(format!(
            "config: request_timeout_secs must be positive, using {}",
            defaults.request_timeout_secs
        ));
        settings.request_timeout_secs = defaults.request_timeout_secs;
    }
    if settings.page_size == 0 {
        diagnostics.push(format!(
            "config: page_size must be positive, using {}",
            defaults.page_size
        ));
        settings.page_size = defaults.page_size;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
