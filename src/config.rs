use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_ENV_PREFIX: &str = "DARK_KOKAN";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub transitions: TransitionsConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteConfig {
    /// Tab activated when no start location is given.
    #[serde(default = "default_tab")]
    pub default_tab: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            default_tab: default_tab(),
        }
    }
}

fn default_tab() -> String {
    "videos".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UiConfig {
    #[serde(default = "default_theme")]
    pub theme: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
        }
    }
}

fn default_theme() -> String {
    "default".into()
}

/// Transition timings. The defaults mirror the channel page's CSS: 0.4s for
/// pane transitions, 0.3s for the modal fade.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransitionsConfig {
    #[serde(default = "default_tab_hide", with = "humantime_serde")]
    pub tab_hide: Duration,
    #[serde(default = "default_player_clear", with = "humantime_serde")]
    pub player_clear: Duration,
}

impl Default for TransitionsConfig {
    fn default() -> Self {
        Self {
            tab_hide: default_tab_hide(),
            player_clear: default_player_clear(),
        }
    }
}

fn default_tab_hide() -> Duration {
    Duration::from_millis(400)
}

fn default_player_clear() -> Duration {
    Duration::from_millis(300)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CatalogConfig {
    /// Optional YAML file overriding the built-in channel content.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyticsConfig {
    #[serde(default = "default_analytics_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            enabled: default_analytics_enabled(),
            db_path: None,
        }
    }
}

fn default_analytics_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            let from_file = read_config_file(path)?;
            cfg = merge_config(cfg, from_file);
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    cfg = merge_config(cfg, load_env(prefix)?);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if !other.site.default_tab.is_empty() && other.site.default_tab != default_tab() {
        base.site.default_tab = other.site.default_tab;
    }

    if !other.ui.theme.is_empty() && other.ui.theme != default_theme() {
        base.ui.theme = other.ui.theme;
    }

    if other.transitions.tab_hide != default_tab_hide() {
        base.transitions.tab_hide = other.transitions.tab_hide;
    }
    if other.transitions.player_clear != default_player_clear() {
        base.transitions.player_clear = other.transitions.player_clear;
    }

    if other.catalog.path.is_some() {
        base.catalog.path = other.catalog.path;
    }

    if other.analytics.enabled != default_analytics_enabled() {
        base.analytics.enabled = other.analytics.enabled;
    }
    if other.analytics.db_path.is_some() {
        base.analytics.db_path = other.analytics.db_path;
    }

    base
}

fn load_env(prefix: &str) -> Result<Config> {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    if map.is_empty() {
        return Ok(Config::default());
    }

    let mut cfg = Config::default();

    for (key, value) in map {
        apply_env_value(&mut cfg, &key, value);
    }

    Ok(cfg)
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "site.default_tab" => cfg.site.default_tab = value,
        "ui.theme" => cfg.ui.theme = value,
        "transitions.tab_hide" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.transitions.tab_hide = duration;
            }
        }
        "transitions.player_clear" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.transitions.player_clear = duration;
            }
        }
        "catalog.path" => cfg.catalog.path = Some(PathBuf::from(value)),
        "analytics.enabled" => {
            cfg.analytics.enabled = matches!(value.as_str(), "1" | "true" | "TRUE" | "True");
        }
        "analytics.db_path" => cfg.analytics.db_path = Some(PathBuf::from(value)),
        _ => {}
    }
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("dark-kokan").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn load_defaults_without_files() {
        let cfg = load(LoadOptions {
            env_prefix: Some("DARK_KOKAN_TEST_NONE".into()),
            ..LoadOptions::default()
        })
        .unwrap();
        assert_eq!(cfg.site.default_tab, "videos");
        assert_eq!(cfg.ui.theme, "default");
        assert_eq!(cfg.transitions.tab_hide, Duration::from_millis(400));
        assert_eq!(cfg.transitions.player_clear, Duration::from_millis(300));
        assert!(cfg.analytics.enabled);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let mut file = fs::File::create(&path).unwrap();
        write!(
            file,
            "site:\n  default_tab: about\ntransitions:\n  tab_hide: 150ms\nanalytics:\n  enabled: false\n"
        )
        .unwrap();

        let cfg = load(LoadOptions {
            config_file: Some(path),
            env_prefix: Some("DARK_KOKAN_TEST_FILE".into()),
        })
        .unwrap();
        assert_eq!(cfg.site.default_tab, "about");
        assert_eq!(cfg.transitions.tab_hide, Duration::from_millis(150));
        assert!(!cfg.analytics.enabled);
        // Untouched sections keep their defaults.
        assert_eq!(cfg.transitions.player_clear, Duration::from_millis(300));
    }

    #[test]
    fn env_overrides() {
        env::set_var("DARK_KOKAN_TEST_ENV_UI__THEME", "kokan-dusk");
        let cfg = load(LoadOptions {
            env_prefix: Some("DARK_KOKAN_TEST_ENV".into()),
            ..LoadOptions::default()
        })
        .unwrap();
        assert_eq!(cfg.ui.theme, "kokan-dusk");
        env::remove_var("DARK_KOKAN_TEST_ENV_UI__THEME");
    }
}
