//! Site and server configuration.
//!
//! [`SiteConfig`] carries everything the browser-side controller needs to find its elements and
//! render titles/announcements. Every field has a default matching the shipped page shell, so an
//! empty TOML document is a valid configuration.

use crate::{error::SiteError, section::SectionId};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::read_to_string,
    path::{Path, PathBuf},
    time::Duration,
};

pub const DEFAULT_TITLE: &str = "Military Essentials - Discord Bot Hosting";
pub const DEFAULT_STORAGE_KEY: &str = "currentSection";

/// Element ids of the page's named controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementIds {
    pub menu_trigger: String,
    pub sidebar: String,
    pub sidebar_close: String,
    pub sidebar_overlay: String,
    /// Optional: scroll styling is skipped when the page has no navbar.
    pub navbar: String,
    /// Optional: loader dismissal is skipped when absent.
    pub page_loader: String,
}

impl Default for ElementIds {
    fn default() -> Self {
        ElementIds {
            menu_trigger: "hamburgerMenu".to_string(),
            sidebar: "sidebar".to_string(),
            sidebar_close: "sidebarClose".to_string(),
            sidebar_overlay: "sidebarOverlay".to_string(),
            navbar: "navbar".to_string(),
            page_loader: "pageLoader".to_string(),
        }
    }
}

/// CSS class names the controller reads or toggles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassNames {
    pub active: String,
    pub section: String,
    pub nav_link: String,
    pub sidebar_link: String,
    pub scrolled: String,
    pub hidden: String,
    pub page_loaded: String,
}

impl Default for ClassNames {
    fn default() -> Self {
        ClassNames {
            active: "active".to_string(),
            section: "section".to_string(),
            nav_link: "nav-link".to_string(),
            sidebar_link: "sidebar-link".to_string(),
            scrolled: "scrolled".to_string(),
            hidden: "hidden".to_string(),
            page_loaded: "page-loaded".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Delay before moving focus after the sidebar opens or closes, so the CSS transition has
    /// started.
    pub focus_delay_ms: u64,
    pub loader_delay_ms: u64,
    /// Coalescing window for scroll events.
    pub scroll_debounce_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Timing {
            focus_delay_ms: 100,
            loader_delay_ms: 300,
            scroll_debounce_ms: 150,
        }
    }
}

impl Timing {
    pub fn focus_delay(&self) -> Duration {
        Duration::from_millis(self.focus_delay_ms)
    }

    pub fn loader_delay(&self) -> Duration {
        Duration::from_millis(self.loader_delay_ms)
    }

    pub fn scroll_debounce(&self) -> Duration {
        Duration::from_millis(self.scroll_debounce_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub elements: ElementIds,
    pub classes: ClassNames,
    pub storage_key: String,
    pub default_section: SectionId,
    pub default_title: String,
    /// Document title per section id. Unmapped sections use `default_title`.
    pub titles: BTreeMap<String, String>,
    /// Human readable section names for announcements. Unmapped sections announce their id.
    pub names: BTreeMap<String, String>,
    pub timing: Timing,
    /// Scroll offset (px) past which the navbar gets the scrolled class.
    pub scroll_threshold: f64,
    /// Key that toggles the sidebar together with Ctrl or Meta.
    pub shortcut_key: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        let titles = [
            ("home", DEFAULT_TITLE),
            ("tos", "Terms of Service - Military Essentials"),
            ("privacy", "Privacy Policy - Military Essentials"),
        ];
        let names = [
            ("home", "Home"),
            ("tos", "Terms of Service"),
            ("privacy", "Privacy Policy"),
        ];
        SiteConfig {
            elements: ElementIds::default(),
            classes: ClassNames::default(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            default_section: SectionId::home(),
            default_title: DEFAULT_TITLE.to_string(),
            titles: titles
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            names: names
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            timing: Timing::default(),
            scroll_threshold: 50.0,
            shortcut_key: "k".to_string(),
        }
    }
}

impl SiteConfig {
    pub fn from_toml_str(content: &str) -> Result<SiteConfig, SiteError> {
        let config: SiteConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_path<P: AsRef<Path>>(path: P) -> Result<SiteConfig, SiteError> {
        tracing::debug!("Reading site config from {:?}", path.as_ref());
        SiteConfig::from_toml_str(&read_to_string(path)?)
    }

    pub fn from_json_str(content: &str) -> Result<SiteConfig, SiteError> {
        let config: SiteConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), SiteError> {
        let required = [
            ("menu_trigger", &self.elements.menu_trigger),
            ("sidebar", &self.elements.sidebar),
            ("sidebar_close", &self.elements.sidebar_close),
            ("sidebar_overlay", &self.elements.sidebar_overlay),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(SiteError::Config(format!("elements.{name} must not be empty")));
            }
        }
        if self.shortcut_key.chars().count() != 1 {
            return Err(SiteError::Config(format!(
                "shortcut_key must be a single character, got {:?}",
                self.shortcut_key
            )));
        }
        Ok(())
    }

    pub fn title_for(&self, section: &SectionId) -> &str {
        self.titles
            .get(section.as_str())
            .map(String::as_str)
            .unwrap_or(&self.default_title)
    }

    pub fn name_for<'a>(&'a self, section: &'a SectionId) -> &'a str {
        self.names
            .get(section.as_str())
            .map(String::as_str)
            .unwrap_or(section.as_str())
    }
}

/// Runtime settings for the static file server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Deployment environment name. `development` exposes error details in responses.
    pub environment: String,
    /// Directory holding `index.html` and the static assets.
    pub root: PathBuf,
    /// Seconds to wait for open connections during shutdown before exiting anyway.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
            environment: "development".to_string(),
            root: PathBuf::from("site"),
            shutdown_timeout_secs: 10,
        }
    }
}

impl ServerConfig {
    pub fn from_toml_path<P: AsRef<Path>>(path: P) -> Result<ServerConfig, SiteError> {
        tracing::debug!("Reading server config from {:?}", path.as_ref());
        let content = read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Overlay `PORT`, `SITE_ENV` (falling back to `NODE_ENV`) and `SITE_ROOT` from the process
    /// environment.
    pub fn with_env(self) -> Result<ServerConfig, SiteError> {
        self.with_env_lookup(|key| std::env::var(key).ok())
    }

    pub fn with_env_lookup<F>(mut self, lookup: F) -> Result<ServerConfig, SiteError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| SiteError::Config(format!("PORT is not a valid port: {port:?}")))?;
        }
        if let Some(env) = lookup("SITE_ENV").or_else(|| lookup("NODE_ENV")) {
            self.environment = env;
        }
        if let Some(root) = lookup("SITE_ROOT") {
            self.root = PathBuf::from(root);
        }
        Ok(self)
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use test_log::test;

    #[test]
    fn test_empty_toml_is_default() {
        let config = SiteConfig::from_toml_str("").unwrap();
        assert_eq!(config, SiteConfig::default());
        assert_eq!(config.storage_key, "currentSection");
        assert_eq!(config.timing.focus_delay(), Duration::from_millis(100));
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = SiteConfig::from_toml_str(
            r##"
storage_key = "lastSection"
default_section = "#tos"

[elements]
navbar = "topbar"

[timing]
scroll_debounce_ms = 50

[titles]
pricing = "Pricing - Military Essentials"
"##,
        )
        .unwrap();
        assert_eq!(config.storage_key, "lastSection");
        assert_eq!(config.default_section.as_str(), "tos");
        assert_eq!(config.elements.navbar, "topbar");
        assert_eq!(config.elements.sidebar, "sidebar");
        assert_eq!(config.timing.scroll_debounce_ms, 50);
        assert_eq!(config.timing.focus_delay_ms, 100);
        // A provided table replaces the default map wholesale
        assert_eq!(config.titles.len(), 1);
    }

    #[test]
    fn test_validation_errors() {
        assert!(matches!(
            SiteConfig::from_toml_str("shortcut_key = \"ctrl\""),
            Err(SiteError::Config(_))
        ));
        assert!(matches!(
            SiteConfig::from_toml_str("[elements]\nsidebar = \"\""),
            Err(SiteError::Config(_))
        ));
        assert!(matches!(
            SiteConfig::from_toml_str("default_section = \"a b\""),
            Err(SiteError::Config(_))
        ));
    }

    #[test]
    fn test_title_and_name_fallbacks() {
        let config = SiteConfig::default();
        let tos = SectionId::parse("tos").unwrap();
        let other = SectionId::parse("faq").unwrap();
        assert_eq!(config.title_for(&tos), "Terms of Service - Military Essentials");
        assert_eq!(config.title_for(&other), DEFAULT_TITLE);
        assert_eq!(config.name_for(&tos), "Terms of Service");
        assert_eq!(config.name_for(&other), "faq");
    }

    #[test]
    fn test_server_env_overlay() {
        let vars: HashMap<&str, &str> = [("PORT", "8080"), ("NODE_ENV", "production")].into();
        let config = ServerConfig::default()
            .with_env_lookup(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.environment, "production");
        assert!(!config.is_development());

        let vars: HashMap<&str, &str> = [("SITE_ENV", "staging"), ("NODE_ENV", "production")].into();
        let config = ServerConfig::default()
            .with_env_lookup(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.environment, "staging");

        let bad = ServerConfig::default().with_env_lookup(|k| (k == "PORT").then(|| "abc".into()));
        assert!(matches!(bad, Err(SiteError::Config(_))));
    }
}
