//! TOML configuration.
//!
//! ```toml
//! [server]
//! addr = "0.0.0.0:3000"
//! trust_proxy = true
//!
//! # exact hostname -> application name
//! [hosts]
//! "localhost" = "site"
//!
//! # ordered rules, first match wins
//! [[rule]]
//! host = "127.0.0.1"
//! app = "admin"
//!
//! [[rule]]
//! regex = '^api\.'
//! case_insensitive = true
//! app = "api"
//! ```
//!
//! Application names are resolved against an [`Apps`] registry when the
//! routers are built. A name with no registered application still builds;
//! requests it matches are answered with `500`.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::warn;

use crate::app::{App, HandlerChain};
use crate::error::Error;
use crate::middleware::Stack;
use crate::vhost::{Pattern, Rule, Vhost};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    /// Keyed mapping: exact hostname to application name.
    #[serde(default)]
    pub hosts: BTreeMap<String, String>,

    /// Ordered rules.
    #[serde(default, rename = "rule")]
    pub rules: Vec<RuleConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,

    /// Take the hostname from `X-Forwarded-Host` when present.
    #[serde(default)]
    pub trust_proxy: bool,
}

fn default_addr() -> String {
    "0.0.0.0:3000".to_owned()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { addr: default_addr(), trust_proxy: false }
    }
}

/// One `[[rule]]` entry. `host` takes precedence over `regex`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    pub host: Option<String>,
    pub regex: Option<String>,
    #[serde(default)]
    pub case_insensitive: bool,
    pub app: String,
}

impl RuleConfig {
    fn pattern(&self) -> Pattern {
        match (&self.host, &self.regex) {
            (Some(host), _) => Pattern::exact(host.as_str()),
            (None, Some(source)) => Pattern::regex_with(source, self.case_insensitive),
            (None, None) => {
                warn!(app = %self.app, "rule has neither `host` nor `regex`, it will never match");
                Pattern::Never
            }
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, Error> {
        Ok(toml::from_str(raw)?)
    }

    /// Builds the host routers: the `[hosts]` map first, then the `[[rule]]`
    /// list. Sections that are absent produce no router.
    pub fn vhosts(&self, apps: &Apps) -> Vec<Vhost> {
        let mut routers = Vec::new();

        if !self.hosts.is_empty() {
            routers.push(Vhost::map(
                self.hosts.iter().map(|(host, name)| (host.as_str(), apps.target(name))),
            ));
        }

        if !self.rules.is_empty() {
            routers.push(Vhost::list(
                self.rules.iter().map(|rule| Rule::new(rule.pattern(), apps.target(&rule.app))),
            ));
        }

        routers
    }
}

/// Named applications that configuration refers to.
#[derive(Clone, Default)]
pub struct Apps {
    apps: HashMap<String, App>,
}

impl Apps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, name: impl Into<String>, app: App) -> Self {
        self.apps.insert(name.into(), app);
        self
    }

    fn target(&self, name: &str) -> Arc<dyn HandlerChain> {
        match self.apps.get(name) {
            Some(app) => Arc::new(app.clone()),
            None => {
                warn!(app = name, "no application registered under this name");
                Arc::new(Unregistered)
            }
        }
    }
}

/// Placeholder for an application name nothing was registered under.
struct Unregistered;

impl HandlerChain for Unregistered {
    fn middleware(&self) -> Option<Stack> { None }
}
