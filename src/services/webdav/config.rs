use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

use crate::errors::{Result, WebDavError};
use crate::urn::{Urn, SEPARATOR};

use super::connection::Action;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// WebDAV server connection settings
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub hostname: String,
    pub login: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
    /// Path prefix under which every resource lives, empty for the server root
    pub root: String,
    pub cert_path: Option<PathBuf>,
    pub key_path: Option<PathBuf>,
    pub timeout_seconds: u64,
    /// Makes `check` succeed without asking the server
    pub disable_check: bool,
    /// HTTP verbs replacing the defaults for specific actions
    pub override_methods: HashMap<Action, String>,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            login: None,
            password: None,
            token: None,
            root: String::new(),
            cert_path: None,
            key_path: None,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            disable_check: false,
            override_methods: HashMap::new(),
        }
    }
}

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

fn display_option(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn display_path(value: &Option<PathBuf>) -> String {
    value
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}

impl ConnectionSettings {
    /// Creates settings for basic authentication
    pub fn new<H: Into<String>, L: Into<String>, P: Into<String>>(
        hostname: H,
        login: L,
        password: P,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            login: Some(login.into()),
            password: Some(password.into()),
            ..Default::default()
        }
    }

    /// Creates settings for bearer token authentication
    pub fn with_token<H: Into<String>, T: Into<String>>(hostname: H, token: T) -> Self {
        Self {
            hostname: hostname.into(),
            token: Some(token.into()),
            ..Default::default()
        }
    }

    pub fn with_root<S: Into<String>>(mut self, root: S) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_client_cert<C: Into<PathBuf>, K: Into<PathBuf>>(
        mut self,
        cert_path: C,
        key_path: K,
    ) -> Self {
        self.cert_path = Some(cert_path.into());
        self.key_path = Some(key_path.into());
        self
    }

    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    pub fn with_disable_check(mut self, disable_check: bool) -> Self {
        self.disable_check = disable_check;
        self
    }

    pub fn with_override_method<S: Into<String>>(mut self, action: Action, method: S) -> Self {
        self.override_methods.insert(action, method.into());
        self
    }

    /// Validates the settings before any request is made
    pub fn validate(&self) -> Result<()> {
        if self.hostname.trim().is_empty() {
            return Err(WebDavError::option_not_valid("hostname", self.hostname.clone()));
        }

        if let Some(cert_path) = &self.cert_path {
            if !cert_path.exists() {
                return Err(WebDavError::option_not_valid(
                    "cert_path",
                    display_path(&self.cert_path),
                ));
            }
        }

        if let Some(key_path) = &self.key_path {
            if !key_path.exists() {
                return Err(WebDavError::option_not_valid("key_path", display_path(&self.key_path)));
            }
        }

        if self.key_path.is_some() && self.cert_path.is_none() {
            return Err(WebDavError::option_not_valid("cert_path", display_path(&self.cert_path)));
        }

        if self.cert_path.is_some() && self.key_path.is_none() {
            return Err(WebDavError::option_not_valid("key_path", display_path(&self.key_path)));
        }

        if is_set(&self.password) && !is_set(&self.login) {
            return Err(WebDavError::option_not_valid("login", display_option(&self.login)));
        }

        if !is_set(&self.token) && !is_set(&self.login) {
            return Err(WebDavError::option_not_valid("login", display_option(&self.login)));
        }

        for method in self.override_methods.values() {
            if reqwest::Method::from_bytes(method.as_bytes()).is_err() {
                return Err(WebDavError::option_not_valid("override_methods", method.clone()));
            }
        }

        Ok(())
    }

    /// Strips trailing separators from the hostname and canonicalizes the root
    pub fn normalized(mut self) -> Self {
        self.hostname = self.hostname.trim_end_matches(SEPARATOR).to_string();
        self.root = if self.root.is_empty() {
            String::new()
        } else {
            Urn::new(&self.root)
                .quote()
                .trim_end_matches(SEPARATOR)
                .to_string()
        };
        self
    }

    /// Gets the timeout duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// True when a token is configured, which takes precedence over basic auth
    pub fn uses_token(&self) -> bool {
        is_set(&self.token)
    }

    /// Parses `action=VERB` pairs separated by commas, e.g. `check=GET,download=GET`
    pub fn parse_override_methods(value: &str) -> Result<HashMap<Action, String>> {
        let mut overrides = HashMap::new();

        for pair in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (action, method) = pair
                .split_once('=')
                .ok_or_else(|| WebDavError::option_not_valid("override_methods", pair))?;
            let action = Action::from_str(action.trim())?;
            let method = method.trim().to_uppercase();
            if method.is_empty() {
                return Err(WebDavError::option_not_valid("override_methods", pair));
            }
            overrides.insert(action, method);
        }

        Ok(overrides)
    }

    /// Loads settings from `WEBDAV_*` environment variables (and `.env`)
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let non_empty = |name: &str| env::var(name).ok().filter(|v| !v.is_empty());

        let override_methods = match non_empty("WEBDAV_OVERRIDE_METHODS") {
            Some(value) => Self::parse_override_methods(&value)
                .context("Invalid WEBDAV_OVERRIDE_METHODS")?,
            None => HashMap::new(),
        };

        Ok(Self {
            hostname: env::var("WEBDAV_HOSTNAME").context("WEBDAV_HOSTNAME must be set")?,
            login: non_empty("WEBDAV_LOGIN"),
            password: non_empty("WEBDAV_PASSWORD"),
            token: non_empty("WEBDAV_TOKEN"),
            root: env::var("WEBDAV_ROOT").unwrap_or_default(),
            cert_path: non_empty("WEBDAV_CERT_PATH").map(PathBuf::from),
            key_path: non_empty("WEBDAV_KEY_PATH").map(PathBuf::from),
            timeout_seconds: env::var("WEBDAV_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECONDS),
            disable_check: env::var("WEBDAV_DISABLE_CHECK")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            override_methods,
        })
    }
}
