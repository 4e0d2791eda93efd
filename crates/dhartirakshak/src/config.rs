//! KDL configuration for the command line client.
//!
//! ```kdl
//! api {
//!     base-url "https://dhartirakshak-backend.carnate.in"
//!     timeout-secs 30
//! }
//! weather {
//!     api-key "..."
//!     country "IN"
//! }
//! session {
//!     path "~/.config/dhartirakshak/session.json"
//! }
//! ```
//!
//! Every block and field is optional. Unknown names are errors.

use std::path::{Path, PathBuf};
use std::time::Duration;

use miette::{IntoDiagnostic, Result, WrapErr, miette};
use url::Url;

use crate::client::DEFAULT_BASE_URL;
use crate::weather::DEFAULT_COUNTRY;

const APP_DIR: &str = "dhartirakshak";

/// Whole configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Publishing API settings
    pub api: ApiConfig,
    /// OpenWeatherMap settings
    pub weather: WeatherConfig,
    /// Session persistence
    pub session: SessionConfig,
}

/// `api` block.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    /// Base URL requests are resolved against
    pub base_url: Url,
    /// Whole-request timeout; none means the transport default
    pub timeout: Option<Duration>,
}

/// `weather` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherConfig {
    /// API key; when unset the public `weather_api` setting is used
    pub api_key: Option<String>,
    /// Country code appended to city queries
    pub country: String,
}

/// `session` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// JSON file holding tokens and saved preferences
    pub path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let base_url = match Url::parse(DEFAULT_BASE_URL) {
            Ok(url) => url,
            Err(_) => unreachable!("DEFAULT_BASE_URL is a valid URL"),
        };
        Self {
            api: ApiConfig {
                base_url,
                timeout: None,
            },
            weather: WeatherConfig {
                api_key: None,
                country: DEFAULT_COUNTRY.to_owned(),
            },
            session: SessionConfig {
                path: default_session_path(),
            },
        }
    }
}

/// `<config dir>/dhartirakshak/config.kdl`, if there is a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.kdl"))
}

/// `<config dir>/dhartirakshak/session.json`, else a dotfile in the working
/// directory.
pub fn default_session_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join(APP_DIR).join("session.json"))
        .unwrap_or_else(|| PathBuf::from(".dhartirakshak-session.json"))
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

impl Config {
    /// Parse a KDL document, filling unset values with defaults.
    pub fn from_kdl(text: &str) -> Result<Self> {
        let doc = text
            .parse::<kdl::KdlDocument>()
            .map_err(|e| miette!("Failed to parse KDL: {}", e))?;

        let mut config = Config::default();
        let mut seen: Vec<&str> = Vec::new();

        for node in doc.nodes() {
            let name = node.name().value();
            if seen.contains(&name) {
                return Err(miette!("Multiple {} blocks found", name));
            }
            match name {
                "api" => parse_api(node, &mut config.api)?,
                "weather" => parse_weather(node, &mut config.weather)?,
                "session" => parse_session(node, &mut config.session)?,
                other => return Err(miette!("Unknown config node: {}", other)),
            }
            seen.push(name);
        }

        Ok(config)
    }

    /// Read `path`, or the default config file when `path` is `None`.
    ///
    /// A missing default file yields the defaults; a missing explicit file is
    /// an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) if p.exists() => p,
                _ => return Ok(Config::default()),
            },
        };
        let text = std::fs::read_to_string(&path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Self::from_kdl(&text)
    }

    /// HTTP client honoring the configured timeout.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn http_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.api.timeout {
            builder = builder.timeout(timeout);
        }
        builder
            .build()
            .into_diagnostic()
            .wrap_err("Failed to build HTTP client")
    }
}

fn children<'a>(node: &'a kdl::KdlNode) -> Result<&'a kdl::KdlDocument> {
    node.children()
        .ok_or_else(|| miette!("{} block has no children", node.name().value()))
}

fn string_arg<'a>(node: &'a kdl::KdlNode) -> Result<&'a str> {
    node.entries()
        .get(0)
        .and_then(|e| e.value().as_string())
        .ok_or_else(|| miette!("{} expects a string value", node.name().value()))
}

fn parse_api(node: &kdl::KdlNode, api: &mut ApiConfig) -> Result<()> {
    for child in children(node)?.nodes() {
        match child.name().value() {
            "base-url" => {
                let val = string_arg(child)?;
                api.base_url = Url::parse(val)
                    .map_err(|e| miette!("base-url {:?} is not a valid URL: {}", val, e))?;
            }
            "timeout-secs" => {
                let secs = child
                    .entries()
                    .get(0)
                    .and_then(|e| e.value().as_integer())
                    .ok_or_else(|| miette!("timeout-secs expects an integer value"))?;
                let secs = u64::try_from(secs)
                    .map_err(|_| miette!("timeout-secs must not be negative"))?;
                api.timeout = Some(Duration::from_secs(secs));
            }
            other => return Err(miette!("Unknown api field: {}", other)),
        }
    }
    Ok(())
}

fn parse_weather(node: &kdl::KdlNode, weather: &mut WeatherConfig) -> Result<()> {
    for child in children(node)?.nodes() {
        match child.name().value() {
            "api-key" => weather.api_key = Some(string_arg(child)?.to_owned()),
            "country" => weather.country = string_arg(child)?.to_owned(),
            other => return Err(miette!("Unknown weather field: {}", other)),
        }
    }
    Ok(())
}

fn parse_session(node: &kdl::KdlNode, session: &mut SessionConfig) -> Result<()> {
    for child in children(node)?.nodes() {
        match child.name().value() {
            "path" => session.path = expand_home(string_arg(child)?),
            other => return Err(miette!("Unknown session field: {}", other)),
        }
    }
    Ok(())
}
