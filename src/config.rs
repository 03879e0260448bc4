use scim_filter::ParserLimits;
use serde::Deserialize;
use std::time::Duration;

/// Service configuration.
///
/// Loaded from `config/default.toml` (or the file named by `SCIM_SYNC_CONFIG`,
/// without its `.toml` extension), then overridden by environment variables
/// such as `SCIM_SYNC__SERVER__PORT=9000`. Every section has defaults, so no
/// file is required.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub filter: FilterConfig,
    pub list: ListConfig,
    pub forward: ForwardConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Bounds on incoming filter and attribute path strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub max_depth: usize,
    pub max_path_segments: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        let limits = ParserLimits::default();
        Self {
            max_depth: limits.max_depth,
            max_path_segments: limits.max_path_segments,
        }
    }
}

impl FilterConfig {
    pub fn limits(&self) -> ParserLimits {
        ParserLimits {
            max_depth: self.max_depth,
            max_path_segments: self.max_path_segments,
        }
    }
}

/// Pagination of list responses.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListConfig {
    /// Page size used when a request has no `count`.
    pub default_count: usize,
    /// Upper bound applied to a requested `count`.
    pub max_count: usize,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            default_count: 20,
            max_count: 200,
        }
    }
}

/// Downstream SCIM endpoint that local changes are mirrored to.
/// Forwarding is disabled while `url` is unset.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ForwardConfig {
    pub url: Option<String>,
    pub auth_token: String,
    /// Entitlement values attached to every forwarded creation.
    pub entitlements: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            url: None,
            auth_token: String::new(),
            entitlements: Vec::new(),
            timeout_secs: 10,
        }
    }
}

impl ForwardConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        let mut file_loaded = false;

        // Check for environment variable override first
        if let Ok(config_path) = std::env::var("SCIM_SYNC_CONFIG") {
            if !config_path.is_empty() {
                builder = builder.add_source(config::File::with_name(&config_path));
                file_loaded = true;
            }
        }

        if !file_loaded && std::path::Path::new("config/default.toml").exists() {
            builder = builder.add_source(config::File::with_name("config/default"));
        }

        // Always layer environment variables on top
        builder = builder.add_source(
            config::Environment::with_prefix("SCIM_SYNC")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("forward.entitlements"),
        );

        builder.build()?.try_deserialize()
    }
}
