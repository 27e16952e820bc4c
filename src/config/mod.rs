// Configuration module entry point
// Loads startup configuration and builds the shared, read-only runtime state

mod env;
mod state;
mod types;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::error::StartupError;

// Re-export public types
pub use env::parse_env_bool;
pub use state::AppState;
pub use types::{AssetsConfig, Config, LoggingConfig, PerformanceConfig, ServerConfig};

/// Default config file name (without extension)
pub const DEFAULT_CONFIG_PATH: &str = "config";

impl Config {
    /// Load configuration from `config.toml` (optional) and the process environment
    pub fn load() -> Result<Self, StartupError> {
        let config_path = std::env::args()
            .nth(1)
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
        let vars: HashMap<String, String> = std::env::vars().collect();
        let cfg = Self::load_with(&config_path, &vars)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from specified file path (without extension) and an
    /// explicit set of environment variables
    ///
    /// Priority, lowest first: defaults, config file, `ASSETS_*` variables,
    /// then the plain `PORT`/`WEB_ROOT`/`APP_ROOT`/`NO_CACHE` variables.
    pub fn load_with(
        config_path: &str,
        vars: &HashMap<String, String>,
    ) -> Result<Self, config::ConfigError> {
        let overrides = env::PlainOverrides::from_vars(vars);

        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("ASSETS")
                    .prefix_separator("_")
                    .separator("__")
                    .source(Some(vars.clone())),
            )
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("assets.web_root", "./app")?
            .set_default("assets.no_cache", false)?
            .set_default("assets.index_files", vec!["index.html"])?
            .set_default("assets.compress", true)?
            .set_default("assets.compress_brotli", true)?
            .set_default("assets.compress_min_size", 256)?
            .set_default("assets.accept_byte_range", true)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.shutdown_timeout", 10)?
            .set_override_option("server.port", overrides.port)?
            .set_override_option("assets.web_root", overrides.web_root)?
            .set_override_option("assets.app_root", overrides.app_root)?
            .set_override_option("assets.no_cache", overrides.no_cache)?
            .build()?;

        settings.try_deserialize()
    }

    /// Reject configurations the server cannot run with
    ///
    /// Startup must fail rather than serve in a degraded state.
    pub fn validate(&self) -> Result<(), StartupError> {
        if self.server.port == 0 {
            return Err(StartupError::InvalidPort(self.server.port));
        }
        self.get_socket_addr()?;

        if self.server.workers == Some(0) {
            return Err(StartupError::Invalid(
                "server.workers must be at least 1".to_string(),
            ));
        }

        if self
            .assets
            .index_files
            .iter()
            .any(|name| name.is_empty() || name.contains('/'))
        {
            return Err(StartupError::Invalid(
                "assets.index_files entries must be plain file names".to_string(),
            ));
        }

        if self.performance.read_timeout == 0 {
            return Err(StartupError::Invalid(
                "performance.read_timeout must be positive".to_string(),
            ));
        }

        if crate::logger::LogLevel::parse(&self.logging.level).is_none() {
            return Err(StartupError::Invalid(format!(
                "unknown logging.level '{}'",
                self.logging.level
            )));
        }

        check_web_root(Path::new(&self.assets.web_root))
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, StartupError> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse()
            .map_err(|source| StartupError::InvalidAddress { addr, source })
    }
}

/// The web root must be an existing, listable directory
fn check_web_root(path: &Path) -> Result<(), StartupError> {
    let web_root_error = |reason: String| StartupError::WebRoot {
        path: PathBuf::from(path),
        reason,
    };

    let metadata = std::fs::metadata(path).map_err(|e| web_root_error(e.to_string()))?;
    if !metadata.is_dir() {
        return Err(web_root_error("not a directory".to_string()));
    }
    std::fs::read_dir(path).map_err(|e| web_root_error(e.to_string()))?;
    Ok(())
}
