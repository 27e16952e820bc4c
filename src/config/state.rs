// Application state module
// Immutable per-process state shared by every connection

use super::types::Config;
use crate::handler::static_files::StaticFiles;
use crate::http::cache::{CacheValidator, EtagSeed};
use crate::http::rewrite::PathRewrite;

/// Application state
///
/// Built once at startup and never mutated afterwards, so request handling
/// needs no locks.
pub struct AppState {
    pub config: Config,
    pub validator: CacheValidator,
    pub rewrite: PathRewrite,
    pub files: StaticFiles,
}

impl AppState {
    /// Create `AppState` with a seed taken from the current time
    pub fn new(config: &Config) -> Self {
        Self::with_seed(config, EtagSeed::from_process_start())
    }

    /// Create `AppState` with an explicit `ETag` seed
    pub fn with_seed(config: &Config, seed: EtagSeed) -> Self {
        let assets = &config.assets;

        Self {
            config: config.clone(),
            validator: CacheValidator::new(seed, !assets.no_cache),
            rewrite: PathRewrite::new(assets.app_root.as_deref()),
            files: StaticFiles::from_config(assets),
        }
    }
}
