use crate::core::error::{Result, RoarError};
use crate::models::config_model::DatasetConfig;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

static CONFIG_CACHE: OnceLock<DatasetConfig> = OnceLock::new();

pub const CONFIG_FILE: &str = "roar.json";
/// Environment variable naming an alternative config file.
pub const CONFIG_ENV: &str = "ROAR_CONFIG";

/// Config file to use: `$ROAR_CONFIG` if set, `roar.json` otherwise.
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
}

/// Read a config file. Relative paths inside it are taken relative to the
/// file's directory.
pub fn load_config(path: &Path) -> Result<DatasetConfig> {
    let data = fs::read_to_string(path)
        .map_err(|e| RoarError::Config(format!("File read Error: {e} {}", path.display())))?;

    let mut config: DatasetConfig = serde_json::from_str(&data)
        .map_err(|e| RoarError::Config(format!("JSON Parse Error: {e}")))?;

    if let Some(base) = path.parent() {
        config.data_dir = resolve(base, &config.data_dir);
        config.mapping_file = resolve(base, &config.mapping_file);
    }
    Ok(config)
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Load the config once for the whole process. `None` uses [`config_path`].
pub fn init_config(path: Option<&Path>) -> Result<&'static DatasetConfig> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(config_path);
    let config = load_config(&path)?;

    CONFIG_CACHE
        .set(config)
        .map_err(|_| RoarError::Config("Config already initialized".to_string()))?;

    info!("Config initialized from {}", path.display());
    Ok(cached_config())
}

/// The process config. Without a prior [`init_config`] the default file is
/// tried, then built-in defaults.
pub fn cached_config() -> &'static DatasetConfig {
    CONFIG_CACHE.get_or_init(|| {
        let path = config_path();
        if !path.is_file() {
            debug!("No config at {}, using defaults", path.display());
            return DatasetConfig::default();
        }
        match load_config(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring config {}: {}", path.display(), e);
                DatasetConfig::default()
            }
        }
    })
}
