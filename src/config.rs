use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FleetError, Result};

/// Read and parse the instance map. The TOML parser rejects duplicate keys,
/// so a map that loads here has unique instance names.
pub fn load_config(path: &Path) -> Result<FleetConfig> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(FleetError::config(format!(
                "instance map not found at {}",
                path.display()
            )));
        }
        Err(e) => {
            return Err(FleetError::config(format!(
                "failed to read {}: {}",
                path.display(),
                e
            )));
        }
    };
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<FleetConfig> {
    let config: FleetConfig = toml::from_str(content)?;
    log::debug!("loaded {} instance definitions", config.instances.len());
    Ok(config)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    /// Environment variable the dynamic loader searches for shared libraries.
    #[serde(default = "default_library_path_var")]
    pub library_path_var: String,
    #[serde(default)]
    pub instances: BTreeMap<String, InstanceConfig>,
}

fn default_library_path_var() -> String {
    if cfg!(target_os = "macos") {
        "DYLD_LIBRARY_PATH".to_string()
    } else {
        "LD_LIBRARY_PATH".to_string()
    }
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            library_path_var: default_library_path_var(),
            instances: BTreeMap::new(),
        }
    }
}

/// Per-instance directives. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstanceConfig {
    pub pgdata: PathBuf,
    pub pgbinaries: PathBuf,
    pub log: PathBuf,
    #[serde(default)]
    pub port: Option<u16>,
    /// Server settings forwarded to the control program on start/restart.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl InstanceConfig {
    pub fn new(
        pgdata: impl Into<PathBuf>,
        pgbinaries: impl Into<PathBuf>,
        log: impl Into<PathBuf>,
    ) -> Self {
        Self {
            pgdata: pgdata.into(),
            pgbinaries: pgbinaries.into(),
            log: log.into(),
            port: None,
            options: BTreeMap::new(),
        }
    }
}
