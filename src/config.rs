use std::env;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{DumpError, Result};
use crate::utils::DEFAULT_PEEK_SIZE;

/// Files checked, in order, for TOML settings.
const CONFIG_PATHS: [&str; 2] = ["./mpegdump.toml", "./config/mpegdump.toml"];

/// Tunables for an analysis run.
///
/// Options missing from a config file keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// First window size used when scanning for start codes
    pub initial_peek_size: usize,
    /// Skip `00 00 00 01` sequences while scanning program streams
    pub skip_escapes: bool,
    /// Drop a PID's pending payload once it grows past this many bytes
    pub max_pending_bytes: Option<usize>,
    /// Report continuity counter gaps in transport streams
    pub check_continuity: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            initial_peek_size: DEFAULT_PEEK_SIZE,
            skip_escapes: false,
            max_pending_bytes: None,
            check_continuity: true,
        }
    }
}

impl AnalyzerConfig {
    /// Builds a config from defaults, then the first readable config file,
    /// then `MPEGDUMP_*` environment variables.
    pub fn load() -> Result<Self> {
        let mut config = match CONFIG_PATHS
            .iter()
            .find_map(|path| fs::read_to_string(path).ok())
        {
            Some(content) => Self::from_toml(&content)?,
            None => Self::default(),
        };

        for (key, value) in env::vars() {
            if let Some(name) = key.strip_prefix("MPEGDUMP_") {
                config.set(&name.to_ascii_lowercase(), &value)?;
            }
        }

        Ok(config)
    }

    /// Parses a TOML config document.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Sets one option from its string form, as given in an environment
    /// variable. Unknown names are ignored with a warning.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "initial_peek_size" => self.initial_peek_size = value.parse()?,
            "skip_escapes" => self.skip_escapes = parse_bool(key, value)?,
            "max_pending_bytes" => {
                self.max_pending_bytes = match value {
                    "" | "none" => None,
                    v => Some(v.parse()?),
                }
            }
            "check_continuity" => self.check_continuity = parse_bool(key, value)?,
            _ => log::warn!("ignoring unknown config option '{}'", key),
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(DumpError::InvalidData(format!(
            "expected a boolean for '{}', got '{}'",
            key, value
        ))),
    }
}

/// Creates a default config template file if it doesn't exist
pub fn create_default_config_template<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
    if !path.as_ref().exists() {
        let template = r#"# mpegdump configuration

# First window size used when scanning for start codes
initial_peek_size = 1024

# Skip 00 00 00 01 sequences while scanning program streams
skip_escapes = false

# Drop a PID's pending payload past this many bytes (unlimited when unset)
# max_pending_bytes = 67_108_864

# Report continuity counter gaps in transport streams
check_continuity = true
"#;
        std::fs::write(path, template)?;
    }
    Ok(())
}
