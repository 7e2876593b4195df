//! Script runtime configuration via `sluice.toml`
//!
//! Every execution context (one per UDF instance) is built from the same
//! [`ScriptConfig`]: which Lua standard libraries are opened, how unknown
//! script values are rendered when they cross back into the engine, and
//! whether the `udf.log` helper is installed.

use mlua::StdLib;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Config file name conventionally placed next to the engine's plan files.
pub const CONFIG_FILE_NAME: &str = "sluice.toml";

/// Script runtime configuration loaded from `sluice.toml`.
///
/// # Example
///
/// ```toml
/// libs = ["table", "string", "math", "utf8"]
/// opaque_prefix = "opaque"
/// max_bridge_depth = 32
/// script_logging = true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptConfig {
    /// Lua standard libraries opened in every execution context.
    #[serde(default = "default_libs")]
    pub libs: Vec<String>,
    /// Prefix of the synthetic string produced for script values with no
    /// engine counterpart (functions, coroutines, foreign userdata).
    #[serde(default = "default_opaque_prefix")]
    pub opaque_prefix: String,
    /// Nesting limit when converting plain script tables into engine values.
    #[serde(default = "default_max_bridge_depth")]
    pub max_bridge_depth: usize,
    /// Install `udf.log(level, msg)` in every execution context.
    #[serde(default = "default_script_logging")]
    pub script_logging: bool,
}

fn default_libs() -> Vec<String> {
    ["table", "string", "math", "utf8"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_opaque_prefix() -> String {
    "opaque".to_string()
}

fn default_max_bridge_depth() -> usize {
    32
}

fn default_script_logging() -> bool {
    true
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            libs: default_libs(),
            opaque_prefix: default_opaque_prefix(),
            max_bridge_depth: default_max_bridge_depth(),
            script_logging: default_script_logging(),
        }
    }
}

impl ScriptConfig {
    /// Translate `libs` into the runtime's library flags.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown library name.
    pub fn std_libs(&self) -> Result<StdLib> {
        let mut libs = StdLib::NONE;
        for name in &self.libs {
            libs = libs | match name.as_str() {
                "coroutine" => StdLib::COROUTINE,
                "table" => StdLib::TABLE,
                "io" => StdLib::IO,
                "os" => StdLib::OS,
                "string" => StdLib::STRING,
                "utf8" => StdLib::UTF8,
                "math" => StdLib::MATH,
                "package" => StdLib::PACKAGE,
                other => {
                    return Err(Error::config(format!(
                        "Unknown Lua library '{}'. Expected one of: coroutine, table, io, os, string, utf8, math, package.",
                        other
                    )))
                }
            };
        }
        Ok(libs)
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Sluice script runtime configuration
#
# Lua standard libraries opened in every UDF execution context.
# Available: coroutine, table, io, os, string, utf8, math, package
libs = ["table", "string", "math", "utf8"]

# Script values with no engine counterpart (functions, coroutines, ...)
# come back as the string "<opaque_prefix>:<tostring(value)>".
opaque_prefix = "opaque"

# Nesting limit when converting plain Lua tables returned by a hook.
max_bridge_depth = 32

# Install udf.log(level, msg) so scripts can log through the engine.
script_logging = true
"#
    }

    /// Parse config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text does not parse or names an unknown library.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ScriptConfig = toml::from_str(content)
            .map_err(|e| Error::config(format!("Failed to parse config: {}", e)))?;
        // Validate library names eagerly
        config.std_libs()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            Error::Config { reason } => {
                Error::config(format!("{} (in '{}')", reason, path.display()))
            }
            other => other,
        })
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
