//! Execution environment template
//!
//! An [`Environment`] knows how to build a fresh Lua state for one UDF
//! instance: it opens the configured standard libraries and installs the
//! `udf` helper table.
//!
//! ```lua
//! udf.name        -- UDF name
//! udf.partition   -- owning partition key
//! udf.shape(v)    -- "null" | "boolean" | "number" | "string" |
//!                 -- "sequence" | "mapping" | "table" | "other"
//! udf.log(udf.LOG_INFO, "message")
//! ```

use mlua::{Lua, LuaOptions, StdLib, Value as LuaValue};
use std::fmt;

use crate::bridge::{shape_of, TypeBridge};
use crate::config::ScriptConfig;
use crate::error::Result;

/// Global name of the helper table
pub const HELPER_TABLE: &str = "udf";

const LOG_DEBUG: i64 = 0;
const LOG_INFO: i64 = 1;
const LOG_WARN: i64 = 2;
const LOG_ERROR: i64 = 3;

/// Template for building execution contexts
#[derive(Clone)]
pub(crate) struct Environment {
    libs: StdLib,
    bridge: TypeBridge,
    script_logging: bool,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            libs: StdLib::TABLE | StdLib::STRING | StdLib::MATH | StdLib::UTF8,
            bridge: TypeBridge::default(),
            script_logging: true,
        }
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("bridge", &self.bridge)
            .field("script_logging", &self.script_logging)
            .finish_non_exhaustive()
    }
}

impl Environment {
    pub(crate) fn from_config(config: &ScriptConfig) -> Result<Self> {
        Ok(Self {
            libs: config.std_libs()?,
            bridge: TypeBridge::from_config(config),
            script_logging: config.script_logging,
        })
    }

    pub(crate) fn bridge(&self) -> &TypeBridge {
        &self.bridge
    }

    /// Build a new, empty Lua state with helpers bound to `udf` / `partition`
    pub(crate) fn create_state(&self, udf: &str, partition: &str) -> mlua::Result<Lua> {
        let lua = Lua::new_with(self.libs, LuaOptions::new())?;

        let helpers = lua.create_table()?;
        helpers.set("name", udf)?;
        helpers.set("partition", partition)?;
        helpers.set(
            "shape",
            lua.create_function(|_, value: LuaValue| Ok(shape_of(&value)))?,
        )?;

        if self.script_logging {
            let udf_name = udf.to_string();
            let partition = partition.to_string();
            let log_fn = lua.create_function(move |_, (level, msg): (i64, String)| {
                match level {
                    LOG_DEBUG => {
                        tracing::debug!(target: "sluice::script", udf = %udf_name, partition = %partition, "{}", msg)
                    }
                    LOG_WARN => {
                        tracing::warn!(target: "sluice::script", udf = %udf_name, partition = %partition, "{}", msg)
                    }
                    LOG_ERROR => {
                        tracing::error!(target: "sluice::script", udf = %udf_name, partition = %partition, "{}", msg)
                    }
                    _ => {
                        tracing::info!(target: "sluice::script", udf = %udf_name, partition = %partition, "{}", msg)
                    }
                }
                Ok(())
            })?;
            helpers.set("log", log_fn)?;
            helpers.set("LOG_DEBUG", LOG_DEBUG)?;
            helpers.set("LOG_INFO", LOG_INFO)?;
            helpers.set("LOG_WARN", LOG_WARN)?;
            helpers.set("LOG_ERROR", LOG_ERROR)?;
        }

        lua.globals().set(HELPER_TABLE, helpers)?;
        Ok(lua)
    }
}
