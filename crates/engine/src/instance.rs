//! Live UDF instances
//!
//! An [`Instance`] binds one [`Definition`] to one partition. It owns a private
//! Lua state, built by re-running the definition's source, so accumulators
//! declared at the top level of a script start from their initial values and
//! are never shared with any other instance.
//!
//! ## Lifecycle
//!
//! ```text
//! UNINITIALIZED --create--> READY --retire--> RETIRED
//! ```
//!
//! Hook calls are valid only in `READY`. A script fault leaves the instance
//! `READY`; whether to keep using it is the caller's decision.

use mlua::{Function, Lua, Value as LuaValue};
use sluice_core::{PartitionKey, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::definition::{chunk_name, Definition, Hook};
use crate::error::{Error, Result};

/// Hook label reported when top-level code faults during instance creation
const INIT: &str = "init";

/// Lifecycle state of an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    /// No execution context yet
    Uninitialized,
    /// Execution context live, hooks callable
    Ready,
    /// Execution context released
    Retired,
}

/// Private execution context of one instance
struct ExecutionContext {
    // Function handles are declared before `lua` so they drop first.
    evaluate: Function,
    exclude: Option<Function>,
    clear: Option<Function>,
    lua: Lua,
}

impl ExecutionContext {
    fn build(definition: &Definition, partition: &PartitionKey) -> Result<Self> {
        let fault = |cause: mlua::Error| Error::ScriptExecution {
            udf: definition.name().to_string(),
            partition: partition.clone(),
            hook: INIT,
            cause,
        };

        let lua = definition
            .environment()
            .create_state(definition.name(), partition.as_str())
            .map_err(fault)?;
        lua.load(definition.source())
            .set_name(chunk_name(definition.name()))
            .exec()
            .map_err(fault)?;

        let globals = lua.globals();
        let bind = |hook: Hook| -> Result<Option<Function>> {
            if !definition.has_hook(hook) {
                return Ok(None);
            }
            match globals.get::<LuaValue>(hook.entry_point()) {
                Ok(LuaValue::Function(function)) => Ok(Some(function)),
                _ => Err(Error::MissingHook {
                    name: definition.name().to_string(),
                    hook,
                }),
            }
        };

        let evaluate = bind(Hook::Evaluate)?.ok_or_else(|| Error::MissingHook {
            name: definition.name().to_string(),
            hook: Hook::Evaluate,
        })?;
        let exclude = bind(Hook::Exclude)?;
        let clear = bind(Hook::Clear)?;
        drop(globals);

        Ok(Self {
            evaluate,
            exclude,
            clear,
            lua,
        })
    }
}

/// One stateful binding of a definition to a partition
pub struct Instance {
    definition: Arc<Definition>,
    partition: PartitionKey,
    context: Option<ExecutionContext>,
    last_result: Value,
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("udf", &self.definition.name())
            .field("partition", &self.partition)
            .field("state", &self.state())
            .field("last_result", &self.last_result)
            .finish()
    }
}

impl Instance {
    /// Create a ready instance with a fresh execution context
    ///
    /// The definition is bound here; later re-registrations of the same name
    /// do not affect this instance.
    ///
    /// # Errors
    ///
    /// Returns `Error::ScriptExecution` (hook `init`) if the source faults
    /// while initializing, or `Error::MissingHook` if a recorded hook is not a
    /// function in the new context.
    pub fn create(definition: Arc<Definition>, partition: impl Into<PartitionKey>) -> Result<Self> {
        let partition = partition.into();
        let context = ExecutionContext::build(&definition, &partition).map_err(|e| {
            warn!(target: "sluice::instance", udf = definition.name(), partition = %partition, error = %e, "Instance initialization failed");
            e
        })?;

        debug!(target: "sluice::instance", udf = definition.name(), partition = %partition, "Instance ready");

        Ok(Self {
            definition,
            partition,
            context: Some(context),
            last_result: Value::Null,
        })
    }

    /// Current lifecycle state
    pub fn state(&self) -> InstanceState {
        if self.context.is_some() {
            InstanceState::Ready
        } else {
            InstanceState::Retired
        }
    }

    /// Definition bound at creation
    pub fn definition(&self) -> &Arc<Definition> {
        &self.definition
    }

    /// Owning partition
    pub fn partition(&self) -> &PartitionKey {
        &self.partition
    }

    /// Result of the most recent `evaluate` or `exclude` call
    pub fn last_result(&self) -> &Value {
        &self.last_result
    }

    /// Fold a tuple in
    pub fn evaluate(&mut self, value: &Value) -> Result<Value> {
        let context = self.context.as_ref().ok_or_else(|| self.retired())?;
        let result = self.call(context, Hook::Evaluate, &context.evaluate, value)?;
        self.last_result = result.clone();
        Ok(result)
    }

    /// Fold a departing tuple out
    ///
    /// Without an `exclude` hook this returns the last result unchanged.
    pub fn exclude(&mut self, value: &Value) -> Result<Value> {
        let context = self.context.as_ref().ok_or_else(|| self.retired())?;
        let Some(exclude) = &context.exclude else {
            return Ok(self.last_result.clone());
        };
        let result = self.call(context, Hook::Exclude, exclude, value)?;
        self.last_result = result.clone();
        Ok(result)
    }

    /// Reset accumulated state through the `clear` hook; no-op without one
    ///
    /// A successful `clear` also forgets the last result, so a following
    /// `exclude` with no hook returns `Value::Null`.
    pub fn clear(&mut self) -> Result<()> {
        let context = self.context.as_ref().ok_or_else(|| self.retired())?;
        let Some(clear) = &context.clear else {
            return Ok(());
        };
        clear
            .call::<()>(())
            .map_err(|cause| self.fault(Hook::Clear, cause))?;
        self.last_result = Value::Null;
        Ok(())
    }

    /// Release the execution context
    pub fn retire(&mut self) -> Result<()> {
        if self.context.take().is_none() {
            return Err(self.retired());
        }
        self.last_result = Value::Null;
        debug!(target: "sluice::instance", udf = self.definition.name(), partition = %self.partition, "Instance retired");
        Ok(())
    }

    fn call(
        &self,
        context: &ExecutionContext,
        hook: Hook,
        function: &Function,
        value: &Value,
    ) -> Result<Value> {
        let bridge = self.definition.environment().bridge();
        let argument = bridge
            .to_script(&context.lua, value)
            .map_err(|cause| self.fault(hook, cause))?;
        let returned = function
            .call::<LuaValue>(argument)
            .map_err(|cause| self.fault(hook, cause))?;
        Ok(bridge.from_script(&context.lua, returned))
    }

    fn fault(&self, hook: Hook, cause: mlua::Error) -> Error {
        warn!(target: "sluice::instance", udf = self.definition.name(), partition = %self.partition, hook = %hook, error = %cause, "Script fault");
        Error::ScriptExecution {
            udf: self.definition.name().to_string(),
            partition: self.partition.clone(),
            hook: hook.entry_point(),
            cause,
        }
    }

    fn retired(&self) -> Error {
        Error::InstanceRetired {
            name: self.definition.name().to_string(),
            partition: self.partition.clone(),
        }
    }
}
