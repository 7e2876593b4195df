//! Compiled UDF definitions
//!
//! A [`Definition`] is produced once, at registration, by loading the source
//! into a scratch execution context and probing which entry points it defines.
//! It is immutable afterwards and shared by every [`Instance`](crate::Instance)
//! created from it.

use mlua::Value as LuaValue;
use std::fmt;
use std::sync::Arc;

use crate::config::ScriptConfig;
use crate::env::Environment;
use crate::error::{Error, Result};

/// Partition name bound to `udf.partition` while probing a definition
const COMPILE_PARTITION: &str = "<compile>";

/// Entry point a UDF source may define
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    /// `evaluate(value)`: fold a tuple in and return the result (mandatory)
    Evaluate,
    /// `exclude(value)`: fold a departing tuple out and return the result
    Exclude,
    /// `clear()`: reset accumulated state
    Clear,
}

impl Hook {
    /// All hooks in probing order
    pub const ALL: [Hook; 3] = [Hook::Evaluate, Hook::Exclude, Hook::Clear];

    /// Global function name the script defines for this hook
    pub fn entry_point(self) -> &'static str {
        match self {
            Hook::Evaluate => "evaluate",
            Hook::Exclude => "exclude",
            Hook::Clear => "clear",
        }
    }

    fn bit(self) -> u8 {
        match self {
            Hook::Evaluate => 0b001,
            Hook::Exclude => 0b010,
            Hook::Clear => 0b100,
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.entry_point())
    }
}

/// Set of hooks a definition implements
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HookSet(u8);

impl HookSet {
    /// Add a hook
    pub fn insert(&mut self, hook: Hook) {
        self.0 |= hook.bit();
    }

    /// Check whether a hook is present
    pub fn contains(self, hook: Hook) -> bool {
        self.0 & hook.bit() != 0
    }

    /// Check if no hook is present
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of hooks present
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Present hooks in probing order
    pub fn iter(self) -> impl Iterator<Item = Hook> {
        Hook::ALL.into_iter().filter(move |h| self.contains(*h))
    }
}

impl FromIterator<Hook> for HookSet {
    fn from_iter<I: IntoIterator<Item = Hook>>(iter: I) -> Self {
        let mut set = HookSet::default();
        for hook in iter {
            set.insert(hook);
        }
        set
    }
}

/// Whether a UDF folds per tuple only, or supports windowed aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// Only `evaluate`: a per-tuple transform
    Scalar,
    /// `exclude` and/or `clear` present: an incremental aggregate
    Aggregate,
}

/// Immutable, compiled UDF
#[derive(Debug)]
pub struct Definition {
    name: String,
    hooks: HookSet,
    source: Arc<str>,
    env: Arc<Environment>,
}

impl Definition {
    /// Compile `source` under `name` with the given runtime configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::Compile` if the source does not parse, faults while
    /// running its top-level code, or lacks an `evaluate` function, and
    /// `Error::Config` for an invalid configuration.
    pub fn compile(name: &str, source: &str, config: &ScriptConfig) -> Result<Self> {
        let env = Arc::new(Environment::from_config(config)?);
        Self::compile_in(name, source, env)
    }

    pub(crate) fn compile_in(name: &str, source: &str, env: Arc<Environment>) -> Result<Self> {
        let lua = env
            .create_state(name, COMPILE_PARTITION)
            .map_err(|e| Error::compile(name, e.to_string()))?;

        lua.load(source)
            .set_name(chunk_name(name))
            .exec()
            .map_err(|e| Error::compile(name, e.to_string()))?;

        let globals = lua.globals();
        let hooks: HookSet = Hook::ALL
            .into_iter()
            .filter(|hook| {
                matches!(
                    globals.get::<LuaValue>(hook.entry_point()),
                    Ok(LuaValue::Function(_))
                )
            })
            .collect();

        if hooks.is_empty() {
            return Err(Error::compile(
                name,
                "source defines no entry points (evaluate, exclude, clear)",
            ));
        }
        if !hooks.contains(Hook::Evaluate) {
            return Err(Error::compile(name, "evaluate hook is undefined"));
        }

        Ok(Self {
            name: name.to_string(),
            hooks,
            source: Arc::from(source),
            env,
        })
    }

    /// UDF name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hooks the source defines
    pub fn hooks(&self) -> HookSet {
        self.hooks
    }

    /// Check whether the source defines `hook`
    pub fn has_hook(&self, hook: Hook) -> bool {
        self.hooks.contains(hook)
    }

    /// Scalar transform or incremental aggregate
    pub fn kind(&self) -> FunctionKind {
        if self.has_hook(Hook::Exclude) || self.has_hook(Hook::Clear) {
            FunctionKind::Aggregate
        } else {
            FunctionKind::Scalar
        }
    }

    /// Source text the definition was compiled from
    pub fn source(&self) -> &str {
        &self.source
    }

    pub(crate) fn environment(&self) -> &Environment {
        &self.env
    }
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, hook) in self.hooks.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", hook)?;
        }
        f.write_str(")")
    }
}

/// Chunk name used in script error messages (`=` keeps it verbatim)
pub(crate) fn chunk_name(name: &str) -> String {
    format!("={}", name)
}
