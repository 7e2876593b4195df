//! Conversion between engine values and script values
//!
//! The bridge is the only place where [`Value`] meets the Lua runtime.
//!
//! | Engine | Script |
//! |--------|--------|
//! | `Null` | `nil` |
//! | `Bool` | boolean |
//! | `Int` | integer |
//! | `Float` | float |
//! | `String` | string |
//! | `List` | sequence userdata (aliases the engine list) |
//! | `Map` | mapping userdata (aliases the engine map) |
//! | `Record` | sequence userdata over the field values (names dropped) |
//!
//! Going back, sequence/mapping userdata return the very handle they wrap, so
//! mutations made by a hook are visible to the caller. Plain Lua tables become
//! fresh lists or maps. Anything else becomes the string
//! `"<opaque_prefix>:<tostring(value)>"`, which makes [`TypeBridge::from_script`]
//! total.

use mlua::{
    AnyUserData, Function, Lua, MetaMethod, Table, UserData, UserDataMethods, Value as LuaValue,
};
use sluice_core::{List, Map, Value};
use std::sync::Arc;

use crate::config::ScriptConfig;

/// Value converter bound to one runtime configuration
#[derive(Debug, Clone)]
pub struct TypeBridge {
    opaque_prefix: Arc<str>,
    max_depth: usize,
}

impl Default for TypeBridge {
    fn default() -> Self {
        Self::from_config(&ScriptConfig::default())
    }
}

impl TypeBridge {
    /// Create a bridge with an explicit opaque prefix and table nesting limit
    pub fn new(opaque_prefix: impl Into<String>, max_depth: usize) -> Self {
        Self {
            opaque_prefix: Arc::from(opaque_prefix.into()),
            max_depth,
        }
    }

    /// Create a bridge from the runtime configuration
    pub fn from_config(config: &ScriptConfig) -> Self {
        Self::new(config.opaque_prefix.clone(), config.max_bridge_depth)
    }

    /// Prefix used for values with no engine counterpart
    pub fn opaque_prefix(&self) -> &str {
        &self.opaque_prefix
    }

    /// Convert an engine value into a script value
    ///
    /// Fails only if the runtime cannot allocate the script-side object.
    pub fn to_script(&self, lua: &Lua, value: &Value) -> mlua::Result<LuaValue> {
        Ok(match value {
            Value::Null => LuaValue::Nil,
            Value::Bool(b) => LuaValue::Boolean(*b),
            Value::Int(i) => LuaValue::Integer(*i),
            Value::Float(f) => LuaValue::Number(*f),
            Value::String(s) => LuaValue::String(lua.create_string(s)?),
            Value::List(list) => self.sequence(lua, list.clone())?,
            Value::Map(map) => LuaValue::UserData(lua.create_userdata(MapHandle {
                map: map.clone(),
                bridge: self.clone(),
            })?),
            Value::Record(record) => self.sequence(lua, List::from(record.values().to_vec()))?,
        })
    }

    /// Convert a script value back into an engine value. Never fails.
    pub fn from_script(&self, lua: &Lua, value: LuaValue) -> Value {
        self.convert(lua, value, 0)
    }

    fn sequence(&self, lua: &Lua, list: List) -> mlua::Result<LuaValue> {
        Ok(LuaValue::UserData(lua.create_userdata(SeqHandle {
            list,
            bridge: self.clone(),
        })?))
    }

    fn convert(&self, lua: &Lua, value: LuaValue, depth: usize) -> Value {
        match value {
            LuaValue::Nil => Value::Null,
            LuaValue::Boolean(b) => Value::Bool(b),
            LuaValue::Integer(i) => Value::Int(i),
            LuaValue::Number(n) => Value::Float(n),
            LuaValue::String(s) => Value::String(s.to_string_lossy().into()),
            LuaValue::UserData(ud) => {
                if let Ok(seq) = ud.borrow::<SeqHandle>() {
                    return Value::List(seq.list.clone());
                }
                if let Ok(map) = ud.borrow::<MapHandle>() {
                    return Value::Map(map.map.clone());
                }
                self.opaque(lua, LuaValue::UserData(ud))
            }
            LuaValue::Table(table) => match self.table_to_value(lua, &table, depth) {
                Some(value) => value,
                None => self.opaque(lua, LuaValue::Table(table)),
            },
            other => self.opaque(lua, other),
        }
    }

    /// Array tables (keys exactly `1..=n`, including the empty table) become a
    /// list; tables keyed only by strings become a map. Anything else is `None`.
    fn table_to_value(&self, lua: &Lua, table: &Table, depth: usize) -> Option<Value> {
        if depth >= self.max_depth {
            return None;
        }

        let len = table.raw_len();
        let mut entries = Vec::new();
        for pair in table.clone().pairs::<LuaValue, LuaValue>() {
            entries.push(pair.ok()?);
        }

        if entries.len() == len {
            let mut items = Vec::with_capacity(len);
            let mut dense = true;
            for index in 1..=len {
                match table.raw_get::<LuaValue>(index) {
                    Ok(LuaValue::Nil) | Err(_) => {
                        dense = false;
                        break;
                    }
                    Ok(item) => items.push(self.convert(lua, item, depth + 1)),
                }
            }
            if dense {
                return Some(Value::List(List::from(items)));
            }
        }

        let map = Map::new();
        for (key, value) in entries {
            match key {
                LuaValue::String(key) => {
                    map.insert(
                        String::from(key.to_string_lossy()),
                        self.convert(lua, value, depth + 1),
                    );
                }
                _ => return None,
            }
        }
        Some(Value::Map(map))
    }

    fn opaque(&self, lua: &Lua, value: LuaValue) -> Value {
        let type_name = value.type_name();
        let rendered = lua
            .globals()
            .get::<Function>("tostring")
            .and_then(|tostring| tostring.call::<String>(value))
            .unwrap_or_else(|_| type_name.to_string());
        Value::String(format!("{}:{}", self.opaque_prefix, rendered))
    }
}

/// Classify a script value for `udf.shape`
pub(crate) fn shape_of(value: &LuaValue) -> &'static str {
    match value {
        LuaValue::Nil => "null",
        LuaValue::Boolean(_) => "boolean",
        LuaValue::Integer(_) | LuaValue::Number(_) => "number",
        LuaValue::String(_) => "string",
        LuaValue::Table(_) => "table",
        LuaValue::UserData(ud) if ud.is::<SeqHandle>() => "sequence",
        LuaValue::UserData(ud) if ud.is::<MapHandle>() => "mapping",
        _ => "other",
    }
}

// ============================================================================
// Script-side collection handles
// ============================================================================
//
// Methods that store a script value are registered as functions taking the
// receiver as `AnyUserData`. The receiver is cloned out and its borrow
// released before the argument is converted, so passing a handle to its own
// method resolves to the handle (and is rejected) instead of failing to
// borrow and degrading to an opaque string.

/// Clone a handle out of its userdata, releasing the borrow immediately
fn detach<T: UserData + Clone + 'static>(ud: &AnyUserData) -> mlua::Result<T> {
    let this = ud.borrow::<T>()?;
    Ok(T::clone(&this))
}

/// Collection a value is about to be stored into
#[derive(Clone, Copy)]
enum Receiver<'a> {
    Seq(&'a List),
    Mapping(&'a Map),
}

impl Receiver<'_> {
    fn is(self, value: &Value) -> bool {
        match (self, value) {
            (Receiver::Seq(list), Value::List(other)) => list.ptr_eq(other),
            (Receiver::Mapping(map), Value::Map(other)) => map.ptr_eq(other),
            _ => false,
        }
    }

    /// Reject `value` if the receiver is reachable from it
    fn admit(self, value: Value) -> mlua::Result<Value> {
        if reaches(&value, self, &mut Vec::new()) {
            let kind = match self {
                Receiver::Seq(_) => "sequence",
                Receiver::Mapping(_) => "mapping",
            };
            return Err(mlua::Error::RuntimeError(format!(
                "cannot store a value that contains this {} in it (reference cycle)",
                kind
            )));
        }
        Ok(value)
    }
}

fn same_handle(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::List(a), Value::List(b)) => a.ptr_eq(b),
        (Value::Map(a), Value::Map(b)) => a.ptr_eq(b),
        _ => false,
    }
}

/// Depth-first search for the receiver. `path` holds the handles on the
/// current branch so cycles built outside the bridge terminate.
fn reaches(value: &Value, receiver: Receiver<'_>, path: &mut Vec<Value>) -> bool {
    if receiver.is(value) {
        return true;
    }
    if path.iter().any(|seen| same_handle(seen, value)) {
        return false;
    }
    let children = match value {
        Value::List(list) => list.to_vec(),
        Value::Map(map) => map.to_index_map().into_values().collect(),
        Value::Record(record) => record.values().to_vec(),
        _ => return false,
    };

    path.push(value.clone());
    let found = children.iter().any(|child| reaches(child, receiver, path));
    path.pop();
    found
}

/// Script view of an engine list. Indices are 1-based on the script side.
#[derive(Clone)]
pub(crate) struct SeqHandle {
    list: List,
    bridge: TypeBridge,
}

impl SeqHandle {
    fn element(&self, lua: &Lua, index: i64) -> mlua::Result<LuaValue> {
        match slot(index, self.list.len()).and_then(|i| self.list.get(i)) {
            Some(value) => self.bridge.to_script(lua, &value),
            None => Ok(LuaValue::Nil),
        }
    }

    fn incoming(&self, lua: &Lua, value: LuaValue) -> mlua::Result<Value> {
        Receiver::Seq(&self.list).admit(self.bridge.from_script(lua, value))
    }

    fn store(&self, lua: &Lua, index: i64, value: LuaValue) -> mlua::Result<()> {
        let value = self.incoming(lua, value)?;
        let len = self.list.len();
        match slot(index, len) {
            Some(i) => {
                self.list.set(i, value);
                Ok(())
            }
            None if index == len as i64 + 1 => {
                self.list.push(value);
                Ok(())
            }
            None => Err(mlua::Error::RuntimeError(format!(
                "sequence index {} out of range (size {})",
                index, len
            ))),
        }
    }
}

/// Convert a 1-based script index into a 0-based position
fn slot(index: i64, len: usize) -> Option<usize> {
    if index >= 1 && (index as u64) <= len as u64 {
        Some(index as usize - 1)
    } else {
        None
    }
}

/// Integer-valued script key, accepting floats with no fractional part
fn integer_key(key: &LuaValue) -> Option<i64> {
    match key {
        LuaValue::Integer(i) => Some(*i),
        LuaValue::Number(n) if n.fract() == 0.0 => Some(*n as i64),
        _ => None,
    }
}

impl UserData for SeqHandle {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_function("add", |lua, (ud, value): (AnyUserData, LuaValue)| {
            let this = detach::<SeqHandle>(&ud)?;
            let value = this.incoming(lua, value)?;
            this.list.push(value);
            Ok(())
        });
        methods.add_method("get", |lua, this, index: i64| this.element(lua, index));
        methods.add_function(
            "set",
            |lua, (ud, index, value): (AnyUserData, i64, LuaValue)| {
                detach::<SeqHandle>(&ud)?.store(lua, index, value)
            },
        );
        methods.add_method("remove", |lua, this, index: i64| {
            match slot(index, this.list.len()).and_then(|i| this.list.remove(i)) {
                Some(removed) => this.bridge.to_script(lua, &removed),
                None => Ok(LuaValue::Nil),
            }
        });
        methods.add_method("size", |_, this, ()| Ok(this.list.len()));

        methods.add_meta_method(MetaMethod::Len, |_, this, ()| Ok(this.list.len()));
        methods.add_meta_method(MetaMethod::Index, |lua, this, key: LuaValue| {
            match integer_key(&key) {
                Some(index) => this.element(lua, index),
                None => Ok(LuaValue::Nil),
            }
        });
        methods.add_meta_function(
            MetaMethod::NewIndex,
            |lua, (ud, key, value): (AnyUserData, LuaValue, LuaValue)| match integer_key(&key) {
                Some(index) => detach::<SeqHandle>(&ud)?.store(lua, index, value),
                None => Err(mlua::Error::RuntimeError(format!(
                    "sequence index must be an integer, got {}",
                    key.type_name()
                ))),
            },
        );
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("{:?}", this.list))
        });
    }
}

/// Script view of an engine map
#[derive(Clone)]
pub(crate) struct MapHandle {
    map: Map,
    bridge: TypeBridge,
}

impl MapHandle {
    fn lookup(&self, lua: &Lua, key: &str) -> mlua::Result<LuaValue> {
        match self.map.get(key) {
            Some(value) => self.bridge.to_script(lua, &value),
            None => Ok(LuaValue::Nil),
        }
    }

    fn incoming(&self, lua: &Lua, value: LuaValue) -> mlua::Result<Value> {
        Receiver::Mapping(&self.map).admit(self.bridge.from_script(lua, value))
    }
}

impl UserData for MapHandle {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_function(
            "put",
            |lua, (ud, key, value): (AnyUserData, String, LuaValue)| {
                let this = detach::<MapHandle>(&ud)?;
                let value = this.incoming(lua, value)?;
                match this.map.insert(key, value) {
                    Some(previous) => this.bridge.to_script(lua, &previous),
                    None => Ok(LuaValue::Nil),
                }
            },
        );
        methods.add_method("get", |lua, this, key: String| this.lookup(lua, &key));
        methods.add_method("contains", |_, this, key: String| {
            Ok(this.map.contains_key(&key))
        });
        methods.add_method("remove", |lua, this, key: String| {
            match this.map.remove(&key) {
                Some(removed) => this.bridge.to_script(lua, &removed),
                None => Ok(LuaValue::Nil),
            }
        });
        methods.add_method("keys", |lua, this, ()| {
            let keys: List = this.map.keys().into_iter().collect();
            this.bridge.sequence(lua, keys)
        });
        methods.add_method("size", |_, this, ()| Ok(this.map.len()));

        methods.add_meta_method(MetaMethod::Len, |_, this, ()| Ok(this.map.len()));
        methods.add_meta_method(MetaMethod::Index, |lua, this, key: LuaValue| match key {
            LuaValue::String(key) => this.lookup(lua, &key.to_string_lossy()),
            _ => Ok(LuaValue::Nil),
        });
        methods.add_meta_function(
            MetaMethod::NewIndex,
            |lua, (ud, key, value): (AnyUserData, String, LuaValue)| {
                let this = detach::<MapHandle>(&ud)?;
                if value.is_nil() {
                    this.map.remove(&key);
                } else {
                    let value = this.incoming(lua, value)?;
                    this.map.insert(key, value);
                }
                Ok(())
            },
        );
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("{:?}", this.map))
        });
    }
}
