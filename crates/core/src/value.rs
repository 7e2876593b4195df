//! Value types for Sluice
//!
//! This module defines:
//! - Value: Unified enum for every value that crosses the UDF boundary
//! - List: Shared, ordered sequence of values
//! - Map: Shared mapping with unique string keys and insertion order
//! - Record: Fixed-schema structure with named, ordered fields
//!
//! ## Sharing Model
//!
//! `List` and `Map` are handles. Cloning a handle clones the reference, not the
//! elements, so a script hook that appends to a bridged sequence mutates the
//! same storage the engine holds. Use [`List::deep_copy`] / [`Map::deep_copy`]
//! when an independent copy is needed.
//!
//! `Record` is a plain value: its field values are owned and cloned with it.
//!
//! ### Type Rules
//!
//! - `Int(1) != Float(1.0)`: different types are never equal
//! - Float uses IEEE-754 equality: `NaN != NaN`, `-0.0 == 0.0`
//! - Two handles are equal when they alias the same storage or hold equal elements
//! - Self-referencing collections are not supported by `Debug` or `PartialEq`

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// Canonical Sluice value type
///
/// Scalars are `Null`, `Bool`, `Int`, `Float` and `String`. The structured
/// variants are `List` (ordered sequence), `Map` (string-keyed, insertion
/// ordered) and `Record` (named fields with a fixed order).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point (IEEE-754)
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Shared ordered sequence
    List(List),
    /// Shared string-keyed mapping
    Map(Map),
    /// Structured record with named fields
    Record(Record),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            // IEEE-754: NaN != NaN, -0.0 == 0.0
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
            Value::Record(_) => "Record",
        }
    }

    /// Check if this is a scalar (null, bool, number or string)
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Value::List(_) | Value::Map(_) | Value::Record(_))
    }

    /// Check if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this is a numeric value (Int or Float)
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Get as bool if this is a Bool value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i64 if this is an Int value
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64 if this is a Float value
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as &str if this is a String value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the list handle if this is a List value
    pub fn as_list(&self) -> Option<&List> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// Get the map handle if this is a Map value
    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Get the record if this is a Record value
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }
}

// ============================================================================
// List
// ============================================================================

/// Shared, ordered sequence of values
///
/// Clones alias the same storage. Indices are zero-based on the Rust side.
#[derive(Clone, Default)]
pub struct List(Arc<RwLock<Vec<Value>>>);

impl List {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    /// Check if the list has no elements
    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Append a value
    pub fn push(&self, value: impl Into<Value>) {
        self.0.write().push(value.into());
    }

    /// Get a clone of the element at `index`
    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.read().get(index).cloned()
    }

    /// Replace the element at `index`, returning the previous value
    ///
    /// Returns `None` (and stores nothing) if `index` is out of bounds.
    pub fn set(&self, index: usize, value: impl Into<Value>) -> Option<Value> {
        let mut guard = self.0.write();
        let slot = guard.get_mut(index)?;
        Some(std::mem::replace(slot, value.into()))
    }

    /// Remove and return the element at `index`, shifting later elements left
    pub fn remove(&self, index: usize) -> Option<Value> {
        let mut guard = self.0.write();
        if index < guard.len() {
            Some(guard.remove(index))
        } else {
            None
        }
    }

    /// Copy of the current elements (element handles still alias)
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.read().clone()
    }

    /// Run `f` with read access to the elements
    pub fn with_elements<R>(&self, f: impl FnOnce(&[Value]) -> R) -> R {
        f(&self.0.read())
    }

    /// Independent copy with fresh storage
    pub fn deep_copy(&self) -> List {
        List::from(self.to_vec())
    }

    /// Check whether two handles alias the same storage
    pub fn ptr_eq(&self, other: &List) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for List {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        *self.0.read() == *other.0.read()
    }
}

impl fmt::Debug for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.read().iter()).finish()
    }
}

impl From<Vec<Value>> for List {
    fn from(values: Vec<Value>) -> Self {
        Self(Arc::new(RwLock::new(values)))
    }
}

impl<V: Into<Value>> FromIterator<V> for List {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        List::from(iter.into_iter().map(Into::into).collect::<Vec<Value>>())
    }
}

impl Serialize for List {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.read().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for List {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<Value>::deserialize(deserializer).map(List::from)
    }
}

// ============================================================================
// Map
// ============================================================================

/// Shared mapping with unique string keys, preserving insertion order
///
/// Clones alias the same storage.
#[derive(Clone, Default)]
pub struct Map(Arc<RwLock<IndexMap<String, Value>>>);

impl Map {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    /// Check if the map has no entries
    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Insert or replace an entry, returning the previous value
    ///
    /// Replacing keeps the key at its original position.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.write().insert(key.into(), value.into())
    }

    /// Get a clone of the value stored under `key`
    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.read().get(key).cloned()
    }

    /// Check whether `key` is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.read().contains_key(key)
    }

    /// Remove an entry, preserving the order of the remaining keys
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.0.write().shift_remove(key)
    }

    /// Keys in insertion order
    pub fn keys(&self) -> Vec<String> {
        self.0.read().keys().cloned().collect()
    }

    /// Copy of the current entries (value handles still alias)
    pub fn to_index_map(&self) -> IndexMap<String, Value> {
        self.0.read().clone()
    }

    /// Run `f` with read access to the entries
    pub fn with_entries<R>(&self, f: impl FnOnce(&IndexMap<String, Value>) -> R) -> R {
        f(&self.0.read())
    }

    /// Independent copy with fresh storage
    pub fn deep_copy(&self) -> Map {
        Map::from(self.to_index_map())
    }

    /// Check whether two handles alias the same storage
    pub fn ptr_eq(&self, other: &Map) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Map {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        *self.0.read() == *other.0.read()
    }
}

impl fmt::Debug for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.read().iter()).finish()
    }
}

impl From<IndexMap<String, Value>> for Map {
    fn from(entries: IndexMap<String, Value>) -> Self {
        Self(Arc::new(RwLock::new(entries)))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Map {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Map::from(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect::<IndexMap<String, Value>>(),
        )
    }
}

impl Serialize for Map {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.read().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Map {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        IndexMap::<String, Value>::deserialize(deserializer).map(Map::from)
    }
}

// ============================================================================
// Record
// ============================================================================

/// Record with named fields in schema order
///
/// Field names are unique. The schema is fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    fields: Vec<String>,
    values: Vec<Value>,
}

impl Record {
    /// Build a record from parallel field-name and value vectors
    ///
    /// Returns `None` if the lengths differ or a field name repeats.
    pub fn new(fields: Vec<String>, values: Vec<Value>) -> Option<Self> {
        if fields.len() != values.len() {
            return None;
        }
        for (i, name) in fields.iter().enumerate() {
            if fields[..i].contains(name) {
                return None;
            }
        }
        Some(Self { fields, values })
    }

    /// Start building a record field by field
    pub fn builder() -> RecordBuilder {
        RecordBuilder::default()
    }

    /// Field names in schema order
    pub fn field_names(&self) -> &[String] {
        &self.fields
    }

    /// Field values in schema order
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Value of the named field
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields
            .iter()
            .position(|f| f == field)
            .map(|i| &self.values[i])
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Incremental [`Record`] construction; a repeated field name replaces the
/// earlier value in place.
#[derive(Debug, Default)]
pub struct RecordBuilder {
    fields: Vec<String>,
    values: Vec<Value>,
}

impl RecordBuilder {
    /// Append a field
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.fields.iter().position(|f| *f == name) {
            Some(i) => self.values[i] = value,
            None => {
                self.fields.push(name);
                self.values.push(value);
            }
        }
        self
    }

    /// Finish the record
    pub fn build(self) -> Record {
        Record {
            fields: self.fields,
            values: self.values,
        }
    }
}

// ============================================================================
// From implementations for ergonomic API usage
// ============================================================================

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Float(f as f64)
    }
}

impl From<Vec<Value>> for Value {
    fn from(a: Vec<Value>) -> Self {
        Value::List(List::from(a))
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(o: IndexMap<String, Value>) -> Self {
        Value::Map(Map::from(o))
    }
}

impl From<List> for Value {
    fn from(l: List) -> Self {
        Value::List(l)
    }
}

impl From<Map> for Value {
    fn from(m: Map) -> Self {
        Value::Map(m)
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Value::Record(r)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

// ============================================================================
// serde_json interop for ergonomic tuple construction
// ============================================================================

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    // u64 beyond i64::MAX and real numbers
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => {
                Value::List(arr.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(obj) => {
                Value::Map(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::Number((*i).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(l) => l.with_elements(|items| {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }),
            Value::Map(m) => m.with_entries(|entries| {
                serde_json::Value::Object(
                    entries
                        .iter()
                        .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                        .collect(),
                )
            }),
            Value::Record(r) => serde_json::Value::Object(
                r.field_names()
                    .iter()
                    .zip(r.values())
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        serde_json::Value::from(&v)
    }
}
