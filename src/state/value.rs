//! Field values held by participants.
//!
//! Plain data is stored as a `serde_json::Value` and is always copied by
//! value. Nested mutable state that must be reachable by reference lives in a
//! [`SharedCell`]; this is what distinguishes a shallow capture from a deep
//! one. Opaque handles to external resources are stored as
//! [`ResourceHandle`] and can never be deep-copied.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde_json::Value;

/// A participant's complete field mapping.
pub type Fields = BTreeMap<String, FieldValue>;

/// A single field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Immutable plain data.
    Data(Value),
    /// An owned list, copied by value.
    List(Vec<FieldValue>),
    /// An owned nested mapping, copied by value.
    Map(Fields),
    /// Nested mutable state shared by reference.
    Shared(SharedCell),
    /// An opaque handle to an external resource.
    Resource(ResourceHandle),
}

impl FieldValue {
    /// JSON null.
    pub fn null() -> Self {
        FieldValue::Data(Value::Null)
    }

    /// Wrap a value in a new shared cell.
    pub fn shared(value: impl Into<FieldValue>) -> Self {
        FieldValue::Shared(SharedCell::new(value))
    }

    pub fn as_data(&self) -> Option<&Value> {
        match self {
            FieldValue::Data(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_data().and_then(Value::as_i64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_data().and_then(Value::as_f64)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_data().and_then(Value::as_str)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_data().and_then(Value::as_bool)
    }

    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Fields> {
        match self {
            FieldValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_shared(&self) -> Option<&SharedCell> {
        match self {
            FieldValue::Shared(cell) => Some(cell),
            _ => None,
        }
    }

    pub fn as_resource(&self) -> Option<&ResourceHandle> {
        match self {
            FieldValue::Resource(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Data(Value::Null))
    }

    /// Short name of the variant, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Data(Value::Null) => "null",
            FieldValue::Data(Value::Bool(_)) => "bool",
            FieldValue::Data(Value::Number(_)) => "number",
            FieldValue::Data(Value::String(_)) => "string",
            FieldValue::Data(Value::Array(_)) => "array",
            FieldValue::Data(Value::Object(_)) => "object",
            FieldValue::List(_) => "list",
            FieldValue::Map(_) => "map",
            FieldValue::Shared(_) => "shared",
            FieldValue::Resource(_) => "resource",
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::Data(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Data(Value::from(value))
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Data(Value::from(value))
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::Data(Value::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Data(Value::from(value))
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Data(Value::Bool(value))
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Data(Value::String(value.to_string()))
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Data(Value::String(value))
    }
}

impl From<Vec<FieldValue>> for FieldValue {
    fn from(items: Vec<FieldValue>) -> Self {
        FieldValue::List(items)
    }
}

impl From<Fields> for FieldValue {
    fn from(map: Fields) -> Self {
        FieldValue::Map(map)
    }
}

impl From<SharedCell> for FieldValue {
    fn from(cell: SharedCell) -> Self {
        FieldValue::Shared(cell)
    }
}

impl From<ResourceHandle> for FieldValue {
    fn from(handle: ResourceHandle) -> Self {
        FieldValue::Resource(handle)
    }
}

/// Nested mutable state shared by reference.
///
/// Cloning a `SharedCell` clones the handle, not the content: both handles
/// observe each other's writes. Equality compares content, so cells that
/// (directly or indirectly) contain themselves must not be compared or
/// debug-printed.
#[derive(Clone)]
pub struct SharedCell(Arc<RwLock<FieldValue>>);

impl SharedCell {
    pub fn new(value: impl Into<FieldValue>) -> Self {
        Self(Arc::new(RwLock::new(value.into())))
    }

    /// Clone of the current content.
    pub fn get(&self) -> FieldValue {
        self.0.read().clone()
    }

    /// Replace the content in place.
    pub fn set(&self, value: impl Into<FieldValue>) {
        *self.0.write() = value.into();
    }

    /// Mutate the content in place.
    pub fn update<R>(&self, f: impl FnOnce(&mut FieldValue) -> R) -> R {
        f(&mut self.0.write())
    }

    pub fn read(&self) -> RwLockReadGuard<'_, FieldValue> {
        self.0.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, FieldValue> {
        self.0.write()
    }

    /// Check if both handles point at the same cell.
    pub fn ptr_eq(&self, other: &SharedCell) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl PartialEq for SharedCell {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        *self.0.read() == *other.0.read()
    }
}

impl fmt::Debug for SharedCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedCell").field(&*self.0.read()).finish()
    }
}

/// An opaque handle to an external resource (socket, file, lock, ...).
///
/// Handles compare by identity and can only be shared, never deep-copied.
#[derive(Clone)]
pub struct ResourceHandle {
    kind: Arc<str>,
    inner: Arc<dyn Any + Send + Sync>,
}

impl ResourceHandle {
    pub fn new<T: Any + Send + Sync>(kind: &str, resource: T) -> Self {
        Self {
            kind: Arc::from(kind),
            inner: Arc::new(resource),
        }
    }

    /// Kind name given at construction.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    pub fn ptr_eq(&self, other: &ResourceHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for ResourceHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// A value that has no deep copy, found at `path`.
#[derive(Debug)]
pub(crate) struct Uncopyable {
    pub path: String,
    pub kind: String,
}

/// Recursive copier for deep captures.
///
/// Cells reached more than once (aliases and cycles) map to a single new
/// cell, so the copy has the same sharing structure as the source.
pub(crate) struct DeepCopy {
    memo: HashMap<usize, SharedCell>,
    share_resources: bool,
}

impl DeepCopy {
    /// Copier that fails on resource handles.
    pub(crate) fn strict() -> Self {
        Self {
            memo: HashMap::new(),
            share_resources: false,
        }
    }

    /// Copier that shares resource handles instead of failing.
    pub(crate) fn lenient() -> Self {
        Self {
            memo: HashMap::new(),
            share_resources: true,
        }
    }

    pub(crate) fn copy_fields(&mut self, fields: &Fields) -> Result<Fields, Uncopyable> {
        let mut out = Fields::new();
        for (name, value) in fields {
            out.insert(name.clone(), self.copy_value(value, name)?);
        }
        Ok(out)
    }

    fn copy_value(&mut self, value: &FieldValue, path: &str) -> Result<FieldValue, Uncopyable> {
        match value {
            FieldValue::Data(v) => Ok(FieldValue::Data(v.clone())),
            FieldValue::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    out.push(self.copy_value(item, &format!("{}[{}]", path, i))?);
                }
                Ok(FieldValue::List(out))
            }
            FieldValue::Map(map) => {
                let mut out = Fields::new();
                for (key, item) in map {
                    out.insert(key.clone(), self.copy_value(item, &format!("{}.{}", path, key))?);
                }
                Ok(FieldValue::Map(out))
            }
            FieldValue::Shared(cell) => {
                if let Some(copy) = self.memo.get(&cell.addr()) {
                    return Ok(FieldValue::Shared(copy.clone()));
                }
                // Register before recursing so a cycle resolves to this copy.
                let copy = SharedCell::new(FieldValue::null());
                self.memo.insert(cell.addr(), copy.clone());
                let content = cell.get();
                copy.set(self.copy_value(&content, path)?);
                Ok(FieldValue::Shared(copy))
            }
            FieldValue::Resource(handle) => {
                if self.share_resources {
                    Ok(FieldValue::Resource(handle.clone()))
                } else {
                    Err(Uncopyable {
                        path: path.to_string(),
                        kind: handle.kind().to_string(),
                    })
                }
            }
        }
    }
}
