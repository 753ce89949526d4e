use std::cell::{OnceCell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use serde::Serialize;

use crate::binding::binding::{Binding, BindingState, Proxy};
use crate::foundation::error::{SpecbindError, SpecbindResult};
use crate::foundation::value::Value;

/// Key exposing the element count of list objects.
pub const LENGTH_KEY: &str = "length";

/// A plain data object: a string-keyed map or an index-keyed list.
///
/// `Object` is a shared handle; clones refer to the same storage. Writes made
/// directly on an `Object` are silent. Writes made through its [`Proxy`] notify
/// subscribers.
///
/// The object's [`Binding`] lives in a private slot that is filled at most once,
/// so every object has at most one binding and one proxy identity.
#[derive(Clone)]
pub struct Object(pub(crate) Rc<ObjectCell>);

pub(crate) struct ObjectCell {
    store: RefCell<Store>,
    binding: OnceCell<Rc<BindingState>>,
}

#[derive(Debug)]
enum Store {
    Map(BTreeMap<String, Value>),
    List(Vec<Value>),
}

/// Non-owning handle to an [`Object`].
#[derive(Clone, Debug)]
pub struct WeakObject(Weak<ObjectCell>);

/// What a raw write changed, used to decide which notifications follow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Written {
    /// The key held or now holds a value; list length unchanged.
    Key,
    /// A list grew or shrank to this length.
    Resized(usize),
}

impl Object {
    fn with_store(store: Store) -> Self {
        Self(Rc::new(ObjectCell {
            store: RefCell::new(store),
            binding: OnceCell::new(),
        }))
    }

    /// An empty map object.
    pub fn new_map() -> Self {
        Self::with_store(Store::Map(BTreeMap::new()))
    }

    /// An empty list object.
    pub fn new_list() -> Self {
        Self::with_store(Store::List(Vec::new()))
    }

    /// A map object holding `entries`.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self::with_store(Store::Map(entries.into_iter().collect()))
    }

    /// A list object holding `values`.
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        Self::with_store(Store::List(values.into_iter().collect()))
    }

    /// Build a plain object from any serializable value whose JSON form is a map
    /// or a list.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> SpecbindResult<Self> {
        let json = serde_json::to_value(value)?;
        match Value::from_json(&json) {
            Value::Object(o) => Ok(o),
            other => Err(SpecbindError::binding(format!(
                "cannot bind a {} value, expected a map or list",
                other.type_name()
            ))),
        }
    }

    /// Whether this object is a list.
    pub fn is_list(&self) -> bool {
        matches!(*self.0.store.borrow(), Store::List(_))
    }

    /// Number of entries (map) or elements (list).
    pub fn len(&self) -> usize {
        match &*self.0.store.borrow() {
            Store::Map(m) => m.len(),
            Store::List(v) => v.len(),
        }
    }

    /// Whether the object has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read `key` without going through the binding. Missing keys read as `Null`.
    /// Lists accept decimal indices and [`LENGTH_KEY`].
    pub fn get(&self, key: &str) -> Value {
        match &*self.0.store.borrow() {
            Store::Map(m) => m.get(key).cloned().unwrap_or_default(),
            Store::List(v) => {
                if key == LENGTH_KEY {
                    #[allow(clippy::cast_precision_loss)]
                    let len = v.len() as f64;
                    Value::Number(len)
                } else {
                    parse_index(key)
                        .and_then(|i| v.get(i).cloned())
                        .unwrap_or_default()
                }
            }
        }
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        match &*self.0.store.borrow() {
            Store::Map(m) => m.contains_key(key),
            Store::List(v) => key == LENGTH_KEY || parse_index(key).is_some_and(|i| i < v.len()),
        }
    }

    /// Keys in iteration order: sorted for maps, ascending indices for lists.
    pub fn keys(&self) -> Vec<String> {
        match &*self.0.store.borrow() {
            Store::Map(m) => m.keys().cloned().collect(),
            Store::List(v) => (0..v.len()).map(|i| i.to_string()).collect(),
        }
    }

    /// Values in key order.
    pub fn values(&self) -> Vec<Value> {
        match &*self.0.store.borrow() {
            Store::Map(m) => m.values().cloned().collect(),
            Store::List(v) => v.clone(),
        }
    }

    /// `(key, value)` pairs in key order.
    pub fn entries(&self) -> Vec<(String, Value)> {
        match &*self.0.store.borrow() {
            Store::Map(m) => m.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            Store::List(v) => v
                .iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v.clone()))
                .collect(),
        }
    }

    /// Silent write. Lists accept any index (gaps fill with `Null`) and
    /// [`LENGTH_KEY`] (truncates or extends).
    pub fn insert(&self, key: &str, value: Value) -> SpecbindResult<()> {
        self.write(key, value).map(|_| ())
    }

    /// Silent delete. List elements are reset to `Null` rather than removed.
    pub fn remove(&self, key: &str) -> SpecbindResult<()> {
        self.erase(key)
    }

    /// Silent append to a list.
    pub fn push(&self, value: Value) -> SpecbindResult<usize> {
        match &mut *self.0.store.borrow_mut() {
            Store::List(v) => {
                v.push(value);
                Ok(v.len())
            }
            Store::Map(_) => Err(SpecbindError::binding("push on a map object")),
        }
    }

    pub(crate) fn write(&self, key: &str, value: Value) -> SpecbindResult<Written> {
        match &mut *self.0.store.borrow_mut() {
            Store::Map(m) => {
                m.insert(key.to_owned(), value);
                Ok(Written::Key)
            }
            Store::List(v) => {
                if key == LENGTH_KEY {
                    let len = value.to_number();
                    if !(len >= 0.0 && len.fract() == 0.0) {
                        return Err(SpecbindError::binding(format!(
                            "invalid list length {value}"
                        )));
                    }
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let len = len as usize;
                    v.resize(len, Value::Null);
                    return Ok(Written::Resized(len));
                }
                let index = parse_index(key).ok_or_else(|| {
                    SpecbindError::binding(format!("\"{key}\" is not a list index"))
                })?;
                if index < v.len() {
                    v[index] = value;
                    Ok(Written::Key)
                } else {
                    v.resize(index, Value::Null);
                    v.push(value);
                    Ok(Written::Resized(v.len()))
                }
            }
        }
    }

    pub(crate) fn erase(&self, key: &str) -> SpecbindResult<()> {
        match &mut *self.0.store.borrow_mut() {
            Store::Map(m) => {
                m.remove(key);
                Ok(())
            }
            Store::List(v) => {
                let index = parse_index(key).ok_or_else(|| {
                    SpecbindError::binding(format!("cannot delete \"{key}\" from a list"))
                })?;
                if let Some(slot) = v.get_mut(index) {
                    *slot = Value::Null;
                }
                Ok(())
            }
        }
    }

    pub(crate) fn pop_raw(&self) -> SpecbindResult<Option<Value>> {
        match &mut *self.0.store.borrow_mut() {
            Store::List(v) => Ok(v.pop()),
            Store::Map(_) => Err(SpecbindError::binding("pop on a map object")),
        }
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Non-owning handle.
    pub fn downgrade(&self) -> WeakObject {
        WeakObject(Rc::downgrade(&self.0))
    }

    /// Whether a binding has been created for this object.
    pub fn is_bound(&self) -> bool {
        self.0.binding.get().is_some()
    }

    /// The object's binding, if one exists.
    pub fn binding(&self) -> Option<Binding> {
        self.0
            .binding
            .get()
            .map(|state| Binding::from_parts(self.clone(), Rc::clone(state)))
    }

    /// Get-or-create the object's proxy.
    pub fn proxy(&self) -> Proxy {
        let state = self
            .0
            .binding
            .get_or_init(|| {
                tracing::debug!(object = self.addr(), "creating binding");
                Rc::new(BindingState::new(None))
            })
            .clone();
        Binding::from_parts(self.clone(), state).proxy()
    }

    /// Install a freshly built binding state. Fails if the slot is taken.
    pub(crate) fn install(&self, state: BindingState) -> SpecbindResult<Binding> {
        let state = Rc::new(state);
        self.0
            .binding
            .set(Rc::clone(&state))
            .map_err(|_| SpecbindError::binding("object already has a binding"))?;
        tracing::debug!(object = self.addr(), "installed binding");
        Ok(Binding::from_parts(self.clone(), state))
    }

    /// Snapshot as JSON.
    pub fn to_json(&self) -> SpecbindResult<serde_json::Value> {
        self.to_json_at(1)
    }

    pub(crate) fn to_json_at(&self, depth: usize) -> SpecbindResult<serde_json::Value> {
        let store = self.0.store.borrow();
        Ok(match &*store {
            Store::Map(m) => {
                let mut out = serde_json::Map::new();
                for (k, v) in m {
                    out.insert(k.clone(), v.to_json_at(depth)?);
                }
                serde_json::Value::Object(out)
            }
            Store::List(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(|v| v.to_json_at(depth))
                    .collect::<SpecbindResult<_>>()?,
            ),
        })
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_list() { "list" } else { "map" };
        f.debug_struct("Object")
            .field("kind", &kind)
            .field("len", &self.len())
            .field("bound", &self.is_bound())
            .finish()
    }
}

impl WeakObject {
    /// Upgrade to a strong handle if the object is still alive.
    pub fn upgrade(&self) -> Option<Object> {
        self.0.upgrade().map(Object)
    }
}

fn parse_index(key: &str) -> Option<usize> {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse().ok()
}

#[cfg(test)]
#[path = "../../tests/unit/binding/object.rs"]
mod tests;
