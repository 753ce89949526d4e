//! Observable bindings over plain data objects.
//!
//! A [`Binding`] owns the subscriber tables for exactly one [`Object`]. The
//! [`Proxy`] is the externally visible accessor: every write or delete made
//! through it updates the store first and then notifies, synchronously and in
//! connection order, the handlers connected to that key followed by the
//! whole-object watchers.
//!
//! # Invariants
//!
//! 1. An object has at most one binding; [`get_proxy`] on the same object always
//!    returns the same proxy identity.
//! 2. Handlers for one key fire in the order they were connected.
//! 3. No deduplication: writing an equal value still notifies.
//! 4. A handler removed while a dispatch is in progress does not fire for the
//!    rest of that dispatch.
//! 5. `unbind_all` returns the binding to the freshly constructed state (`len() == 0`).
//!
//! Handlers may write through proxies; the nested dispatch runs to completion
//! before the outer one continues.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use crate::binding::object::{LENGTH_KEY, Object, WeakObject, Written};
use crate::expression::PARENT_KEY;
use crate::foundation::error::{SpecbindError, SpecbindResult};
use crate::foundation::value::{MAX_DEPTH, Value};

pub(crate) type Handler = Rc<dyn Fn(&Value)>;
pub(crate) type WatchHandler = Rc<dyn Fn(&str, &Value, &Proxy)>;
pub(crate) type Unbinder = Box<dyn FnOnce()>;

pub(crate) struct BindingState {
    targets: RefCell<BTreeMap<String, Vec<(u64, Handler)>>>,
    watchers: RefCell<Vec<(u64, WatchHandler)>>,
    unbinders: RefCell<BTreeMap<u64, Unbinder>>,
    parent: RefCell<Option<WeakObject>>,
    keys: Option<BTreeSet<String>>,
    next_id: Cell<u64>,
}

impl BindingState {
    pub(crate) fn new(keys: Option<BTreeSet<String>>) -> Self {
        Self {
            targets: RefCell::new(BTreeMap::new()),
            watchers: RefCell::new(Vec::new()),
            unbinders: RefCell::new(BTreeMap::new()),
            parent: RefCell::new(None),
            keys,
            next_id: Cell::new(0),
        }
    }

    fn next_id(&self) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }

    fn notifies(&self, key: &str) -> bool {
        self.keys.as_ref().is_none_or(|keys| keys.contains(key))
    }
}

/// Subscriber tables and scope link for one data object.
#[derive(Clone)]
pub struct Binding {
    object: Object,
    state: Rc<BindingState>,
}

/// Accessor for a bound object. Writes and deletes notify subscribers.
#[derive(Clone)]
pub struct Proxy {
    binding: Binding,
}

/// Non-owning handle to a [`Binding`].
#[derive(Clone, Debug)]
pub struct WeakBinding(WeakObject);

/// Identifies one handler connected to one key. Displays as `"key:seq"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId {
    key: String,
    seq: u64,
}

/// Identifies one whole-object watcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WatcherId(u64);

/// Identifies one `bind_*` subscription registered on a binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindId(u64);

/// Result of [`Binding::bind_property`] and [`Binding::bind_object`].
#[derive(Debug)]
pub struct PropertyBinding {
    /// Pass to [`Binding::unbind`] to release the subscription.
    pub id: BindId,
    /// Writes through the same path a proxy write would take.
    pub setter: Setter,
}

/// Pushes values into one bound property.
#[derive(Clone, Debug)]
pub struct Setter {
    binding: WeakBinding,
    name: String,
}

impl SubscriptionId {
    /// The key the handler is connected to.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.key, self.seq)
    }
}

impl FromStr for SubscriptionId {
    type Err = SpecbindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, seq) = s
            .rsplit_once(':')
            .ok_or_else(|| SpecbindError::binding(format!("malformed subscription id \"{s}\"")))?;
        let seq = seq
            .parse()
            .map_err(|_| SpecbindError::binding(format!("malformed subscription id \"{s}\"")))?;
        Ok(Self {
            key: key.to_owned(),
            seq,
        })
    }
}

impl Setter {
    /// Write `value` to the bound property, notifying its subscribers.
    pub fn set(&self, value: impl Into<Value>) -> SpecbindResult<()> {
        let binding = self
            .binding
            .upgrade()
            .ok_or_else(|| SpecbindError::binding("setter outlived its binding"))?;
        binding.set_value(&self.name, value.into())
    }
}

/// Get-or-create the proxy for `value`.
///
/// Only map and list objects are bindable; `null`, scalars and functions are
/// rejected. When `parent` is given it becomes the scope parent used by
/// `$`-prefixed references.
pub fn get_proxy(value: &Value, parent: Option<&Proxy>) -> SpecbindResult<Proxy> {
    let object = bindable(value)?;
    let proxy = object.proxy();
    if let Some(parent) = parent {
        proxy.binding.set_parent(Some(parent))?;
    }
    Ok(proxy)
}

/// The binding of `value`, if it is an object that has one.
pub fn get_binding(value: &Value) -> Option<Binding> {
    value.as_object().and_then(Object::binding)
}

/// Bind `value` in place. With `keys`, only writes to those keys notify;
/// other keys are stored silently.
///
/// Fails if the object already has a binding.
pub fn bind(value: &Value, keys: Option<&[&str]>) -> SpecbindResult<Proxy> {
    let object = bindable(value)?;
    let keys = keys.map(|keys| keys.iter().map(|k| (*k).to_owned()).collect());
    Ok(object.install(BindingState::new(keys))?.proxy())
}

fn bindable(value: &Value) -> SpecbindResult<&Object> {
    value.as_object().ok_or_else(|| {
        SpecbindError::binding(format!("cannot bind a {} value", value.type_name()))
    })
}

impl Binding {
    /// Create the binding for `value`. Unlike [`get_proxy`] this fails when the
    /// object is already bound.
    pub fn new(value: &Value) -> SpecbindResult<Self> {
        bindable(value)?.install(BindingState::new(None))
    }

    pub(crate) fn from_parts(object: Object, state: Rc<BindingState>) -> Self {
        Self { object, state }
    }

    /// The proxy for this binding's object.
    pub fn proxy(&self) -> Proxy {
        Proxy {
            binding: self.clone(),
        }
    }

    /// The bound object.
    pub fn object(&self) -> &Object {
        &self.object
    }

    /// Non-owning handle.
    pub fn downgrade(&self) -> WeakBinding {
        WeakBinding(self.object.downgrade())
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    /// The enclosing scope, if one was wired and is still alive.
    pub fn parent(&self) -> Option<Self> {
        self.state
            .parent
            .borrow()
            .as_ref()
            .and_then(WeakObject::upgrade)
            .and_then(|o| o.binding())
    }

    /// Set or clear the enclosing scope.
    pub fn set_parent(&self, parent: Option<&Proxy>) -> SpecbindResult<()> {
        if let Some(parent) = parent
            && parent.object().ptr_eq(&self.object)
        {
            return Err(SpecbindError::recursion("an object cannot be its own parent scope"));
        }
        tracing::debug!(
            object = self.object.addr(),
            parent = parent.map(|p| p.object().addr()),
            "wiring parent scope"
        );
        *self.state.parent.borrow_mut() = parent.map(|p| p.object().downgrade());
        Ok(())
    }

    /// Register `on_change` for writes and deletes of `name` on this object.
    pub fn connect(&self, name: &str, on_change: impl Fn(&Value) + 'static) -> SubscriptionId {
        let seq = self.state.next_id();
        self.state
            .targets
            .borrow_mut()
            .entry(name.to_owned())
            .or_default()
            .push((seq, Rc::new(on_change)));
        SubscriptionId {
            key: name.to_owned(),
            seq,
        }
    }

    /// Remove one handler. Returns `false` if it was already gone.
    pub fn disconnect(&self, id: &SubscriptionId) -> bool {
        let mut targets = self.state.targets.borrow_mut();
        let Some(handlers) = targets.get_mut(&id.key) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|(seq, _)| *seq != id.seq);
        let removed = handlers.len() != before;
        if handlers.is_empty() {
            targets.remove(&id.key);
        }
        removed
    }

    /// Register a handler for every mutation of this object, called with
    /// `(key, value, proxy)`.
    pub fn watch(&self, on_change: impl Fn(&str, &Value, &Proxy) + 'static) -> WatcherId {
        let id = self.state.next_id();
        self.state
            .watchers
            .borrow_mut()
            .push((id, Rc::new(on_change)));
        WatcherId(id)
    }

    /// Remove a watcher. Returns `false` if it was already gone.
    pub fn unwatch(&self, id: WatcherId) -> bool {
        let mut watchers = self.state.watchers.borrow_mut();
        let before = watchers.len();
        watchers.retain(|(seq, _)| *seq != id.0);
        watchers.len() != before
    }

    /// Find the binding owning `name`. Each leading `$` moves one scope up:
    /// to the binding parent when one is wired, else to the object held in the
    /// [`PARENT_KEY`] member, the same walk [`Expr::exec`](crate::Expr::exec)
    /// takes.
    pub fn resolve(&self, name: &str) -> SpecbindResult<(Self, String)> {
        let mut binding = self.clone();
        let mut name = name;
        let mut depth = 0usize;
        while let Some(rest) = name.strip_prefix('$') {
            depth += 1;
            if depth > MAX_DEPTH {
                return Err(SpecbindError::recursion(format!(
                    "scope chain deeper than {MAX_DEPTH} resolving \"{name}\""
                )));
            }
            binding = binding.enclosing().ok_or_else(|| {
                SpecbindError::binding(format!("no parent scope to resolve \"${rest}\""))
            })?;
            name = rest;
        }
        Ok((binding, name.to_owned()))
    }

    fn enclosing(&self) -> Option<Self> {
        self.parent().or_else(|| match self.object.get(PARENT_KEY) {
            Value::Object(parent) => Some(parent.proxy().binding().clone()),
            _ => None,
        })
    }

    /// Read `name`, following `$` scope escapes.
    pub fn get_value(&self, name: &str) -> SpecbindResult<Value> {
        let (owner, key) = self.resolve(name)?;
        Ok(owner.object.get(&key))
    }

    /// Write `name` through the owning proxy, following `$` scope escapes.
    pub fn set_value(&self, name: &str, value: impl Into<Value>) -> SpecbindResult<()> {
        let (owner, key) = self.resolve(name)?;
        owner.proxy().set(&key, value)
    }

    /// Delete `name` through the owning proxy, following `$` scope escapes.
    pub fn delete_value(&self, name: &str) -> SpecbindResult<()> {
        let (owner, key) = self.resolve(name)?;
        owner.proxy().delete(&key)
    }

    /// Subscribe `on_change` to one property. The handler is not called until
    /// the property changes.
    pub fn bind_property(
        &self,
        name: &str,
        on_change: impl Fn(&Value) + 'static,
    ) -> SpecbindResult<PropertyBinding> {
        let (owner, key) = self.resolve(name)?;
        let sub = owner.connect(&key, on_change);
        let weak = owner.downgrade();
        let id = self.register_unbinder(Box::new(move || {
            if let Some(owner) = weak.upgrade() {
                owner.disconnect(&sub);
            }
        }));
        Ok(PropertyBinding {
            id,
            setter: self.setter(name),
        })
    }

    pub(crate) fn setter(&self, name: &str) -> Setter {
        Setter {
            binding: self.downgrade(),
            name: name.to_owned(),
        }
    }

    pub(crate) fn register_unbinder(&self, unbinder: Unbinder) -> BindId {
        let id = self.state.next_id();
        self.state.unbinders.borrow_mut().insert(id, unbinder);
        BindId(id)
    }

    /// Release one `bind_*` subscription. Returns `false` if it was already released.
    pub fn unbind(&self, id: BindId) -> bool {
        let unbinder = self.state.unbinders.borrow_mut().remove(&id.0);
        match unbinder {
            Some(unbinder) => {
                unbinder();
                true
            }
            None => false,
        }
    }

    /// Release every subscription on this binding, including raw connections
    /// and watchers. Idempotent.
    pub fn unbind_all(&self) {
        let unbinders = std::mem::take(&mut *self.state.unbinders.borrow_mut());
        for (_, unbinder) in unbinders {
            unbinder();
        }
        self.state.targets.borrow_mut().clear();
        self.state.watchers.borrow_mut().clear();
        tracing::debug!(object = self.object.addr(), "released all subscriptions");
    }

    /// Number of live handlers: per-key targets plus watchers.
    pub fn len(&self) -> usize {
        let targets: usize = self.state.targets.borrow().values().map(Vec::len).sum();
        targets + self.state.watchers.borrow().len()
    }

    /// Whether no handler is connected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `bind_*` subscriptions not yet released.
    pub fn bind_count(&self) -> usize {
        self.state.unbinders.borrow().len()
    }

    fn notify(&self, key: &str, value: &Value) {
        if !self.state.notifies(key) {
            return;
        }
        let handlers: Vec<(u64, Handler)> = self
            .state
            .targets
            .borrow()
            .get(key)
            .cloned()
            .unwrap_or_default();
        let watchers: Vec<(u64, WatchHandler)> = self.state.watchers.borrow().clone();
        tracing::trace!(
            object = self.object.addr(),
            key,
            targets = handlers.len(),
            watchers = watchers.len(),
            "dispatching change"
        );

        for (seq, handler) in handlers {
            if self.is_connected(key, seq) {
                handler(value);
            }
        }
        let proxy = self.proxy();
        for (id, watcher) in watchers {
            if self.is_watching(id) {
                watcher(key, value, &proxy);
            }
        }
    }

    fn is_connected(&self, key: &str, seq: u64) -> bool {
        self.state
            .targets
            .borrow()
            .get(key)
            .is_some_and(|handlers| handlers.iter().any(|(s, _)| *s == seq))
    }

    fn is_watching(&self, id: u64) -> bool {
        self.state.watchers.borrow().iter().any(|(s, _)| *s == id)
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("object", &self.object)
            .field("handlers", &self.len())
            .field("binds", &self.bind_count())
            .field("has_parent", &self.parent().is_some())
            .finish()
    }
}

impl WeakBinding {
    /// Upgrade if the object is alive and still bound.
    pub fn upgrade(&self) -> Option<Binding> {
        self.0.upgrade().and_then(|o| o.binding())
    }
}

impl Proxy {
    /// The binding behind this proxy.
    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    /// The underlying plain object.
    pub fn object(&self) -> &Object {
        &self.binding.object
    }

    /// The proxy as a [`Value`].
    pub fn to_value(&self) -> Value {
        Value::Object(self.object().clone())
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.object().ptr_eq(other.object())
    }

    /// Read `key`.
    pub fn get(&self, key: &str) -> Value {
        self.object().get(key)
    }

    /// Write `key` and notify its handlers and the watchers. Growing a list also
    /// notifies [`LENGTH_KEY`].
    pub fn set(&self, key: &str, value: impl Into<Value>) -> SpecbindResult<()> {
        let value = value.into();
        let written = self.object().write(key, value.clone())?;
        self.binding.notify(key, &value);
        if let Written::Resized(len) = written
            && key != LENGTH_KEY
        {
            self.notify_length(len);
        }
        Ok(())
    }

    /// Delete `key` and notify with `Null`.
    pub fn delete(&self, key: &str) -> SpecbindResult<()> {
        self.object().erase(key)?;
        self.binding.notify(key, &Value::Null);
        Ok(())
    }

    /// Append to a list, notifying the new index and then [`LENGTH_KEY`].
    pub fn push(&self, value: impl Into<Value>) -> SpecbindResult<usize> {
        let value = value.into();
        let len = self.object().push(value.clone())?;
        self.binding.notify(&(len - 1).to_string(), &value);
        self.notify_length(len);
        Ok(len)
    }

    /// Remove the last list element, notifying [`LENGTH_KEY`] when one was removed.
    pub fn pop(&self) -> SpecbindResult<Value> {
        let popped = self.object().pop_raw()?;
        match popped {
            Some(value) => {
                self.notify_length(self.object().len());
                Ok(value)
            }
            None => Ok(Value::Null),
        }
    }

    fn notify_length(&self, len: usize) {
        #[allow(clippy::cast_precision_loss)]
        let len = Value::Number(len as f64);
        self.binding.notify(LENGTH_KEY, &len);
    }

    /// Number of entries or elements.
    pub fn len(&self) -> usize {
        self.object().len()
    }

    /// Whether the object is empty.
    pub fn is_empty(&self) -> bool {
        self.object().is_empty()
    }

    /// Keys in iteration order.
    pub fn keys(&self) -> Vec<String> {
        self.object().keys()
    }

    /// Get-or-create the proxy of the object stored at `key`, with this proxy as
    /// its scope parent.
    pub fn child(&self, key: &str) -> SpecbindResult<Self> {
        get_proxy(&self.get(key), Some(self))
            .map_err(|err| SpecbindError::binding(format!("member \"{key}\": {err}")))
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Proxy").field(self.object()).finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/binding/binding.rs"]
mod tests;
