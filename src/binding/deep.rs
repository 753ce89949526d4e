//! `bind_object`: a property subscription that also follows mutations inside the
//! property's current value.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::binding::binding::{Binding, PropertyBinding, Proxy, WatcherId};
use crate::binding::object::LENGTH_KEY;
use crate::foundation::error::{SpecbindError, SpecbindResult};
use crate::foundation::value::{MAX_DEPTH, Value};

type Notify = Rc<dyn Fn()>;

/// One watched object and the watched objects nested under it.
struct WatchNode {
    proxy: Proxy,
    watcher: Option<WatcherId>,
    children: BTreeMap<String, Rc<RefCell<WatchNode>>>,
}

impl WatchNode {
    fn attach(proxy: Proxy, notify: &Notify, depth: usize) -> SpecbindResult<Rc<RefCell<Self>>> {
        if depth > MAX_DEPTH {
            return Err(SpecbindError::recursion(format!(
                "nested objects deeper than {MAX_DEPTH} (cyclic model?)"
            )));
        }
        let node = Rc::new(RefCell::new(Self {
            proxy: proxy.clone(),
            watcher: None,
            children: BTreeMap::new(),
        }));

        for (key, value) in proxy.object().entries() {
            if let Value::Object(child) = value {
                let child = Self::attach(child.proxy(), notify, depth + 1)?;
                node.borrow_mut().children.insert(key, child);
            }
        }

        let weak = Rc::downgrade(&node);
        let notify_inner = Rc::clone(notify);
        let watcher = proxy.binding().watch(move |key, value, _| {
            if let Some(node) = weak.upgrade() {
                Self::retarget_child(&node, key, value, &notify_inner, depth);
            }
            notify_inner();
        });
        node.borrow_mut().watcher = Some(watcher);
        Ok(node)
    }

    fn retarget_child(
        node: &Rc<RefCell<Self>>,
        key: &str,
        value: &Value,
        notify: &Notify,
        depth: usize,
    ) {
        if key == LENGTH_KEY && node.borrow().proxy.object().is_list() {
            Self::prune_past_end(node);
            return;
        }
        let current = node.borrow().children.get(key).cloned();
        if let (Some(current), Value::Object(next)) = (&current, value)
            && current.borrow().proxy.object().ptr_eq(next)
        {
            return;
        }
        if let Some(current) = current {
            current.borrow_mut().detach();
            node.borrow_mut().children.remove(key);
        }
        if let Value::Object(next) = value {
            match Self::attach(next.proxy(), notify, depth + 1) {
                Ok(child) => {
                    node.borrow_mut().children.insert(key.to_owned(), child);
                }
                Err(err) => tracing::warn!(key, %err, "not watching nested object"),
            }
        }
    }

    /// Drop the watches on elements a shrinking list no longer holds.
    fn prune_past_end(node: &Rc<RefCell<Self>>) {
        let len = node.borrow().proxy.len();
        let stale: Vec<String> = node
            .borrow()
            .children
            .keys()
            .filter(|k| k.parse::<usize>().is_ok_and(|i| i >= len))
            .cloned()
            .collect();
        for key in stale {
            let child = node.borrow_mut().children.remove(&key);
            if let Some(child) = child {
                child.borrow_mut().detach();
            }
        }
    }

    fn detach(&mut self) {
        if let Some(id) = self.watcher.take() {
            self.proxy.binding().unwatch(id);
        }
        for child in std::mem::take(&mut self.children).into_values() {
            child.borrow_mut().detach();
        }
    }
}

/// The watch tree currently attached under one bound property.
#[derive(Default)]
struct Slot(Option<Rc<RefCell<WatchNode>>>);

impl Slot {
    fn retarget(&mut self, value: &Value, notify: &Notify) -> SpecbindResult<()> {
        if let (Some(node), Value::Object(next)) = (&self.0, value)
            && node.borrow().proxy.object().ptr_eq(next)
        {
            return Ok(());
        }
        self.release();
        if let Value::Object(next) = value {
            self.0 = Some(WatchNode::attach(next.proxy(), notify, 1)?);
        }
        Ok(())
    }

    fn release(&mut self) {
        if let Some(node) = self.0.take() {
            node.borrow_mut().detach();
        }
    }
}

impl Binding {
    /// Subscribe to a property and to everything nested inside its current
    /// value.
    ///
    /// `on_change` receives the property's current value when the property is
    /// replaced and when any object reachable from it is mutated (list pushes,
    /// nested member writes). Replacing the property with a different object
    /// moves the nested watch to the new object; re-assigning the same object
    /// keeps the existing watch. `on_change` is called once immediately with
    /// the current value.
    pub fn bind_object(
        &self,
        name: &str,
        on_change: impl Fn(&Value) + 'static,
    ) -> SpecbindResult<PropertyBinding> {
        let (owner, key) = self.resolve(name)?;
        let on_change: Rc<dyn Fn(&Value)> = Rc::new(on_change);

        let notify: Notify = {
            let owner = owner.downgrade();
            let key = key.clone();
            let on_change = Rc::clone(&on_change);
            Rc::new(move || {
                if let Some(owner) = owner.upgrade() {
                    on_change(&owner.object().get(&key));
                }
            })
        };

        let current = owner.object().get(&key);
        let slot = Rc::new(RefCell::new(Slot::default()));
        slot.borrow_mut().retarget(&current, &notify)?;

        let sub = {
            let slot = Rc::clone(&slot);
            let notify = Rc::clone(&notify);
            let on_change = Rc::clone(&on_change);
            let name = key.clone();
            owner.connect(&key, move |value| {
                if let Err(err) = slot.borrow_mut().retarget(value, &notify) {
                    tracing::warn!(key = %name, %err, "not watching replacement value");
                }
                on_change(value);
            })
        };

        let weak = owner.downgrade();
        let id = self.register_unbinder(Box::new(move || {
            if let Some(owner) = weak.upgrade() {
                owner.disconnect(&sub);
            }
            slot.borrow_mut().release();
        }));

        on_change(&current);
        Ok(PropertyBinding {
            id,
            setter: self.setter(name),
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/binding/deep.rs"]
mod tests;
