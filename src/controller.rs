use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use anyhow::Context as _;

use crate::binding::binding::{Proxy, get_proxy};
use crate::foundation::error::{SpecbindError, SpecbindResult};
use crate::foundation::value::{Function, Value};

/// A modal the consumer can open by name.
pub trait Dialog {
    /// Show the dialog.
    fn run(&self) -> anyhow::Result<()>;
}

type ViewSwitch = Box<dyn Fn(&str) -> anyhow::Result<()>>;

/// Facade handed to the widget builder: the root data proxy plus the named
/// callbacks, dialogs and view switch that spec rows refer to.
///
/// Callback failures are logged and suppressed so that one failing handler
/// cannot stop the notification dispatch that invoked it.
pub struct Controller {
    data: Proxy,
    callbacks: HashMap<String, Function>,
    dialogs: HashMap<String, Rc<dyn Dialog>>,
    view_switch: Option<ViewSwitch>,
}

impl Controller {
    /// Build a controller around `data`, which must be a map or list object.
    pub fn new(data: &Value) -> SpecbindResult<Self> {
        Ok(Self {
            data: get_proxy(data, None)?,
            callbacks: HashMap::new(),
            dialogs: HashMap::new(),
            view_switch: None,
        })
    }

    /// Register a named callback.
    pub fn with_callback(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&[Value]) -> anyhow::Result<Value> + 'static,
    ) -> Self {
        self.callbacks.insert(name.into(), Function::new(f));
        self
    }

    /// Register a named dialog.
    pub fn with_dialog(mut self, name: impl Into<String>, dialog: impl Dialog + 'static) -> Self {
        self.dialogs.insert(name.into(), Rc::new(dialog));
        self
    }

    /// Install the function [`Controller::show_view`] delegates to.
    pub fn with_view_switch(mut self, f: impl Fn(&str) -> anyhow::Result<()> + 'static) -> Self {
        self.view_switch = Some(Box::new(f));
        self
    }

    /// The root data proxy.
    pub fn data(&self) -> &Proxy {
        &self.data
    }

    /// Invoke the callback registered as `name`.
    ///
    /// An unknown name is an error. A failing callback is logged and yields
    /// `Null`.
    #[tracing::instrument(skip(self, args), fields(args = args.len()))]
    pub fn call_back(&self, name: &str, args: &[Value]) -> SpecbindResult<Value> {
        let callback = self
            .callbacks
            .get(name)
            .ok_or_else(|| SpecbindError::UnknownCallback(name.to_owned()))?;
        match callback.call(args) {
            Ok(value) => Ok(value),
            Err(err) => {
                tracing::error!(callback = name, error = ?err, "callback failed");
                Ok(Value::Null)
            }
        }
    }

    /// Run the dialog registered as `name`.
    #[tracing::instrument(skip(self))]
    pub fn open_dialog(&self, name: &str) -> SpecbindResult<()> {
        let dialog = self
            .dialogs
            .get(name)
            .ok_or_else(|| SpecbindError::UnknownDialog(name.to_owned()))?;
        dialog
            .run()
            .with_context(|| format!("dialog \"{name}\" failed"))?;
        Ok(())
    }

    /// Switch to the view `name` through the installed view switch.
    #[tracing::instrument(skip(self))]
    pub fn show_view(&self, name: &str) -> SpecbindResult<()> {
        let switch = self.view_switch.as_ref().ok_or(SpecbindError::NoViewSwitch)?;
        switch(name).with_context(|| format!("switching to view \"{name}\""))?;
        Ok(())
    }

    /// Proxy for the object at dotted `path` under the root (`""` is the root).
    ///
    /// Every object along the path gets a binding whose parent is the object
    /// before it, so `$$name` references anywhere under the path reach their
    /// ancestors.
    #[tracing::instrument(skip(self))]
    pub fn bind(&self, path: &str) -> SpecbindResult<Proxy> {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .try_fold(self.data.clone(), |proxy, segment| proxy.child(segment))
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut callbacks: Vec<_> = self.callbacks.keys().collect();
        callbacks.sort();
        let mut dialogs: Vec<_> = self.dialogs.keys().collect();
        dialogs.sort();
        f.debug_struct("Controller")
            .field("data", &self.data)
            .field("callbacks", &callbacks)
            .field("dialogs", &dialogs)
            .field("view_switch", &self.view_switch.is_some())
            .finish()
    }
}

#[cfg(test)]
#[path = "../tests/unit/controller.rs"]
mod tests;
