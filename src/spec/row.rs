use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::binding::binding::{BindId, Binding, WeakBinding};
use crate::expression::is_template;
use crate::foundation::error::{SpecbindError, SpecbindResult};
use crate::foundation::value::Value;

/// The live subscriptions of one spec row.
///
/// Every string member of the row that is a template is bound with
/// [`Binding::bind_template`], with the row itself supplying `@` properties.
/// Other members are left to the consumer. Dropping the row releases its
/// subscriptions.
pub struct BoundRow {
    binding: WeakBinding,
    ids: Vec<BindId>,
    values: BTreeMap<String, Value>,
}

impl BoundRow {
    /// Bind the template members of `row` against `binding`.
    ///
    /// `on_change(member, value)` fires once per template member while binding
    /// and again whenever a member's value is recomputed. A member that fails to
    /// parse or evaluate aborts the whole row and releases what was bound.
    pub fn bind(
        binding: &Binding,
        row: &serde_json::Value,
        on_change: impl Fn(&str, &Value) + 'static,
    ) -> SpecbindResult<Self> {
        let serde_json::Value::Object(members) = row else {
            return Err(SpecbindError::binding(format!(
                "spec row must be a JSON object, got {row}"
            )));
        };
        let this = Value::from_json(row);
        let on_change: Rc<dyn Fn(&str, &Value)> = Rc::new(on_change);

        let mut bound = Self {
            binding: binding.downgrade(),
            ids: Vec::new(),
            values: BTreeMap::new(),
        };
        for (member, value) in members {
            let Some(tpl) = value.as_str().filter(|s| is_template(s)) else {
                continue;
            };
            let callback = Rc::clone(&on_change);
            let name = member.clone();
            let expr = binding
                .bind_template(tpl, move |v| callback(&name, v), &this)
                .inspect_err(|err| tracing::warn!(member = %member, %err, "cannot bind spec row member"))?;
            bound.ids.extend(expr.id);
            bound.values.insert(member.clone(), expr.value);
        }
        tracing::debug!(members = bound.values.len(), live = bound.ids.len(), "bound spec row");
        Ok(bound)
    }

    /// Value of each template member as computed at bind time.
    pub fn initial_values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    /// Number of members that will update.
    pub fn live_members(&self) -> usize {
        self.ids.len()
    }

    /// Release every subscription. Idempotent.
    pub fn unbind(&mut self) {
        let ids = std::mem::take(&mut self.ids);
        if let Some(binding) = self.binding.upgrade() {
            for id in ids {
                binding.unbind(id);
            }
        }
    }
}

impl Drop for BoundRow {
    fn drop(&mut self) {
        self.unbind();
    }
}

impl fmt::Debug for BoundRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundRow")
            .field("members", &self.values.keys().collect::<Vec<_>>())
            .field("live", &self.ids.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/spec/row.rs"]
mod tests;
