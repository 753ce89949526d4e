//! `bind_expr`, `bind_template` and `bind_fields`: parse once, subscribe to
//! every referenced field, re-evaluate on change.

use std::rc::Rc;

use crate::binding::binding::{BindId, Binding, SubscriptionId, WeakBinding};
use crate::expression::{Expr, FieldSet, parse_expression, parse_template};
use crate::foundation::error::SpecbindResult;
use crate::foundation::value::Value;

/// Result of [`Binding::bind_expr`] and [`Binding::bind_template`].
#[derive(Debug)]
pub struct BoundExpr {
    /// `None` when the expression references no fields and never updates.
    pub id: Option<BindId>,
    /// Value computed at bind time, also passed to the first callback.
    pub value: Value,
    /// Fields the expression depends on.
    pub fields: FieldSet,
}

impl Binding {
    /// Subscribe one handler to every name in `fields`, each resolved with
    /// [`Binding::resolve`]. The handler receives `(field, new_value)`.
    ///
    /// Returns `None` for an empty set. Otherwise the returned id releases all
    /// of the connections at once. If any field fails to resolve, the
    /// connections made so far are removed before the error is returned.
    pub fn bind_fields(
        &self,
        fields: &FieldSet,
        on_change: impl Fn(&str, &Value) + 'static,
    ) -> SpecbindResult<Option<BindId>> {
        if fields.is_empty() {
            return Ok(None);
        }
        let on_change: Rc<dyn Fn(&str, &Value)> = Rc::new(on_change);
        let mut subs: Vec<(WeakBinding, SubscriptionId)> = Vec::with_capacity(fields.len());

        for field in fields {
            let (owner, key) = match self.resolve(field) {
                Ok(resolved) => resolved,
                Err(err) => {
                    disconnect_all(&subs);
                    return Err(err);
                }
            };
            let handler = Rc::clone(&on_change);
            let name = field.clone();
            let sub = owner.connect(&key, move |value| handler(&name, value));
            subs.push((owner.downgrade(), sub));
        }

        Ok(Some(
            self.register_unbinder(Box::new(move || disconnect_all(&subs))),
        ))
    }

    /// Parse `syntax` as an expression, evaluate it against this binding's
    /// object, and re-evaluate whenever one of its fields changes.
    ///
    /// `this` supplies `@` properties. `on_change` fires once immediately with
    /// the initial value.
    pub fn bind_expr(
        &self,
        syntax: &str,
        on_change: impl Fn(&Value) + 'static,
        this: &Value,
    ) -> SpecbindResult<BoundExpr> {
        self.bind_parsed(parse_expression(syntax)?, on_change, this)
    }

    /// Like [`Binding::bind_expr`] for template text (`"Hello $name"`,
    /// `"{{ a ? b : c }}"`).
    pub fn bind_template(
        &self,
        tpl: &str,
        on_change: impl Fn(&Value) + 'static,
        this: &Value,
    ) -> SpecbindResult<BoundExpr> {
        self.bind_parsed(parse_template(tpl)?, on_change, this)
    }

    fn bind_parsed(
        &self,
        expr: Expr,
        on_change: impl Fn(&Value) + 'static,
        this: &Value,
    ) -> SpecbindResult<BoundExpr> {
        let value = expr.exec(&Value::Object(self.object().clone()), this)?;
        let fields = expr.fields();

        let on_change = Rc::new(on_change);

        let recompute = {
            let data = self.downgrade();
            let this = this.clone();
            let on_change = Rc::clone(&on_change);
            move |field: &str, _: &Value| {
                let Some(binding) = data.upgrade() else {
                    return;
                };
                match expr.exec(&Value::Object(binding.object().clone()), &this) {
                    Ok(value) => on_change(&value),
                    Err(err) => tracing::warn!(field, %err, expr = %expr, "re-evaluation failed"),
                }
            }
        };
        let id = self.bind_fields(&fields, recompute)?;
        on_change(&value);

        Ok(BoundExpr { id, value, fields })
    }
}

fn disconnect_all(subs: &[(WeakBinding, SubscriptionId)]) {
    for (owner, sub) in subs {
        if let Some(owner) = owner.upgrade() {
            owner.disconnect(sub);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/binding/helpers.rs"]
mod tests;
