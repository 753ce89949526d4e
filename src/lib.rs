//! specbind is the reactive data-binding and expression core behind declarative UI specs.
//!
//! A spec describes views as rows of JSON whose string members may contain small
//! expressions and templates (`"$count items"`, `"{{ a ? \"$x\" : y }}"`). This crate
//! provides:
//!
//! - Plain data objects and their observable [`Binding`]/[`Proxy`] pair
//! - The expression language: [`tokenize`], [`parse_expression`], [`parse_template`], [`Expr`]
//! - Subscriptions that re-evaluate an expression whenever a field it reads changes
//!   ([`Binding::bind_expr`], [`Binding::bind_template`], [`Binding::bind_object`])
//! - A [`Controller`] facade and [`BoundRow`] for the widget builder that consumes them
//!
//! Everything is single-threaded and synchronous: a write through a proxy notifies every
//! subscriber before it returns.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod binding;
mod controller;
mod expression;
mod foundation;
mod spec;

pub use crate::binding::binding::{
    BindId, Binding, PropertyBinding, Proxy, Setter, SubscriptionId, WatcherId, WeakBinding, bind,
    get_binding, get_proxy,
};
pub use crate::binding::helpers::BoundExpr;
pub use crate::binding::object::{LENGTH_KEY, Object, WeakObject};
pub use crate::controller::{Controller, Dialog};
pub use crate::expression::{
    BinaryOp, Expr, FieldSet, PARENT_KEY, Token, TokenKind, UnaryOp, is_template, parse,
    parse_expression, parse_template, tokenize, tokenize_literal,
};
pub use crate::foundation::error::{SpecbindError, SpecbindResult};
pub use crate::foundation::value::{Function, MAX_DEPTH, NativeFn, Value, format_number};
pub use crate::spec::row::BoundRow;
