//! Observable data objects and the subscriptions built on them.

pub(crate) mod binding;
pub(crate) mod deep;
pub(crate) mod helpers;
pub(crate) mod object;
