//! Binding of spec rows: the JSON descriptions the widget builder walks.

pub(crate) mod row;
