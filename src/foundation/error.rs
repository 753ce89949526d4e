/// Convenience result type used across specbind.
pub type SpecbindResult<T> = Result<T, SpecbindError>;

/// Top-level error taxonomy.
///
/// Structural errors (syntax, binding misuse, cyclic models) always surface to the
/// caller. Consumer callback failures are logged by the [`Controller`](crate::Controller)
/// and never reach the notification loop.
#[derive(thiserror::Error, Debug)]
pub enum SpecbindError {
    /// Invalid expression or template source.
    #[error("syntax error at byte {offset}: {message}")]
    Syntax {
        /// Byte offset into the source that was being tokenized or parsed.
        offset: usize,
        /// Human readable description, usually carrying the offending snippet.
        message: String,
    },

    /// Misuse of the binding API: non-bindable sources, double binding,
    /// unresolvable scope references.
    #[error("binding error: {0}")]
    Binding(String),

    /// Parent chains or nested proxy creation deeper than the recursion guard.
    #[error("recursion guard: {0}")]
    Recursion(String),

    /// Errors while evaluating a parsed expression.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// `call_back` named a callback that was never registered.
    #[error("unknown callback \"{0}\"")]
    UnknownCallback(String),

    /// `open_dialog` named a dialog that was never registered.
    #[error("unknown dialog \"{0}\"")]
    UnknownDialog(String),

    /// `show_view` was called on a controller built without a view switch.
    #[error("no view switch installed")]
    NoViewSwitch,

    /// Errors when converting data to or from JSON.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from consumer code.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SpecbindError {
    /// Build a [`SpecbindError::Syntax`] value.
    pub fn syntax(offset: usize, msg: impl Into<String>) -> Self {
        Self::Syntax {
            offset,
            message: msg.into(),
        }
    }

    /// Build a [`SpecbindError::Binding`] value.
    pub fn binding(msg: impl Into<String>) -> Self {
        Self::Binding(msg.into())
    }

    /// Build a [`SpecbindError::Recursion`] value.
    pub fn recursion(msg: impl Into<String>) -> Self {
        Self::Recursion(msg.into())
    }

    /// Build a [`SpecbindError::Evaluation`] value.
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    /// Build a [`SpecbindError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Whether this error was raised while tokenizing or parsing.
    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax { .. })
    }
}

impl From<serde_json::Error> for SpecbindError {
    fn from(err: serde_json::Error) -> Self {
        Self::serde(err.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
