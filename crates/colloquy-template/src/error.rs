//! Template error types.
//!
//! A template failure is a configuration defect, not a user mistake: the
//! engine logs it for operators and degrades the affected step to its
//! generic failure message. Missing placeholders are always errors —
//! silently rendering an empty string would mask a missing collected field.

use thiserror::Error;

/// Convenience alias used throughout the template crate.
pub type Result<T> = std::result::Result<T, TemplateError>;

/// Errors raised while rendering a template.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// A `{name}` placeholder has no value in the rendering context.
    #[error("unresolved placeholder `{{{name}}}`")]
    MissingValue { name: String },

    /// The template text itself is malformed (unbalanced braces, empty or
    /// invalid placeholder name).
    #[error("malformed template near offset {offset}: {reason}")]
    Malformed { offset: usize, reason: String },
}
