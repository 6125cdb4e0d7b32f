//! Catalog error types.
//!
//! Every malformed command definition is fatal at load time and surfaces
//! through [`CatalogError`]. Nothing here is recoverable at conversation
//! time — a catalog either validates completely or the process refuses to
//! start.

use thiserror::Error;

/// Convenience alias used throughout the catalog crate.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Errors raised while loading or validating a command catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Reading a catalog source file failed.
    #[error("failed to read catalog source `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A catalog source is not valid JSON or does not match the schema.
    #[error("failed to parse catalog source `{path}`: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// A catalog source must be a JSON object mapping command names to
    /// definitions.
    #[error("catalog source `{path}` must be a JSON object of command definitions")]
    NotAnObject { path: String },

    /// Two sources (or one source) define the same command name.
    /// Names are compared case-insensitively.
    #[error("duplicate command name `{name}`")]
    DuplicateCommand { name: String },

    /// A command of kind `simple` is missing its `response`.
    #[error("command `{name}` is kind simple but has no `response`")]
    MissingResponse { name: String },

    /// A command of kind `simple` must not carry steps.
    #[error("command `{name}` is kind simple but declares steps")]
    UnexpectedSteps { name: String },

    /// A conversation or api_request command has no steps.
    #[error("command `{name}` has no steps")]
    EmptySteps { name: String },

    /// An api_request command has no step with an `api` block.
    #[error("command `{name}` is kind api_request but no step has an `api` block")]
    NoApiStep { name: String },

    /// Two steps within one command share an id.
    #[error("command `{name}`: duplicate step id `{step}`")]
    DuplicateStep { name: String, step: String },

    /// A `goto` entry names a step id that does not exist.
    #[error("command `{name}`, step `{step}`: goto target `{target}` does not exist")]
    UnknownGotoTarget {
        name: String,
        step: String,
        target: String,
    },

    /// A step can never be reached from the first step.
    #[error("command `{name}`: step `{step}` is unreachable from the first step")]
    UnreachableStep { name: String, step: String },

    /// A step has no path to any terminal — the conversation could be
    /// forced into a cycle with no exit.
    #[error("command `{name}`: step `{step}` has no path to a final step")]
    NoTerminalPath { name: String, step: String },

    /// An api step declares an unsupported HTTP method.
    #[error("command `{name}`, step `{step}`: unsupported HTTP method `{method}`")]
    InvalidMethod {
        name: String,
        step: String,
        method: String,
    },

    /// An api step is missing its `response_format`.
    #[error("command `{name}`, step `{step}`: api step has no `response_format`")]
    MissingResponseFormat { name: String, step: String },
}
