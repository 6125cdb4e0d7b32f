//! The engine's answer to one inbound turn.

/// Text to send back, plus the option labels for the current step when it
/// restricts input. Rendering the options (keyboard, buttons, numbered
/// list) is the transport's concern.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// The message text.
    pub text: String,
    /// Selectable option labels, present when the awaited step has an
    /// `expect` set.
    pub options: Option<Vec<String>>,
}

impl Reply {
    /// A plain text reply with no options.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            options: None,
        }
    }

    /// A reply offering selectable options.
    pub fn with_options(text: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            text: text.into(),
            options: Some(options),
        }
    }
}
