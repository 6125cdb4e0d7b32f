//! User-facing message strings.
//!
//! Every fixed string the engine can say lives here, so transports and
//! tests reference one definition. The expiry notice in particular is a
//! contract: the interpreter must emit it verbatim on a 419, never the
//! step's own error message.

/// Reply to `/start`.
pub const GREETING: &str = "Hello there! I'm your assistant today. How can I help you?";

/// Reply to `/help`.
pub const HELP: &str = "I'm here to help! Just ask me a question or send me a voice message.";

/// No intent cleared the match threshold.
pub const NOT_UNDERSTOOD: &str = "I don't understand what you said.";

/// The identity has no live session.
pub const LOGIN_REQUIRED: &str = "Please type /login to login before using the bot.";

/// Emitted when an API call comes back with HTTP 419.
pub const SESSION_EXPIRED: &str =
    "Your session has expired (CSRF token mismatch). Please type /login to login again.";

/// First step of the login dialogue.
pub const LOGIN_USERNAME_PROMPT: &str = "Please enter your username:";

/// Second step of the login dialogue.
pub const LOGIN_PASSWORD_PROMPT: &str = "Please enter your password:";

/// Credentials accepted.
pub const LOGIN_SUCCESS: &str =
    "Login successful! You can now chat with me and use all available commands.";

/// Credentials rejected.
pub const LOGIN_FAILED: &str = "Login failed. Please try again.";

/// The credential endpoint was unreachable.
pub const LOGIN_UNAVAILABLE: &str = "Sorry, I couldn't log you in. Please try again later.";

/// `/cancel` during the login dialogue.
pub const LOGIN_CANCELLED: &str = "Login cancelled. You can try again later using /login";

/// `/cancel` with nothing pending.
pub const NOTHING_TO_CANCEL: &str = "Nothing to cancel.";

/// `/login` while already holding a session.
pub const ALREADY_LOGGED_IN: &str = "You are already logged in! You can start using the bot.";

/// `/logout` with a live session.
pub const LOGGED_OUT: &str = "You have been logged out successfully.";

/// `/logout` without one.
pub const NOT_LOGGED_IN: &str = "You are not logged in.";

/// `/reset` with an active conversation.
pub const RESET_DONE: &str = "Conversation reset. You can start a new command.";

/// `/reset` without one.
pub const RESET_NOTHING: &str = "No active conversation to reset.";

/// The retry bound on one step was exhausted.
pub const CONVERSATION_ABORTED: &str =
    "Too many invalid responses — I've reset the conversation. You can start over.";

/// A final step completed without its own display text.
pub const CONVERSATION_DONE: &str = "Done! Is there anything else I can help with?";

/// Internal failure; details go to the log, not the chat.
pub const GENERIC_FAILURE: &str = "Something went wrong while processing that. Please try again.";

/// Voice message received but no transcriber is configured.
pub const VOICE_UNAVAILABLE: &str = "Sorry, I can't process voice messages right now.";

/// Transcription failed.
pub const VOICE_FAILED: &str =
    "Sorry, I couldn't process your voice message. Please try again or send a text message.";

/// Re-prompt listing the valid options for the current step.
pub fn invalid_choice(options: &[String]) -> String {
    format!("Please choose one of: {}", options.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_choice_lists_options() {
        let options = vec!["yes".to_string(), "no".to_string()];
        assert_eq!(invalid_choice(&options), "Please choose one of: yes, no");
    }

    #[test]
    fn expiry_notice_mentions_login() {
        // The transports rely on this exact phrasing to route users back
        // into the login flow.
        assert!(SESSION_EXPIRED.contains("/login"));
        assert!(SESSION_EXPIRED.contains("CSRF"));
    }
}
