//! The conversation interpreter.
//!
//! One [`Interpreter`] serves every identity. Per turn it decides, in
//! order: built-in slash command? pending login dialogue? live session?
//! active conversation (continue it) or free text (match a new intent)?
//!
//! Conversations are pure data: the interpreter only ever follows the
//! step graph — `goto` overrides first, definition order otherwise — so a
//! confirmation/field-update loop is an ordinary cycle, not a special
//! case. All per-identity state lives in the store; the interpreter keeps
//! no conversation memory of its own beyond the transient login dialogue
//! (which must never be persisted, since it briefly holds a password).
//!
//! Turns for one identity are serialized through a per-identity async
//! mutex; distinct identities proceed concurrently and share nothing
//! mutable but the store.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use colloquy_auth::{AuthError, AuthManager};
use colloquy_catalog::{ApiSpec, CommandCatalog, CommandDefinition, CommandKind, StepDefinition};
use colloquy_gateway::{ApiTransport, GatewayError};
use colloquy_match::{IntentMatcher, MatchOutcome, MatcherBuilder};
use colloquy_store::{ConversationState, ConversationStore};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::messages;
use crate::reply::Reply;
use crate::voice::Transcriber;

/// Transient login dialogue position. Held in memory only.
#[derive(Clone)]
enum LoginDialogue {
    AwaitingUsername,
    AwaitingPassword { username: String },
}

/// The per-identity conversation state machine.
pub struct Interpreter {
    catalog: Arc<CommandCatalog>,
    matcher: IntentMatcher,
    conversations: ConversationStore,
    auth: Arc<AuthManager>,
    transport: Arc<dyn ApiTransport>,
    transcriber: Option<Arc<dyn Transcriber>>,
    config: EngineConfig,
    /// One mutex per identity: turns for the same identity serialize,
    /// turns for different identities run concurrently.
    turn_locks: DashMap<String, Arc<Mutex<()>>>,
    /// In-flight login dialogues, keyed by identity.
    pending_logins: DashMap<String, LoginDialogue>,
}

impl Interpreter {
    /// Build an interpreter over a validated catalog.
    pub fn new(
        catalog: Arc<CommandCatalog>,
        conversations: ConversationStore,
        auth: Arc<AuthManager>,
        transport: Arc<dyn ApiTransport>,
        config: EngineConfig,
    ) -> Self {
        let mut builder = MatcherBuilder::new();
        for command in catalog.commands() {
            builder.register(command.name.as_str(), &command.samples);
        }
        let matcher = builder.build(config.match_threshold);

        Self {
            catalog,
            matcher,
            conversations,
            auth,
            transport,
            transcriber: None,
            config,
            turn_locks: DashMap::new(),
            pending_logins: DashMap::new(),
        }
    }

    /// Attach a speech-to-text backend for voice turns.
    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    /// Process one text turn for an identity.
    ///
    /// Infallible at this boundary: internal failures are logged and
    /// collapsed into a generic failure reply so no identity's turn can
    /// take the worker down.
    pub async fn handle_turn(&self, identity: &str, text: &str) -> Reply {
        let lock = self.turn_lock(identity);
        let _guard = lock.lock().await;

        match self.process_turn(identity, text).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(identity, error = %e, "turn processing failed");
                Reply::text(messages::GENERIC_FAILURE)
            }
        }
    }

    /// Process one voice turn: transcribe, then run the normal text path.
    /// The reply is prefixed with the transcript so the user sees what
    /// was understood.
    pub async fn handle_voice_turn(&self, identity: &str, audio: &[u8]) -> Reply {
        let Some(transcriber) = &self.transcriber else {
            return Reply::text(messages::VOICE_UNAVAILABLE);
        };

        match transcriber.transcribe(audio).await {
            Ok(text) => {
                info!(identity, transcript = %text, "voice message transcribed");
                let reply = self.handle_turn(identity, &text).await;
                Reply {
                    text: format!("🎤 Transcribed: {text}\n\n{}", reply.text),
                    options: reply.options,
                }
            }
            Err(e) => {
                error!(identity, error = %e, "voice transcription failed");
                Reply::text(messages::VOICE_FAILED)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Turn dispatch
    // -----------------------------------------------------------------------

    async fn process_turn(&self, identity: &str, text: &str) -> Result<Reply> {
        let input = text.trim();

        if let Some(reply) = self.slash_command(identity, input).await? {
            return Ok(reply);
        }

        if self.pending_logins.contains_key(identity) {
            return self.login_turn(identity, input).await;
        }

        // Everything past this point needs a live session.
        if !self.auth.is_logged_in(identity).await? {
            return Ok(Reply::text(messages::LOGIN_REQUIRED));
        }

        match self.conversations.get(identity).await? {
            Some(state) => self.conversation_turn(identity, state, input).await,
            None => self.new_intent_turn(identity, input).await,
        }
    }

    /// Built-in commands, handled before matching and before the session
    /// gate (a logged-out user must still reach `/login`).
    async fn slash_command(&self, identity: &str, input: &str) -> Result<Option<Reply>> {
        let reply = match input.to_ascii_lowercase().as_str() {
            "/start" => Reply::text(messages::GREETING),
            "/help" => Reply::text(messages::HELP),
            "/reset" => {
                // Reset is unconditional and idempotent: drop any pending
                // login dialogue and the active conversation, if present.
                self.pending_logins.remove(identity);
                let existed = self.conversations.remove(identity).await?;
                info!(identity, existed, "conversation reset");
                Reply::text(if existed {
                    messages::RESET_DONE
                } else {
                    messages::RESET_NOTHING
                })
            }
            "/login" => {
                if self.auth.is_logged_in(identity).await? {
                    Reply::text(messages::ALREADY_LOGGED_IN)
                } else {
                    self.pending_logins
                        .insert(identity.to_string(), LoginDialogue::AwaitingUsername);
                    Reply::text(messages::LOGIN_USERNAME_PROMPT)
                }
            }
            "/logout" => {
                self.pending_logins.remove(identity);
                if self.auth.logout(identity).await? {
                    Reply::text(messages::LOGGED_OUT)
                } else {
                    Reply::text(messages::NOT_LOGGED_IN)
                }
            }
            "/cancel" => {
                if self.pending_logins.remove(identity).is_some() {
                    Reply::text(messages::LOGIN_CANCELLED)
                } else {
                    Reply::text(messages::NOTHING_TO_CANCEL)
                }
            }
            _ => return Ok(None),
        };
        Ok(Some(reply))
    }

    /// One turn of the in-memory login dialogue. The password is consumed
    /// here and goes nowhere but the credential endpoint.
    async fn login_turn(&self, identity: &str, input: &str) -> Result<Reply> {
        let dialogue = self.pending_logins.get(identity).map(|d| d.value().clone());

        match dialogue {
            Some(LoginDialogue::AwaitingUsername) => {
                self.pending_logins.insert(
                    identity.to_string(),
                    LoginDialogue::AwaitingPassword {
                        username: input.to_string(),
                    },
                );
                Ok(Reply::text(messages::LOGIN_PASSWORD_PROMPT))
            }
            Some(LoginDialogue::AwaitingPassword { username }) => {
                self.pending_logins.remove(identity);
                match self.auth.login(identity, &username, input).await {
                    Ok(_) => Ok(Reply::text(messages::LOGIN_SUCCESS)),
                    Err(AuthError::InvalidCredentials) => Ok(Reply::text(messages::LOGIN_FAILED)),
                    Err(e) => {
                        error!(identity, error = %e, "login attempt failed");
                        Ok(Reply::text(messages::LOGIN_UNAVAILABLE))
                    }
                }
            }
            None => Ok(Reply::text(messages::GENERIC_FAILURE)),
        }
    }

    // -----------------------------------------------------------------------
    // New intent
    // -----------------------------------------------------------------------

    async fn new_intent_turn(&self, identity: &str, input: &str) -> Result<Reply> {
        let (intent, score) = match self.matcher.best_match(input) {
            MatchOutcome::Matched { intent, score, .. } => (intent, score),
            MatchOutcome::NoMatch => {
                debug!(identity, input, "no intent matched");
                return Ok(Reply::text(messages::NOT_UNDERSTOOD));
            }
        };

        let Some(command) = self.catalog.lookup(&intent) else {
            // The matcher only knows names the catalog registered.
            return Err(EngineError::StaleState {
                reason: format!("matched intent `{intent}` missing from catalog"),
            });
        };

        info!(identity, intent = %command.name, score, "intent matched");

        match command.kind {
            CommandKind::Simple => {
                // Validation guarantees a response for simple commands.
                Ok(Reply::text(command.response.as_deref().unwrap_or_default()))
            }
            CommandKind::Conversation | CommandKind::ApiRequest => {
                let Some(first) = command.first_step() else {
                    return Err(EngineError::StaleState {
                        reason: format!("command `{}` has no steps", command.name),
                    });
                };
                let state = ConversationState::new(&command.name, &first.id);
                self.conversations.put(identity, &state).await?;
                self.step_reply(command, first, &state, None)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Continuing conversation
    // -----------------------------------------------------------------------

    async fn conversation_turn(
        &self,
        identity: &str,
        mut state: ConversationState,
        input: &str,
    ) -> Result<Reply> {
        let Some(command) = self.catalog.lookup(&state.intent) else {
            warn!(identity, intent = %state.intent, "state references unknown command, dropping");
            self.conversations.remove(identity).await?;
            return Ok(Reply::text(messages::GENERIC_FAILURE));
        };
        let Some(step) = command.step(&state.current_step) else {
            warn!(identity, step = %state.current_step, "state references unknown step, dropping");
            self.conversations.remove(identity).await?;
            return Ok(Reply::text(messages::GENERIC_FAILURE));
        };

        // Tokens (expect membership, goto keys, responses keys) compare
        // case-insensitively; stored responses keep the raw input.
        let token = input.to_lowercase();

        // 1. Validate against `expect`, bounded by the retry policy.
        if !step.accepts(input) {
            state.invalid_attempts += 1;
            if state.invalid_attempts >= self.config.max_invalid_attempts {
                warn!(identity, step = %step.id, "retry bound exhausted, aborting conversation");
                self.conversations.remove(identity).await?;
                return Ok(Reply::text(messages::CONVERSATION_ABORTED));
            }
            self.conversations.put(identity, &state).await?;
            let options = step.expect.clone().unwrap_or_default();
            return Ok(Reply::with_options(
                messages::invalid_choice(&options),
                options,
            ));
        }
        state.invalid_attempts = 0;

        // 2. Record the raw response if the step keeps it.
        if step.store_response {
            state.collected.insert(step.id.clone(), input.to_string());
        }

        // 3. Per-token display text, shown ahead of the next prompt.
        let ack = step.response_text(&token).map(str::to_string);

        // 4. Resolve the successor: `goto` override, then definition
        // order; a final step with neither completes the conversation.
        let next_id = match step.goto_target(&token) {
            Some(target) => Some(target.to_string()),
            None if step.is_final => None,
            None => command.default_successor(&step.id).map(|s| s.id.clone()),
        };

        let Some(next_id) = next_id else {
            self.conversations.remove(identity).await?;
            info!(identity, intent = %command.name, "conversation completed");
            return Ok(Reply::text(
                ack.unwrap_or_else(|| messages::CONVERSATION_DONE.to_string()),
            ));
        };

        let Some(next) = command.step(&next_id) else {
            // Unreachable for a validated catalog.
            self.conversations.remove(identity).await?;
            return Err(EngineError::StaleState {
                reason: format!("successor `{next_id}` missing from `{}`", command.name),
            });
        };

        // 5. An api step runs as soon as it is entered.
        if let Some(api) = &next.api {
            return self.api_step(identity, next, api, &mut state).await;
        }

        state.current_step = next.id.clone();
        self.conversations.put(identity, &state).await?;
        self.step_reply(command, next, &state, ack.as_deref())
    }

    // -----------------------------------------------------------------------
    // API steps
    // -----------------------------------------------------------------------

    async fn api_step(
        &self,
        identity: &str,
        step: &StepDefinition,
        api: &ApiSpec,
        state: &mut ConversationState,
    ) -> Result<Reply> {
        // Validation guarantees a response_format on api steps.
        let Some(format) = &step.response_format else {
            return Err(EngineError::StaleState {
                reason: format!("api step `{}` has no response_format", step.id),
            });
        };

        // Gate on the session before touching the network.
        let token = match self.auth.require_session(identity).await {
            Ok(token) => token,
            Err(AuthError::NotLoggedIn { .. }) => {
                warn!(identity, step = %step.id, "api step without a session");
                self.conversations.remove(identity).await?;
                return Ok(Reply::text(messages::LOGIN_REQUIRED));
            }
            Err(e) => return Err(e.into()),
        };

        // A template failure is a config defect: log it, degrade to the
        // step's error message, and keep the worker alive.
        let payload = match colloquy_template::render_payload(&api.payload, &state.collected) {
            Ok(map) => Value::Object(map),
            Err(e) => {
                error!(identity, step = %step.id, error = %e, "payload rendering failed");
                return self
                    .finish_api_step(identity, step, state, format.error_message.clone())
                    .await;
            }
        };

        debug!(identity, step = %step.id, method = %api.method, url = %api.url, "invoking api");

        match self
            .transport
            .invoke(&api.method, &api.url, &payload, Some(&token))
            .await
        {
            Ok(result) => {
                let text = match colloquy_template::format_response(&result, format) {
                    Ok(text) => text,
                    Err(e) => {
                        error!(identity, step = %step.id, error = %e, "response formatting failed");
                        format.error_message.clone()
                    }
                };
                self.finish_api_step(identity, step, state, text).await
            }
            Err(GatewayError::CsrfExpired) => {
                // Not the step's error message: the session itself is
                // gone. Force a fresh login.
                warn!(identity, step = %step.id, "api returned 419, expiring session");
                self.auth.expire(identity).await?;
                self.conversations.remove(identity).await?;
                Ok(Reply::text(messages::SESSION_EXPIRED))
            }
            Err(e) => {
                error!(identity, step = %step.id, error = %e, "api call failed");
                self.finish_api_step(identity, step, state, format.error_message.clone())
                    .await
            }
        }
    }

    /// Settle state after an api step ran (or failed short of a 419):
    /// final steps end the conversation, others leave it parked on the
    /// api step.
    async fn finish_api_step(
        &self,
        identity: &str,
        step: &StepDefinition,
        state: &mut ConversationState,
        text: String,
    ) -> Result<Reply> {
        if step.is_final {
            self.conversations.remove(identity).await?;
            info!(identity, intent = %state.intent, "conversation completed");
        } else {
            state.current_step = step.id.clone();
            state.invalid_attempts = 0;
            self.conversations.put(identity, state).await?;
        }
        Ok(Reply::text(text))
    }

    // -----------------------------------------------------------------------
    // Rendering helpers
    // -----------------------------------------------------------------------

    /// Render a step's prompt (+ options), optionally prefixed by the
    /// previous step's acknowledgement text.
    fn step_reply(
        &self,
        command: &CommandDefinition,
        step: &StepDefinition,
        state: &ConversationState,
        ack: Option<&str>,
    ) -> Result<Reply> {
        let context = prompt_context(command, state);
        let prompt = colloquy_template::render(&step.prompt, &context)?;

        let text = match ack {
            Some(ack) => format!("{ack}\n\n{prompt}"),
            None => prompt,
        };

        Ok(Reply {
            text,
            options: step.expect.clone(),
        })
    }

    fn turn_lock(&self, identity: &str) -> Arc<Mutex<()>> {
        self.turn_locks
            .entry(identity.to_string())
            .or_default()
            .clone()
    }
}

/// The template context for prompts: every collected value by step id,
/// plus a synthesized `summary` listing them in step order.
fn prompt_context(command: &CommandDefinition, state: &ConversationState) -> HashMap<String, String> {
    let mut context = state.collected.clone();

    let summary: Vec<String> = command
        .steps
        .iter()
        .filter_map(|step| {
            state
                .collected
                .get(&step.id)
                .map(|value| format!("{}: {}", step.id, value))
        })
        .collect();
    context
        .entry("summary".to_string())
        .or_insert_with(|| summary.join("\n"));

    context
}
