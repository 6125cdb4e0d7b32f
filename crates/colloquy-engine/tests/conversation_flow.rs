//! End-to-end interpreter tests: catalog in, replies out, with a scripted
//! gateway transport and no network.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};

use colloquy_auth::AuthManager;
use colloquy_catalog::CommandCatalog;
use colloquy_engine::{EngineConfig, Interpreter, Reply, TranscribeError, Transcriber, messages};
use colloquy_gateway::{ApiTransport, GatewayError};
use colloquy_store::{ConversationStore, Database, SessionStore};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

const CATALOG: &str = r#"{
    "hello": {
        "type": "simple",
        "samples": ["hello", "hi", "good morning"],
        "response": "Hello! How can I help you today?"
    },
    "insert_client": {
        "type": "api_request",
        "samples": ["add a new client", "add client", "register client", "insert client"],
        "steps": [
            {
                "id": "client_designation",
                "prompt": "What is the client's designation?",
                "store_response": true
            },
            {
                "id": "contact_nom",
                "prompt": "What is the contact name?",
                "store_response": true
            },
            {
                "id": "client_code",
                "prompt": "What is the client code?",
                "store_response": true
            },
            {
                "id": "confirmation",
                "prompt": "Here is what I got:\n{summary}\n\nShall I add this client?",
                "expect": ["yes", "no"],
                "goto": {"yes": "api_call", "no": "field_to_update"},
                "responses": {"yes": "Great, sending it now."}
            },
            {
                "id": "field_to_update",
                "prompt": "Which field should I update?\n1. designation\n2. contact name\n3. client code",
                "expect": ["1", "2", "3"],
                "goto": {
                    "1": "client_designation",
                    "2": "contact_nom",
                    "3": "client_code"
                }
            },
            {
                "id": "api_call",
                "prompt": "Sending the client to the system...",
                "api": {
                    "method": "POST",
                    "url": "http://backend.test/clients",
                    "payload": {
                        "client_designation": "{client_designation}",
                        "contact_nom": "{contact_nom}",
                        "client_code": "{client_code}"
                    }
                },
                "response_format": {
                    "success_message": "Client has been successfully added to the system!",
                    "error_message": "Sorry, I couldn't add the client. Please try again later."
                },
                "is_final": true
            }
        ]
    },
    "list_clients": {
        "type": "api_request",
        "samples": ["list clients", "show all clients", "list all clients"],
        "steps": [
            {
                "id": "confirm_list",
                "prompt": "Do you want me to list all clients?",
                "expect": ["yes", "no"],
                "goto": {"no": "cancelled"}
            },
            {
                "id": "fetch",
                "prompt": "Fetching...",
                "api": {
                    "method": "GET",
                    "url": "http://backend.test/clients",
                    "payload": {}
                },
                "response_format": {
                    "success_message": "Here are your clients:\n{clients}",
                    "error_message": "Sorry, I couldn't fetch the client list.",
                    "format_rules": {
                        "clients": {
                            "template": "• {designation} ({code})",
                            "join_with": "\n"
                        }
                    }
                },
                "is_final": true
            },
            {
                "id": "cancelled",
                "prompt": "Okay, I won't list anything.",
                "is_final": true
            }
        ]
    }
}"#;

/// One recorded gateway call.
#[derive(Debug, Clone)]
struct RecordedCall {
    method: String,
    url: String,
    payload: Value,
    token: Option<String>,
}

/// Scripted transport: hands out queued results and records every call.
#[derive(Default)]
struct StubTransport {
    responses: Mutex<VecDeque<colloquy_gateway::Result<Value>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl StubTransport {
    fn push(&self, result: colloquy_gateway::Result<Value>) {
        self.responses.lock().unwrap().push_back(result);
    }

    fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ApiTransport for StubTransport {
    async fn invoke(
        &self,
        method: &str,
        url: &str,
        payload: &Value,
        token: Option<&str>,
    ) -> colloquy_gateway::Result<Value> {
        self.calls.lock().unwrap().push(RecordedCall {
            method: method.to_string(),
            url: url.to_string(),
            payload: payload.clone(),
            token: token.map(str::to_string),
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("stub transport ran out of scripted responses")
    }
}

struct Harness {
    interpreter: Interpreter,
    transport: Arc<StubTransport>,
    sessions: SessionStore,
    conversations: ConversationStore,
}

impl Harness {
    async fn new() -> Self {
        let catalog = Arc::new(CommandCatalog::from_sources([CATALOG]).unwrap());

        let db = Database::open_in_memory().unwrap();
        db.run_migrations().await.unwrap();
        let sessions = SessionStore::new(db.clone());
        let conversations = ConversationStore::new(db);

        let transport: Arc<StubTransport> = Arc::new(StubTransport::default());
        let auth = Arc::new(AuthManager::new(
            sessions.clone(),
            transport.clone(),
            "http://backend.test/authenticate",
        ));

        let interpreter = Interpreter::new(
            catalog,
            conversations.clone(),
            auth,
            transport.clone(),
            EngineConfig::default(),
        );

        Self {
            interpreter,
            transport,
            sessions,
            conversations,
        }
    }

    /// Seed a live session without running the login dialogue.
    async fn logged_in(identity: &str) -> Self {
        let harness = Self::new().await;
        harness
            .sessions
            .upsert_login(identity, "alice", "tok-test")
            .await
            .unwrap();
        harness
    }

    async fn send(&self, identity: &str, text: &str) -> Reply {
        self.interpreter.handle_turn(identity, text).await
    }

    async fn has_conversation(&self, identity: &str) -> bool {
        self.conversations.get(identity).await.unwrap().is_some()
    }
}

const USER: &str = "user-1";

// ---------------------------------------------------------------------------
// Session gate and slash commands
// ---------------------------------------------------------------------------

#[tokio::test]
async fn turns_require_login() {
    let h = Harness::new().await;
    let reply = h.send(USER, "hello").await;
    assert_eq!(reply.text, messages::LOGIN_REQUIRED);
}

#[tokio::test]
async fn start_and_help_work_without_login() {
    let h = Harness::new().await;
    assert_eq!(h.send(USER, "/start").await.text, messages::GREETING);
    assert_eq!(h.send(USER, "/help").await.text, messages::HELP);
}

#[tokio::test]
async fn login_dialogue_end_to_end() {
    let h = Harness::new().await;
    h.transport
        .push(Ok(json!({"success": true, "token": "tok-1"})));

    assert_eq!(
        h.send(USER, "/login").await.text,
        messages::LOGIN_USERNAME_PROMPT
    );
    assert_eq!(
        h.send(USER, "alice").await.text,
        messages::LOGIN_PASSWORD_PROMPT
    );
    assert_eq!(h.send(USER, "s3cret").await.text, messages::LOGIN_SUCCESS);

    // The login call went to the credential endpoint without a token.
    let calls = h.transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].url, "http://backend.test/authenticate");
    assert_eq!(calls[0].payload["email"], json!("alice"));
    assert!(calls[0].token.is_none());

    // And the bot is usable now.
    let reply = h.send(USER, "hello").await;
    assert_eq!(reply.text, "Hello! How can I help you today?");
}

#[tokio::test]
async fn login_with_bad_credentials_fails_softly() {
    let h = Harness::new().await;
    h.transport.push(Err(GatewayError::Http {
        status: 401,
        body: "no".to_string(),
    }));

    h.send(USER, "/login").await;
    h.send(USER, "alice").await;
    assert_eq!(h.send(USER, "wrong").await.text, messages::LOGIN_FAILED);
    assert_eq!(h.send(USER, "hello").await.text, messages::LOGIN_REQUIRED);
}

#[tokio::test]
async fn login_while_logged_in_short_circuits() {
    let h = Harness::logged_in(USER).await;
    assert_eq!(h.send(USER, "/login").await.text, messages::ALREADY_LOGGED_IN);
}

#[tokio::test]
async fn cancel_abandons_login_dialogue() {
    let h = Harness::new().await;
    h.send(USER, "/login").await;
    assert_eq!(h.send(USER, "/cancel").await.text, messages::LOGIN_CANCELLED);
    // The next message is not swallowed as a username.
    assert_eq!(h.send(USER, "hello").await.text, messages::LOGIN_REQUIRED);
}

#[tokio::test]
async fn logout_clears_session() {
    let h = Harness::logged_in(USER).await;
    assert_eq!(h.send(USER, "/logout").await.text, messages::LOGGED_OUT);
    assert_eq!(h.send(USER, "/logout").await.text, messages::NOT_LOGGED_IN);
    assert_eq!(h.send(USER, "hello").await.text, messages::LOGIN_REQUIRED);
}

// ---------------------------------------------------------------------------
// Intent matching
// ---------------------------------------------------------------------------

#[tokio::test]
async fn simple_intent_replies_verbatim_without_state() {
    let h = Harness::logged_in(USER).await;

    let reply = h.send(USER, "hello").await;
    assert_eq!(reply.text, "Hello! How can I help you today?");
    assert!(reply.options.is_none());
    assert!(!h.has_conversation(USER).await);
}

#[tokio::test]
async fn fuzzy_sample_phrase_matches_simple_intent() {
    let h = Harness::logged_in(USER).await;
    // One edit from "good morning".
    let reply = h.send(USER, "good mornin").await;
    assert_eq!(reply.text, "Hello! How can I help you today?");
}

#[tokio::test]
async fn unmatched_text_is_not_understood() {
    let h = Harness::logged_in(USER).await;
    let reply = h.send(USER, "please compute the meaning of life").await;
    assert_eq!(reply.text, messages::NOT_UNDERSTOOD);
    assert!(!h.has_conversation(USER).await);
}

// ---------------------------------------------------------------------------
// The full add-client scenario
// ---------------------------------------------------------------------------

#[tokio::test]
async fn insert_client_happy_path() {
    let h = Harness::logged_in(USER).await;
    h.transport.push(Ok(json!({"success": true})));

    let reply = h.send(USER, "add a new client").await;
    assert_eq!(reply.text, "What is the client's designation?");
    assert!(h.has_conversation(USER).await);

    let reply = h.send(USER, "Acme").await;
    assert_eq!(reply.text, "What is the contact name?");

    let reply = h.send(USER, "Bob").await;
    assert_eq!(reply.text, "What is the client code?");

    let reply = h.send(USER, "X1").await;
    assert!(reply.text.contains("Acme"), "summary shows designation");
    assert!(reply.text.contains("Bob"), "summary shows contact");
    assert!(reply.text.contains("X1"), "summary shows code");
    assert_eq!(
        reply.options,
        Some(vec!["yes".to_string(), "no".to_string()])
    );

    let reply = h.send(USER, "yes").await;
    assert_eq!(
        reply.text,
        "Client has been successfully added to the system!"
    );
    assert!(!h.has_conversation(USER).await);

    // The gateway saw exactly the rendered payload, with the session
    // token attached.
    let calls = h.transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, "POST");
    assert_eq!(calls[0].url, "http://backend.test/clients");
    assert_eq!(calls[0].payload["client_designation"], json!("Acme"));
    assert_eq!(calls[0].payload["contact_nom"], json!("Bob"));
    assert_eq!(calls[0].payload["client_code"], json!("X1"));
    assert_eq!(calls[0].token.as_deref(), Some("tok-test"));
}

#[tokio::test]
async fn confirmation_cycle_updates_a_field_and_reconverges() {
    let h = Harness::logged_in(USER).await;
    h.transport.push(Ok(json!({"success": true})));

    h.send(USER, "add a new client").await;
    h.send(USER, "Acme").await;
    h.send(USER, "Bob").await;
    let reply = h.send(USER, "X1").await;
    assert!(reply.text.contains("Shall I add this client?"));

    // "no" branches into the field-update step.
    let reply = h.send(USER, "no").await;
    assert!(reply.text.contains("Which field should I update?"));
    assert_eq!(
        reply.options,
        Some(vec!["1".to_string(), "2".to_string(), "3".to_string()])
    );

    // "1" jumps back to the designation step.
    let reply = h.send(USER, "1").await;
    assert_eq!(reply.text, "What is the client's designation?");

    // The walk reconverges on the confirmation with the updated value.
    h.send(USER, "Acme Industries").await; // -> contact_nom
    h.send(USER, "Bob").await; // -> client_code
    let reply = h.send(USER, "X1").await; // -> confirmation
    assert!(reply.text.contains("Acme Industries"));

    // "yes" from there reaches the api step.
    let reply = h.send(USER, "yes").await;
    assert_eq!(
        reply.text,
        "Client has been successfully added to the system!"
    );
    let calls = h.transport.calls();
    assert_eq!(calls[0].payload["client_designation"], json!("Acme Industries"));
}

#[tokio::test]
async fn stored_responses_keep_their_case() {
    let h = Harness::logged_in(USER).await;
    h.transport.push(Ok(json!({"success": true})));

    h.send(USER, "add a new client").await;
    h.send(USER, "AcMe GmbH").await;
    h.send(USER, "Bob").await;
    h.send(USER, "X1").await;
    h.send(USER, "YES").await; // tokens compare case-insensitively

    let calls = h.transport.calls();
    assert_eq!(calls[0].payload["client_designation"], json!("AcMe GmbH"));
}

// ---------------------------------------------------------------------------
// Validation and the retry bound
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_input_reprompts_with_options() {
    let h = Harness::logged_in(USER).await;

    h.send(USER, "add a new client").await;
    h.send(USER, "Acme").await;
    h.send(USER, "Bob").await;
    h.send(USER, "X1").await;

    let reply = h.send(USER, "banana").await;
    assert_eq!(reply.text, "Please choose one of: yes, no");
    assert_eq!(
        reply.options,
        Some(vec!["yes".to_string(), "no".to_string()])
    );
    // Still waiting on the same step.
    assert!(h.has_conversation(USER).await);
}

#[tokio::test]
async fn retry_bound_aborts_the_conversation() {
    let h = Harness::logged_in(USER).await;

    h.send(USER, "add a new client").await;
    h.send(USER, "Acme").await;
    h.send(USER, "Bob").await;
    h.send(USER, "X1").await;

    h.send(USER, "banana").await;
    h.send(USER, "pineapple").await;
    let reply = h.send(USER, "kiwi").await;
    assert_eq!(reply.text, messages::CONVERSATION_ABORTED);
    assert!(!h.has_conversation(USER).await);
}

#[tokio::test]
async fn valid_input_resets_the_retry_counter() {
    let h = Harness::logged_in(USER).await;

    h.send(USER, "add a new client").await;
    h.send(USER, "Acme").await;
    h.send(USER, "Bob").await;
    h.send(USER, "X1").await;

    // Two strikes, then a valid answer, then two more strikes: the bound
    // counts consecutive failures only.
    h.send(USER, "banana").await;
    h.send(USER, "pineapple").await;
    h.send(USER, "no").await; // valid -> field_to_update
    h.send(USER, "7").await;
    let reply = h.send(USER, "8").await;
    assert_eq!(reply.text, "Please choose one of: 1, 2, 3");
    assert!(h.has_conversation(USER).await);
}

// ---------------------------------------------------------------------------
// Reset
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reset_mid_conversation_drops_state() {
    let h = Harness::logged_in(USER).await;

    h.send(USER, "add a new client").await;
    h.send(USER, "Acme").await;
    assert!(h.has_conversation(USER).await);

    assert_eq!(h.send(USER, "/reset").await.text, messages::RESET_DONE);
    assert!(!h.has_conversation(USER).await);
}

#[tokio::test]
async fn reset_is_idempotent() {
    let h = Harness::logged_in(USER).await;

    assert_eq!(h.send(USER, "/reset").await.text, messages::RESET_NOTHING);
    assert_eq!(h.send(USER, "/reset").await.text, messages::RESET_NOTHING);
    assert!(!h.has_conversation(USER).await);
}

#[tokio::test]
async fn reset_works_without_login() {
    let h = Harness::new().await;
    assert_eq!(h.send(USER, "/reset").await.text, messages::RESET_NOTHING);
}

// ---------------------------------------------------------------------------
// API failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn api_http_error_uses_step_error_message() {
    let h = Harness::logged_in(USER).await;
    h.transport.push(Err(GatewayError::Http {
        status: 500,
        body: "boom".to_string(),
    }));

    h.send(USER, "add a new client").await;
    h.send(USER, "Acme").await;
    h.send(USER, "Bob").await;
    h.send(USER, "X1").await;
    let reply = h.send(USER, "yes").await;

    assert_eq!(
        reply.text,
        "Sorry, I couldn't add the client. Please try again later."
    );
    // A final api step ends the conversation either way.
    assert!(!h.has_conversation(USER).await);
    // The session is untouched by an ordinary failure.
    assert_eq!(h.send(USER, "hello").await.text, "Hello! How can I help you today?");
}

#[tokio::test]
async fn api_transport_error_uses_step_error_message() {
    let h = Harness::logged_in(USER).await;
    h.transport.push(Err(GatewayError::Transport {
        reason: "timed out".to_string(),
    }));

    h.send(USER, "add a new client").await;
    h.send(USER, "Acme").await;
    h.send(USER, "Bob").await;
    h.send(USER, "X1").await;
    let reply = h.send(USER, "yes").await;
    assert_eq!(
        reply.text,
        "Sorry, I couldn't add the client. Please try again later."
    );
}

#[tokio::test]
async fn csrf_expiry_logs_out_and_uses_the_expiry_notice() {
    let h = Harness::logged_in(USER).await;
    h.transport.push(Err(GatewayError::CsrfExpired));

    h.send(USER, "add a new client").await;
    h.send(USER, "Acme").await;
    h.send(USER, "Bob").await;
    h.send(USER, "X1").await;
    let reply = h.send(USER, "yes").await;

    // The exact notice, not the step's error_message.
    assert_eq!(
        reply.text,
        "Your session has expired (CSRF token mismatch). Please type /login to login again."
    );
    assert!(!h.has_conversation(USER).await);
    // Token cleared: the next turn hits the login gate.
    assert_eq!(h.send(USER, "hello").await.text, messages::LOGIN_REQUIRED);
    // But the credential reference survived the expiry.
    let record = h.sessions.get(USER).await.unwrap().unwrap();
    assert_eq!(record.credential_ref, "alice");
    assert!(record.token.is_none());
}

// ---------------------------------------------------------------------------
// GET + format_rules
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_clients_formats_collection_results() {
    let h = Harness::logged_in(USER).await;
    h.transport.push(Ok(json!({"data": [
        {"designation": "Acme", "code": "X1"},
        {"designation": "Globex", "code": "X2"}
    ]})));

    let reply = h.send(USER, "list clients").await;
    assert_eq!(reply.text, "Do you want me to list all clients?");

    let reply = h.send(USER, "yes").await;
    assert_eq!(
        reply.text,
        "Here are your clients:\n• Acme (X1)\n• Globex (X2)"
    );
    assert!(!h.has_conversation(USER).await);

    let calls = h.transport.calls();
    assert_eq!(calls[0].method, "GET");
}

#[tokio::test]
async fn list_clients_declined_reaches_final_step() {
    let h = Harness::logged_in(USER).await;

    h.send(USER, "list clients").await;
    let reply = h.send(USER, "no").await;
    assert_eq!(reply.text, "Okay, I won't list anything.");

    // Any input at the final step completes the conversation.
    let reply = h.send(USER, "ok").await;
    assert_eq!(reply.text, messages::CONVERSATION_DONE);
    assert!(!h.has_conversation(USER).await);
    // No API call was ever made.
    assert!(h.transport.calls().is_empty());
}

// ---------------------------------------------------------------------------
// Identities are independent
// ---------------------------------------------------------------------------

#[tokio::test]
async fn identities_hold_independent_conversations() {
    let h = Harness::logged_in("a").await;
    h.sessions.upsert_login("b", "bob", "tok-b").await.unwrap();

    h.send("a", "add a new client").await;
    let reply = h.send("b", "list clients").await;
    assert_eq!(reply.text, "Do you want me to list all clients?");

    // a is still on the designation step.
    let reply = h.send("a", "Acme").await;
    assert_eq!(reply.text, "What is the contact name?");

    // Resetting b does not disturb a.
    h.send("b", "/reset").await;
    assert!(h.has_conversation("a").await);
    assert!(!h.has_conversation("b").await);
}

#[tokio::test]
async fn concurrent_turns_across_identities() {
    let h = Arc::new(Harness::logged_in("a").await);
    for id in ["b", "c", "d"] {
        h.sessions.upsert_login(id, id, "tok").await.unwrap();
    }

    let mut handles = Vec::new();
    for id in ["a", "b", "c", "d"] {
        let h = Arc::clone(&h);
        handles.push(tokio::spawn(async move {
            h.send(id, "add a new client").await
        }));
    }
    for handle in handles {
        let reply = handle.await.unwrap();
        assert_eq!(reply.text, "What is the client's designation?");
    }
    for id in ["a", "b", "c", "d"] {
        assert!(h.has_conversation(id).await);
    }
}

// ---------------------------------------------------------------------------
// Voice turns
// ---------------------------------------------------------------------------

struct FixedTranscriber(&'static str);

#[async_trait]
impl Transcriber for FixedTranscriber {
    async fn transcribe(&self, _audio: &[u8]) -> Result<String, TranscribeError> {
        Ok(self.0.to_string())
    }
}

struct BrokenTranscriber;

#[async_trait]
impl Transcriber for BrokenTranscriber {
    async fn transcribe(&self, _audio: &[u8]) -> Result<String, TranscribeError> {
        Err(TranscribeError::Failed("decoder exploded".to_string()))
    }
}

#[tokio::test]
async fn voice_turn_prefixes_the_transcript() {
    let h = Harness::logged_in(USER).await;
    let interpreter = h
        .interpreter
        .with_transcriber(Arc::new(FixedTranscriber("hello")));

    let reply = interpreter.handle_voice_turn(USER, b"...ogg bytes...").await;
    assert_eq!(
        reply.text,
        "🎤 Transcribed: hello\n\nHello! How can I help you today?"
    );
}

#[tokio::test]
async fn voice_turn_failure_is_apologetic() {
    let h = Harness::logged_in(USER).await;
    let interpreter = h.interpreter.with_transcriber(Arc::new(BrokenTranscriber));

    let reply = interpreter.handle_voice_turn(USER, b"noise").await;
    assert_eq!(reply.text, messages::VOICE_FAILED);
}

#[tokio::test]
async fn voice_turn_without_transcriber_is_unavailable() {
    let h = Harness::logged_in(USER).await;
    let reply = h.interpreter.handle_voice_turn(USER, b"noise").await;
    assert_eq!(reply.text, messages::VOICE_UNAVAILABLE);
}
