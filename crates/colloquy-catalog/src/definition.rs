//! Command and step definitions.
//!
//! These types mirror the on-disk JSON catalog format: a source file is an
//! object mapping command names to [`CommandDefinition`] bodies. Everything
//! is immutable after load; the catalog hands out shared references only.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The closed set of command kinds.
///
/// Kind-specific required fields are enforced at load time (see
/// [`crate::CommandCatalog`]), never probed at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// One-shot command: matching it renders `response` and creates no
    /// conversation state.
    Simple,
    /// Multi-turn conversation walking the step graph.
    Conversation,
    /// Multi-turn conversation that ends in (or passes through) outbound
    /// API calls.
    ApiRequest,
}

/// A user-invocable command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandDefinition {
    /// Command name — the map key in the source file. Unique across the
    /// catalog, case-insensitively.
    #[serde(skip)]
    pub name: String,

    /// Command kind. Stored as `type` in the JSON sources.
    #[serde(rename = "type")]
    pub kind: CommandKind,

    /// Sample phrases used for fuzzy matching, in priority order.
    /// The command name itself is always matchable in addition to these.
    #[serde(default)]
    pub samples: Vec<String>,

    /// Response text for `simple` commands.
    #[serde(default)]
    pub response: Option<String>,

    /// Ordered step sequence for `conversation` / `api_request` commands.
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
}

impl CommandDefinition {
    /// Look up a step by id.
    pub fn step(&self, id: &str) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// The entry step of the conversation.
    pub fn first_step(&self) -> Option<&StepDefinition> {
        self.steps.first()
    }

    /// The default successor of a step: the next step in definition order,
    /// or `None` when `id` is the last step (end-of-sequence terminal).
    pub fn default_successor(&self, id: &str) -> Option<&StepDefinition> {
        let pos = self.steps.iter().position(|s| s.id == id)?;
        self.steps.get(pos + 1)
    }
}

/// One question/action unit within a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Step id, unique within the command. Stored responses are keyed by
    /// this id and `goto` targets refer to it.
    pub id: String,

    /// Prompt template shown when the step becomes current. May reference
    /// collected values by step id plus the synthesized `summary` value.
    pub prompt: String,

    /// Valid literal response tokens. Absent means free-form input is
    /// accepted. Also the source for the option list shown to the user.
    #[serde(default)]
    pub expect: Option<Vec<String>>,

    /// Whether the raw response is retained under this step's id.
    #[serde(default)]
    pub store_response: bool,

    /// Per-token display text, used instead of echoing raw input.
    #[serde(default)]
    pub responses: Option<BTreeMap<String, String>>,

    /// Per-token successor overrides. Tokens absent from this map follow
    /// the default successor (next step in definition order).
    #[serde(default)]
    pub goto: Option<BTreeMap<String, String>>,

    /// Outbound API call executed when this step is entered.
    #[serde(default)]
    pub api: Option<ApiSpec>,

    /// How to turn the API result into display text. Required for api
    /// steps.
    #[serde(default)]
    pub response_format: Option<ResponseFormat>,

    /// The conversation ends after this step completes successfully.
    #[serde(default)]
    pub is_final: bool,
}

impl StepDefinition {
    /// The `goto` successor for a normalized response token, if any.
    pub fn goto_target(&self, token: &str) -> Option<&str> {
        self.goto.as_ref()?.get(token).map(String::as_str)
    }

    /// The display text for a normalized response token, if any.
    pub fn response_text(&self, token: &str) -> Option<&str> {
        self.responses.as_ref()?.get(token).map(String::as_str)
    }

    /// Whether `token` is acceptable under this step's `expect` set.
    /// Free-form steps (no `expect`) accept everything.
    pub fn accepts(&self, token: &str) -> bool {
        match &self.expect {
            Some(options) => options.iter().any(|o| o.eq_ignore_ascii_case(token)),
            None => true,
        }
    }
}

/// HTTP methods allowed in an [`ApiSpec`].
pub const ALLOWED_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE"];

/// An outbound API call attached to a step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSpec {
    /// HTTP method, one of [`ALLOWED_METHODS`] (case-insensitive).
    pub method: String,

    /// Target URL.
    pub url: String,

    /// JSON payload mapping. String leaves are templates rendered against
    /// the collected values at call time.
    #[serde(default)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

/// Formatting rules for an API result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseFormat {
    /// Template for the success reply, rendered against the named parts
    /// produced by `format_rules`.
    pub success_message: String,

    /// Literal reply for transport/HTTP failures (and as the fallback when
    /// a collection comes back empty).
    pub error_message: String,

    /// Named formatting rules, each producing one part for
    /// `success_message`.
    #[serde(default)]
    pub format_rules: BTreeMap<String, FormatRule>,
}

/// A per-item template plus the separator used to join collection items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatRule {
    /// Template applied to each item of a collection-valued result (or to
    /// the object itself for scalar results).
    pub template: String,

    /// Separator joining the rendered items.
    pub join_with: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
