//! Catalog loading, merging, and load-time validation.
//!
//! Arbitrarily many JSON sources are merged into one immutable catalog.
//! Every structural defect — duplicate names, dangling `goto` targets,
//! unreachable steps, cycles with no exit — is fatal here so that nothing
//! malformed can ever surface at conversation time.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;

use serde_json::Value;
use tracing::{debug, info};

use crate::definition::{ALLOWED_METHODS, CommandDefinition, CommandKind, StepDefinition};
use crate::error::{CatalogError, Result};

/// An immutable, validated set of command definitions.
///
/// Loaded once at startup and shared read-only (wrap in `Arc`) across all
/// identities. Commands keep their registration order, which is the
/// tie-break order for fuzzy matching.
pub struct CommandCatalog {
    commands: Vec<CommandDefinition>,
    /// Lowercased name -> index into `commands`.
    index: HashMap<String, usize>,
}

impl CommandCatalog {
    /// Load and merge every `*.json` file in `dir`.
    ///
    /// Files are visited in lexicographic name order so registration order
    /// is stable across platforms.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|source| CatalogError::Io {
            path: dir.display().to_string(),
            source,
        })?;

        let mut files: Vec<_> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();

        let mut builder = CatalogBuilder::default();
        for file in &files {
            let text = std::fs::read_to_string(file).map_err(|source| CatalogError::Io {
                path: file.display().to_string(),
                source,
            })?;
            builder.add_source(&file.display().to_string(), &text)?;
        }

        let catalog = builder.finish()?;
        info!(
            dir = %dir.display(),
            sources = files.len(),
            commands = catalog.len(),
            "command catalog loaded"
        );
        Ok(catalog)
    }

    /// Build a catalog from in-memory JSON sources (tests, embedded
    /// catalogs). Sources are merged in iteration order.
    pub fn from_sources<'a>(sources: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let mut builder = CatalogBuilder::default();
        for (i, text) in sources.into_iter().enumerate() {
            builder.add_source(&format!("<source {i}>"), text)?;
        }
        builder.finish()
    }

    /// Look up a command by name, case-insensitively.
    pub fn lookup(&self, name: &str) -> Option<&CommandDefinition> {
        self.index
            .get(&name.to_lowercase())
            .map(|&i| &self.commands[i])
    }

    /// All commands in registration order.
    pub fn commands(&self) -> impl Iterator<Item = &CommandDefinition> {
        self.commands.iter()
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

#[derive(Default)]
struct CatalogBuilder {
    commands: Vec<CommandDefinition>,
    index: HashMap<String, usize>,
}

impl CatalogBuilder {
    /// Parse one JSON source (an object of name -> definition) and append
    /// its commands.
    fn add_source(&mut self, path: &str, text: &str) -> Result<()> {
        let root: Value = serde_json::from_str(text).map_err(|source| CatalogError::Parse {
            path: path.to_string(),
            source,
        })?;

        let Value::Object(entries) = root else {
            return Err(CatalogError::NotAnObject {
                path: path.to_string(),
            });
        };

        for (name, body) in entries {
            let mut def: CommandDefinition =
                serde_json::from_value(body).map_err(|source| CatalogError::Parse {
                    path: path.to_string(),
                    source,
                })?;
            def.name = name;
            self.insert(def)?;
        }
        Ok(())
    }

    fn insert(&mut self, def: CommandDefinition) -> Result<()> {
        let key = def.name.to_lowercase();
        if self.index.contains_key(&key) {
            return Err(CatalogError::DuplicateCommand { name: def.name });
        }
        debug!(command = %def.name, kind = ?def.kind, "command registered");
        self.index.insert(key, self.commands.len());
        self.commands.push(def);
        Ok(())
    }

    fn finish(self) -> Result<CommandCatalog> {
        for def in &self.commands {
            validate_command(def)?;
        }
        Ok(CommandCatalog {
            commands: self.commands,
            index: self.index,
        })
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate one command definition. Called for every command at load time.
fn validate_command(def: &CommandDefinition) -> Result<()> {
    match def.kind {
        CommandKind::Simple => {
            if def.response.is_none() {
                return Err(CatalogError::MissingResponse {
                    name: def.name.clone(),
                });
            }
            if !def.steps.is_empty() {
                return Err(CatalogError::UnexpectedSteps {
                    name: def.name.clone(),
                });
            }
            Ok(())
        }
        CommandKind::Conversation => validate_steps(def),
        CommandKind::ApiRequest => {
            if !def.steps.iter().any(|s| s.api.is_some()) {
                return Err(CatalogError::NoApiStep {
                    name: def.name.clone(),
                });
            }
            validate_steps(def)
        }
    }
}

/// Validate the step graph of a conversation/api_request command.
fn validate_steps(def: &CommandDefinition) -> Result<()> {
    if def.steps.is_empty() {
        return Err(CatalogError::EmptySteps {
            name: def.name.clone(),
        });
    }

    // Step ids must be unique within the command.
    let mut ids = HashSet::new();
    for step in &def.steps {
        if !ids.insert(step.id.as_str()) {
            return Err(CatalogError::DuplicateStep {
                name: def.name.clone(),
                step: step.id.clone(),
            });
        }
    }

    // Every goto target must name an existing step, and api steps must be
    // fully specified.
    for step in &def.steps {
        if let Some(goto) = &step.goto {
            for target in goto.values() {
                if !ids.contains(target.as_str()) {
                    return Err(CatalogError::UnknownGotoTarget {
                        name: def.name.clone(),
                        step: step.id.clone(),
                        target: target.clone(),
                    });
                }
            }
        }
        if let Some(api) = &step.api {
            if !ALLOWED_METHODS
                .iter()
                .any(|m| m.eq_ignore_ascii_case(&api.method))
            {
                return Err(CatalogError::InvalidMethod {
                    name: def.name.clone(),
                    step: step.id.clone(),
                    method: api.method.clone(),
                });
            }
            if step.response_format.is_none() {
                return Err(CatalogError::MissingResponseFormat {
                    name: def.name.clone(),
                    step: step.id.clone(),
                });
            }
        }
    }

    validate_graph(def)
}

/// Graph checks: every step reachable from the first, and every step able
/// to reach a terminal (a final step, or the end of the sequence).
///
/// Cycles themselves are legal — the confirmation/field-update loop is an
/// ordinary cycle — as long as every step on the cycle still has a path
/// out.
fn validate_graph(def: &CommandDefinition) -> Result<()> {
    // Forward reachability from the first step.
    let first = &def.steps[0];
    let mut reachable: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::from([first.id.as_str()]);
    while let Some(id) = queue.pop_front() {
        if !reachable.insert(id) {
            continue;
        }
        // Ids in the queue always exist: goto targets were checked above.
        if let Some(step) = def.step(id) {
            queue.extend(successors(def, step));
        }
    }
    for step in &def.steps {
        if !reachable.contains(step.id.as_str()) {
            return Err(CatalogError::UnreachableStep {
                name: def.name.clone(),
                step: step.id.clone(),
            });
        }
    }

    // Backward reachability from terminals. A terminal completes the
    // conversation: a final step, or a step whose default successor is the
    // end of the sequence.
    let mut can_terminate: HashSet<&str> = def
        .steps
        .iter()
        .filter(|s| s.is_final || def.default_successor(&s.id).is_none())
        .map(|s| s.id.as_str())
        .collect();
    loop {
        let mut grew = false;
        for step in &def.steps {
            if can_terminate.contains(step.id.as_str()) {
                continue;
            }
            if successors(def, step)
                .iter()
                .any(|s| can_terminate.contains(s))
            {
                can_terminate.insert(step.id.as_str());
                grew = true;
            }
        }
        if !grew {
            break;
        }
    }
    for step in &def.steps {
        if !can_terminate.contains(step.id.as_str()) {
            return Err(CatalogError::NoTerminalPath {
                name: def.name.clone(),
                step: step.id.clone(),
            });
        }
    }

    Ok(())
}

/// All outgoing edges of a step: the default successor plus every `goto`
/// target.
fn successors<'a>(def: &'a CommandDefinition, step: &'a StepDefinition) -> Vec<&'a str> {
    let mut out: Vec<&str> = Vec::new();
    if let Some(next) = def.default_successor(&step.id) {
        out.push(next.id.as_str());
    }
    if let Some(goto) = &step.goto {
        out.extend(goto.values().map(String::as_str));
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
