//! Application configuration.
//!
//! Reads `config/default.toml` (section `[colloquy]`), falling back to
//! defaults when the file or individual keys are missing. Environment
//! variables loaded via dotenv can override the secrets-adjacent values.

use std::path::Path;

/// Settings for the CLI transport and the services it wires up.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory of `*.json` command catalogs.
    pub commands_dir: String,
    /// SQLite database path.
    pub database_path: String,
    /// Credential-validation endpoint for `/login`.
    pub login_url: String,
    /// Outbound API request timeout, in seconds.
    pub request_timeout_secs: u64,
    /// Inclusive fuzzy-match threshold.
    pub match_threshold: f64,
    /// Invalid-input retry bound per step.
    pub max_invalid_attempts: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            commands_dir: "commands".to_string(),
            database_path: "data/colloquy.db".to_string(),
            login_url: "http://localhost:8000/authenticate".to_string(),
            request_timeout_secs: colloquy_gateway::DEFAULT_TIMEOUT_SECS,
            match_threshold: 0.80,
            max_invalid_attempts: 3,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file, falling back to defaults for
    /// anything missing. A missing file is not an error.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let defaults = Self::default();

        let content = match std::fs::read_to_string(path.as_ref()) {
            Ok(c) => c,
            Err(_) => return defaults,
        };

        let table: toml::Table = match content.parse() {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(error = %e, "config file is not valid TOML, using defaults");
                return defaults;
            }
        };

        let section = match table.get("colloquy") {
            Some(toml::Value::Table(s)) => s,
            _ => return defaults,
        };

        let get_str = |key: &str, fallback: &str| -> String {
            section
                .get(key)
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| fallback.to_string())
        };

        Self {
            commands_dir: get_str("commands_dir", &defaults.commands_dir),
            database_path: get_str("database_path", &defaults.database_path),
            login_url: std::env::var("COLLOQUY_LOGIN_URL")
                .unwrap_or_else(|_| get_str("login_url", &defaults.login_url)),
            request_timeout_secs: section
                .get("request_timeout_secs")
                .and_then(|v| v.as_integer())
                .map(|v| v.max(1) as u64)
                .unwrap_or(defaults.request_timeout_secs),
            match_threshold: section
                .get("match_threshold")
                .and_then(|v| v.as_float())
                .map(|v| v.clamp(0.0, 1.0))
                .unwrap_or(defaults.match_threshold),
            max_invalid_attempts: section
                .get("max_invalid_attempts")
                .and_then(|v| v.as_integer())
                .map(|v| v.max(1) as u32)
                .unwrap_or(defaults.max_invalid_attempts),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_gives_defaults() {
        let config = AppConfig::load("/no/such/file.toml");
        assert_eq!(config.commands_dir, "commands");
        assert_eq!(config.max_invalid_attempts, 3);
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("default.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            "[colloquy]\ncommands_dir = \"my-commands\"\nmatch_threshold = 0.9"
        )
        .unwrap();

        let config = AppConfig::load(&path);
        assert_eq!(config.commands_dir, "my-commands");
        assert_eq!(config.match_threshold, 0.9);
        assert_eq!(config.database_path, "data/colloquy.db");
    }

    #[test]
    fn invalid_toml_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("default.toml");
        std::fs::write(&path, "this is {not toml").unwrap();

        let config = AppConfig::load(&path);
        assert_eq!(config.commands_dir, "commands");
    }

    #[test]
    fn threshold_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("default.toml");
        std::fs::write(&path, "[colloquy]\nmatch_threshold = 7.5").unwrap();

        let config = AppConfig::load(&path);
        assert_eq!(config.match_threshold, 1.0);
    }
}
