//! Environment variable resolver
//!
//! Configuration files may reference the environment as `${VAR}` or
//! `${VAR:-default}`. References are substituted in the raw text before the
//! YAML is parsed.

use crate::{ConfigError, Result};
use regex::Regex;
use std::collections::HashMap;

/// Variables available for substitution
#[derive(Debug, Clone)]
pub struct ResolutionContext {
    /// Environment variables (can be overridden)
    pub env_vars: HashMap<String, String>,
}

impl ResolutionContext {
    /// Create a context from the process environment
    pub fn new() -> Self {
        Self {
            env_vars: std::env::vars().collect(),
        }
    }

    /// Create a context with no variables
    pub fn empty() -> Self {
        Self {
            env_vars: HashMap::new(),
        }
    }

    /// Add or update an environment variable
    pub fn set_env(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.env_vars.insert(key.into(), value.into());
    }
}

impl Default for ResolutionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Substitute every `${VAR}` / `${VAR:-default}` in `input`
///
/// All unresolved names are reported together.
pub fn resolve_env_vars(input: &str, context: &ResolutionContext) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
        .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

    let mut missing = Vec::new();
    let resolved = re.replace_all(input, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        match (context.env_vars.get(name), caps.get(2)) {
            (Some(value), _) => value.clone(),
            (None, Some(default)) => default.as_str().to_string(),
            (None, None) => {
                missing.push(name.to_string());
                String::new()
            }
        }
    });

    if missing.is_empty() {
        Ok(resolved.into_owned())
    } else {
        Err(ConfigError::EnvVarNotFound(missing.join(", ")))
    }
}
