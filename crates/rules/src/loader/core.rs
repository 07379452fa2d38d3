//! Core [`RuleLoader`] struct: filesystem-backed rule loading.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use regex::Regex;
use serde_json::Value;
use tracing::{info, warn};

use crate::schema::AlertRule;

use super::env::{env_var_pattern, resolve_env_vars};
use super::error::{LoadResult, LoadStatus, Result, RuleError};

/// Filesystem-backed alert rule loader.
///
/// Scans a directory for `*.json` files (one rule per file), resolves
/// `${ENV_VAR}` placeholders over every string value, validates, and
/// maintains a shared in-memory map keyed by rule name. [`load_all`]
/// replaces the map atomically, so readers always see either the old or
/// the new complete set.
///
/// [`load_all`]: RuleLoader::load_all
pub struct RuleLoader {
    /// Directory containing rule JSON files.
    rules_dir: PathBuf,
    /// Current rule set keyed by `rule.name`.
    rules: Arc<RwLock<HashMap<String, AlertRule>>>,
    env_pattern: Regex,
}

impl RuleLoader {
    /// Create a loader for the given directory. Nothing is read until
    /// [`load_all`](RuleLoader::load_all) is called.
    pub fn new(rules_dir: PathBuf) -> Self {
        Self {
            rules_dir,
            rules: Arc::new(RwLock::new(HashMap::new())),
            env_pattern: env_var_pattern(),
        }
    }

    /// Scan the rules directory and load all JSON files.
    ///
    /// Files load in filename order, so a duplicate rule name is resolved
    /// deterministically (last file wins). Per-file parse or validation
    /// failures are logged and reported without aborting the scan. A
    /// missing directory yields an empty rule set with a warning.
    pub fn load_all(&self) -> Vec<LoadResult> {
        let mut results = Vec::new();
        let mut loaded: HashMap<String, AlertRule> = HashMap::new();

        let entries = match fs::read_dir(&self.rules_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %self.rules_dir.display(), error = %e, "alert rules directory not readable");
                *self.rules.write().expect("rules lock poisoned") = loaded;
                return results;
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        paths.sort();

        for path in paths {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with('.') {
                    results.push(LoadResult {
                        path,
                        status: LoadStatus::Skipped {
                            reason: "dotfile".to_string(),
                        },
                    });
                    continue;
                }
            }

            let is_json = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e == "json")
                .unwrap_or(false);
            if !is_json {
                results.push(LoadResult {
                    path,
                    status: LoadStatus::Skipped {
                        reason: "not a JSON file".to_string(),
                    },
                });
                continue;
            }

            match self.load_file(&path) {
                Ok(rule) => {
                    info!(rule_name = %rule.name, enabled = rule.enabled, path = %path.display(), "loaded alert rule");
                    let name = rule.name.clone();
                    loaded.insert(name.clone(), rule);
                    results.push(LoadResult {
                        path,
                        status: LoadStatus::Loaded { name },
                    });
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load alert rule");
                    results.push(LoadResult {
                        path,
                        status: LoadStatus::Failed {
                            error: e.to_string(),
                        },
                    });
                }
            }
        }

        info!(count = loaded.len(), "alert rule set loaded");
        *self.rules.write().expect("rules lock poisoned") = loaded;
        results
    }

    /// Parse and validate a single rule file.
    pub fn load_file(&self, path: &Path) -> Result<AlertRule> {
        let contents = fs::read_to_string(path)?;
        let raw: Value = serde_json::from_str(&contents)?;
        let resolved = resolve_env_vars(&raw, &self.env_pattern);
        let mut rule: AlertRule = serde_json::from_value(resolved)?;
        rule.validate().map_err(RuleError::Validation)?;
        rule.file_path = Some(path.to_path_buf());
        Ok(rule)
    }

    /// Reload all rules from disk, replacing the current set.
    pub fn reload(&self) -> Vec<LoadResult> {
        info!("reloading alert rules");
        self.load_all()
    }

    /// Rules with `enabled = true`, in no particular order.
    pub fn get_enabled(&self) -> Vec<AlertRule> {
        self.rules
            .read()
            .expect("rules lock poisoned")
            .values()
            .filter(|r| r.enabled)
            .cloned()
            .collect()
    }

    /// Look up a rule by name.
    pub fn get(&self, name: &str) -> Option<AlertRule> {
        self.rules
            .read()
            .expect("rules lock poisoned")
            .get(name)
            .cloned()
    }

    /// Snapshot of the full rule map.
    pub fn rules(&self) -> HashMap<String, AlertRule> {
        self.rules.read().expect("rules lock poisoned").clone()
    }

    /// Number of loaded rules.
    pub fn len(&self) -> usize {
        self.rules.read().expect("rules lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The configured rules directory.
    pub fn rules_dir(&self) -> &Path {
        &self.rules_dir
    }
}
