//! Configuration file support for dispctx
//!
//! Loads project-specific configuration from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.dispctxrc.json` in the working directory
//! 3. `dispctx.config.json` in the working directory
//!
//! All fields are optional. CLI flags take precedence over config file values.

use crate::analysis::DisplayOptions;
use crate::language::Language;
use crate::range::ColumnMode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// dispctx configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DisplayConfig {
    /// Also compare columns for nodes confined to the requested line (default: false)
    #[serde(default)]
    pub precise_columns: Option<bool>,

    /// Report no issue when the resolved location is on another line (default: false)
    #[serde(default)]
    pub require_exact_line: Option<bool>,

    /// Refuse to resolve files that only parsed with error recovery (default: false)
    #[serde(default)]
    pub reject_syntax_errors: Option<bool>,

    /// Extra file extensions (without the dot) to treat as C++
    #[serde(default)]
    pub cpp_extensions: Vec<String>,
}

/// Resolved configuration with defaults applied
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub column_mode: ColumnMode,
    pub require_exact_line: bool,
    pub reject_syntax_errors: bool,
    pub cpp_extensions: Vec<String>,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

impl DisplayConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        for ext in &self.cpp_extensions {
            if ext.is_empty() {
                anyhow::bail!("cpp_extensions must not contain empty entries");
            }
            if ext.starts_with('.') {
                anyhow::bail!(
                    "cpp_extensions entries are written without the leading dot (got {:?})",
                    ext
                );
            }
            if ext.contains('/') || ext.contains('\\') {
                anyhow::bail!(
                    "cpp_extensions entries must not contain path separators (got {:?})",
                    ext
                );
            }
        }
        Ok(())
    }

    /// Resolve config into the form used by the analysis
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        let column_mode = if self.precise_columns.unwrap_or(false) {
            ColumnMode::Precise
        } else {
            ColumnMode::LineOnly
        };

        Ok(ResolvedConfig {
            column_mode,
            require_exact_line: self.require_exact_line.unwrap_or(false),
            reject_syntax_errors: self.reject_syntax_errors.unwrap_or(false),
            cpp_extensions: self.cpp_extensions.clone(),
            config_path: None,
        })
    }
}

impl ResolvedConfig {
    /// Build a ResolvedConfig with all defaults (no config file)
    pub fn defaults() -> Result<Self> {
        DisplayConfig::default().resolve()
    }

    /// Language of `path`, honoring configured extra C++ extensions
    pub fn language_for(&self, path: &Path) -> Option<Language> {
        if let Some(language) = Language::from_path(path) {
            return Some(language);
        }
        let ext = path.extension().and_then(|ext| ext.to_str())?;
        self.cpp_extensions
            .iter()
            .any(|configured| configured == ext)
            .then_some(Language::Cpp)
    }

    /// Options for one display run
    pub fn options(&self) -> DisplayOptions {
        DisplayOptions {
            column_mode: self.column_mode,
            require_exact_line: self.require_exact_line,
            reject_syntax_errors: self.reject_syntax_errors,
        }
    }
}

/// Discover and load a config file from `root`
///
/// Search order:
/// 1. `.dispctxrc.json`
/// 2. `dispctx.config.json`
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(root: &Path) -> Result<Option<(DisplayConfig, PathBuf)>> {
    for name in [".dispctxrc.json", "dispctx.config.json"] {
        let path = root.join(name);
        if path.exists() {
            let config = load_config_file(&path)?;
            return Ok(Some((config, path)));
        }
    }
    Ok(None)
}

/// Load config from an explicit file path
pub fn load_config_file(path: &Path) -> Result<DisplayConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: DisplayConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("invalid config in: {}", path.display()))?;

    Ok(config)
}

/// Load and resolve config
///
/// If `config_path` is provided, loads from that file.
/// Otherwise, discovers config in `root`.
/// Returns default config if nothing is found.
pub fn load_and_resolve(root: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let (config, source_path) = if let Some(path) = config_path {
        let config = load_config_file(path)?;
        (config, Some(path.to_path_buf()))
    } else {
        match discover_config(root)? {
            Some((config, path)) => (config, Some(path)),
            None => (DisplayConfig::default(), None),
        }
    };

    let mut resolved = config.resolve()?;
    resolved.config_path = source_path;
    Ok(resolved)
}
