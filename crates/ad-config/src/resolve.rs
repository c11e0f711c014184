//! Prior document path resolution and loading.
//!
//! Resolution order: CLI argument → environment variables → XDG config dir.
//! There is no built-in default prior; an unresolved path is an error.

use std::path::{Path, PathBuf};

use crate::fingerprint::content_hash;
use crate::priors::PriorSpec;
use crate::validate::{ValidationError, ValidationResult};

/// Where the prior document was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided via CLI argument.
    CliArgument,

    /// Set via environment variable.
    Environment,

    /// Found in XDG config directory.
    XdgConfig,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
        }
    }
}

/// Environment variable names.
pub const ENV_PRIOR_PATH: &str = "AD_PRIOR_CONFIG";
pub const ENV_CONFIG_DIR: &str = "AD_CONFIG_DIR";

/// Standard prior file name inside a config directory.
const PRIOR_FILENAME: &str = "prior.json";

/// Application name for XDG directories.
const APP_NAME: &str = "abc-diag";

/// A parsed prior document together with its provenance.
#[derive(Debug, Clone)]
pub struct LoadedPrior {
    pub spec: PriorSpec,
    pub path: PathBuf,
    pub source: ConfigSource,
    /// SHA-256 of the raw document.
    pub hash: String,
}

/// Resolve the prior document path.
///
/// 1. Explicit CLI path (used even if it does not exist, so the read fails loudly)
/// 2. `AD_PRIOR_CONFIG`
/// 3. `AD_CONFIG_DIR` + `prior.json`
/// 4. XDG config directory (`~/.config/abc-diag/prior.json`)
pub fn resolve_prior_path(cli_path: Option<&Path>) -> Option<(PathBuf, ConfigSource)> {
    if let Some(path) = cli_path {
        return Some((path.to_path_buf(), ConfigSource::CliArgument));
    }

    if let Ok(env_path) = std::env::var(ENV_PRIOR_PATH) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Some((path, ConfigSource::Environment));
        }
        tracing::warn!(path = %path.display(), "{} points at a missing file", ENV_PRIOR_PATH);
    }

    if let Ok(config_dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = PathBuf::from(config_dir).join(PRIOR_FILENAME);
        if path.exists() {
            return Some((path, ConfigSource::Environment));
        }
    }

    if let Some(dir) = xdg_config_dir() {
        let path = dir.join(PRIOR_FILENAME);
        if path.exists() {
            return Some((path, ConfigSource::XdgConfig));
        }
    }

    None
}

/// Get the XDG config directory for abc-diag.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Resolve, read and parse the prior document.
pub fn load_prior(cli_path: Option<&Path>) -> ValidationResult<LoadedPrior> {
    let (path, source) = resolve_prior_path(cli_path).ok_or_else(|| {
        ValidationError::NotFound(format!(
            "no prior document: pass --prior, set {} or {}, or create {}",
            ENV_PRIOR_PATH,
            ENV_CONFIG_DIR,
            xdg_config_dir()
                .map(|d| d.join(PRIOR_FILENAME).display().to_string())
                .unwrap_or_else(|| format!("~/.config/{}/{}", APP_NAME, PRIOR_FILENAME))
        ))
    })?;

    let content = std::fs::read_to_string(&path).map_err(|e| {
        ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let spec = PriorSpec::from_str(&content)?;

    tracing::debug!(
        path = %path.display(),
        source = %source,
        entries = spec.len(),
        "loaded prior document"
    );

    Ok(LoadedPrior {
        spec,
        hash: content_hash(&content),
        path,
        source,
    })
}
