//! Settings resolution: CLI flags > environment > config file > defaults.

use std::path::{Path, PathBuf};

use boxsmith_core::{CatalogMode, ForwardMode, RunConfig};
use serde::{Deserialize, Serialize};

use crate::cli_types::RunArgs;
use crate::error::CliError;

pub(crate) const ENV_JELLYFIN_URL: &str = "JELLYFIN_URL";
pub(crate) const ENV_JELLYFIN_API_KEY: &str = "JELLYFIN_API_KEY";
pub(crate) const ENV_JELLYFIN_USER_ID: &str = "JELLYFIN_USER_ID";
pub(crate) const ENV_TMDB_API_KEY: &str = "TMDB_API_KEY";
pub(crate) const ENV_JELLYSEERR_URL: &str = "JELLYSEERR_URL";
pub(crate) const ENV_JELLYSEERR_API_KEY: &str = "JELLYSEERR_API_KEY";

const DEFAULT_SNAPSHOT_DIR: &str = "metadata";
const DEFAULT_LOG_DIR: &str = "logs";

/// Where a setting's value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SettingSource {
    Flag(&'static str),
    EnvVar(&'static str),
    ConfigFile,
    Missing,
}

impl std::fmt::Display for SettingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Flag(flag) => write!(f, "flag --{}", flag),
            Self::EnvVar(var) => write!(f, "env ${}", var),
            Self::ConfigFile => write!(f, "config file"),
            Self::Missing => write!(f, "not set"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Setting {
    pub value: Option<String>,
    pub source: SettingSource,
}

impl Setting {
    fn resolve(
        flag: (&'static str, Option<&str>),
        env_var: &'static str,
        env: &impl Fn(&str) -> Option<String>,
        file: Option<&str>,
    ) -> Self {
        let non_empty = |v: &str| !v.trim().is_empty();
        if let Some(v) = flag.1.filter(|v| non_empty(v)) {
            return Self::new(v, SettingSource::Flag(flag.0));
        }
        if let Some(v) = env(env_var).filter(|v| non_empty(v)) {
            return Self::new(&v, SettingSource::EnvVar(env_var));
        }
        if let Some(v) = file.filter(|v| non_empty(v)) {
            return Self::new(v, SettingSource::ConfigFile);
        }
        Self {
            value: None,
            source: SettingSource::Missing,
        }
    }

    fn new(value: &str, source: SettingSource) -> Self {
        Self {
            value: Some(value.trim().to_string()),
            source,
        }
    }

    pub(crate) fn get(&self) -> Option<&str> {
        self.value.as_deref()
    }

    fn require(&self, what: &str, env_var: &str) -> Result<&str, CliError> {
        self.get().ok_or_else(|| {
            CliError::config(format!(
                "Missing {}. Set {} or add it to the config file",
                what, env_var
            ))
        })
    }
}

/// TOML config file format.
#[derive(Debug, Default, Deserialize, Serialize)]
pub(crate) struct ConfigFile {
    pub jellyfin: Option<JellyfinSection>,
    pub tmdb: Option<TmdbSection>,
    pub jellyseerr: Option<JellyseerrSection>,
    pub run: Option<RunSection>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub(crate) struct JellyfinSection {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub(crate) struct TmdbSection {
    pub api_key: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub(crate) struct JellyseerrSection {
    pub url: Option<String>,
    pub api_key: Option<String>,
}

/// Engine tunables. The dry-run default can only be lifted with `--apply`.
#[derive(Debug, Default, Deserialize, Serialize)]
pub(crate) struct RunSection {
    pub catalog: Option<String>,
    pub forward: Option<String>,
    pub min_collection_size: Option<usize>,
    pub min_owned_members: Option<usize>,
    pub lookup_concurrency: Option<usize>,
    pub skip_unreleased: Option<bool>,
    pub snapshot_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
}

/// Return the path to the default config file.
pub(crate) fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("boxsmith").join("config.toml"))
}

/// Read the config file. A missing file is `None`; an unreadable or
/// malformed one is an error.
pub(crate) fn load_config_file(path: Option<&Path>) -> Result<Option<ConfigFile>, CliError> {
    let Some(path) = path.map(Path::to_path_buf).or_else(config_path) else {
        return Ok(None);
    };
    let contents = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let file = toml::from_str(&contents)
        .map_err(|e| CliError::config(format!("{}: {}", path.display(), e)))?;
    log::debug!("Loaded config file {}", path.display());
    Ok(Some(file))
}

/// Service endpoints and credentials with their provenance.
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub jellyfin_url: Setting,
    pub jellyfin_api_key: Setting,
    pub jellyfin_user_id: Setting,
    pub tmdb_api_key: Setting,
    pub jellyseerr_url: Setting,
    pub jellyseerr_api_key: Setting,
}

impl Settings {
    pub(crate) fn resolve(
        args: &RunArgs,
        file: Option<&ConfigFile>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let jf = file.and_then(|f| f.jellyfin.as_ref());
        let tmdb = file.and_then(|f| f.tmdb.as_ref());
        let seerr = file.and_then(|f| f.jellyseerr.as_ref());

        Self {
            jellyfin_url: Setting::resolve(
                ("jellyfin-url", args.jellyfin_url.as_deref()),
                ENV_JELLYFIN_URL,
                &env,
                jf.and_then(|s| s.url.as_deref()),
            ),
            jellyfin_api_key: Setting::resolve(
                ("", None),
                ENV_JELLYFIN_API_KEY,
                &env,
                jf.and_then(|s| s.api_key.as_deref()),
            ),
            jellyfin_user_id: Setting::resolve(
                ("jellyfin-user", args.jellyfin_user.as_deref()),
                ENV_JELLYFIN_USER_ID,
                &env,
                jf.and_then(|s| s.user_id.as_deref()),
            ),
            tmdb_api_key: Setting::resolve(
                ("", None),
                ENV_TMDB_API_KEY,
                &env,
                tmdb.and_then(|s| s.api_key.as_deref()),
            ),
            jellyseerr_url: Setting::resolve(
                ("jellyseerr-url", args.jellyseerr_url.as_deref()),
                ENV_JELLYSEERR_URL,
                &env,
                seerr.and_then(|s| s.url.as_deref()),
            ),
            jellyseerr_api_key: Setting::resolve(
                ("", None),
                ENV_JELLYSEERR_API_KEY,
                &env,
                seerr.and_then(|s| s.api_key.as_deref()),
            ),
        }
    }

    /// Everything the chosen modes need must be present before anything
    /// touches the network.
    pub(crate) fn validate(&self, config: &RunConfig) -> Result<(), CliError> {
        self.jellyfin_url.require("Jellyfin URL", ENV_JELLYFIN_URL)?;
        self.jellyfin_api_key
            .require("Jellyfin API key", ENV_JELLYFIN_API_KEY)?;
        if config.catalog == CatalogMode::Live {
            self.tmdb_api_key.require("TMDb API key", ENV_TMDB_API_KEY)?;
        }
        if config.forward != ForwardMode::Disabled {
            self.jellyseerr_url
                .require("Jellyseerr URL", ENV_JELLYSEERR_URL)?;
            self.jellyseerr_api_key
                .require("Jellyseerr API key", ENV_JELLYSEERR_API_KEY)?;
        }
        Ok(())
    }

    /// `(name, setting, is_secret)` rows for `config show`.
    pub(crate) fn rows(&self) -> [(&'static str, &Setting, bool); 6] {
        [
            ("jellyfin.url", &self.jellyfin_url, false),
            ("jellyfin.api_key", &self.jellyfin_api_key, true),
            ("jellyfin.user_id", &self.jellyfin_user_id, false),
            ("tmdb.api_key", &self.tmdb_api_key, true),
            ("jellyseerr.url", &self.jellyseerr_url, false),
            ("jellyseerr.api_key", &self.jellyseerr_api_key, true),
        ]
    }
}

/// Build the run configuration from flags and the `[run]` section.
pub(crate) fn run_config(args: &RunArgs, file: Option<&ConfigFile>) -> Result<RunConfig, CliError> {
    let section = file.and_then(|f| f.run.as_ref());
    let mut config = RunConfig {
        dry_run: !args.apply,
        ..RunConfig::default()
    };

    if args.online {
        config.catalog = CatalogMode::Live;
    } else if let Some(mode) = section.and_then(|s| s.catalog.as_deref()) {
        config.catalog = mode.parse().map_err(|e| CliError::config(format!("{e}")))?;
    }

    if let Some(mode) = args.forward {
        config.forward = mode;
    } else if let Some(mode) = section.and_then(|s| s.forward.as_deref()) {
        config.forward = mode.parse().map_err(|e| CliError::config(format!("{e}")))?;
    }

    if let Some(s) = section {
        if let Some(n) = s.min_collection_size {
            config.min_collection_size = n;
        }
        if let Some(n) = s.min_owned_members {
            config.min_owned_members = n;
        }
        if let Some(n) = s.lookup_concurrency {
            if n == 0 {
                return Err(CliError::config("lookup_concurrency must be at least 1"));
            }
            config.lookup_concurrency = n;
        }
        if let Some(skip) = s.skip_unreleased {
            config.skip_unreleased = skip;
        }
    }
    Ok(config)
}

pub(crate) fn snapshot_dir(args: &RunArgs, file: Option<&ConfigFile>) -> PathBuf {
    args.snapshot_dir
        .clone()
        .or_else(|| file.and_then(|f| f.run.as_ref()?.snapshot_dir.clone()))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT_DIR))
}

pub(crate) fn log_dir(args: &RunArgs, file: Option<&ConfigFile>) -> PathBuf {
    args.log_dir
        .clone()
        .or_else(|| file.and_then(|f| f.run.as_ref()?.log_dir.clone()))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR))
}

pub(crate) fn tmdb_language(file: Option<&ConfigFile>) -> Option<String> {
    file.and_then(|f| f.tmdb.as_ref()?.language.clone())
}

pub(crate) fn mask_value(s: &str) -> String {
    let prefix: String = s.chars().take(2).collect();
    if s.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{}****", prefix)
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
