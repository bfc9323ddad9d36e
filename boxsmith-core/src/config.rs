use std::fmt;
use std::str::FromStr;

use crate::retry::RetryPolicy;

/// Where canonical collection membership comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CatalogMode {
    /// Live catalog lookups (rate limited, cached).
    Live,
    /// The bundled snapshot dataset; no network, no artwork.
    #[default]
    Snapshot,
}

/// How aggressively missing titles are forwarded to the request service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForwardMode {
    #[default]
    Disabled,
    /// Look up existing requests but never create one.
    CheckOnly,
    /// Check, then create requests for eligible titles.
    Send,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}' (expected one of: {expected})")]
pub struct ModeParseError {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

impl FromStr for CatalogMode {
    type Err = ModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "live" | "online" | "tmdb" => Ok(Self::Live),
            "snapshot" | "offline" => Ok(Self::Snapshot),
            _ => Err(ModeParseError {
                kind: "catalog mode",
                value: s.to_string(),
                expected: "live, snapshot",
            }),
        }
    }
}

impl fmt::Display for CatalogMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live => write!(f, "live"),
            Self::Snapshot => write!(f, "snapshot"),
        }
    }
}

impl FromStr for ForwardMode {
    type Err = ModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "disabled" | "off" | "none" => Ok(Self::Disabled),
            "check" | "check-only" | "check_only" => Ok(Self::CheckOnly),
            "send" => Ok(Self::Send),
            _ => Err(ModeParseError {
                kind: "forward mode",
                value: s.to_string(),
                expected: "disabled, check, send",
            }),
        }
    }
}

impl fmt::Display for ForwardMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "disabled"),
            Self::CheckOnly => write!(f, "check"),
            Self::Send => write!(f, "send"),
        }
    }
}

/// Fully resolved configuration for one run.
///
/// Built once by the caller and passed by reference into every stage; the
/// engine never reads the environment or prompts for anything itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Compute and report everything, mutate nothing.
    pub dry_run: bool,
    pub catalog: CatalogMode,
    pub forward: ForwardMode,
    /// Collections with fewer canonical members than this are not grouped.
    pub min_collection_size: usize,
    /// Collections with fewer library members than this are not grouped.
    pub min_owned_members: usize,
    /// Concurrent per-item lookups (all still pass the same rate limiter).
    pub lookup_concurrency: usize,
    /// Do not report canonical members released after the current year.
    pub skip_unreleased: bool,
    /// Backoff for mutating and request-service calls.
    pub retry: RetryPolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            dry_run: true,
            catalog: CatalogMode::default(),
            forward: ForwardMode::default(),
            min_collection_size: 2,
            min_owned_members: 1,
            lookup_concurrency: 4,
            skip_unreleased: true,
            retry: RetryPolicy::default(),
        }
    }
}

impl RunConfig {
    /// The forward mode actually used: a dry run never creates requests.
    pub fn effective_forward(&self) -> ForwardMode {
        match (self.forward, self.dry_run) {
            (ForwardMode::Send, true) => ForwardMode::CheckOnly,
            (mode, _) => mode,
        }
    }

    /// Artwork is only fetched when the catalog can supply it.
    pub fn applies_artwork(&self) -> bool {
        self.catalog == CatalogMode::Live
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_conservative() {
        let config = RunConfig::default();
        assert!(config.dry_run);
        assert_eq!(config.catalog, CatalogMode::Snapshot);
        assert_eq!(config.forward, ForwardMode::Disabled);
    }

    #[test]
    fn test_dry_run_downgrades_send() {
        let config = RunConfig {
            forward: ForwardMode::Send,
            ..RunConfig::default()
        };
        assert_eq!(config.effective_forward(), ForwardMode::CheckOnly);

        let live = RunConfig {
            dry_run: false,
            ..config
        };
        assert_eq!(live.effective_forward(), ForwardMode::Send);
    }

    #[test]
    fn test_parse_modes() {
        assert_eq!("online".parse::<CatalogMode>(), Ok(CatalogMode::Live));
        assert_eq!("Offline".parse::<CatalogMode>(), Ok(CatalogMode::Snapshot));
        assert_eq!("check".parse::<ForwardMode>(), Ok(ForwardMode::CheckOnly));
        assert_eq!("SEND".parse::<ForwardMode>(), Ok(ForwardMode::Send));
        let err = "loud".parse::<ForwardMode>().unwrap_err();
        assert!(err.to_string().contains("disabled, check, send"));
    }
}
