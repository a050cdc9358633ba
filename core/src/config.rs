//! Session configuration.
//!
//! `ConfigFile` is the loose, serde-facing shape (JSON file plus CLI
//! overrides, every field optional). `SimulationConfig` is the resolved,
//! immutable value the controller consumes. Resolution never touches the
//! network, so every error here is raised before a server connection exists.

use crate::{
    agent::AgentSpec,
    error::{SimError, SimResult},
    time_stepping::TimeSteppingMode,
};
use serde::{Deserialize, Serialize};
use std::{fmt, path::Path, str::FromStr, time::Duration};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 2000;
pub const DEFAULT_TIMEOUT_SECS: f64 = 10.0;
pub const DEFAULT_MAP: &str = "Town10HD_Opt";
pub const DEFAULT_RES: &str = "1280x720";
pub const DEFAULT_FIXED_STEP: f64 = 0.05;

/// Cruising speed handed to the Basic agent, km/h.
pub const BASIC_TARGET_SPEED: f64 = 30.0;

// ── Typed values ───────────────────────────────────────────────────

/// Display size parsed from `"<W>x<H>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width:  u32,
    pub height: u32,
}

impl FromStr for Resolution {
    type Err = SimError;

    fn from_str(s: &str) -> SimResult<Self> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| SimError::config(format!("resolution '{s}' is not <W>x<H>")))?;
        let parse = |part: &str| -> SimResult<u32> {
            match part.trim().parse::<u32>() {
                Ok(v) if v > 0 => Ok(v),
                _ => Err(SimError::config(format!(
                    "resolution '{s}': '{part}' is not a positive integer"
                ))),
            }
        };
        Ok(Self { width: parse(w)?, height: parse(h)? })
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Where the simulation server lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host:    String,
    pub port:    u16,
    pub timeout: Duration,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// The fixed set of navigation strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentKind {
    Basic,
    Behavior,
}

impl FromStr for AgentKind {
    type Err = SimError;

    fn from_str(s: &str) -> SimResult<Self> {
        match s {
            "Basic"    => Ok(Self::Basic),
            "Behavior" => Ok(Self::Behavior),
            other => Err(SimError::config(format!(
                "unknown agent kind '{other}' (expected Basic or Behavior)"
            ))),
        }
    }
}

/// Named driving style for the Behavior agent. What each profile means
/// is up to the agent implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorProfile {
    Cautious,
    Normal,
    Aggressive,
}

impl BehaviorProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cautious   => "cautious",
            Self::Normal     => "normal",
            Self::Aggressive => "aggressive",
        }
    }
}

impl FromStr for BehaviorProfile {
    type Err = SimError;

    fn from_str(s: &str) -> SimResult<Self> {
        match s {
            "cautious"   => Ok(Self::Cautious),
            "normal"     => Ok(Self::Normal),
            "aggressive" => Ok(Self::Aggressive),
            other => Err(SimError::config(format!(
                "unknown behavior profile '{other}' (expected cautious, normal or aggressive)"
            ))),
        }
    }
}

// ── File / CLI shape ───────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub host:         Option<String>,
    pub port:         Option<u16>,
    pub timeout_secs: Option<f64>,
    pub map:          Option<String>,
    pub res:          Option<String>,
    pub seed:         Option<u64>,
    pub sync:         Option<bool>,
    pub fixed_step:   Option<f64>,
    pub agent:        Option<String>,
    pub behavior:     Option<String>,
    pub debug:        Option<bool>,
}

impl ConfigFile {
    /// Load from a JSON file. Missing fields fall back to defaults at resolve time.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
        let file: ConfigFile = serde_json::from_str(&content)?;
        Ok(file)
    }

    /// Layer `overrides` on top of self. Fields set in `overrides` win.
    pub fn merge(self, overrides: ConfigFile) -> Self {
        Self {
            host:         overrides.host.or(self.host),
            port:         overrides.port.or(self.port),
            timeout_secs: overrides.timeout_secs.or(self.timeout_secs),
            map:          overrides.map.or(self.map),
            res:          overrides.res.or(self.res),
            seed:         overrides.seed.or(self.seed),
            sync:         overrides.sync.or(self.sync),
            fixed_step:   overrides.fixed_step.or(self.fixed_step),
            agent:        overrides.agent.or(self.agent),
            behavior:     overrides.behavior.or(self.behavior),
            debug:        overrides.debug.or(self.debug),
        }
    }

    /// Validate and freeze into a `SimulationConfig`.
    pub fn resolve(&self) -> SimResult<SimulationConfig> {
        let resolution: Resolution = self.res.as_deref().unwrap_or(DEFAULT_RES).parse()?;

        let host = self.host.clone().unwrap_or_else(|| DEFAULT_HOST.to_string());
        if host.trim().is_empty() {
            return Err(SimError::config("host must not be empty"));
        }
        let map = self.map.clone().unwrap_or_else(|| DEFAULT_MAP.to_string());
        if map.trim().is_empty() {
            return Err(SimError::config("map must not be empty"));
        }

        let timeout_secs = self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if !timeout_secs.is_finite() || timeout_secs <= 0.0 {
            return Err(SimError::config(format!(
                "timeout must be a positive number of seconds, got {timeout_secs}"
            )));
        }

        let time_stepping = if self.sync.unwrap_or(false) {
            let step = self.fixed_step.unwrap_or(DEFAULT_FIXED_STEP);
            if !step.is_finite() || step <= 0.0 {
                return Err(SimError::config(format!(
                    "fixed_step must be positive in synchronous mode, got {step}"
                )));
            }
            TimeSteppingMode::Synchronous { fixed_delta: step }
        } else {
            TimeSteppingMode::Asynchronous
        };

        let kind: AgentKind = self.agent.as_deref().unwrap_or("Behavior").parse()?;
        // The profile is only read for Behavior agents.
        let agent = match kind {
            AgentKind::Basic => AgentSpec::basic(),
            AgentKind::Behavior => AgentSpec::Behavior {
                profile: self.behavior.as_deref().unwrap_or("normal").parse()?,
            },
        };

        Ok(SimulationConfig {
            endpoint: Endpoint {
                host,
                port: self.port.unwrap_or(DEFAULT_PORT),
                timeout: Duration::from_secs_f64(timeout_secs),
            },
            map,
            resolution,
            seed: self.seed,
            time_stepping,
            agent,
            debug: self.debug.unwrap_or(false),
        })
    }
}

// ── Resolved config ────────────────────────────────────────────────

/// Immutable session configuration. Time-stepping mode is fixed for the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationConfig {
    pub endpoint:      Endpoint,
    pub map:           String,
    pub resolution:    Resolution,
    pub seed:          Option<u64>,
    pub time_stepping: TimeSteppingMode,
    pub agent:         AgentSpec,
    pub debug:         bool,
}

impl SimulationConfig {
    /// Config with hardcoded values for use in tests.
    pub fn default_test() -> Self {
        ConfigFile {
            host:       Some("localhost".into()),
            port:       Some(2000),
            map:        Some("Town01".into()),
            res:        Some("800x600".into()),
            seed:       Some(42),
            sync:       Some(true),
            fixed_step: Some(0.05),
            agent:      Some("Basic".into()),
            ..ConfigFile::default()
        }
        .resolve()
        .expect("test config is valid")
    }
}
