//! Configuration System
//!
//! TOML configuration with environment variable overrides.
//!
//! # Configuration File Locations
//!
//! Configuration files are searched in order (first found wins):
//! 1. `./entail.toml` - Project-local configuration
//! 2. `~/.config/entail/config.toml` - User configuration (XDG)
//! 3. `~/.entail/config.toml` - User configuration (legacy)
//! 4. `/etc/entail/config.toml` - System-wide configuration
//!
//! # Environment Variables
//!
//! - `ENTAIL_MAX_DECISIONS` - Solver decision budget per check
//! - `ENTAIL_TIMEOUT_SECS` - Solver wall-clock budget (0 = unlimited)
//! - `ENTAIL_DEFAULT_ARITY` - Arity for bare relation names
//! - `ENTAIL_CACHE` - Enable the verdict cache (true/false)
//! - `ENTAIL_CACHE_PATH` - Cache database path
//! - `ENTAIL_SERVER_PORT` - HTTP server port
//! - `ENTAIL_SERVER_HOST` - HTTP server host
//!
//! # Example Configuration
//!
//! ```toml
//! # entail.toml
//!
//! [solver]
//! max_decisions = 100000
//! timeout_secs = 10
//! default_arity = 1
//!
//! [cache]
//! enabled = true
//! path = "./entail-cache.db"
//!
//! [server]
//! port = 8080
//! host = "0.0.0.0"
//! cors_enabled = true
//! ```

use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EntailError, EntailResult};
use crate::solver::SolverLimits;

// ============================================================================
// Configuration Schema
// ============================================================================

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EntailConfig {
    /// Solver budgets and inference defaults
    pub solver: SolverConfig,
    /// Verdict cache settings
    pub cache: CacheConfig,
    /// HTTP server settings
    pub server: ServerConfig,
}

/// Solver configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Branching decisions before a check gives up
    pub max_decisions: u64,
    /// Wall-clock budget per check in seconds (0 = unlimited)
    pub timeout_secs: u64,
    /// Arity assumed for relation names never seen applied
    pub default_arity: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self { max_decisions: 100_000, timeout_secs: 10, default_arity: 1 }
    }
}

impl SolverConfig {
    pub fn limits(&self) -> SolverLimits {
        SolverLimits {
            max_decisions: self.max_decisions,
            timeout: if self.timeout_secs == 0 { None } else { Some(Duration::from_secs(self.timeout_secs)) },
        }
    }
}

/// Verdict cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable the durable verdict cache
    pub enabled: bool,
    /// Cache database path
    pub path: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true, path: PathBuf::from("./entail-cache.db") }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,
    /// Server host
    pub host: String,
    /// Enable CORS
    pub cors_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080, host: "0.0.0.0".to_string(), cors_enabled: true }
    }
}

// ============================================================================
// Configuration Loading
// ============================================================================

impl EntailConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from default locations, then apply environment
    /// variable overrides.
    pub fn load() -> EntailResult<Self> {
        let mut config = Self::default();

        for path in Self::config_paths() {
            if path.exists() {
                config = Self::load_from_file(&path)?;
                break;
            }
        }

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &PathBuf) -> EntailResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| EntailError::config(format!("cannot read {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| EntailError::config(format!("cannot parse {}: {}", path.display(), e)))
    }

    /// Load configuration from a TOML string
    pub fn load_from_str(content: &str) -> EntailResult<Self> {
        toml::from_str(content).map_err(|e| EntailError::config(format!("cannot parse config: {}", e)))
    }

    /// Get the list of config file search paths
    pub fn config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // Project-local
        paths.push(PathBuf::from("./entail.toml"));

        // XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("entail").join("config.toml"));
        }

        // Legacy home directory
        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".entail").join("config.toml"));
        }

        // System-wide (Unix only)
        #[cfg(unix)]
        paths.push(PathBuf::from("/etc/entail/config.toml"));

        paths
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("ENTAIL_MAX_DECISIONS") {
            if let Ok(decisions) = val.parse::<u64>() {
                self.solver.max_decisions = decisions;
            }
        }

        if let Ok(val) = env::var("ENTAIL_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse::<u64>() {
                self.solver.timeout_secs = secs;
            }
        }

        if let Ok(val) = env::var("ENTAIL_DEFAULT_ARITY") {
            if let Ok(arity) = val.parse::<usize>() {
                self.solver.default_arity = arity;
            }
        }

        if let Ok(val) = env::var("ENTAIL_CACHE") {
            self.cache.enabled = val == "true" || val == "1" || val == "yes";
        }

        if let Ok(val) = env::var("ENTAIL_CACHE_PATH") {
            self.cache.path = PathBuf::from(val);
        }

        if let Ok(val) = env::var("ENTAIL_SERVER_PORT") {
            if let Ok(port) = val.parse::<u16>() {
                self.server.port = port;
            }
        }

        if let Ok(val) = env::var("ENTAIL_SERVER_HOST") {
            self.server.host = val;
        }
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> EntailResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| EntailError::config(format!("cannot serialize config: {}", e)))
    }

    /// Generate a default configuration file content
    pub fn default_config_content() -> &'static str {
        r#"# Entail Configuration File

[solver]
# Branching decisions before a check gives up
max_decisions = 100000
# Wall-clock budget per check in seconds (0 = unlimited)
timeout_secs = 10
# Arity assumed for relation names never seen applied
default_arity = 1

[cache]
# Enable the durable verdict cache
enabled = true
# Cache database path
path = "./entail-cache.db"

[server]
# HTTP server port
port = 8080
# Server host
host = "0.0.0.0"
# Enable CORS for browser access
cors_enabled = true
"#
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EntailConfig::new();
        assert_eq!(config.solver.max_decisions, 100_000);
        assert_eq!(config.solver.default_arity, 1);
        assert_eq!(config.server.port, 8080);
        assert!(config.cache.enabled);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [solver]
            max_decisions = 5000
            timeout_secs = 2

            [cache]
            enabled = false

            [server]
            port = 9000
        "#;

        let config = EntailConfig::load_from_str(toml).unwrap();
        assert_eq!(config.solver.max_decisions, 5000);
        assert_eq!(config.solver.timeout_secs, 2);
        assert!(!config.cache.enabled);
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = EntailConfig::load_from_str("[server]\nport = 1234\n").unwrap();
        assert_eq!(config.server.port, 1234);
        assert_eq!(config.solver.max_decisions, 100_000);
        assert!(config.cache.enabled);
    }

    #[test]
    fn test_zero_timeout_means_unlimited() {
        let config = EntailConfig::load_from_str("[solver]\ntimeout_secs = 0\n").unwrap();
        assert_eq!(config.solver.limits().timeout, None);
    }

    #[test]
    fn test_serialize_config() {
        let config = EntailConfig::new();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[solver]"));
        assert!(toml.contains("[cache]"));
        assert!(toml.contains("[server]"));
    }

    #[test]
    fn test_config_paths() {
        let paths = EntailConfig::config_paths();
        assert!(!paths.is_empty());
        assert!(paths[0].ends_with("entail.toml"));
    }

    #[test]
    fn test_default_content_parses() {
        let config = EntailConfig::load_from_str(EntailConfig::default_config_content()).unwrap();
        assert_eq!(config.solver.default_arity, 1);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = EntailConfig::load_from_str("[solver\nmax").unwrap_err();
        assert!(err.to_string().contains("cannot parse"));
    }
}
