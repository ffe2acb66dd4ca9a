//! `cutover.toml` and the settings resolved from it.
//!
//! # Example
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//!
//! [store]
//! path = ".cutover/store.json"
//!
//! [fixtures]
//! dir = "fixtures/hotel-sys-api"
//! ```
//!
//! Every key is optional. A missing `[store] path` means an in-memory store;
//! a missing `[fixtures] dir` means the fixtures compiled into the binary.
//! Command-line flags beat `CUTOVER_*` environment variables, which beat the
//! file, which beats the defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

pub(crate) const DEFAULT_CONFIG_FILE: &str = "cutover.toml";
pub(crate) const DEFAULT_HOST: &str = "0.0.0.0";
pub(crate) const DEFAULT_PORT: u16 = 8080;

// ── File format ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ConfigFile {
    #[serde(default)]
    pub(crate) server: ServerSection,
    #[serde(default)]
    pub(crate) store: StoreSection,
    #[serde(default)]
    pub(crate) fixtures: FixturesSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ServerSection {
    pub(crate) host: Option<String>,
    pub(crate) port: Option<u16>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct StoreSection {
    pub(crate) path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct FixturesSection {
    pub(crate) dir: Option<PathBuf>,
}

/// Read and parse a config file. Returns a human-readable error string.
pub(crate) fn read_config_file(path: &Path) -> Result<ConfigFile, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;
    toml::from_str(&content).map_err(|e| format!("could not parse '{}': {}", path.display(), e))
}

/// The explicit `--config` file, which must exist, or `./cutover.toml` when
/// present, or an empty config.
pub(crate) fn load_config_file(explicit: Option<&Path>) -> Result<ConfigFile, String> {
    match explicit {
        Some(path) => read_config_file(path),
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if default.is_file() {
                read_config_file(default)
            } else {
                Ok(ConfigFile::default())
            }
        }
    }
}

// ── Resolution ────────────────────────────────────────────────────────────────

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub(crate) struct Overrides {
    pub(crate) host: Option<String>,
    pub(crate) port: Option<u16>,
    pub(crate) store: Option<PathBuf>,
    pub(crate) fixtures: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Settings {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) store: Option<PathBuf>,
    pub(crate) fixtures: Option<PathBuf>,
}

impl Settings {
    /// Merge the layers. `env` looks up an environment variable by name.
    pub(crate) fn resolve<E>(file: ConfigFile, env: E, cli: Overrides) -> Result<Settings, String>
    where
        E: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| env(name).filter(|v| !v.is_empty());

        let env_port = match lookup("CUTOVER_PORT") {
            Some(raw) => Some(
                raw.parse::<u16>()
                    .map_err(|_| format!("CUTOVER_PORT is not a valid port: '{}'", raw))?,
            ),
            None => None,
        };

        Ok(Settings {
            host: cli
                .host
                .or_else(|| lookup("CUTOVER_HOST"))
                .or(file.server.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: cli.port.or(env_port).or(file.server.port).unwrap_or(DEFAULT_PORT),
            store: cli
                .store
                .or_else(|| lookup("CUTOVER_STORE").map(PathBuf::from))
                .or(file.store.path),
            fixtures: cli
                .fixtures
                .or_else(|| lookup("CUTOVER_FIXTURES").map(PathBuf::from))
                .or(file.fixtures.dir),
        })
    }

    /// Load the config file and resolve against the process environment.
    pub(crate) fn load(config: Option<&Path>, cli: Overrides) -> Result<Settings, String> {
        let file = load_config_file(config)?;
        Self::resolve(file, |name| std::env::var(name).ok(), cli)
    }
}
