//! Configuration for the signing gateway server.
//!
//! A small CLI surface (`clap`, `--config`/`$CONFIG`) selects a JSON file,
//! and fields not present in that file fall back to `serde(default = ...)`
//! constants.
//! Secrets support a literal-or-env-var form so they never need to live in
//! the file on disk.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::IpAddr;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// CLI arguments for the signing gateway server.
#[derive(Parser, Debug)]
#[command(name = "signer-gateway")]
#[command(about = "Remote signing gateway for L2 operator workloads")]
struct CliArgs {
    /// Path to the JSON configuration file.
    #[arg(long, short, env = "CONFIG", default_value = "config.json")]
    config: PathBuf,
}

/// A literal value, or a `$VAR` / `${VAR}` reference resolved against the
/// process environment at deserialization time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralOrEnv<T>(T);

impl<T> LiteralOrEnv<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for LiteralOrEnv<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> LiteralOrEnv<T> {
    fn parse_env_var_syntax(s: &str) -> Option<String> {
        if let Some(inner) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
            Some(inner.to_string())
        } else if let Some(var_name) = s.strip_prefix('$') {
            if !var_name.is_empty() && var_name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                Some(var_name.to_string())
            } else {
                None
            }
        } else {
            None
        }
    }
}

impl<'de, T> Deserialize<'de> for LiteralOrEnv<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let resolved = match Self::parse_env_var_syntax(&s) {
            Some(var_name) => std::env::var(&var_name).map_err(|_| {
                serde::de::Error::custom(format!(
                    "environment variable '{var_name}' not found (referenced as '{s}')"
                ))
            })?,
            None => s,
        };
        let parsed = resolved
            .parse::<T>()
            .map_err(|e| serde::de::Error::custom(format!("failed to parse value: {e}")))?;
        Ok(LiteralOrEnv(parsed))
    }
}

/// Top-level gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api_key_plane: ApiKeyPlaneConfig,
    pub mtls_plane: MtlsPlaneConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    pub backend: BackendConfig,
    pub stores: StoresConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeyPlaneConfig {
    #[serde(default = "defaults::api_key_host")]
    pub host: IpAddr,
    #[serde(default = "defaults::api_key_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MtlsPlaneConfig {
    #[serde(default = "defaults::mtls_enabled")]
    pub enabled: bool,
    #[serde(default = "defaults::mtls_host")]
    pub host: IpAddr,
    #[serde(default = "defaults::mtls_port")]
    pub port: u16,
    pub server_cert_path: PathBuf,
    pub server_key_path: PathBuf,
    pub ca_cert_path: PathBuf,
    #[serde(default)]
    pub client_auth_mode: ClientAuthMode,
}

/// mTLS client-auth mode (spec §4.6). The documented default is
/// `RequireAndVerify`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClientAuthMode {
    None,
    Request,
    RequireAny,
    VerifyIfGiven,
    #[default]
    RequireAndVerify,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "defaults::rate_limit_rps")]
    pub rps: u32,
    #[serde(default = "defaults::rate_limit_burst")]
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            rps: defaults::rate_limit_rps(),
            burst: defaults::rate_limit_burst(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutsConfig {
    #[serde(default = "defaults::request_timeout_secs")]
    pub request_secs: u64,
    #[serde(default = "defaults::backend_timeout_secs")]
    pub backend_secs: u64,
}

impl TimeoutsConfig {
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    pub fn backend(&self) -> Duration {
        Duration::from_secs(self.backend_secs)
    }
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            request_secs: defaults::request_timeout_secs(),
            backend_secs: defaults::backend_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub address: url::Url,
    pub credential: LiteralOrEnvString,
}

/// Type alias keeping config field declarations readable.
pub type LiteralOrEnvString = LiteralOrEnv<String>;

#[derive(Debug, Clone, Deserialize)]
pub struct StoresConfig {
    pub relational_dsn: LiteralOrEnvString,
    pub rate_limit_kv_dsn: LiteralOrEnvString,
}

mod defaults {
    use std::net::IpAddr;

    pub fn api_key_host() -> IpAddr {
        "0.0.0.0".parse().unwrap()
    }
    pub fn api_key_port() -> u16 {
        8545
    }
    pub fn mtls_enabled() -> bool {
        true
    }
    pub fn mtls_host() -> IpAddr {
        "0.0.0.0".parse().unwrap()
    }
    pub fn mtls_port() -> u16 {
        8546
    }
    pub fn rate_limit_rps() -> u32 {
        10
    }
    pub fn rate_limit_burst() -> u32 {
        20
    }
    pub fn request_timeout_secs() -> u64 {
        30
    }
    pub fn backend_timeout_secs() -> u64 {
        30
    }
}

/// Configuration load errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file at {0}: {1}")]
    FileRead(PathBuf, std::io::Error),
    #[error("failed to parse config file: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl Config {
    /// Loads configuration from the `--config`/`$CONFIG` path.
    pub fn load() -> Result<Self, ConfigError> {
        let cli_args = CliArgs::parse();
        let config_path = Path::new(&cli_args.config)
            .canonicalize()
            .map_err(|e| ConfigError::FileRead(cli_args.config, e))?;
        Self::load_from_path(config_path)
    }

    fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(&path).map_err(|e| ConfigError::FileRead(path, e))?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_or_env_resolves_literal() {
        let v: LiteralOrEnv<u16> = serde_json::from_str("\"8080\"").unwrap();
        assert_eq!(v.into_inner(), 8080);
    }

    #[test]
    fn literal_or_env_resolves_env_var() {
        unsafe {
            std::env::set_var("SIGNER_GATEWAY_TEST_PORT", "9090");
        }
        let v: LiteralOrEnv<u16> = serde_json::from_str("\"$SIGNER_GATEWAY_TEST_PORT\"").unwrap();
        assert_eq!(v.into_inner(), 9090);
    }

    #[test]
    fn client_auth_mode_default_is_require_and_verify() {
        assert_eq!(ClientAuthMode::default(), ClientAuthMode::RequireAndVerify);
    }
}
