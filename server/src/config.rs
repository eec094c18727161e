//! Process configuration from `CARVIEW_*` environment variables

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Deployment environment, selects the log format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Local,
    Dev,
    Prod,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Environment::Local),
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            other => Err(format!("expected local, dev or prod, got {:?}", other)),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Environment::Local => "local",
            Environment::Dev => "dev",
            Environment::Prod => "prod",
        })
    }
}

/// Which catalog implementation serves reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Snapshot kept in memory, refreshed on a timer
    Memory,
    /// Read-through to the origin with a TTL cache
    Remote,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Backend::Memory),
            "remote" => Ok(Backend::Remote),
            other => Err(format!("expected memory or remote, got {:?}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub env: Environment,
    pub listen_addr: SocketAddr,
    pub origin_url: String,
    pub media_url: Option<String>,
    pub backend: Backend,
    /// Per-call timeout of the origin HTTP client
    pub client_timeout: Duration,
    /// Deadline for the catalog calls of one inbound request
    pub request_timeout: Duration,
    pub startup_timeout: Duration,
    pub refresh_interval: Duration,
    pub refresh_timeout: Duration,
    pub cache_ttl: Duration,
    pub cache_sweep_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. Unset or blank keys take their
    /// default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let client_timeout = duration(&get, "CARVIEW_CLIENT_TIMEOUT", Duration::from_secs(5))?;

        Ok(Self {
            env: parsed(&get, "CARVIEW_ENV", Environment::Local)?,
            listen_addr: parsed(&get, "CARVIEW_LISTEN_ADDR", SocketAddr::from(([127, 0, 0, 1], 8080)))?,
            origin_url: get("CARVIEW_ORIGIN_URL").unwrap_or_else(|| "http://127.0.0.1:3000/api".to_string()),
            media_url: get("CARVIEW_MEDIA_URL"),
            backend: parsed(&get, "CARVIEW_BACKEND", Backend::Memory)?,
            client_timeout,
            request_timeout: duration(&get, "CARVIEW_REQUEST_TIMEOUT", Duration::from_secs(5))?,
            startup_timeout: duration(&get, "CARVIEW_STARTUP_TIMEOUT", Duration::from_secs(15))?,
            refresh_interval: duration(&get, "CARVIEW_REFRESH_INTERVAL", Duration::from_secs(5 * 60))?,
            refresh_timeout: duration(&get, "CARVIEW_REFRESH_TIMEOUT", client_timeout.saturating_mul(3))?,
            cache_ttl: duration(&get, "CARVIEW_CACHE_TTL", Duration::from_secs(10 * 60))?,
            cache_sweep_interval: duration(&get, "CARVIEW_CACHE_SWEEP_INTERVAL", Duration::from_secs(60))?,
        })
    }
}

fn parsed<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

fn duration<G>(get: &G, key: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let value = parsed::<humantime::Duration, _>(get, key, default.into())?;
    let value: Duration = value.into();
    if value.is_zero() {
        return Err(ConfigError::Invalid {
            key,
            value: "0s".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.env, Environment::Local);
        assert_eq!(config.backend, Backend::Memory);
        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.media_url, None);
        assert_eq!(config.startup_timeout, Duration::from_secs(15));
        assert_eq!(config.cache_ttl, Duration::from_secs(600));
        assert_eq!(config.refresh_timeout, config.client_timeout * 3);
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("CARVIEW_ENV", "Prod"),
            ("CARVIEW_BACKEND", "remote"),
            ("CARVIEW_LISTEN_ADDR", "0.0.0.0:9000"),
            ("CARVIEW_MEDIA_URL", "http://media.test/img"),
            ("CARVIEW_CLIENT_TIMEOUT", "2s"),
            ("CARVIEW_REFRESH_INTERVAL", "1m 30s"),
        ])
        .unwrap();

        assert_eq!(config.env, Environment::Prod);
        assert_eq!(config.backend, Backend::Remote);
        assert_eq!(config.listen_addr.to_string(), "0.0.0.0:9000");
        assert_eq!(config.media_url.as_deref(), Some("http://media.test/img"));
        assert_eq!(config.refresh_interval, Duration::from_secs(90));
        assert_eq!(config.refresh_timeout, Duration::from_secs(6));
    }

    #[test]
    fn test_explicit_refresh_timeout_wins() {
        let config = config(&[("CARVIEW_CLIENT_TIMEOUT", "2s"), ("CARVIEW_REFRESH_TIMEOUT", "45s")]).unwrap();
        assert_eq!(config.refresh_timeout, Duration::from_secs(45));
    }

    #[test]
    fn test_huge_client_timeout_saturates_refresh_timeout() {
        let config = config(&[("CARVIEW_CLIENT_TIMEOUT", "5000000000000000000s")]).unwrap();
        assert_eq!(config.client_timeout, Duration::from_secs(5_000_000_000_000_000_000));
        assert_eq!(config.refresh_timeout, Duration::MAX);
    }

    #[test]
    fn test_blank_values_take_defaults() {
        let config = config(&[("CARVIEW_ENV", "  "), ("CARVIEW_MEDIA_URL", "")]).unwrap();
        assert_eq!(config.env, Environment::Local);
        assert_eq!(config.media_url, None);
    }

    #[test]
    fn test_invalid_values() {
        let err = config(&[("CARVIEW_REFRESH_INTERVAL", "soon")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "CARVIEW_REFRESH_INTERVAL", .. }));

        let err = config(&[("CARVIEW_BACKEND", "sqlite")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "CARVIEW_BACKEND", .. }));

        let err = config(&[("CARVIEW_CACHE_TTL", "0s")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "CARVIEW_CACHE_TTL", .. }));
    }
}
