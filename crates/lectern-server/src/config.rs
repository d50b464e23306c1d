use std::net::SocketAddr;
use std::path::PathBuf;

/// Server configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    /// Directory holding the profile, catalog and graph databases.
    pub data_dir: PathBuf,
    pub reconcile_interval_secs: u64,
    pub migrate_on_start: bool,
    /// Allowed CORS origins. Empty disables CORS, `*` allows any origin.
    pub cors_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &'static str| -> Result<Option<String>, ConfigError> {
            match lookup(name) {
                Some(value) if value.trim().is_empty() => Err(ConfigError::Missing(name)),
                other => Ok(other),
            }
        };

        let listen_addr = var("LECTERN_LISTEN_ADDR")?
            .unwrap_or_else(|| "0.0.0.0:3000".to_string())
            .parse()
            .map_err(|_| {
                ConfigError::Invalid("LECTERN_LISTEN_ADDR", "must be a valid socket address")
            })?;

        let data_dir = var("LECTERN_DATA_DIR")?
            .unwrap_or_else(|| "./data".to_string())
            .into();

        let reconcile_interval_secs = match var("LECTERN_RECONCILE_INTERVAL_SECS")? {
            Some(s) => s
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::Invalid(
                    "LECTERN_RECONCILE_INTERVAL_SECS",
                    "must be a positive number of seconds",
                ))?,
            None => 30,
        };

        let migrate_on_start = match var("LECTERN_MIGRATE_ON_START")?.as_deref().map(str::trim) {
            None | Some("false") | Some("0") => false,
            Some("true") | Some("1") => true,
            Some(_) => {
                return Err(ConfigError::Invalid(
                    "LECTERN_MIGRATE_ON_START",
                    "must be true, false, 1 or 0",
                ))
            }
        };

        let cors_origins = lookup("LECTERN_CORS_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Config {
            listen_addr,
            data_dir,
            reconcile_interval_secs,
            migrate_on_start,
            cors_origins,
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    /// Set, but blank.
    Missing(&'static str),
    Invalid(&'static str, &'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(var) => {
                write!(f, "Environment variable {} is set but empty", var)
            }
            ConfigError::Invalid(var, msg) => write!(f, "Invalid value for {}: {}", var, msg),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.listen_addr.port(), 3000);
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.reconcile_interval_secs, 30);
        assert!(!config.migrate_on_start);
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("LECTERN_LISTEN_ADDR", "127.0.0.1:8080"),
            ("LECTERN_DATA_DIR", "/var/lib/lectern"),
            ("LECTERN_RECONCILE_INTERVAL_SECS", "5"),
            ("LECTERN_MIGRATE_ON_START", "true"),
            ("LECTERN_CORS_ORIGINS", "http://a.test, http://b.test"),
        ])
        .unwrap();

        assert_eq!(config.listen_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/lectern"));
        assert_eq!(config.reconcile_interval_secs, 5);
        assert!(config.migrate_on_start);
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("LECTERN_LISTEN_ADDR", "nowhere")]),
            Err(ConfigError::Invalid("LECTERN_LISTEN_ADDR", _))
        ));
        assert!(matches!(
            load(&[("LECTERN_RECONCILE_INTERVAL_SECS", "0")]),
            Err(ConfigError::Invalid(..))
        ));
        assert!(matches!(
            load(&[("LECTERN_MIGRATE_ON_START", "yes")]),
            Err(ConfigError::Invalid(..))
        ));
        assert!(matches!(
            load(&[("LECTERN_DATA_DIR", "  ")]),
            Err(ConfigError::Missing("LECTERN_DATA_DIR"))
        ));
    }
}
