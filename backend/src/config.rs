//! Server configuration loaded from environment variables.
//!
//! | Variable             | Default                                  | Description                          |
//! |----------------------|------------------------------------------|--------------------------------------|
//! | `DATABASE_URL`       | `sqlite://data/equipamentos.db?mode=rwc` | SQLite database location             |
//! | `HOST`               | `0.0.0.0`                                | HTTP bind address                    |
//! | `PORT`               | `8080`                                   | HTTP listen port                     |
//! | `LOG_LEVEL`          | `info`                                   | tracing filter (`EnvFilter` syntax)  |
//! | `DB_MAX_CONNECTIONS` | `5`                                      | connection pool size                 |
//! | `STATIC_DIR`         | `./static`                               | directory holding the HTML pages     |
//! | `MAX_UPLOAD_BYTES`   | `10485760`                               | size cap for batch CSV uploads       |

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Tracing filter string, e.g. `"equipment_inventory=debug,info"`.
    pub log_level: String,
    pub db_max_connections: u32,
    pub static_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables, applying defaults where
    /// a variable is absent or unparseable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            database_url:       env_str(&lookup, "DATABASE_URL", "sqlite://data/equipamentos.db?mode=rwc"),
            host:               env_str(&lookup, "HOST", "0.0.0.0"),
            port:               env_parse(&lookup, "PORT", 8080),
            log_level:          env_str(&lookup, "LOG_LEVEL", "info"),
            db_max_connections: env_parse(&lookup, "DB_MAX_CONNECTIONS", 5),
            static_dir:         PathBuf::from(env_str(&lookup, "STATIC_DIR", "./static")),
            max_upload_bytes:   env_parse(&lookup, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024),
        }
    }

    pub fn bind_addr(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }

    /// Directory of a file-backed SQLite URL, so it can be created before
    /// connecting. `None` for in-memory databases.
    pub fn database_dir(&self) -> Option<PathBuf> {
        let path = self
            .database_url
            .strip_prefix("sqlite://")
            .or_else(|| self.database_url.strip_prefix("sqlite:"))?;
        let path = path.split('?').next().unwrap_or(path);
        if path.is_empty() || path.starts_with(":memory:") {
            return None;
        }
        PathBuf::from(path)
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(PathBuf::from)
    }
}

fn env_str(lookup: impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_string())
}

fn env_parse<T: std::str::FromStr>(lookup: impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    fn from_vars(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    fn with_url(url: &str) -> Config {
        from_vars(&[("DATABASE_URL", url)])
    }

    #[test]
    fn defaults_are_sane() {
        let cfg = from_vars(&[]);
        assert_eq!(cfg.database_url, "sqlite://data/equipamentos.db?mode=rwc");
        assert_eq!(cfg.bind_addr(), ("0.0.0.0".to_string(), 8080));
        assert_eq!(cfg.db_max_connections, 5);
        assert_eq!(cfg.static_dir, PathBuf::from("./static"));
        assert_eq!(cfg.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn overrides_applied_and_garbage_ignored() {
        let cfg = from_vars(&[("DB_MAX_CONNECTIONS", " 12 "), ("PORT", "9090"), ("LOG_LEVEL", "debug")]);
        assert_eq!(cfg.db_max_connections, 12);
        assert_eq!(cfg.port, 9090);
        assert_eq!(cfg.log_level, "debug");

        let cfg = from_vars(&[("DB_MAX_CONNECTIONS", "many"), ("PORT", "99999")]);
        assert_eq!(cfg.db_max_connections, 5);
        assert_eq!(cfg.port, 8080);
    }

    #[test]
    fn database_dir_from_url() {
        assert_eq!(
            with_url("sqlite://data/equipamentos.db?mode=rwc").database_dir(),
            Some(PathBuf::from("data"))
        );
        assert_eq!(with_url("sqlite:inventario.db").database_dir(), None);
        assert_eq!(with_url("sqlite::memory:").database_dir(), None);
    }
}
