use std::env;
use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DATABASE: &str = "./users.db";
const DEFAULT_POOL_SIZE: u32 = 8;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DatabaseLocation {
    Memory,
    File(PathBuf),
}

impl DatabaseLocation {
    fn parse(value: &str) -> Self {
        match value.trim() {
            ":memory:" | "memory" => DatabaseLocation::Memory,
            path => DatabaseLocation::File(PathBuf::from(path)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database: DatabaseLocation,
    pub pool_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database: DatabaseLocation::File(PathBuf::from(DEFAULT_DATABASE)),
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

impl Config {
    /// Reads `FRIENDS_API_HOST`, `FRIENDS_API_PORT`, `FRIENDS_API_DATABASE`
    /// and `FRIENDS_API_POOL_SIZE`, falling back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Config::default();
        Config {
            host: lookup("FRIENDS_API_HOST").unwrap_or(defaults.host),
            port: parse_or("FRIENDS_API_PORT", lookup("FRIENDS_API_PORT"), defaults.port),
            database: lookup("FRIENDS_API_DATABASE")
                .map(|value| DatabaseLocation::parse(&value))
                .unwrap_or(defaults.database),
            pool_size: parse_or(
                "FRIENDS_API_POOL_SIZE",
                lookup("FRIENDS_API_POOL_SIZE"),
                defaults.pool_size,
            ),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: FromStr + Copy>(key: &str, value: Option<String>, default: T) -> T {
    match value {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={:?}, using the default", key, raw);
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[]));
        assert_eq!(config, Config::default());
        assert_eq!(config.bind_addr(), "0.0.0.0:3000");
        assert_eq!(
            config.database,
            DatabaseLocation::File(PathBuf::from("./users.db"))
        );
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("FRIENDS_API_HOST", "127.0.0.1"),
            ("FRIENDS_API_PORT", "8080"),
            ("FRIENDS_API_DATABASE", ":memory:"),
            ("FRIENDS_API_POOL_SIZE", "2"),
        ]));
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.database, DatabaseLocation::Memory);
        assert_eq!(config.pool_size, 2);
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = Config::from_lookup(lookup(&[
            ("FRIENDS_API_PORT", "http"),
            ("FRIENDS_API_POOL_SIZE", "-1"),
        ]));
        assert_eq!(config.port, 3000);
        assert_eq!(config.pool_size, 8);
    }
}
