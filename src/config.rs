//! Process configuration, read once from the environment (and `.env`).

use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Which storage gateway the server talks to. Exactly one, chosen up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Rest,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "sql" => Ok(Self::Postgres),
            "rest" | "postgrest" => Ok(Self::Rest),
            "memory" => Ok(Self::Memory),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub auto_migrate: bool,
    /// Base URL of the hosted project (`https://<ref>.supabase.co`).
    pub rest_url: String,
    pub service_key: String,
}

#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub auth_url: String,
    /// Sent as `apikey`; the anon key when configured, else the service key.
    pub api_key: String,
    pub jwt_secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub environment: String,
    pub storage: StorageConfig,
    pub identity: IdentityConfig,
    pub allowed_origins: Vec<String>,
    pub log_dir: Option<String>,
}

impl Config {
    /// Load from the process environment, honoring a `.env` file if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty values count as unset.
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let port = match get("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                value: raw,
            })?,
            None => 3001,
        };

        let backend = match get("STORAGE_BACKEND") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                key: "STORAGE_BACKEND",
                value: raw,
            })?,
            None => StorageBackend::Postgres,
        };

        let database_url = get("DATABASE_URL");
        if backend == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "DATABASE_MAX_CONNECTIONS",
                        value: raw,
                    })
                }
            },
            None => 10,
        };

        let auto_migrate = match get("AUTO_MIGRATE") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::Invalid {
                key: "AUTO_MIGRATE",
                value: raw,
            })?,
            None => false,
        };

        let supabase_url = require("SUPABASE_URL")?;
        if !(supabase_url.starts_with("https://") || supabase_url.starts_with("http://")) {
            return Err(ConfigError::Invalid {
                key: "SUPABASE_URL",
                value: supabase_url,
            });
        }
        let supabase_url = supabase_url.trim_end_matches('/').to_string();
        let service_key = require("SUPABASE_SERVICE_ROLE_KEY")?;

        let allowed_origins = get("ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            port,
            environment: get("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            storage: StorageConfig {
                backend,
                database_url,
                max_connections,
                auto_migrate,
                rest_url: supabase_url.clone(),
                service_key: service_key.clone(),
            },
            identity: IdentityConfig {
                auth_url: supabase_url,
                api_key: get("SUPABASE_ANON_KEY").unwrap_or(service_key),
                jwt_secret: get("SUPABASE_JWT_SECRET"),
            },
            allowed_origins,
            log_dir: get("LOG_DIR"),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
