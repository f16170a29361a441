use std::net::IpAddr;

#[derive(Debug, Clone)]
pub struct Config {
    pub storage: Storage,
    pub host: IpAddr,
    pub port: u16,
    pub environment: Environment,
    pub base_path: String,
    pub max_body_size: usize,
    pub log_level: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Storage {
    Postgres { url: String, max_connections: u32 },
    Memory,
}

/// Deployment mode. Controls whether failure details reach clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    pub fn is_development(&self) -> bool {
        *self == Environment::Development
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let storage = match env_or("FORMBASE_STORAGE", "postgres").as_str() {
            "memory" => Storage::Memory,
            "postgres" => Storage::Postgres {
                url: env_required("DATABASE_URL")?,
                max_connections: env_or("FORMBASE_DB_MAX_CONNECTIONS", "10")
                    .parse()
                    .map_err(|e| format!("Invalid FORMBASE_DB_MAX_CONNECTIONS: {e}"))?,
            },
            other => return Err(format!("Invalid FORMBASE_STORAGE: {other}")),
        };

        let host: IpAddr = env_or("FORMBASE_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid FORMBASE_HOST: {e}"))?;

        let port: u16 = env_or("FORMBASE_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid FORMBASE_PORT: {e}"))?;

        let environment = match env_or("FORMBASE_ENV", "production").as_str() {
            "development" | "dev" => Environment::Development,
            _ => Environment::Production,
        };

        let base_path = normalize_base_path(&env_or("FORMBASE_BASE_PATH", ""));

        let max_body_size: usize = env_or("FORMBASE_MAX_BODY_SIZE", "10485760")
            .parse()
            .map_err(|e| format!("Invalid FORMBASE_MAX_BODY_SIZE: {e}"))?;

        let log_level = env_or("FORMBASE_LOG_LEVEL", "info");

        Ok(Config {
            storage,
            host,
            port,
            environment,
            base_path,
            max_body_size,
            log_level,
        })
    }
}

/// `api/` -> `/api`; `/` and empty -> no prefix.
fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
