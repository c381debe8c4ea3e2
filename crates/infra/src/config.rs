//! Process configuration, read from environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `BIND_ADDR` | `0.0.0.0:8080` |
//! | `USE_PERSISTENT_STORES` | `false` |
//! | `DATABASE_URL` | required when `USE_PERSISTENT_STORES=true` |
//! | `ADMIN_JWT_SECRET` | insecure dev default (logged at warn) |
//! | `USER_JWT_SECRET` | insecure dev default (logged at warn) |
//! | `MAX_DB_CONNECTIONS` | `5` |

use std::net::SocketAddr;

use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_MAX_DB_CONNECTIONS: u32 = 5;
const DEV_ADMIN_SECRET: &str = "dev-admin-secret";
const DEV_USER_SECRET: &str = "dev-user-secret";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be set when USE_PERSISTENT_STORES=true")]
    Missing(&'static str),
}

/// Which `Store` backs the services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    InMemory,
    Postgres {
        database_url: String,
        max_connections: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub store: StoreConfig,
    pub admin_jwt_secret: String,
    pub user_jwt_secret: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_raw = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
            name: "BIND_ADDR",
            value: bind_raw.clone(),
            reason: e.to_string(),
        })?;

        let persistent = match lookup("USE_PERSISTENT_STORES") {
            None => false,
            Some(raw) => parse_bool("USE_PERSISTENT_STORES", &raw)?,
        };

        let store = if persistent {
            let database_url = lookup("DATABASE_URL")
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing("DATABASE_URL"))?;
            let max_connections = match lookup("MAX_DB_CONNECTIONS") {
                None => DEFAULT_MAX_DB_CONNECTIONS,
                Some(raw) => match raw.trim().parse::<u32>() {
                    Ok(n) if n > 0 => n,
                    _ => {
                        return Err(ConfigError::Invalid {
                            name: "MAX_DB_CONNECTIONS",
                            value: raw,
                            reason: "expected a positive integer".to_string(),
                        });
                    }
                },
            };
            StoreConfig::Postgres {
                database_url,
                max_connections,
            }
        } else {
            StoreConfig::InMemory
        };

        let admin_jwt_secret = secret_or_dev_default(&lookup, "ADMIN_JWT_SECRET", DEV_ADMIN_SECRET);
        let user_jwt_secret = secret_or_dev_default(&lookup, "USER_JWT_SECRET", DEV_USER_SECRET);
        // The admin issuer is tried first; a shared key would let it accept customer tokens.
        if admin_jwt_secret == user_jwt_secret {
            return Err(ConfigError::Invalid {
                name: "USER_JWT_SECRET",
                value: "<redacted>".to_string(),
                reason: "must differ from ADMIN_JWT_SECRET".to_string(),
            });
        }

        Ok(Self {
            bind_addr,
            store,
            admin_jwt_secret,
            user_jwt_secret,
        })
    }
}

fn parse_bool(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            value: raw.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

fn secret_or_dev_default(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    dev_default: &str,
) -> String {
    match lookup(name).filter(|v| !v.is_empty()) {
        Some(secret) => secret,
        None => {
            tracing::warn!("{name} not set; using insecure dev default");
            dev_default.to_string()
        }
    }
}
