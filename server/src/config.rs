// stockroom_server/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use stockroom::{OwnerId, RetryConfig, StockroomConfig};

/// Log output format selected with `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
  #[default]
  Pretty,
  Json,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  /// Absent means the process keeps its ledger in memory.
  pub database_url: Option<String>,
  pub db_max_connections: u32,
  pub ledger: StockroomConfig,
  pub log_format: LogFormat,

  // Optional: demo inventory on startup
  pub seed_demo_data: bool,
  pub seed_owner_id: Option<OwnerId>,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present
    Self::from_vars(|name| env::var(name).ok())
  }

  /// Builds the configuration from a variable lookup. Unset variables take
  /// their defaults; set but unparsable ones are an error.
  pub fn from_vars(get_var: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get_env = |name: &str| get_var(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
    let server_port = parse_or(&get_env, "SERVER_PORT", 8080u16)?;
    let database_url = get_env("DATABASE_URL");
    let db_max_connections = parse_or(&get_env, "DB_MAX_CONNECTIONS", 10u32)?;

    let defaults = StockroomConfig::default();
    let operation_timeout = match get_env("LEDGER_OP_TIMEOUT_MS") {
      Some(raw) => match parse_var::<u64>("LEDGER_OP_TIMEOUT_MS", &raw)? {
        0 => return Err(AppError::Config("LEDGER_OP_TIMEOUT_MS must be at least 1".to_string())),
        ms => Duration::from_millis(ms),
      },
      None => defaults.operation_timeout,
    };
    let max_attempts = parse_or(&get_env, "LEDGER_RETRY_ATTEMPTS", defaults.retry.max_attempts)?;
    if max_attempts == 0 {
      return Err(AppError::Config("LEDGER_RETRY_ATTEMPTS must be at least 1".to_string()));
    }
    let search_limit_max = parse_or(&get_env, "SEARCH_LIMIT_MAX", defaults.search_limit_max)?;

    let log_format = match get_env("LOG_FORMAT").as_deref().map(str::to_ascii_lowercase).as_deref() {
      None | Some("pretty") | Some("text") => LogFormat::Pretty,
      Some("json") => LogFormat::Json,
      Some(other) => return Err(AppError::Config(format!("Invalid LOG_FORMAT '{}': expected 'pretty' or 'json'", other))),
    };

    let seed_demo_data = parse_or(&get_env, "SEED_DEMO_DATA", false)?;
    let seed_owner_id = get_env("SEED_OWNER_ID")
      .map(|raw| parse_var::<OwnerId>("SEED_OWNER_ID", &raw))
      .transpose()?;

    Ok(Self {
      server_host,
      server_port,
      database_url,
      db_max_connections,
      ledger: StockroomConfig {
        operation_timeout,
        retry: RetryConfig {
          max_attempts,
          ..RetryConfig::default()
        },
        search_limit_max,
      },
      log_format,
      seed_demo_data,
      seed_owner_id,
    })
  }

  pub fn bind_address(&self) -> String {
    format!("{}:{}", self.server_host, self.server_port)
  }
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  raw
    .parse::<T>()
    .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", name, raw, e)))
}

fn parse_or<T>(get_env: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  match get_env(name) {
    Some(raw) => parse_var(name, &raw),
    None => Ok(default),
  }
}
