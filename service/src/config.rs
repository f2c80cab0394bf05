// cart_service/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub db_max_connections: u32,
  pub run_migrations: bool,

  pub amqp_url: String,
  pub rpc_queue: String,
  pub rpc_prefetch: u16,
  pub rpc_deadline: Duration,

  /// Lets add-to-cart register products missing from the catalog.
  pub catalog_auto_register: bool,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = parse_or("SERVER_PORT", 3000u16)?;
    let database_url = get_env("DATABASE_URL")?;
    let db_max_connections = parse_or("DB_MAX_CONNECTIONS", 5u32)?;
    let run_migrations = parse_or("RUN_MIGRATIONS", true)?;

    let amqp_url = get_env("AMQP_URL")?;
    let rpc_queue = get_env("RPC_QUEUE").unwrap_or_else(|_| "products_queue".to_string());
    let rpc_prefetch = parse_or("RPC_PREFETCH", 1u16)?;
    let rpc_deadline = Duration::from_secs(parse_or("RPC_DEADLINE_SECS", 5u64)?);

    let catalog_auto_register = parse_or("CATALOG_AUTO_REGISTER", false)?;

    tracing::info!(
      %server_host,
      server_port,
      %rpc_queue,
      rpc_prefetch,
      catalog_auto_register,
      "Application configuration loaded successfully."
    );

    Ok(Self {
      server_host,
      server_port,
      database_url,
      db_max_connections,
      run_migrations,
      amqp_url,
      rpc_queue,
      rpc_prefetch,
      rpc_deadline,
      catalog_auto_register,
    })
  }

  pub fn server_address(&self) -> String {
    format!("{}:{}", self.server_host, self.server_port)
  }
}

/// Parses an optional variable, falling back to `default` when it is unset.
fn parse_or<T>(var_name: &str, default: T) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  match env::var(var_name) {
    Ok(raw) => raw
      .trim()
      .parse::<T>()
      .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", var_name, raw, e))),
    Err(_) => Ok(default),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unset_variables_fall_back_to_defaults() {
    assert_eq!(parse_or("CART_SERVICE_TEST_UNSET_PORT", 3000u16).unwrap(), 3000);
    assert!(parse_or("CART_SERVICE_TEST_UNSET_FLAG", true).unwrap());
  }

  #[test]
  fn malformed_values_are_config_errors() {
    env::set_var("CART_SERVICE_TEST_BAD_PORT", "eighty");
    let err = parse_or("CART_SERVICE_TEST_BAD_PORT", 3000u16).unwrap_err();
    assert!(matches!(err, AppError::Config(ref m) if m.contains("CART_SERVICE_TEST_BAD_PORT")));
    env::remove_var("CART_SERVICE_TEST_BAD_PORT");
  }
}
