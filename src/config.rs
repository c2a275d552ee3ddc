use crate::domain::Decimal;
use std::collections::HashMap;
use thiserror::Error;

/// Engine configuration, read once at startup and injected immutably.
///
/// Sizing knobs are decimals so capital math never touches floats.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub account_api_url: String,
    /// Where approved orders are posted; defaults to the account service
    /// base URL when unset.
    pub execution_api_url: String,
    /// Haircut applied on top of the margin ratio when sizing entries.
    pub slippage_buffer: Decimal,
    /// Maximum position size as a percentage of fund equity.
    pub max_position_size_pct: Decimal,
    /// Cap on the share of fund equity routed through one broker, percent.
    pub max_broker_allocation_pct: Decimal,
    /// Per-call timeout for account and allocation lookups.
    pub account_query_timeout_ms: u64,
    /// Retries after a transient account/allocation failure.
    pub account_query_retries: u32,
    /// End-to-end deadline for deciding one signal.
    pub signal_deadline_ms: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let account_api_url = env_map
            .get("ACCOUNT_API_URL")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("ACCOUNT_API_URL".to_string()))?;

        let execution_api_url = env_map
            .get("EXECUTION_API_URL")
            .cloned()
            .unwrap_or_else(|| account_api_url.clone());

        let slippage_buffer = parse_decimal(&env_map, "SLIPPAGE_BUFFER", "0.30")?;
        if slippage_buffer.is_negative() {
            return Err(ConfigError::InvalidValue(
                "SLIPPAGE_BUFFER".to_string(),
                "must not be negative".to_string(),
            ));
        }

        let max_position_size_pct = parse_decimal(&env_map, "MAX_POSITION_SIZE_PCT", "10")?;
        if !max_position_size_pct.is_positive() || max_position_size_pct > Decimal::hundred() {
            return Err(ConfigError::InvalidValue(
                "MAX_POSITION_SIZE_PCT".to_string(),
                "must be in (0, 100]".to_string(),
            ));
        }

        let max_broker_allocation_pct = parse_decimal(&env_map, "MAX_BROKER_ALLOCATION_PCT", "40")?;
        if !max_broker_allocation_pct.is_positive() || max_broker_allocation_pct > Decimal::hundred()
        {
            return Err(ConfigError::InvalidValue(
                "MAX_BROKER_ALLOCATION_PCT".to_string(),
                "must be in (0, 100]".to_string(),
            ));
        }

        let account_query_timeout_ms = parse_u64(&env_map, "ACCOUNT_QUERY_TIMEOUT_MS", "3000")?;
        let account_query_retries = parse_u64(&env_map, "ACCOUNT_QUERY_RETRIES", "2")? as u32;
        let signal_deadline_ms = parse_u64(&env_map, "SIGNAL_DEADLINE_MS", "12000")?;

        Ok(Config {
            port,
            database_path,
            account_api_url,
            execution_api_url,
            slippage_buffer,
            max_position_size_pct,
            max_broker_allocation_pct,
            account_query_timeout_ms,
            account_query_retries,
            signal_deadline_ms,
        })
    }
}

fn parse_decimal(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
) -> Result<Decimal, ConfigError> {
    Decimal::from_str_canonical(env_map.get(key).map(|s| s.as_str()).unwrap_or(default)).map_err(
        |_| ConfigError::InvalidValue(key.to_string(), "must be a valid decimal".to_string()),
    )
}

fn parse_u64(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
) -> Result<u64, ConfigError> {
    env_map
        .get(key)
        .map(|s| s.as_str())
        .unwrap_or(default)
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidValue(key.to_string(), "must be a valid u64".to_string()))
}
