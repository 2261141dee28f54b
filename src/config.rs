use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnectOptions;

use crate::error::SeedError;
use crate::model::{InsertRow, NewCustomer};
use crate::seed::batch::MAX_BIND_PARAMS;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub seed: SeedConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allow any origin (the dashboard is served from a different port)
    pub cors_permissive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub connection_string: Option<String>,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: Option<String>,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

/// Volumes and shaping knobs for one seeding run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedConfig {
    pub stores: usize,
    pub products: usize,
    pub items: usize,
    pub customers: usize,
    pub months: u32,
    pub customer_batch_size: usize,
    pub sales_batch_size: usize,
    pub min_daily_sales: f64,
    pub max_daily_sales: f64,
    /// Share of sales without a customer
    pub anonymous_ratio: f64,
    pub rng_seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_permissive: true,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            connection_string: None,
            host: "localhost".to_string(),
            port: 5432,
            name: "analytics".to_string(),
            user: "postgres".to_string(),
            password: None,
            max_connections: 20,
            connect_timeout_secs: 2,
            idle_timeout_secs: 30,
        }
    }
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            stores: 10,
            products: 50,
            items: 20,
            customers: 200,
            months: 1,
            customer_batch_size: 500,
            sales_batch_size: 100,
            min_daily_sales: 20.0,
            max_daily_sales: 70.0,
            anonymous_ratio: 0.3,
            rng_seed: None,
        }
    }
}

impl SeedConfig {
    pub fn validate(&self) -> Result<(), SeedError> {
        if self.stores == 0 || self.products == 0 || self.items == 0 {
            return Err(SeedError::Config(
                "stores, products and items must all be at least 1".to_string(),
            ));
        }
        if self.customer_batch_size == 0 || self.sales_batch_size == 0 {
            return Err(SeedError::Config("batch sizes must be at least 1".to_string()));
        }
        let customer_params = self.customer_batch_size * NewCustomer::COLUMNS.len();
        if customer_params > MAX_BIND_PARAMS {
            return Err(SeedError::Config(format!(
                "customer_batch_size {} needs {} bind parameters per statement (max {})",
                self.customer_batch_size, customer_params, MAX_BIND_PARAMS
            )));
        }
        if !(self.min_daily_sales >= 0.0 && self.min_daily_sales < self.max_daily_sales) {
            return Err(SeedError::Config(format!(
                "daily sales range [{}, {}) is empty",
                self.min_daily_sales, self.max_daily_sales
            )));
        }
        if !(0.0..=1.0).contains(&self.anonymous_ratio) {
            return Err(SeedError::Config(format!(
                "anonymous_ratio {} is outside [0, 1]",
                self.anonymous_ratio
            )));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load configuration from defaults, an optional config file and
    /// `ANALYTICS_`-prefixed environment variables.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = config::Config::builder();

        // Add default configuration
        config = config.add_source(config::Config::try_from(&AppConfig::default())?);

        // Add config file if it exists
        config = config.add_source(config::File::with_name("config").required(false));

        // ANALYTICS_DATABASE__PASSWORD -> database.password
        config = config.add_source(
            config::Environment::with_prefix("ANALYTICS")
                .separator("__")
                .prefix_separator("_"),
        );

        let config = config.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        Ok(app_config)
    }

    /// Connection options from a connection string, `DATABASE_URL`, or the
    /// individual `database` fields, in that order.
    ///
    /// There is no built-in password: without a connection string or a
    /// configured password this fails.
    pub fn connect_options(&self) -> Result<PgConnectOptions, SeedError> {
        if let Some(connection_string) = &self.database.connection_string {
            return parse_url(connection_string);
        }

        if let Ok(url) = std::env::var("DATABASE_URL") {
            return parse_url(&url);
        }

        self.database.connect_options()
    }

    /// Get the server bind address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_url(url: &str) -> Result<PgConnectOptions, SeedError> {
    PgConnectOptions::from_str(url)
        .map_err(|e| SeedError::Config(format!("invalid database connection string: {}", e)))
}

impl DatabaseConfig {
    /// Options built field by field, so credentials need no URL escaping.
    pub fn connect_options(&self) -> Result<PgConnectOptions, SeedError> {
        let password = self
            .password
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                SeedError::Config(
                    "database password is not configured (set ANALYTICS_DATABASE__PASSWORD or DATABASE_URL)"
                        .to_string(),
                )
            })?;

        Ok(PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.name)
            .username(&self.user)
            .password(password))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_password_fails_fast() {
        let database = DatabaseConfig::default();
        let err = database.connect_options().unwrap_err();
        assert!(matches!(err, SeedError::Config(_)));
    }

    #[test]
    fn test_options_from_parts() {
        let database = DatabaseConfig {
            host: "db.internal".to_string(),
            port: 5433,
            password: Some("s3cret".to_string()),
            name: "sales".to_string(),
            ..DatabaseConfig::default()
        };
        let options = database.connect_options().unwrap();
        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 5433);
        assert_eq!(options.get_username(), "postgres");
        assert_eq!(options.get_database(), Some("sales"));
    }

    #[test]
    fn test_password_with_url_delimiters() {
        let database = DatabaseConfig {
            password: Some("L29/8/2006@b:#%".to_string()),
            ..DatabaseConfig::default()
        };
        let options = database.connect_options().unwrap();
        assert_eq!(options.get_host(), "localhost");
        assert_eq!(options.get_port(), 5432);
        assert_eq!(options.get_database(), Some("analytics"));
        assert!(format!("{:?}", options).contains("L29/8/2006@b:#%"));
    }

    #[test]
    fn test_connection_string_wins() {
        let config = AppConfig {
            database: DatabaseConfig {
                connection_string: Some("postgres://u:p@db:5433/x".to_string()),
                ..DatabaseConfig::default()
            },
            ..AppConfig::default()
        };
        let options = config.connect_options().unwrap();
        assert_eq!(options.get_host(), "db");
        assert_eq!(options.get_port(), 5433);
        assert_eq!(options.get_username(), "u");
    }

    #[test]
    fn test_malformed_connection_string_is_config_error() {
        let config = AppConfig {
            database: DatabaseConfig {
                connection_string: Some("postgres://u:p@db:notaport/x".to_string()),
                ..DatabaseConfig::default()
            },
            ..AppConfig::default()
        };
        assert!(matches!(
            config.connect_options().unwrap_err(),
            SeedError::Config(_)
        ));
    }

    #[test]
    fn test_customer_batch_must_fit_bind_parameters() {
        let per_row = NewCustomer::COLUMNS.len();
        let largest = SeedConfig {
            customer_batch_size: MAX_BIND_PARAMS / per_row,
            ..SeedConfig::default()
        };
        assert!(largest.validate().is_ok());

        let too_large = SeedConfig {
            customer_batch_size: 6000,
            ..SeedConfig::default()
        };
        let err = too_large.validate().unwrap_err();
        assert!(matches!(err, SeedError::Config(_)));
        assert!(err.to_string().contains("78000"));
    }

    #[test]
    fn test_seed_config_validation() {
        assert!(SeedConfig::default().validate().is_ok());

        let empty_range = SeedConfig {
            min_daily_sales: 70.0,
            max_daily_sales: 20.0,
            ..SeedConfig::default()
        };
        assert!(empty_range.validate().is_err());

        let no_batches = SeedConfig {
            customer_batch_size: 0,
            ..SeedConfig::default()
        };
        assert!(no_batches.validate().is_err());
    }
}
