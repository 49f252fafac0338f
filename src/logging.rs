use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// HTTP plumbing crates that stay at `warn` unless `RUST_LOG` names them
const QUIET_TARGETS: [&str; 3] = ["hyper", "h2", "tower_http"];

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub loki_enabled: bool,
    pub loki_url: Option<String>,
    pub service_name: String,
    pub environment: String,
    pub log_level: String,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self {
            loki_enabled: std::env::var("LOKI_ENABLED")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
            loki_url: std::env::var("LOKI_URL").ok(),
            service_name: std::env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "sales-analytics".to_string()),
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            log_level: std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info".to_string()),
        }
    }

    /// Filter from `RUST_LOG`, with the HTTP stack quieted so analysis
    /// events (cache hits, imports, fits) are not drowned out
    pub fn env_filter(&self) -> Result<EnvFilter, Box<dyn std::error::Error>> {
        let mut filter = EnvFilter::try_new(&self.log_level)?;
        for target in QUIET_TARGETS {
            if !self.log_level.contains(target) {
                filter = filter.add_directive(format!("{}=warn", target).parse()?);
            }
        }
        Ok(filter)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.loki_enabled && self.loki_url.is_none() {
            return Err("LOKI_ENABLED is true but LOKI_URL is not set".to_string());
        }
        Ok(())
    }
}

pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;

    #[cfg(feature = "loki")]
    {
        if config.loki_enabled {
            if let Some(loki_url) = config.loki_url.clone() {
                return init_with_loki(config, &loki_url);
            }
        }
    }

    init_console_only(config)
}

fn init_console_only(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(config.env_filter()?)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    tracing::info!(
        service = %config.service_name,
        environment = %config.environment,
        filter = %config.log_level,
        "Console logging initialized for sales analytics"
    );

    Ok(())
}

#[cfg(feature = "loki")]
fn init_with_loki(config: LoggingConfig, loki_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let url = url::Url::parse(loki_url)?;

    let (loki_layer, task) = tracing_loki::builder()
        .label("service", &config.service_name)?
        .label("environment", &config.environment)?
        .label("component", "analytics")?
        .build_url(url)?;

    // Background task that ships buffered events to Loki
    tokio::spawn(task);

    tracing_subscriber::registry()
        .with(config.env_filter()?)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(loki_layer)
        .init();

    tracing::info!(
        service = %config.service_name,
        environment = %config.environment,
        loki = %loki_url,
        "Loki logging initialized for sales analytics"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(loki_enabled: bool, loki_url: Option<&str>) -> LoggingConfig {
        LoggingConfig {
            loki_enabled,
            loki_url: loki_url.map(str::to_string),
            service_name: "sales-analytics".to_string(),
            environment: "test".to_string(),
            log_level: "info".to_string(),
        }
    }

    #[test]
    fn test_validate_rejects_loki_without_url() {
        assert!(config(true, None).validate().is_err());
    }

    #[test]
    fn test_validate_accepts_console_only() {
        assert!(config(false, None).validate().is_ok());
        assert!(config(true, Some("http://localhost:3100")).validate().is_ok());
    }

    #[test]
    fn test_env_filter_quiets_http_stack() {
        let filter = config(false, None).env_filter().unwrap().to_string();
        assert!(filter.contains("hyper=warn"));
        assert!(filter.contains("tower_http=warn"));

        let mut verbose = config(false, None);
        verbose.log_level = "debug,hyper=debug".to_string();
        let filter = verbose.env_filter().unwrap().to_string();
        assert!(!filter.contains("hyper=warn"));
        assert!(filter.contains("h2=warn"));
    }

    #[test]
    fn test_env_filter_rejects_garbage() {
        let mut broken = config(false, None);
        broken.log_level = "sales=notalevel".to_string();
        assert!(broken.env_filter().is_err());
    }
}
