use std::{env, net::SocketAddr, str::FromStr};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid environment variable format for {0}: {1}")]
    InvalidVar(String, String),
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub media_bucket_name: String,
    // Store region as string for simplicity here, aws_clients can convert
    pub aws_region: String,
    // Optional endpoint for LocalStack
    pub localstack_endpoint: Option<String>,
    // External captioning API (bearer credential owned by this service)
    pub caption_api_url: String,
    pub caption_api_token: String,
    // External identity provider resolving caller bearer tokens
    pub identity_api_url: String,
    pub upload_url_ttl_secs: u64,
}

impl Config {
    /// Loads configuration from environment variables. The caller is expected
    /// to have loaded any .env file already.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address_str =
            env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = SocketAddr::from_str(&bind_address_str)
            .map_err(|e| ConfigError::InvalidVar("BIND_ADDRESS".into(), e.to_string()))?;

        let media_bucket_name = env::var("MEDIA_BUCKET_NAME")
            .map_err(|_| ConfigError::MissingVar("MEDIA_BUCKET_NAME".into()))?;

        let aws_region =
            env::var("AWS_DEFAULT_REGION").unwrap_or_else(|_| "ca-central-1".to_string());

        // Allow overriding endpoint for localstack/testing
        let localstack_endpoint = env::var("AWS_ENDPOINT_URL").ok();

        let caption_api_url = required_url("CAPTION_API_URL")?;
        let caption_api_token = env::var("CAPTION_API_TOKEN")
            .map_err(|_| ConfigError::MissingVar("CAPTION_API_TOKEN".into()))?;
        let identity_api_url = required_url("IDENTITY_API_URL")?;

        let upload_url_ttl_secs = match env::var("UPLOAD_URL_TTL_SECS") {
            Ok(raw) => raw.parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidVar("UPLOAD_URL_TTL_SECS".into(), e.to_string())
            })?,
            Err(_) => 900,
        };

        Ok(Config {
            bind_address,
            media_bucket_name,
            aws_region,
            localstack_endpoint,
            caption_api_url,
            caption_api_token,
            identity_api_url,
            upload_url_ttl_secs,
        })
    }
}

fn required_url(key: &str) -> Result<String, ConfigError> {
    let raw = env::var(key).map_err(|_| ConfigError::MissingVar(key.into()))?;
    // Normalized so callers can join paths without double slashes
    Ok(raw.trim_end_matches('/').to_string())
}
