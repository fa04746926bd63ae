use crate::config::Config;
use crate::errors::AppError;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use aws_sdk_s3::Client as S3Client;
use tracing;

// Builds the base AWS SDK configuration from application config.
// Against real AWS the default credential provider chain applies (env vars,
// profiles, etc.); with an endpoint override, static dev credentials are
// injected since LocalStack accepts any key pair.
pub async fn create_sdk_config(config: &Config) -> Result<SdkConfig, AppError> {
    let region = Region::new(config.aws_region.clone());
    tracing::info!(sdk_region = %config.aws_region, "Setting SDK region");

    let mut config_loader = aws_config::defaults(BehaviorVersion::latest()).region(region);

    if let Some(endpoint_url) = &config.localstack_endpoint {
        tracing::info!("Using endpoint override: {}", endpoint_url);
        config_loader = config_loader
            .endpoint_url(endpoint_url)
            .credentials_provider(Credentials::from_keys("test", "test", None));
    } else {
        tracing::info!("Using default AWS endpoints and credential resolution.");
    }

    Ok(config_loader.load().await)
}

// Creates a DynamoDB client from a shared SdkConfig.
pub fn create_dynamodb_client(sdk_config: &SdkConfig) -> DynamoDbClient {
    DynamoDbClient::new(sdk_config)
}

// Creates an S3 client from a shared SdkConfig. LocalStack serves buckets at
// path-style URLs only, so the override flips the client to match the public
// URLs handed out by storage.
pub fn create_s3_client(sdk_config: &SdkConfig, config: &Config) -> S3Client {
    let s3_config = aws_sdk_s3::config::Builder::from(sdk_config)
        .force_path_style(config.localstack_endpoint.is_some())
        .build();
    S3Client::from_conf(s3_config)
}
