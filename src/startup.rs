use crate::errors::AppError;
use aws_sdk_dynamodb::{
    error::SdkError as DynamoSdkError,
    types::{
        AttributeDefinition, AttributeValue, BillingMode, KeySchemaElement, KeyType,
        ScalarAttributeType,
    },
    Client as DynamoDbClient,
};
use aws_sdk_s3::{
    error::SdkError as S3SdkError,
    types::{BucketLocationConstraint, CreateBucketConfiguration},
    Client as S3Client,
};
use tracing;

pub const CAPTIONS_TABLE: &str = "captions";
pub const VOTES_TABLE: &str = "votes";
pub const IMAGES_TABLE: &str = "images";
pub const FLAVORS_TABLE: &str = "flavors";

/// Built-in humor styles, seeded with fixed ids so a restart overwrites the
/// same items instead of multiplying catalog rows.
const FLAVOR_CATALOG: &[(&str, &str, &str)] = &[
    (
        "8b6a2c1d-3e4f-4a5b-9c0d-1e2f3a4b5c6d",
        "deadpan",
        "Flat delivery, no winking at the audience",
    ),
    (
        "2c3d4e5f-6a7b-4c8d-9e0f-1a2b3c4d5e6f",
        "wholesome",
        "Warm, feel-good humor",
    ),
    (
        "7e8f9a0b-1c2d-4e3f-8a5b-6c7d8e9f0a1b",
        "absurdist",
        "Non sequiturs and surreal logic",
    ),
    (
        "5a6b7c8d-9e0f-4a1b-8c2d-3e4f5a6b7c8d",
        "sarcastic",
        "Dry, cutting remarks",
    ),
];

/// Creates a DynamoDB table if it doesn't exist. All key attributes are
/// strings; `range_key` adds a composite sort key where given.
async fn create_table_if_not_exists(
    client: &DynamoDbClient,
    table_name: &str,
    hash_key: &str,
    range_key: Option<&str>,
) -> Result<(), AppError> {
    let mut request = client
        .create_table()
        .table_name(table_name)
        .attribute_definitions(
            AttributeDefinition::builder()
                .attribute_name(hash_key)
                .attribute_type(ScalarAttributeType::S)
                .build()?,
        )
        .key_schema(
            KeySchemaElement::builder()
                .attribute_name(hash_key)
                .key_type(KeyType::Hash)
                .build()?,
        )
        .billing_mode(BillingMode::PayPerRequest);

    if let Some(range_key) = range_key {
        request = request
            .attribute_definitions(
                AttributeDefinition::builder()
                    .attribute_name(range_key)
                    .attribute_type(ScalarAttributeType::S)
                    .build()?,
            )
            .key_schema(
                KeySchemaElement::builder()
                    .attribute_name(range_key)
                    .key_type(KeyType::Range)
                    .build()?,
            );
    }

    let result = request.send().await;
    match result {
        Ok(_) => {
            tracing::info!("Startup: Table '{}' created successfully or setup initiated.", table_name);
            Ok(())
        }
        Err(e) => {
            if let DynamoSdkError::ServiceError(service_err) = &e {
                if service_err.err().is_resource_in_use_exception() {
                    tracing::info!("Startup: Table '{}' already exists, no action needed.", table_name);
                    Ok(())
                } else {
                    let context = format!("Startup: Service error creating DynamoDB table '{}'", table_name);
                    tracing::error!("{}: {:?}", context, service_err);
                    Err(AppError::InitError(format!("{}: {}", context, e)))
                }
            } else {
                let context = format!("Startup: SDK error creating DynamoDB table '{}'", table_name);
                tracing::error!("{}: {}", context, e);
                Err(AppError::InitError(format!("{}: {}", context, e)))
            }
        }
    }
}

/// Ensures the S3 bucket exists, creating it with the correct location constraint if needed.
async fn ensure_s3_bucket_exists(client: &S3Client, bucket_name: &str, region_str: &str) -> Result<(), AppError> {
    let bucket_config = if region_str != "us-east-1" {
        Some(
            CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(region_str))
                .build(),
        )
    } else {
        None
    };

    let mut create_bucket_req_builder = client.create_bucket().bucket(bucket_name);
    if let Some(config) = bucket_config {
        create_bucket_req_builder = create_bucket_req_builder.create_bucket_configuration(config);
    }

    match create_bucket_req_builder.send().await {
        Ok(_) => {
            tracing::info!("Startup: S3 bucket '{}' created or already exists.", bucket_name);
            Ok(())
        }
        Err(sdk_err) => {
            if let S3SdkError::ServiceError(service_err) = &sdk_err {
                let code = service_err.err().meta().code();
                if code == Some("BucketAlreadyOwnedByYou") || code == Some("BucketAlreadyExists") {
                    tracing::info!("Startup: S3 bucket '{}' already exists.", bucket_name);
                    Ok(())
                } else {
                    let context = format!("Startup: Service error creating S3 bucket '{}'", bucket_name);
                    tracing::error!("{}: {:?}", context, service_err);
                    Err(AppError::InitError(format!("{}: {}", context, sdk_err)))
                }
            } else {
                let context = format!("Startup: SDK error creating S3 bucket '{}'", bucket_name);
                tracing::error!("{}: {}", context, sdk_err);
                Err(AppError::InitError(format!("{}: {}", context, sdk_err)))
            }
        }
    }
}

/// Writes the built-in flavor catalog. PutItem on fixed keys is idempotent
/// across restarts.
async fn seed_flavor_catalog(client: &DynamoDbClient) -> Result<(), AppError> {
    for (id, slug, description) in FLAVOR_CATALOG {
        client
            .put_item()
            .table_name(FLAVORS_TABLE)
            .item("flavor_id", AttributeValue::S((*id).to_string()))
            .item("slug", AttributeValue::S((*slug).to_string()))
            .item("description", AttributeValue::S((*description).to_string()))
            .send()
            .await
            .map_err(|e| {
                AppError::InitError(format!(
                    "Startup: Failed to seed flavor '{}' into table '{}': {}",
                    slug, FLAVORS_TABLE, e
                ))
            })?;
    }
    tracing::info!("Startup: Seeded {} humor flavors.", FLAVOR_CATALOG.len());
    Ok(())
}

/// Initializes required AWS resources (DynamoDB tables, S3 bucket).
pub async fn init_resources(
    db_client: &DynamoDbClient,
    s3_client: &S3Client,
    bucket_name: &str,
    region_str: &str,
) -> Result<(), AppError> {
    tracing::info!("Startup: Initializing AWS resources...");
    create_table_if_not_exists(db_client, CAPTIONS_TABLE, "caption_id", None).await?;
    // The composite key makes one vote per (caption, voter) a store-level
    // guarantee; a revote overwrites the same item.
    create_table_if_not_exists(db_client, VOTES_TABLE, "caption_id", Some("voter_id")).await?;
    create_table_if_not_exists(db_client, IMAGES_TABLE, "image_id", None).await?;
    create_table_if_not_exists(db_client, FLAVORS_TABLE, "flavor_id", None).await?;
    seed_flavor_catalog(db_client).await?;
    ensure_s3_bucket_exists(s3_client, bucket_name, region_str).await?;
    tracing::info!("Startup: AWS resource initialization complete.");
    Ok(())
}
