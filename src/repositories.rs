use crate::{
    domain::{CaptionRepository, FlavorRepository, ImageRepository, VoteRepository},
    errors::RepoError,
    models::{Caption, HumorFlavor, Image, Vote, VoteValue},
};
use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_dynamodb::{
    error::SdkError,
    operation::update_item::UpdateItemError,
    types::{AttributeValue, ReturnValue},
    Client as DynamoDbClient,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{self, info};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct DynamoDbCaptionRepository {
    client: DynamoDbClient,
    table_name: String, // Store the table name
}

impl DynamoDbCaptionRepository {
    /// Creates a new repository instance configured for a specific table.
    pub fn new(client: DynamoDbClient, table_name: String) -> Self {
        info!(%table_name, "Initializing DynamoDbCaptionRepository");
        Self { client, table_name }
    }
}

#[async_trait]
impl CaptionRepository for DynamoDbCaptionRepository {
    /// Stores a `Caption` in the DynamoDB table using PutItem.
    async fn create(&self, caption: &Caption) -> Result<(), RepoError> {
        let mut request = self.client
            .put_item()
            .table_name(&self.table_name)
            .item("caption_id", AttributeValue::S(caption.caption_id.to_string()))
            .item("content", AttributeValue::S(caption.content.clone()))
            .item("like_count", AttributeValue::N(caption.like_count.to_string()))
            .item("created_at", AttributeValue::S(caption.created_at.to_rfc3339()));

        // Optional attributes are omitted rather than stored as empty strings.
        if let Some(flavor_id) = caption.flavor_id {
            request = request.item("flavor_id", AttributeValue::S(flavor_id.to_string()));
        }
        if let Some(image_id) = caption.image_id {
            request = request.item("image_id", AttributeValue::S(image_id.to_string()));
        }

        request
            .send()
            .await
            .context(format!("DynamoDB (table: {}): Failed to put caption (id: {})", self.table_name, caption.caption_id))
            .map_err(RepoError::BackendError)?; // Map anyhow::Error -> RepoError
        Ok(())
    }

    /// Lists captions using DynamoDB Scan. Handles pagination, stopping once
    /// `max_items` records have been read.
    async fn list(&self, max_items: usize) -> Result<Vec<Caption>, RepoError> {
        tracing::debug!("DynamoDB: Scanning table '{}' for captions (cap: {})", self.table_name, max_items);
        let mut captions: Vec<Caption> = Vec::new();
        let mut last_evaluated_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let mut request_builder = self.client.scan().table_name(&self.table_name);

            // Apply ExclusiveStartKey if paginating from previous response
            if let Some(lek) = last_evaluated_key {
                request_builder = request_builder.set_exclusive_start_key(Some(lek));
            }

            let resp = request_builder
                .send()
                .await
                .context(format!("DynamoDB: Failed to scan table '{}'", self.table_name))
                .map_err(RepoError::BackendError)?;

            if let Some(items) = resp.items {
                for item in items {
                    match item_to_caption(&item) {
                        Some(caption) => captions.push(caption),
                        None => {
                            let item_id = item.get("caption_id").and_then(|v| v.as_s().ok());
                            tracing::error!(item.id = ?item_id, table_name = %self.table_name, "DynamoDB: Failed to parse item from scan into Caption");
                            // Fail fast if data in the table is corrupt
                            return Err(RepoError::DataCorruption(format!(
                                "DynamoDB: Failed to parse item {:?} during scan of table '{}'",
                                item_id, self.table_name
                            )));
                        }
                    }
                    if captions.len() >= max_items {
                        tracing::debug!("DynamoDB Scan (table: {}): Read cap of {} reached", self.table_name, max_items);
                        return Ok(captions);
                    }
                }
            }

            // Check for next page
            last_evaluated_key = resp.last_evaluated_key;
            if last_evaluated_key.is_none() {
                break;
            }
        }

        tracing::debug!("DynamoDB (table: {}): Listed {} captions", self.table_name, captions.len());
        Ok(captions)
    }

    /// Bumps `like_count` by one atomically via UpdateItem's ADD action. The
    /// condition expression turns "caption never existed" into NotFound
    /// instead of silently creating a counter-only item.
    async fn increment_likes(&self, id: Uuid) -> Result<u32, RepoError> {
        let id_str = id.to_string();
        let result = self.client
            .update_item()
            .table_name(&self.table_name)
            .key("caption_id", AttributeValue::S(id_str.clone()))
            .update_expression("ADD like_count :one")
            .condition_expression("attribute_exists(caption_id)")
            .expression_attribute_values(":one", AttributeValue::N("1".to_string()))
            .return_values(ReturnValue::UpdatedNew)
            .send()
            .await;

        let resp = match result {
            Ok(resp) => resp,
            Err(err) if is_conditional_check_failed(&err) => return Err(RepoError::NotFound(id)),
            Err(err) => {
                return Err(err)
                    .context(format!("DynamoDB (table: {}): Failed to increment likes (id: {})", self.table_name, id_str))
                    .map_err(RepoError::BackendError);
            }
        };

        resp.attributes
            .as_ref()
            .and_then(|attrs| attrs.get("like_count"))
            .and_then(|v| v.as_n().ok())
            .and_then(|n| n.parse::<u32>().ok())
            .ok_or_else(|| {
                RepoError::DataCorruption(format!(
                    "DynamoDB (table: {}): UpdateItem returned no usable like_count for caption {}",
                    self.table_name, id_str
                ))
            })
    }
}

#[derive(Debug, Clone)]
pub struct DynamoDbVoteRepository {
    client: DynamoDbClient,
    table_name: String,
}

impl DynamoDbVoteRepository {
    /// Creates a new repository instance configured for a specific table.
    pub fn new(client: DynamoDbClient, table_name: String) -> Self {
        info!(%table_name, "Initializing DynamoDbVoteRepository");
        Self { client, table_name }
    }
}

#[async_trait]
impl VoteRepository for DynamoDbVoteRepository {
    /// Retrieves the (caption, voter) pair's vote using GetItem on the
    /// composite key.
    async fn get(&self, caption_id: Uuid, voter_id: Uuid) -> Result<Option<Vote>, RepoError> {
        let resp = self.client
            .get_item()
            .table_name(&self.table_name)
            .key("caption_id", AttributeValue::S(caption_id.to_string()))
            .key("voter_id", AttributeValue::S(voter_id.to_string()))
            .send()
            .await
            .context(format!(
                "DynamoDB (table: {}): Failed to get vote (caption: {}, voter: {})",
                self.table_name, caption_id, voter_id
            ))
            .map_err(RepoError::BackendError)?;

        match resp.item {
            Some(item) => match item_to_vote(&item) {
                Some(vote) => Ok(Some(vote)),
                None => {
                    tracing::error!(%caption_id, %voter_id, table_name = %self.table_name, "DynamoDB: Retrieved item but failed to parse into Vote");
                    Err(RepoError::DataCorruption(format!(
                        "Failed to parse vote data retrieved from DynamoDB table '{}' for caption {} / voter {}",
                        self.table_name, caption_id, voter_id
                    )))
                }
            },
            None => Ok(None), // No vote cast yet is not an error
        }
    }

    /// Creates or replaces the pair's vote using PutItem. The composite key
    /// makes this an upsert; a second vote by the same voter overwrites the
    /// first item instead of adding a sibling.
    async fn put(&self, vote: &Vote) -> Result<(), RepoError> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .item("caption_id", AttributeValue::S(vote.caption_id.to_string()))
            .item("voter_id", AttributeValue::S(vote.voter_id.to_string()))
            .item("vote_id", AttributeValue::S(vote.vote_id.to_string()))
            .item("value", AttributeValue::N(vote.value.as_i8().to_string()))
            .send()
            .await
            .context(format!(
                "DynamoDB (table: {}): Failed to put vote (caption: {}, voter: {})",
                self.table_name, vote.caption_id, vote.voter_id
            ))
            .map_err(RepoError::BackendError)?;
        Ok(())
    }

    /// Lists one caption's votes using Query on the hash key. Handles
    /// pagination, stopping once `max_items` records have been read.
    async fn list_for_caption(
        &self,
        caption_id: Uuid,
        max_items: usize,
    ) -> Result<Vec<Vote>, RepoError> {
        let mut votes: Vec<Vote> = Vec::new();
        let mut last_evaluated_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let mut request_builder = self.client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("caption_id = :cid")
                .expression_attribute_values(":cid", AttributeValue::S(caption_id.to_string()));

            if let Some(lek) = last_evaluated_key {
                request_builder = request_builder.set_exclusive_start_key(Some(lek));
            }

            let resp = request_builder
                .send()
                .await
                .context(format!(
                    "DynamoDB (table: {}): Failed to query votes for caption {}",
                    self.table_name, caption_id
                ))
                .map_err(RepoError::BackendError)?;

            if let Some(items) = resp.items {
                for item in items {
                    match item_to_vote(&item) {
                        Some(vote) => votes.push(vote),
                        None => {
                            let item_id = item.get("vote_id").and_then(|v| v.as_s().ok());
                            tracing::error!(item.id = ?item_id, table_name = %self.table_name, "DynamoDB: Failed to parse item from query into Vote");
                            return Err(RepoError::DataCorruption(format!(
                                "DynamoDB: Failed to parse item {:?} during query of table '{}'",
                                item_id, self.table_name
                            )));
                        }
                    }
                    if votes.len() >= max_items {
                        return Ok(votes);
                    }
                }
            }

            last_evaluated_key = resp.last_evaluated_key;
            if last_evaluated_key.is_none() {
                break;
            }
        }

        Ok(votes)
    }

    /// Lists votes across all captions using Scan. Handles pagination,
    /// stopping once `max_items` records have been read.
    async fn list_all(&self, max_items: usize) -> Result<Vec<Vote>, RepoError> {
        let mut votes: Vec<Vote> = Vec::new();
        let mut last_evaluated_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let mut request_builder = self.client.scan().table_name(&self.table_name);

            if let Some(lek) = last_evaluated_key {
                request_builder = request_builder.set_exclusive_start_key(Some(lek));
            }

            let resp = request_builder
                .send()
                .await
                .context(format!("DynamoDB: Failed to scan table '{}'", self.table_name))
                .map_err(RepoError::BackendError)?;

            if let Some(items) = resp.items {
                for item in items {
                    match item_to_vote(&item) {
                        Some(vote) => votes.push(vote),
                        None => {
                            let item_id = item.get("vote_id").and_then(|v| v.as_s().ok());
                            tracing::error!(item.id = ?item_id, table_name = %self.table_name, "DynamoDB: Failed to parse item from scan into Vote");
                            return Err(RepoError::DataCorruption(format!(
                                "DynamoDB: Failed to parse item {:?} during scan of table '{}'",
                                item_id, self.table_name
                            )));
                        }
                    }
                    if votes.len() >= max_items {
                        return Ok(votes);
                    }
                }
            }

            last_evaluated_key = resp.last_evaluated_key;
            if last_evaluated_key.is_none() {
                break;
            }
        }

        Ok(votes)
    }
}

#[derive(Debug, Clone)]
pub struct DynamoDbImageRepository {
    client: DynamoDbClient,
    table_name: String,
}

impl DynamoDbImageRepository {
    /// Creates a new repository instance configured for a specific table.
    pub fn new(client: DynamoDbClient, table_name: String) -> Self {
        info!(%table_name, "Initializing DynamoDbImageRepository");
        Self { client, table_name }
    }
}

#[async_trait]
impl ImageRepository for DynamoDbImageRepository {
    /// Stores an `Image` record in the DynamoDB table using PutItem.
    async fn create(&self, image: &Image) -> Result<(), RepoError> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .item("image_id", AttributeValue::S(image.image_id.to_string()))
            .item("url", AttributeValue::S(image.url.clone()))
            .item("description", AttributeValue::S(image.description.clone()))
            .send()
            .await
            .context(format!("DynamoDB (table: {}): Failed to put image (id: {})", self.table_name, image.image_id))
            .map_err(RepoError::BackendError)?;
        Ok(())
    }

    /// Retrieves an `Image` record from DynamoDB using GetItem.
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Image>, RepoError> {
        let id_str = id.to_string();
        let resp = self.client
            .get_item()
            .table_name(&self.table_name)
            .key("image_id", AttributeValue::S(id_str.clone()))
            .send()
            .await
            .context(format!("DynamoDB (table: {}): Failed to get image (id: {})", self.table_name, id_str))
            .map_err(RepoError::BackendError)?;

        match resp.item {
            Some(item) => match item_to_image(&item) {
                Some(image) => Ok(Some(image)),
                None => {
                    tracing::error!(image_id = %id_str, table_name = %self.table_name, "DynamoDB: Retrieved item but failed to parse into Image");
                    Err(RepoError::DataCorruption(format!(
                        "Failed to parse image data retrieved from DynamoDB table '{}' for id {}",
                        self.table_name, id_str
                    )))
                }
            },
            None => Ok(None), // Item not found is not an error
        }
    }
}

#[derive(Debug, Clone)]
pub struct DynamoDbFlavorRepository {
    client: DynamoDbClient,
    table_name: String,
}

impl DynamoDbFlavorRepository {
    /// Creates a new repository instance configured for a specific table.
    pub fn new(client: DynamoDbClient, table_name: String) -> Self {
        info!(%table_name, "Initializing DynamoDbFlavorRepository");
        Self { client, table_name }
    }
}

#[async_trait]
impl FlavorRepository for DynamoDbFlavorRepository {
    /// Retrieves a `HumorFlavor` from DynamoDB using GetItem.
    async fn get_by_id(&self, id: Uuid) -> Result<Option<HumorFlavor>, RepoError> {
        let id_str = id.to_string();
        let resp = self.client
            .get_item()
            .table_name(&self.table_name)
            .key("flavor_id", AttributeValue::S(id_str.clone()))
            .send()
            .await
            .context(format!("DynamoDB (table: {}): Failed to get flavor (id: {})", self.table_name, id_str))
            .map_err(RepoError::BackendError)?;

        match resp.item {
            Some(item) => match item_to_flavor(&item) {
                Some(flavor) => Ok(Some(flavor)),
                None => {
                    tracing::error!(flavor_id = %id_str, table_name = %self.table_name, "DynamoDB: Retrieved item but failed to parse into HumorFlavor");
                    Err(RepoError::DataCorruption(format!(
                        "Failed to parse flavor data retrieved from DynamoDB table '{}' for id {}",
                        self.table_name, id_str
                    )))
                }
            },
            None => Ok(None),
        }
    }

    /// Lists the whole flavor catalog using Scan. The catalog is a handful
    /// of curated styles, so no read cap applies.
    async fn list_all(&self) -> Result<Vec<HumorFlavor>, RepoError> {
        let mut flavors: Vec<HumorFlavor> = Vec::new();
        let mut last_evaluated_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let mut request_builder = self.client.scan().table_name(&self.table_name);

            if let Some(lek) = last_evaluated_key {
                request_builder = request_builder.set_exclusive_start_key(Some(lek));
            }

            let resp = request_builder
                .send()
                .await
                .context(format!("DynamoDB: Failed to scan table '{}'", self.table_name))
                .map_err(RepoError::BackendError)?;

            if let Some(items) = resp.items {
                for item in items {
                    match item_to_flavor(&item) {
                        Some(flavor) => flavors.push(flavor),
                        None => {
                            let item_id = item.get("flavor_id").and_then(|v| v.as_s().ok());
                            tracing::error!(item.id = ?item_id, table_name = %self.table_name, "DynamoDB: Failed to parse item from scan into HumorFlavor");
                            return Err(RepoError::DataCorruption(format!(
                                "DynamoDB: Failed to parse item {:?} during scan of table '{}'",
                                item_id, self.table_name
                            )));
                        }
                    }
                }
            }

            last_evaluated_key = resp.last_evaluated_key;
            if last_evaluated_key.is_none() {
                break;
            }
        }

        Ok(flavors)
    }
}

fn is_conditional_check_failed(err: &SdkError<UpdateItemError>) -> bool {
    matches!(
        err.as_service_error(),
        Some(UpdateItemError::ConditionalCheckFailedException(_))
    )
}

// Helper functions converting DynamoDB item maps to domain structs.
// They remain internal to this module.

fn item_to_caption(item: &HashMap<String, AttributeValue>) -> Option<Caption> {
    let caption_id = item
        .get("caption_id")?
        .as_s()
        .ok()
        .and_then(|s| Uuid::parse_str(s).ok())?;
    let content = item.get("content")?.as_s().ok()?.to_string();
    let like_count = item.get("like_count")?.as_n().ok()?.parse::<u32>().ok()?;
    let created_at = item
        .get("created_at")?
        .as_s()
        .ok()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())?
        .with_timezone(&Utc);
    // Absent optional attribute -> None; present but malformed -> parse failure.
    let flavor_id = match item.get("flavor_id") {
        Some(v) => Some(Uuid::parse_str(v.as_s().ok()?).ok()?),
        None => None,
    };
    let image_id = match item.get("image_id") {
        Some(v) => Some(Uuid::parse_str(v.as_s().ok()?).ok()?),
        None => None,
    };

    Some(Caption {
        caption_id,
        content,
        like_count,
        created_at,
        flavor_id,
        image_id,
    })
}

fn item_to_vote(item: &HashMap<String, AttributeValue>) -> Option<Vote> {
    let vote_id = item
        .get("vote_id")?
        .as_s()
        .ok()
        .and_then(|s| Uuid::parse_str(s).ok())?;
    let caption_id = item
        .get("caption_id")?
        .as_s()
        .ok()
        .and_then(|s| Uuid::parse_str(s).ok())?;
    let voter_id = item
        .get("voter_id")?
        .as_s()
        .ok()
        .and_then(|s| Uuid::parse_str(s).ok())?;
    let value = item
        .get("value")?
        .as_n()
        .ok()
        .and_then(|n| n.parse::<i8>().ok())
        .and_then(|raw| VoteValue::try_from(raw).ok())?;

    Some(Vote {
        vote_id,
        caption_id,
        voter_id,
        value,
    })
}

fn item_to_image(item: &HashMap<String, AttributeValue>) -> Option<Image> {
    let image_id = item
        .get("image_id")?
        .as_s()
        .ok()
        .and_then(|s| Uuid::parse_str(s).ok())?;
    let url = item.get("url")?.as_s().ok()?.to_string();
    let description = item.get("description")?.as_s().ok()?.to_string();

    Some(Image {
        image_id,
        url,
        description,
    })
}

fn item_to_flavor(item: &HashMap<String, AttributeValue>) -> Option<HumorFlavor> {
    let flavor_id = item
        .get("flavor_id")?
        .as_s()
        .ok()
        .and_then(|s| Uuid::parse_str(s).ok())?;
    let slug = item.get("slug")?.as_s().ok()?.to_string();
    let description = item.get("description")?.as_s().ok()?.to_string();

    Some(HumorFlavor {
        flavor_id,
        slug,
        description,
    })
}
