use crate::auth::Principal;
use crate::errors::{RepoError, StorageError, UpstreamError};
use crate::models::{Caption, HumorFlavor, Image, Vote};
use async_trait::async_trait;
use uuid::Uuid;

/// Persistence operations for caption records.
#[async_trait]
pub trait CaptionRepository: Send + Sync + 'static {
    // Send+Sync+'static required for Arc<dyn>
    /// Stores a freshly generated caption.
    async fn create(&self, caption: &Caption) -> Result<(), RepoError>;

    /// Lists captions, reading at most `max_items` records from the store.
    /// Listing and analytics post-process the bounded batch in memory.
    async fn list(&self, max_items: usize) -> Result<Vec<Caption>, RepoError>;

    /// Atomically bumps a caption's like counter and returns the new count.
    /// Fails with `RepoError::NotFound` when no such caption exists.
    async fn increment_likes(&self, id: Uuid) -> Result<u32, RepoError>;
}

/// Persistence operations for votes, keyed by (caption, voter).
#[async_trait]
pub trait VoteRepository: Send + Sync + 'static {
    /// Fetches the pair's vote, if one has been cast.
    async fn get(&self, caption_id: Uuid, voter_id: Uuid) -> Result<Option<Vote>, RepoError>;

    /// Creates or replaces the pair's vote. The composite key guarantees at
    /// most one record per (caption, voter), so a revote overwrites in place.
    async fn put(&self, vote: &Vote) -> Result<(), RepoError>;

    /// All votes cast on one caption, reading at most `max_items` records.
    async fn list_for_caption(
        &self,
        caption_id: Uuid,
        max_items: usize,
    ) -> Result<Vec<Vote>, RepoError>;

    /// All votes platform-wide, reading at most `max_items` records.
    async fn list_all(&self, max_items: usize) -> Result<Vec<Vote>, RepoError>;
}

/// Persistence operations for registered image metadata.
#[async_trait]
pub trait ImageRepository: Send + Sync + 'static {
    async fn create(&self, image: &Image) -> Result<(), RepoError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Image>, RepoError>;
}

/// Read access to the humor flavor catalog. The catalog stays small (a
/// handful of curated styles), so listing it is unbounded.
#[async_trait]
pub trait FlavorRepository: Send + Sync + 'static {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<HumorFlavor>, RepoError>;

    async fn list_all(&self) -> Result<Vec<HumorFlavor>, RepoError>;
}

/// A minted upload URL. The client PUTs the bytes straight to object
/// storage; this service never proxies file data.
#[derive(Debug, Clone)]
pub struct PresignedUpload {
    pub url: String,
    pub expires_in_secs: u64,
}

/// Object storage operations for uploaded media.
#[async_trait]
pub trait MediaStorage: Send + Sync + 'static {
    /// Mints a presigned PUT URL for `key`, bound to the given content type.
    async fn presign_upload(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<PresignedUpload, StorageError>;

    /// Public URL the object is readable from once the upload completes.
    fn object_url(&self, key: &str) -> String;
}

/// The external inference API that writes caption text for an image.
#[async_trait]
pub trait CaptionGenerator: Send + Sync + 'static {
    /// Produces caption text for the image at `image_url`, optionally steered
    /// by a humor style slug.
    async fn generate(&self, image_url: &str, style: Option<&str>)
        -> Result<String, UpstreamError>;
}

/// The external identity service that stands behind bearer credentials.
#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    /// Resolves a bearer token to a principal. `Ok(None)` means the token is
    /// unknown or expired; `Err` means the provider itself misbehaved.
    async fn resolve(&self, bearer_token: &str) -> Result<Option<Principal>, UpstreamError>;
}
