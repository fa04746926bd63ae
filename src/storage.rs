use crate::{
    domain::{MediaStorage, PresignedUpload},
    errors::StorageError,
};
use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_s3::{presigning::PresigningConfig, Client as S3Client};
use std::time::Duration;
use tracing;

#[derive(Debug, Clone)]
pub struct S3MediaStorage {
    client: S3Client,
    bucket_name: String,
    upload_ttl_secs: u64,
    public_base_url: String,
}

impl S3MediaStorage {
    pub fn new(
        client: S3Client,
        bucket_name: String,
        region: &str,
        endpoint_override: Option<&str>,
        upload_ttl_secs: u64,
    ) -> Self {
        // LocalStack serves buckets path-style off the override endpoint;
        // real S3 serves them in the virtual-hosted form.
        let public_base_url = match endpoint_override {
            Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), bucket_name),
            None => format!("https://{}.s3.{}.amazonaws.com", bucket_name, region),
        };
        Self {
            client,
            bucket_name,
            upload_ttl_secs,
            public_base_url,
        }
    }
}

#[async_trait]
impl MediaStorage for S3MediaStorage {
    /// Presigns a PutObject request so the client can upload directly to S3.
    /// The signature covers the Content-Type header, so the client must send
    /// exactly the type it registered with.
    async fn presign_upload(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<PresignedUpload, StorageError> {
        tracing::debug!(s3_key = %key, bucket = %self.bucket_name, %content_type, "S3: Presigning upload URL");

        let presign_config = PresigningConfig::expires_in(Duration::from_secs(self.upload_ttl_secs))
            .map_err(|e| StorageError::PresignFailed {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type(content_type)
            .presigned(presign_config)
            .await
            .context(format!("S3: Failed to presign upload for key '{}'", key))
            .map_err(StorageError::BackendError)?;

        tracing::debug!(s3_key = %key, bucket = %self.bucket_name, "S3: Presign successful");
        Ok(PresignedUpload {
            url: presigned.uri().to_string(),
            expires_in_secs: self.upload_ttl_secs,
        })
    }

    /// Public URL the object is readable from once the client completes the
    /// upload. No request is made; this is pure string assembly.
    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::config::BehaviorVersion;

    fn test_client() -> S3Client {
        let conf = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .build();
        S3Client::from_conf(conf)
    }

    #[test]
    fn object_url_uses_virtual_hosted_form_without_override() {
        let storage = S3MediaStorage::new(
            test_client(),
            "caption-media".to_string(),
            "ca-central-1",
            None,
            900,
        );
        assert_eq!(
            storage.object_url("uploads/abc.png"),
            "https://caption-media.s3.ca-central-1.amazonaws.com/uploads/abc.png"
        );
    }

    #[test]
    fn object_url_uses_path_style_against_endpoint_override() {
        let storage = S3MediaStorage::new(
            test_client(),
            "caption-media".to_string(),
            "ca-central-1",
            Some("http://localhost:4566/"),
            900,
        );
        assert_eq!(
            storage.object_url("uploads/abc.png"),
            "http://localhost:4566/caption-media/uploads/abc.png"
        );
    }
}
