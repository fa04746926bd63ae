use crate::{domain::CaptionGenerator, errors::UpstreamError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing;

const SERVICE_NAME: &str = "caption-api";

/// Client for the external inference service that writes caption text.
/// Authenticates with the platform's service token, not the caller's.
#[derive(Debug, Clone)]
pub struct HttpCaptionGenerator {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    image_url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    style: Option<&'a str>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    caption: String,
}

impl HttpCaptionGenerator {
    pub fn new(client: reqwest::Client, base_url: String, api_token: String) -> Self {
        Self {
            client,
            base_url,
            api_token,
        }
    }
}

#[async_trait]
impl CaptionGenerator for HttpCaptionGenerator {
    async fn generate(
        &self,
        image_url: &str,
        style: Option<&str>,
    ) -> Result<String, UpstreamError> {
        let url = format!("{}/generations", self.base_url);
        tracing::debug!(%url, ?style, "Caption API: Requesting caption");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&GenerateRequest { image_url, style })
            .send()
            .await
            .map_err(|source| UpstreamError::Transport {
                service: SERVICE_NAME,
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%url, status = %status, "Caption API: Non-success status");
            return Err(UpstreamError::Status {
                service: SERVICE_NAME,
                status: status.as_u16(),
            });
        }

        let body: GenerateResponse =
            response
                .json()
                .await
                .map_err(|e| UpstreamError::MalformedResponse {
                    service: SERVICE_NAME,
                    detail: e.to_string(),
                })?;

        let caption = body.caption.trim().to_string();
        if caption.is_empty() {
            return Err(UpstreamError::MalformedResponse {
                service: SERVICE_NAME,
                detail: "caption text was empty".to_string(),
            });
        }

        tracing::debug!(%url, "Caption API: Caption received");
        Ok(caption)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_omits_style_when_not_requested() {
        let body = serde_json::to_value(GenerateRequest {
            image_url: "http://media.test/uploads/a.png",
            style: None,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"image_url": "http://media.test/uploads/a.png"})
        );
    }

    #[test]
    fn request_body_carries_style_slug_when_requested() {
        let body = serde_json::to_value(GenerateRequest {
            image_url: "http://media.test/uploads/a.png",
            style: Some("deadpan"),
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"image_url": "http://media.test/uploads/a.png", "style": "deadpan"})
        );
    }
}
