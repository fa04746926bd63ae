use crate::{
    domain::IdentityProvider,
    errors::{AppError, UpstreamError},
    AppState,
};
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing;
use uuid::Uuid;

const SERVICE_NAME: &str = "identity-provider";

/// The authenticated caller, as vouched for by the external identity
/// provider. Voter identity for vote records comes from here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
}

/// Client for the external identity provider's userinfo endpoint. The
/// caller's own bearer token is forwarded; this service holds no identity
/// credential of its own.
#[derive(Debug, Clone)]
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct UserInfoResponse {
    user_id: Uuid,
}

impl HttpIdentityProvider {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn resolve(&self, bearer_token: &str) -> Result<Option<Principal>, UpstreamError> {
        let url = format!("{}/userinfo", self.base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(bearer_token)
            .send()
            .await
            .map_err(|source| UpstreamError::Transport {
                service: SERVICE_NAME,
                source,
            })?;

        let status = response.status();
        // 401/403 mean the token is unknown or expired, not that the
        // provider failed.
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Ok(None);
        }
        if !status.is_success() {
            tracing::warn!(%url, status = %status, "Identity provider: Non-success status");
            return Err(UpstreamError::Status {
                service: SERVICE_NAME,
                status: status.as_u16(),
            });
        }

        let body: UserInfoResponse =
            response
                .json()
                .await
                .map_err(|e| UpstreamError::MalformedResponse {
                    service: SERVICE_NAME,
                    detail: e.to_string(),
                })?;

        Ok(Some(Principal {
            user_id: body.user_id,
        }))
    }
}

/// Extractor for routes that demand a signed-in caller. Missing or
/// unresolvable credentials reject with 401; a provider outage surfaces
/// as an upstream failure.
pub struct RequirePrincipal(pub Principal);

/// Extractor for routes where identity only enriches the response. A
/// missing or unusable credential degrades the request to anonymous
/// instead of failing it.
pub struct MaybePrincipal(pub Option<Principal>);

fn bearer_token(parts: &Parts) -> Option<&str> {
    let token = parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?
        .trim();
    if token.is_empty() { None } else { Some(token) }
}

impl FromRequestParts<Arc<AppState>> for RequirePrincipal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthenticated("Missing bearer credential".to_string()))?;

        match state.identity.resolve(token).await? {
            Some(principal) => Ok(RequirePrincipal(principal)),
            None => Err(AppError::Unauthenticated(
                "Credential could not be resolved".to_string(),
            )),
        }
    }
}

impl FromRequestParts<Arc<AppState>> for MaybePrincipal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Ok(MaybePrincipal(None));
        };

        match state.identity.resolve(token).await {
            Ok(principal) => Ok(MaybePrincipal(principal)),
            Err(e) => {
                // Identity is presentation-only on these routes; a provider
                // hiccup downgrades the caller to anonymous.
                tracing::warn!(error = %e, "Identity resolution failed; treating caller as anonymous");
                Ok(MaybePrincipal(None))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_auth(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/captions");
        if let Some(v) = value {
            builder = builder.header(header::AUTHORIZATION, v);
        }
        let (parts, _) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[test]
    fn extracts_token_from_bearer_header() {
        let parts = parts_with_auth(Some("Bearer abc123"));
        assert_eq!(bearer_token(&parts), Some("abc123"));
    }

    #[test]
    fn missing_header_yields_no_token() {
        let parts = parts_with_auth(None);
        assert_eq!(bearer_token(&parts), None);
    }

    #[test]
    fn other_auth_schemes_yield_no_token() {
        let parts = parts_with_auth(Some("Basic dXNlcjpwdw=="));
        assert_eq!(bearer_token(&parts), None);
    }

    #[test]
    fn blank_token_yields_no_token() {
        let parts = parts_with_auth(Some("Bearer   "));
        assert_eq!(bearer_token(&parts), None);
    }
}
