//! Bearer-token authentication.
//!
//! Tally never issues or checks passwords itself. A token is handed to an
//! [`IdentityProvider`] which answers with the identity it belongs to; the
//! identity id must then match a provisioned row in the users table.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tally_core::User;
use tally_finance::admin;

use crate::config::{IdentityProviderKind, IdentitySection};
use crate::error::ApiError;
use crate::server::AppState;

/// What the identity service knows about a token holder
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Identity {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` means the service rejected the token
    async fn verify(&self, token: &str) -> Result<Option<Identity>>;
}

/// Hosted identity service exposing `GET {base_url}/auth/v1/user`
pub struct RemoteIdentity {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl RemoteIdentity {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl IdentityProvider for RemoteIdentity {
    async fn verify(&self, token: &str) -> Result<Option<Identity>> {
        let mut req = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .bearer_auth(token);
        if let Some(key) = &self.api_key {
            req = req.header("apikey", key);
        }

        let resp = req.send().await.context("identity service request")?;
        let status = resp.status();
        if !status.is_success() {
            if status != StatusCode::UNAUTHORIZED && status != StatusCode::FORBIDDEN {
                tracing::warn!(%status, "identity service rejected token lookup");
            }
            return Ok(None);
        }
        let identity = resp.json::<Identity>().await.context("decode identity")?;
        Ok(Some(identity))
    }
}

/// Fixed token table from config
pub struct StaticIdentity {
    tokens: BTreeMap<String, String>,
}

impl StaticIdentity {
    pub fn new(tokens: BTreeMap<String, String>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn verify(&self, token: &str) -> Result<Option<Identity>> {
        Ok(self.tokens.get(token).map(|id| Identity {
            id: id.clone(),
            email: None,
        }))
    }
}

pub fn provider_from_config(section: &IdentitySection) -> Result<Arc<dyn IdentityProvider>> {
    match section.provider {
        IdentityProviderKind::Remote => {
            let Some(url) = &section.base_url else {
                bail!("identity.base_url is required for provider = \"remote\"");
            };
            Ok(Arc::new(RemoteIdentity::new(url.clone(), section.api_key.clone())))
        }
        IdentityProviderKind::Static => {
            if section.tokens.is_empty() {
                tracing::warn!("static identity provider has no tokens; every request will be rejected");
            }
            Ok(Arc::new(StaticIdentity::new(section.tokens.clone())))
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Any signed-in user with a provisioned account
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or(ApiError::Unauthorized("Missing or invalid authorization header"))?;

        let identity = match state.identity.verify(token).await {
            Ok(Some(identity)) => identity,
            Ok(None) => return Err(ApiError::Unauthorized("Invalid token")),
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "token verification failed");
                return Err(ApiError::Unauthorized("Invalid token"));
            }
        };

        let user = admin::get_user(&state.store, &identity.id)?
            .ok_or(ApiError::Unauthorized("User not found"))?;
        Ok(AuthUser(user))
    }
}

/// A signed-in user whose role is admin
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.role.is_admin() {
            return Err(ApiError::Forbidden("Admin access required"));
        }
        Ok(AdminUser(user))
    }
}
