//! Static token resolution: a registered map of bearer tokens to claims.
//!
//! Stands in for a real identity provider in demos and tests. Expiry is
//! enforced here; clinic affiliation is joined from the user record at
//! resolution time, never read from the token.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use vetdesk_core::error::{AuthError, VetdeskError};
use vetdesk_core::ports::UserStore;
use vetdesk_core::principal::{Claims, Principal, PrincipalProvider};

pub struct StaticTokenProvider {
    users: Arc<dyn UserStore>,
    tokens: RwLock<HashMap<String, Claims>>,
}

impl StaticTokenProvider {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self {
            users,
            tokens: RwLock::new(HashMap::new()),
        }
    }

    /// Register a bearer token for the given claims.
    pub async fn issue(&self, token: impl Into<String>, claims: Claims) {
        let mut tokens = self.tokens.write().await;
        tokens.insert(token.into(), claims);
    }
}

#[async_trait]
impl PrincipalProvider for StaticTokenProvider {
    async fn resolve(&self, token: &str) -> Result<Principal, VetdeskError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken.into());
        }
        let claims = {
            let tokens = self.tokens.read().await;
            tokens.get(token).cloned()
        };
        let claims = claims.ok_or(AuthError::BadSignature)?;
        if claims.expired_at(Utc::now()) {
            return Err(AuthError::Expired.into());
        }
        let principal = Principal::from_claims(&claims)?;
        let clinic_id = self
            .users
            .find(&principal.user_id)
            .await?
            .and_then(|u| u.clinic_id);
        Ok(principal.with_clinic(clinic_id))
    }
}
