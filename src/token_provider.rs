//! The `TokenProvider` port (§6.2)
//!
//! OAuth2 flows themselves are out of scope (§1); this module fixes the
//! interface and the engine's default refresh-then-reauthenticate
//! sequencing only.

use async_trait::async_trait;
use std::time::SystemTime;

/// Opaque auth configuration handed to a `TokenProvider`; concrete shape is
/// backend-specific, so it is carried as an untyped JSON value here.
pub type AuthConfig = serde_json::Value;

/// A token set as returned by a `TokenProvider`
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct TokenSet {
	pub access_token: String,
	pub refresh_token: Option<String>,
	pub expires_at: SystemTime,
	pub token_type: String,
	pub user_id: Option<String>,
}

impl TokenSet {
	pub fn is_expired(&self, now: SystemTime) -> bool {
		now >= self.expires_at
	}
}

#[async_trait]
pub trait TokenProvider: Send + Sync {
	async fn authenticate(
		&self,
		config: &AuthConfig,
	) -> Result<TokenSet, crate::error::SharpSyncError>;

	async fn refresh_token(
		&self,
		config: &AuthConfig,
		refresh_token: &str,
	) -> Result<TokenSet, crate::error::SharpSyncError>;

	async fn validate_token(&self, token: &TokenSet) -> Result<bool, crate::error::SharpSyncError>;
}

/// The engine's default auth path (§6.2): if the current token (if any) has
/// expired, try to refresh it; if refresh fails (or there is no token yet),
/// re-authenticate from scratch.
pub async fn ensure_authenticated(
	provider: &dyn TokenProvider,
	config: &AuthConfig,
	current: Option<&TokenSet>,
	now: SystemTime,
) -> Result<TokenSet, crate::error::SharpSyncError> {
	match current {
		Some(token) if !token.is_expired(now) => Ok(token.clone()),
		Some(token) if token.refresh_token.is_some() => {
			let refresh_token = token.refresh_token.clone().unwrap();
			match provider.refresh_token(config, &refresh_token).await {
				Ok(refreshed) => Ok(refreshed),
				Err(_) => provider.authenticate(config).await,
			}
		}
		_ => provider.authenticate(config).await,
	}
}


// vim: ts=4
