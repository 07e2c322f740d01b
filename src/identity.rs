//! Signed-in user identity.
//!
//! The sign-in provider is an injected [`IdentityProvider`]; this module only
//! decodes the credential it hands back. Tokens come straight from the
//! provider's own first-party flow, so the signature is not verified here.

use crate::config::AppConfig;
use crate::error::{GenEditError, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};

/// The signed-in user. Claims missing from the credential are left empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Avatar URL.
    pub picture: String,
}

/// Decodes the payload of a JWT credential into a [`UserProfile`].
pub fn decode_credential(token: &str) -> Result<UserProfile> {
    let payload = token
        .split('.')
        .nth(1)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| GenEditError::Decode("credential is not a JWT".into()))?;

    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| GenEditError::Decode(format!("credential payload: {e}")))?;

    Ok(serde_json::from_slice(&bytes)?)
}

/// A sign-in service (e.g., a browser identity script).
pub trait IdentityProvider {
    /// Prepares the provider for `client_id`.
    fn initialize(&mut self, client_id: &str) -> Result<()>;

    /// Stops the provider from silently re-selecting the last account.
    fn disable_auto_select(&mut self);

    /// Releases anything `initialize` set up.
    fn teardown(&mut self) {}
}

/// A sign-in session bound to one provider.
pub struct Session<P: IdentityProvider> {
    provider: P,
    user: Option<UserProfile>,
}

impl<P: IdentityProvider> Session<P> {
    /// Initializes `provider` with the configured client id.
    pub fn start(config: &AppConfig, mut provider: P) -> Result<Self> {
        provider.initialize(&config.google_client_id)?;
        Ok(Self {
            provider,
            user: None,
        })
    }

    /// Handles a credential returned by the provider.
    ///
    /// An undecodable credential leaves the session signed out.
    pub fn handle_credential(&mut self, token: &str) -> Result<&UserProfile> {
        match decode_credential(token) {
            Ok(profile) => {
                tracing::debug!(email = %profile.email, "signed in");
                Ok(self.user.insert(profile))
            }
            Err(e) => {
                tracing::warn!("failed to decode credential: {e}");
                Err(e)
            }
        }
    }

    /// The signed-in user, if any.
    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    /// Signs out and disables automatic account re-selection.
    pub fn sign_out(&mut self) {
        self.user = None;
        self.provider.disable_auto_select();
    }

    /// Access to the provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }
}

impl<P: IdentityProvider> Drop for Session<P> {
    fn drop(&mut self) {
        self.provider.teardown();
    }
}
