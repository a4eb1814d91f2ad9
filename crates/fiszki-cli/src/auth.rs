//! Supabase sessions kept in the OS keychain, one entry per CLI profile.

#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::{Mutex, OnceLock};

#[cfg(not(test))]
use keyring::Entry;

use fiszki_core::auth::{AuthResult, SessionPersistence, SupabaseAuthClient};
pub use fiszki_core::auth::{AuthError, AuthSession};
use fiszki_core::config::SupabaseConfig;
use fiszki_core::remote::http_client;

use crate::error::CliError;

#[cfg(not(test))]
const KEYRING_SERVICE_NAME: &str = "fiszki-cli";

#[derive(Clone)]
pub struct SessionStore {
    username: String,
}

impl SessionStore {
    pub fn for_profile(profile_name: &str) -> Self {
        Self {
            username: format!("supabase_session:{profile_name}"),
        }
    }

    #[cfg(test)]
    fn test_store() -> &'static Mutex<HashMap<String, String>> {
        static STORE: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
        STORE.get_or_init(|| Mutex::new(HashMap::new()))
    }

    #[cfg(not(test))]
    fn entry(&self) -> AuthResult<Entry> {
        Entry::new(KEYRING_SERVICE_NAME, &self.username)
            .map_err(|error| AuthError::SessionStorage(error.to_string()))
    }
}

impl SessionPersistence for SessionStore {
    #[cfg(not(test))]
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        match self.entry()?.get_password() {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(AuthError::SessionStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        let guard = Self::test_store()
            .lock()
            .map_err(|error| AuthError::SessionStorage(error.to_string()))?;
        guard
            .get(&self.username)
            .map(|raw| serde_json::from_str(raw))
            .transpose()
            .map_err(AuthError::from)
    }

    #[cfg(not(test))]
    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        let raw = serde_json::to_string(session)?;
        self.entry()?
            .set_password(&raw)
            .map_err(|error| AuthError::SessionStorage(error.to_string()))
    }

    #[cfg(test)]
    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        let raw = serde_json::to_string(session)?;
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| AuthError::SessionStorage(error.to_string()))?;
        guard.insert(self.username.clone(), raw);
        Ok(())
    }

    #[cfg(not(test))]
    fn clear_session(&self) -> AuthResult<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(AuthError::SessionStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn clear_session(&self) -> AuthResult<()> {
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| AuthError::SessionStorage(error.to_string()))?;
        guard.remove(&self.username);
        Ok(())
    }
}

pub type ProfileAuthClient = SupabaseAuthClient<SessionStore>;

/// Auth client for a profile, or `None` when the profile has no Supabase project.
pub fn auth_client(
    profile_name: &str,
    config: Option<&SupabaseConfig>,
) -> Result<Option<ProfileAuthClient>, CliError> {
    let Some(config) = config else {
        return Ok(None);
    };
    let client = http_client()?;
    Ok(Some(SupabaseAuthClient::new(
        config,
        client,
        SessionStore::for_profile(profile_name),
    )))
}

pub fn load_stored_session(profile_name: &str) -> Result<Option<AuthSession>, CliError> {
    SessionStore::for_profile(profile_name)
        .load_session()
        .map_err(|error| CliError::Auth(error.to_string()))
}

pub fn clear_stored_session(profile_name: &str) -> Result<(), CliError> {
    SessionStore::for_profile(profile_name)
        .clear_session()
        .map_err(|error| CliError::Auth(error.to_string()))
}
