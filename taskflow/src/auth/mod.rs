//! User accounts and sign-in.
//!
//! Every checklist and category is partitioned by `user_id`, so a session
//! must resolve a signed-in user before any store traffic starts.
//! [`LocalAuthProvider`] keeps salted password digests in a JSON file next
//! to the client config; the [`AuthProvider`] trait is the seam a hosted
//! identity backend would plug into. Auth state changes broadcast over a
//! watch channel so the UI can react without polling.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::watch;
use uuid::Uuid;

/// Minimum accepted password length in characters.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Errors from account operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Email or password did not match a known account.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// An account with this email already exists.
    #[error("account already exists: {0}")]
    AccountExists(String),
    /// Password shorter than [`MIN_PASSWORD_LENGTH`].
    #[error("password too short (min {0} characters)")]
    PasswordTooShort(usize),
    /// The email address is not plausibly shaped.
    #[error("invalid email address: {0:?}")]
    InvalidEmail(String),
    /// The named federated identity provider is not available.
    #[error("identity provider not supported: {0:?}")]
    UnsupportedProvider(String),
    /// The password reset token did not match or was already used.
    #[error("invalid password reset token")]
    InvalidResetToken,
    /// The accounts file could not be read or written.
    #[error("accounts file error: {0}")]
    Storage(String),
}

/// The signed-in user as seen by the rest of the app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Stable account id; partition key for all documents.
    pub user_id: String,
    /// Sign-in email, stored lowercase.
    pub email: String,
    /// Name shown in the status bar.
    pub display_name: String,
}

/// Identity backend seam.
///
/// Implementations own account storage and credential checks; the app only
/// ever sees [`UserProfile`] values and the watch channel.
pub trait AuthProvider: Send {
    /// Creates an account and signs it in.
    ///
    /// # Errors
    ///
    /// Fails on malformed email, short password, or an existing account.
    fn sign_up(
        &mut self,
        email: &str,
        display_name: &str,
        password: &str,
    ) -> Result<UserProfile, AuthError>;

    /// Signs in with existing credentials.
    ///
    /// # Errors
    ///
    /// Fails with [`AuthError::InvalidCredentials`] on any mismatch; whether
    /// the email or the password was wrong is not distinguished.
    fn sign_in(&mut self, email: &str, password: &str) -> Result<UserProfile, AuthError>;

    /// Signs in through a federated identity provider.
    ///
    /// # Errors
    ///
    /// Fails with [`AuthError::UnsupportedProvider`] when the backend has no
    /// such integration.
    fn sign_in_with_provider(&mut self, provider: &str) -> Result<UserProfile, AuthError>;

    /// Starts a password reset for the account with this email.
    ///
    /// # Errors
    ///
    /// Fails when no such account exists or the reset cannot be delivered.
    fn send_password_reset(&mut self, email: &str) -> Result<(), AuthError>;

    /// Signs the current user out.
    fn sign_out(&mut self);

    /// The signed-in user, if any.
    fn current(&self) -> Option<&UserProfile>;

    /// Watch channel carrying the auth state.
    fn watch(&self) -> watch::Receiver<Option<UserProfile>>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Account {
    user_id: String,
    email: String,
    display_name: String,
    /// Hex-encoded random salt.
    salt: String,
    /// Hex-encoded SHA-256 of salt bytes followed by the password bytes.
    digest: String,
    /// Outstanding password reset token, single use.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reset_token: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AccountsFile {
    accounts: Vec<Account>,
}

/// File-backed identity provider with salted SHA-256 password digests.
pub struct LocalAuthProvider {
    /// Keyed by lowercase email.
    accounts: HashMap<String, Account>,
    path: Option<PathBuf>,
    current: Option<UserProfile>,
    state_tx: watch::Sender<Option<UserProfile>>,
}

impl LocalAuthProvider {
    /// Creates a provider with no backing file. Accounts live only for the
    /// process lifetime; used in tests.
    #[must_use]
    pub fn in_memory() -> Self {
        let (state_tx, _) = watch::channel(None);
        Self {
            accounts: HashMap::new(),
            path: None,
            current: None,
            state_tx,
        }
    }

    /// Loads (or initializes) the accounts file at `path`.
    ///
    /// # Errors
    ///
    /// Fails when an existing file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, AuthError> {
        let mut provider = Self::in_memory();
        provider.path = Some(path.to_path_buf());
        if path.exists() {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| AuthError::Storage(format!("read {}: {e}", path.display())))?;
            let file: AccountsFile = serde_json::from_str(&raw)
                .map_err(|e| AuthError::Storage(format!("parse {}: {e}", path.display())))?;
            for account in file.accounts {
                provider.accounts.insert(account.email.clone(), account);
            }
        }
        Ok(provider)
    }

    fn persist(&self) -> Result<(), AuthError> {
        let Some(ref path) = self.path else {
            return Ok(());
        };
        let mut accounts: Vec<Account> = self.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| a.email.cmp(&b.email));
        let raw = serde_json::to_string_pretty(&AccountsFile { accounts })
            .map_err(|e| AuthError::Storage(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AuthError::Storage(format!("create {}: {e}", parent.display())))?;
        }
        std::fs::write(path, raw)
            .map_err(|e| AuthError::Storage(format!("write {}: {e}", path.display())))
    }

    /// Completes a password reset: the token must match the outstanding one
    /// for the account and is consumed on success.
    ///
    /// # Errors
    ///
    /// Fails on an unknown account, a wrong or spent token, or a too-short
    /// new password.
    pub fn reset_password(
        &mut self,
        email: &str,
        token: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let email = normalize_email(email).map_err(|_| AuthError::InvalidCredentials)?;
        if new_password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::PasswordTooShort(MIN_PASSWORD_LENGTH));
        }
        let account = self
            .accounts
            .get_mut(&email)
            .ok_or(AuthError::InvalidCredentials)?;
        if account.reset_token.as_deref() != Some(token) {
            return Err(AuthError::InvalidResetToken);
        }
        account.reset_token = None;
        account.salt = hex::encode(Uuid::now_v7().as_bytes());
        account.digest = digest_password(&account.salt, new_password);
        self.persist()?;
        tracing::info!(email, "password reset completed");
        Ok(())
    }

    /// The outstanding reset token for an account, if one was issued.
    #[must_use]
    pub fn pending_reset_token(&self, email: &str) -> Option<&str> {
        let email = normalize_email(email).ok()?;
        self.accounts.get(&email)?.reset_token.as_deref()
    }

    fn set_current(&mut self, profile: Option<UserProfile>) {
        self.current.clone_from(&profile);
        let _ = self.state_tx.send(profile);
    }
}

impl AuthProvider for LocalAuthProvider {
    fn sign_up(
        &mut self,
        email: &str,
        display_name: &str,
        password: &str,
    ) -> Result<UserProfile, AuthError> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::PasswordTooShort(MIN_PASSWORD_LENGTH));
        }
        if self.accounts.contains_key(&email) {
            return Err(AuthError::AccountExists(email));
        }
        let salt = hex::encode(Uuid::now_v7().as_bytes());
        let account = Account {
            user_id: Uuid::now_v7().to_string(),
            email: email.clone(),
            display_name: display_name.trim().to_string(),
            digest: digest_password(&salt, password),
            salt,
            reset_token: None,
        };
        let profile = UserProfile {
            user_id: account.user_id.clone(),
            email: account.email.clone(),
            display_name: account.display_name.clone(),
        };
        self.accounts.insert(email, account);
        self.persist()?;
        tracing::info!(user_id = %profile.user_id, "account created");
        self.set_current(Some(profile.clone()));
        Ok(profile)
    }

    fn sign_in(&mut self, email: &str, password: &str) -> Result<UserProfile, AuthError> {
        let email = normalize_email(email).map_err(|_| AuthError::InvalidCredentials)?;
        let Some(account) = self.accounts.get(&email) else {
            return Err(AuthError::InvalidCredentials);
        };
        if digest_password(&account.salt, password) != account.digest {
            return Err(AuthError::InvalidCredentials);
        }
        let profile = UserProfile {
            user_id: account.user_id.clone(),
            email: account.email.clone(),
            display_name: account.display_name.clone(),
        };
        tracing::info!(user_id = %profile.user_id, "signed in");
        self.set_current(Some(profile.clone()));
        Ok(profile)
    }

    fn sign_in_with_provider(&mut self, provider: &str) -> Result<UserProfile, AuthError> {
        // Local accounts only; a hosted backend would dispatch here.
        Err(AuthError::UnsupportedProvider(provider.to_string()))
    }

    fn send_password_reset(&mut self, email: &str) -> Result<(), AuthError> {
        let email = normalize_email(email).map_err(|_| AuthError::InvalidCredentials)?;
        let token = hex::encode(Uuid::now_v7().as_bytes());
        let account = self
            .accounts
            .get_mut(&email)
            .ok_or(AuthError::InvalidCredentials)?;
        account.reset_token = Some(token);
        self.persist()?;
        // No mail transport locally; the token is surfaced through the log.
        tracing::info!(email, "password reset token issued");
        Ok(())
    }

    fn sign_out(&mut self) {
        if let Some(ref profile) = self.current {
            tracing::info!(user_id = %profile.user_id, "signed out");
        }
        self.set_current(None);
    }

    fn current(&self) -> Option<&UserProfile> {
        self.current.as_ref()
    }

    fn watch(&self) -> watch::Receiver<Option<UserProfile>> {
        self.state_tx.subscribe()
    }
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    let Some((local, domain)) = email.split_once('@') else {
        return Err(AuthError::InvalidEmail(email));
    };
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(AuthError::InvalidEmail(email));
    }
    Ok(email)
}

fn digest_password(salt_hex: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt_hex.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}
