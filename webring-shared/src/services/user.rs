/// User operations: registration, profile updates and login sessions
///
/// Registration and profile updates share one ordered check sequence:
///
/// ```text
/// normalise + validate email  ->  email unique?
/// normalise + validate username  ->  username unique?
/// (register only) password policy  ->  hash  ->  persist  ->  email (detached)
/// ```
///
/// Email is always checked before username, so a request colliding on both
/// reports `EmailNotUnique`. Format and uniqueness checks run before the
/// (expensive) password hash is computed.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password, PasswordError, PasswordPolicy};
use crate::auth::session::{generate_session_token, hash_session_token};
use crate::error::{DomainError, DomainResult};
use crate::mail::Mailer;
use crate::models::{
    session::{CreateSession, Session},
    user::{CreateUser, UpdateUser, User},
};
use crate::store::{Store, UserLookup};
use crate::validation::{
    normalise_email_address, normalise_username, validate_email_address, validate_new_password,
    validate_username,
};

/// Default lifetime of a login session
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 7;

/// A freshly created login session
///
/// `token` is only available here; the store keeps its hash.
#[derive(Debug, Clone)]
pub struct LoginSession {
    pub token: String,
    pub session: Session,
    pub user: User,
}

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
    mailer: Arc<dyn Mailer>,
    password_policy: PasswordPolicy,
    session_ttl: Duration,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            store,
            mailer,
            password_policy: PasswordPolicy::default(),
            session_ttl: Duration::hours(DEFAULT_SESSION_TTL_HOURS),
        }
    }

    pub fn with_password_policy(mut self, policy: PasswordPolicy) -> Self {
        self.password_policy = policy;
        self
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Looks a user up by id, username or email
    ///
    /// Username and email are normalised first, so lookups are
    /// case-insensitive. `None` is a normal outcome.
    pub async fn get_user(&self, lookup: UserLookup<'_>) -> DomainResult<Option<User>> {
        let user = match lookup {
            UserLookup::Id(id) => self.store.find_user(UserLookup::Id(id)).await?,
            UserLookup::Username(username) => {
                let username = normalise_username(username);
                self.store.find_user(UserLookup::Username(&username)).await?
            }
            UserLookup::Email(email) => {
                let email = normalise_email_address(email);
                self.store.find_user(UserLookup::Email(&email)).await?
            }
        };
        Ok(user)
    }

    /// Registers a new user and sends the registration email
    ///
    /// # Errors
    ///
    /// - `Validation` for a malformed email or username, or a weak password
    /// - `EmailNotUnique` / `UsernameNotUnique` on collisions, email first
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> DomainResult<User> {
        let email = normalise_email_address(email);
        validate_email_address(&email)?;

        if self.store.find_user(UserLookup::Email(&email)).await?.is_some() {
            return Err(DomainError::EmailNotUnique);
        }

        let username = normalise_username(username);
        validate_username(&username)?;

        if self
            .store
            .find_user(UserLookup::Username(&username))
            .await?
            .is_some()
        {
            return Err(DomainError::UsernameNotUnique);
        }

        validate_new_password(password, &self.password_policy)?;

        let password_hash = hash_blocking(password.to_owned()).await?;

        let user = self
            .store
            .insert_user(CreateUser {
                username,
                email,
                password_hash,
            })
            .await?;

        info!(user_id = %user.id, username = %user.username, "New user registered");

        self.dispatch_registration_email(user.clone());

        Ok(user)
    }

    /// Replaces a user's username and email
    ///
    /// A user never conflicts with their own record, so resubmitting the
    /// current values succeeds.
    ///
    /// # Errors
    ///
    /// - `UserNotFound` if `user_id` does not resolve
    /// - otherwise the same errors as `register`, minus the password checks
    pub async fn update_user(
        &self,
        user_id: Uuid,
        username: &str,
        email: &str,
    ) -> DomainResult<User> {
        if self.store.find_user(UserLookup::Id(user_id)).await?.is_none() {
            return Err(DomainError::UserNotFound(user_id));
        }

        let email = normalise_email_address(email);
        validate_email_address(&email)?;

        let existing = self.store.find_user(UserLookup::Email(&email)).await?;
        if existing.is_some_and(|other| other.id != user_id) {
            return Err(DomainError::EmailNotUnique);
        }

        let username = normalise_username(username);
        validate_username(&username)?;

        let existing = self.store.find_user(UserLookup::Username(&username)).await?;
        if existing.is_some_and(|other| other.id != user_id) {
            return Err(DomainError::UsernameNotUnique);
        }

        let user = self
            .store
            .update_user(user_id, UpdateUser { username, email })
            .await?
            .ok_or(DomainError::UserNotFound(user_id))?;

        info!(user_id = %user.id, username = %user.username, "Updated user");

        Ok(user)
    }

    /// Verifies credentials and opens a session
    ///
    /// `identifier` is a username or, if it contains `@`, an email address.
    /// Unknown users and wrong passwords fail identically with
    /// `InvalidCredentials`.
    pub async fn login(&self, identifier: &str, password: &str) -> DomainResult<LoginSession> {
        let lookup_key;
        let lookup = if identifier.contains('@') {
            lookup_key = normalise_email_address(identifier);
            UserLookup::Email(&lookup_key)
        } else {
            lookup_key = normalise_username(identifier);
            UserLookup::Username(&lookup_key)
        };

        let user = self
            .store
            .find_user(lookup)
            .await?
            .ok_or(DomainError::InvalidCredentials)?;

        let valid = verify_blocking(password.to_owned(), user.password_hash.clone()).await?;
        if !valid {
            debug!(user_id = %user.id, "Rejected login with wrong password");
            return Err(DomainError::InvalidCredentials);
        }

        let (token, token_hash) = generate_session_token();
        let session = self
            .store
            .insert_session(CreateSession {
                user_id: user.id,
                token_hash,
                expires_at: Utc::now() + self.session_ttl,
            })
            .await?;

        info!(user_id = %user.id, session_id = %session.id, "User logged in");

        Ok(LoginSession {
            token,
            session,
            user,
        })
    }

    /// Resolves a bearer token to its user
    ///
    /// Expired sessions are deleted when encountered.
    pub async fn authenticate(&self, token: &str) -> DomainResult<User> {
        let token_hash = hash_session_token(token);
        let session = self
            .store
            .find_session(&token_hash)
            .await?
            .ok_or(DomainError::InvalidCredentials)?;

        if session.is_expired(Utc::now()) {
            self.store.delete_session(&token_hash).await?;
            debug!(session_id = %session.id, "Removed expired session");
            return Err(DomainError::InvalidCredentials);
        }

        self.store
            .find_user(UserLookup::Id(session.user_id))
            .await?
            .ok_or(DomainError::InvalidCredentials)
    }

    /// Ends the session for this token; unknown tokens are ignored
    pub async fn logout(&self, token: &str) -> DomainResult<()> {
        let removed = self.store.delete_session(&hash_session_token(token)).await?;
        debug!(removed, "Logout");
        Ok(())
    }

    /// Deletes every expired session, returning how many were removed
    pub async fn purge_expired_sessions(&self) -> DomainResult<u64> {
        let removed = self.store.delete_expired_sessions(Utc::now()).await?;
        if removed > 0 {
            info!(removed, "Purged expired sessions");
        }
        Ok(removed)
    }

    fn dispatch_registration_email(&self, user: User) {
        let mailer = Arc::clone(&self.mailer);
        tokio::spawn(async move {
            if let Err(e) = mailer.send_registration_email(&user).await {
                warn!(user_id = %user.id, error = %e, "Failed to send registration email");
            }
        });
    }
}

/// Argon2 is CPU-bound; keep it off the async worker threads
async fn hash_blocking(password: String) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| PasswordError::HashError(e.to_string()))?
}

async fn verify_blocking(password: String, hash: String) -> Result<bool, PasswordError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| PasswordError::VerifyError(e.to_string()))?
}
