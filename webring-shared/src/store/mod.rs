/// Data-access adapter
///
/// `Store` is the single seam between the domain services and persistence:
/// save, find-by-field and delete over users, webrings, sites, tags and
/// sessions. Two implementations ship with the crate:
///
/// - `PgStore`: PostgreSQL through the `models` functions
/// - `MemoryStore`: process-local maps, for tests and local development
///
/// Both enforce the same unique and foreign key constraints and report
/// violations as `StoreError::Conflict` / `StoreError::MissingReference`
/// carrying the constraint name (see `constraints`).
/// The services' check-then-insert lookups are only an early exit; these
/// constraints are what actually guarantee uniqueness under concurrent writers.
///
/// # Example
///
/// ```
/// use webring_shared::store::{MemoryStore, Store, UserLookup};
///
/// # async fn example() -> Result<(), webring_shared::store::StoreError> {
/// let store = MemoryStore::new();
/// let user = store.find_user(UserLookup::Username("alice")).await?;
/// assert!(user.is_none());
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    session::{CreateSession, Session},
    site::{CreateSite, Site},
    tag::Tag,
    user::{CreateUser, UpdateUser, User},
    webring::{CreateWebring, Webring, WebringSearch},
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Names of the constraints declared in `migrations/`
///
/// Foreign keys use PostgreSQL's default `<table>_<column>_fkey` names.
pub mod constraints {
    pub const USERS_USERNAME: &str = "users_username_key";
    pub const USERS_EMAIL: &str = "users_email_key";
    pub const WEBRINGS_URL: &str = "webrings_url_key";
    pub const SITES_WEBRING_URL: &str = "sites_webring_id_url_key";
    pub const TAGS_LABEL: &str = "tags_label_key";
    pub const SESSIONS_TOKEN_HASH: &str = "sessions_token_hash_key";

    pub const WEBRINGS_OWNER: &str = "webrings_owner_id_fkey";
    pub const SITES_WEBRING: &str = "sites_webring_id_fkey";
    pub const SITES_ADDED_BY: &str = "sites_added_by_fkey";
    pub const SESSIONS_USER: &str = "sessions_user_id_fkey";
}

/// PostgreSQL `unique_violation`
const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL `foreign_key_violation`
const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write
    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    /// A foreign key pointed at a row that does not exist (or was just deleted)
    #[error("Referenced row is missing: {0}")]
    MissingReference(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            let constraint = db_err.constraint().unwrap_or_default().to_string();
            match db_err.code().as_deref() {
                Some(UNIQUE_VIOLATION) => return StoreError::Conflict(constraint),
                Some(FOREIGN_KEY_VIOLATION) => return StoreError::MissingReference(constraint),
                _ => {}
            }
        }
        StoreError::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Field a user is looked up by
///
/// Username and email must already be normalised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserLookup<'a> {
    Id(Uuid),
    Username(&'a str),
    Email(&'a str),
}

/// Field a webring is looked up by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebringLookup<'a> {
    Id(Uuid),
    Url(&'a str),
}

/// Field a site is looked up by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteLookup<'a> {
    Id(Uuid),
    /// Per-webring url key
    Url { webring_id: Uuid, url: &'a str },
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn find_user(&self, lookup: UserLookup<'_>) -> StoreResult<Option<User>>;

    async fn insert_user(&self, data: CreateUser) -> StoreResult<User>;

    /// Returns `None` if the user does not exist
    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>>;

    async fn find_webring(&self, lookup: WebringLookup<'_>) -> StoreResult<Option<Webring>>;

    /// Inserts a webring and links its (normalised) tag labels in one unit
    ///
    /// Tag records are created on first use. Nothing is persisted if any part
    /// fails.
    async fn insert_webring(&self, data: CreateWebring, tags: &[String]) -> StoreResult<Webring>;

    /// Deletes the webring and everything it owns; false if it did not exist
    async fn delete_webring(&self, id: Uuid) -> StoreResult<bool>;

    async fn search_webrings(&self, search: &WebringSearch) -> StoreResult<Vec<Webring>>;

    async fn find_site(&self, lookup: SiteLookup<'_>) -> StoreResult<Option<Site>>;

    /// Sites of a webring, oldest first
    async fn list_sites(&self, webring_id: Uuid) -> StoreResult<Vec<Site>>;

    async fn insert_site(&self, data: CreateSite) -> StoreResult<Site>;

    async fn delete_site(&self, id: Uuid) -> StoreResult<bool>;

    /// Tags of a webring, alphabetically
    async fn list_webring_tags(&self, webring_id: Uuid) -> StoreResult<Vec<Tag>>;

    async fn insert_session(&self, data: CreateSession) -> StoreResult<Session>;

    async fn find_session(&self, token_hash: &str) -> StoreResult<Option<Session>>;

    async fn delete_session(&self, token_hash: &str) -> StoreResult<bool>;

    /// Deletes every session expired at `now`, returning how many went
    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64>;

    /// Cheap liveness check used by the health endpoint
    async fn ping(&self) -> StoreResult<()>;
}
