//! Common test utilities for service tests
//!
//! - `TestServices`: user and webring services over a fresh `MemoryStore`
//! - `RecordingMailer` / `FailingMailer`: mailers that never touch the network
//! - `StaleStore`: a store whose lookups lag behind concurrent writers
//! - `wait_for`: polling helper for the detached registration email task

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;
use webring_shared::mail::{MailError, Mailer};
use webring_shared::models::{
    session::{CreateSession, Session},
    site::{CreateSite, Site},
    tag::Tag,
    user::{CreateUser, UpdateUser, User},
    webring::{CreateWebring, Webring, WebringSearch},
};
use webring_shared::services::{UserService, WebringService};
use webring_shared::store::{
    MemoryStore, SiteLookup, Store, StoreResult, UserLookup, WebringLookup,
};

pub const PASSWORD: &str = "Str0ngPass!";

/// Collects the users a registration email was sent to
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<User>>,
}

impl RecordingMailer {
    pub async fn sent_to(&self) -> Vec<String> {
        self.sent.lock().await.iter().map(|u| u.email.clone()).collect()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_registration_email(&self, user: &User) -> Result<(), MailError> {
        self.sent.lock().await.push(user.clone());
        Ok(())
    }
}

/// Always fails, like an unreachable mail endpoint
pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send_registration_email(&self, _user: &User) -> Result<(), MailError> {
        Err(MailError::Rejected(503))
    }
}

/// Delegates to a `MemoryStore` but answers lookups as if another request
/// wrote in between:
///
/// - username and email lookups never find a user
/// - webrings in `ghosts` are still found after they were deleted
pub struct StaleStore {
    pub inner: Arc<MemoryStore>,
    pub ghosts: Mutex<Vec<Webring>>,
}

impl StaleStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            ghosts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Store for StaleStore {
    async fn find_user(&self, lookup: UserLookup<'_>) -> StoreResult<Option<User>> {
        match lookup {
            UserLookup::Id(_) => self.inner.find_user(lookup).await,
            UserLookup::Username(_) | UserLookup::Email(_) => Ok(None),
        }
    }

    async fn insert_user(&self, data: CreateUser) -> StoreResult<User> {
        self.inner.insert_user(data).await
    }

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>> {
        self.inner.update_user(id, data).await
    }

    async fn find_webring(&self, lookup: WebringLookup<'_>) -> StoreResult<Option<Webring>> {
        if let Some(webring) = self.inner.find_webring(lookup).await? {
            return Ok(Some(webring));
        }

        let ghosts = self.ghosts.lock().await;
        Ok(ghosts
            .iter()
            .find(|w| match lookup {
                WebringLookup::Id(id) => w.id == id,
                WebringLookup::Url(url) => w.url == url,
            })
            .cloned())
    }

    async fn insert_webring(&self, data: CreateWebring, tags: &[String]) -> StoreResult<Webring> {
        self.inner.insert_webring(data, tags).await
    }

    async fn delete_webring(&self, id: Uuid) -> StoreResult<bool> {
        self.inner.delete_webring(id).await
    }

    async fn search_webrings(&self, search: &WebringSearch) -> StoreResult<Vec<Webring>> {
        self.inner.search_webrings(search).await
    }

    async fn find_site(&self, lookup: SiteLookup<'_>) -> StoreResult<Option<Site>> {
        self.inner.find_site(lookup).await
    }

    async fn list_sites(&self, webring_id: Uuid) -> StoreResult<Vec<Site>> {
        self.inner.list_sites(webring_id).await
    }

    async fn insert_site(&self, data: CreateSite) -> StoreResult<Site> {
        self.inner.insert_site(data).await
    }

    async fn delete_site(&self, id: Uuid) -> StoreResult<bool> {
        self.inner.delete_site(id).await
    }

    async fn list_webring_tags(&self, webring_id: Uuid) -> StoreResult<Vec<Tag>> {
        self.inner.list_webring_tags(webring_id).await
    }

    async fn insert_session(&self, data: CreateSession) -> StoreResult<Session> {
        self.inner.insert_session(data).await
    }

    async fn find_session(&self, token_hash: &str) -> StoreResult<Option<Session>> {
        self.inner.find_session(token_hash).await
    }

    async fn delete_session(&self, token_hash: &str) -> StoreResult<bool> {
        self.inner.delete_session(token_hash).await
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        self.inner.delete_expired_sessions(now).await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.inner.ping().await
    }
}

pub struct TestServices {
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub users: UserService,
    pub webrings: WebringService,
}

impl TestServices {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer::default());
        let users = UserService::new(store.clone(), mailer.clone());
        let webrings = WebringService::new(store.clone());

        Self {
            store,
            mailer,
            users,
            webrings,
        }
    }

    /// Registers `name` with `{name}@example.com`
    pub async fn user(&self, name: &str) -> User {
        self.users
            .register(name, &format!("{name}@example.com"), PASSWORD)
            .await
            .expect("register test user")
    }
}

/// Helper to wait for condition with timeout
pub async fn wait_for<F, Fut>(condition: F, timeout_secs: u64) -> anyhow::Result<()>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_secs(timeout_secs);

    loop {
        if condition().await {
            return Ok(());
        }

        if start.elapsed() > timeout {
            anyhow::bail!("Condition not met within {} seconds", timeout_secs);
        }

        tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
    }
}
