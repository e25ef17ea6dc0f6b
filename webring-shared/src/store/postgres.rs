/// PostgreSQL implementation of `Store`
///
/// Thin delegation to the `models` functions; the only logic here is turning
/// `sqlx::Error` into `StoreError` so constraint violations keep their
/// constraint name.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{SiteLookup, Store, StoreResult, UserLookup, WebringLookup};
use crate::db::pool::health_check;
use crate::models::{
    session::{CreateSession, Session},
    site::{CreateSite, Site},
    tag::Tag,
    user::{CreateUser, UpdateUser, User},
    webring::{CreateWebring, Webring, WebringSearch},
};

/// Store backed by a shared connection pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_user(&self, lookup: UserLookup<'_>) -> StoreResult<Option<User>> {
        let user = match lookup {
            UserLookup::Id(id) => User::find_by_id(&self.pool, id).await?,
            UserLookup::Username(username) => User::find_by_username(&self.pool, username).await?,
            UserLookup::Email(email) => User::find_by_email(&self.pool, email).await?,
        };
        Ok(user)
    }

    async fn insert_user(&self, data: CreateUser) -> StoreResult<User> {
        Ok(User::create(&self.pool, data).await?)
    }

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>> {
        Ok(User::update(&self.pool, id, data).await?)
    }

    async fn find_webring(&self, lookup: WebringLookup<'_>) -> StoreResult<Option<Webring>> {
        let webring = match lookup {
            WebringLookup::Id(id) => Webring::find_by_id(&self.pool, id).await?,
            WebringLookup::Url(url) => Webring::find_by_url(&self.pool, url).await?,
        };
        Ok(webring)
    }

    async fn insert_webring(&self, data: CreateWebring, tags: &[String]) -> StoreResult<Webring> {
        Ok(Webring::create(&self.pool, data, tags).await?)
    }

    async fn delete_webring(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Webring::delete(&self.pool, id).await?)
    }

    async fn search_webrings(&self, search: &WebringSearch) -> StoreResult<Vec<Webring>> {
        Ok(Webring::search(&self.pool, search).await?)
    }

    async fn find_site(&self, lookup: SiteLookup<'_>) -> StoreResult<Option<Site>> {
        let site = match lookup {
            SiteLookup::Id(id) => Site::find_by_id(&self.pool, id).await?,
            SiteLookup::Url { webring_id, url } => {
                Site::find_by_webring_and_url(&self.pool, webring_id, url).await?
            }
        };
        Ok(site)
    }

    async fn list_sites(&self, webring_id: Uuid) -> StoreResult<Vec<Site>> {
        Ok(Site::list_by_webring(&self.pool, webring_id).await?)
    }

    async fn insert_site(&self, data: CreateSite) -> StoreResult<Site> {
        Ok(Site::create(&self.pool, data).await?)
    }

    async fn delete_site(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Site::delete(&self.pool, id).await?)
    }

    async fn list_webring_tags(&self, webring_id: Uuid) -> StoreResult<Vec<Tag>> {
        Ok(Tag::list_by_webring(&self.pool, webring_id).await?)
    }

    async fn insert_session(&self, data: CreateSession) -> StoreResult<Session> {
        Ok(Session::create(&self.pool, data).await?)
    }

    async fn find_session(&self, token_hash: &str) -> StoreResult<Option<Session>> {
        Ok(Session::find_by_token_hash(&self.pool, token_hash).await?)
    }

    async fn delete_session(&self, token_hash: &str) -> StoreResult<bool> {
        Ok(Session::delete_by_token_hash(&self.pool, token_hash).await?)
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        Ok(Session::delete_expired(&self.pool, now).await?)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(health_check(&self.pool).await?)
    }
}
