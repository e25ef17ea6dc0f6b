/// In-memory implementation of `Store`
///
/// All state lives behind one `RwLock`. Every mutation takes the write guard
/// for the whole check-and-insert, so the unique and foreign key constraints
/// hold under concurrent callers exactly like the database does. Webrings and
/// sites are kept in insertion order, which is their creation order.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{constraints, SiteLookup, Store, StoreError, StoreResult, UserLookup, WebringLookup};
use crate::models::{
    session::{CreateSession, Session},
    site::{CreateSite, Site},
    tag::Tag,
    user::{CreateUser, UpdateUser, User},
    webring::{CreateWebring, Webring, WebringSearch},
};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    webrings: Vec<Webring>,
    sites: Vec<Site>,
    tags: Vec<Tag>,
    webring_tags: HashSet<(Uuid, Uuid)>,
    sessions: HashMap<String, Session>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn conflict(constraint: &str) -> StoreError {
    StoreError::Conflict(constraint.to_string())
}

fn missing(constraint: &str) -> StoreError {
    StoreError::MissingReference(constraint.to_string())
}

impl Tables {
    /// Rejects a username/email already held by a user other than `except`
    ///
    /// Email is checked against every user before username is.
    fn check_user_keys(
        &self,
        username: &str,
        email: &str,
        except: Option<Uuid>,
    ) -> StoreResult<()> {
        let others: Vec<&User> = self
            .users
            .values()
            .filter(|u| Some(u.id) != except)
            .collect();

        if others.iter().any(|u| u.email == email) {
            return Err(conflict(constraints::USERS_EMAIL));
        }
        if others.iter().any(|u| u.username == username) {
            return Err(conflict(constraints::USERS_USERNAME));
        }
        Ok(())
    }

    fn require_user(&self, id: Uuid, constraint: &str) -> StoreResult<()> {
        if self.users.contains_key(&id) {
            Ok(())
        } else {
            Err(missing(constraint))
        }
    }

    fn require_webring(&self, id: Uuid, constraint: &str) -> StoreResult<()> {
        if self.webrings.iter().any(|w| w.id == id) {
            Ok(())
        } else {
            Err(missing(constraint))
        }
    }

    /// Returns the tag with this label, creating it if needed
    fn find_or_create_tag(&mut self, label: &str) -> Tag {
        if let Some(tag) = self.tags.iter().find(|t| t.label == label) {
            return tag.clone();
        }

        let tag = Tag {
            id: Uuid::new_v4(),
            label: label.to_string(),
        };
        self.tags.push(tag.clone());
        tag
    }

    fn matches_search(&self, webring: &Webring, search: &WebringSearch) -> bool {
        if let Some(term) = &search.term {
            let term = term.to_lowercase();
            let in_ring = webring.name.to_lowercase().contains(&term)
                || webring.url.to_lowercase().contains(&term);
            let in_sites = self
                .sites
                .iter()
                .any(|s| s.webring_id == webring.id && s.name.to_lowercase().contains(&term));
            if !in_ring && !in_sites {
                return false;
            }
        }

        if let Some(label) = &search.tag {
            let tagged = self
                .tags
                .iter()
                .find(|t| &t.label == label)
                .map_or(false, |t| self.webring_tags.contains(&(webring.id, t.id)));
            if !tagged {
                return false;
            }
        }

        true
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user(&self, lookup: UserLookup<'_>) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        let user = match lookup {
            UserLookup::Id(id) => tables.users.get(&id).cloned(),
            UserLookup::Username(username) => {
                tables.users.values().find(|u| u.username == username).cloned()
            }
            UserLookup::Email(email) => tables.users.values().find(|u| u.email == email).cloned(),
        };
        Ok(user)
    }

    async fn insert_user(&self, data: CreateUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        tables.check_user_keys(&data.username, &data.email, None)?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: data.username,
            email: data.email,
            password_hash: data.password_hash,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&id) {
            return Ok(None);
        }
        tables.check_user_keys(&data.username, &data.email, Some(id))?;

        let user = tables.users.get_mut(&id).map(|user| {
            user.username = data.username;
            user.email = data.email;
            user.updated_at = Utc::now();
            user.clone()
        });
        Ok(user)
    }

    async fn find_webring(&self, lookup: WebringLookup<'_>) -> StoreResult<Option<Webring>> {
        let tables = self.tables.read().await;
        let webring = tables
            .webrings
            .iter()
            .find(|w| match lookup {
                WebringLookup::Id(id) => w.id == id,
                WebringLookup::Url(url) => w.url == url,
            })
            .cloned();
        Ok(webring)
    }

    async fn insert_webring(&self, data: CreateWebring, tags: &[String]) -> StoreResult<Webring> {
        let mut tables = self.tables.write().await;
        if tables.webrings.iter().any(|w| w.url == data.url) {
            return Err(conflict(constraints::WEBRINGS_URL));
        }
        tables.require_user(data.owner_id, constraints::WEBRINGS_OWNER)?;

        let webring = Webring {
            id: Uuid::new_v4(),
            url: data.url,
            name: data.name,
            owner_id: data.owner_id,
            created_at: Utc::now(),
        };
        tables.webrings.push(webring.clone());

        for label in tags {
            let tag = tables.find_or_create_tag(label);
            tables.webring_tags.insert((webring.id, tag.id));
        }

        Ok(webring)
    }

    async fn delete_webring(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.webrings.len();
        tables.webrings.retain(|w| w.id != id);
        if tables.webrings.len() == before {
            return Ok(false);
        }

        tables.sites.retain(|s| s.webring_id != id);
        tables.webring_tags.retain(|(webring_id, _)| *webring_id != id);
        Ok(true)
    }

    async fn search_webrings(&self, search: &WebringSearch) -> StoreResult<Vec<Webring>> {
        let tables = self.tables.read().await;
        let offset = usize::try_from(search.offset).unwrap_or(0);
        let limit = usize::try_from(search.limit).unwrap_or(0);

        let found = tables
            .webrings
            .iter()
            .rev()
            .filter(|w| tables.matches_search(w, search))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        Ok(found)
    }

    async fn find_site(&self, lookup: SiteLookup<'_>) -> StoreResult<Option<Site>> {
        let tables = self.tables.read().await;
        let site = tables
            .sites
            .iter()
            .find(|s| match lookup {
                SiteLookup::Id(id) => s.id == id,
                SiteLookup::Url { webring_id, url } => s.webring_id == webring_id && s.url == url,
            })
            .cloned();
        Ok(site)
    }

    async fn list_sites(&self, webring_id: Uuid) -> StoreResult<Vec<Site>> {
        let tables = self.tables.read().await;
        Ok(tables
            .sites
            .iter()
            .filter(|s| s.webring_id == webring_id)
            .cloned()
            .collect())
    }

    async fn insert_site(&self, data: CreateSite) -> StoreResult<Site> {
        let mut tables = self.tables.write().await;
        if tables
            .sites
            .iter()
            .any(|s| s.webring_id == data.webring_id && s.url == data.url)
        {
            return Err(conflict(constraints::SITES_WEBRING_URL));
        }
        tables.require_webring(data.webring_id, constraints::SITES_WEBRING)?;
        tables.require_user(data.added_by, constraints::SITES_ADDED_BY)?;

        let site = Site {
            id: Uuid::new_v4(),
            name: data.name,
            url: data.url,
            webring_id: data.webring_id,
            added_by: data.added_by,
            created_at: Utc::now(),
        };
        tables.sites.push(site.clone());
        Ok(site)
    }

    async fn delete_site(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.sites.len();
        tables.sites.retain(|s| s.id != id);
        Ok(tables.sites.len() < before)
    }

    async fn list_webring_tags(&self, webring_id: Uuid) -> StoreResult<Vec<Tag>> {
        let tables = self.tables.read().await;
        let mut tags: Vec<Tag> = tables
            .tags
            .iter()
            .filter(|t| tables.webring_tags.contains(&(webring_id, t.id)))
            .cloned()
            .collect();
        tags.sort_by(|a, b| a.label.cmp(&b.label));
        Ok(tags)
    }

    async fn insert_session(&self, data: CreateSession) -> StoreResult<Session> {
        let mut tables = self.tables.write().await;
        if tables.sessions.contains_key(&data.token_hash) {
            return Err(conflict(constraints::SESSIONS_TOKEN_HASH));
        }
        tables.require_user(data.user_id, constraints::SESSIONS_USER)?;

        let session = Session {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            token_hash: data.token_hash,
            created_at: Utc::now(),
            expires_at: data.expires_at,
        };
        tables
            .sessions
            .insert(session.token_hash.clone(), session.clone());
        Ok(session)
    }

    async fn find_session(&self, token_hash: &str) -> StoreResult<Option<Session>> {
        let tables = self.tables.read().await;
        Ok(tables.sessions.get(token_hash).cloned())
    }

    async fn delete_session(&self, token_hash: &str) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables.sessions.remove(token_hash).is_some())
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.sessions.len();
        tables.sessions.retain(|_, session| !session.is_expired(now));
        Ok((before - tables.sessions.len()) as u64)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
