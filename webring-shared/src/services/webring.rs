/// Webring lifecycle, site membership and search

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::policy::{AccessPolicy, OwnerPolicy};
use crate::error::{DomainError, DomainResult};
use crate::models::{
    site::{CreateSite, Site},
    tag::Tag,
    webring::{CreateWebring, Webring, WebringSearch},
};
pub use crate::models::webring::{DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT};
use crate::store::{constraints, SiteLookup, Store, StoreError, UserLookup, WebringLookup};
use crate::validation::{
    normalise_name, normalise_site_url, normalise_tag, normalise_webring_url, validate_name,
    validate_site_url, validate_tag, validate_webring_url,
};

/// Raw search parameters as received from a caller
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// Substring matched against webring name, url and member site names
    pub term: Option<String>,
    /// Exact tag the webring must carry
    pub tag: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl SearchQuery {
    fn into_search(self) -> DomainResult<WebringSearch> {
        let limit = self.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
        if !(1..=MAX_SEARCH_LIMIT).contains(&limit) {
            return Err(DomainError::validation(
                "limit",
                format!("Limit must be between 1 and {}", MAX_SEARCH_LIMIT),
            ));
        }

        let offset = self.offset.unwrap_or(0);
        if offset < 0 {
            return Err(DomainError::validation("offset", "Offset must not be negative"));
        }

        let term = self
            .term
            .map(|t| normalise_name(&t))
            .filter(|t| !t.is_empty());
        let tag = self
            .tag
            .map(|t| normalise_tag(&t))
            .filter(|t| !t.is_empty());

        Ok(WebringSearch {
            term,
            tag,
            limit,
            offset,
        })
    }
}

#[derive(Clone)]
pub struct WebringService {
    store: Arc<dyn Store>,
    policy: Arc<dyn AccessPolicy>,
}

impl WebringService {
    /// Service with the default `OwnerPolicy`
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_policy(store, Arc::new(OwnerPolicy))
    }

    pub fn with_policy(store: Arc<dyn Store>, policy: Arc<dyn AccessPolicy>) -> Self {
        Self { store, policy }
    }

    /// Looks a webring up by id or (normalised) url
    pub async fn get_webring(&self, lookup: WebringLookup<'_>) -> DomainResult<Option<Webring>> {
        let webring = match lookup {
            WebringLookup::Id(id) => self.store.find_webring(WebringLookup::Id(id)).await?,
            WebringLookup::Url(url) => {
                let url = normalise_webring_url(url);
                self.store.find_webring(WebringLookup::Url(&url)).await?
            }
        };
        Ok(webring)
    }

    pub async fn get_webring_tags(&self, webring_id: Uuid) -> DomainResult<Vec<Tag>> {
        Ok(self.store.list_webring_tags(webring_id).await?)
    }

    /// Member sites in the order they were added
    ///
    /// An unknown webring simply has no sites; callers that need to tell the
    /// two apart look the webring up first.
    pub async fn get_webring_sites(&self, webring_id: Uuid) -> DomainResult<Vec<Site>> {
        let sites = self.store.list_sites(webring_id).await?;
        debug!(webring_id = %webring_id, count = sites.len(), "Listed webring sites");
        Ok(sites)
    }

    /// The most recently added member site, if any
    pub async fn get_new_site(&self, webring_id: Uuid) -> DomainResult<Option<Site>> {
        Ok(self.store.list_sites(webring_id).await?.pop())
    }

    /// Creates a webring owned by `owner_id`
    ///
    /// Tags are normalised and de-duplicated; tag records are created on
    /// first use. The webring and its tag links are written together, so a
    /// failed create leaves nothing behind.
    ///
    /// # Errors
    ///
    /// - `UserNotFound` if the owner does not exist
    /// - `Validation` for a malformed url, name or tag
    /// - `WebringUrlNotUnique` if another webring already uses the url
    pub async fn create_webring(
        &self,
        owner_id: Uuid,
        url: &str,
        name: &str,
        tags: &[String],
    ) -> DomainResult<Webring> {
        if self.store.find_user(UserLookup::Id(owner_id)).await?.is_none() {
            return Err(DomainError::UserNotFound(owner_id));
        }

        let url = normalise_webring_url(url);
        validate_webring_url(&url)?;

        let name = normalise_name(name);
        validate_name("name", &name)?;

        let mut labels = BTreeSet::new();
        for tag in tags {
            let label = normalise_tag(tag);
            validate_tag(&label)?;
            labels.insert(label);
        }

        if self
            .store
            .find_webring(WebringLookup::Url(&url))
            .await?
            .is_some()
        {
            return Err(DomainError::WebringUrlNotUnique);
        }

        let labels: Vec<String> = labels.into_iter().collect();
        let webring = self
            .store
            .insert_webring(
                CreateWebring {
                    url,
                    name,
                    owner_id,
                },
                &labels,
            )
            .await
            .map_err(|err| match err {
                StoreError::MissingReference(c) if c == constraints::WEBRINGS_OWNER => {
                    DomainError::UserNotFound(owner_id)
                }
                err => err.into(),
            })?;

        info!(
            webring_id = %webring.id,
            url = %webring.url,
            owner_id = %owner_id,
            tags = labels.len(),
            "Created webring"
        );

        Ok(webring)
    }

    /// Deletes a webring together with its sites and tag links
    pub async fn delete_webring(&self, webring_id: Uuid, actor: Uuid) -> DomainResult<()> {
        let webring = self.require_webring(webring_id).await?;

        if !self.policy.can_delete_webring(actor, &webring) {
            return Err(DomainError::Forbidden);
        }

        if !self.store.delete_webring(webring.id).await? {
            return Err(DomainError::WebringNotFound(webring.id.to_string()));
        }

        info!(webring_id = %webring.id, url = %webring.url, actor = %actor, "Deleted webring");

        Ok(())
    }

    /// Adds a member site to a webring
    ///
    /// # Errors
    ///
    /// - `WebringNotFound` / `UserNotFound` for unknown ids
    /// - `Forbidden` if the access policy refuses
    /// - `Validation` for a malformed name, then url
    /// - `SiteUrlNotUnique` if the webring already lists this url
    pub async fn add_new_site(
        &self,
        webring_id: Uuid,
        added_by: Uuid,
        name: &str,
        url: &str,
    ) -> DomainResult<Site> {
        let webring = self.require_webring(webring_id).await?;

        if self.store.find_user(UserLookup::Id(added_by)).await?.is_none() {
            return Err(DomainError::UserNotFound(added_by));
        }

        if !self.policy.can_add_site(added_by, &webring) {
            return Err(DomainError::Forbidden);
        }

        let name = normalise_name(name);
        validate_name("name", &name)?;

        let url = normalise_site_url(url);
        validate_site_url(&url)?;

        let existing = self
            .store
            .find_site(SiteLookup::Url {
                webring_id: webring.id,
                url: &url,
            })
            .await?;
        if existing.is_some() {
            return Err(DomainError::SiteUrlNotUnique);
        }

        let site = self
            .store
            .insert_site(CreateSite {
                name,
                url,
                webring_id: webring.id,
                added_by,
            })
            .await
            .map_err(|err| match err {
                // The webring or user was deleted after the checks above
                StoreError::MissingReference(c) if c == constraints::SITES_WEBRING => {
                    DomainError::WebringNotFound(webring.id.to_string())
                }
                StoreError::MissingReference(c) if c == constraints::SITES_ADDED_BY => {
                    DomainError::UserNotFound(added_by)
                }
                err => err.into(),
            })?;

        info!(
            site_id = %site.id,
            webring_id = %webring.id,
            url = %site.url,
            added_by = %added_by,
            "Added site to webring"
        );

        Ok(site)
    }

    /// Removes a member site
    ///
    /// A site id belonging to a different webring is reported as
    /// `SiteNotFound`.
    pub async fn remove_site(
        &self,
        webring_id: Uuid,
        site_id: Uuid,
        actor: Uuid,
    ) -> DomainResult<()> {
        let webring = self.require_webring(webring_id).await?;

        let site = self
            .store
            .find_site(SiteLookup::Id(site_id))
            .await?
            .filter(|site| site.webring_id == webring.id)
            .ok_or(DomainError::SiteNotFound(site_id))?;

        if !self.policy.can_remove_site(actor, &webring, &site) {
            return Err(DomainError::Forbidden);
        }

        if !self.store.delete_site(site.id).await? {
            return Err(DomainError::SiteNotFound(site_id));
        }

        info!(
            site_id = %site.id,
            webring_id = %webring.id,
            actor = %actor,
            "Removed site from webring"
        );

        Ok(())
    }

    /// Webrings matching the query, newest first
    pub async fn search(&self, query: SearchQuery) -> DomainResult<Vec<Webring>> {
        let search = query.into_search()?;
        let webrings = self.store.search_webrings(&search).await?;

        debug!(
            term = ?search.term,
            tag = ?search.tag,
            limit = search.limit,
            offset = search.offset,
            results = webrings.len(),
            "Searched webrings"
        );

        Ok(webrings)
    }

    async fn require_webring(&self, webring_id: Uuid) -> DomainResult<Webring> {
        self.store
            .find_webring(WebringLookup::Id(webring_id))
            .await?
            .ok_or_else(|| DomainError::WebringNotFound(webring_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_query_defaults() {
        let search = SearchQuery::default().into_search().unwrap();
        assert_eq!(search.limit, DEFAULT_SEARCH_LIMIT);
        assert_eq!(search.offset, 0);
        assert!(search.term.is_none());
        assert!(search.tag.is_none());
    }

    #[test]
    fn test_search_query_normalises_term_and_tag() {
        let search = SearchQuery {
            term: Some("  Retro   Games ".to_string()),
            tag: Some(" Pixel ART ".to_string()),
            ..Default::default()
        }
        .into_search()
        .unwrap();

        assert_eq!(search.term.as_deref(), Some("Retro Games"));
        assert_eq!(search.tag.as_deref(), Some("pixel art"));
    }

    #[test]
    fn test_search_query_blank_term_is_ignored() {
        let search = SearchQuery {
            term: Some("   ".to_string()),
            ..Default::default()
        }
        .into_search()
        .unwrap();

        assert!(search.term.is_none());
    }

    #[test]
    fn test_search_query_rejects_bad_paging() {
        for limit in [0, -1, MAX_SEARCH_LIMIT + 1] {
            let result = SearchQuery {
                limit: Some(limit),
                ..Default::default()
            }
            .into_search();
            assert!(matches!(
                result,
                Err(DomainError::Validation { field: "limit", .. })
            ));
        }

        let result = SearchQuery {
            offset: Some(-5),
            ..Default::default()
        }
        .into_search();
        assert!(matches!(
            result,
            Err(DomainError::Validation { field: "offset", .. })
        ));
    }
}
