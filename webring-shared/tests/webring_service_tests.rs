/// Tests for webring lifecycle, site membership and search

mod common;

use std::sync::Arc;

use common::{StaleStore, TestServices};
use uuid::Uuid;
use webring_shared::auth::policy::AccessPolicy;
use webring_shared::error::DomainError;
use webring_shared::models::{
    site::Site,
    webring::{CreateWebring, Webring},
};
use webring_shared::services::{SearchQuery, WebringService};
use webring_shared::store::{Store, StoreError, WebringLookup};

fn tags(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|l| l.to_string()).collect()
}

#[tokio::test]
async fn test_create_webring() {
    let svc = TestServices::new();
    let alice = svc.user("alice").await;

    let ring = svc
        .webrings
        .create_webring(
            alice.id,
            " Retro-Ring ",
            "  Retro   Ring ",
            &tags(&["Pixel Art", "pixel  art", "Games"]),
        )
        .await
        .unwrap();

    assert_eq!(ring.url, "retro-ring");
    assert_eq!(ring.name, "Retro Ring");
    assert_eq!(ring.owner_id, alice.id);

    let labels: Vec<String> = svc
        .webrings
        .get_webring_tags(ring.id)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.label)
        .collect();
    assert_eq!(labels, vec!["games", "pixel art"]);

    let found = svc
        .webrings
        .get_webring(WebringLookup::Url("RETRO-RING"))
        .await
        .unwrap();
    assert_eq!(found.map(|w| w.id), Some(ring.id));
}

#[tokio::test]
async fn test_create_webring_errors() {
    let svc = TestServices::new();
    let alice = svc.user("alice").await;

    let missing = Uuid::new_v4();
    let err = svc
        .webrings
        .create_webring(missing, "retro-ring", "Retro Ring", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::UserNotFound(id) if id == missing));

    let err = svc
        .webrings
        .create_webring(alice.id, "retro ring", "Retro Ring", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation { field: "url", .. }));

    let err = svc
        .webrings
        .create_webring(alice.id, "retro-ring", "   ", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation { field: "name", .. }));

    let err = svc
        .webrings
        .create_webring(alice.id, "retro-ring", "Retro Ring", &tags(&[" "]))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation { field: "tags", .. }));

    svc.webrings
        .create_webring(alice.id, "retro-ring", "Retro Ring", &[])
        .await
        .unwrap();
    let err = svc
        .webrings
        .create_webring(alice.id, "Retro-Ring", "Another", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::WebringUrlNotUnique));
}

#[tokio::test]
async fn test_get_webring_sites_returns_added_sites_in_order() {
    let svc = TestServices::new();
    let alice = svc.user("alice").await;
    let ring = svc
        .webrings
        .create_webring(alice.id, "retro-ring", "Retro Ring", &[])
        .await
        .unwrap();

    let added = [
        ("First", "https://first.example.com/"),
        ("Second", "https://second.example.com/"),
        ("Third", "https://third.example.com/"),
    ];
    for (name, url) in added {
        svc.webrings
            .add_new_site(ring.id, alice.id, name, url)
            .await
            .unwrap();
    }

    let sites: Vec<(String, String)> = svc
        .webrings
        .get_webring_sites(ring.id)
        .await
        .unwrap()
        .into_iter()
        .map(|s| (s.name, s.url))
        .collect();

    let expected: Vec<(String, String)> = added
        .iter()
        .map(|(n, u)| (n.to_string(), u.to_string()))
        .collect();
    assert_eq!(sites, expected);

    let newest = svc.webrings.get_new_site(ring.id).await.unwrap();
    assert_eq!(newest.map(|s| s.name), Some("Third".to_string()));
}

#[tokio::test]
async fn test_get_webring_sites_of_unknown_webring_is_empty() {
    let svc = TestServices::new();
    let sites = svc.webrings.get_webring_sites(Uuid::new_v4()).await.unwrap();
    assert!(sites.is_empty());
    assert!(svc.webrings.get_new_site(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_add_new_site_normalises_and_rejects_duplicates() {
    let svc = TestServices::new();
    let alice = svc.user("alice").await;
    let bob = svc.user("bob").await;
    let ring = svc
        .webrings
        .create_webring(alice.id, "retro-ring", "Retro Ring", &[])
        .await
        .unwrap();

    let site = svc
        .webrings
        .add_new_site(ring.id, bob.id, "  Bob's   Page ", "HTTPS://Bob.Example.com:443")
        .await
        .unwrap();
    assert_eq!(site.name, "Bob's Page");
    assert_eq!(site.url, "https://bob.example.com/");
    assert_eq!(site.added_by, bob.id);
    assert_eq!(site.webring_id, ring.id);

    let err = svc
        .webrings
        .add_new_site(ring.id, alice.id, "Copy", "https://bob.example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::SiteUrlNotUnique));

    // The same url may join a different webring
    let other = svc
        .webrings
        .create_webring(bob.id, "other-ring", "Other Ring", &[])
        .await
        .unwrap();
    assert!(svc
        .webrings
        .add_new_site(other.id, bob.id, "Bob", "https://bob.example.com/")
        .await
        .is_ok());
}

#[tokio::test]
async fn test_add_new_site_errors() {
    let svc = TestServices::new();
    let alice = svc.user("alice").await;
    let ring = svc
        .webrings
        .create_webring(alice.id, "retro-ring", "Retro Ring", &[])
        .await
        .unwrap();

    let err = svc
        .webrings
        .add_new_site(Uuid::new_v4(), alice.id, "Site", "https://a.example.com/")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::WebringNotFound(_)));

    let err = svc
        .webrings
        .add_new_site(ring.id, alice.id, "", "not a url")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation { field: "name", .. }));

    let err = svc
        .webrings
        .add_new_site(ring.id, alice.id, "Site", "ftp://a.example.com/")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation { field: "url", .. }));

    let stranger = Uuid::new_v4();
    let err = svc
        .webrings
        .add_new_site(ring.id, stranger, "Site", "https://a.example.com/")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::UserNotFound(id) if id == stranger));
}

#[tokio::test]
async fn test_remove_site_permissions() {
    let svc = TestServices::new();
    let alice = svc.user("alice").await;
    let bob = svc.user("bob").await;
    let carol = svc.user("carol").await;
    let ring = svc
        .webrings
        .create_webring(alice.id, "retro-ring", "Retro Ring", &[])
        .await
        .unwrap();

    let bobs = svc
        .webrings
        .add_new_site(ring.id, bob.id, "Bob", "https://bob.example.com/")
        .await
        .unwrap();
    let carols = svc
        .webrings
        .add_new_site(ring.id, carol.id, "Carol", "https://carol.example.com/")
        .await
        .unwrap();

    let err = svc
        .webrings
        .remove_site(ring.id, bobs.id, carol.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden));
    assert_eq!(err.http_status(), 403);

    // The adder may remove their own site
    svc.webrings.remove_site(ring.id, bobs.id, bob.id).await.unwrap();
    // The owner may remove any site
    svc.webrings.remove_site(ring.id, carols.id, alice.id).await.unwrap();

    assert!(svc.webrings.get_webring_sites(ring.id).await.unwrap().is_empty());

    let err = svc
        .webrings
        .remove_site(ring.id, bobs.id, alice.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::SiteNotFound(id) if id == bobs.id));
}

#[tokio::test]
async fn test_remove_site_from_wrong_webring() {
    let svc = TestServices::new();
    let alice = svc.user("alice").await;
    let first = svc
        .webrings
        .create_webring(alice.id, "first-ring", "First", &[])
        .await
        .unwrap();
    let second = svc
        .webrings
        .create_webring(alice.id, "second-ring", "Second", &[])
        .await
        .unwrap();
    let site = svc
        .webrings
        .add_new_site(first.id, alice.id, "Site", "https://a.example.com/")
        .await
        .unwrap();

    let err = svc
        .webrings
        .remove_site(second.id, site.id, alice.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::SiteNotFound(_)));
    assert_eq!(svc.webrings.get_webring_sites(first.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_webring() {
    let svc = TestServices::new();
    let alice = svc.user("alice").await;
    let bob = svc.user("bob").await;
    let ring = svc
        .webrings
        .create_webring(alice.id, "retro-ring", "Retro Ring", &tags(&["games"]))
        .await
        .unwrap();
    svc.webrings
        .add_new_site(ring.id, bob.id, "Bob", "https://bob.example.com/")
        .await
        .unwrap();

    let err = svc.webrings.delete_webring(ring.id, bob.id).await.unwrap_err();
    assert!(matches!(err, DomainError::Forbidden));

    svc.webrings.delete_webring(ring.id, alice.id).await.unwrap();

    assert!(svc
        .webrings
        .get_webring(WebringLookup::Id(ring.id))
        .await
        .unwrap()
        .is_none());
    assert!(svc.store.list_sites(ring.id).await.unwrap().is_empty());
    assert!(svc.store.list_webring_tags(ring.id).await.unwrap().is_empty());

    let err = svc.webrings.delete_webring(ring.id, alice.id).await.unwrap_err();
    assert!(matches!(err, DomainError::WebringNotFound(_)));

    // The url is free again
    assert!(svc
        .webrings
        .create_webring(alice.id, "retro-ring", "Retro Ring", &[])
        .await
        .is_ok());
}

#[tokio::test]
async fn test_search() {
    let svc = TestServices::new();
    let alice = svc.user("alice").await;

    let retro = svc
        .webrings
        .create_webring(alice.id, "retro-ring", "Retro Games", &tags(&["games"]))
        .await
        .unwrap();
    let art = svc
        .webrings
        .create_webring(alice.id, "pixel-ring", "Pixel Art", &tags(&["art"]))
        .await
        .unwrap();
    svc.webrings
        .add_new_site(art.id, alice.id, "Retro Sprites", "https://sprites.example.com/")
        .await
        .unwrap();

    let ids = |rings: Vec<Webring>| rings.into_iter().map(|w| w.id).collect::<Vec<_>>();

    // Newest first
    let all = svc.webrings.search(SearchQuery::default()).await.unwrap();
    assert_eq!(ids(all), vec![art.id, retro.id]);

    // Name of the webring or of a member site
    let hits = svc
        .webrings
        .search(SearchQuery {
            term: Some("RETRO".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(ids(hits), vec![art.id, retro.id]);

    let hits = svc
        .webrings
        .search(SearchQuery {
            term: Some("retro".to_string()),
            tag: Some("Games".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(ids(hits), vec![retro.id]);

    let page = svc
        .webrings
        .search(SearchQuery {
            limit: Some(1),
            offset: Some(1),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(ids(page), vec![retro.id]);

    let err = svc
        .webrings
        .search(SearchQuery {
            limit: Some(0),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation { field: "limit", .. }));
}

/// Only the webring owner may add sites
struct ClosedPolicy;

impl AccessPolicy for ClosedPolicy {
    fn can_add_site(&self, actor: Uuid, webring: &Webring) -> bool {
        webring.owner_id == actor
    }

    fn can_remove_site(&self, actor: Uuid, webring: &Webring, _site: &Site) -> bool {
        webring.owner_id == actor
    }

    fn can_delete_webring(&self, actor: Uuid, webring: &Webring) -> bool {
        webring.owner_id == actor
    }
}

#[tokio::test]
async fn test_custom_access_policy() {
    let svc = TestServices::new();
    let alice = svc.user("alice").await;
    let bob = svc.user("bob").await;

    let webrings = WebringService::with_policy(svc.store.clone(), Arc::new(ClosedPolicy));
    let ring = webrings
        .create_webring(alice.id, "closed-ring", "Closed Ring", &[])
        .await
        .unwrap();

    let err = webrings
        .add_new_site(ring.id, bob.id, "Bob", "https://bob.example.com/")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden));

    assert!(webrings
        .add_new_site(ring.id, alice.id, "Alice", "https://alice.example.com/")
        .await
        .is_ok());
}

#[tokio::test]
async fn test_add_new_site_to_webring_deleted_concurrently() {
    let svc = TestServices::new();
    let alice = svc.user("alice").await;
    let ring = svc
        .webrings
        .create_webring(alice.id, "retro-ring", "Retro Ring", &[])
        .await
        .unwrap();

    // The webring is deleted between the service's lookup and its insert
    let stale = Arc::new(StaleStore::new(svc.store.clone()));
    stale.ghosts.lock().await.push(ring.clone());
    svc.webrings.delete_webring(ring.id, alice.id).await.unwrap();

    let webrings = WebringService::new(stale);
    let err = webrings
        .add_new_site(ring.id, alice.id, "Site", "https://a.example.com/")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::WebringNotFound(_)));
    assert!(svc.store.list_sites(ring.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_create_leaves_nothing_behind() {
    let svc = TestServices::new();
    let alice = svc.user("alice").await;

    // Owner existed when checked but is gone at insert time
    let err = svc
        .store
        .insert_webring(
            CreateWebring {
                url: "retro-ring".to_string(),
                name: "Retro Ring".to_string(),
                owner_id: Uuid::new_v4(),
            },
            &tags(&["games"]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::MissingReference(_)));

    // Nothing was persisted, so the same url can be created afterwards
    let ring = svc
        .webrings
        .create_webring(alice.id, "retro-ring", "Retro Ring", &tags(&["games"]))
        .await
        .unwrap();
    let labels: Vec<String> = svc
        .webrings
        .get_webring_tags(ring.id)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.label)
        .collect();
    assert_eq!(labels, vec!["games"]);
}
