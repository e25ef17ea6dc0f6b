/// Authorization policy for webring mutations
///
/// Services ask an `AccessPolicy` before mutating webring content, passing the
/// acting user's id. The policy only answers yes or no; services turn a "no"
/// into `DomainError::Forbidden`.
///
/// # Default rules (`OwnerPolicy`)
///
/// | Action          | Allowed for                          |
/// |-----------------|--------------------------------------|
/// | add a site      | any registered user                  |
/// | remove a site   | the webring owner, or the site adder |
/// | delete webring  | the webring owner                    |

use uuid::Uuid;

use crate::models::{site::Site, webring::Webring};

/// Decides whether a user may perform a webring action
pub trait AccessPolicy: Send + Sync {
    fn can_add_site(&self, actor: Uuid, webring: &Webring) -> bool;

    fn can_remove_site(&self, actor: Uuid, webring: &Webring, site: &Site) -> bool;

    fn can_delete_webring(&self, actor: Uuid, webring: &Webring) -> bool;
}

/// Ownership-based policy used unless a deployment supplies its own
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnerPolicy;

impl AccessPolicy for OwnerPolicy {
    fn can_add_site(&self, _actor: Uuid, _webring: &Webring) -> bool {
        true
    }

    fn can_remove_site(&self, actor: Uuid, webring: &Webring, site: &Site) -> bool {
        webring.owner_id == actor || site.added_by == actor
    }

    fn can_delete_webring(&self, actor: Uuid, webring: &Webring) -> bool {
        webring.owner_id == actor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn webring(owner_id: Uuid) -> Webring {
        Webring {
            id: Uuid::new_v4(),
            url: "retro-ring".to_string(),
            name: "Retro Ring".to_string(),
            owner_id,
            created_at: Utc::now(),
        }
    }

    fn site(webring_id: Uuid, added_by: Uuid) -> Site {
        Site {
            id: Uuid::new_v4(),
            name: "My Site".to_string(),
            url: "https://example.com/".to_string(),
            webring_id,
            added_by,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_owner_may_delete_webring() {
        let owner = Uuid::new_v4();
        let ring = webring(owner);

        assert!(OwnerPolicy.can_delete_webring(owner, &ring));
        assert!(!OwnerPolicy.can_delete_webring(Uuid::new_v4(), &ring));
    }

    #[test]
    fn test_owner_or_adder_may_remove_site() {
        let owner = Uuid::new_v4();
        let adder = Uuid::new_v4();
        let ring = webring(owner);
        let member = site(ring.id, adder);

        assert!(OwnerPolicy.can_remove_site(owner, &ring, &member));
        assert!(OwnerPolicy.can_remove_site(adder, &ring, &member));
        assert!(!OwnerPolicy.can_remove_site(Uuid::new_v4(), &ring, &member));
    }

    #[test]
    fn test_anyone_may_add_site() {
        let ring = webring(Uuid::new_v4());
        assert!(OwnerPolicy.can_add_site(Uuid::new_v4(), &ring));
    }
}
