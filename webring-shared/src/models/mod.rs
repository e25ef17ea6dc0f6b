/// Database models
///
/// Row types plus their Postgres CRUD functions. Services do not call these
/// directly; they go through `store::Store`, whose `PgStore` implementation
/// delegates here.
///
/// - `user`: registered accounts
/// - `webring`: webrings and search
/// - `site`: webring member sites
/// - `tag`: webring labels
/// - `session`: login sessions

pub mod session;
pub mod site;
pub mod tag;
pub mod user;
pub mod webring;
