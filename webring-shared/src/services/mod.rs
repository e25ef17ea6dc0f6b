/// Domain operations
///
/// Services own the business rules (normalisation, validation, uniqueness,
/// authorization) and talk to persistence only through `store::Store`. They
/// are cheap to clone and are shared by the API's `AppState`.

pub mod user;
pub mod webring;

pub use user::{LoginSession, UserService};
pub use webring::{SearchQuery, WebringService};
