/// Authentication primitives
///
/// - `password`: Argon2id hashing and the new-password strength policy
/// - `session`: bearer token generation for login sessions
/// - `policy`: who may add, remove and delete webring content

pub mod password;
pub mod policy;
pub mod session;
