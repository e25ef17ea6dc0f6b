/// Domain error type
///
/// Every operation in `services` returns `Result<T, DomainError>`. Each variant
/// carries a stable machine-readable `code()` and the HTTP status the API layer
/// should answer with (`http_status()`), so the boundary never has to guess.
///
/// # Example
///
/// ```
/// use webring_shared::error::DomainError;
///
/// let err = DomainError::validation("email", "Invalid email format");
/// assert_eq!(err.code(), "validation_error");
/// assert_eq!(err.http_status(), 400);
/// ```

use uuid::Uuid;

use crate::auth::password::PasswordError;
use crate::store::{constraints, StoreError};

/// Result alias for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    /// Input failed a format or policy rule
    #[error("Invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("Email address is already in use")]
    EmailNotUnique,

    #[error("Username is already in use")]
    UsernameNotUnique,

    #[error("Webring url is already in use")]
    WebringUrlNotUnique,

    #[error("Site url is already a member of this webring")]
    SiteUrlNotUnique,

    #[error("User with id '{0}' cannot be found")]
    UserNotFound(Uuid),

    /// Carries whatever key the caller looked the webring up by (id or url)
    #[error("Webring '{0}' cannot be found")]
    WebringNotFound(String),

    #[error("Site with id '{0}' cannot be found")]
    SiteNotFound(Uuid),

    #[error("Not authorized to perform this action")]
    Forbidden,

    #[error("Invalid username, email or password")]
    InvalidCredentials,

    #[error("Password operation failed: {0}")]
    Password(#[from] PasswordError),

    #[error("Storage error: {0}")]
    Store(StoreError),
}

impl DomainError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Stable error code exposed to API clients
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Validation { .. } => "validation_error",
            DomainError::EmailNotUnique => "email_not_unique",
            DomainError::UsernameNotUnique => "username_not_unique",
            DomainError::WebringUrlNotUnique => "webring_url_not_unique",
            DomainError::SiteUrlNotUnique => "site_url_not_unique",
            DomainError::UserNotFound(_) => "user_not_found",
            DomainError::WebringNotFound(_) => "webring_not_found",
            DomainError::SiteNotFound(_) => "site_not_found",
            DomainError::Forbidden => "forbidden",
            DomainError::InvalidCredentials => "invalid_credentials",
            DomainError::Password(_) | DomainError::Store(_) => "internal_error",
        }
    }

    /// HTTP status code the boundary maps this error to
    pub fn http_status(&self) -> u16 {
        match self {
            DomainError::Validation { .. } => 400,
            DomainError::InvalidCredentials => 401,
            DomainError::Forbidden => 403,
            DomainError::UserNotFound(_)
            | DomainError::WebringNotFound(_)
            | DomainError::SiteNotFound(_) => 404,
            DomainError::EmailNotUnique
            | DomainError::UsernameNotUnique
            | DomainError::WebringUrlNotUnique
            | DomainError::SiteUrlNotUnique => 409,
            DomainError::Password(_) | DomainError::Store(_) => 500,
        }
    }

    /// Whether this error is a server fault rather than a caller mistake
    pub fn is_internal(&self) -> bool {
        self.http_status() >= 500
    }
}

/// Unique-constraint violations that slipped past the optimistic checks
/// (concurrent writers) are reported as the matching uniqueness error.
impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match &err {
            StoreError::Conflict(constraint) => match constraint.as_str() {
                constraints::USERS_EMAIL => DomainError::EmailNotUnique,
                constraints::USERS_USERNAME => DomainError::UsernameNotUnique,
                constraints::WEBRINGS_URL => DomainError::WebringUrlNotUnique,
                constraints::SITES_WEBRING_URL => DomainError::SiteUrlNotUnique,
                _ => DomainError::Store(err),
            },
            StoreError::MissingReference(_) | StoreError::Database(_) => DomainError::Store(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::validation("username", "Username is too short");
        assert_eq!(err.to_string(), "Invalid username: Username is too short");

        let id = Uuid::nil();
        let err = DomainError::UserNotFound(id);
        assert_eq!(
            err.to_string(),
            "User with id '00000000-0000-0000-0000-000000000000' cannot be found"
        );
    }

    #[test]
    fn test_not_found_kinds_map_to_404() {
        assert_eq!(DomainError::UserNotFound(Uuid::nil()).http_status(), 404);
        assert_eq!(DomainError::WebringNotFound("ring".into()).http_status(), 404);
        assert_eq!(DomainError::SiteNotFound(Uuid::nil()).http_status(), 404);
    }

    #[test]
    fn test_uniqueness_kinds_map_to_409() {
        assert_eq!(DomainError::EmailNotUnique.http_status(), 409);
        assert_eq!(DomainError::EmailNotUnique.code(), "email_not_unique");
        assert_eq!(DomainError::UsernameNotUnique.code(), "username_not_unique");
        assert_eq!(DomainError::SiteUrlNotUnique.http_status(), 409);
    }

    #[test]
    fn test_store_conflict_maps_to_uniqueness_error() {
        let err: DomainError = StoreError::Conflict(constraints::USERS_EMAIL.to_string()).into();
        assert!(matches!(err, DomainError::EmailNotUnique));

        let err: DomainError =
            StoreError::Conflict(constraints::SITES_WEBRING_URL.to_string()).into();
        assert!(matches!(err, DomainError::SiteUrlNotUnique));

        let err: DomainError = StoreError::Conflict("something_else".to_string()).into();
        assert!(matches!(err, DomainError::Store(_)));
        assert!(err.is_internal());
    }
}
