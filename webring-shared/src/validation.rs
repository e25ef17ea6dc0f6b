/// Normalisation and validation of user-supplied text
///
/// Every value is normalised before it is validated, compared or stored.
/// `normalise_*` functions are total and idempotent; `validate_*` functions
/// expect already-normalised input and fail with `DomainError::Validation`.
///
/// # Example
///
/// ```
/// use webring_shared::validation::{normalise_email_address, validate_email_address};
///
/// let email = normalise_email_address("  Alice@Example.COM ");
/// assert_eq!(email, "alice@example.com");
/// assert!(validate_email_address(&email).is_ok());
/// ```

use url::Url;
use validator::ValidateEmail;

use crate::auth::password::PasswordPolicy;
use crate::error::{DomainError, DomainResult};

pub const USERNAME_MIN_LENGTH: usize = 3;
pub const USERNAME_MAX_LENGTH: usize = 32;
pub const EMAIL_MAX_LENGTH: usize = 254;
pub const NAME_MAX_LENGTH: usize = 100;
pub const WEBRING_URL_MIN_LENGTH: usize = 3;
pub const WEBRING_URL_MAX_LENGTH: usize = 64;
pub const SITE_URL_MAX_LENGTH: usize = 2048;
pub const TAG_MAX_LENGTH: usize = 32;

/// Trims and case-folds a username
pub fn normalise_username(username: &str) -> String {
    username.trim().to_lowercase()
}

/// Usernames are 3-32 characters of `[a-z0-9_-]` starting with a letter or digit
pub fn validate_username(username: &str) -> DomainResult<()> {
    let length = username.chars().count();
    if length < USERNAME_MIN_LENGTH {
        return Err(DomainError::validation(
            "username",
            format!("Username must be at least {} characters long", USERNAME_MIN_LENGTH),
        ));
    }
    if length > USERNAME_MAX_LENGTH {
        return Err(DomainError::validation(
            "username",
            format!("Username must be at most {} characters long", USERNAME_MAX_LENGTH),
        ));
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
    {
        return Err(DomainError::validation(
            "username",
            "Username may only contain letters, digits, '_' and '-'",
        ));
    }

    if !username.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return Err(DomainError::validation(
            "username",
            "Username must start with a letter or digit",
        ));
    }

    Ok(())
}

/// Trims and case-folds an email address
pub fn normalise_email_address(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_email_address(email: &str) -> DomainResult<()> {
    if email.is_empty() {
        return Err(DomainError::validation("email", "Email address is required"));
    }
    if email.chars().count() > EMAIL_MAX_LENGTH {
        return Err(DomainError::validation(
            "email",
            format!("Email address must be at most {} characters long", EMAIL_MAX_LENGTH),
        ));
    }
    if !email.validate_email() {
        return Err(DomainError::validation("email", "Invalid email format"));
    }

    Ok(())
}

/// Checks a plaintext password against the configured strength policy
pub fn validate_new_password(password: &str, policy: &PasswordPolicy) -> DomainResult<()> {
    policy
        .check(password)
        .map_err(|message| DomainError::validation("password", message))
}

/// Trims and collapses runs of whitespace into single spaces
///
/// Used for webring and site display names.
pub fn normalise_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn validate_name(field: &'static str, name: &str) -> DomainResult<()> {
    if name.is_empty() {
        return Err(DomainError::validation(field, "Name is required"));
    }
    if name.chars().count() > NAME_MAX_LENGTH {
        return Err(DomainError::validation(
            field,
            format!("Name must be at most {} characters long", NAME_MAX_LENGTH),
        ));
    }
    if name.chars().any(char::is_control) {
        return Err(DomainError::validation(
            field,
            "Name must not contain control characters",
        ));
    }

    Ok(())
}

/// Webring urls are path slugs (`/webring/{url}`), compared case-insensitively
pub fn normalise_webring_url(url: &str) -> String {
    url.trim().to_lowercase()
}

pub fn validate_webring_url(url: &str) -> DomainResult<()> {
    let length = url.chars().count();
    if !(WEBRING_URL_MIN_LENGTH..=WEBRING_URL_MAX_LENGTH).contains(&length) {
        return Err(DomainError::validation(
            "url",
            format!(
                "Webring url must be between {} and {} characters long",
                WEBRING_URL_MIN_LENGTH, WEBRING_URL_MAX_LENGTH
            ),
        ));
    }
    if !url
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(DomainError::validation(
            "url",
            "Webring url may only contain letters, digits and '-'",
        ));
    }
    if url.starts_with('-') || url.ends_with('-') {
        return Err(DomainError::validation(
            "url",
            "Webring url must not start or end with '-'",
        ));
    }

    Ok(())
}

/// Canonical form of a member site's address
///
/// Absolute URLs are re-serialised (lowercase scheme and host, default port
/// dropped, dot segments resolved). Anything unparsable is only trimmed and
/// left for `validate_site_url` to reject.
pub fn normalise_site_url(url: &str) -> String {
    let trimmed = url.trim();
    match Url::parse(trimmed) {
        Ok(parsed) => parsed.to_string(),
        Err(_) => trimmed.to_string(),
    }
}

pub fn validate_site_url(url: &str) -> DomainResult<()> {
    if url.len() > SITE_URL_MAX_LENGTH {
        return Err(DomainError::validation(
            "url",
            format!("Site url must be at most {} characters long", SITE_URL_MAX_LENGTH),
        ));
    }

    let parsed = Url::parse(url)
        .map_err(|_| DomainError::validation("url", "Site url must be an absolute url"))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(DomainError::validation(
            "url",
            "Site url must use http or https",
        ));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(DomainError::validation("url", "Site url must have a host"));
    }

    Ok(())
}

pub fn normalise_tag(label: &str) -> String {
    normalise_name(label).to_lowercase()
}

pub fn validate_tag(label: &str) -> DomainResult<()> {
    if label.is_empty() {
        return Err(DomainError::validation("tags", "Tag must not be empty"));
    }
    if label.chars().count() > TAG_MAX_LENGTH {
        return Err(DomainError::validation(
            "tags",
            format!("Tag must be at most {} characters long", TAG_MAX_LENGTH),
        ));
    }
    if label.chars().any(char::is_control) {
        return Err(DomainError::validation(
            "tags",
            "Tag must not contain control characters",
        ));
    }

    Ok(())
}
