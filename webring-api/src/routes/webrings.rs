/// Webring endpoints
///
/// # Endpoints
///
/// - `GET    /v1/webrings` - Search webrings
/// - `POST   /v1/webrings` - Create a webring
/// - `GET    /v1/webring/:webring_url` - Webring details with tags
/// - `DELETE /v1/webring/:webring_url` - Delete a webring
/// - `GET    /v1/webring/:webring_url/sites` - Public member list (also served
///   unversioned at `/webring/:webring_url/sites`)
/// - `POST   /v1/webring/:webring_url/sites` - Add a member site
/// - `DELETE /v1/webring/:webring_url/sites/:site_id` - Remove a member site

use crate::{
    app::{AppState, AuthUser},
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath, ApiQuery},
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;
use webring_shared::{
    error::DomainError,
    models::{site::Site, webring::Webring},
    services::SearchQuery,
    store::WebringLookup,
};

/// Search query parameters
#[derive(Debug, Deserialize, Validate)]
pub struct SearchParams {
    /// Free-text term
    pub q: Option<String>,

    pub tag: Option<String>,

    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<i64>,

    #[validate(range(min = 0, message = "Offset must not be negative"))]
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateWebringRequest {
    #[validate(length(min = 1, message = "Url is required"))]
    pub url: String,

    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddSiteRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    #[validate(length(min = 1, message = "Url is required"))]
    pub url: String,
}

/// Webring with its tag labels
#[derive(Debug, Serialize)]
pub struct WebringResponse {
    pub id: Uuid,
    pub url: String,
    pub name: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub tags: Vec<String>,
}

impl WebringResponse {
    fn new(webring: Webring, tags: Vec<String>) -> Self {
        Self {
            id: webring.id,
            url: webring.url,
            name: webring.name,
            owner_id: webring.owner_id,
            created_at: webring.created_at,
            tags,
        }
    }
}

/// Public projection of a member site
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SiteSummary {
    pub name: String,
    pub url: String,
}

impl From<Site> for SiteSummary {
    fn from(site: Site) -> Self {
        Self {
            name: site.name,
            url: site.url,
        }
    }
}

/// Resolves a path url to its webring or `webring_not_found`
async fn find_webring(state: &AppState, webring_url: &str) -> ApiResult<Webring> {
    state
        .webrings
        .get_webring(WebringLookup::Url(webring_url))
        .await?
        .ok_or_else(|| ApiError::from(DomainError::WebringNotFound(webring_url.to_string())))
}

async fn with_tags(state: &AppState, webring: Webring) -> ApiResult<WebringResponse> {
    let tags = state
        .webrings
        .get_webring_tags(webring.id)
        .await?
        .into_iter()
        .map(|t| t.label)
        .collect();
    Ok(WebringResponse::new(webring, tags))
}

/// Search webrings
///
/// ```text
/// GET /v1/webrings?q=retro&tag=games&limit=20&offset=0
/// ```
///
/// Newest webrings first.
pub async fn search(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> ApiResult<Json<Vec<WebringResponse>>> {
    params.validate()?;

    let webrings = state
        .webrings
        .search(SearchQuery {
            term: params.q,
            tag: params.tag,
            limit: params.limit,
            offset: params.offset,
        })
        .await?;

    let mut results = Vec::with_capacity(webrings.len());
    for webring in webrings {
        results.push(with_tags(&state, webring).await?);
    }

    Ok(Json(results))
}

/// Create a webring owned by the caller
///
/// ```text
/// POST /v1/webrings
///
/// { "url": "retro-ring", "name": "Retro Ring", "tags": ["games"] }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Invalid url, name or tag
/// - `409 Conflict`: `webring_url_not_unique`
pub async fn create_webring(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(req): ApiJson<CreateWebringRequest>,
) -> ApiResult<(StatusCode, Json<WebringResponse>)> {
    req.validate()?;

    let webring = state
        .webrings
        .create_webring(auth.user.id, &req.url, &req.name, &req.tags)
        .await?;

    Ok((StatusCode::CREATED, Json(with_tags(&state, webring).await?)))
}

pub async fn get_webring(
    State(state): State<AppState>,
    ApiPath(webring_url): ApiPath<String>,
) -> ApiResult<Json<WebringResponse>> {
    let webring = find_webring(&state, &webring_url).await?;
    Ok(Json(with_tags(&state, webring).await?))
}

/// Delete a webring with all of its sites (owner only)
pub async fn delete_webring(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(webring_url): ApiPath<String>,
) -> ApiResult<StatusCode> {
    let webring = find_webring(&state, &webring_url).await?;
    state.webrings.delete_webring(webring.id, auth.user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Public member list of a webring
///
/// ```text
/// GET /v1/webring/retro-ring/sites
/// ```
///
/// ```json
/// [{ "name": "Bob's Page", "url": "https://bob.example.com/" }]
/// ```
///
/// An unknown webring answers a bare `404` with an empty body, so embedding
/// widgets can tell "no such ring" apart from "ring without members".
pub async fn get_sites(
    State(state): State<AppState>,
    ApiPath(webring_url): ApiPath<String>,
) -> ApiResult<Response> {
    let Some(webring) = state
        .webrings
        .get_webring(WebringLookup::Url(&webring_url))
        .await?
    else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };

    let sites: Vec<SiteSummary> = state
        .webrings
        .get_webring_sites(webring.id)
        .await?
        .into_iter()
        .map(SiteSummary::from)
        .collect();

    Ok(Json(sites).into_response())
}

/// Add a member site
///
/// ```text
/// POST /v1/webring/retro-ring/sites
///
/// { "name": "Bob's Page", "url": "https://bob.example.com" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Invalid name or url
/// - `403 Forbidden`: Not allowed to add sites to this webring
/// - `404 Not Found`: `webring_not_found`
/// - `409 Conflict`: `site_url_not_unique`
pub async fn add_site(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(webring_url): ApiPath<String>,
    ApiJson(req): ApiJson<AddSiteRequest>,
) -> ApiResult<(StatusCode, Json<Site>)> {
    req.validate()?;

    let webring = find_webring(&state, &webring_url).await?;
    let site = state
        .webrings
        .add_new_site(webring.id, auth.user.id, &req.name, &req.url)
        .await?;

    Ok((StatusCode::CREATED, Json(site)))
}

/// Remove a member site (webring owner or the user who added it)
pub async fn remove_site(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath((webring_url, site_id)): ApiPath<(String, Uuid)>,
) -> ApiResult<StatusCode> {
    let webring = find_webring(&state, &webring_url).await?;
    state
        .webrings
        .remove_site(webring.id, site_id, auth.user.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
