//! Twitter v1.1 client
//!
//! Uses ureq (sync HTTP) with application-only auth: the API key and secret
//! are exchanged once for a bearer token when the client is built.

use super::{ApiError, ApiResult, SocialGraphApi, MAX_LOOKUP_BATCH};
use crate::credentials::Credentials;
use crate::models::{Identifier, ProfileRecord};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.twitter.com";

/// Ids per page on the followers/friends ids endpoints.
const IDS_PAGE_SIZE: usize = 5000;

/// Unified HTTP client for the follow graph
pub struct TwitterClient {
    agent: ureq::Agent,
    base_url: String,
    bearer: String,
}

fn make_agent() -> ureq::Agent {
    ureq::config::Config::builder()
        .http_status_as_error(false) // Status codes are mapped to ApiError below
        .timeout_global(Some(std::time::Duration::from_secs(60)))
        .build()
        .new_agent()
}

#[derive(Deserialize)]
struct TokenResponse {
    token_type: String,
    access_token: String,
}

#[derive(Deserialize)]
struct IdsPage {
    ids: Vec<Identifier>,
    #[serde(default)]
    next_cursor: i64,
}

impl TwitterClient {
    /// Authenticate against the default API host.
    pub fn connect(credentials: &Credentials) -> ApiResult<Self> {
        Self::connect_to(DEFAULT_BASE_URL, credentials)
    }

    /// Authenticate against an explicit API host.
    pub fn connect_to(base_url: &str, credentials: &Credentials) -> ApiResult<Self> {
        let agent = make_agent();
        let base_url = base_url.trim_end_matches('/').to_string();

        let basic = STANDARD.encode(format!(
            "{}:{}",
            urlencoding::encode(&credentials.api_key),
            urlencoding::encode(&credentials.api_secret)
        ));

        let response = agent
            .post(&format!("{}/oauth2/token", base_url))
            .header("Authorization", &format!("Basic {}", basic))
            .send_form([("grant_type", "client_credentials")])
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let response = check_status(response)?;
        let token: TokenResponse = response
            .into_body()
            .read_json()
            .map_err(|e| ApiError::Parse(e.to_string()))?;

        if !token.token_type.eq_ignore_ascii_case("bearer") {
            return Err(ApiError::Unauthorized(format!(
                "unexpected token type '{}'",
                token.token_type
            )));
        }

        Ok(Self {
            agent,
            base_url,
            bearer: format!("Bearer {}", token.access_token),
        })
    }

    fn get(&self, path: &str, query: &[(&str, String)]) -> ApiResult<ureq::http::Response<ureq::Body>> {
        let mut req = self
            .agent
            .get(&format!("{}{}", self.base_url, path))
            .header("Authorization", &self.bearer);
        for (key, value) in query {
            req = req.query(key, value);
        }
        let response = req.call().map_err(|e| ApiError::Transport(e.to_string()))?;
        check_status(response)
    }

    fn paged_ids(&self, path: &str, id: Identifier, max_count: usize) -> ApiResult<Vec<Identifier>> {
        let mut ids = Vec::new();
        let mut cursor: i64 = -1;

        while cursor != 0 && ids.len() < max_count {
            let page_size = IDS_PAGE_SIZE.min(max_count - ids.len());
            let response = self.get(
                path,
                &[
                    ("user_id", id.to_string()),
                    ("cursor", cursor.to_string()),
                    ("count", page_size.to_string()),
                ],
            )?;
            let page: IdsPage = response
                .into_body()
                .read_json()
                .map_err(|e| ApiError::Parse(e.to_string()))?;

            debug!("{} page for {}: {} ids", path, id, page.ids.len());
            ids.extend(page.ids);
            cursor = page.next_cursor;
        }

        ids.truncate(max_count);
        Ok(ids)
    }
}

impl SocialGraphApi for TwitterClient {
    fn resolve_handle(&self, handle: &str) -> ApiResult<Identifier> {
        let handle = handle.trim_start_matches('@');
        let response = self.get(
            "/1.1/users/lookup.json",
            &[("screen_name", handle.to_string())],
        );
        let response = match response {
            Err(ApiError::Api { status: 404, .. }) => {
                return Err(ApiError::NotFound(handle.to_string()))
            }
            other => other?,
        };

        let users: Vec<ProfileRecord> = response
            .into_body()
            .read_json()
            .map_err(|e| ApiError::Parse(e.to_string()))?;

        users
            .into_iter()
            .next()
            .map(|u| u.id)
            .ok_or_else(|| ApiError::NotFound(handle.to_string()))
    }

    fn get_follower_ids(&self, id: Identifier, max_count: usize) -> ApiResult<Vec<Identifier>> {
        self.paged_ids("/1.1/followers/ids.json", id, max_count)
    }

    fn get_friend_ids(&self, id: Identifier, max_count: usize) -> ApiResult<Vec<Identifier>> {
        self.paged_ids("/1.1/friends/ids.json", id, max_count)
    }

    fn lookup_profiles(&self, ids: &[Identifier]) -> ApiResult<Vec<ProfileRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        if ids.len() > MAX_LOOKUP_BATCH {
            return Err(ApiError::Api {
                status: 400,
                message: format!(
                    "lookup accepts at most {} ids, got {}",
                    MAX_LOOKUP_BATCH,
                    ids.len()
                ),
            });
        }

        let joined = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");

        match self.get("/1.1/users/lookup.json", &[("user_id", joined)]) {
            // None of the ids resolved
            Err(ApiError::Api { status: 404, .. }) => Ok(Vec::new()),
            Err(e) => Err(e),
            Ok(response) => response
                .into_body()
                .read_json()
                .map_err(|e| ApiError::Parse(e.to_string())),
        }
    }
}

/// Map non-success statuses to [`ApiError`].
fn check_status(
    response: ureq::http::Response<ureq::Body>,
) -> ApiResult<ureq::http::Response<ureq::Body>> {
    let status = response.status().as_u16();
    if status < 400 {
        return Ok(response);
    }

    let reset_at = response
        .headers()
        .get("x-rate-limit-reset")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok());
    let message = response.into_body().read_to_string().unwrap_or_default();

    Err(match status {
        429 => ApiError::RateLimited { reset_at },
        401 | 403 => ApiError::Unauthorized(message),
        _ => ApiError::Api { status, message },
    })
}
