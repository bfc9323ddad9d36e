use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use boxsmith_core::{CreateRequestOutcome, ExternalId, RequestService, RequestStatus, ServiceError};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};

use crate::error::SeerrError;
use crate::types::{CreateRequest, CreatedRequest, ErrorBody, MovieDetails};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const API_KEY_HEADER: &str = "X-Api-Key";

/// HTTP client for Jellyseerr/Overseerr. `base_url` includes the API prefix,
/// e.g. `http://host:5055/api/v1`.
pub struct SeerrClient {
    http: reqwest::Client,
    base_url: String,
    /// Release years seen in movie details, so a later year query reuses them.
    release_years: Mutex<HashMap<ExternalId, Option<i32>>>,
}

impl SeerrClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, SeerrError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(api_key).map_err(|_| SeerrError::InvalidKey)?;
        headers.insert(API_KEY_HEADER, key);

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            release_years: Mutex::new(HashMap::new()),
        })
    }

    pub async fn movie_details(&self, id: ExternalId) -> Result<Option<MovieDetails>, SeerrError> {
        let resp = self
            .http
            .get(format!("{}/movie/{}", self.base_url, id))
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = check_status(resp).await?;
        let text = resp.text().await?;
        let details: MovieDetails = serde_json::from_str(&text)?;
        self.release_years
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, details.release_year());
        Ok(Some(details))
    }

    pub async fn request_movie(&self, id: ExternalId) -> Result<CreateRequestOutcome, SeerrError> {
        let body = CreateRequest {
            media_type: "movie",
            media_id: id.get(),
        };
        let resp = self
            .http
            .post(format!("{}/request", self.base_url))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            let text = resp.text().await?;
            let request_id = serde_json::from_str::<CreatedRequest>(&text)
                .map(|r| match r.id {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .unwrap_or_default();
            return Ok(CreateRequestOutcome::Created { request_id });
        }

        let text = resp.text().await.unwrap_or_default();
        if is_duplicate(status, &text) {
            log::debug!("Jellyseerr already has a request for TMDb {}", id);
            return Ok(CreateRequestOutcome::Duplicate);
        }
        Err(SeerrError::Status {
            status: status.as_u16(),
            body: text,
        })
    }
}

impl RequestService for SeerrClient {
    async fn find_request(&self, id: ExternalId) -> Result<Option<RequestStatus>, ServiceError> {
        let details = self.movie_details(id).await?;
        Ok(details
            .and_then(|d| d.media_info)
            .and_then(|info| info.request_status()))
    }

    async fn create_request(&self, id: ExternalId) -> Result<CreateRequestOutcome, ServiceError> {
        Ok(self.request_movie(id).await?)
    }

    async fn release_year(&self, id: ExternalId) -> Result<Option<i32>, ServiceError> {
        let known = self
            .release_years
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .copied();
        if let Some(year) = known {
            return Ok(year);
        }
        Ok(self.movie_details(id).await?.and_then(|d| d.release_year()))
    }
}

/// 409, or a 4xx saying the title is already requested or available.
fn is_duplicate(status: StatusCode, body: &str) -> bool {
    if status == StatusCode::CONFLICT {
        return true;
    }
    if !status.is_client_error() {
        return false;
    }
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| body.to_string())
        .to_lowercase();
    message.contains("already requested")
        || message.contains("already exists")
        || message.contains("already available")
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, SeerrError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(SeerrError::Status {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_detection() {
        assert!(is_duplicate(StatusCode::CONFLICT, ""));
        assert!(is_duplicate(
            StatusCode::BAD_REQUEST,
            r#"{"message": "Request for this media Already Exists."}"#
        ));
        assert!(is_duplicate(StatusCode::FORBIDDEN, "Movie is already requested"));
        assert!(!is_duplicate(StatusCode::BAD_REQUEST, r#"{"message": "quota exceeded"}"#));
        assert!(!is_duplicate(
            StatusCode::INTERNAL_SERVER_ERROR,
            "already requested"
        ));
    }
}
