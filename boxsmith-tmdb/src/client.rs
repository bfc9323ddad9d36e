use std::sync::Arc;

use boxsmith_core::{ArtworkSource, ExternalId, PosterRef, ServiceError};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

use crate::error::TmdbError;
use crate::lookup::CatalogApi;
use crate::types::{
    CollectionRecord, CollectionResponse, ConfigurationResponse, MovieRecord, MovieResponse,
};

pub const BASE_URL: &str = "https://api.themoviedb.org/3";
pub const IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p/original";
pub const DEFAULT_LANGUAGE: &str = "en-US";
const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(250);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const POSTER_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the TMDb v3 API with a process-wide request gate.
///
/// Every API request passes [`TmdbClient::rate_limit`], which keeps
/// consecutive requests at least `min_interval` apart. Concurrent callers
/// queue on the gate. Poster downloads go to the image CDN and skip it.
pub struct TmdbClient {
    http: reqwest::Client,
    api_key: String,
    language: String,
    base_url: String,
    image_base_url: String,
    min_interval: Duration,
    last_request: Arc<Mutex<Instant>>,
}

impl TmdbClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, TmdbError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("boxsmith/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            language: DEFAULT_LANGUAGE.to_string(),
            base_url: BASE_URL.to_string(),
            image_base_url: IMAGE_BASE_URL.to_string(),
            min_interval: MIN_REQUEST_INTERVAL,
            last_request: Arc::new(Mutex::new(gate_start(MIN_REQUEST_INTERVAL))),
        })
    }

    /// Point the client at other hosts (used by tests against a mock server).
    pub fn with_base_urls(mut self, api: impl Into<String>, images: impl Into<String>) -> Self {
        self.base_url = api.into().trim_end_matches('/').to_string();
        self.image_base_url = images.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self.last_request = Arc::new(Mutex::new(gate_start(interval)));
        self
    }

    /// Check the API key with a cheap `GET /configuration`.
    pub async fn validate(&self) -> Result<(), TmdbError> {
        match self.get_json::<ConfigurationResponse>("/configuration").await {
            Ok(_) => Ok(()),
            Err(TmdbError::Status { status: 401, .. }) => Err(TmdbError::InvalidKey),
            Err(e) => Err(e),
        }
    }

    pub async fn movie(&self, id: ExternalId) -> Result<MovieRecord, TmdbError> {
        let resp: MovieResponse = self.get_json(&format!("/movie/{id}")).await?;
        Ok(resp.into())
    }

    pub async fn collection(&self, id: ExternalId) -> Result<CollectionRecord, TmdbError> {
        let resp: CollectionResponse = self.get_json(&format!("/collection/{id}")).await?;
        Ok(resp.into())
    }

    /// Full URL of a poster path on the image CDN.
    pub fn poster_url(&self, poster: &PosterRef) -> String {
        format!("{}{}", self.image_base_url, poster.as_str())
    }

    /// Download poster bytes. Not rate limited.
    pub async fn download_poster(&self, poster: &PosterRef) -> Result<Vec<u8>, TmdbError> {
        let resp = self
            .http
            .get(self.poster_url(poster))
            .timeout(POSTER_TIMEOUT)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        let bytes = resp.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, TmdbError> {
        self.rate_limit().await;

        let resp = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .query(&[("api_key", self.api_key.as_str()), ("language", self.language.as_str())])
            .send()
            .await?;
        let resp = check_status(resp).await?;

        let text = resp.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            log::debug!(
                "Failed to parse TMDb response for {}: {}. Response: {}",
                path,
                e,
                &text[..floor_char_boundary(&text, 200)]
            );
            TmdbError::Json(e)
        })
    }

    /// Wait until at least `min_interval` has passed since the last request.
    async fn rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        let elapsed = last.elapsed();
        if elapsed < self.min_interval {
            tokio::time::sleep(self.min_interval - elapsed).await;
        }
        *last = Instant::now();
    }
}

impl CatalogApi for TmdbClient {
    async fn movie(&self, id: ExternalId) -> Result<MovieRecord, ServiceError> {
        Ok(TmdbClient::movie(self, id).await?)
    }

    async fn collection(&self, id: ExternalId) -> Result<CollectionRecord, ServiceError> {
        Ok(TmdbClient::collection(self, id).await?)
    }
}

impl ArtworkSource for TmdbClient {
    async fn fetch_artwork(&self, poster: &PosterRef) -> Result<Vec<u8>, ServiceError> {
        Ok(self.download_poster(poster).await?)
    }
}

fn gate_start(interval: Duration) -> Instant {
    let now = Instant::now();
    now.checked_sub(interval).unwrap_or(now)
}

/// Turn a non-success response into [`TmdbError::Status`].
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, TmdbError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let retry_after = resp
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    let body = resp.text().await.unwrap_or_default();
    Err(TmdbError::Status {
        status: status.as_u16(),
        retry_after,
        body,
    })
}

fn floor_char_boundary(s: &str, max: usize) -> usize {
    let mut end = s.len().min(max);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    end
}
