// TmdbClient and LookupClient against a wiremock TMDb.

use std::time::Duration;

use boxsmith_core::{
    ArtworkSource, CollectionProvider, ExternalId, Lookup, PosterRef, RetryPolicy, ServiceError,
};
use boxsmith_tmdb::{JsonFileCache, LookupClient, TmdbClient, TmdbError};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn setup() -> (MockServer, TmdbClient) {
    let server = MockServer::start().await;
    let client = TmdbClient::new("test-key")
        .unwrap()
        .with_base_urls(server.uri(), format!("{}/img", server.uri()))
        .with_min_interval(Duration::from_millis(1));
    (server, client)
}

fn matrix_movie() -> serde_json::Value {
    json!({
        "id": 603,
        "title": "The Matrix",
        "release_date": "1999-03-30",
        "status": "Released",
        "belongs_to_collection": {"id": 2344, "name": "The Matrix Collection"},
        "poster_path": "/m.jpg"
    })
}

fn matrix_collection() -> serde_json::Value {
    json!({
        "id": 2344,
        "name": "The Matrix Collection",
        "poster_path": "/c.jpg",
        "parts": [
            {"id": 603, "title": "The Matrix", "release_date": "1999-03-30"},
            {"id": 604, "title": "The Matrix Reloaded", "release_date": "2003-05-15"}
        ]
    })
}

#[tokio::test]
async fn test_movie_sends_key_and_parses() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/movie/603"))
        .and(query_param("api_key", "test-key"))
        .and(query_param("language", "en-US"))
        .respond_with(ResponseTemplate::new(200).set_body_json(matrix_movie()))
        .expect(1)
        .mount(&server)
        .await;

    let movie = client.movie(ExternalId::new(603)).await.unwrap();
    assert_eq!(movie.title.as_deref(), Some("The Matrix"));
    assert_eq!(movie.collection.unwrap().id, ExternalId::new(2344));
}

#[tokio::test]
async fn test_status_classification() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/movie/1"))
        .respond_with(ResponseTemplate::new(404).set_body_string("{}"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/movie/2"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "2"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/movie/3"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let not_found: ServiceError = client.movie(ExternalId::new(1)).await.unwrap_err().into();
    assert_eq!(not_found, ServiceError::NotFound);

    let limited: ServiceError = client.movie(ExternalId::new(2)).await.unwrap_err().into();
    assert_eq!(
        limited,
        ServiceError::RateLimited {
            retry_after: Some(Duration::from_secs(2))
        }
    );

    let server_err: ServiceError = client.movie(ExternalId::new(3)).await.unwrap_err().into();
    assert_eq!(server_err, ServiceError::Server { status: 503 });
}

#[tokio::test]
async fn test_validate_rejects_bad_key() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/configuration"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"status_code": 7})))
        .mount(&server)
        .await;
    assert!(matches!(client.validate().await, Err(TmdbError::InvalidKey)));
}

#[tokio::test]
async fn test_poster_download_uses_image_host() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/img/c.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF]))
        .expect(1)
        .mount(&server)
        .await;
    let bytes = client
        .fetch_artwork(&PosterRef("/c.jpg".into()))
        .await
        .unwrap();
    assert_eq!(bytes, vec![0xFF, 0xD8, 0xFF]);
}

#[tokio::test]
async fn test_lookup_retries_429_and_caches_to_file() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/movie/603"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(3)
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/movie/603"))
        .respond_with(ResponseTemplate::new(200).set_body_json(matrix_movie()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/collection/2344"))
        .respond_with(ResponseTemplate::new(200).set_body_json(matrix_collection()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("cache.json");
    let lookup = LookupClient::new(client, JsonFileCache::open(&cache_path))
        .with_retry_policy(RetryPolicy::immediate());

    let collection = lookup
        .resolve(ExternalId::new(603))
        .await
        .into_collection()
        .unwrap();
    assert_eq!(collection.name, "The Matrix Collection");
    assert_eq!(collection.poster, Some(PosterRef("/c.jpg".into())));
    drop(lookup);

    // A fresh client over the same file resolves without any request.
    let (_other, offline) = setup().await;
    let cached = LookupClient::new(offline, JsonFileCache::open(&cache_path));
    assert!(matches!(
        cached.resolve(ExternalId::new(603)).await,
        Lookup::Found(_)
    ));
}
