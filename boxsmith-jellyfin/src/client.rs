use std::time::Duration;

use boxsmith_core::{Grouping, LibraryItem, LibraryService, ServiceError};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;

use crate::error::JellyfinError;
use crate::types::{BaseItem, CollectionCreated, ItemsResponse, UserDto};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const IMAGE_TIMEOUT: Duration = Duration::from_secs(30);
const TOKEN_HEADER: &str = "X-Emby-Token";
/// Item ids per add-to-collection call, to keep the query string short.
const ADD_BATCH: usize = 50;

/// HTTP client for the Jellyfin server that owns the library.
pub struct JellyfinClient {
    http: reqwest::Client,
    base_url: String,
    user_id: String,
}

impl JellyfinClient {
    /// Connect and pick the acting user: `user_id` if given, otherwise the
    /// first enabled user the server lists.
    pub async fn connect(
        base_url: &str,
        api_key: &str,
        user_id: Option<String>,
    ) -> Result<Self, JellyfinError> {
        let mut headers = HeaderMap::new();
        let token = HeaderValue::from_str(api_key).map_err(|_| JellyfinError::InvalidKey)?;
        headers.insert(TOKEN_HEADER, token);

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()?;

        let mut client = Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_id: String::new(),
        };

        client.user_id = match user_id.filter(|u| !u.trim().is_empty()) {
            Some(id) => id,
            None => client.first_enabled_user().await?,
        };
        log::debug!("Using Jellyfin user {}", client.user_id);
        Ok(client)
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    async fn first_enabled_user(&self) -> Result<String, JellyfinError> {
        let users: Vec<UserDto> = self.get_json("/Users", &[]).await?;
        users
            .into_iter()
            .find(|u| !u.is_disabled())
            .map(|u| {
                log::info!(
                    "Acting as Jellyfin user {}",
                    u.name.as_deref().unwrap_or(&u.id)
                );
                u.id
            })
            .ok_or(JellyfinError::NoUser)
    }

    async fn items(&self, query: &[(&str, &str)]) -> Result<Vec<BaseItem>, JellyfinError> {
        let mut params = vec![("Recursive", "true"), ("UserId", self.user_id.as_str())];
        params.extend_from_slice(query);
        let resp: ItemsResponse = self.get_json("/Items", &params).await?;
        Ok(resp.items)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, JellyfinError> {
        let resp = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .send()
            .await?;
        let text = check_status(resp).await?.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn post(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<reqwest::Response, JellyfinError> {
        let resp = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .query(query)
            .send()
            .await?;
        check_status(resp).await
    }
}

impl LibraryService for JellyfinClient {
    async fn list_items(&self, include_grouped: bool) -> Result<Vec<LibraryItem>, ServiceError> {
        let collapse = if include_grouped { "false" } else { "true" };
        let items = self
            .items(&[
                ("IncludeItemTypes", "Movie"),
                ("Fields", "ProviderIds"),
                ("CollapseBoxSetItems", collapse),
            ])
            .await?;
        Ok(items
            .into_iter()
            .map(|item| {
                let external_id = item.tmdb_id();
                LibraryItem::new(item.id, external_id, item.name.as_deref().unwrap_or_default())
            })
            .collect())
    }

    async fn list_groupings(&self) -> Result<Vec<Grouping>, ServiceError> {
        let boxsets = self
            .items(&[("IncludeItemTypes", "BoxSet"), ("Fields", "ImageTags")])
            .await?;

        let mut groupings = Vec::with_capacity(boxsets.len());
        for boxset in boxsets {
            let members = self
                .items(&[("ParentId", boxset.id.as_str()), ("IncludeItemTypes", "Movie")])
                .await?;
            groupings.push(Grouping {
                has_artwork: boxset.has_primary_image(),
                name: boxset.name.clone().unwrap_or_default(),
                member_ids: members.into_iter().map(|m| m.id).collect(),
                id: boxset.id,
            });
        }
        Ok(groupings)
    }

    async fn create_grouping(&self, name: &str) -> Result<String, ServiceError> {
        let resp = self.post("/Collections", &[("Name", name)]).await?;
        let text = resp.text().await.map_err(JellyfinError::from)?;
        let created: CollectionCreated =
            serde_json::from_str(&text).map_err(JellyfinError::from)?;
        Ok(created.id)
    }

    async fn add_members(&self, grouping_id: &str, member_ids: &[String]) -> Result<(), ServiceError> {
        let path = format!("/Collections/{grouping_id}/Items");
        for batch in member_ids.chunks(ADD_BATCH) {
            let ids = batch.join(",");
            self.post(&path, &[("Ids", ids.as_str())]).await?;
        }
        Ok(())
    }

    async fn set_artwork(&self, grouping_id: &str, image: &[u8]) -> Result<(), ServiceError> {
        let resp = self
            .http
            .post(format!("{}/Items/{}/Images/Primary", self.base_url, grouping_id))
            .header(CONTENT_TYPE, "image/jpeg")
            .timeout(IMAGE_TIMEOUT)
            .body(image.to_vec())
            .send()
            .await
            .map_err(JellyfinError::from)?;
        check_status(resp).await?;
        Ok(())
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, JellyfinError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(JellyfinError::Status {
        status: status.as_u16(),
        body,
    })
}
